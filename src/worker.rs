//! Cycle runner wiring adapters, aggregator and notifier
//!
//! One cycle: collect a snapshot per symbol (symbols run concurrently,
//! adapters within each symbol too), render the combined message, deliver
//! it. Source failures are embedded in the snapshots and delivery failures
//! are logged; nothing here ever stops the scheduler.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use futures_util::future::join_all;

use crate::notify::{render_cycle, Notifier};
use crate::scheduler::CycleRunner;
use crate::snapshot::{collect, Snapshot};
use crate::sources::SourceAdapter;
use crate::types::Symbol;

/// The aggregator + notifier pair driven by the scheduler.
pub struct Worker {
    symbols: Vec<Symbol>,
    adapters: Vec<Arc<dyn SourceAdapter>>,
    source_timeout: Duration,
    notifier: Notifier,
}

impl Worker {
    pub fn new(
        symbols: Vec<Symbol>,
        adapters: Vec<Arc<dyn SourceAdapter>>,
        source_timeout: Duration,
        notifier: Notifier,
    ) -> Self {
        Self {
            symbols,
            adapters,
            source_timeout,
            notifier,
        }
    }

    async fn collect_all(&self) -> Vec<Snapshot> {
        join_all(
            self.symbols
                .iter()
                .map(|symbol| collect(symbol, &self.adapters, self.source_timeout)),
        )
        .await
    }
}

#[async_trait]
impl CycleRunner for Worker {
    async fn run_cycle(&self, seq: u64) {
        let snapshots = self.collect_all().await;

        let failures: usize = snapshots.iter().map(Snapshot::failure_count).sum();
        let entries: usize = snapshots.iter().map(|s| s.entries.len()).sum();
        tracing::info!(seq, symbols = snapshots.len(), entries, failures, "cycle collected");

        let message = render_cycle(Utc::now(), &snapshots);
        if let Err(err) = self.notifier.deliver(message.as_str()).await {
            tracing::error!(seq, error = %err, "snapshot delivery failed");
        }
    }
}
