//! Snapshot aggregation - one cycle's merged view across sources
//!
//! Runs every adapter concurrently and merges the settled results into a
//! `Snapshot` that tolerates partial failure: a failed source is recorded,
//! never omitted, and one slow source never blocks the others beyond its
//! own timeout.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::future::join_all;

use crate::error::FetchError;
use crate::sources::SourceAdapter;
use crate::types::{
    BiasReport, Candle, OpenInterest, SourceKind, SourcePayload, SourceResult, Symbol, TickerStats,
};

/// Allowance past the per-adapter timeout before the aggregator declares
/// the adapter stuck and moves on without it.
const FENCE_MARGIN: Duration = Duration::from_millis(250);

/// One polling cycle's merged view for a single symbol.
///
/// Invariant: every adapter contributes exactly one entry, failures
/// included, and entries keep adapter registration order.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub symbol: Symbol,
    pub ts: DateTime<Utc>,
    pub entries: Vec<(SourceKind, SourceResult)>,
}

impl Snapshot {
    pub fn get(&self, kind: SourceKind) -> Option<&SourceResult> {
        self.entries.iter().find(|(k, _)| *k == kind).map(|(_, r)| r)
    }

    pub fn ticker(&self) -> Option<&TickerStats> {
        match self.get(SourceKind::Ticker) {
            Some(Ok(SourcePayload::Ticker(stats))) => Some(stats),
            _ => None,
        }
    }

    pub fn candles(&self) -> Option<&[Candle]> {
        match self.get(SourceKind::Candles) {
            Some(Ok(SourcePayload::Candles(candles))) => Some(candles),
            _ => None,
        }
    }

    pub fn open_interest(&self) -> Option<&OpenInterest> {
        match self.get(SourceKind::OpenInterest) {
            Some(Ok(SourcePayload::OpenInterest(oi))) => Some(oi),
            _ => None,
        }
    }

    pub fn bias(&self) -> Option<&BiasReport> {
        match self.get(SourceKind::Bias) {
            Some(Ok(SourcePayload::Bias(report))) => Some(report),
            _ => None,
        }
    }

    /// Failed sources in registration order.
    pub fn failures(&self) -> impl Iterator<Item = (SourceKind, &FetchError)> {
        self.entries
            .iter()
            .filter_map(|(kind, result)| result.as_ref().err().map(|e| (*kind, e)))
    }

    pub fn failure_count(&self) -> usize {
        self.failures().count()
    }

    pub fn all_failed(&self) -> bool {
        !self.entries.is_empty() && self.failure_count() == self.entries.len()
    }
}

/// Collect one snapshot for `symbol`.
///
/// All adapters are invoked concurrently; the cycle latency is bounded by
/// the slowest single adapter (plus the fence margin), not the sum. The
/// snapshot is assembled only after every adapter settled.
pub async fn collect(
    symbol: &Symbol,
    adapters: &[Arc<dyn SourceAdapter>],
    timeout: Duration,
) -> Snapshot {
    let fence = timeout + FENCE_MARGIN;

    let fetches = adapters.iter().map(|adapter| {
        let adapter = Arc::clone(adapter);
        async move {
            let kind = adapter.kind();
            let result = match tokio::time::timeout(fence, adapter.fetch(symbol, timeout)).await {
                Ok(result) => result,
                Err(_) => Err(FetchError::Timeout(fence)),
            };
            if let Err(err) = &result {
                tracing::warn!(
                    symbol = %symbol,
                    source = %kind,
                    kind = err.kind(),
                    error = %err,
                    "source fetch failed"
                );
            }
            (kind, result)
        }
    });

    let entries = join_all(fetches).await;

    Snapshot {
        symbol: symbol.clone(),
        ts: Utc::now(),
        entries,
    }
}
