//! Deterministic rendering of a cycle's snapshots
//!
//! A degraded cycle is rendered explicitly: every failed source gets its
//! own line, and a fully failed cycle still produces a complete report
//! instead of an empty message.

use chrono::{DateTime, Utc};

use crate::snapshot::Snapshot;

/// Message ready for the sink, derived from snapshots only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationMessage {
    text: String,
}

impl NotificationMessage {
    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl std::fmt::Display for NotificationMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.text)
    }
}

/// Render one cycle's snapshots into a single Markdown message.
pub fn render_cycle(ts: DateTime<Utc>, snapshots: &[Snapshot]) -> NotificationMessage {
    let mut text = format!("*Snapshot (UTC {})*", ts.format("%H:%M"));
    for snapshot in snapshots {
        text.push('\n');
        text.push_str(&render_symbol(snapshot));
    }
    NotificationMessage { text }
}

fn render_symbol(snapshot: &Snapshot) -> String {
    let mut out = String::new();

    if snapshot.all_failed() {
        out.push_str(&format!("*{}*: all sources failed", snapshot.symbol));
    } else if let Some(ticker) = snapshot.ticker() {
        out.push_str(&format!(
            "*{}*: {:.2} ({:+.2}% 24h, vol={:.2}, hi={:.2}, lo={:.2})",
            snapshot.symbol, ticker.last, ticker.pct_change, ticker.volume, ticker.high, ticker.low
        ));
        if let Some(oi) = snapshot.open_interest() {
            out.push_str(&format!(" OI={:.2}", oi.value));
        }
    } else {
        out.push_str(&format!("*{}*:", snapshot.symbol));
        if let Some(oi) = snapshot.open_interest() {
            out.push_str(&format!(" OI={:.2}", oi.value));
        }
    }

    if let Some(candles) = snapshot.candles() {
        if let Some(last) = candles.last() {
            out.push_str(&format!(
                "\n  candles: {} bars, last close {:.2}",
                candles.len(),
                last.close
            ));
        }
    }

    for (kind, err) in snapshot.failures() {
        out.push_str(&format!("\n  ⚠ {}: {}", kind, err));
    }

    if let Some(bias) = snapshot.bias() {
        out.push_str(&format!("\n  🧠 {}", bias.analysis));
    }

    out
}
