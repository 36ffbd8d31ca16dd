//! Core types used throughout PulseBot
//!
//! Defines the symbol identifier, the per-source payload records, and the
//! tagged result every adapter produces once per cycle.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::FetchError;

/// Exchange pair identifier (e.g. "BTCUSDT"). Uppercased on construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Symbol(String);

impl Symbol {
    pub fn new(s: impl AsRef<str>) -> Self {
        Symbol(s.as_ref().trim().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Symbol {
    fn from(s: &str) -> Self {
        Symbol::new(s)
    }
}

/// Data kinds the worker can poll. Doubles as the snapshot key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceKind {
    Ticker,
    Candles,
    OpenInterest,
    Bias,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Ticker => write!(f, "ticker"),
            SourceKind::Candles => write!(f, "candles"),
            SourceKind::OpenInterest => write!(f, "open_interest"),
            SourceKind::Bias => write!(f, "bias"),
        }
    }
}

/// 24h rolling-window statistics for one symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickerStats {
    /// Last traded price
    pub last: f64,
    /// Price 24h ago (window open)
    pub open: f64,
    /// 24h high
    pub high: f64,
    /// 24h low
    pub low: f64,
    /// 24h base-asset volume
    pub volume: f64,
    /// Derived percent change over the window
    pub pct_change: f64,
}

/// Candlestick data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candle {
    /// Open time (ms, start of period)
    pub open_time: i64,
    /// Close time (ms, end of period)
    pub close_time: i64,
    /// Open price
    pub open: f64,
    /// High price
    pub high: f64,
    /// Low price
    pub low: f64,
    /// Close price
    pub close: f64,
    /// Volume in base currency
    pub volume: f64,
}

/// Futures open interest for one symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenInterest {
    /// Open interest in contracts
    pub value: f64,
    /// Exchange timestamp (ms)
    pub ts: i64,
}

/// Short directional read produced by the language-model endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BiasReport {
    /// Model that produced the analysis
    pub model: String,
    /// Free-text analysis
    pub analysis: String,
}

/// Payload of a successful fetch, tagged by data kind.
#[derive(Debug, Clone)]
pub enum SourcePayload {
    Ticker(TickerStats),
    Candles(Vec<Candle>),
    OpenInterest(OpenInterest),
    Bias(BiasReport),
}

impl SourcePayload {
    pub fn kind(&self) -> SourceKind {
        match self {
            SourcePayload::Ticker(_) => SourceKind::Ticker,
            SourcePayload::Candles(_) => SourceKind::Candles,
            SourcePayload::OpenInterest(_) => SourceKind::OpenInterest,
            SourcePayload::Bias(_) => SourceKind::Bias,
        }
    }
}

/// One adapter's outcome for one cycle.
pub type SourceResult = Result<SourcePayload, FetchError>;

/// Percent change from `open` to `last`.
///
/// A zero or non-finite open surfaces as `InvalidData` so a bad upstream
/// payload never turns into a NaN travelling through the snapshot.
pub fn percent_change(open: f64, last: f64) -> Result<f64, FetchError> {
    if open == 0.0 || !open.is_finite() || !last.is_finite() {
        return Err(FetchError::InvalidData(format!(
            "cannot derive percent change from open={} last={}",
            open, last
        )));
    }
    Ok((last - open) / open * 100.0)
}
