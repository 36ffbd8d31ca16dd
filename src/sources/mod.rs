//! Source adapters (ticker, candles, open interest, bias)
//!
//! One fetcher per upstream data kind. Each adapter issues a bounded
//! outbound call and returns a typed `SourceResult`; every failure mode is
//! captured in the result, never propagated past the adapter.

mod bias;
mod candles;
mod open_interest;
mod ticker;

pub use bias::BiasAdapter;
pub use candles::CandlesAdapter;
pub use open_interest::OpenInterestAdapter;
pub use ticker::TickerAdapter;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::FetchError;
use crate::types::{SourceKind, SourceResult, Symbol};

/// Uniform contract for a single upstream data source.
///
/// Adapters share one injected `reqwest::Client`; they hold no mutable
/// state, so a cycle can run them all concurrently.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Stable identifier, used as the snapshot key.
    fn kind(&self) -> SourceKind;

    /// Fetch one payload for `symbol`, bounded by `timeout`.
    async fn fetch(&self, symbol: &Symbol, timeout: Duration) -> SourceResult;
}

/// Map a non-success HTTP status into the fetch taxonomy.
///
/// 418 is Binance's IP-ban response and counts as rate limiting.
pub(crate) fn status_error(status: reqwest::StatusCode, body: &str) -> FetchError {
    match status.as_u16() {
        418 | 429 => FetchError::RateLimited,
        401 | 403 => FetchError::Auth(format!("HTTP {}: {}", status, truncate(body))),
        _ => FetchError::Network(format!("HTTP {}: {}", status, truncate(body))),
    }
}

/// Map a reqwest transport error, distinguishing the timeout case.
pub(crate) fn transport_error(err: reqwest::Error, timeout: Duration) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout(timeout)
    } else {
        FetchError::Network(err.to_string())
    }
}

/// Parse a string-encoded numeric field the way Binance serializes them.
pub(crate) fn parse_numeric(field: &str, raw: &str) -> Result<f64, FetchError> {
    raw.trim().parse::<f64>().map_err(|_| {
        FetchError::InvalidData(format!("{} is not numeric: {:?}", field, raw))
    })
}

fn truncate(body: &str) -> &str {
    let cut = body.len().min(200);
    // Respect char boundaries when the error body is not ASCII
    let mut end = cut;
    while end > 0 && !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}
