//! Error taxonomy for source fetches and notification delivery
//!
//! Adapter failures are captured as `FetchError` and travel inside the
//! snapshot; they never cross the aggregator as propagated errors. Delivery
//! failures split into transient (retryable) and rejected (permanent).

use std::time::Duration;

use thiserror::Error;

/// Failure modes of a single source fetch.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// Transport-level failure or an unexpected HTTP status.
    #[error("network error: {0}")]
    Network(String),
    /// The call did not complete within its budget.
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    /// The upstream answered, but the payload is unusable.
    #[error("invalid data: {0}")]
    InvalidData(String),
    /// Upstream asked us to back off (HTTP 418/429).
    #[error("rate limited by upstream")]
    RateLimited,
    /// Credentials were rejected for this call.
    #[error("authentication rejected: {0}")]
    Auth(String),
}

impl FetchError {
    /// Stable tag for structured logging.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Network(_) => "network",
            FetchError::Timeout(_) => "timeout",
            FetchError::InvalidData(_) => "invalid_data",
            FetchError::RateLimited => "rate_limited",
            FetchError::Auth(_) => "auth",
        }
    }
}

/// Failure modes of a notification delivery attempt.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// Worth retrying: network trouble, 5xx, or a rate limit.
    #[error("transient delivery failure: {0}")]
    Transient(String),
    /// Not worth retrying: the sink rejected the request outright.
    #[error("delivery rejected (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },
}

impl DeliveryError {
    pub fn is_transient(&self) -> bool {
        matches!(self, DeliveryError::Transient(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_error_kinds_are_stable() {
        assert_eq!(FetchError::RateLimited.kind(), "rate_limited");
        assert_eq!(
            FetchError::Timeout(Duration::from_secs(10)).kind(),
            "timeout"
        );
        assert_eq!(FetchError::InvalidData("x".into()).kind(), "invalid_data");
    }

    #[test]
    fn rejection_is_not_transient() {
        let err = DeliveryError::Rejected {
            status: 403,
            message: "forbidden".into(),
        };
        assert!(!err.is_transient());
        assert!(DeliveryError::Transient("reset".into()).is_transient());
    }
}
