//! Futures open interest adapter

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::error::FetchError;
use crate::sources::{parse_numeric, status_error, transport_error, SourceAdapter};
use crate::types::{OpenInterest, SourceKind, SourcePayload, SourceResult, Symbol};

/// Open interest from the futures API. Only constructed when enabled.
pub struct OpenInterestAdapter {
    http: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct OpenInterestResponse {
    #[serde(rename = "openInterest")]
    open_interest: String,
    time: i64,
}

impl OpenInterestAdapter {
    pub fn new(http: Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl SourceAdapter for OpenInterestAdapter {
    fn kind(&self) -> SourceKind {
        SourceKind::OpenInterest
    }

    async fn fetch(&self, symbol: &Symbol, timeout: Duration) -> SourceResult {
        let url = format!("{}/fapi/v1/openInterest", self.base_url);
        let response = self
            .http
            .get(&url)
            .query(&[("symbol", symbol.as_str())])
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| transport_error(e, timeout))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body));
        }

        let raw: OpenInterestResponse = response
            .json()
            .await
            .map_err(|e| FetchError::InvalidData(format!("open interest decode: {}", e)))?;

        Ok(SourcePayload::OpenInterest(OpenInterest {
            value: parse_numeric("openInterest", &raw.open_interest)?,
            ts: raw.time,
        }))
    }
}
