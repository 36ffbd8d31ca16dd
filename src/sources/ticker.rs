//! Spot 24h ticker adapter
//!
//! Pulls the rolling 24h statistics for a symbol and derives the percent
//! change from the window open explicitly instead of trusting the
//! upstream's precomputed field.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::error::FetchError;
use crate::sources::{parse_numeric, status_error, transport_error, SourceAdapter};
use crate::types::{percent_change, SourceKind, SourcePayload, SourceResult, Symbol, TickerStats};

/// 24h rolling-window ticker from the spot API.
pub struct TickerAdapter {
    http: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct Ticker24h {
    #[serde(rename = "openPrice")]
    open_price: String,
    #[serde(rename = "lastPrice")]
    last_price: String,
    #[serde(rename = "highPrice")]
    high_price: String,
    #[serde(rename = "lowPrice")]
    low_price: String,
    volume: String,
}

impl TickerAdapter {
    pub fn new(http: Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl SourceAdapter for TickerAdapter {
    fn kind(&self) -> SourceKind {
        SourceKind::Ticker
    }

    async fn fetch(&self, symbol: &Symbol, timeout: Duration) -> SourceResult {
        let url = format!("{}/api/v3/ticker/24hr", self.base_url);
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

        let raw: Ticker24h = response
            .json()
            .await
            .map_err(|e| FetchError::InvalidData(format!("ticker decode: {}", e)))?;

        let open = parse_numeric("openPrice", &raw.open_price)?;
        let last = parse_numeric("lastPrice", &raw.last_price)?;
        Ok(SourcePayload::Ticker(TickerStats {
            last,
            open,
            high: parse_numeric("highPrice", &raw.high_price)?,
            low: parse_numeric("lowPrice", &raw.low_price)?,
            volume: parse_numeric("volume", &raw.volume)?,
            pct_change: percent_change(open, last)?,
        }))
    }
}
