//! Candlestick adapter
//!
//! Fetches recent klines from the spot API. Binance encodes the numeric
//! kline fields as JSON strings inside a positional array; every row must
//! parse or the whole payload is rejected as invalid.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::error::FetchError;
use crate::sources::{status_error, transport_error, SourceAdapter};
use crate::types::{Candle, SourceKind, SourcePayload, SourceResult, Symbol};

/// Recent OHLCV candles from the spot klines endpoint.
pub struct CandlesAdapter {
    http: Client,
    base_url: String,
    interval: String,
    limit: u32,
}

impl CandlesAdapter {
    pub fn new(http: Client, base_url: &str, interval: &str, limit: u32) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            interval: interval.to_string(),
            limit,
        }
    }
}

#[async_trait]
impl SourceAdapter for CandlesAdapter {
    fn kind(&self) -> SourceKind {
        SourceKind::Candles
    }

    async fn fetch(&self, symbol: &Symbol, timeout: Duration) -> SourceResult {
        let candles = fetch_klines(
            &self.http,
            &self.base_url,
            symbol,
            &self.interval,
            self.limit,
            timeout,
        )
        .await?;
        Ok(SourcePayload::Candles(candles))
    }
}

/// Fetch and parse klines. Shared with the bias adapter, which seeds its
/// prompt from the same endpoint.
pub(crate) async fn fetch_klines(
    http: &Client,
    base_url: &str,
    symbol: &Symbol,
    interval: &str,
    limit: u32,
    timeout: Duration,
) -> Result<Vec<Candle>, FetchError> {
    let url = format!("{}/api/v3/klines", base_url.trim_end_matches('/'));
    let limit = limit.to_string();
    let response = http
        .get(&url)
        .query(&[
            ("symbol", symbol.as_str()),
            ("interval", interval),
            ("limit", limit.as_str()),
        ])
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| transport_error(e, timeout))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(status_error(status, &body));
    }

    // Response is an array of positional arrays:
    // [[open_time, open, high, low, close, volume, close_time, ...], ...]
    let rows: Vec<Vec<serde_json::Value>> = response
        .json()
        .await
        .map_err(|e| FetchError::InvalidData(format!("klines decode: {}", e)))?;

    parse_klines(rows)
}

pub(crate) fn parse_klines(rows: Vec<Vec<serde_json::Value>>) -> Result<Vec<Candle>, FetchError> {
    rows.iter()
        .enumerate()
        .map(|(i, row)| {
            parse_kline_row(row).map_err(|e| FetchError::InvalidData(format!("kline[{}]: {}", i, e)))
        })
        .collect()
}

fn parse_kline_row(row: &[serde_json::Value]) -> Result<Candle, String> {
    if row.len() < 7 {
        return Err(format!("expected at least 7 fields, got {}", row.len()));
    }
    Ok(Candle {
        open_time: int_field(&row[0], "open time")?,
        close_time: int_field(&row[6], "close time")?,
        open: str_field(&row[1], "open")?,
        high: str_field(&row[2], "high")?,
        low: str_field(&row[3], "low")?,
        close: str_field(&row[4], "close")?,
        volume: str_field(&row[5], "volume")?,
    })
}

fn int_field(value: &serde_json::Value, name: &str) -> Result<i64, String> {
    value
        .as_i64()
        .ok_or_else(|| format!("{} is not an integer", name))
}

fn str_field(value: &serde_json::Value, name: &str) -> Result<f64, String> {
    value
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| format!("{} is not a numeric string", name))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(2);

    const KLINES_BODY: &str = r#"[
        [1700000000000, "100.0", "105.0", "99.0", "104.0", "12.5", 1700000299999],
        [1700000300000, "104.0", "110.0", "103.5", "109.0", "20.0", 1700000599999]
    ]"#;

    #[tokio::test]
    async fn test_parses_kline_rows() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/v3/klines")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(KLINES_BODY)
            .create_async()
            .await;

        let adapter = CandlesAdapter::new(Client::new(), &server.url(), "5m", 50);
        match adapter.fetch(&Symbol::new("BTCUSDT"), TIMEOUT).await {
            Ok(SourcePayload::Candles(candles)) => {
                assert_eq!(candles.len(), 2);
                assert_eq!(candles[0].open, 100.0);
                assert_eq!(candles[1].close, 109.0);
                assert_eq!(candles[1].close_time, 1700000599999);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_short_row_is_invalid_data() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/v3/klines")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(r#"[[1700000000000, "100.0"]]"#)
            .create_async()
            .await;

        let adapter = CandlesAdapter::new(Client::new(), &server.url(), "5m", 50);
        let err = adapter
            .fetch(&Symbol::new("BTCUSDT"), TIMEOUT)
            .await
            .unwrap_err();
        match err {
            FetchError::InvalidData(msg) => assert!(msg.contains("kline[0]")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_non_numeric_field_is_invalid_data() {
        let rows: Vec<Vec<serde_json::Value>> = serde_json::from_str(
            r#"[[1700000000000, "abc", "105.0", "99.0", "104.0", "12.5", 1700000299999]]"#,
        )
        .unwrap();
        let err = parse_klines(rows).unwrap_err();
        assert!(matches!(err, FetchError::InvalidData(_)));
    }

    #[tokio::test]
    async fn test_upstream_error_status() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/v3/klines")
            .match_query(mockito::Matcher::Any)
            .with_status(503)
            .create_async()
            .await;

        let adapter = CandlesAdapter::new(Client::new(), &server.url(), "5m", 50);
        let err = adapter
            .fetch(&Symbol::new("BTCUSDT"), TIMEOUT)
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Network(_)));
    }
}
