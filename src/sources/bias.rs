//! Market-bias adapter backed by an OpenAI-compatible endpoint
//!
//! Seeds the prompt with the symbol's most recent candles via its own
//! klines call, so the adapter stays independent of the market sources and
//! can run in the same parallel wave. Only constructed when an API key is
//! configured.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::config::LlmConfig;
use crate::error::FetchError;
use crate::sources::candles::fetch_klines;
use crate::sources::{status_error, transport_error, SourceAdapter};
use crate::types::{BiasReport, Candle, SourceKind, SourcePayload, SourceResult, Symbol};

/// Directional-bias analysis from a chat-completions endpoint.
pub struct BiasAdapter {
    http: Client,
    klines_url: String,
    candle_interval: String,
    api_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f64,
    prompt_candles: usize,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

impl BiasAdapter {
    pub fn new(
        http: Client,
        spot_url: &str,
        candle_interval: &str,
        llm: &LlmConfig,
        api_key: String,
    ) -> Self {
        Self {
            http,
            klines_url: spot_url.trim_end_matches('/').to_string(),
            candle_interval: candle_interval.to_string(),
            api_url: llm.api_url.clone(),
            api_key,
            model: llm.model.clone(),
            max_tokens: llm.max_tokens,
            temperature: llm.temperature,
            prompt_candles: llm.prompt_candles,
        }
    }

    fn build_prompt(symbol: &Symbol, candles: &[Candle]) -> String {
        let mut prompt = String::from(
            "You are a crypto technical analyst. Given the recent OHLC candles, \
             detect patterns (flags, triangles, double tops, head & shoulders) and \
             state a bias (bullish, bearish, neutral) with possible buy/sell signals.\n\n",
        );
        prompt.push_str(&format!(
            "{} recent candles (open,high,low,close,volume):\n",
            symbol
        ));
        for candle in candles {
            prompt.push_str(&format!(
                "[{},{},{},{},{}]\n",
                candle.open, candle.high, candle.low, candle.close, candle.volume
            ));
        }
        prompt
    }

    async fn complete(&self, prompt: String, timeout: Duration) -> Result<String, FetchError> {
        let request = serde_json::json!({
            "model": self.model,
            "messages": [{"role": "user", "content": prompt}],
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
        });

        let response = self
            .http
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| transport_error(e, timeout))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body));
        }

        let raw: ChatResponse = response
            .json()
            .await
            .map_err(|e| FetchError::InvalidData(format!("completion decode: {}", e)))?;

        let content = raw
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| FetchError::InvalidData("model returned no choices".into()))?;

        let content = content.trim().to_string();
        if content.is_empty() {
            return Err(FetchError::InvalidData("model returned empty analysis".into()));
        }
        Ok(content)
    }
}

#[async_trait]
impl SourceAdapter for BiasAdapter {
    fn kind(&self) -> SourceKind {
        SourceKind::Bias
    }

    async fn fetch(&self, symbol: &Symbol, timeout: Duration) -> SourceResult {
        // Two upstream calls share the budget
        let per_call = timeout / 2;

        let candles = fetch_klines(
            &self.http,
            &self.klines_url,
            symbol,
            &self.candle_interval,
            self.prompt_candles as u32,
            per_call,
        )
        .await?;
        if candles.is_empty() {
            return Err(FetchError::InvalidData("no candles to seed the prompt".into()));
        }

        let prompt = Self::build_prompt(symbol, &candles);
        let analysis = self.complete(prompt, per_call).await?;
        Ok(SourcePayload::Bias(BiasReport {
            model: self.model.clone(),
            analysis,
        }))
    }
}
