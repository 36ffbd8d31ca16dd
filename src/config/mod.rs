//! Configuration management for PulseBot
//!
//! Loads from config files + environment variables via .env

use std::time::Duration;

use anyhow::{bail, Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::types::Symbol;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub bot: BotConfig,
    pub binance: BinanceConfig,
    pub llm: LlmConfig,
    pub telegram: TelegramConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    /// Trading pairs to poll
    pub symbols: Vec<String>,
    /// Seconds between polling cycles
    pub poll_interval_secs: u64,
    /// Per-source fetch budget in seconds
    pub source_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BinanceConfig {
    /// Spot REST API base URL
    pub spot_url: String,
    /// Futures REST API base URL
    pub futures_url: String,
    /// Poll futures open interest
    pub open_interest_enabled: bool,
    /// Kline interval for the candles source
    pub candle_interval: String,
    /// Klines per candles fetch
    pub candle_limit: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    /// Chat-completions endpoint URL
    pub api_url: String,
    /// Model name (env OPENAI_MODEL overrides)
    pub model: String,
    /// Completion token cap
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f64,
    /// Candles included in the prompt
    pub prompt_candles: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramConfig {
    /// Bot API base URL
    pub api_url: String,
    /// Message parse mode
    pub parse_mode: String,
    /// Delivery attempts per message
    pub max_attempts: u32,
    /// Base backoff between attempts in milliseconds
    pub backoff_base_ms: u64,
}

/// Secrets resolved from plain environment variables at startup.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub telegram_bot_token: String,
    pub telegram_chat_id: String,
    /// Absent key disables the bias source for the process lifetime
    pub openai_api_key: Option<String>,
}

impl Credentials {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            telegram_bot_token: require_env("TELEGRAM_BOT_TOKEN")?,
            telegram_chat_id: require_env("TELEGRAM_CHAT_ID")?,
            openai_api_key: std::env::var("OPENAI_API_KEY")
                .ok()
                .filter(|v| !v.trim().is_empty()),
        })
    }
}

fn require_env(var: &str) -> Result<String> {
    match std::env::var(var) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => bail!("Required environment variable {} is not set", var),
    }
}

impl AppConfig {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self> {
        // Load .env file first
        dotenvy::dotenv().ok();

        let config = Config::builder()
            // Bot defaults
            .set_default("bot.symbols", vec!["BTCUSDT", "ETHUSDT", "SOLUSDT"])?
            .set_default("bot.poll_interval_secs", 300)?
            .set_default("bot.source_timeout_secs", 10)?
            // Binance defaults
            .set_default("binance.spot_url", "https://api.binance.com")?
            .set_default("binance.futures_url", "https://fapi.binance.com")?
            .set_default("binance.open_interest_enabled", true)?
            .set_default("binance.candle_interval", "5m")?
            .set_default("binance.candle_limit", 50)?
            // LLM defaults
            .set_default("llm.api_url", "https://api.openai.com/v1/chat/completions")?
            .set_default("llm.model", "gpt-4o-mini")?
            .set_default("llm.max_tokens", 200)?
            .set_default("llm.temperature", 0.3)?
            .set_default("llm.prompt_candles", 10)?
            // Telegram defaults
            .set_default("telegram.api_url", "https://api.telegram.org")?
            .set_default("telegram.parse_mode", "Markdown")?
            .set_default("telegram.max_attempts", 3)?
            .set_default("telegram.backoff_base_ms", 500)?
            // Load config file if exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // Override with environment variables (PULSEBOT_*)
            .add_source(Environment::with_prefix("PULSEBOT").separator("__"))
            .build()
            .context("Failed to build configuration")?;

        let mut app_config: AppConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        // Legacy env knobs kept from the original worker contract
        if let Ok(raw) = std::env::var("POLL_INTERVAL") {
            app_config.bot.poll_interval_secs = raw
                .trim()
                .parse()
                .context("POLL_INTERVAL must be an integer number of seconds")?;
        }
        if let Ok(model) = std::env::var("OPENAI_MODEL") {
            if !model.trim().is_empty() {
                app_config.llm.model = model;
            }
        }

        Ok(app_config)
    }

    /// Validate parameters that would break the polling loop
    pub fn validate(&self) -> Result<()> {
        if self.bot.symbols.is_empty() {
            bail!("At least one symbol must be configured");
        }
        if self.bot.poll_interval_secs == 0 {
            bail!("Poll interval must be at least 1 second");
        }
        if self.bot.source_timeout_secs == 0 {
            bail!("Per-source timeout must be at least 1 second");
        }
        if self.telegram.max_attempts == 0 {
            bail!("Notifier must be allowed at least one delivery attempt");
        }
        if self.binance.candle_limit == 0 {
            bail!("Candle limit must be at least 1");
        }
        Ok(())
    }

    /// Generate a digest of the config (without secrets) for logging
    pub fn digest(&self) -> String {
        format!(
            "symbols={:?} interval={}s timeout={}s oi={} model={}",
            self.bot.symbols,
            self.bot.poll_interval_secs,
            self.bot.source_timeout_secs,
            self.binance.open_interest_enabled,
            self.llm.model
        )
    }

    pub fn symbols(&self) -> Vec<Symbol> {
        self.bot.symbols.iter().map(Symbol::new).collect()
    }
}

impl BotConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn source_timeout(&self) -> Duration {
        Duration::from_secs(self.source_timeout_secs)
    }
}

impl TelegramConfig {
    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }
}

impl std::fmt::Display for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.digest())
    }
}
