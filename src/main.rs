//! PulseBot - periodic Binance market snapshots delivered to Telegram

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pulsebot::{
    config::{AppConfig, Credentials},
    notify::Notifier,
    scheduler::Scheduler,
    sources::{BiasAdapter, CandlesAdapter, OpenInterestAdapter, SourceAdapter, TickerAdapter},
    worker::Worker,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Configuration or credential problems are fatal here, before the
    // first cycle; per-cycle failures only ever degrade snapshots.
    let config = AppConfig::load()?;
    config.validate()?;
    let credentials = Credentials::from_env()?;

    tracing::info!(digest = %config.digest(), "starting pulsebot");

    let http = reqwest::Client::builder()
        .user_agent(concat!("pulsebot/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to create HTTP client")?;

    // Capability-checked adapter set, fixed for the process lifetime
    let mut adapters: Vec<Arc<dyn SourceAdapter>> = vec![
        Arc::new(TickerAdapter::new(http.clone(), &config.binance.spot_url)),
        Arc::new(CandlesAdapter::new(
            http.clone(),
            &config.binance.spot_url,
            &config.binance.candle_interval,
            config.binance.candle_limit,
        )),
    ];
    if config.binance.open_interest_enabled {
        adapters.push(Arc::new(OpenInterestAdapter::new(
            http.clone(),
            &config.binance.futures_url,
        )));
    }
    match &credentials.openai_api_key {
        Some(key) => {
            adapters.push(Arc::new(BiasAdapter::new(
                http.clone(),
                &config.binance.spot_url,
                &config.binance.candle_interval,
                &config.llm,
                key.clone(),
            )));
            tracing::info!(model = %config.llm.model, "bias analysis enabled");
        }
        None => tracing::warn!("OPENAI_API_KEY not set, bias analysis disabled"),
    }

    let notifier = Notifier::new(
        http,
        &config.telegram,
        credentials.telegram_bot_token.clone(),
        credentials.telegram_chat_id.clone(),
    );
    if let Err(err) = notifier.startup(config.bot.poll_interval()).await {
        tracing::warn!(error = %err, "failed to send startup notification");
    }

    let worker = Worker::new(
        config.symbols(),
        adapters,
        config.bot.source_timeout(),
        notifier,
    );

    // Ctrl-C flips the stop flag; the scheduler finishes the in-flight
    // cycle and exits before starting another.
    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutdown signal received");
            let _ = stop_tx.send(true);
        }
    });

    let mut scheduler = Scheduler::new(config.bot.poll_interval(), stop_rx);
    scheduler.run(&worker).await;

    tracing::info!("pulsebot stopped");
    Ok(())
}
