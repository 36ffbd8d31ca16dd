//! Telegram notifier with bounded retry
//!
//! Delivers one pre-formatted message per cycle to a fixed chat. Transient
//! failures (network, 5xx, 429) are retried with exponential backoff and
//! jitter up to a configured attempt cap; permanent rejections are not
//! retried at all.

mod format;

pub use format::{render_cycle, NotificationMessage};

use std::time::Duration;

use rand::Rng;
use reqwest::Client;
use serde::Serialize;

use crate::config::TelegramConfig;
use crate::error::DeliveryError;

/// Upper bound on the random jitter added to each backoff step.
const JITTER_MS: u64 = 250;

/// Telegram sink for snapshot messages.
pub struct Notifier {
    http: Client,
    api_url: String,
    bot_token: String,
    chat_id: String,
    parse_mode: String,
    max_attempts: u32,
    backoff_base: Duration,
}

#[derive(Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
}

impl Notifier {
    pub fn new(http: Client, config: &TelegramConfig, bot_token: String, chat_id: String) -> Self {
        Self {
            http,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            bot_token,
            chat_id,
            parse_mode: config.parse_mode.clone(),
            max_attempts: config.max_attempts.max(1),
            backoff_base: config.backoff_base(),
        }
    }

    /// Announce the worker coming online, before the first cycle.
    pub async fn startup(&self, interval: Duration) -> Result<(), DeliveryError> {
        self.deliver(&format!(
            "*PulseBot online* — snapshots every {}s",
            interval.as_secs()
        ))
        .await
    }

    /// Deliver `text`, retrying transient failures up to the attempt cap.
    pub async fn deliver(&self, text: &str) -> Result<(), DeliveryError> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.send_once(text).await {
                Ok(()) => {
                    tracing::debug!(attempt, "notification delivered");
                    return Ok(());
                }
                Err(err) if err.is_transient() && attempt < self.max_attempts => {
                    let delay = self.backoff_delay(attempt);
                    tracing::warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "transient delivery failure, backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn send_once(&self, text: &str) -> Result<(), DeliveryError> {
        let url = format!("{}/bot{}/sendMessage", self.api_url, self.bot_token);
        let request = SendMessageRequest {
            chat_id: &self.chat_id,
            text,
            parse_mode: &self.parse_mode,
        };

        let response = self
            .http
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| DeliveryError::Transient(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        if status.as_u16() == 429 || status.is_server_error() {
            Err(DeliveryError::Transient(format!("HTTP {}: {}", status, body)))
        } else {
            Err(DeliveryError::Rejected {
                status: status.as_u16(),
                message: body,
            })
        }
    }

    fn backoff_delay(&self, attempt: u32) -> Duration {
        let exp = self.backoff_base.saturating_mul(1u32 << (attempt - 1).min(4));
        let jitter = Duration::from_millis(rand::thread_rng().gen_range(0..=JITTER_MS));
        exp + jitter
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_notifier(server: &mockito::ServerGuard, max_attempts: u32) -> Notifier {
        Notifier {
            http: Client::new(),
            api_url: server.url(),
            bot_token: "TESTTOKEN".into(),
            chat_id: "42".into(),
            parse_mode: "Markdown".into(),
            max_attempts,
            backoff_base: Duration::from_millis(5),
        }
    }

    #[tokio::test]
    async fn test_delivers_on_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/botTESTTOKEN/sendMessage")
            .with_status(200)
            .with_body(r#"{"ok":true}"#)
            .expect(1)
            .create_async()
            .await;

        let notifier = make_notifier(&server, 3);
        assert!(notifier.deliver("*hello*").await.is_ok());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_retries_exactly_max_attempts_on_transient() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/botTESTTOKEN/sendMessage")
            .with_status(502)
            .with_body("bad gateway")
            .expect(3)
            .create_async()
            .await;

        let notifier = make_notifier(&server, 3);
        let err = notifier.deliver("*hello*").await.unwrap_err();
        assert!(err.is_transient());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_no_retry_on_permanent_rejection() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/botTESTTOKEN/sendMessage")
            .with_status(403)
            .with_body(r#"{"ok":false,"description":"bot was blocked"}"#)
            .expect(1)
            .create_async()
            .await;

        let notifier = make_notifier(&server, 3);
        match notifier.deliver("*hello*").await {
            Err(DeliveryError::Rejected { status, .. }) => assert_eq!(status, 403),
            other => panic!("unexpected outcome: {:?}", other),
        }
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_rate_limit_counts_as_transient() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/botTESTTOKEN/sendMessage")
            .with_status(429)
            .with_body(r#"{"ok":false,"description":"Too Many Requests"}"#)
            .expect(2)
            .create_async()
            .await;

        let notifier = make_notifier(&server, 2);
        let err = notifier.deliver("*hello*").await.unwrap_err();
        assert!(err.is_transient());
        mock.assert_async().await;
    }

    #[test]
    fn test_backoff_grows_and_stays_bounded() {
        let notifier = Notifier {
            http: Client::new(),
            api_url: "http://localhost".into(),
            bot_token: "t".into(),
            chat_id: "c".into(),
            parse_mode: "Markdown".into(),
            max_attempts: 3,
            backoff_base: Duration::from_millis(500),
        };
        let first = notifier.backoff_delay(1);
        let second = notifier.backoff_delay(2);
        assert!(first >= Duration::from_millis(500));
        assert!(first <= Duration::from_millis(500 + JITTER_MS));
        assert!(second >= Duration::from_millis(1000));
        assert!(second <= Duration::from_millis(1000 + JITTER_MS));
    }
}
