use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Serialize;

use crate::config::TelegramConfig;

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("Telegram rejected the message with status {status}: {body}")]
    Rejected { status: StatusCode, body: String },
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
}

/// Sends messages through the Telegram Bot API in HTML parse mode.
#[derive(Debug, Clone)]
pub struct TelegramNotifier {
    client: Client,
    config: TelegramConfig,
}

impl TelegramNotifier {
    pub fn new(config: TelegramConfig) -> Result<Self, NotifyError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(format!(
                "{}/{}",
                env!("CARGO_PKG_NAME"),
                env!("CARGO_PKG_VERSION")
            ))
            .build()?;

        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/bot{}/sendMessage",
            self.config.api_base.trim_end_matches('/'),
            self.config.token
        )
    }

    pub async fn send(&self, text: &str) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(self.endpoint())
            .json(&SendMessage {
                chat_id: &self.config.chat_id,
                text,
                parse_mode: "HTML",
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected { status, body });
        }
        Ok(())
    }

    /// Delivers `text`, logging instead of failing. Returns whether it was sent.
    pub async fn notify(&self, text: &str) -> bool {
        match self.send(text).await {
            Ok(()) => {
                log::info!("Telegram notification sent");
                true
            }
            Err(e) => {
                log::warn!("Failed to send Telegram notification: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn telegram() -> TelegramConfig {
        TelegramConfig::from_parts(Some("123:abc".into()), Some("42".into())).unwrap()
    }

    #[test]
    fn test_endpoint() {
        assert_eq!(
            TelegramNotifier::new(telegram()).unwrap().endpoint(),
            "https://api.telegram.org/bot123:abc/sendMessage"
        );
        let local = telegram().with_api_base("http://localhost:8081/");
        assert_eq!(
            TelegramNotifier::new(local).unwrap().endpoint(),
            "http://localhost:8081/bot123:abc/sendMessage"
        );
    }

    #[test]
    fn test_payload_shape() {
        let payload = SendMessage {
            chat_id: "42",
            text: "<b>hi</b>",
            parse_mode: "HTML",
        };
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            serde_json::json!({"chat_id": "42", "text": "<b>hi</b>", "parse_mode": "HTML"})
        );
    }

    #[tokio::test]
    async fn test_notify_swallows_failures() {
        let notifier =
            TelegramNotifier::new(telegram().with_api_base("http://127.0.0.1:9")).unwrap();
        assert!(!notifier.notify("hello").await);
    }
}
