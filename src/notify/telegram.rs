//! Telegram Bot API notifier

use super::{Notifier, NotifyError};
use crate::config::TelegramConfig;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
    disable_web_page_preview: bool,
}

/// Envelope returned by every Bot API method
#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Posts HTML messages to one chat through the Bot API
pub struct TelegramNotifier {
    api_url: String,
    bot_token: String,
    chat_id: String,
    client: Client,
}

impl TelegramNotifier {
    /// Create a notifier from validated configuration
    pub fn new(config: &TelegramConfig) -> Result<Self, NotifyError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            api_url: config.api_url.trim_end_matches('/').to_string(),
            bot_token: config.bot_token.clone(),
            chat_id: config.chat_id.clone(),
            client,
        })
    }

    fn send_message_url(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_url, self.bot_token)
    }

    pub fn chat_id(&self) -> &str {
        &self.chat_id
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, text: &str) -> Result<(), NotifyError> {
        let body = SendMessage {
            chat_id: &self.chat_id,
            text,
            parse_mode: "HTML",
            disable_web_page_preview: false,
        };

        // The URL carries the bot token, so it is stripped from transport errors.
        let response = self
            .client
            .post(self.send_message_url())
            .json(&body)
            .send()
            .await
            .map_err(reqwest::Error::without_url)?;

        let status = response.status();
        let raw = response.text().await.map_err(reqwest::Error::without_url)?;
        check_ack(status, &raw)?;

        tracing::debug!(chat_id = %self.chat_id, length = text.len(), "Telegram message sent");
        Ok(())
    }
}

/// Delivery counts only when the status is a success and the body is `{"ok": true}`
fn check_ack(status: reqwest::StatusCode, raw: &str) -> Result<(), NotifyError> {
    let ack = parse_ack(raw);

    if !status.is_success() {
        return Err(NotifyError::Status {
            status,
            description: ack
                .and_then(|a| a.description)
                .unwrap_or_else(|| "no description".to_string()),
        });
    }

    match ack {
        Some(ApiResponse { ok: true, .. }) => Ok(()),
        Some(ApiResponse { description, .. }) => Err(NotifyError::NotAcknowledged(
            description.unwrap_or_else(|| "ok=false".to_string()),
        )),
        None => Err(NotifyError::NotAcknowledged(format!(
            "unparseable response: {}",
            truncate(raw, 200)
        ))),
    }
}

fn parse_ack(raw: &str) -> Option<ApiResponse> {
    serde_json::from_str(raw).ok()
}

fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}
