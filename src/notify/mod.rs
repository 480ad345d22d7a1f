//! Notification module
//!
//! Delivers formatted alerts to a single Telegram chat

mod console;
mod format;
mod telegram;

pub use console::ConsoleNotifier;
pub use format::{alert_message, escape_html, format_usd, minutes_label, startup_message};
pub use telegram::TelegramNotifier;

use async_trait::async_trait;
use thiserror::Error;

/// Delivery failure. The address stays unmarked and is retried next cycle.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("notification endpoint returned {status}: {description}")]
    Status {
        status: reqwest::StatusCode,
        description: String,
    },
    #[error("message not acknowledged: {0}")]
    NotAcknowledged(String),
}

/// Trait for notification sinks
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send one rich-text message. `Ok` only on an affirmative acknowledgment.
    async fn send(&self, text: &str) -> Result<(), NotifyError>;
}
