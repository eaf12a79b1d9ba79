//! Alert delivery
//!
//! Telegram Bot API sender plus a log-only sender for dry runs. Delivery is a
//! single blocking attempt; callers decide what a failure means.

use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::TelegramConfig;

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

#[derive(Debug, Error)]
pub enum NotifyError {
    /// Configuration problem, raised before any delivery is attempted
    #[error("missing Telegram credentials: {0}")]
    MissingCredentials(&'static str),

    /// Transport failure. The request URL is stripped since it carries the token.
    #[error("HTTP error: {0}")]
    Http(reqwest::Error),

    #[error("Telegram rejected message ({status}): {body}")]
    Rejected { status: u16, body: String },
}

impl NotifyError {
    fn http(e: reqwest::Error) -> Self {
        NotifyError::Http(e.without_url())
    }

    pub fn is_config_error(&self) -> bool {
        matches!(self, NotifyError::MissingCredentials(_))
    }
}

/// Delivers a rendered message to a destination
pub trait Notifier: Send + Sync {
    fn send(&self, destination: &str, text: &str) -> Result<(), NotifyError>;

    /// False when `send` only pretends; such sends are never recorded as alerts
    fn delivers(&self) -> bool {
        true
    }
}

// =============================================================================
// Telegram
// =============================================================================

pub struct TelegramNotifier {
    client: reqwest::blocking::Client,
    api_base: String,
    bot_token: String,
}

#[derive(Debug, serde::Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
}

impl TelegramNotifier {
    pub fn new(bot_token: impl Into<String>, timeout: Duration) -> Result<Self, NotifyError> {
        let bot_token = bot_token.into();
        if bot_token.trim().is_empty() {
            return Err(NotifyError::MissingCredentials("bot_token"));
        }

        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(NotifyError::http)?;
        Ok(TelegramNotifier {
            client,
            api_base: TELEGRAM_API_BASE.to_string(),
            bot_token,
        })
    }

    /// Point at a different Bot API host (self-hosted server, tests)
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Build the notifier and resolve the destination chat from config
    pub fn from_config(config: &TelegramConfig) -> Result<(Self, String), NotifyError> {
        let token = config
            .bot_token
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or(NotifyError::MissingCredentials("bot_token"))?;
        let chat_id = config
            .chat_id
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .ok_or(NotifyError::MissingCredentials("chat_id"))?;

        let notifier = Self::new(token, Duration::from_secs(config.timeout_secs))?;
        Ok((notifier, chat_id.to_string()))
    }
}

impl Notifier for TelegramNotifier {
    fn send(&self, destination: &str, text: &str) -> Result<(), NotifyError> {
        let url = format!("{}/bot{}/sendMessage", self.api_base, self.bot_token);
        let payload = SendMessage {
            chat_id: destination,
            text,
            parse_mode: "HTML",
        };

        let response = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .map_err(NotifyError::http)?;
        let status = response.status();

        if status.is_success() {
            debug!("Telegram message delivered to {}", destination);
            return Ok(());
        }

        let body = response.text().unwrap_or_default();
        warn!("Telegram returned {} for chat {}: {}", status, destination, body);
        Err(NotifyError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}

// =============================================================================
// Dry run
// =============================================================================

/// Logs messages instead of sending them
#[derive(Debug, Default)]
pub struct DryRunNotifier;

impl Notifier for DryRunNotifier {
    fn send(&self, destination: &str, text: &str) -> Result<(), NotifyError> {
        info!("[dry-run] alert for {}:\n{}", destination, text);
        Ok(())
    }

    fn delivers(&self) -> bool {
        false
    }
}
