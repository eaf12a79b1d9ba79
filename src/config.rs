//! Configuration management
//!
//! Handles loading and parsing of JSON configuration files with environment
//! variable support for Telegram credentials.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::signal::DetectorParams;

pub const TELEGRAM_BOT_TOKEN_ENV: &str = "TELEGRAM_BOT_TOKEN";
pub const TELEGRAM_CHAT_ID_ENV: &str = "TELEGRAM_CHAT_ID";

/// Main configuration structure
///
/// Every section is optional in the file and falls back to its defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub watch: WatchConfig,
    pub data: DataConfig,
    pub telegram: TelegramConfig,
    pub alerts: AlertsConfig,
    pub signal: DetectorParams,
}

impl Config {
    /// Load configuration from JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref()).with_context(|| {
            format!("Failed to read config file: {}", path.as_ref().display())
        })?;
        let mut config = Self::from_json(&contents)?;
        config.apply_env();
        Ok(config)
    }

    pub fn from_json(contents: &str) -> Result<Self> {
        serde_json::from_str(contents).context("Failed to parse config JSON")
    }

    /// Load Telegram credentials from environment if set
    pub fn apply_env(&mut self) {
        if let Ok(token) = std::env::var(TELEGRAM_BOT_TOKEN_ENV) {
            self.telegram.bot_token = Some(token);
        }
        if let Ok(chat_id) = std::env::var(TELEGRAM_CHAT_ID_ENV) {
            self.telegram.chat_id = Some(chat_id);
        }
    }
}

/// Which symbols to watch and how often
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    pub symbols: Vec<String>,
    /// Minimum minutes between two delivered alerts for the same symbol
    pub cooldown_minutes: u64,
    /// Candle interval requested from the source
    pub interval: String,
    /// Number of candles requested per check
    pub limit: usize,
    /// Seconds between cycles in `watch` mode
    pub check_interval_secs: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        WatchConfig {
            symbols: Vec::new(),
            cooldown_minutes: 30,
            interval: "5m".to_string(),
            limit: 200,
            check_interval_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSourceKind {
    /// CoinDCX public candles endpoint; symbols are INR markets
    /// (`BTCINR`) or full pair codes (`B-BTC_USDT`)
    Coindcx,
    /// `{data_dir}/{symbol}_{interval}.csv`
    Csv,
    /// Synthetic random walk, no network
    Demo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub source: DataSourceKind,
    pub data_dir: String,
    pub timeout_secs: u64,
}

impl Default for DataConfig {
    fn default() -> Self {
        DataConfig {
            source: DataSourceKind::Demo,
            data_dir: "data".to_string(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bot_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<String>,
    pub timeout_secs: u64,
    /// Prefix for prices in alert messages
    pub currency_symbol: String,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        TelegramConfig {
            bot_token: None,
            chat_id: None,
            timeout_secs: 10,
            currency_symbol: "₹".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertBackend {
    Json,
    Sqlite,
}

impl AlertBackend {
    pub fn default_path(self) -> &'static str {
        match self {
            AlertBackend::Json => "alerts_sent.json",
            AlertBackend::Sqlite => "alerts.db",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertsConfig {
    pub backend: AlertBackend,
    /// Defaults to the backend's own file name when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl AlertsConfig {
    pub fn path(&self) -> &str {
        self.path
            .as_deref()
            .unwrap_or_else(|| self.backend.default_path())
    }
}

impl Default for AlertsConfig {
    fn default() -> Self {
        AlertsConfig {
            backend: AlertBackend::Json,
            path: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_json("{}").unwrap();
        assert_eq!(config.watch.cooldown_minutes, 30);
        assert_eq!(config.watch.interval, "5m");
        assert_eq!(config.watch.limit, 200);
        assert_eq!(config.data.source, DataSourceKind::Demo);
        assert_eq!(config.data.timeout_secs, 10);
        assert_eq!(config.alerts.backend, AlertBackend::Json);
        assert_eq!(config.alerts.path(), "alerts_sent.json");
        assert_eq!(config.signal, DetectorParams::default());
    }

    #[test]
    fn test_partial_sections() {
        let config = Config::from_json(
            r#"{
                "watch": { "symbols": ["NIFTY", "BANKNIFTY"], "cooldown_minutes": 15 },
                "data": { "source": "csv", "data_dir": "candles" },
                "telegram": { "bot_token": "123:abc", "chat_id": "-10042" },
                "alerts": { "backend": "sqlite", "path": "state/alerts.db" },
                "signal": { "rsi_threshold": 60.0, "ema_fast": 8 }
            }"#,
        )
        .unwrap();

        assert_eq!(config.watch.symbols, vec!["NIFTY", "BANKNIFTY"]);
        assert_eq!(config.watch.cooldown_minutes, 15);
        assert_eq!(config.watch.limit, 200);
        assert_eq!(config.data.source, DataSourceKind::Csv);
        assert_eq!(config.telegram.chat_id.as_deref(), Some("-10042"));
        assert_eq!(config.alerts.backend, AlertBackend::Sqlite);
        assert_eq!(config.alerts.path(), "state/alerts.db");
        assert_eq!(config.signal.rsi_threshold, 60.0);
        assert_eq!(config.signal.indicators.ema_fast, 8);
        assert_eq!(config.signal.indicators.ema_slow, 21);
    }

    #[test]
    fn test_alert_path_follows_backend() {
        let config = Config::from_json(r#"{ "alerts": { "backend": "sqlite" } }"#).unwrap();
        assert_eq!(config.alerts.path(), "alerts.db");

        let config = Config::from_json(r#"{ "data": { "source": "coindcx" } }"#).unwrap();
        assert_eq!(config.data.source, DataSourceKind::Coindcx);
        assert_eq!(config.alerts.path(), "alerts_sent.json");
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        assert!(Config::from_json("{ watch: ").is_err());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(Config::from_file("/definitely/not/here/config.json").is_err());
    }
}
