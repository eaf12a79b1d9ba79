//! Alert deduplication
//!
//! Tracks when each symbol was last alerted and answers whether a new alert
//! falls inside the cooldown window. Storage problems never suppress an
//! alert: an unreadable store behaves as if it were empty.

pub mod sqlite;
pub mod store;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::config::{AlertBackend, AlertsConfig};

pub use sqlite::SqliteAlertStore;
pub use store::{AlertStore, AlertStoreError, JsonFileAlertStore, MemoryAlertStore};

// Largest cooldown chrono can represent as a duration
const MAX_COOLDOWN_MINUTES: u64 = (i64::MAX / 60_000) as u64;

pub struct AlertDeduplicator {
    store: Box<dyn AlertStore>,
}

impl AlertDeduplicator {
    pub fn new(store: Box<dyn AlertStore>) -> Self {
        AlertDeduplicator { store }
    }

    /// True iff `symbol` was alerted no more than `cooldown_minutes` ago
    pub fn was_recently_alerted(&self, symbol: &str, cooldown_minutes: u64) -> bool {
        self.was_recently_alerted_at(symbol, cooldown_minutes, Utc::now())
    }

    pub fn was_recently_alerted_at(
        &self,
        symbol: &str,
        cooldown_minutes: u64,
        now: DateTime<Utc>,
    ) -> bool {
        let last = match self.store.get(symbol) {
            Ok(Some(ts)) => ts,
            Ok(None) => return false,
            Err(e) => {
                warn!("Alert store read failed for {}, treating as not alerted: {}", symbol, e);
                return false;
            }
        };

        let cooldown = Duration::minutes(cooldown_minutes.min(MAX_COOLDOWN_MINUTES) as i64);
        let elapsed = now - last;
        debug!(
            "{} last alerted {} ({}s ago, cooldown {}m)",
            symbol,
            last,
            elapsed.num_seconds(),
            cooldown_minutes
        );
        elapsed <= cooldown
    }

    pub fn record_alert(&self, symbol: &str, timestamp: DateTime<Utc>) -> Result<(), AlertStoreError> {
        self.store.put(symbol, timestamp)
    }

    /// All recorded alerts, ordered by symbol
    pub fn history(&self) -> Result<BTreeMap<String, DateTime<Utc>>, AlertStoreError> {
        self.store.all()
    }
}

/// Open the configured alert store
pub fn open_store(config: &AlertsConfig) -> Result<Box<dyn AlertStore>> {
    let path = config.path();
    let store: Box<dyn AlertStore> = match config.backend {
        AlertBackend::Json => Box::new(JsonFileAlertStore::new(path)),
        AlertBackend::Sqlite => Box::new(
            SqliteAlertStore::open(path)
                .with_context(|| format!("Failed to open alert database: {}", path))?,
        ),
    };
    Ok(store)
}
