//! Alert record storage
//!
//! A flat mapping from symbol to the UTC time of the last delivered alert.
//! Backends only need `get`/`put`; the file backend reads and rewrites the
//! whole mapping on every mutation.

use chrono::{DateTime, NaiveDateTime, Utc};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum AlertStoreError {
    #[error("alert store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("alert store is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("alert database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Key-value store for last-alert timestamps
pub trait AlertStore: Send + Sync {
    fn get(&self, symbol: &str) -> Result<Option<DateTime<Utc>>, AlertStoreError>;

    /// Overwrite the record for `symbol`
    fn put(&self, symbol: &str, timestamp: DateTime<Utc>) -> Result<(), AlertStoreError>;

    /// Every record, ordered by symbol
    fn all(&self) -> Result<BTreeMap<String, DateTime<Utc>>, AlertStoreError>;
}

/// Parse a stored timestamp. Strings without an offset are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|ndt| ndt.and_utc())
}

pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339()
}

// =============================================================================
// JSON file backend
// =============================================================================

/// `{"SYMBOL": "2024-01-01T09:15:00+00:00", ...}` on disk
pub struct JsonFileAlertStore {
    path: PathBuf,
    // serialises read-modify-write cycles from this process
    write_lock: Mutex<()>,
}

impl JsonFileAlertStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        JsonFileAlertStore {
            path: path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, DateTime<Utc>>, AlertStoreError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }

        let contents = std::fs::read_to_string(&self.path)?;
        let raw: BTreeMap<String, String> = serde_json::from_str(&contents)?;

        let mut records = BTreeMap::new();
        for (symbol, value) in raw {
            match parse_timestamp(&value) {
                Some(ts) => {
                    records.insert(symbol, ts);
                }
                None => warn!("Ignoring unparseable alert timestamp for {}: {:?}", symbol, value),
            }
        }
        Ok(records)
    }

    fn save(&self, records: &BTreeMap<String, DateTime<Utc>>) -> Result<(), AlertStoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let raw: BTreeMap<&str, String> = records
            .iter()
            .map(|(symbol, ts)| (symbol.as_str(), format_timestamp(ts)))
            .collect();

        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, serde_json::to_string_pretty(&raw)?)?;
        std::fs::rename(&tmp_path, &self.path)?;

        debug!("Alert records written to {}", self.path.display());
        Ok(())
    }
}

impl AlertStore for JsonFileAlertStore {
    fn get(&self, symbol: &str) -> Result<Option<DateTime<Utc>>, AlertStoreError> {
        Ok(self.load()?.get(symbol).copied())
    }

    fn put(&self, symbol: &str, timestamp: DateTime<Utc>) -> Result<(), AlertStoreError> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());

        let mut records = self.load().unwrap_or_else(|e| {
            warn!("Alert store unreadable, starting fresh: {}", e);
            BTreeMap::new()
        });
        records.insert(symbol.to_string(), timestamp);
        self.save(&records)
    }

    fn all(&self) -> Result<BTreeMap<String, DateTime<Utc>>, AlertStoreError> {
        self.load()
    }
}

// =============================================================================
// In-memory backend
// =============================================================================

#[derive(Default)]
pub struct MemoryAlertStore {
    records: Mutex<BTreeMap<String, DateTime<Utc>>>,
}

impl MemoryAlertStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AlertStore for MemoryAlertStore {
    fn get(&self, symbol: &str) -> Result<Option<DateTime<Utc>>, AlertStoreError> {
        let records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        Ok(records.get(symbol).copied())
    }

    fn put(&self, symbol: &str, timestamp: DateTime<Utc>) -> Result<(), AlertStoreError> {
        let mut records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        records.insert(symbol.to_string(), timestamp);
        Ok(())
    }

    fn all(&self) -> Result<BTreeMap<String, DateTime<Utc>>, AlertStoreError> {
        let records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        Ok(records.clone())
    }
}
