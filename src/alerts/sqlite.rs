// SQLite-backed alert records
//
// One row per symbol; a delivery replaces the row.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info, warn};

use super::store::{format_timestamp, parse_timestamp, AlertStore, AlertStoreError};

pub struct SqliteAlertStore {
    conn: Mutex<Connection>,
}

impl SqliteAlertStore {
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self, AlertStoreError> {
        let db_path = db_path.as_ref();

        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(db_path)?;
        // Enable WAL mode for better concurrency
        conn.pragma_update(None, "journal_mode", "WAL")?;

        let store = Self::with_connection(conn)?;
        info!("SQLite alert store initialized at {}", db_path.display());
        Ok(store)
    }

    pub fn in_memory() -> Result<Self, AlertStoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, AlertStoreError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS alerts (
                symbol TEXT PRIMARY KEY,
                last_alert TEXT NOT NULL,
                updated_at TEXT DEFAULT CURRENT_TIMESTAMP
            )",
            [],
        )?;
        debug!("Alert schema created/verified");

        Ok(SqliteAlertStore {
            conn: Mutex::new(conn),
        })
    }
}

impl AlertStore for SqliteAlertStore {
    fn get(&self, symbol: &str) -> Result<Option<DateTime<Utc>>, AlertStoreError> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        let raw: Option<String> = conn
            .query_row(
                "SELECT last_alert FROM alerts WHERE symbol = ?1",
                params![symbol],
                |row| row.get(0),
            )
            .optional()?;

        Ok(raw.and_then(|r| {
            let parsed = parse_timestamp(&r);
            if parsed.is_none() {
                warn!("Ignoring unparseable alert timestamp for {}: {:?}", symbol, r);
            }
            parsed
        }))
    }

    fn put(&self, symbol: &str, timestamp: DateTime<Utc>) -> Result<(), AlertStoreError> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        conn.execute(
            "INSERT OR REPLACE INTO alerts (symbol, last_alert, updated_at)
             VALUES (?1, ?2, CURRENT_TIMESTAMP)",
            params![symbol, format_timestamp(&timestamp)],
        )?;
        debug!("Alert recorded: {} @ {}", symbol, timestamp);
        Ok(())
    }

    fn all(&self) -> Result<BTreeMap<String, DateTime<Utc>>, AlertStoreError> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        let mut stmt = conn.prepare("SELECT symbol, last_alert FROM alerts")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows
            .into_iter()
            .filter_map(|(symbol, raw)| parse_timestamp(&raw).map(|ts| (symbol, ts)))
            .collect())
    }
}
