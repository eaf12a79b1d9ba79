//! Momentum Breakout Alerts
//!
//! Watches a list of symbols, computes EMA/RSI/ATR/volume indicators on
//! recent candles, detects a composite momentum breakout on the latest bar,
//! and sends a Telegram alert at most once per cooldown window per symbol.
//!
//! ```no_run
//! use breakout_alerts::alerts::{AlertDeduplicator, MemoryAlertStore};
//! use breakout_alerts::checker::{CheckSettings, Checker};
//! use breakout_alerts::data::DemoCandleSource;
//! use breakout_alerts::notify::DryRunNotifier;
//!
//! let checker = Checker::new(
//!     Box::new(DemoCandleSource::new()),
//!     Box::new(DryRunNotifier),
//!     AlertDeduplicator::new(Box::new(MemoryAlertStore::new())),
//!     "-1001234567890",
//!     CheckSettings::default(),
//! );
//! for result in checker.run_cycle(&["NIFTY".to_string()]) {
//!     println!("{:?}", result);
//! }
//! ```

pub mod alerts;
pub mod checker;
pub mod config;
pub mod data;
pub mod indicators;
pub mod notify;
pub mod signal;
pub mod types;

pub use config::Config;
pub use types::*;
