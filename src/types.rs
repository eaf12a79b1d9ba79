//! Core data types used across the alerting pipeline

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for candle data
#[derive(Debug, Error)]
pub enum CandleValidationError {
    #[error("high ({high}) must be >= low ({low})")]
    HighLessThanLow { high: f64, low: f64 },

    #[error("volume ({0}) must be >= 0")]
    NegativeVolume(f64),

    #[error("open ({open}) must be between low ({low}) and high ({high})")]
    OpenOutOfRange { open: f64, low: f64, high: f64 },

    #[error("close ({close}) must be between low ({low}) and high ({high})")]
    CloseOutOfRange { close: f64, low: f64, high: f64 },

    #[error("prices must be positive: open={open}, high={high}, low={low}, close={close}")]
    NonPositivePrice {
        open: f64,
        high: f64,
        low: f64,
        close: f64,
    },
}

/// OHLCV candlestick data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub datetime: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    /// Create a new candle with validation
    pub fn new(
        datetime: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Result<Self, CandleValidationError> {
        let candle = Self {
            datetime,
            open,
            high,
            low,
            close,
            volume,
        };
        candle.validate()?;
        Ok(candle)
    }

    /// Validate the candle data
    pub fn validate(&self) -> Result<(), CandleValidationError> {
        if self.open <= 0.0 || self.high <= 0.0 || self.low <= 0.0 || self.close <= 0.0 {
            return Err(CandleValidationError::NonPositivePrice {
                open: self.open,
                high: self.high,
                low: self.low,
                close: self.close,
            });
        }

        if self.high < self.low {
            return Err(CandleValidationError::HighLessThanLow {
                high: self.high,
                low: self.low,
            });
        }

        if self.volume < 0.0 {
            return Err(CandleValidationError::NegativeVolume(self.volume));
        }

        if self.open < self.low || self.open > self.high {
            return Err(CandleValidationError::OpenOutOfRange {
                open: self.open,
                low: self.low,
                high: self.high,
            });
        }

        if self.close < self.low || self.close > self.high {
            return Err(CandleValidationError::CloseOutOfRange {
                close: self.close,
                low: self.low,
                high: self.high,
            });
        }

        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

/// Evaluation of the breakout rule on the most recent bar of a series.
///
/// Produced fresh on every check and returned whether or not `signal` fired,
/// so near-misses can be displayed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalReport {
    pub symbol: String,
    pub signal: bool,
    pub ema_cross: bool,
    pub price_above_emas: bool,
    pub rsi_burst: bool,
    /// `None` while the oscillator is still undefined (flat or too-short series)
    pub rsi_fast: Option<f64>,
    pub vol_spike: bool,
    pub atr_spike: bool,
    pub close: f64,
    pub timestamp: DateTime<Utc>,
}

impl SignalReport {
    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = symbol.into();
        self
    }
}

/// What happened to the alert for a symbol during one check cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum AlertStatus {
    /// The breakout rule did not fire
    NotTriggered,
    /// Fired, but an alert was delivered within the cooldown window
    Suppressed,
    Delivered,
    /// Fired and logged by a dry run; nothing sent, nothing recorded
    DryRun,
    /// Fired, delivery was attempted and failed; the next cycle retries
    DeliveryFailed(String),
}

/// Per-symbol outcome of a check cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CheckOutcome {
    /// Candle source failed for this symbol
    Error { message: String },
    InsufficientData { bars: usize },
    Evaluated {
        report: SignalReport,
        alert: AlertStatus,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    pub symbol: String,
    #[serde(flatten)]
    pub outcome: CheckOutcome,
}

impl CheckResult {
    pub fn report(&self) -> Option<&SignalReport> {
        match &self.outcome {
            CheckOutcome::Evaluated { report, .. } => Some(report),
            _ => None,
        }
    }

    pub fn alert_status(&self) -> Option<&AlertStatus> {
        match &self.outcome {
            CheckOutcome::Evaluated { alert, .. } => Some(alert),
            _ => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.outcome, CheckOutcome::Error { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candle_validation() {
        let now = Utc::now();
        assert!(Candle::new(now, 100.0, 105.0, 95.0, 102.0, 1000.0).is_ok());
        assert!(matches!(
            Candle::new(now, 100.0, 95.0, 105.0, 100.0, 1000.0),
            Err(CandleValidationError::HighLessThanLow { .. })
        ));
        assert!(matches!(
            Candle::new(now, 100.0, 105.0, 95.0, 110.0, 1000.0),
            Err(CandleValidationError::CloseOutOfRange { .. })
        ));
        assert!(matches!(
            Candle::new(now, 100.0, 105.0, 95.0, 102.0, -1.0),
            Err(CandleValidationError::NegativeVolume(_))
        ));
        assert!(matches!(
            Candle::new(now, 0.0, 105.0, 95.0, 102.0, 1.0),
            Err(CandleValidationError::NonPositivePrice { .. })
        ));
    }

    #[test]
    fn test_check_result_serializes_flat() {
        let result = CheckResult {
            symbol: "NIFTY24DEC24000CE".to_string(),
            outcome: CheckOutcome::InsufficientData { bars: 12 },
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["symbol"], "NIFTY24DEC24000CE");
        assert_eq!(json["kind"], "insufficient_data");
        assert_eq!(json["bars"], 12);
    }
}
