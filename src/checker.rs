//! Check cycle
//!
//! One cycle walks the watch list in order: fetch candles, detect, consult
//! the cooldown, deliver, and record the delivery. A failure for one symbol
//! is captured in that symbol's result and never stops the batch. The alert
//! record is only written after a successful delivery, so failed deliveries
//! are retried on the next cycle.

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use crate::alerts::AlertDeduplicator;
use crate::config::Config;
use crate::data::CandleSource;
use crate::notify::Notifier;
use crate::signal::{self, DetectorParams};
use crate::{AlertStatus, CheckOutcome, CheckResult, SignalReport};

/// Per-cycle parameters
#[derive(Debug, Clone)]
pub struct CheckSettings {
    pub interval: String,
    pub limit: usize,
    pub cooldown_minutes: u64,
    pub currency_symbol: String,
    pub detector: DetectorParams,
}

impl Default for CheckSettings {
    fn default() -> Self {
        CheckSettings {
            interval: "5m".to_string(),
            limit: 200,
            cooldown_minutes: 30,
            currency_symbol: "₹".to_string(),
            detector: DetectorParams::default(),
        }
    }
}

impl From<&Config> for CheckSettings {
    fn from(config: &Config) -> Self {
        CheckSettings {
            interval: config.watch.interval.clone(),
            limit: config.watch.limit,
            cooldown_minutes: config.watch.cooldown_minutes,
            currency_symbol: config.telegram.currency_symbol.clone(),
            detector: config.signal.clone(),
        }
    }
}

pub struct Checker {
    source: Box<dyn CandleSource>,
    notifier: Box<dyn Notifier>,
    dedup: AlertDeduplicator,
    destination: String,
    settings: CheckSettings,
}

impl Checker {
    pub fn new(
        source: Box<dyn CandleSource>,
        notifier: Box<dyn Notifier>,
        dedup: AlertDeduplicator,
        destination: impl Into<String>,
        settings: CheckSettings,
    ) -> Self {
        Checker {
            source,
            notifier,
            dedup,
            destination: destination.into(),
            settings,
        }
    }

    pub fn settings(&self) -> &CheckSettings {
        &self.settings
    }

    pub fn dedup(&self) -> &AlertDeduplicator {
        &self.dedup
    }

    /// Run one full pass over `symbols`, reading the wall clock at each
    /// cooldown check and after each delivery
    pub fn run_cycle(&self, symbols: &[String]) -> Vec<CheckResult> {
        self.run_cycle_with(symbols, &Utc::now)
    }

    /// Run one pass with a fixed clock for cooldown checks and records
    pub fn run_cycle_at(&self, symbols: &[String], now: DateTime<Utc>) -> Vec<CheckResult> {
        self.run_cycle_with(symbols, &move || now)
    }

    fn run_cycle_with(&self, symbols: &[String], clock: &dyn Fn() -> DateTime<Utc>) -> Vec<CheckResult> {
        info!("Checking {} symbols", symbols.len());

        let results: Vec<CheckResult> = symbols
            .iter()
            .map(|symbol| CheckResult {
                symbol: symbol.clone(),
                outcome: self.check_symbol(symbol, clock),
            })
            .collect();

        let fired = results
            .iter()
            .filter(|r| r.report().is_some_and(|rep| rep.signal))
            .count();
        let errors = results.iter().filter(|r| r.is_error()).count();
        info!(
            "Cycle complete: {} symbols, {} signals, {} errors",
            results.len(),
            fired,
            errors
        );

        results
    }

    fn check_symbol(&self, symbol: &str, clock: &dyn Fn() -> DateTime<Utc>) -> CheckOutcome {
        let candles = match self
            .source
            .fetch_candles(symbol, &self.settings.interval, self.settings.limit)
        {
            Ok(c) => c,
            Err(e) => {
                warn!("Failed to fetch candles for {}: {:#}", symbol, e);
                return CheckOutcome::Error {
                    message: format!("{:#}", e),
                };
            }
        };

        let report = match signal::detect_with(&candles, &self.settings.detector) {
            Some(r) => r.with_symbol(symbol),
            None => {
                debug!("Insufficient candle data for {} ({} bars)", symbol, candles.len());
                return CheckOutcome::InsufficientData {
                    bars: candles.len(),
                };
            }
        };

        let alert = if report.signal {
            self.dispatch(&report, clock)
        } else {
            AlertStatus::NotTriggered
        };

        CheckOutcome::Evaluated { report, alert }
    }

    fn dispatch(&self, report: &SignalReport, clock: &dyn Fn() -> DateTime<Utc>) -> AlertStatus {
        let symbol = report.symbol.as_str();
        info!(
            "🚀 Breakout on {} @ {:.2} (rsi={:?}, ema_cross={})",
            symbol, report.close, report.rsi_fast, report.ema_cross
        );

        if self
            .dedup
            .was_recently_alerted_at(symbol, self.settings.cooldown_minutes, clock())
        {
            info!(
                "Alert for {} suppressed (within {}m cooldown)",
                symbol, self.settings.cooldown_minutes
            );
            return AlertStatus::Suppressed;
        }

        let message = format_alert_message(report, &self.settings.currency_symbol);
        match self.notifier.send(&self.destination, &message) {
            Ok(()) if !self.notifier.delivers() => {
                debug!("Alert for {} not delivered, record left unchanged", symbol);
                AlertStatus::DryRun
            }
            Ok(()) => {
                if let Err(e) = self.dedup.record_alert(symbol, clock()) {
                    error!("Alert for {} delivered but not recorded: {}", symbol, e);
                }
                info!("Alert delivered for {}", symbol);
                AlertStatus::Delivered
            }
            Err(e) => {
                warn!("Alert delivery failed for {}: {}", symbol, e);
                AlertStatus::DeliveryFailed(e.to_string())
            }
        }
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Render the Telegram (HTML) alert for a fired report
pub fn format_alert_message(report: &SignalReport, currency_symbol: &str) -> String {
    let rsi = report
        .rsi_fast
        .map(|v| format!("{:.1}", v))
        .unwrap_or_else(|| "n/a".to_string());

    format!(
        "🚀 <b>{} Momentum Breakout</b>\n\
         Price: {}{:.2}\n\
         Time: {}\n\
         RSI5: {} | EMA9&gt;EMA21: {}\n\
         Vol Spike: {} | ATR Spike: {}\n",
        escape_html(&report.symbol),
        escape_html(currency_symbol),
        report.close,
        report.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
        rsi,
        report.ema_cross,
        report.vol_spike,
        report.atr_spike
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn report() -> SignalReport {
        SignalReport {
            symbol: "M&M".to_string(),
            signal: true,
            ema_cross: false,
            price_above_emas: true,
            rsi_burst: true,
            rsi_fast: Some(71.234),
            vol_spike: true,
            atr_spike: true,
            close: 1523.456,
            timestamp: Utc.with_ymd_and_hms(2024, 3, 5, 9, 15, 0).unwrap(),
        }
    }

    #[test]
    fn test_format_alert_message() {
        let msg = format_alert_message(&report(), "₹");
        assert_eq!(
            msg,
            "🚀 <b>M&amp;M Momentum Breakout</b>\n\
             Price: ₹1523.46\n\
             Time: 2024-03-05 09:15:00 UTC\n\
             RSI5: 71.2 | EMA9&gt;EMA21: false\n\
             Vol Spike: true | ATR Spike: true\n"
        );
    }

    #[test]
    fn test_format_alert_message_undefined_rsi() {
        let mut r = report();
        r.rsi_fast = None;
        assert!(format_alert_message(&r, "$").contains("RSI5: n/a"));
    }

    #[test]
    fn test_settings_from_config() {
        let mut config = Config::default();
        config.watch.cooldown_minutes = 45;
        config.watch.interval = "15m".to_string();
        let settings = CheckSettings::from(&config);
        assert_eq!(settings.cooldown_minutes, 45);
        assert_eq!(settings.interval, "15m");
        assert_eq!(settings.limit, 200);
    }
}
