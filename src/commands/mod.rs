//! CLI subcommands

pub mod alerts;
pub mod check;
pub mod watch;

use anyhow::{Context, Result};
use tracing::{info, warn};

use breakout_alerts::alerts::{open_store, AlertDeduplicator};
use breakout_alerts::checker::{CheckSettings, Checker};
use breakout_alerts::data::create_source;
use breakout_alerts::notify::{DryRunNotifier, Notifier, TelegramNotifier};
use breakout_alerts::{AlertStatus, CheckOutcome, CheckResult, Config};

use crate::CycleArgs;

pub fn load_config(path: &str) -> Result<Config> {
    dotenv::dotenv().ok();
    Config::from_file(path).with_context(|| format!("Failed to load config from {}", path))
}

/// Config with CLI overrides applied
pub fn load_cycle_config(args: &CycleArgs) -> Result<Config> {
    let mut config = load_config(&args.config)?;

    if let Some(symbols) = &args.symbols {
        config.watch.symbols = parse_symbols(symbols);
    }
    if let Some(cooldown) = args.cooldown {
        config.watch.cooldown_minutes = cooldown;
    }
    if config.watch.symbols.is_empty() {
        anyhow::bail!("No symbols to watch. Set watch.symbols in the config or pass --symbols");
    }

    Ok(config)
}

pub fn parse_symbols(raw: &str) -> Vec<String> {
    raw.split([',', '\n'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Wire up source, notifier and alert store from config.
///
/// Missing Telegram credentials fail here, before any cycle runs.
pub fn build_checker(config: &Config, dry_run: bool) -> Result<Checker> {
    let (notifier, destination): (Box<dyn Notifier>, String) = if dry_run {
        warn!("Dry run: alerts will be logged, not sent");
        let destination = config
            .telegram
            .chat_id
            .clone()
            .unwrap_or_else(|| "dry-run".to_string());
        (Box::new(DryRunNotifier), destination)
    } else {
        let (telegram, chat_id) = TelegramNotifier::from_config(&config.telegram)
            .context("Telegram is not configured (use --dry-run to check without sending)")?;
        (Box::new(telegram), chat_id)
    };

    let source = create_source(&config.data)?;
    let store = open_store(&config.alerts)?;

    info!(
        "Source: {:?} | Alerts: {:?} at {} | Cooldown: {}m",
        config.data.source,
        config.alerts.backend,
        config.alerts.path(),
        config.watch.cooldown_minutes
    );

    Ok(Checker::new(
        source,
        notifier,
        AlertDeduplicator::new(store),
        destination,
        CheckSettings::from(config),
    ))
}

fn flag(value: bool) -> &'static str {
    if value {
        "Y"
    } else {
        "-"
    }
}

/// Print a per-symbol results table
pub fn print_results(results: &[CheckResult]) {
    println!(
        "\n{:<20} {:>6} {:>6} {:>6} {:>7} {:>4} {:>4} {:>12}  {:<20} {}",
        "SYMBOL", "SIGNAL", "CROSS", "ABOVE", "RSI5", "VOL", "ATR", "CLOSE", "BAR TIME", "ALERT"
    );
    println!("{}", "-".repeat(110));

    for result in results {
        match &result.outcome {
            CheckOutcome::Error { message } => {
                println!("{:<20} error: {}", result.symbol, message);
            }
            CheckOutcome::InsufficientData { bars } => {
                println!("{:<20} insufficient data ({} bars)", result.symbol, bars);
            }
            CheckOutcome::Evaluated { report, alert } => {
                let rsi = report
                    .rsi_fast
                    .map(|v| format!("{:.1}", v))
                    .unwrap_or_else(|| "n/a".to_string());
                let alert = match alert {
                    AlertStatus::NotTriggered => "-".to_string(),
                    AlertStatus::Suppressed => "cooldown".to_string(),
                    AlertStatus::Delivered => "sent".to_string(),
                    AlertStatus::DryRun => "dry-run".to_string(),
                    AlertStatus::DeliveryFailed(e) => format!("failed: {}", e),
                };
                println!(
                    "{:<20} {:>6} {:>6} {:>6} {:>7} {:>4} {:>4} {:>12.2}  {:<20} {}",
                    result.symbol,
                    flag(report.signal),
                    flag(report.ema_cross),
                    flag(report.price_above_emas),
                    rsi,
                    flag(report.vol_spike),
                    flag(report.atr_spike),
                    report.close,
                    report.timestamp.format("%Y-%m-%d %H:%M").to_string(),
                    alert
                );
            }
        }
    }
    println!();
}
