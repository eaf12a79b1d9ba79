//! Momentum breakout alerts - main entry point
//!
//! This binary provides three subcommands:
//! - check: Run one check cycle over the watch list
//! - watch: Repeat check cycles on a fixed interval until Ctrl+C
//! - alerts: Show the last delivered alert per symbol

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;

#[derive(Parser, Debug)]
#[command(name = "breakout-alerts")]
#[command(about = "Momentum breakout detection with deduplicated Telegram alerts", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Options shared by `check` and `watch`
#[derive(Args, Debug, Clone)]
pub struct CycleArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.json")]
    pub config: String,

    /// Symbols to check (comma-separated), overrides the config watch list
    #[arg(short, long)]
    pub symbols: Option<String>,

    /// Alert cooldown in minutes (overrides config)
    #[arg(long)]
    pub cooldown: Option<u64>,

    /// Log alerts instead of sending them (no Telegram credentials needed)
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run one check cycle and print the results
    Check {
        #[command(flatten)]
        args: CycleArgs,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run check cycles continuously
    Watch {
        #[command(flatten)]
        args: CycleArgs,

        /// Seconds between cycles (overrides config)
        #[arg(long)]
        every: Option<u64>,
    },

    /// Show recorded alerts (symbol -> last delivery time)
    Alerts {
        /// Path to configuration file
        #[arg(short, long, default_value = "config.json")]
        config: String,
    },
}

fn setup_logging(verbose: bool, command_name: &str) -> Result<()> {
    std::fs::create_dir_all("logs")?;

    // Create log file with naming pattern: {command}_{date}.log
    let log_filename = format!(
        "{}_{}.log",
        command_name,
        chrono::Local::now().format("%Y-%m-%d_%H-%M-%S")
    );
    let log_path = PathBuf::from("logs").join(&log_filename);

    // Set log level - filter out noisy external crates
    let level = if verbose { "debug" } else { "info" };
    let filter_str = format!(
        "{},hyper=warn,hyper_util=warn,reqwest=warn,rustls=warn,h2=warn",
        level
    );
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

    let file_appender = tracing_appender::rolling::never("logs", &log_filename);

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .with_ansi(true);

    // File layer - same format but without ANSI colors
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(file_appender)
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    info!("Logging initialized");
    info!("Log file: {}", log_path.display());

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let command_name = match &cli.command {
        Commands::Check { .. } => "check",
        Commands::Watch { .. } => "watch",
        Commands::Alerts { .. } => "alerts",
    };

    setup_logging(cli.verbose, command_name)?;

    match cli.command {
        Commands::Check { args, json } => commands::check::run(args, json),
        Commands::Watch { args, every } => commands::watch::run(args, every),
        Commands::Alerts { config } => commands::alerts::run(config),
    }
}
