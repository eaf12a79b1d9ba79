//! Watch command - repeat check cycles on a fixed interval
//!
//! Each tick runs one complete pass over the watch list. Ctrl+C is honoured
//! between cycles; a cycle in progress always finishes.

use anyhow::{Context, Result};
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info};

use crate::CycleArgs;

pub fn run(args: CycleArgs, every: Option<u64>) -> Result<()> {
    let config = super::load_cycle_config(&args)?;
    let checker = super::build_checker(&config, args.dry_run)?;
    let every_secs = every.unwrap_or(config.watch.check_interval_secs).max(1);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?;

    runtime.block_on(async move {
        let mut cycle_interval = interval(Duration::from_secs(every_secs));
        cycle_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        info!(
            "Watching {} symbols every {}s (Ctrl+C to stop)",
            config.watch.symbols.len(),
            every_secs
        );

        let mut cycle_count: u64 = 0;
        loop {
            tokio::select! {
                _ = cycle_interval.tick() => {
                    cycle_count += 1;
                    info!("━━━ Check cycle {} ━━━", cycle_count);
                    let results = tokio::task::block_in_place(|| {
                        checker.run_cycle(&config.watch.symbols)
                    });
                    super::print_results(&results);
                }
                res = &mut ctrl_c => {
                    if let Err(e) = res {
                        error!("Error setting up signal handler: {}", e);
                    }
                    info!("Received Ctrl+C, stopping after {} cycles", cycle_count);
                    break;
                }
            }
        }
    });

    Ok(())
}
