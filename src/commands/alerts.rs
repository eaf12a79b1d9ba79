//! Alerts command - list the last delivered alert per symbol

use anyhow::Result;
use chrono::Utc;
use tracing::warn;

use breakout_alerts::alerts::open_store;

pub fn run(config_path: String) -> Result<()> {
    let config = super::load_config(&config_path)?;
    let store = open_store(&config.alerts)?;

    let records = match store.all() {
        Ok(r) => r,
        Err(e) => {
            warn!("Could not read alert records: {}", e);
            Default::default()
        }
    };

    if records.is_empty() {
        println!("No alerts recorded yet.");
        return Ok(());
    }

    let now = Utc::now();
    println!("\nRecent Alerts (symbol -> timestamp)");
    println!("{}", "-".repeat(60));
    for (symbol, ts) in &records {
        let ago = (now - *ts).num_minutes();
        println!("{:<20} {}  ({}m ago)", symbol, ts.to_rfc3339(), ago);
    }
    println!();

    Ok(())
}
