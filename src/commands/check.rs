//! Check command - run one cycle over the watch list

use anyhow::Result;

use crate::CycleArgs;

pub fn run(args: CycleArgs, json: bool) -> Result<()> {
    let config = super::load_cycle_config(&args)?;
    let checker = super::build_checker(&config, args.dry_run)?;

    let results = checker.run_cycle(&config.watch.symbols);

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        super::print_results(&results);
    }

    Ok(())
}
