use anyhow::{Context, Result};
use ca_repeater::repeater::{init_logging_with_config, repeater_thread, Config};
use clap::Parser;
use tracing::error;

fn main() {
    let config = Config::parse();
    init_logging_with_config(&config.log_level, config.is_json_format());

    if let Err(e) = run(&config) {
        error!(error = %e, "repeater failed to start");
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }

    // Reached on startup socket failures, which repeater_thread has
    // already logged: exiting 0 lets a supervisor treat "another repeater
    // is already running" as success. A healthy repeater never returns.
}

fn run(config: &Config) -> Result<()> {
    config.validate().context("invalid configuration")?;
    repeater_thread(config, None);
    Ok(())
}
