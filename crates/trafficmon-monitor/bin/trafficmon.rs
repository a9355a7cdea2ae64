//! Traffic monitor binary entry point.
//!
//! This is a thin wrapper around the trafficmon-monitor library that:
//! 1. Initializes logging
//! 2. Parses and validates configuration
//! 3. Loads the topology and replays the sample batches
//! 4. Prints the resulting statistics
//!
//! For library usage, see the trafficmon-monitor crate documentation.

use anyhow::Result;
use trafficmon_monitor::{Monitor, MonitorConfig, samples};

fn main() -> Result<()> {
    // Logs go to stderr so stdout carries only the JSON output
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = MonitorConfig::from_args();

    tracing::info!(
        "Configuration loaded: topology={:?}, samples={:?}, max_history={}, text_merge={}",
        config.topology,
        config.samples,
        config.max_history,
        config.text_merge
    );

    config.validate()?;

    let monitor = Monitor::from_config(&config)?;
    let batches = samples::load_batches(&config.samples)?;
    tracing::info!("Replaying {} sample batches", batches.len());

    for batch in &batches {
        let report = monitor.ingest(batch);
        if report.parse.rejected > 0 {
            tracing::warn!(
                time = report.time,
                rejected = report.parse.rejected,
                "cycle contained rejected sample values"
            );
        }
    }

    let output = monitor.render(config.format, &config.stat_filter(), config.pretty)?;
    println!("{output}");

    Ok(())
}
