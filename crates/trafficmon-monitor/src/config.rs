//! Monitor configuration management.
//!
//! This module handles loading and validating monitor configuration from CLI
//! arguments and environment variables.
//!
//! # Configuration Sources
//!
//! Configuration can be provided via:
//! - CLI arguments (`--topology`, `--samples`, etc.)
//! - Environment variables (`TRAFFICMON_TOPOLOGY`, etc.)
//! - Default values
//!
//! # Example
//!
//! ```no_run
//! use trafficmon_monitor::MonitorConfig;
//!
//! let config = MonitorConfig::from_args();
//! config.validate().expect("Invalid configuration");
//!
//! println!("Topology: {}", config.topology.display());
//! println!("History depth: {}", config.max_history);
//! ```

use crate::error::ConfigError;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use trafficmon_dsdata::{DEFAULT_MAX_HISTORY, StatFilter, TextMerge};

/// Shape of the printed statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Latest snapshot per delivery service, one timestamped value per stat
    Structured,
    /// Flattened history, arrays of samples per stat name
    #[default]
    Legacy,
}

/// Monitor configuration loaded from CLI args and environment variables.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "trafficmon",
    about = "Aggregate cache fleet samples into delivery service statistics",
    version
)]
pub struct MonitorConfig {
    /// Path to the cache topology JSON file
    #[arg(long, env = "TRAFFICMON_TOPOLOGY", default_value = "./topology.json")]
    pub topology: PathBuf,

    /// Path to the collector sample batches JSON file
    #[arg(long, env = "TRAFFICMON_SAMPLES", default_value = "./samples.json")]
    pub samples: PathBuf,

    /// Number of completed cycles kept per delivery service
    #[arg(long, env = "TRAFFICMON_MAX_HISTORY", default_value_t = DEFAULT_MAX_HISTORY)]
    pub max_history: usize,

    /// How error text is merged when caches are aggregated
    #[arg(long, env = "TRAFFICMON_TEXT_MERGE", default_value = "concatenate")]
    pub text_merge: TextMerge,

    /// Output shape
    #[arg(long, env = "TRAFFICMON_FORMAT", value_enum, default_value_t = OutputFormat::Legacy)]
    pub format: OutputFormat,

    /// Only include these stat names (comma separated)
    #[arg(long, env = "TRAFFICMON_STATS", value_delimiter = ',')]
    pub stats: Vec<String>,

    /// Only include these delivery services (comma separated)
    #[arg(long, env = "TRAFFICMON_DELIVERY_SERVICES", value_delimiter = ',')]
    pub delivery_services: Vec<String>,

    /// Only include the newest N history positions
    #[arg(long, env = "TRAFFICMON_HISTORY_COUNT")]
    pub history_count: Option<usize>,

    /// Pretty-print JSON output
    #[arg(long, env = "TRAFFICMON_PRETTY")]
    pub pretty: bool,
}

impl MonitorConfig {
    /// Parse configuration from command-line arguments.
    #[must_use]
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Build the output filter.
    #[must_use]
    pub fn stat_filter(&self) -> StatFilter {
        let filter = StatFilter::new()
            .with_stats(self.stats.iter().map(String::as_str))
            .with_delivery_services(self.delivery_services.iter().map(String::as_str));
        match self.history_count {
            Some(count) => filter.with_history_count(count),
            None => filter,
        }
    }

    /// Validate configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Topology or sample file doesn't exist
    /// - `max_history` is zero
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.topology.exists() {
            return Err(ConfigError::MissingRequired(format!(
                "topology file not found: {}",
                self.topology.display()
            )));
        }

        if !self.samples.exists() {
            return Err(ConfigError::MissingRequired(format!(
                "samples file not found: {}",
                self.samples.display()
            )));
        }

        if self.max_history == 0 {
            return Err(ConfigError::InvalidValue {
                name: "max_history".to_string(),
                reason: "must keep at least one cycle".to_string(),
            });
        }

        Ok(())
    }
}
