//! Cache fleet monitor.
//!
//! This crate hosts the delivery service statistics model of
//! `trafficmon-dsdata`: it loads the configured cache topology, folds
//! collector sample batches into per-delivery-service statistics one cycle at
//! a time, and renders them in the structured or the legacy wire shape.
//!
//! # Architecture
//!
//! The monitor uses a library-first design with the following components:
//! - `config`: Configuration loading and validation
//! - `topology`: Cache topology loading and indexing
//! - `samples`: Collector sample batch loading and parsing
//! - `monitor`: Collection cycle orchestration and rendering
//!
//! # Example
//!
//! ```no_run
//! use trafficmon_monitor::{Monitor, MonitorConfig, samples};
//!
//! fn main() -> anyhow::Result<()> {
//!     tracing_subscriber::fmt::init();
//!
//!     let config = MonitorConfig::from_args();
//!     config.validate()?;
//!
//!     let monitor = Monitor::from_config(&config)?;
//!     for batch in samples::load_batches(&config.samples)? {
//!         monitor.ingest(&batch);
//!     }
//!
//!     let output = monitor.render(config.format, &config.stat_filter(), config.pretty)?;
//!     println!("{output}");
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod config;
pub mod error;
pub mod monitor;
pub mod samples;
pub mod topology;

pub use config::{MonitorConfig, OutputFormat};
pub use error::{ConfigError, MonitorError, SampleError, TopologyError};
pub use monitor::{CycleReport, Monitor};
pub use samples::{ParseSummary, SampleBatch};
pub use topology::{CacheRecord, Topology};
