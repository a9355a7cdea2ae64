//! Monitor state and collection cycle orchestration.
//!
//! Owns the topology and the shared statistics, and turns each sample batch
//! into one committed statistics cycle.

use crate::config::{MonitorConfig, OutputFormat};
use crate::error::MonitorError;
use crate::samples::{ParseSummary, SampleBatch};
use crate::topology::Topology;
use std::sync::Arc;
use trafficmon_dsdata::{DeliveryServiceAggregator, Filter, SharedStats, TextMerge};

/// Outcome of one collection cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Cycle time in Unix milliseconds
    pub time: i64,
    /// Delivery services aggregated
    pub delivery_services: usize,
    /// Sampled caches missing from the topology
    pub unknown_caches: usize,
    /// How the raw keys were handled
    pub parse: ParseSummary,
}

/// Monitor state shared between the producer and readers.
#[derive(Debug, Clone)]
pub struct Monitor {
    /// Configured caches (loaded once at startup)
    topology: Arc<Topology>,

    /// Statistics for every configured delivery service
    stats: SharedStats,

    /// Aggregation rule
    aggregator: DeliveryServiceAggregator,
}

impl Monitor {
    /// Create a monitor over an already loaded topology.
    #[must_use]
    pub fn new(topology: Topology, max_history: usize, text_merge: TextMerge) -> Self {
        Self {
            topology: Arc::new(topology),
            stats: SharedStats::new(max_history),
            aggregator: DeliveryServiceAggregator::new(text_merge),
        }
    }

    /// Create a monitor from configuration.
    ///
    /// # Errors
    ///
    /// Returns `MonitorError` if the topology cannot be loaded.
    pub fn from_config(config: &MonitorConfig) -> Result<Self, MonitorError> {
        tracing::info!("Loading topology from {:?}", config.topology);

        let topology = Topology::from_file(&config.topology)?;

        tracing::info!(
            "Loaded {} caches serving {} delivery services",
            topology.total_caches(),
            topology.total_delivery_services()
        );

        Ok(Self::new(topology, config.max_history, config.text_merge))
    }

    /// Get reference to the topology.
    #[must_use]
    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Get reference to the shared statistics.
    #[must_use]
    pub const fn stats(&self) -> &SharedStats {
        &self.stats
    }

    /// Aggregate one sample batch and commit it as a cycle.
    ///
    /// Delivery services no longer in the topology are dropped with their
    /// history.
    pub fn ingest(&self, batch: &SampleBatch) -> CycleReport {
        let time = batch.effective_time();
        let (samples, parse) = batch.to_cache_stats();

        let unknown_caches = samples
            .keys()
            .filter(|cache| !self.topology.contains_cache(cache.as_str()))
            .count();
        if unknown_caches > 0 {
            tracing::debug!(unknown_caches, "samples received for unconfigured caches");
        }

        let mut update = self.stats.begin_update();
        update.retain(|ds| self.topology.contains_delivery_service(ds));

        let mut delivery_services = 0;
        for (ds, members) in self.topology.delivery_services() {
            self.aggregator
                .aggregate_into(update.stat_mut(ds.clone()), members, &samples, time);
            delivery_services += 1;
        }
        update.commit();

        tracing::debug!(
            time,
            delivery_services,
            applied = parse.applied,
            not_processed = parse.not_processed,
            rejected = parse.rejected,
            "collection cycle complete"
        );

        CycleReport {
            time,
            delivery_services,
            unknown_caches,
            parse,
        }
    }

    /// Render the current statistics as JSON.
    ///
    /// # Errors
    ///
    /// Returns `MonitorError::Render` if serialization fails.
    pub fn render(
        &self,
        format: OutputFormat,
        filter: &dyn Filter,
        pretty: bool,
    ) -> Result<String, MonitorError> {
        let rendered = match (format, pretty) {
            (OutputFormat::Structured, false) => {
                serde_json::to_string(&self.stats.structured(filter))
            }
            (OutputFormat::Structured, true) => {
                serde_json::to_string_pretty(&self.stats.structured(filter))
            }
            (OutputFormat::Legacy, false) => serde_json::to_string(&self.stats.json(filter)),
            (OutputFormat::Legacy, true) => {
                serde_json::to_string_pretty(&self.stats.json(filter))
            }
        };
        rendered.map_err(MonitorError::Render)
    }
}
