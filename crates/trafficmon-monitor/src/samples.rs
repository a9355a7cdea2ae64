//! Collector sample batches.
//!
//! A sample file is a JSON array of collection cycles, oldest first. Each
//! cycle maps cache names to their raw stat keys:
//!
//! ```json
//! [{"time": 1700000000000,
//!   "caches": {"edge-den-01": {"kbps": 1024.5, "status_2xx": 120, "is_available": true}}}]
//! ```

use crate::error::SampleError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use trafficmon_dsdata::{CacheName, CacheStats, StatError, now_millis};

/// One collection cycle of raw per-cache values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleBatch {
    /// Unix time in milliseconds of the cycle; `0` means "now"
    #[serde(default)]
    pub time: i64,

    /// Raw stat keys per cache
    #[serde(default)]
    pub caches: BTreeMap<String, BTreeMap<String, Value>>,
}

/// Counts of how raw keys were handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseSummary {
    /// Keys applied to an aggregate
    pub applied: usize,
    /// Keys deliberately skipped
    pub not_processed: usize,
    /// Unknown keys and malformed values
    pub rejected: usize,
}

impl SampleBatch {
    /// Cycle time, falling back to the current time.
    #[must_use]
    pub fn effective_time(&self) -> i64 {
        if self.time > 0 { self.time } else { now_millis() }
    }

    /// Convert raw values to per-cache aggregates.
    ///
    /// Unknown keys and malformed values are logged and skipped; they never
    /// fail the batch.
    pub fn to_cache_stats(&self) -> (BTreeMap<CacheName, CacheStats>, ParseSummary) {
        let time = self.effective_time();
        let mut summary = ParseSummary::default();
        let mut out = BTreeMap::new();

        for (cache, values) in &self.caches {
            let mut stats = CacheStats::default();
            for (key, value) in values {
                match stats.apply_raw(key, value, time) {
                    Ok(()) => summary.applied += 1,
                    Err(StatError::NotProcessed(key)) => {
                        tracing::trace!(cache = %cache, key = %key, "stat not processed");
                        summary.not_processed += 1;
                    }
                    Err(err) => {
                        tracing::warn!(cache = %cache, "skipping sample value: {err}");
                        summary.rejected += 1;
                    }
                }
            }
            out.insert(CacheName::from(cache.as_str()), stats);
        }

        (out, summary)
    }
}

/// Load sample batches from a JSON file.
///
/// # Errors
///
/// Returns `SampleError` if the file cannot be read or is not valid JSON.
pub fn load_batches(path: &Path) -> Result<Vec<SampleBatch>, SampleError> {
    let file = File::open(path).map_err(|source| SampleError::LoadFailed {
        path: path.to_path_buf(),
        source,
    })?;

    let reader = BufReader::new(file);
    Ok(serde_json::from_reader(reader)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_to_cache_stats() {
        let batch: SampleBatch = serde_json::from_value(json!({
            "time": 1000,
            "caches": {
                "edge-01": {
                    "kbps": 10.5,
                    "status_2xx": 3,
                    "status_unknown": 1,
                    "bogus": 2,
                    "is_available": "yes"
                }
            }
        }))
        .unwrap();

        let (stats, summary) = batch.to_cache_stats();
        let edge = &stats["edge-01"];
        assert_eq!(edge.kbps.value, 10.5);
        assert_eq!(edge.kbps.time, 1000);
        assert_eq!(edge.status_2xx.value, 3);
        assert!(!edge.is_available.is_observed());
        assert_eq!(
            summary,
            ParseSummary {
                applied: 2,
                not_processed: 1,
                rejected: 2,
            }
        );
    }

    #[test]
    fn test_missing_time_uses_now() {
        let batch = SampleBatch::default();
        assert!(batch.effective_time() > 0);
    }

    #[test]
    fn test_cache_without_values_is_still_sampled() {
        let batch: SampleBatch =
            serde_json::from_value(json!({"time": 5, "caches": {"edge-01": {}}})).unwrap();
        let (stats, _) = batch.to_cache_stats();
        assert!(stats.contains_key("edge-01"));
    }
}
