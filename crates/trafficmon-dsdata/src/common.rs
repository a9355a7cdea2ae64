//! Configuration and health bookkeeping for one delivery service.

use crate::names::CacheName;
use crate::scalar::{StatBool, StatInt, StatString};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Read-only view of a [`StatCommon`]
///
/// Every accessor returns an owned value, so nothing handed out can observe
/// later producer writes.
pub trait StatCommonReadonly {
    /// Deep copy of the underlying aggregate
    fn copy(&self) -> StatCommon;
    /// Number of caches configured for the delivery service
    fn caches_configured(&self) -> StatInt;
    /// Whether `name` is reporting, or `None` if the cache is unknown
    fn cache_reporting(&self, name: &str) -> Option<bool>;
    /// Names of every known cache, sorted
    fn caches_reporting_names(&self) -> Vec<CacheName>;
    /// Error text
    fn error(&self) -> StatString;
    /// Status text
    fn status(&self) -> StatString;
    /// Overall health flag
    fn healthy(&self) -> StatBool;
    /// Overall availability flag
    fn available(&self) -> StatBool;
    /// Number of caches currently available
    fn caches_available(&self) -> StatInt;
}

/// Health aggregate independent of traffic volume
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatCommon {
    #[serde(rename = "caches_configured")]
    caches_configured_num: StatInt,
    caches_reporting: BTreeMap<CacheName, bool>,
    #[serde(rename = "error_string")]
    error_str: StatString,
    #[serde(rename = "status")]
    status_str: StatString,
    is_healthy: StatBool,
    is_available: StatBool,
    #[serde(rename = "caches_available")]
    caches_available_num: StatInt,
}

impl StatCommon {
    /// Create an aggregate with no known caches
    pub fn new() -> Self {
        Self::default()
    }

    /// Record whether a cache is reporting, adding it if unknown
    pub fn set_cache_reporting(&mut self, name: impl Into<CacheName>, reporting: bool) {
        self.caches_reporting.insert(name.into(), reporting);
    }

    /// Forget a cache that left the reporting pool
    pub fn remove_cache_reporting(&mut self, name: &str) -> Option<bool> {
        self.caches_reporting.remove(name)
    }

    /// Number of caches in the reporting map
    pub fn known_caches(&self) -> usize {
        self.caches_reporting.len()
    }

    /// Number of caches in the reporting map flagged as reporting
    pub fn reporting_count(&self) -> usize {
        self.caches_reporting.values().filter(|r| **r).count()
    }

    /// Set the configured cache count
    pub fn set_caches_configured(&mut self, count: i64, time: i64) {
        self.caches_configured_num.set(count, time);
        if self.caches_available_num.value > count {
            tracing::warn!(
                available = self.caches_available_num.value,
                configured = count,
                "available caches exceed configured caches, clamping"
            );
            self.caches_available_num.set(count, time);
        }
    }

    /// Set the available cache count, clamped to the configured count
    pub fn set_caches_available(&mut self, count: i64, time: i64) {
        let configured = self.caches_configured_num.value;
        let count = if count > configured {
            tracing::warn!(
                available = count,
                configured,
                "available caches exceed configured caches, clamping"
            );
            configured
        } else {
            count
        };
        self.caches_available_num.set(count, time);
    }

    /// Set the error text
    pub fn set_error(&mut self, error: impl Into<String>, time: i64) {
        self.error_str.set(error.into(), time);
    }

    /// Set the status text
    pub fn set_status(&mut self, status: impl Into<String>, time: i64) {
        self.status_str.set(status.into(), time);
    }

    /// Set the health flag
    pub fn set_healthy(&mut self, healthy: bool, time: i64) {
        self.is_healthy.set(healthy, time);
    }

    /// Set the availability flag
    pub fn set_available(&mut self, available: bool, time: i64) {
        self.is_available.set(available, time);
    }
}

impl StatCommonReadonly for StatCommon {
    fn copy(&self) -> StatCommon {
        self.clone()
    }

    fn caches_configured(&self) -> StatInt {
        self.caches_configured_num.clone()
    }

    fn cache_reporting(&self, name: &str) -> Option<bool> {
        self.caches_reporting.get(name).copied()
    }

    fn caches_reporting_names(&self) -> Vec<CacheName> {
        self.caches_reporting.keys().cloned().collect()
    }

    fn error(&self) -> StatString {
        self.error_str.clone()
    }

    fn status(&self) -> StatString {
        self.status_str.clone()
    }

    fn healthy(&self) -> StatBool {
        self.is_healthy.clone()
    }

    fn available(&self) -> StatBool {
        self.is_available.clone()
    }

    fn caches_available(&self) -> StatInt {
        self.caches_available_num.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reporting_membership() {
        let mut common = StatCommon::new();
        assert_eq!(common.cache_reporting("edge-01"), None);

        common.set_cache_reporting("edge-01", true);
        assert_eq!(common.cache_reporting("edge-01"), Some(true));

        common.set_cache_reporting("edge-01", false);
        assert_eq!(common.cache_reporting("edge-01"), Some(false));

        assert_eq!(common.remove_cache_reporting("edge-01"), Some(false));
        assert_eq!(common.cache_reporting("edge-01"), None);
        assert_eq!(common.known_caches(), 0);
    }

    #[test]
    fn test_reporting_names_sorted() {
        let mut common = StatCommon::new();
        common.set_cache_reporting("edge-02", true);
        common.set_cache_reporting("edge-01", false);
        common.set_cache_reporting("mid-01", true);

        let names: Vec<String> = common
            .caches_reporting_names()
            .into_iter()
            .map(|n| n.to_string())
            .collect();
        assert_eq!(names, vec!["edge-01", "edge-02", "mid-01"]);
        assert_eq!(common.reporting_count(), 2);
    }

    #[test]
    fn test_copy_isolates_reporting_map() {
        let mut original = StatCommon::new();
        original.set_cache_reporting("edge-01", true);

        let mut copy = original.copy();
        copy.set_cache_reporting("edge-02", true);
        copy.set_cache_reporting("edge-01", false);
        assert_eq!(original.cache_reporting("edge-01"), Some(true));
        assert_eq!(original.cache_reporting("edge-02"), None);

        original.remove_cache_reporting("edge-01");
        assert_eq!(copy.cache_reporting("edge-01"), Some(false));
    }

    #[test]
    fn test_available_never_exceeds_configured() {
        let mut common = StatCommon::new();
        common.set_caches_configured(3, 10);
        common.set_caches_available(5, 10);
        assert_eq!(common.caches_available().value, 3);

        common.set_caches_configured(2, 20);
        assert_eq!(common.caches_available().value, 2);
        assert_eq!(common.caches_available().time, 20);
    }

    #[test]
    fn test_wire_shape() {
        let mut common = StatCommon::new();
        common.set_cache_reporting("edge-01", true);
        common.set_status("available", 5);

        let json = serde_json::to_value(&common).unwrap();
        assert_eq!(json["caches_reporting"]["edge-01"], true);
        assert_eq!(json["status"]["value"], "available");
        assert_eq!(json["status"]["time"], 5);
        assert!(json.get("caches_configured").is_some());
        assert!(json.get("error_string").is_some());
        assert!(json.get("is_healthy").is_some());
        assert!(json.get("caches_available").is_some());
    }
}
