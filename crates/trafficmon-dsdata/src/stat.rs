//! Composite statistics snapshot for one delivery service.

use crate::cache_stats::{CacheStats, TextMerge};
use crate::common::{StatCommon, StatCommonReadonly};
use crate::names::{CacheGroupName, CacheType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Read-only view of a [`Stat`]
///
/// Aggregates are returned by value; nothing here exposes the live maps.
pub trait StatReadonly {
    /// Deep copy of the snapshot
    fn copy(&self) -> Stat;
    /// Health aggregate
    fn common(&self) -> &dyn StatCommonReadonly;
    /// Aggregate for a cache group, if any cache of that group contributed
    fn cache_group(&self, name: &str) -> Option<CacheStats>;
    /// Aggregate for a cache type, if any cache of that type contributed
    fn cache_type(&self, name: &str) -> Option<CacheStats>;
    /// Delivery service total
    fn total(&self) -> CacheStats;
    /// Cache groups present in the snapshot, sorted
    fn cache_group_names(&self) -> Vec<CacheGroupName>;
    /// Cache types present in the snapshot, sorted
    fn cache_type_names(&self) -> Vec<CacheType>;
}

/// Full statistics picture of a delivery service
///
/// Serialized with the `CommonStats`, `CacheGroups`, `Types` and `TotalStats`
/// keys existing structured consumers read.
///
/// The total is stored independently of the group and type maps. Producers
/// that set buckets by hand are expected to keep it consistent, e.g. with
/// [`Stat::recompute_total`]; the aggregator builds all three from the same
/// samples.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stat {
    #[serde(rename = "CommonStats")]
    common_stats: StatCommon,
    #[serde(rename = "CacheGroups")]
    cache_groups: BTreeMap<CacheGroupName, CacheStats>,
    #[serde(rename = "Types")]
    types: BTreeMap<CacheType, CacheStats>,
    #[serde(rename = "TotalStats")]
    total_stats: CacheStats,
}

impl Stat {
    /// Empty snapshot: no buckets, zero total, no known caches
    pub fn new() -> Self {
        Self::default()
    }

    /// Mutable health aggregate
    pub fn common_mut(&mut self) -> &mut StatCommon {
        &mut self.common_stats
    }

    /// Replace a cache group aggregate
    pub fn set_cache_group(&mut self, name: impl Into<CacheGroupName>, stats: CacheStats) {
        self.cache_groups.insert(name.into(), stats);
    }

    /// Remove a cache group aggregate
    pub fn remove_cache_group(&mut self, name: &str) -> Option<CacheStats> {
        self.cache_groups.remove(name)
    }

    /// Replace a cache type aggregate
    pub fn set_cache_type(&mut self, name: impl Into<CacheType>, stats: CacheStats) {
        self.types.insert(name.into(), stats);
    }

    /// Remove a cache type aggregate
    pub fn remove_cache_type(&mut self, name: &str) -> Option<CacheStats> {
        self.types.remove(name)
    }

    /// Replace the total aggregate
    pub fn set_total(&mut self, stats: CacheStats) {
        self.total_stats = stats;
    }

    /// Rebuild the total by folding every cache group aggregate
    pub fn recompute_total(&mut self, text: TextMerge) {
        self.total_stats = CacheStats::fold(self.cache_groups.values(), text);
    }

    pub(crate) fn cache_groups(&self) -> &BTreeMap<CacheGroupName, CacheStats> {
        &self.cache_groups
    }

    pub(crate) fn types(&self) -> &BTreeMap<CacheType, CacheStats> {
        &self.types
    }

    pub(crate) fn common_ref(&self) -> &StatCommon {
        &self.common_stats
    }

    pub(crate) fn total_ref(&self) -> &CacheStats {
        &self.total_stats
    }
}

impl StatReadonly for Stat {
    fn copy(&self) -> Stat {
        Self {
            common_stats: self.common_stats.copy(),
            cache_groups: self.cache_groups.clone(),
            types: self.types.clone(),
            total_stats: self.total_stats.clone(),
        }
    }

    fn common(&self) -> &dyn StatCommonReadonly {
        &self.common_stats
    }

    fn cache_group(&self, name: &str) -> Option<CacheStats> {
        self.cache_groups.get(name).cloned()
    }

    fn cache_type(&self, name: &str) -> Option<CacheStats> {
        self.types.get(name).cloned()
    }

    fn total(&self) -> CacheStats {
        self.total_stats.clone()
    }

    fn cache_group_names(&self) -> Vec<CacheGroupName> {
        self.cache_groups.keys().cloned().collect()
    }

    fn cache_type_names(&self) -> Vec<CacheType> {
        self.types.keys().cloned().collect()
    }
}
