//! Building a delivery service snapshot from per-cache samples.
//!
//! The cache group, cache type and total aggregates are folded from the same
//! set of samples, so the total always equals the fold of either map.

use crate::cache_stats::{CacheStats, TextMerge};
use crate::common::StatCommonReadonly;
use crate::names::{CacheGroupName, CacheName, CacheType};
use crate::stat::{Stat, StatReadonly};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Status text of a delivery service with at least one available cache
pub const STATUS_AVAILABLE: &str = "available";
/// Status text of a delivery service with no available cache
pub const STATUS_UNAVAILABLE: &str = "unavailable";
/// Error text of a delivery service with no available cache
pub const ERROR_NO_AVAILABLE_CACHES: &str = "no available caches";

/// A configured cache serving a delivery service
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheMembership {
    /// Cache host name
    pub cache: CacheName,
    /// Group the cache is aggregated into
    pub cache_group: CacheGroupName,
    /// Type the cache is aggregated into
    pub cache_type: CacheType,
}

impl CacheMembership {
    /// Create a membership record
    pub fn new(
        cache: impl Into<CacheName>,
        cache_group: impl Into<CacheGroupName>,
        cache_type: impl Into<CacheType>,
    ) -> Self {
        Self {
            cache: cache.into(),
            cache_group: cache_group.into(),
            cache_type: cache_type.into(),
        }
    }
}

/// Folds per-cache samples into a delivery service [`Stat`]
#[derive(Debug, Clone, Copy, Default)]
pub struct DeliveryServiceAggregator {
    text: TextMerge,
}

impl DeliveryServiceAggregator {
    /// Create an aggregator using `text` to merge error strings
    pub const fn new(text: TextMerge) -> Self {
        Self { text }
    }

    /// Error text rule in use
    pub const fn text_merge(&self) -> TextMerge {
        self.text
    }

    /// Build a fresh snapshot
    pub fn aggregate(
        &self,
        members: &[CacheMembership],
        samples: &BTreeMap<CacheName, CacheStats>,
        time: i64,
    ) -> Stat {
        let mut stat = Stat::new();
        self.aggregate_into(&mut stat, members, samples, time);
        stat
    }

    /// Rewrite `stat` in place from the latest samples
    ///
    /// Caches without a sample stay in the reporting map as not reporting and
    /// contribute nothing. Samples of caches that are not members are
    /// ignored. A cache listed more than once counts once, under its first
    /// membership. Buckets left without any contributing cache are removed.
    pub fn aggregate_into(
        &self,
        stat: &mut Stat,
        members: &[CacheMembership],
        samples: &BTreeMap<CacheName, CacheStats>,
        time: i64,
    ) {
        let mut groups: BTreeMap<&CacheGroupName, Vec<&CacheStats>> = BTreeMap::new();
        let mut types: BTreeMap<&CacheType, Vec<&CacheStats>> = BTreeMap::new();
        let mut reporting: Vec<(&CacheName, bool)> = Vec::with_capacity(members.len());
        let mut contributing = Vec::with_capacity(members.len());
        let mut seen: BTreeSet<&CacheName> = BTreeSet::new();

        for member in members {
            if !seen.insert(&member.cache) {
                tracing::debug!(cache = %member.cache, "duplicate membership ignored");
                continue;
            }
            let sample = samples.get(&member.cache);
            reporting.push((&member.cache, sample.is_some()));
            if let Some(sample) = sample {
                groups.entry(&member.cache_group).or_default().push(sample);
                types.entry(&member.cache_type).or_default().push(sample);
                contributing.push(sample);
            }
        }

        let available = contributing
            .iter()
            .filter(|s| s.is_available.value)
            .count();
        let errors = contributing
            .iter()
            .any(|s| !s.error_string.value.is_empty());

        for name in stat.cache_group_names() {
            if !groups.contains_key(&name) {
                stat.remove_cache_group(name.as_str());
            }
        }
        for (name, samples) in groups {
            stat.set_cache_group(name.clone(), CacheStats::fold(samples, self.text));
        }

        for name in stat.cache_type_names() {
            if !types.contains_key(&name) {
                stat.remove_cache_type(name.as_str());
            }
        }
        for (name, samples) in types {
            stat.set_cache_type(name.clone(), CacheStats::fold(samples, self.text));
        }

        stat.set_total(CacheStats::fold(contributing, self.text));

        let common = stat.common_mut();
        for name in common.caches_reporting_names() {
            if !seen.contains(&name) {
                common.remove_cache_reporting(name.as_str());
            }
        }
        for (name, is_reporting) in reporting {
            common.set_cache_reporting(name.clone(), is_reporting);
        }

        let configured = i64::try_from(seen.len()).unwrap_or(i64::MAX);
        let available_count = i64::try_from(available).unwrap_or(i64::MAX);
        common.set_caches_configured(configured, time);
        common.set_caches_available(available_count, time);

        let is_available = available > 0;
        common.set_available(is_available, time);
        common.set_healthy(is_available && !errors, time);
        if is_available {
            common.set_status(STATUS_AVAILABLE, time);
            common.set_error("", time);
        } else {
            common.set_status(STATUS_UNAVAILABLE, time);
            common.set_error(ERROR_NO_AVAILABLE_CACHES, time);
        }

        tracing::trace!(
            configured,
            reporting = stat.common_ref().reporting_count(),
            available = available_count,
            "delivery service aggregated"
        );
    }
}
