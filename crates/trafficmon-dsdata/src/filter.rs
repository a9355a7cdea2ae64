//! Selection of stats, delivery services and history depth for the legacy
//! wire shape.

use crate::names::DeliveryServiceName;
use std::collections::BTreeSet;

/// Predicates deciding what the legacy flattening emits
///
/// Implementations usually come from request parameters parsed outside this
/// crate.
pub trait Filter {
    /// Whether the stat should be included
    fn use_stat(&self, name: &str) -> bool;
    /// Whether the delivery service should be included
    fn use_delivery_service(&self, name: &DeliveryServiceName) -> bool;
    /// Whether the history position `index` (0 = newest) is within the
    /// requested depth
    fn within_stat_history_max(&self, index: usize) -> bool;
}

/// Filter accepting everything
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl Filter for AllowAll {
    fn use_stat(&self, _name: &str) -> bool {
        true
    }

    fn use_delivery_service(&self, _name: &DeliveryServiceName) -> bool {
        true
    }

    fn within_stat_history_max(&self, _index: usize) -> bool {
        true
    }
}

/// Allow-list filter
///
/// Empty lists and a missing history count accept everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatFilter {
    stats: BTreeSet<String>,
    delivery_services: BTreeSet<DeliveryServiceName>,
    history_count: Option<usize>,
}

impl StatFilter {
    /// Create a filter that accepts everything
    pub fn new() -> Self {
        Self::default()
    }

    /// Only include the named stats
    #[must_use]
    pub fn with_stats<I, S>(mut self, stats: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.stats.extend(stats.into_iter().map(Into::into));
        self
    }

    /// Only include the named delivery services
    #[must_use]
    pub fn with_delivery_services<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<DeliveryServiceName>,
    {
        self.delivery_services
            .extend(names.into_iter().map(Into::into));
        self
    }

    /// Only include the newest `count` history positions
    #[must_use]
    pub const fn with_history_count(mut self, count: usize) -> Self {
        self.history_count = Some(count);
        self
    }
}

impl Filter for StatFilter {
    fn use_stat(&self, name: &str) -> bool {
        self.stats.is_empty() || self.stats.contains(name)
    }

    fn use_delivery_service(&self, name: &DeliveryServiceName) -> bool {
        self.delivery_services.is_empty() || self.delivery_services.contains(name)
    }

    fn within_stat_history_max(&self, index: usize) -> bool {
        self.history_count.is_none_or(|count| index < count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_filter_accepts_everything() {
        let filter = StatFilter::new();
        assert!(filter.use_stat("total.kbps"));
        assert!(filter.use_delivery_service(&"cdn1".into()));
        assert!(filter.within_stat_history_max(10_000));
    }

    #[test]
    fn test_allow_lists() {
        let filter = StatFilter::new()
            .with_stats(["total.kbps"])
            .with_delivery_services(["cdn1"]);

        assert!(filter.use_stat("total.kbps"));
        assert!(!filter.use_stat("total.tps_total"));
        assert!(filter.use_delivery_service(&"cdn1".into()));
        assert!(!filter.use_delivery_service(&"cdn2".into()));
    }

    #[test]
    fn test_history_count() {
        let filter = StatFilter::new().with_history_count(5);
        assert!(filter.within_stat_history_max(0));
        assert!(filter.within_stat_history_max(4));
        assert!(!filter.within_stat_history_max(5));

        let none = StatFilter::new().with_history_count(0);
        assert!(!none.within_stat_history_max(0));
    }
}
