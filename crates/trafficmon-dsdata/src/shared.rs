//! Shared handle serializing one producer against many readers.
//!
//! A producer calls [`SharedStats::begin_update`], mutates the staged copy of
//! the latest snapshots, and calls [`StatsUpdate::commit`]. Only one update
//! can be open at a time. Readers keep reading the previous state while an
//! update is staged, and only ever receive copies, so they never observe a
//! partially applied cycle.

use crate::filter::Filter;
use crate::legacy::StatsOld;
use crate::names::DeliveryServiceName;
use crate::stat::{Stat, StatReadonly};
use crate::stats::{Stats, StatsReadonly};
use parking_lot::{RwLock, RwLockUpgradableReadGuard};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Cloneable handle to a [`Stats`] collection
#[derive(Debug, Clone, Default)]
pub struct SharedStats {
    inner: Arc<RwLock<Stats>>,
}

impl SharedStats {
    /// Create an empty collection keeping `max_history` cycles
    pub fn new(max_history: usize) -> Self {
        Self::from_stats(Stats::new(max_history))
    }

    /// Share an existing collection
    pub fn from_stats(stats: Stats) -> Self {
        Self {
            inner: Arc::new(RwLock::new(stats)),
        }
    }

    /// Start a collection cycle
    ///
    /// Blocks while another update is open.
    pub fn begin_update(&self) -> StatsUpdate<'_> {
        let guard = self.inner.upgradable_read();
        let staged = guard.latest_snapshots();
        StatsUpdate { guard, staged }
    }

    /// Copy of the latest snapshot of a delivery service
    pub fn get(&self, name: &str) -> Option<Stat> {
        self.inner.read().get(name).map(|stat| stat.copy())
    }

    /// Every known delivery service
    pub fn delivery_services(&self) -> Vec<DeliveryServiceName> {
        self.inner.read().delivery_services()
    }

    /// Deep copy of the whole collection, history included
    pub fn snapshot(&self) -> Stats {
        self.inner.read().clone()
    }

    /// Copies of the latest snapshots the filter accepts
    pub fn structured(&self, filter: &dyn Filter) -> BTreeMap<DeliveryServiceName, Stat> {
        self.inner.read().structured(filter)
    }

    /// Legacy flattened history
    pub fn json(&self, filter: &dyn Filter) -> StatsOld {
        self.inner.read().json(filter)
    }
}

/// An open collection cycle
///
/// Dropping the update without calling [`StatsUpdate::commit`] discards every
/// staged change.
pub struct StatsUpdate<'a> {
    guard: RwLockUpgradableReadGuard<'a, Stats>,
    staged: BTreeMap<DeliveryServiceName, Stat>,
}

impl StatsUpdate<'_> {
    /// Staged snapshot of a delivery service, created empty if unknown
    pub fn stat_mut(&mut self, name: impl Into<DeliveryServiceName>) -> &mut Stat {
        self.staged.entry(name.into()).or_default()
    }

    /// Staged snapshot of a delivery service
    pub fn get(&self, name: &str) -> Option<&Stat> {
        self.staged.get(name)
    }

    /// Delivery services present in the staged state
    pub fn delivery_services(&self) -> impl Iterator<Item = &DeliveryServiceName> {
        self.staged.keys()
    }

    /// Remove a delivery service; its history is dropped on commit
    pub fn remove_delivery_service(&mut self, name: &str) -> bool {
        self.staged.remove(name).is_some()
    }

    /// Keep only the delivery services for which `keep` returns true
    pub fn retain(&mut self, mut keep: impl FnMut(&DeliveryServiceName) -> bool) {
        self.staged.retain(|name, _| keep(name));
    }

    /// Publish the staged snapshots and archive them into history
    pub fn commit(self) {
        let staged_count = self.staged.len();
        let mut stats = RwLockUpgradableReadGuard::upgrade(self.guard);
        stats.replace_latest(self.staged);
        stats.finish_cycle();
        tracing::debug!(delivery_services = staged_count, "statistics cycle committed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache_stats::CacheStats;
    use crate::filter::AllowAll;
    use crate::scalar::StatInt;
    use std::thread;

    fn tps(value: i64) -> CacheStats {
        CacheStats {
            tps_total: StatInt::new(value, value),
            ..CacheStats::default()
        }
    }

    #[test]
    fn test_commit_publishes() {
        let shared = SharedStats::new(10);
        let mut update = shared.begin_update();
        update.stat_mut("cdn1").set_total(tps(5));
        update.commit();

        assert_eq!(shared.get("cdn1").unwrap().total().tps_total.value, 5);
        assert_eq!(shared.snapshot().history("cdn1").unwrap().count(), 1);
    }

    #[test]
    fn test_dropped_update_is_discarded() {
        let shared = SharedStats::new(10);
        {
            let mut update = shared.begin_update();
            update.stat_mut("cdn1").set_total(tps(5));
        }
        assert!(shared.get("cdn1").is_none());
        assert!(shared.delivery_services().is_empty());
    }

    #[test]
    fn test_readers_see_previous_state_while_staged() {
        let shared = SharedStats::new(10);
        let mut update = shared.begin_update();
        update.stat_mut("cdn1").set_total(tps(1));
        update.commit();

        let mut update = shared.begin_update();
        update.stat_mut("cdn1").set_total(tps(2));
        assert_eq!(shared.get("cdn1").unwrap().total().tps_total.value, 1);
        update.commit();
        assert_eq!(shared.get("cdn1").unwrap().total().tps_total.value, 2);
    }

    #[test]
    fn test_removed_delivery_service_drops_history() {
        let shared = SharedStats::new(10);
        let mut update = shared.begin_update();
        update.stat_mut("cdn1").set_total(tps(1));
        update.stat_mut("cdn2").set_total(tps(1));
        update.commit();

        let mut update = shared.begin_update();
        assert!(update.remove_delivery_service("cdn2"));
        update.commit();

        let snapshot = shared.snapshot();
        assert!(snapshot.history("cdn2").is_none());
        assert_eq!(snapshot.history("cdn1").unwrap().count(), 2);
        assert!(!shared.json(&AllowAll).delivery_service.contains_key("cdn2"));
    }

    #[test]
    fn test_reader_copy_is_isolated() {
        let shared = SharedStats::new(10);
        let mut update = shared.begin_update();
        update.stat_mut("cdn1").set_cache_group("den", tps(1));
        update.commit();

        let mut copy = shared.get("cdn1").unwrap();
        copy.set_cache_group("den", tps(100));
        copy.set_cache_group("lax", tps(100));

        let current = shared.get("cdn1").unwrap();
        assert_eq!(current.cache_group("den").unwrap().tps_total.value, 1);
        assert!(current.cache_group("lax").is_none());
    }

    #[test]
    fn test_concurrent_readers_and_producer() {
        let shared = SharedStats::new(5);
        let producer = {
            let shared = shared.clone();
            thread::spawn(move || {
                for i in 1..=100 {
                    let mut update = shared.begin_update();
                    let stat = update.stat_mut("cdn1");
                    stat.set_cache_group("den", tps(i));
                    stat.set_cache_group("lax", tps(i));
                    stat.recompute_total(crate::cache_stats::TextMerge::Concatenate);
                    update.commit();
                }
            })
        };

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let shared = shared.clone();
                thread::spawn(move || {
                    for _ in 0..100 {
                        if let Some(stat) = shared.get("cdn1") {
                            let den = stat.cache_group("den").unwrap().tps_total.value;
                            let lax = stat.cache_group("lax").unwrap().tps_total.value;
                            assert_eq!(den, lax);
                            assert_eq!(stat.total().tps_total.value, den + lax);
                        }
                    }
                })
            })
            .collect();

        producer.join().unwrap();
        for reader in readers {
            reader.join().unwrap();
        }

        assert_eq!(shared.get("cdn1").unwrap().total().tps_total.value, 200);
        assert_eq!(shared.snapshot().history("cdn1").unwrap().count(), 5);
    }
}
