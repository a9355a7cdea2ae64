//! Statistics for every known delivery service, with bounded history.
//!
//! Each delivery service has a latest [`Stat`] that the producer rewrites in
//! place every collection cycle, and a newest-first history of the snapshots
//! taken when earlier cycles finished. The legacy flattening reads the
//! history; structured readers see the latest snapshot.

use crate::filter::Filter;
use crate::legacy::{self, StatsOld};
use crate::names::DeliveryServiceName;
use crate::stat::{Stat, StatReadonly};
use std::collections::{BTreeMap, VecDeque};

/// Number of completed cycles kept per delivery service by default
pub const DEFAULT_MAX_HISTORY: usize = 60;

/// Read-only view of [`Stats`]
pub trait StatsReadonly {
    /// Latest snapshot of a delivery service
    fn get(&self, name: &str) -> Option<&dyn StatReadonly>;
    /// Every known delivery service, sorted
    fn delivery_services(&self) -> Vec<DeliveryServiceName>;
    /// Legacy flattened history
    fn json(&self, filter: &dyn Filter) -> StatsOld;
}

#[derive(Debug, Clone, Default)]
struct DeliveryServiceStats {
    latest: Stat,
    history: VecDeque<Stat>,
}

/// Latest snapshots and history for all delivery services
#[derive(Debug, Clone)]
pub struct Stats {
    delivery_services: BTreeMap<DeliveryServiceName, DeliveryServiceStats>,
    max_history: usize,
}

impl Default for Stats {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HISTORY)
    }
}

impl Stats {
    /// Create an empty collection keeping `max_history` cycles (at least one)
    pub fn new(max_history: usize) -> Self {
        Self {
            delivery_services: BTreeMap::new(),
            max_history: max_history.max(1),
        }
    }

    /// Number of cycles kept per delivery service
    pub const fn max_history(&self) -> usize {
        self.max_history
    }

    /// Latest snapshot for `name`, creating an empty one the first time the
    /// delivery service is seen
    pub fn ensure_delivery_service(&mut self, name: impl Into<DeliveryServiceName>) -> &mut Stat {
        let name = name.into();
        &mut self
            .delivery_services
            .entry(name)
            .or_insert_with_key(|name| {
                tracing::debug!(delivery_service = %name, "delivery service added");
                DeliveryServiceStats::default()
            })
            .latest
    }

    /// Latest snapshot for an existing delivery service
    pub fn stat_mut(&mut self, name: &str) -> Option<&mut Stat> {
        self.delivery_services.get_mut(name).map(|ds| &mut ds.latest)
    }

    /// Drop a delivery service together with its history
    pub fn remove_delivery_service(&mut self, name: &str) -> bool {
        let removed = self.delivery_services.remove(name).is_some();
        if removed {
            tracing::debug!(delivery_service = name, "delivery service removed");
        }
        removed
    }

    /// Archive every latest snapshot at the front of its history
    pub fn finish_cycle(&mut self) {
        let max_history = self.max_history;
        for ds in self.delivery_services.values_mut() {
            ds.history.push_front(ds.latest.copy());
            ds.history.truncate(max_history);
        }
    }

    /// Completed cycles of a delivery service, newest first
    pub fn history(&self, name: &str) -> Option<impl Iterator<Item = &Stat>> {
        self.delivery_services.get(name).map(|ds| ds.history.iter())
    }

    /// Copies of the latest snapshots of the delivery services the filter
    /// accepts
    pub fn structured(&self, filter: &dyn Filter) -> BTreeMap<DeliveryServiceName, Stat> {
        self.delivery_services
            .iter()
            .filter(|(name, _)| filter.use_delivery_service(name))
            .map(|(name, ds)| (name.clone(), ds.latest.copy()))
            .collect()
    }

    pub(crate) fn latest_snapshots(&self) -> BTreeMap<DeliveryServiceName, Stat> {
        self.delivery_services
            .iter()
            .map(|(name, ds)| (name.clone(), ds.latest.copy()))
            .collect()
    }

    /// Make `latest` the full set of delivery services: unknown names are
    /// added, missing ones removed with their history
    pub(crate) fn replace_latest(&mut self, mut latest: BTreeMap<DeliveryServiceName, Stat>) {
        self.delivery_services.retain(|name, _| {
            let keep = latest.contains_key(name);
            if !keep {
                tracing::debug!(delivery_service = %name, "delivery service removed");
            }
            keep
        });
        for (name, ds) in &mut self.delivery_services {
            if let Some(stat) = latest.remove(name) {
                ds.latest = stat;
            }
        }
        for (name, stat) in latest {
            tracing::debug!(delivery_service = %name, "delivery service added");
            self.delivery_services.insert(
                name,
                DeliveryServiceStats {
                    latest: stat,
                    history: VecDeque::new(),
                },
            );
        }
    }
}

impl StatsReadonly for Stats {
    fn get(&self, name: &str) -> Option<&dyn StatReadonly> {
        self.delivery_services
            .get(name)
            .map(|ds| &ds.latest as &dyn StatReadonly)
    }

    fn delivery_services(&self) -> Vec<DeliveryServiceName> {
        self.delivery_services.keys().cloned().collect()
    }

    fn json(&self, filter: &dyn Filter) -> StatsOld {
        legacy::flatten(
            self.delivery_services
                .iter()
                .map(|(name, ds)| (name, ds.history.iter())),
            filter,
        )
    }
}
