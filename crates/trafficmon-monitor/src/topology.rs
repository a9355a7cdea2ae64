//! Cache topology management.
//!
//! Loads the configured caches (host name, cache group, cache type and the
//! delivery services each one serves) from a JSON file and indexes them by
//! delivery service.

use crate::error::TopologyError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use trafficmon_dsdata::{CacheMembership, CacheName, DeliveryServiceName};

/// A single configured cache.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct CacheRecord {
    /// Cache host name (e.g., "edge-den-01")
    pub name: String,

    /// Cache group the cache belongs to (e.g., "den")
    #[serde(rename = "cachegroup")]
    pub cache_group: String,

    /// Cache type (e.g., "EDGE", "MID")
    #[serde(rename = "type")]
    pub cache_type: String,

    /// Delivery services served by the cache
    #[serde(rename = "deliveryServices", default)]
    pub delivery_services: Vec<String>,
}

impl CacheRecord {
    /// Validate all fields in the cache record.
    ///
    /// # Errors
    ///
    /// Returns `TopologyError::InvalidField` if any field is empty.
    pub fn validate(&self) -> Result<(), TopologyError> {
        if self.name.trim().is_empty() {
            return Err(TopologyError::InvalidField {
                field: "name".to_string(),
                cache: self.name.clone(),
                reason: "cache name cannot be empty".to_string(),
            });
        }

        if self.cache_group.trim().is_empty() {
            return Err(TopologyError::InvalidField {
                field: "cachegroup".to_string(),
                cache: self.name.clone(),
                reason: "cache group cannot be empty".to_string(),
            });
        }

        if self.cache_type.trim().is_empty() {
            return Err(TopologyError::InvalidField {
                field: "type".to_string(),
                cache: self.name.clone(),
                reason: "cache type cannot be empty".to_string(),
            });
        }

        if let Some(ds) = self.delivery_services.iter().find(|ds| ds.trim().is_empty()) {
            return Err(TopologyError::InvalidField {
                field: "deliveryServices".to_string(),
                cache: self.name.clone(),
                reason: format!("delivery service name cannot be empty: '{ds}'"),
            });
        }

        let mut seen = BTreeSet::new();
        if let Some(ds) = self
            .delivery_services
            .iter()
            .find(|ds| !seen.insert(ds.as_str()))
        {
            return Err(TopologyError::InvalidField {
                field: "deliveryServices".to_string(),
                cache: self.name.clone(),
                reason: format!("delivery service listed more than once: '{ds}'"),
            });
        }

        Ok(())
    }

    fn membership(&self) -> CacheMembership {
        CacheMembership::new(
            self.name.as_str(),
            self.cache_group.as_str(),
            self.cache_type.as_str(),
        )
    }
}

/// Configured caches, indexed by delivery service.
#[derive(Debug, Clone, Default)]
pub struct Topology {
    /// Members of each delivery service, in file order
    members_by_ds: BTreeMap<DeliveryServiceName, Vec<CacheMembership>>,

    /// Every configured cache
    caches: BTreeSet<CacheName>,
}

impl Topology {
    /// Load the topology from a JSON file.
    ///
    /// The file should contain a JSON array of `CacheRecord` objects.
    ///
    /// # Errors
    ///
    /// Returns `TopologyError` if:
    /// - File cannot be read
    /// - JSON is malformed
    /// - No caches are configured
    /// - Any record fails validation or a cache appears twice
    pub fn from_file(path: &Path) -> Result<Self, TopologyError> {
        let file = File::open(path).map_err(|source| TopologyError::LoadFailed {
            path: path.to_path_buf(),
            source,
        })?;

        let reader = BufReader::new(file);
        let records: Vec<CacheRecord> = serde_json::from_reader(reader)?;
        Self::from_records(records)
    }

    /// Build the topology from already parsed records.
    ///
    /// # Errors
    ///
    /// Same as [`Topology::from_file`], minus I/O and JSON failures.
    pub fn from_records(records: Vec<CacheRecord>) -> Result<Self, TopologyError> {
        if records.is_empty() {
            return Err(TopologyError::EmptyTopology);
        }

        let mut topology = Self::default();
        for record in records {
            record.validate()?;

            if !topology.caches.insert(CacheName::from(record.name.as_str())) {
                return Err(TopologyError::DuplicateCache(record.name));
            }

            let membership = record.membership();
            for ds in &record.delivery_services {
                topology
                    .members_by_ds
                    .entry(DeliveryServiceName::from(ds.as_str()))
                    .or_default()
                    .push(membership.clone());
            }
        }

        Ok(topology)
    }

    /// Get the configured members of a delivery service.
    #[must_use]
    pub fn members(&self, delivery_service: &str) -> Option<&[CacheMembership]> {
        self.members_by_ds.get(delivery_service).map(Vec::as_slice)
    }

    /// Iterate over delivery services and their members.
    pub fn delivery_services(
        &self,
    ) -> impl Iterator<Item = (&DeliveryServiceName, &[CacheMembership])> {
        self.members_by_ds
            .iter()
            .map(|(name, members)| (name, members.as_slice()))
    }

    /// Whether a delivery service is configured.
    #[must_use]
    pub fn contains_delivery_service(&self, name: &DeliveryServiceName) -> bool {
        self.members_by_ds.contains_key(name)
    }

    /// Whether a cache is configured.
    #[must_use]
    pub fn contains_cache(&self, name: &str) -> bool {
        self.caches.contains(name)
    }

    /// Total number of configured caches.
    #[must_use]
    pub fn total_caches(&self) -> usize {
        self.caches.len()
    }

    /// Total number of configured delivery services.
    #[must_use]
    pub fn total_delivery_services(&self) -> usize {
        self.members_by_ds.len()
    }
}
