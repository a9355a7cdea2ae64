//! Delivery service statistics for a monitored cache fleet
//!
//! This crate models the health and traffic picture of every delivery service
//! served by a fleet of content caches. Per-cache samples produced by an
//! external collector are folded into per-cache-group, per-cache-type and
//! total aggregates, and handed to concurrent readers as isolated copies.
//!
//! # Architecture
//!
//! ```text
//! collector samples ──► DeliveryServiceAggregator ──► StatsUpdate (staged)
//!                                                          │ commit
//!                                                          ▼
//!                    readers ◄── copies ◄── SharedStats (latest + history)
//!                                                          │
//!                                              legacy flattening (Filter)
//! ```
//!
//! - [`scalar`]: timestamped values, one per metric
//! - [`cache_stats`]: the cache-level aggregate and its combination operator
//! - [`common`]: configuration and health bookkeeping
//! - [`stat`]: the composite snapshot of one delivery service
//! - [`stats`]: every delivery service with bounded history
//! - [`shared`]: the single-producer / many-reader boundary
//! - [`filter`] and [`legacy`]: the historical array-of-samples wire shape
//!
//! Readers only see the narrow read-only traits ([`StatsReadonly`],
//! [`StatReadonly`], [`StatCommonReadonly`]), which never expose the live
//! maps.
//!
//! # Example
//!
//! ```rust
//! use std::collections::BTreeMap;
//! use trafficmon_dsdata::{
//!     CacheMembership, CacheName, CacheStats, DeliveryServiceAggregator, SharedStats,
//!     StatFilter, StatInt, StatReadonly,
//! };
//!
//! let shared = SharedStats::new(60);
//! let members = vec![CacheMembership::new("edge-01", "den", "EDGE")];
//! let mut samples: BTreeMap<CacheName, CacheStats> = BTreeMap::new();
//! samples.insert(
//!     "edge-01".into(),
//!     CacheStats {
//!         status_2xx: StatInt::new(100, 1_700_000_000_000),
//!         ..CacheStats::default()
//!     },
//! );
//!
//! let aggregator = DeliveryServiceAggregator::default();
//! let mut update = shared.begin_update();
//! aggregator.aggregate_into(update.stat_mut("cdn1"), &members, &samples, 1_700_000_000_000);
//! update.commit();
//!
//! let stat = shared.get("cdn1").expect("delivery service is known");
//! assert_eq!(stat.total().status_2xx.value, 100);
//!
//! let legacy = shared.json(&StatFilter::new().with_stats(["total.status_2xx"]));
//! assert_eq!(legacy.delivery_service["cdn1"]["total.status_2xx"][0].value, "100");
//! ```

#![warn(missing_docs)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod aggregate;
pub mod cache_stats;
pub mod common;
pub mod error;
pub mod filter;
pub mod legacy;
pub mod names;
pub mod scalar;
pub mod shared;
pub mod stat;
pub mod stats;

pub use aggregate::{CacheMembership, DeliveryServiceAggregator};
pub use cache_stats::{CacheStats, TextMerge};
pub use common::{StatCommon, StatCommonReadonly};
pub use error::StatError;
pub use filter::{AllowAll, Filter, StatFilter};
pub use legacy::{StatOld, StatsOld};
pub use names::{CacheGroupName, CacheName, CacheType, DeliveryServiceName, StatName};
pub use scalar::{StatBool, StatFloat, StatInt, StatString, Timestamped, now_millis};
pub use shared::{SharedStats, StatsUpdate};
pub use stat::{Stat, StatReadonly};
pub use stats::{DEFAULT_MAX_HISTORY, Stats, StatsReadonly};
