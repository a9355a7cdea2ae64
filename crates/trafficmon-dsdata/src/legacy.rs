//! Legacy flattened wire shape.
//!
//! Older consumers expect, per delivery service, a map from stat name to an
//! array of samples rather than the structured [`Stat`]. Stat names are
//! dotted paths:
//!
//! ```text
//! caches-configured  caches-available  caches-reporting
//! error-string  status  isHealthy  isAvailable
//! total.<field>  location.<cache group>.<field>  type.<cache type>.<field>
//! ```
//!
//! Consecutive history positions holding the same value collapse into one
//! sample whose `span` counts the positions and whose `index` is the newest
//! position of the run.

use crate::cache_stats::CacheStats;
use crate::common::StatCommonReadonly;
use crate::filter::Filter;
use crate::names::{DeliveryServiceName, StatName};
use crate::scalar::{RenderValue, Timestamped};
use crate::stat::Stat;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One legacy sample
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatOld {
    /// Unix time in milliseconds of the newest observation in the run
    pub time: i64,
    /// Value rendered as text
    pub value: String,
    /// Number of consecutive history positions with this value
    #[serde(default, skip_serializing_if = "is_zero")]
    pub span: usize,
    /// History position of the newest observation in the run
    #[serde(default, skip_serializing_if = "is_zero")]
    pub index: usize,
}

#[allow(clippy::trivially_copy_pass_by_ref)] // serde passes by reference
const fn is_zero(n: &usize) -> bool {
    *n == 0
}

/// Legacy response body
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsOld {
    /// Samples per delivery service and stat name
    #[serde(rename = "deliveryService")]
    pub delivery_service: BTreeMap<DeliveryServiceName, BTreeMap<StatName, Vec<StatOld>>>,
}

/// A single flattened value of one snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyValue {
    /// Dotted stat name
    pub name: StatName,
    /// Observation time, `0` if never observed
    pub time: i64,
    /// Rendered value
    pub value: String,
}

impl LegacyValue {
    fn of<T: RenderValue>(name: impl Into<String>, stat: &Timestamped<T>) -> Self {
        Self {
            name: StatName::new(name),
            time: stat.time,
            value: stat.render(),
        }
    }
}

fn push_aggregate(prefix: &str, stats: &CacheStats, out: &mut Vec<LegacyValue>) {
    let name = |field: &str| format!("{prefix}.{field}");
    out.extend([
        LegacyValue::of(name("out_bytes"), &stats.out_bytes),
        LegacyValue::of(name("isAvailable"), &stats.is_available),
        LegacyValue::of(name("status_5xx"), &stats.status_5xx),
        LegacyValue::of(name("status_4xx"), &stats.status_4xx),
        LegacyValue::of(name("status_3xx"), &stats.status_3xx),
        LegacyValue::of(name("status_2xx"), &stats.status_2xx),
        LegacyValue::of(name("in_bytes"), &stats.in_bytes),
        LegacyValue::of(name("kbps"), &stats.kbps),
        LegacyValue::of(name("tps_5xx"), &stats.tps_5xx),
        LegacyValue::of(name("tps_4xx"), &stats.tps_4xx),
        LegacyValue::of(name("tps_3xx"), &stats.tps_3xx),
        LegacyValue::of(name("tps_2xx"), &stats.tps_2xx),
        LegacyValue::of(name("error_string"), &stats.error_string),
        LegacyValue::of(name("tps_total"), &stats.tps_total),
    ]);
}

/// Flatten one snapshot into named values
pub fn legacy_values(stat: &Stat) -> Vec<LegacyValue> {
    let common = stat.common_ref();
    let configured = common.caches_configured();

    let mut out = vec![
        LegacyValue::of("caches-configured", &configured),
        LegacyValue::of("caches-available", &common.caches_available()),
        // The reporting map carries no timestamp of its own
        LegacyValue {
            name: StatName::from("caches-reporting"),
            time: configured.time,
            value: common.reporting_count().to_string(),
        },
        LegacyValue::of("error-string", &common.error()),
        LegacyValue::of("status", &common.status()),
        LegacyValue::of("isHealthy", &common.healthy()),
        LegacyValue::of("isAvailable", &common.available()),
    ];

    push_aggregate("total", stat.total_ref(), &mut out);
    for (group, stats) in stat.cache_groups() {
        push_aggregate(&format!("location.{group}"), stats, &mut out);
    }
    for (cache_type, stats) in stat.types() {
        push_aggregate(&format!("type.{cache_type}"), stats, &mut out);
    }
    out
}

/// Flatten a newest-first history of one delivery service
///
/// Walking stops at the first history position the filter rejects.
/// Never-observed values and filtered stat names are skipped.
pub fn flatten_history<'a, I>(history: I, filter: &dyn Filter) -> BTreeMap<StatName, Vec<StatOld>>
where
    I: IntoIterator<Item = &'a Stat>,
{
    let mut out: BTreeMap<StatName, Vec<StatOld>> = BTreeMap::new();

    for (index, stat) in history.into_iter().enumerate() {
        if !filter.within_stat_history_max(index) {
            break;
        }

        for value in legacy_values(stat) {
            if value.time == 0 || !filter.use_stat(value.name.as_str()) {
                continue;
            }

            let samples = out.entry(value.name).or_default();
            match samples.last_mut() {
                Some(last) if last.value == value.value && last.index + last.span == index => {
                    last.span += 1;
                }
                _ => samples.push(StatOld {
                    time: value.time,
                    value: value.value,
                    span: 1,
                    index,
                }),
            }
        }
    }

    out
}

/// Build the legacy response for several delivery services
pub fn flatten<'a, D, I>(delivery_services: D, filter: &dyn Filter) -> StatsOld
where
    D: IntoIterator<Item = (&'a DeliveryServiceName, I)>,
    I: IntoIterator<Item = &'a Stat>,
{
    let mut response = StatsOld::default();
    for (name, history) in delivery_services {
        if !filter.use_delivery_service(name) {
            continue;
        }
        let stats = flatten_history(history, filter);
        if !stats.is_empty() {
            response.delivery_service.insert(name.clone(), stats);
        }
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{AllowAll, StatFilter};
    use crate::scalar::{StatFloat, StatString};
    use pretty_assertions::assert_eq;

    struct RejectErrors;

    impl Filter for RejectErrors {
        fn use_stat(&self, name: &str) -> bool {
            !name.ends_with("error_string")
        }

        fn use_delivery_service(&self, _name: &DeliveryServiceName) -> bool {
            true
        }

        fn within_stat_history_max(&self, _index: usize) -> bool {
            true
        }
    }

    fn snapshot(kbps: f64, time: i64) -> Stat {
        let mut stat = Stat::new();
        stat.set_total(CacheStats {
            kbps: StatFloat::new(kbps, time),
            error_string: StatString::new("slow".to_string(), time),
            ..CacheStats::default()
        });
        stat
    }

    #[test]
    fn test_unobserved_values_are_skipped() {
        let flattened = flatten_history([&Stat::new()], &AllowAll);
        assert!(flattened.is_empty());
    }

    #[test]
    fn test_filter_excludes_stats() {
        let stat = snapshot(10.0, 1000);
        let flattened = flatten_history([&stat], &RejectErrors);

        assert!(flattened.contains_key("total.kbps"));
        assert!(!flattened.keys().any(|k| k.as_str().ends_with("error_string")));
    }

    #[test]
    fn test_history_bound() {
        let history: Vec<Stat> = (0..10)
            .map(|i| snapshot(f64::from(i), 1000 + i64::from(i)))
            .collect();
        let filter = StatFilter::new().with_history_count(5);

        let flattened = flatten_history(&history, &filter);
        let kbps = &flattened["total.kbps"];
        assert_eq!(kbps.len(), 5);
        assert_eq!(kbps[0].value, "0");
        assert_eq!(kbps[4].index, 4);
    }

    #[test]
    fn test_identical_values_collapse_into_spans() {
        let history = vec![
            snapshot(5.0, 3000),
            snapshot(5.0, 2000),
            snapshot(7.0, 1000),
        ];

        let flattened = flatten_history(&history, &AllowAll);
        assert_eq!(
            flattened["total.kbps"],
            vec![
                StatOld {
                    time: 3000,
                    value: "5".to_string(),
                    span: 2,
                    index: 0,
                },
                StatOld {
                    time: 1000,
                    value: "7".to_string(),
                    span: 1,
                    index: 2,
                },
            ]
        );
    }

    #[test]
    fn test_bucket_names() {
        let mut stat = Stat::new();
        let observed = CacheStats {
            kbps: StatFloat::new(1.0, 10),
            ..CacheStats::default()
        };
        stat.set_cache_group("den", observed.clone());
        stat.set_cache_type("EDGE", observed);
        stat.common_mut().set_cache_reporting("edge-01", true);
        stat.common_mut().set_caches_configured(1, 10);

        let flattened = flatten_history([&stat], &AllowAll);
        assert!(flattened.contains_key("location.den.kbps"));
        assert!(flattened.contains_key("type.EDGE.kbps"));
        assert_eq!(flattened["caches-reporting"][0].value, "1");
        assert_eq!(flattened["caches-configured"][0].value, "1");
    }

    #[test]
    fn test_flatten_filters_delivery_services() {
        let a = DeliveryServiceName::from("cdn1");
        let b = DeliveryServiceName::from("cdn2");
        let stat = snapshot(1.0, 10);
        let filter = StatFilter::new().with_delivery_services(["cdn2"]);

        let response = flatten(
            [(&a, std::slice::from_ref(&stat)), (&b, std::slice::from_ref(&stat))],
            &filter,
        );
        assert!(!response.delivery_service.contains_key("cdn1"));
        assert!(response.delivery_service.contains_key("cdn2"));
    }

    #[test]
    fn test_wire_shape() {
        let stat = snapshot(2.5, 10);
        let name = DeliveryServiceName::from("cdn1");
        let filter = StatFilter::new().with_stats(["total.kbps"]);
        let response = flatten([(&name, [&stat])], &filter);

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "deliveryService": {
                    "cdn1": {
                        "total.kbps": [{"time": 10, "value": "2.5", "span": 1}]
                    }
                }
            })
        );
    }
}
