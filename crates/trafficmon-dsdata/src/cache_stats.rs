//! Cache-level aggregate and its combination operator.
//!
//! [`CacheStats`] holds the traffic metrics reported by one cache. The same
//! type is used for buckets (a cache group, a cache type, or the delivery
//! service total) built by folding many caches together with
//! [`CacheStats::sum`].
//!
//! # Combination rule
//!
//! - counters and rates are added (integers wrap on overflow, so the
//!   operator is total)
//! - the availability flag is OR-ed
//! - error text follows a [`TextMerge`] rule, concatenation by default
//! - every output timestamp is the newer of the two input timestamps
//!
//! Numeric and boolean fields are commutative and associative under this
//! rule, and the all-default aggregate is the identity, so buckets can be
//! built by folding caches in any order.

use crate::error::StatError;
use crate::scalar::{StatBool, StatFloat, StatInt, StatString, Timestamped};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::iter::Sum;
use std::str::FromStr;

/// How error text is combined when two aggregates are summed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextMerge {
    /// Append the right text to the left one
    #[default]
    Concatenate,
    /// Join non-empty texts with `"; "`
    Delimited,
    /// Keep the text with the newer timestamp, the left one on ties
    Latest,
}

impl TextMerge {
    const DELIMITER: &'static str = "; ";

    fn merge(self, a: &StatString, b: &StatString) -> String {
        match self {
            Self::Concatenate => format!("{}{}", a.value, b.value),
            Self::Delimited => match (a.value.is_empty(), b.value.is_empty()) {
                (true, _) => b.value.clone(),
                (_, true) => a.value.clone(),
                _ => format!("{}{}{}", a.value, Self::DELIMITER, b.value),
            },
            Self::Latest => {
                if b.time > a.time {
                    b.value.clone()
                } else {
                    a.value.clone()
                }
            }
        }
    }
}

impl fmt::Display for TextMerge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Concatenate => "concatenate",
            Self::Delimited => "delimited",
            Self::Latest => "latest",
        };
        f.write_str(name)
    }
}

impl FromStr for TextMerge {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "concatenate" => Ok(Self::Concatenate),
            "delimited" => Ok(Self::Delimited),
            "latest" => Ok(Self::Latest),
            other => Err(format!(
                "unknown text merge rule '{other}' (expected concatenate, delimited or latest)"
            )),
        }
    }
}

/// Traffic statistics for one cache, or for a bucket of caches
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Bytes sent to clients
    pub out_bytes: StatInt,
    /// Whether the cache (or any cache in the bucket) is available
    pub is_available: StatBool,
    /// 5xx responses
    pub status_5xx: StatInt,
    /// 4xx responses
    pub status_4xx: StatInt,
    /// 3xx responses
    pub status_3xx: StatInt,
    /// 2xx responses
    pub status_2xx: StatInt,
    /// Inbound byte rate
    pub in_bytes: StatFloat,
    /// Outbound bitrate in kilobits per second
    pub kbps: StatFloat,
    /// 5xx transactions per second
    pub tps_5xx: StatInt,
    /// 4xx transactions per second
    pub tps_4xx: StatInt,
    /// 3xx transactions per second
    pub tps_3xx: StatInt,
    /// 2xx transactions per second
    pub tps_2xx: StatInt,
    /// Error text reported for the cache
    pub error_string: StatString,
    /// Total transactions per second
    pub tps_total: StatInt,
}

fn add_int(a: &StatInt, b: &StatInt) -> StatInt {
    Timestamped::new(a.value.wrapping_add(b.value), a.time.max(b.time))
}

fn add_float(a: &StatFloat, b: &StatFloat) -> StatFloat {
    Timestamped::new(a.value + b.value, a.time.max(b.time))
}

/// 2^63, the first float above the `i64` range
const I64_LIMIT: f64 = 9_223_372_036_854_775_808.0;

/// Floats convert only when integral and inside the `i64` range
fn integral_float(f: f64) -> Option<i64> {
    (f.is_finite() && f.fract() == 0.0 && (-I64_LIMIT..I64_LIMIT).contains(&f))
        .then_some(f as i64)
}

fn int_value(name: &str, value: &Value) -> Result<i64, StatError> {
    let parsed = match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(integral_float)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| StatError::InvalidValue {
        name: name.to_string(),
        reason: format!("expected an integer, got {value}"),
    })
}

fn float_value(name: &str, value: &Value) -> Result<f64, StatError> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed
        .filter(|f| f.is_finite())
        .ok_or_else(|| StatError::InvalidValue {
            name: name.to_string(),
            reason: format!("expected a finite number, got {value}"),
        })
}

fn bool_value(name: &str, value: &Value) -> Result<bool, StatError> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::String(s) if s.eq_ignore_ascii_case("true") => Ok(true),
        Value::String(s) if s.eq_ignore_ascii_case("false") => Ok(false),
        _ => Err(StatError::InvalidValue {
            name: name.to_string(),
            reason: format!("expected a boolean, got {value}"),
        }),
    }
}

fn text_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

impl CacheStats {
    /// Raw keys a collector may send that are deliberately not aggregated
    pub const NOT_PROCESSED: [&'static str; 2] = ["status_unknown", "tps_unknown"];

    /// Combine two aggregates, concatenating error text
    #[must_use]
    pub fn sum(&self, other: &Self) -> Self {
        self.sum_with(other, TextMerge::Concatenate)
    }

    /// Combine two aggregates using the given error text rule
    #[must_use]
    pub fn sum_with(&self, other: &Self, text: TextMerge) -> Self {
        Self {
            out_bytes: add_int(&self.out_bytes, &other.out_bytes),
            is_available: Timestamped::new(
                self.is_available.value || other.is_available.value,
                self.is_available.time.max(other.is_available.time),
            ),
            status_5xx: add_int(&self.status_5xx, &other.status_5xx),
            status_4xx: add_int(&self.status_4xx, &other.status_4xx),
            status_3xx: add_int(&self.status_3xx, &other.status_3xx),
            status_2xx: add_int(&self.status_2xx, &other.status_2xx),
            in_bytes: add_float(&self.in_bytes, &other.in_bytes),
            kbps: add_float(&self.kbps, &other.kbps),
            tps_5xx: add_int(&self.tps_5xx, &other.tps_5xx),
            tps_4xx: add_int(&self.tps_4xx, &other.tps_4xx),
            tps_3xx: add_int(&self.tps_3xx, &other.tps_3xx),
            tps_2xx: add_int(&self.tps_2xx, &other.tps_2xx),
            error_string: Timestamped::new(
                text.merge(&self.error_string, &other.error_string),
                self.error_string.time.max(other.error_string.time),
            ),
            tps_total: add_int(&self.tps_total, &other.tps_total),
        }
    }

    /// Fold any number of aggregates, starting from the empty aggregate
    pub fn fold<'a>(items: impl IntoIterator<Item = &'a Self>, text: TextMerge) -> Self {
        items
            .into_iter()
            .fold(Self::default(), |acc, item| acc.sum_with(item, text))
    }

    /// Set one field from a raw collector key
    ///
    /// Keys use the wire names of the fields. Keys listed in
    /// [`Self::NOT_PROCESSED`] yield [`StatError::NotProcessed`] and leave the
    /// aggregate untouched.
    pub fn apply_raw(&mut self, name: &str, value: &Value, time: i64) -> Result<(), StatError> {
        match name {
            "out_bytes" => self.out_bytes.set(int_value(name, value)?, time),
            "is_available" => self.is_available.set(bool_value(name, value)?, time),
            "status_5xx" => self.status_5xx.set(int_value(name, value)?, time),
            "status_4xx" => self.status_4xx.set(int_value(name, value)?, time),
            "status_3xx" => self.status_3xx.set(int_value(name, value)?, time),
            "status_2xx" => self.status_2xx.set(int_value(name, value)?, time),
            "in_bytes" => self.in_bytes.set(float_value(name, value)?, time),
            "kbps" => self.kbps.set(float_value(name, value)?, time),
            "tps_5xx" => self.tps_5xx.set(int_value(name, value)?, time),
            "tps_4xx" => self.tps_4xx.set(int_value(name, value)?, time),
            "tps_3xx" => self.tps_3xx.set(int_value(name, value)?, time),
            "tps_2xx" => self.tps_2xx.set(int_value(name, value)?, time),
            "error_string" => self.error_string.set(text_value(value), time),
            "tps_total" => self.tps_total.set(int_value(name, value)?, time),
            _ if Self::NOT_PROCESSED.contains(&name) => {
                return Err(StatError::NotProcessed(name.to_string()));
            }
            _ => return Err(StatError::UnknownStat(name.to_string())),
        }
        Ok(())
    }

    /// Newest timestamp over every field
    pub fn latest_time(&self) -> i64 {
        [
            self.out_bytes.time,
            self.is_available.time,
            self.status_5xx.time,
            self.status_4xx.time,
            self.status_3xx.time,
            self.status_2xx.time,
            self.in_bytes.time,
            self.kbps.time,
            self.tps_5xx.time,
            self.tps_4xx.time,
            self.tps_3xx.time,
            self.tps_2xx.time,
            self.error_string.time,
            self.tps_total.time,
        ]
        .into_iter()
        .max()
        .unwrap_or_default()
    }
}

impl<'a> Sum<&'a CacheStats> for CacheStats {
    fn sum<I: Iterator<Item = &'a CacheStats>>(iter: I) -> Self {
        Self::fold(iter, TextMerge::Concatenate)
    }
}
