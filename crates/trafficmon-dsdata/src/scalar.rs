//! Timestamped scalar values.
//!
//! Each individual metric carries its own last-update time so that siblings
//! in the same aggregate can age independently. A time of `0` means the value
//! has never been set by a producer and must not be read as a real zero.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// A value together with the Unix time (milliseconds) it was last set
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Timestamped<T> {
    /// Unix time in milliseconds of the last update, `0` if never observed
    pub time: i64,
    /// The observed value
    pub value: T,
}

/// Floating point metric
pub type StatFloat = Timestamped<f64>;
/// Integer metric
pub type StatInt = Timestamped<i64>;
/// Flag metric
pub type StatBool = Timestamped<bool>;
/// Text metric
pub type StatString = Timestamped<String>;

impl<T> Timestamped<T> {
    /// Create a value observed at `time`
    pub const fn new(value: T, time: i64) -> Self {
        Self { time, value }
    }

    /// Replace the value, recording when it was observed
    pub fn set(&mut self, value: T, time: i64) {
        self.value = value;
        self.time = time;
    }

    /// Whether a producer has ever set this value
    #[inline]
    pub const fn is_observed(&self) -> bool {
        self.time != 0
    }
}

/// Rendering of a scalar value as text for the legacy wire shape
pub trait RenderValue {
    /// Render the value
    fn render(&self) -> String;
}

impl RenderValue for i64 {
    fn render(&self) -> String {
        self.to_string()
    }
}

impl RenderValue for f64 {
    fn render(&self) -> String {
        // Display gives the shortest representation that round-trips
        self.to_string()
    }
}

impl RenderValue for bool {
    fn render(&self) -> String {
        self.to_string()
    }
}

impl RenderValue for String {
    fn render(&self) -> String {
        self.clone()
    }
}

impl<T: RenderValue> Timestamped<T> {
    /// Render the value as text
    pub fn render(&self) -> String {
        self.value.render()
    }
}

/// Current wall clock time in Unix milliseconds
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_unobserved() {
        let stat = StatInt::default();
        assert!(!stat.is_observed());
        assert_eq!(stat.value, 0);
    }

    #[test]
    fn test_set_records_time() {
        let mut stat = StatBool::default();
        stat.set(true, 1_700_000_000_000);
        assert!(stat.is_observed());
        assert!(stat.value);
        assert_eq!(stat.time, 1_700_000_000_000);
    }

    #[test]
    fn test_render() {
        assert_eq!(StatInt::new(42, 1).render(), "42");
        assert_eq!(StatFloat::new(1.5, 1).render(), "1.5");
        assert_eq!(StatFloat::new(3.0, 1).render(), "3");
        assert_eq!(StatBool::new(false, 1).render(), "false");
        assert_eq!(StatString::new("down".to_string(), 1).render(), "down");
    }

    #[test]
    fn test_wire_shape() {
        let stat = StatInt::new(7, 1000);
        let json = serde_json::to_value(&stat).unwrap();
        assert_eq!(json, serde_json::json!({"time": 1000, "value": 7}));
    }

    #[test]
    fn test_now_millis_is_positive() {
        assert!(now_millis() > 0);
    }
}
