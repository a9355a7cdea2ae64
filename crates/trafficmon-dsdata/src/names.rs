//! Strongly-typed identifiers for the monitored fleet.
//!
//! Every identifier is a plain string on the wire; the newtypes keep a cache
//! group from being passed where a cache type is expected.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

macro_rules! string_name {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new identifier
            pub fn new(name: impl Into<String>) -> Self {
                Self(name.into())
            }

            /// Borrow the identifier as a string slice
            #[inline]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(name: &str) -> Self {
                Self(name.to_string())
            }
        }

        impl From<String> for $name {
            fn from(name: String) -> Self {
                Self(name)
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_name!(
    /// Name of a delivery service (the logical content being measured)
    DeliveryServiceName
);
string_name!(
    /// Name of a cache group, usually a physical site
    CacheGroupName
);
string_name!(
    /// Cache classification, e.g. `EDGE` or `MID`
    CacheType
);
string_name!(
    /// Host name of an individual cache
    CacheName
);
string_name!(
    /// Name of a flattened statistic in the legacy wire shape
    StatName
);

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_names_serialize_transparently() {
        let name = CacheName::from("edge-01");
        assert_eq!(serde_json::to_string(&name).unwrap(), "\"edge-01\"");

        let parsed: CacheGroupName = serde_json::from_str("\"den\"").unwrap();
        assert_eq!(parsed.as_str(), "den");
    }

    #[test]
    fn test_names_lookup_by_str() {
        let mut map = BTreeMap::new();
        map.insert(CacheType::from("EDGE"), 1);
        assert_eq!(map.get("EDGE"), Some(&1));
        assert_eq!(map.get("MID"), None);
    }
}
