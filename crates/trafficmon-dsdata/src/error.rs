//! Error types for statistics ingestion.

use thiserror::Error;

/// Errors raised while applying raw collector values to an aggregate
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StatError {
    /// The key is known but deliberately excluded from aggregation
    #[error("This stat is not used: {0}")]
    NotProcessed(String),

    /// The key is not a known cache statistic
    #[error("Unknown stat: {0}")]
    UnknownStat(String),

    /// The value could not be interpreted for the key
    #[error("Invalid value for stat {name}: {reason}")]
    InvalidValue {
        /// Stat key
        name: String,
        /// Why the value was rejected
        reason: String,
    },
}

impl StatError {
    /// Whether this is the "recognized but skipped" signal rather than a fault
    #[inline]
    pub const fn is_not_processed(&self) -> bool {
        matches!(self, Self::NotProcessed(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stat_error_messages() {
        let err = StatError::NotProcessed("status_unknown".to_string());
        assert_eq!(err.to_string(), "This stat is not used: status_unknown");
        assert!(err.is_not_processed());

        let err = StatError::UnknownStat("bogus".to_string());
        assert_eq!(err.to_string(), "Unknown stat: bogus");
        assert!(!err.is_not_processed());
    }
}
