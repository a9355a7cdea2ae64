//! Error types for the monitor.
//!
//! All errors use thiserror for consistent error handling across the codebase.

use std::path::PathBuf;
use thiserror::Error;

/// Topology loading errors.
#[derive(Debug, Error)]
pub enum TopologyError {
    /// Failed to read the topology file
    #[error("Failed to load topology from {}: {source}", .path.display())]
    LoadFailed {
        /// Path to the topology file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Invalid JSON in the topology file
    #[error("Invalid JSON in topology file: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// No caches configured
    #[error("Topology is empty: no caches loaded from file")]
    EmptyTopology,

    /// Invalid field value in a cache record
    #[error("Invalid {field} for cache '{cache}': {reason}")]
    InvalidField {
        /// Field name that failed validation
        field: String,
        /// Cache whose record failed validation
        cache: String,
        /// Reason for validation failure
        reason: String,
    },

    /// The same cache appears twice
    #[error("Duplicate cache in topology: {0}")]
    DuplicateCache(String),
}

/// Sample batch loading errors.
#[derive(Debug, Error)]
pub enum SampleError {
    /// Failed to read the sample file
    #[error("Failed to load samples from {}: {source}", .path.display())]
    LoadFailed {
        /// Path to the sample file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Invalid JSON in the sample file
    #[error("Invalid JSON in sample file: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Missing required configuration value
    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    /// Out of range or malformed value
    #[error("Invalid value for {name}: {reason}")]
    InvalidValue {
        /// Option name
        name: String,
        /// Reason for invalidity
        reason: String,
    },
}

/// Monitor runtime errors.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// Topology error
    #[error("Topology error: {0}")]
    Topology(#[from] TopologyError),

    /// Sample error
    #[error("Sample error: {0}")]
    Samples(#[from] SampleError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Failed to render output
    #[error("Failed to render output: {0}")]
    Render(#[source] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topology_error_messages() {
        let err = TopologyError::DuplicateCache("edge-01".to_string());
        assert_eq!(err.to_string(), "Duplicate cache in topology: edge-01");

        let err = TopologyError::EmptyTopology;
        assert_eq!(
            err.to_string(),
            "Topology is empty: no caches loaded from file"
        );
    }

    #[test]
    fn test_monitor_error_conversion() {
        let err: MonitorError = TopologyError::EmptyTopology.into();
        assert!(err.to_string().contains("Topology is empty"));

        let err: MonitorError = ConfigError::MissingRequired("topology".to_string()).into();
        assert!(err.to_string().starts_with("Configuration error"));
    }
}
