// crates/bazaar-core/src/error.rs

use std::time::Duration;

use thiserror::Error;

/// Error taxonomy for the Bazaar trust graph.
///
/// Only `Configuration` is fatal to the call that produced it; every other
/// variant leaves the last-known-good score map in place.
#[derive(Debug, Error)]
pub enum BazaarError {
    /// The first crawl hop returned no assertions at all.
    #[error("No assertions found for the crawl root")]
    NoData,

    /// The assertion fetch collaborator failed.
    #[error("Network error: {0}")]
    Network(String),

    /// The crawl exceeded its wall-clock budget.
    #[error("Crawl timed out after {0:?}")]
    Timeout(Duration),

    /// Missing or invalid identity / configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Persistence layer error (RocksDB).
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl BazaarError {
    /// Whether the caller may retry the operation later.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, BazaarError::Configuration(_))
    }
}

impl From<serde_json::Error> for BazaarError {
    fn from(e: serde_json::Error) -> Self {
        BazaarError::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_is_the_only_fatal_variant() {
        assert!(BazaarError::NoData.is_recoverable());
        assert!(BazaarError::Network("down".into()).is_recoverable());
        assert!(BazaarError::Timeout(Duration::from_secs(30)).is_recoverable());
        assert!(!BazaarError::Configuration("missing self id".into()).is_recoverable());
    }

    #[test]
    fn json_errors_map_to_serialization() {
        let err = serde_json::from_str::<u32>("not json").unwrap_err();
        let mapped: BazaarError = err.into();
        assert!(matches!(mapped, BazaarError::Serialization(_)));
    }
}
