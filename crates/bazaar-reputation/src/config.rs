// crates/bazaar-reputation/src/config.rs
//
// Tunables for the crawl and the trust-set derivation.
// Loaded from the `[trust]` table of the daemon's TOML file or populated
// with defaults.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use bazaar_core::error::BazaarError;

/// Score contributions of each assertion kind, per hop.
///
/// Mute and report weights are magnitudes; the crawler subtracts them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawlWeights {
    /// Added for each follow authored by the crawl root.
    #[serde(default = "default_first_order_follow")]
    pub first_order_follow: f64,
    /// Added for each follow authored by someone the root follows.
    #[serde(default = "default_second_order_follow")]
    pub second_order_follow: f64,
}

impl CrawlWeights {
    /// Penalty for a mute at the given hop: half that hop's follow weight.
    pub fn mute_weight(&self, hop: Hop) -> f64 {
        self.follow_weight(hop) / 2.0
    }

    /// Penalty for a report at the given hop. Same scale as mutes.
    pub fn report_weight(&self, hop: Hop) -> f64 {
        self.follow_weight(hop) / 2.0
    }

    pub fn follow_weight(&self, hop: Hop) -> f64 {
        match hop {
            Hop::First => self.first_order_follow,
            Hop::Second => self.second_order_follow,
        }
    }
}

impl Default for CrawlWeights {
    fn default() -> Self {
        Self {
            first_order_follow: default_first_order_follow(),
            second_order_follow: default_second_order_follow(),
        }
    }
}

/// Follow-graph distance from the crawl root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hop {
    First,
    Second,
}

/// Runtime configuration for crawling and derivation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrustConfig {
    /// Minimum network score for score-based trust.
    #[serde(default = "default_min_score")]
    pub min_score: f64,

    #[serde(default)]
    pub weights: CrawlWeights,

    /// Authors per second-hop fetch request.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Second-hop batches allowed in flight at once.
    #[serde(default = "default_max_concurrent_batches")]
    pub max_concurrent_batches: usize,

    /// Wall-clock budget for a whole crawl, in seconds.
    #[serde(default = "default_crawl_timeout_secs")]
    pub crawl_timeout_secs: u64,
}

fn default_first_order_follow() -> f64 {
    2.0
}

fn default_second_order_follow() -> f64 {
    1.0
}

fn default_min_score() -> f64 {
    2.0
}

fn default_batch_size() -> usize {
    100
}

fn default_max_concurrent_batches() -> usize {
    4
}

fn default_crawl_timeout_secs() -> u64 {
    30
}

impl Default for TrustConfig {
    fn default() -> Self {
        Self {
            min_score: default_min_score(),
            weights: CrawlWeights::default(),
            batch_size: default_batch_size(),
            max_concurrent_batches: default_max_concurrent_batches(),
            crawl_timeout_secs: default_crawl_timeout_secs(),
        }
    }
}

impl TrustConfig {
    /// Parse a config from TOML text.
    pub fn from_toml(contents: &str) -> Result<Self, BazaarError> {
        let config: TrustConfig = toml::from_str(contents)
            .map_err(|e| BazaarError::Serialization(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn crawl_timeout(&self) -> Duration {
        Duration::from_secs(self.crawl_timeout_secs)
    }

    /// Reject weight/batch settings the crawl cannot work with.
    pub fn validate(&self) -> Result<(), BazaarError> {
        let w = &self.weights;
        if !(w.first_order_follow > 0.0) {
            return Err(BazaarError::Configuration(
                "first_order_follow must be positive".to_string(),
            ));
        }
        if !(w.second_order_follow > 0.0 && w.second_order_follow < w.first_order_follow) {
            return Err(BazaarError::Configuration(
                "second_order_follow must be positive and below first_order_follow".to_string(),
            ));
        }
        if !self.min_score.is_finite() {
            return Err(BazaarError::Configuration(
                "min_score must be finite".to_string(),
            ));
        }
        if self.batch_size == 0 || self.max_concurrent_batches == 0 {
            return Err(BazaarError::Configuration(
                "batch_size and max_concurrent_batches must be non-zero".to_string(),
            ));
        }
        if self.crawl_timeout_secs == 0 {
            return Err(BazaarError::Configuration(
                "crawl_timeout_secs must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}
