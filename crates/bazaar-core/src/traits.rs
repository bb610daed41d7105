// crates/bazaar-core/src/traits.rs

use async_trait::async_trait;

use crate::actor::ActorId;
use crate::assertion::AssertionBundle;
use crate::error::BazaarError;
use crate::score::ScoreMap;

/// Trait for fetching signed assertions from remote data sources.
///
/// Implemented by the network layer. Given a batch of authors it returns
/// every follow/mute/report list each of them has published. An empty
/// bundle is a valid answer.
#[async_trait]
pub trait AssertionFetcher: Send + Sync {
    async fn fetch_assertions(&self, authors: &[ActorId]) -> Result<AssertionBundle, BazaarError>;
}

/// Trait for persisting the score map across restarts.
///
/// Implemented by bazaar-store (RocksDB backend).
#[async_trait]
pub trait ScorePersistence: Send + Sync {
    /// Load the last saved score map. Returns an empty map if nothing was saved.
    async fn load_scores(&self) -> Result<ScoreMap, BazaarError>;

    /// Replace the saved score map with `scores`.
    async fn save_scores(&self, scores: &ScoreMap) -> Result<(), BazaarError>;
}
