// crates/bazaar-reputation/src/signal.rs
//
// SignalStore: holder of the last successfully computed score map.
//
// The map is only ever swapped wholesale (by a completed crawl or a load
// from persistence), and readers get an immutable `Arc` snapshot, so a
// derivation can never observe a half-written crawl.

use std::sync::Arc;

use tokio::sync::watch;

use bazaar_core::actor::ActorId;
use bazaar_core::score::ScoreMap;

use crate::percentile::percentile;

/// Shared handle to the current score map.
#[derive(Debug)]
pub struct SignalStore {
    current: watch::Sender<Arc<ScoreMap>>,
}

impl SignalStore {
    /// Create a store holding an empty score map.
    pub fn new() -> Self {
        Self::with_scores(ScoreMap::new())
    }

    /// Create a store preloaded with `scores` (e.g. from persistence).
    pub fn with_scores(scores: ScoreMap) -> Self {
        let (current, _) = watch::channel(Arc::new(scores));
        Self { current }
    }

    /// Immutable snapshot of the current map.
    pub fn snapshot(&self) -> Arc<ScoreMap> {
        self.current.borrow().clone()
    }

    /// Swap in a freshly computed map and notify subscribers.
    pub fn replace(&self, scores: ScoreMap) {
        tracing::debug!("SignalStore: replacing score map ({} actors)", scores.len());
        self.current.send_replace(Arc::new(scores));
    }

    /// Receive a notification every time the map is replaced.
    pub fn subscribe(&self) -> watch::Receiver<Arc<ScoreMap>> {
        self.current.subscribe()
    }

    /// Network score of `actor`, if it was reached by the last crawl.
    pub fn score_of(&self, actor: &ActorId) -> Option<f64> {
        self.current.borrow().get(actor)
    }

    /// Percentile rank of `actor`'s score against every scored actor.
    pub fn percentile_of(&self, actor: &ActorId) -> Option<u8> {
        let scores = self.snapshot();
        let value = scores.get(actor)?;
        Some(percentile(&scores.values(), value))
    }
}

impl Default for SignalStore {
    fn default() -> Self {
        Self::new()
    }
}
