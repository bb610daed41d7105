// crates/bazaar-reputation/src/seeds.rs
//
// Curated seed set: actors trusted unconditionally, independent of any
// crawl. Bootstraps trust for new or offline users.

use std::collections::BTreeSet;

use serde::Deserialize;

use bazaar_core::actor::ActorId;
use bazaar_core::error::BazaarError;

const BUNDLED_SEEDS: &str = include_str!("../seeds.toml");

#[derive(Debug, Deserialize)]
struct SeedFile {
    #[serde(default)]
    seeds: Vec<String>,
}

/// An immutable snapshot of the curated seed list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CuratedSeeds {
    ids: BTreeSet<ActorId>,
}

impl CuratedSeeds {
    /// The version-controlled list shipped with this crate.
    pub fn bundled() -> Result<Self, BazaarError> {
        Self::from_toml(BUNDLED_SEEDS)
    }

    /// Parse a seed file of the form `seeds = ["...", ...]`.
    pub fn from_toml(contents: &str) -> Result<Self, BazaarError> {
        let file: SeedFile =
            toml::from_str(contents).map_err(|e| BazaarError::Serialization(e.to_string()))?;
        Ok(Self::from_ids(file.seeds))
    }

    /// Build from raw ids; blank entries are skipped.
    pub fn from_ids<I, S>(raw: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut ids = BTreeSet::new();
        for entry in raw {
            match ActorId::parse(entry) {
                Ok(id) => {
                    ids.insert(id);
                }
                Err(e) => tracing::warn!("Skipping curated seed entry: {}", e),
            }
        }
        Self { ids }
    }

    pub fn contains(&self, actor: &ActorId) -> bool {
        self.ids.contains(actor)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ActorId> {
        self.ids.iter()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
