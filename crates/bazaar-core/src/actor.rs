// crates/bazaar-core/src/actor.rs

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::BazaarError;

/// Identity of a participant in the marketplace.
///
/// Opaque and stable (in practice a hex-encoded public key). Two ids are the
/// same actor only if their strings are byte-for-byte equal; no case folding
/// or normalization is applied.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ActorId(String);

impl ActorId {
    /// Build an ActorId, rejecting empty or whitespace-only input.
    pub fn parse(raw: impl Into<String>) -> Result<Self, BazaarError> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(BazaarError::Configuration(
                "actor id must not be empty".to_string(),
            ));
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ActorId {
    type Error = BazaarError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::parse(raw)
    }
}

impl From<ActorId> for String {
    fn from(id: ActorId) -> Self {
        id.0
    }
}

impl AsRef<str> for ActorId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
