// crates/bazaar-core/src/assertion.rs
//
// Signed social assertions (follow / mute / report lists) as delivered by
// the network layer. Signatures are checked upstream; by the time a bundle
// reaches the engine it is just "who said what about whom".

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::actor::ActorId;

/// The three assertion documents an actor can publish about others.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssertionKind {
    Follow,
    Mute,
    Report,
}

/// Every assertion published by a batch of authors, keyed by author.
///
/// An empty bundle means "no assertions found", not an error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssertionBundle {
    #[serde(default)]
    pub follows: HashMap<ActorId, Vec<ActorId>>,
    #[serde(default)]
    pub mutes: HashMap<ActorId, Vec<ActorId>>,
    #[serde(default)]
    pub reports: HashMap<ActorId, Vec<ActorId>>,
}

impl AssertionBundle {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when no author published any list of any kind.
    pub fn is_empty(&self) -> bool {
        self.follows.is_empty() && self.mutes.is_empty() && self.reports.is_empty()
    }

    /// The per-author lists for one assertion kind.
    pub fn lists(&self, kind: AssertionKind) -> &HashMap<ActorId, Vec<ActorId>> {
        match kind {
            AssertionKind::Follow => &self.follows,
            AssertionKind::Mute => &self.mutes,
            AssertionKind::Report => &self.reports,
        }
    }

    fn lists_mut(&mut self, kind: AssertionKind) -> &mut HashMap<ActorId, Vec<ActorId>> {
        match kind {
            AssertionKind::Follow => &mut self.follows,
            AssertionKind::Mute => &mut self.mutes,
            AssertionKind::Report => &mut self.reports,
        }
    }

    /// Record `author`'s list for `kind`, replacing any earlier one.
    ///
    /// Authors publish one document per kind; the latest one wins.
    pub fn insert(&mut self, kind: AssertionKind, author: ActorId, targets: Vec<ActorId>) {
        self.lists_mut(kind).insert(author, targets);
    }

    /// Targets of `author`'s list for `kind` (empty if none was published).
    pub fn targets_of(&self, kind: AssertionKind, author: &ActorId) -> &[ActorId] {
        self.lists(kind)
            .get(author)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Keep only documents authored by one of `authors`.
    pub fn restricted_to(&self, authors: &[ActorId]) -> AssertionBundle {
        let mut out = AssertionBundle::new();
        for kind in [AssertionKind::Follow, AssertionKind::Mute, AssertionKind::Report] {
            for author in authors {
                if let Some(targets) = self.lists(kind).get(author) {
                    out.insert(kind, author.clone(), targets.clone());
                }
            }
        }
        out
    }
}
