// crates/bazaar-reputation/src/mute.rs
//
// MuteFilter: the current actor's own block list. Overrides every other
// trust signal.

use std::collections::HashSet;

use bazaar_core::actor::ActorId;
use bazaar_core::assertion::{AssertionBundle, AssertionKind};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MuteFilter {
    muted: HashSet<ActorId>,
}

impl MuteFilter {
    /// A filter that mutes nobody.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from `self_id`'s mute document in `bundle`.
    ///
    /// Mute documents by other authors are ignored.
    pub fn from_assertions(self_id: &ActorId, bundle: &AssertionBundle) -> Self {
        Self::from_list(self_id, bundle.targets_of(AssertionKind::Mute, self_id).iter().cloned())
    }

    /// Build from a plain list. An actor cannot mute itself, so `self_id`
    /// is dropped if present.
    pub fn from_list<I: IntoIterator<Item = ActorId>>(self_id: &ActorId, list: I) -> Self {
        let muted = list.into_iter().filter(|a| a != self_id).collect();
        Self { muted }
    }

    pub fn is_muted(&self, actor: &ActorId) -> bool {
        self.muted.contains(actor)
    }

    pub fn len(&self) -> usize {
        self.muted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.muted.is_empty()
    }
}
