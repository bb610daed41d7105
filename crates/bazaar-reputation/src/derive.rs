// crates/bazaar-reputation/src/derive.rs
//
// Trust-set derivation: a pure, synchronous function of its inputs.
//
//   TrustSet = (seeds ∪ {self} ∪ {a : score(a) >= min_score}
//               ∪ direct deal partners ∪ indirect deal partners
//               ∪ explicit follow network) \ mutes
//
// Mute removal is applied last and wins over everything except self.

use std::collections::{BTreeSet, HashSet};

use bazaar_core::actor::ActorId;
use bazaar_core::score::ScoreMap;

use crate::deals::DealPartners;
use crate::mute::MuteFilter;
use crate::seeds::CuratedSeeds;

/// Borrowed snapshot of every input the derivation reads.
#[derive(Debug, Clone, Copy)]
pub struct TrustInputs<'a> {
    pub scores: &'a ScoreMap,
    pub min_score: f64,
    /// The current actor, if logged in.
    pub self_id: Option<&'a ActorId>,
    /// Deal partners of `self_id` (empty when there is no identity).
    pub deal_partners: &'a DealPartners,
    pub follow_network: &'a HashSet<ActorId>,
    pub mutes: &'a MuteFilter,
    pub seeds: &'a CuratedSeeds,
}

/// The set of actors considered trustworthy for the current actor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrustSet {
    members: BTreeSet<ActorId>,
}

impl TrustSet {
    pub fn contains(&self, actor: &ActorId) -> bool {
        self.members.contains(actor)
    }

    /// Members in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &ActorId> {
        self.members.iter()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl FromIterator<ActorId> for TrustSet {
    fn from_iter<I: IntoIterator<Item = ActorId>>(iter: I) -> Self {
        Self {
            members: iter.into_iter().collect(),
        }
    }
}

/// Actors admitted by the score threshold alone.
pub fn score_contribution(scores: &ScoreMap, min_score: f64) -> BTreeSet<ActorId> {
    scores.at_least(min_score).cloned().collect()
}

/// Derive the trust set. Never fails.
pub fn derive_trust_set(inputs: &TrustInputs<'_>) -> TrustSet {
    let mut members: BTreeSet<ActorId> = inputs.seeds.iter().cloned().collect();

    if let Some(self_id) = inputs.self_id {
        members.insert(self_id.clone());
    }
    members.extend(score_contribution(inputs.scores, inputs.min_score));
    members.extend(inputs.deal_partners.iter().cloned());
    members.extend(inputs.follow_network.iter().cloned());

    members.retain(|actor| Some(actor) == inputs.self_id || !inputs.mutes.is_muted(actor));

    TrustSet { members }
}
