// crates/bazaar-core/src/score.rs

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::actor::ActorId;

/// Network score per actor, as produced by one complete crawl.
///
/// Scores are signed: mutes and reports from inside the follow network can
/// push an actor below zero. An actor absent from the map has no score.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScoreMap {
    scores: HashMap<ActorId, f64>,
}

impl ScoreMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, actor: &ActorId) -> Option<f64> {
        self.scores.get(actor).copied()
    }

    pub fn insert(&mut self, actor: ActorId, score: f64) {
        self.scores.insert(actor, score);
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ActorId, f64)> {
        self.scores.iter().map(|(a, s)| (a, *s))
    }

    /// All score values, in arbitrary order.
    pub fn values(&self) -> Vec<f64> {
        self.scores.values().copied().collect()
    }

    /// Actors whose score reaches `min_score`.
    pub fn at_least(&self, min_score: f64) -> impl Iterator<Item = &ActorId> {
        self.scores
            .iter()
            .filter(move |(_, s)| **s >= min_score)
            .map(|(a, _)| a)
    }
}

impl FromIterator<(ActorId, f64)> for ScoreMap {
    fn from_iter<I: IntoIterator<Item = (ActorId, f64)>>(iter: I) -> Self {
        Self {
            scores: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> ActorId {
        ActorId::parse(s).unwrap()
    }

    #[test]
    fn at_least_is_inclusive() {
        let map: ScoreMap = [(id("x"), 4.0), (id("y"), 2.0), (id("z"), 3.0)]
            .into_iter()
            .collect();
        let mut above: Vec<&str> = map.at_least(3.0).map(|a| a.as_str()).collect();
        above.sort();
        assert_eq!(above, vec!["x", "z"]);
    }

    #[test]
    fn missing_actor_has_no_score() {
        let map = ScoreMap::new();
        assert_eq!(map.get(&id("nobody")), None);
    }
}
