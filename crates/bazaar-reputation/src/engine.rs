// crates/bazaar-reputation/src/engine.rs
//
// TrustEngine: push-driven recomputation of the trust set.
//
// The engine owns an immutable snapshot of every derivation input. Any
// input change re-runs `derive_trust_set` synchronously and publishes the
// result on a watch channel, but only when the set actually changed.
// `run` wires the engine to the SignalStore and DealGraphIndex watch
// channels plus an mpsc channel for everything else.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};

use bazaar_core::actor::ActorId;
use bazaar_core::score::ScoreMap;

use crate::deals::{DealGraph, DealPartners};
use crate::derive::{derive_trust_set, TrustInputs, TrustSet};
use crate::mute::MuteFilter;
use crate::seeds::CuratedSeeds;

/// One changed derivation input.
#[derive(Debug, Clone)]
pub enum TrustInput {
    /// Login / logout / account switch.
    Identity(Option<ActorId>),
    MinScore(f64),
    FollowNetwork(HashSet<ActorId>),
    Mutes(MuteFilter),
    Seeds(CuratedSeeds),
    Scores(Arc<ScoreMap>),
    Deals(Arc<DealGraph>),
}

pub struct TrustEngine {
    scores: Arc<ScoreMap>,
    min_score: f64,
    self_id: Option<ActorId>,
    deals: Arc<DealGraph>,
    follow_network: HashSet<ActorId>,
    mutes: MuteFilter,
    seeds: CuratedSeeds,
    output: watch::Sender<Arc<TrustSet>>,
}

impl TrustEngine {
    /// Create an engine with no identity, no scores and no deals.
    pub fn new(seeds: CuratedSeeds, min_score: f64) -> Self {
        let (output, _) = watch::channel(Arc::new(TrustSet::default()));
        let mut engine = Self {
            scores: Arc::new(ScoreMap::new()),
            min_score,
            self_id: None,
            deals: Arc::new(DealGraph::default()),
            follow_network: HashSet::new(),
            mutes: MuteFilter::empty(),
            seeds,
            output,
        };
        engine.recompute();
        engine
    }

    /// The trust set as of the last recomputation.
    pub fn current(&self) -> Arc<TrustSet> {
        self.output.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<TrustSet>> {
        self.output.subscribe()
    }

    /// Replace one input and re-derive. Returns whether the trust set changed.
    pub fn apply(&mut self, input: TrustInput) -> bool {
        match input {
            TrustInput::Identity(self_id) => {
                // A mute list belongs to one actor; the new one arrives as a
                // separate `Mutes` input.
                if self_id != self.self_id {
                    self.mutes = MuteFilter::empty();
                }
                self.self_id = self_id;
            }
            TrustInput::MinScore(min_score) => self.min_score = min_score,
            TrustInput::FollowNetwork(follows) => self.follow_network = follows,
            TrustInput::Mutes(mutes) => self.mutes = mutes,
            TrustInput::Seeds(seeds) => self.seeds = seeds,
            TrustInput::Scores(scores) => self.scores = scores,
            TrustInput::Deals(deals) => self.deals = deals,
        }
        self.recompute()
    }

    fn recompute(&mut self) -> bool {
        let partners = match &self.self_id {
            Some(me) => self.deals.partners_of(me),
            None => DealPartners::default(),
        };

        let next = derive_trust_set(&TrustInputs {
            scores: &self.scores,
            min_score: self.min_score,
            self_id: self.self_id.as_ref(),
            deal_partners: &partners,
            follow_network: &self.follow_network,
            mutes: &self.mutes,
            seeds: &self.seeds,
        });

        let changed = self.output.send_if_modified(|current| {
            if **current == next {
                false
            } else {
                *current = Arc::new(next);
                true
            }
        });
        if changed {
            tracing::debug!("Trust set recomputed: {} members", self.output.borrow().len());
        }
        changed
    }

    /// Re-derive on every push from the score store, the deal index, or the
    /// input channel. Runs until the input channel closes and returns the
    /// last trust set.
    pub async fn run(
        mut self,
        mut scores: watch::Receiver<Arc<ScoreMap>>,
        mut deals: watch::Receiver<Arc<DealGraph>>,
        mut inputs: mpsc::Receiver<TrustInput>,
    ) -> Arc<TrustSet> {
        let initial_scores = scores.borrow_and_update().clone();
        let initial_deals = deals.borrow_and_update().clone();
        self.scores = initial_scores;
        self.deals = initial_deals;
        self.recompute();

        let mut scores_open = true;
        let mut deals_open = true;

        loop {
            tokio::select! {
                changed = scores.changed(), if scores_open => {
                    if changed.is_err() {
                        scores_open = false;
                        continue;
                    }
                    let snapshot = scores.borrow_and_update().clone();
                    self.apply(TrustInput::Scores(snapshot));
                }
                changed = deals.changed(), if deals_open => {
                    if changed.is_err() {
                        deals_open = false;
                        continue;
                    }
                    let snapshot = deals.borrow_and_update().clone();
                    self.apply(TrustInput::Deals(snapshot));
                }
                input = inputs.recv() => match input {
                    Some(input) => {
                        self.apply(input);
                    }
                    None => {
                        tracing::debug!("Trust engine input channel closed; stopping");
                        break;
                    }
                },
            }
        }

        // Pick up pushes that raced with the input channel closing.
        let last_scores = scores.borrow_and_update().clone();
        let last_deals = deals.borrow_and_update().clone();
        self.scores = last_scores;
        self.deals = last_deals;
        self.recompute();

        self.current()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use bazaar_core::deal::DealRecord;

    use crate::deals::DealGraphIndex;
    use crate::signal::SignalStore;

    fn id(s: &str) -> ActorId {
        ActorId::parse(s).unwrap()
    }

    async fn wait_for<F>(rx: &mut watch::Receiver<Arc<TrustSet>>, pred: F)
    where
        F: Fn(&TrustSet) -> bool,
    {
        loop {
            if pred(&rx.borrow_and_update()) {
                return;
            }
            tokio::time::timeout(Duration::from_secs(2), rx.changed())
                .await
                .expect("trust set never reached expected state")
                .expect("engine stopped");
        }
    }

    #[test]
    fn new_engine_holds_seeds_only() {
        let engine = TrustEngine::new(CuratedSeeds::from_ids(vec!["seed"]), 2.0);
        let set = engine.current();
        assert_eq!(set.len(), 1);
        assert!(set.contains(&id("seed")));
    }

    #[test]
    fn unchanged_input_does_not_republish() {
        let mut engine = TrustEngine::new(CuratedSeeds::default(), 2.0);
        assert!(engine.apply(TrustInput::Identity(Some(id("me")))));
        assert!(!engine.apply(TrustInput::Identity(Some(id("me")))));
        assert!(!engine.apply(TrustInput::MinScore(5.0)));
    }

    #[test]
    fn each_input_feeds_the_derivation() {
        let mut engine = TrustEngine::new(CuratedSeeds::default(), 2.0);
        engine.apply(TrustInput::Identity(Some(id("me"))));

        engine.apply(TrustInput::Scores(Arc::new(
            [(id("scored"), 3.0)].into_iter().collect(),
        )));
        engine.apply(TrustInput::FollowNetwork([id("followed")].into_iter().collect()));

        let mut index = DealGraphIndex::new();
        index.upsert(DealRecord::response("bid:1", id("partner")));
        index.upsert(DealRecord::offering("job:1", id("me")).accepting("bid:1"));
        engine.apply(TrustInput::Deals(index.snapshot()));

        let set = engine.current();
        for member in ["me", "scored", "followed", "partner"] {
            assert!(set.contains(&id(member)), "missing {}", member);
        }

        engine.apply(TrustInput::Mutes(MuteFilter::from_list(&id("me"), vec![id("partner")])));
        assert!(!engine.current().contains(&id("partner")));

        engine.apply(TrustInput::MinScore(4.0));
        assert!(!engine.current().contains(&id("scored")));
    }

    #[test]
    fn identity_switch_drops_previous_mutes_and_keeps_self() {
        let mut engine = TrustEngine::new(CuratedSeeds::default(), 2.0);
        engine.apply(TrustInput::FollowNetwork([id("carol")].into_iter().collect()));
        engine.apply(TrustInput::Identity(Some(id("alice"))));
        engine.apply(TrustInput::Mutes(MuteFilter::from_list(
            &id("alice"),
            vec![id("bob"), id("carol")],
        )));
        assert!(!engine.current().contains(&id("carol")));

        engine.apply(TrustInput::Identity(Some(id("bob"))));
        let set = engine.current();
        assert!(set.contains(&id("bob")));
        assert!(set.contains(&id("carol")));
        assert!(!set.contains(&id("alice")));
    }

    #[test]
    fn same_identity_keeps_mutes() {
        let mut engine = TrustEngine::new(CuratedSeeds::default(), 2.0);
        engine.apply(TrustInput::FollowNetwork([id("carol")].into_iter().collect()));
        engine.apply(TrustInput::Identity(Some(id("alice"))));
        engine.apply(TrustInput::Mutes(MuteFilter::from_list(&id("alice"), vec![id("carol")])));

        engine.apply(TrustInput::Identity(Some(id("alice"))));
        assert!(!engine.current().contains(&id("carol")));
    }

    #[test]
    fn deal_partners_follow_identity() {
        let mut index = DealGraphIndex::new();
        index.upsert(DealRecord::response("bid:1", id("b")));
        index.upsert(DealRecord::offering("job:1", id("a")).accepting("bid:1"));

        let mut engine = TrustEngine::new(CuratedSeeds::default(), 2.0);
        engine.apply(TrustInput::Deals(index.snapshot()));
        assert!(!engine.current().contains(&id("b")));

        engine.apply(TrustInput::Identity(Some(id("a"))));
        assert!(engine.current().contains(&id("b")));
    }

    #[tokio::test]
    async fn run_reacts_to_every_source() {
        let store = SignalStore::new();
        let mut index = DealGraphIndex::new();
        let mut engine = TrustEngine::new(CuratedSeeds::default(), 2.0);
        engine.apply(TrustInput::Identity(Some(id("me"))));
        let mut out = engine.subscribe();

        let (tx, rx) = mpsc::channel(8);
        let handle = tokio::spawn(engine.run(store.subscribe(), index.subscribe(), rx));

        store.replace([(id("x"), 5.0)].into_iter().collect());
        wait_for(&mut out, |set| set.contains(&id("x"))).await;

        index.upsert(DealRecord::response("bid:1", id("f")));
        index.upsert(DealRecord::offering("job:1", id("me")).accepting("bid:1"));
        wait_for(&mut out, |set| set.contains(&id("f"))).await;

        tx.send(TrustInput::Mutes(MuteFilter::from_list(&id("me"), vec![id("x")])))
            .await
            .unwrap();
        wait_for(&mut out, |set| !set.contains(&id("x"))).await;

        drop(tx);
        let last = tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(last.contains(&id("f")));
        assert!(!last.contains(&id("x")));
    }
}
