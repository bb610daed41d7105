// crates/bazaar-reputation/src/deals.rs
//
// DealGraphIndex: who-transacted-with-whom, built from marketplace records.
//
// Each accepted link between an offering and a response (in either
// direction) is an undirected edge between the two owners. Lookups return
// direct partners and partners-of-partners (depth exactly 2). The index is
// mutated by the record stream, keeps per-edge link counts up to date, and
// publishes an immutable `DealGraph` snapshot after every change.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use tokio::sync::watch;

use bazaar_core::actor::ActorId;
use bazaar_core::deal::DealRecord;

/// A change from the marketplace record stream.
#[derive(Debug, Clone, PartialEq)]
pub enum DealEvent {
    /// A record appeared or changed (e.g. a job accepted a bid).
    Upsert(DealRecord),
    /// The record at this address was withdrawn.
    Retract(String),
}

/// Counterparties of one actor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DealPartners {
    /// Actors this actor transacted with directly.
    pub direct: BTreeSet<ActorId>,
    /// Partners of direct partners, minus the actor and its direct partners.
    pub indirect: BTreeSet<ActorId>,
}

impl DealPartners {
    pub fn is_empty(&self) -> bool {
        self.direct.is_empty() && self.indirect.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ActorId> {
        self.direct.iter().chain(self.indirect.iter())
    }
}

/// Immutable adjacency built from one snapshot of deal records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DealGraph {
    edges: HashMap<ActorId, BTreeSet<ActorId>>,
}

impl DealGraph {
    /// Actors `actor` has a resolved deal with.
    pub fn direct_partners(&self, actor: &ActorId) -> BTreeSet<ActorId> {
        self.edges.get(actor).cloned().unwrap_or_default()
    }

    /// Direct partners plus depth-2 indirect partners of `actor`.
    pub fn partners_of(&self, actor: &ActorId) -> DealPartners {
        let direct = self.direct_partners(actor);
        let mut indirect = BTreeSet::new();

        for partner in &direct {
            if let Some(next) = self.edges.get(partner) {
                for candidate in next {
                    if candidate != actor && !direct.contains(candidate) {
                        indirect.insert(candidate.clone());
                    }
                }
            }
        }

        DealPartners { direct, indirect }
    }

    /// Number of actors with at least one resolved deal.
    pub fn actor_count(&self) -> usize {
        self.edges.len()
    }
}

/// Live index over the marketplace record stream.
///
/// A change only re-resolves the changed address and the records that
/// point at it. Each `apply` still publishes a fresh snapshot, so bulk
/// loads should go through `extend`, which publishes once.
#[derive(Debug)]
pub struct DealGraphIndex {
    records: HashMap<String, DealRecord>,
    /// Counterparty address -> addresses of records that reference it.
    referrers: HashMap<String, BTreeSet<String>>,
    /// Address of an accepting record -> the owner pair its link resolved to.
    links: HashMap<String, (ActorId, ActorId)>,
    /// Undirected owner adjacency, counting the links behind each edge.
    edge_counts: HashMap<ActorId, HashMap<ActorId, usize>>,
    graph: watch::Sender<Arc<DealGraph>>,
}

impl DealGraphIndex {
    pub fn new() -> Self {
        let (graph, _) = watch::channel(Arc::new(DealGraph::default()));
        Self {
            records: HashMap::new(),
            referrers: HashMap::new(),
            links: HashMap::new(),
            edge_counts: HashMap::new(),
            graph,
        }
    }

    /// Apply one stream event and publish the updated graph.
    pub fn apply(&mut self, event: DealEvent) {
        match event {
            DealEvent::Upsert(record) => {
                let address = record.address.clone();
                self.change(&address, Some(record));
            }
            DealEvent::Retract(address) => self.change(&address, None),
        }
        self.publish();
    }

    pub fn upsert(&mut self, record: DealRecord) {
        self.apply(DealEvent::Upsert(record));
    }

    pub fn retract(&mut self, address: &str) {
        self.apply(DealEvent::Retract(address.to_string()));
    }

    /// Insert many records and publish once (initial backfill).
    pub fn extend<I: IntoIterator<Item = DealRecord>>(&mut self, records: I) {
        for record in records {
            let address = record.address.clone();
            self.change(&address, Some(record));
        }
        self.publish();
    }

    /// Replace (or remove) the record at `address`, re-resolving only the
    /// links that can depend on it.
    fn change(&mut self, address: &str, record: Option<DealRecord>) {
        let mut affected = vec![address.to_string()];
        if let Some(referring) = self.referrers.get(address) {
            affected.extend(referring.iter().cloned());
        }

        for a in &affected {
            if let Some((x, y)) = self.links.remove(a) {
                self.unlink(&x, &y);
            }
        }

        if let Some(old) = self.records.remove(address) {
            if let Some(cp) = old.counterparty_address {
                if let Some(set) = self.referrers.get_mut(&cp) {
                    set.remove(address);
                    if set.is_empty() {
                        self.referrers.remove(&cp);
                    }
                }
            }
        }
        if let Some(record) = record {
            if let Some(cp) = &record.counterparty_address {
                self.referrers
                    .entry(cp.clone())
                    .or_default()
                    .insert(address.to_string());
            }
            self.records.insert(address.to_string(), record);
        }

        for a in affected {
            if let Some((x, y)) = self.resolve(&a) {
                self.link(&x, &y);
                self.links.insert(a, (x, y));
            }
        }
    }

    /// Owner pair for the record at `address`, if its acceptance link
    /// points at a record of the complementary kind with another owner.
    fn resolve(&self, address: &str) -> Option<(ActorId, ActorId)> {
        let record = self.records.get(address)?;
        let cp_address = record.counterparty_address.as_deref()?;
        let Some(counterparty) = self.records.get(cp_address) else {
            tracing::trace!("Deal {} references unknown record {}", address, cp_address);
            return None;
        };
        if counterparty.kind != record.kind.complement() || counterparty.owner == record.owner {
            return None;
        }
        Some((record.owner.clone(), counterparty.owner.clone()))
    }

    fn link(&mut self, x: &ActorId, y: &ActorId) {
        *self
            .edge_counts
            .entry(x.clone())
            .or_default()
            .entry(y.clone())
            .or_default() += 1;
        *self
            .edge_counts
            .entry(y.clone())
            .or_default()
            .entry(x.clone())
            .or_default() += 1;
    }

    fn unlink(&mut self, x: &ActorId, y: &ActorId) {
        for (from, to) in [(x, y), (y, x)] {
            if let Some(partners) = self.edge_counts.get_mut(from) {
                if let Some(count) = partners.get_mut(to) {
                    *count -= 1;
                    if *count == 0 {
                        partners.remove(to);
                    }
                }
                if partners.is_empty() {
                    self.edge_counts.remove(from);
                }
            }
        }
    }

    fn publish(&mut self) {
        let edges = self
            .edge_counts
            .iter()
            .map(|(actor, partners)| (actor.clone(), partners.keys().cloned().collect()))
            .collect();
        let graph = DealGraph { edges };
        tracing::trace!(
            "Deal graph updated: {} records, {} actors with deals",
            self.records.len(),
            graph.actor_count()
        );
        self.graph.send_replace(Arc::new(graph));
    }

    /// Immutable snapshot of the current graph.
    pub fn snapshot(&self) -> Arc<DealGraph> {
        self.graph.borrow().clone()
    }

    /// Receive a notification every time the graph is updated.
    pub fn subscribe(&self) -> watch::Receiver<Arc<DealGraph>> {
        self.graph.subscribe()
    }

    /// Direct and indirect partners of `actor` in the current snapshot.
    pub fn index_for(&self, actor: &ActorId) -> DealPartners {
        self.snapshot().partners_of(actor)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Default for DealGraphIndex {
    fn default() -> Self {
        Self::new()
    }
}
