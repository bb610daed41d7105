// crates/bazaar-reputation/src/crawler.rs
//
// GraphCrawler: bounded two-hop crawl of the follow graph.
//
// Hop 1 fetches the root's own follow/mute/report lists. Hop 2 fetches the
// lists of everyone the root follows, in fixed-size batches fanned out over
// a bounded pool. Both hops feed a per-actor tally of integer counts; scores
// are only computed once every batch is in, so batch completion order can
// never change the result. The SignalStore is replaced only when the whole
// crawl succeeds within its time budget.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{watch, Mutex, Semaphore};
use tokio::task::JoinSet;

use bazaar_core::actor::ActorId;
use bazaar_core::assertion::{AssertionBundle, AssertionKind};
use bazaar_core::error::BazaarError;
use bazaar_core::score::ScoreMap;
use bazaar_core::traits::AssertionFetcher;

use crate::config::{CrawlWeights, Hop, TrustConfig};
use crate::signal::SignalStore;

/// Crawl lifecycle as seen by UI / retry logic.
#[derive(Debug, Clone, PartialEq)]
pub enum CrawlStatus {
    /// No crawl has run yet.
    Idle,
    /// A crawl is in flight.
    Running,
    /// The last crawl replaced the score map.
    Complete {
        scored: usize,
        finished_at: DateTime<Utc>,
    },
    /// The root has published no assertions; the score map was left alone.
    NoResults,
    /// The last crawl failed (fetch error or timeout); the previous score
    /// map is still in use. `recoverable` is false when retrying cannot
    /// help until the configuration changes.
    Failed { reason: String, recoverable: bool },
}

/// Summary of a successful crawl.
#[derive(Debug, Clone)]
pub struct CrawlReport {
    pub root: ActorId,
    /// Actors with a score in the new map.
    pub scored: usize,
    /// Distinct authors fetched in the second hop.
    pub second_hop_authors: usize,
    /// Second-hop fetch batches issued.
    pub batches: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl CrawlReport {
    /// Wall-clock time the crawl took.
    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

/// Per-actor counts of assertions received, split by hop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Tally {
    first_follows: u32,
    second_follows: u32,
    first_mutes: u32,
    second_mutes: u32,
    first_reports: u32,
    second_reports: u32,
}

impl Tally {
    fn bump(&mut self, kind: AssertionKind, hop: Hop) {
        let slot = match (kind, hop) {
            (AssertionKind::Follow, Hop::First) => &mut self.first_follows,
            (AssertionKind::Follow, Hop::Second) => &mut self.second_follows,
            (AssertionKind::Mute, Hop::First) => &mut self.first_mutes,
            (AssertionKind::Mute, Hop::Second) => &mut self.second_mutes,
            (AssertionKind::Report, Hop::First) => &mut self.first_reports,
            (AssertionKind::Report, Hop::Second) => &mut self.second_reports,
        };
        *slot += 1;
    }

    fn follow_score(&self, w: &CrawlWeights) -> f64 {
        self.first_follows as f64 * w.follow_weight(Hop::First)
            + self.second_follows as f64 * w.follow_weight(Hop::Second)
    }

    fn penalty(&self, w: &CrawlWeights) -> f64 {
        self.first_mutes as f64 * w.mute_weight(Hop::First)
            + self.second_mutes as f64 * w.mute_weight(Hop::Second)
            + self.first_reports as f64 * w.report_weight(Hop::First)
            + self.second_reports as f64 * w.report_weight(Hop::Second)
    }
}

/// Accumulates assertion bundles from both hops into per-actor counts.
#[derive(Debug, Default)]
pub(crate) struct ScoreTally {
    counts: HashMap<ActorId, Tally>,
}

impl ScoreTally {
    /// Count every target in `bundle` at the given hop.
    ///
    /// Repeated targets inside one author's list count once.
    pub(crate) fn absorb(&mut self, bundle: &AssertionBundle, hop: Hop) {
        for kind in [AssertionKind::Follow, AssertionKind::Mute, AssertionKind::Report] {
            for targets in bundle.lists(kind).values() {
                let unique: HashSet<&ActorId> = targets.iter().collect();
                for target in unique {
                    self.counts.entry(target.clone()).or_default().bump(kind, hop);
                }
            }
        }
    }

    /// Turn the counts into scores.
    ///
    /// Only actors reached by at least one follow get a score. Mutes and
    /// reports are subtracted from those; against anyone else they carry no
    /// weight.
    pub(crate) fn finish(self, weights: &CrawlWeights) -> ScoreMap {
        self.counts
            .into_iter()
            .filter_map(|(actor, tally)| {
                let follow = tally.follow_score(weights);
                if follow == 0.0 {
                    return None;
                }
                Some((actor, follow - tally.penalty(weights)))
            })
            .collect()
    }
}

/// Runs crawls against an `AssertionFetcher` and publishes results into a
/// shared `SignalStore`.
pub struct GraphCrawler {
    fetcher: Arc<dyn AssertionFetcher>,
    store: Arc<SignalStore>,
    config: TrustConfig,
    status: watch::Sender<CrawlStatus>,
    /// Serializes crawls so two runs never race on the store.
    in_flight: Mutex<()>,
}

impl GraphCrawler {
    pub fn new(
        fetcher: Arc<dyn AssertionFetcher>,
        store: Arc<SignalStore>,
        config: TrustConfig,
    ) -> Self {
        let (status, _) = watch::channel(CrawlStatus::Idle);
        Self {
            fetcher,
            store,
            config,
            status,
            in_flight: Mutex::new(()),
        }
    }

    pub fn store(&self) -> Arc<SignalStore> {
        self.store.clone()
    }

    pub fn status(&self) -> CrawlStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<CrawlStatus> {
        self.status.subscribe()
    }

    /// Run a crawl and convert the outcome into a status signal.
    ///
    /// Never returns an error: failures are reported through the status
    /// channel and the previous score map stays in place.
    pub async fn run(&self, root: Option<&ActorId>) -> CrawlStatus {
        self.status.send_replace(CrawlStatus::Running);

        let status = match self.crawl(root).await {
            Ok(report) => {
                tracing::info!(
                    "Crawl from {} complete in {} ms: {} actors scored ({} second-hop authors, {} batches)",
                    report.root,
                    report.elapsed().num_milliseconds(),
                    report.scored,
                    report.second_hop_authors,
                    report.batches
                );
                CrawlStatus::Complete {
                    scored: report.scored,
                    finished_at: report.finished_at,
                }
            }
            Err(BazaarError::NoData) => {
                tracing::info!("Crawl found no assertions; keeping previous scores");
                CrawlStatus::NoResults
            }
            Err(e) => {
                let recoverable = e.is_recoverable();
                if recoverable {
                    tracing::warn!("Crawl failed: {}. Keeping previous scores.", e);
                } else {
                    tracing::error!("Crawl refused: {}. Retrying will not help.", e);
                }
                CrawlStatus::Failed {
                    reason: e.to_string(),
                    recoverable,
                }
            }
        };

        self.status.send_replace(status.clone());
        status
    }

    /// Crawl the follow graph from `root` and replace the store's score map.
    ///
    /// On any error the store is left untouched.
    pub async fn crawl(&self, root: Option<&ActorId>) -> Result<CrawlReport, BazaarError> {
        let root = root
            .cloned()
            .ok_or_else(|| BazaarError::Configuration("crawl requires the current actor's id".to_string()))?;

        let _guard = self.in_flight.lock().await;
        let started_at = Utc::now();
        let budget = self.config.crawl_timeout();

        tracing::info!("Crawl started from {} (budget {:?})", root, budget);

        let (scores, second_hop_authors, batches) =
            match tokio::time::timeout(budget, self.compute(&root)).await {
                Ok(result) => result?,
                Err(_) => return Err(BazaarError::Timeout(budget)),
            };

        let report = CrawlReport {
            root,
            scored: scores.len(),
            second_hop_authors,
            batches,
            started_at,
            finished_at: Utc::now(),
        };
        self.store.replace(scores);
        Ok(report)
    }

    /// Both hops, merged into a fresh score map.
    ///
    /// Returns the map plus the second-hop author and batch counts.
    async fn compute(&self, root: &ActorId) -> Result<(ScoreMap, usize, usize), BazaarError> {
        let roots = std::slice::from_ref(root);
        let first = self
            .fetcher
            .fetch_assertions(roots)
            .await?
            .restricted_to(roots);

        if first.is_empty() {
            return Err(BazaarError::NoData);
        }

        let mut tally = ScoreTally::default();
        tally.absorb(&first, Hop::First);

        // Sorted so batch composition is stable across runs.
        let authors: Vec<ActorId> = first
            .targets_of(AssertionKind::Follow, root)
            .iter()
            .filter(|a| *a != root)
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        tracing::debug!("Crawl hop 1 done: {} first-order follows", authors.len());

        let bundles = self.fetch_second_hop(&authors).await?;
        let batches = bundles.len();
        for bundle in &bundles {
            tally.absorb(bundle, Hop::Second);
        }

        Ok((tally.finish(&self.config.weights), authors.len(), batches))
    }

    /// Fetch every author's assertions in batches, at most
    /// `max_concurrent_batches` in flight. Fails as a whole if any batch fails.
    async fn fetch_second_hop(
        &self,
        authors: &[ActorId],
    ) -> Result<Vec<AssertionBundle>, BazaarError> {
        let permits = Arc::new(Semaphore::new(self.config.max_concurrent_batches));
        let mut set = JoinSet::new();

        for (index, chunk) in authors.chunks(self.config.batch_size).enumerate() {
            let fetcher = self.fetcher.clone();
            let permits = permits.clone();
            let batch = chunk.to_vec();

            set.spawn(async move {
                let _permit = permits
                    .acquire_owned()
                    .await
                    .map_err(|e| BazaarError::Network(format!("batch pool closed: {}", e)))?;
                tracing::debug!("Crawl hop 2: fetching batch {} ({} authors)", index, batch.len());
                let bundle = fetcher.fetch_assertions(&batch).await?;
                Ok::<_, BazaarError>(bundle.restricted_to(&batch))
            });
        }

        let mut bundles = Vec::with_capacity(set.len());
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(Ok(bundle)) => bundles.push(bundle),
                Ok(Err(e)) => {
                    set.abort_all();
                    return Err(e);
                }
                Err(e) => {
                    set.abort_all();
                    return Err(BazaarError::Network(format!("batch task failed: {}", e)));
                }
            }
        }

        Ok(bundles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    fn id(s: &str) -> ActorId {
        ActorId::parse(s).unwrap()
    }

    fn ids(list: &[&str]) -> Vec<ActorId> {
        list.iter().map(|s| id(s)).collect()
    }

    /// In-memory network: every author's published lists.
    #[derive(Default, Clone)]
    struct FakeNetwork {
        bundle: AssertionBundle,
        /// Authors whose batch fetch fails.
        broken: HashSet<ActorId>,
        /// Per-author artificial latency, to shuffle batch completion order.
        delay_ms: HashMap<ActorId, u64>,
        calls: Arc<AtomicUsize>,
    }

    impl FakeNetwork {
        fn follows(mut self, author: &str, targets: &[&str]) -> Self {
            self.bundle.insert(AssertionKind::Follow, id(author), ids(targets));
            self
        }

        fn mutes(mut self, author: &str, targets: &[&str]) -> Self {
            self.bundle.insert(AssertionKind::Mute, id(author), ids(targets));
            self
        }

        fn reports(mut self, author: &str, targets: &[&str]) -> Self {
            self.bundle.insert(AssertionKind::Report, id(author), ids(targets));
            self
        }
    }

    #[async_trait]
    impl AssertionFetcher for FakeNetwork {
        async fn fetch_assertions(&self, authors: &[ActorId]) -> Result<AssertionBundle, BazaarError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let delay = authors
                .iter()
                .filter_map(|a| self.delay_ms.get(a))
                .max()
                .copied()
                .unwrap_or(0);
            if delay > 0 {
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }
            if authors.iter().any(|a| self.broken.contains(a)) {
                return Err(BazaarError::Network("relay unreachable".to_string()));
            }
            Ok(self.bundle.restricted_to(authors))
        }
    }

    fn crawler_for(net: FakeNetwork, config: TrustConfig) -> (GraphCrawler, Arc<SignalStore>) {
        let store = Arc::new(SignalStore::new());
        (GraphCrawler::new(Arc::new(net), store.clone(), config), store)
    }

    fn small_batches() -> TrustConfig {
        TrustConfig {
            batch_size: 1,
            max_concurrent_batches: 2,
            ..TrustConfig::default()
        }
    }

    #[tokio::test]
    async fn two_hop_weights_accumulate() {
        let net = FakeNetwork::default()
            .follows("me", &["alice", "bob"])
            .follows("alice", &["carol", "bob"])
            .follows("bob", &["carol"]);
        let (crawler, store) = crawler_for(net, small_batches());

        let report = crawler.crawl(Some(&id("me"))).await.unwrap();
        assert_eq!(report.second_hop_authors, 2);
        assert_eq!(report.batches, 2);
        assert!(report.started_at <= report.finished_at);
        assert!(report.elapsed() >= chrono::Duration::zero());

        // alice: 2.0 (first order)
        assert_eq!(store.score_of(&id("alice")), Some(2.0));
        // bob: 2.0 first order + 1.0 from alice
        assert_eq!(store.score_of(&id("bob")), Some(3.0));
        // carol: 1.0 from alice + 1.0 from bob
        assert_eq!(store.score_of(&id("carol")), Some(2.0));
    }

    #[tokio::test]
    async fn duplicate_targets_in_one_list_count_once() {
        let net = FakeNetwork::default().follows("me", &["alice", "alice", "alice"]);
        let (crawler, store) = crawler_for(net, TrustConfig::default());
        crawler.crawl(Some(&id("me"))).await.unwrap();
        assert_eq!(store.score_of(&id("alice")), Some(2.0));
    }

    #[tokio::test]
    async fn mutes_only_penalize_actors_inside_the_follow_network() {
        let net = FakeNetwork::default()
            .follows("me", &["alice", "bob"])
            .mutes("me", &["bob", "stranger"])
            .follows("alice", &["carol"])
            .mutes("alice", &["carol", "other_stranger"]);
        let (crawler, store) = crawler_for(net, TrustConfig::default());
        crawler.crawl(Some(&id("me"))).await.unwrap();

        // bob: 2.0 follow - 1.0 first-order mute
        assert_eq!(store.score_of(&id("bob")), Some(1.0));
        // carol: 1.0 follow - 0.5 second-order mute
        assert_eq!(store.score_of(&id("carol")), Some(0.5));
        assert_eq!(store.score_of(&id("stranger")), None);
        assert_eq!(store.score_of(&id("other_stranger")), None);
    }

    #[tokio::test]
    async fn reports_use_the_same_rule_as_mutes() {
        let net = FakeNetwork::default()
            .follows("me", &["alice"])
            .follows("alice", &["spammer"])
            .reports("alice", &["spammer", "unknown"])
            .reports("me", &["spammer"]);
        let (crawler, store) = crawler_for(net, TrustConfig::default());
        crawler.crawl(Some(&id("me"))).await.unwrap();

        // spammer: 1.0 follow - 0.5 (alice report) - 1.0 (my report)
        assert_eq!(store.score_of(&id("spammer")), Some(-0.5));
        assert_eq!(store.score_of(&id("unknown")), None);
    }

    #[tokio::test]
    async fn no_assertions_leaves_previous_scores() {
        let store = Arc::new(SignalStore::with_scores(
            [(id("old"), 5.0)].into_iter().collect(),
        ));
        let crawler = GraphCrawler::new(
            Arc::new(FakeNetwork::default()),
            store.clone(),
            TrustConfig::default(),
        );

        let status = crawler.run(Some(&id("me"))).await;
        assert_eq!(status, CrawlStatus::NoResults);
        assert_eq!(store.score_of(&id("old")), Some(5.0));
    }

    #[tokio::test]
    async fn missing_root_is_a_configuration_error() {
        let (crawler, _) = crawler_for(FakeNetwork::default(), TrustConfig::default());
        let err = crawler.crawl(None).await.unwrap_err();
        assert!(matches!(err, BazaarError::Configuration(_)));
        assert!(matches!(
            crawler.run(None).await,
            CrawlStatus::Failed { recoverable: false, .. }
        ));
    }

    #[tokio::test]
    async fn failed_second_hop_batch_preserves_previous_scores() {
        let mut net = FakeNetwork::default()
            .follows("me", &["alice", "bob", "carol"])
            .follows("alice", &["dave"]);
        net.broken.insert(id("bob"));

        let store = Arc::new(SignalStore::with_scores(
            [(id("old"), 5.0)].into_iter().collect(),
        ));
        let crawler = GraphCrawler::new(Arc::new(net), store.clone(), small_batches());

        let status = crawler.run(Some(&id("me"))).await;
        assert!(matches!(status, CrawlStatus::Failed { recoverable: true, .. }));
        assert_eq!(crawler.status(), status);
        assert_eq!(store.score_of(&id("old")), Some(5.0));
        assert_eq!(store.score_of(&id("alice")), None);
    }

    #[tokio::test]
    async fn first_hop_failure_is_reported() {
        let mut net = FakeNetwork::default().follows("me", &["alice"]);
        net.broken.insert(id("me"));
        let (crawler, store) = crawler_for(net, TrustConfig::default());

        let err = crawler.crawl(Some(&id("me"))).await.unwrap_err();
        assert!(matches!(err, BazaarError::Network(_)));
        assert!(store.snapshot().is_empty());
    }

    #[tokio::test]
    async fn timeout_fails_the_crawl_without_partial_write() {
        let mut net = FakeNetwork::default()
            .follows("me", &["fast", "slow"])
            .follows("fast", &["x"]);
        net.delay_ms.insert(id("slow"), 3_000);

        let config = TrustConfig {
            crawl_timeout_secs: 1,
            ..small_batches()
        };
        let (crawler, store) = crawler_for(net, config);

        let err = crawler.crawl(Some(&id("me"))).await.unwrap_err();
        assert!(matches!(err, BazaarError::Timeout(_)));
        assert!(store.snapshot().is_empty());
    }

    #[tokio::test]
    async fn batches_respect_batch_size() {
        let net = FakeNetwork::default().follows("me", &["a", "b", "c", "d", "e"]);
        let calls = net.calls.clone();
        let config = TrustConfig {
            batch_size: 2,
            ..TrustConfig::default()
        };
        let (crawler, _) = crawler_for(net, config);

        let report = crawler.crawl(Some(&id("me"))).await.unwrap();
        assert_eq!(report.batches, 3);
        // one first-hop call plus three batches
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn batch_completion_order_does_not_change_scores() {
        let base = FakeNetwork::default()
            .follows("me", &["a", "b", "c"])
            .follows("a", &["x", "y"])
            .mutes("a", &["b"])
            .follows("b", &["x"])
            .reports("b", &["y"])
            .follows("c", &["y", "z"])
            .mutes("c", &["x"]);

        let mut results = Vec::new();
        for delays in [[0u64, 20, 40], [40, 20, 0], [20, 0, 40]] {
            let mut net = base.clone();
            for (author, delay) in ["a", "b", "c"].iter().zip(delays) {
                net.delay_ms.insert(id(author), delay);
            }
            let (crawler, store) = crawler_for(net, small_batches());
            crawler.crawl(Some(&id("me"))).await.unwrap();
            results.push(store.snapshot());
        }

        assert_eq!(results[0], results[1]);
        assert_eq!(results[1], results[2]);
    }

    #[test]
    fn tally_merge_is_permutation_invariant() {
        let mut one = AssertionBundle::new();
        one.insert(AssertionKind::Follow, id("a"), ids(&["x", "y"]));
        one.insert(AssertionKind::Mute, id("a"), ids(&["y"]));
        let mut two = AssertionBundle::new();
        two.insert(AssertionKind::Follow, id("b"), ids(&["y"]));
        two.insert(AssertionKind::Report, id("b"), ids(&["x"]));
        let mut three = AssertionBundle::new();
        three.insert(AssertionKind::Mute, id("c"), ids(&["x", "z"]));

        let orders = [[0, 1, 2], [0, 2, 1], [1, 0, 2], [1, 2, 0], [2, 0, 1], [2, 1, 0]];
        let bundles = [one, two, three];
        let weights = CrawlWeights::default();

        let maps: Vec<ScoreMap> = orders
            .iter()
            .map(|order| {
                let mut tally = ScoreTally::default();
                for &i in order {
                    tally.absorb(&bundles[i], Hop::Second);
                }
                tally.finish(&weights)
            })
            .collect();

        for map in &maps[1..] {
            assert_eq!(map, &maps[0]);
        }
        // z was only muted: stranger, no score
        assert_eq!(maps[0].get(&id("z")), None);
    }

    #[tokio::test]
    async fn status_channel_reports_completion() {
        let net = FakeNetwork::default().follows("me", &["alice"]);
        let (crawler, _) = crawler_for(net, TrustConfig::default());
        let rx = crawler.subscribe_status();
        assert_eq!(*rx.borrow(), CrawlStatus::Idle);

        crawler.run(Some(&id("me"))).await;
        assert!(matches!(*rx.borrow(), CrawlStatus::Complete { scored: 1, .. }));
    }
}
