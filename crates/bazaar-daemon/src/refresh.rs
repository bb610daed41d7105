// crates/bazaar-daemon/src/refresh.rs
//
// Crawl refresher for the trust daemon.
//
// Re-runs the graph crawl on a fixed staleness interval, persists each
// successful score map, and pushes the current actor's refreshed mute list
// into the trust engine.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use bazaar_core::actor::ActorId;
use bazaar_core::traits::{AssertionFetcher, ScorePersistence};
use bazaar_reputation::{CrawlStatus, GraphCrawler, MuteFilter, TrustInput};

pub struct CrawlRefresher {
    crawler: Arc<GraphCrawler>,
    source: Arc<dyn AssertionFetcher>,
    persistence: Option<Arc<dyn ScorePersistence>>,
    self_id: Option<ActorId>,
    interval: Duration,
    engine_tx: mpsc::Sender<TrustInput>,
}

impl CrawlRefresher {
    pub fn new(
        crawler: Arc<GraphCrawler>,
        source: Arc<dyn AssertionFetcher>,
        self_id: Option<ActorId>,
        interval: Duration,
        engine_tx: mpsc::Sender<TrustInput>,
    ) -> Self {
        Self {
            crawler,
            source,
            persistence: None,
            self_id,
            interval,
            engine_tx,
        }
    }

    /// Save every successful score map through `persistence`.
    pub fn with_persistence(mut self, persistence: Arc<dyn ScorePersistence>) -> Self {
        self.persistence = Some(persistence);
        self
    }

    /// One crawl plus its side effects. Storage and mute-refresh failures
    /// are logged and do not change the returned crawl status.
    pub async fn refresh_once(&self) -> CrawlStatus {
        let status = self.crawler.run(self.self_id.as_ref()).await;

        if let CrawlStatus::Complete { .. } = status {
            if let Some(persistence) = &self.persistence {
                let snapshot = self.crawler.store().snapshot();
                match persistence.save_scores(&snapshot).await {
                    Ok(()) => tracing::debug!("Persisted {} scores", snapshot.len()),
                    Err(e) => tracing::warn!("Failed to persist scores: {}", e),
                }
            }
        }

        self.refresh_mutes().await;
        status
    }

    async fn refresh_mutes(&self) {
        let Some(me) = &self.self_id else {
            return;
        };

        match self.source.fetch_assertions(std::slice::from_ref(me)).await {
            Ok(bundle) => {
                let mutes = MuteFilter::from_assertions(me, &bundle);
                tracing::debug!("Mute list refreshed: {} actors", mutes.len());
                if self.engine_tx.send(TrustInput::Mutes(mutes)).await.is_err() {
                    tracing::warn!("Trust engine stopped; mute update dropped");
                }
            }
            Err(e) => tracing::warn!("Failed to refresh mute list: {}", e),
        }
    }

    /// Refresh immediately, then every `interval` until Ctrl-C.
    pub async fn run(&self) {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!("Cannot listen for Ctrl-C: {}", e);
            }
        })
        .await;
    }

    /// Like `run`, but stops when `shutdown` completes. A crawl in flight
    /// is abandoned; the score store only changes when a crawl finishes.
    pub async fn run_until<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tracing::info!("Crawl refresher started (interval={:?})", self.interval);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("Crawl refresher received shutdown signal during a crawl");
                    break;
                }
                _ = self.refresh_once() => {}
            }

            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("Crawl refresher received shutdown signal");
                    break;
                }
                _ = tokio::time::sleep(self.interval) => {}
            }
        }
    }
}
