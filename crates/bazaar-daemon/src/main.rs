// crates/bazaar-daemon/src/main.rs
//
// Binary entrypoint for the Bazaar trust daemon.
//
// Parses CLI arguments, loads configuration, initializes tracing, restores
// the persisted score map, wires the crawler, deal index and trust engine
// together, and runs the crawl refresher until shutdown.

mod config;
mod refresh;
mod snapshot;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use config::DaemonConfig;
use refresh::CrawlRefresher;
use snapshot::{load_deal_records, SnapshotFetcher};
use tokio::sync::mpsc;

use bazaar_core::assertion::AssertionBundle;
use bazaar_core::traits::{AssertionFetcher, ScorePersistence};
use bazaar_reputation::{
    CuratedSeeds, DealGraphIndex, GraphCrawler, MuteFilter, SignalStore, TrustEngine, TrustInput,
};
use bazaar_store::RocksScoreStore;

/// Bazaar trust daemon: keeps the current actor's trust set up to date.
#[derive(Parser, Debug)]
#[command(name = "bazaar-trustd", version = "0.1.0", about = "Bazaar trust graph daemon")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "~/.bazaar/config.toml")]
    config: String,

    /// Run a single crawl, print the trust set, and exit.
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Config is read first so its log level can seed the filter; problems
    // loading it are logged once tracing is up.
    let config_path = expand_tilde(&args.config);
    let loaded = DaemonConfig::load(&config_path);
    let daemon_config = match &loaded {
        Ok(cfg) => cfg.clone(),
        Err(_) => DaemonConfig::default(),
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&daemon_config.log_level)),
        )
        .init();

    match loaded {
        Ok(_) => tracing::info!("Loaded configuration from {}", config_path),
        Err(e) => tracing::warn!(
            "Could not load config from {}: {}. Using defaults.",
            config_path,
            e
        ),
    }

    daemon_config.trust.validate()?;
    let self_id = daemon_config.self_actor()?;

    tracing::info!("Bazaar Trust Daemon v0.1.0");
    match &self_id {
        Some(me) => tracing::info!("Current actor: {}", me),
        None => tracing::warn!("No self_id configured; crawls will be refused"),
    }
    tracing::info!("Data directory: {}", daemon_config.data_dir);
    tracing::info!("Minimum score: {}", daemon_config.trust.min_score);

    // ---------------------------------------------------------------
    // Score persistence (optional; the daemon runs without it).
    // ---------------------------------------------------------------
    let data_dir = expand_tilde(&daemon_config.data_dir);
    let scores_db_path = format!("{}/scores_rocksdb", data_dir);

    let persistence: Option<Arc<RocksScoreStore>> = match RocksScoreStore::open(&scores_db_path) {
        Ok(db) => {
            tracing::info!("Score store opened at {}", scores_db_path);
            Some(Arc::new(db))
        }
        Err(e) => {
            tracing::warn!("Failed to open score store: {}. Scores will not persist.", e);
            None
        }
    };

    let restored = match &persistence {
        Some(db) => match db.load_scores().await {
            Ok(scores) => {
                tracing::info!("Restored {} persisted scores", scores.len());
                scores
            }
            Err(e) => {
                tracing::warn!("Failed to load persisted scores: {}", e);
                Default::default()
            }
        },
        None => Default::default(),
    };
    let store = Arc::new(SignalStore::with_scores(restored));

    // ---------------------------------------------------------------
    // Assertion source and deal records.
    // ---------------------------------------------------------------
    let assertions_path = expand_tilde(&daemon_config.assertions_path);
    let fetcher = match SnapshotFetcher::load(&assertions_path) {
        Ok(fetcher) => fetcher,
        Err(e) => {
            tracing::warn!("No assertion snapshot available: {}", e);
            SnapshotFetcher::new(AssertionBundle::new())
        }
    };
    let initial_mutes = match &self_id {
        Some(me) => MuteFilter::from_assertions(me, fetcher.bundle()),
        None => MuteFilter::empty(),
    };
    let fetcher: Arc<dyn AssertionFetcher> = Arc::new(fetcher);

    let mut deal_index = DealGraphIndex::new();
    if let Some(path) = &daemon_config.deals_path {
        match load_deal_records(&expand_tilde(path)) {
            Ok(records) => deal_index.extend(records),
            Err(e) => tracing::warn!("Failed to load deal records: {}", e),
        }
    }
    tracing::info!("Deal index holds {} records", deal_index.len());

    let seeds = match &daemon_config.seeds {
        Some(ids) => CuratedSeeds::from_ids(ids.iter().map(String::as_str)),
        None => CuratedSeeds::bundled()?,
    };
    tracing::info!("Curated seeds: {}", seeds.len());

    // ---------------------------------------------------------------
    // Trust engine.
    // ---------------------------------------------------------------
    let mut engine = TrustEngine::new(seeds, daemon_config.trust.min_score);
    engine.apply(TrustInput::Identity(self_id.clone()));
    engine.apply(TrustInput::FollowNetwork(daemon_config.follow_network_ids()));
    engine.apply(TrustInput::Mutes(initial_mutes));

    let mut trust_rx = engine.subscribe();
    let (engine_tx, engine_rx) = mpsc::channel::<TrustInput>(16);
    let engine_handle = tokio::spawn(engine.run(store.subscribe(), deal_index.subscribe(), engine_rx));

    tokio::spawn(async move {
        while trust_rx.changed().await.is_ok() {
            let set = trust_rx.borrow_and_update().clone();
            tracing::info!("Trust set updated: {} members", set.len());
        }
    });

    // ---------------------------------------------------------------
    // Crawler and refresher.
    // ---------------------------------------------------------------
    let crawler = Arc::new(GraphCrawler::new(
        fetcher.clone(),
        store.clone(),
        daemon_config.trust.clone(),
    ));

    let mut refresher = CrawlRefresher::new(
        crawler,
        fetcher,
        self_id,
        Duration::from_secs(daemon_config.refresh_interval_secs),
        engine_tx,
    );
    if let Some(db) = persistence {
        refresher = refresher.with_persistence(db as Arc<dyn ScorePersistence>);
    }

    if args.once {
        let status = refresher.refresh_once().await;
        tracing::info!("Crawl status: {:?}", status);
    } else {
        refresher.run().await;
    }

    // Dropping the refresher closes the engine's input channel.
    drop(refresher);
    let final_set = match engine_handle.await {
        Ok(set) => set,
        Err(e) => {
            tracing::warn!("Trust engine task failed: {}", e);
            return Ok(());
        }
    };

    if final_set.is_empty() {
        tracing::warn!("Final trust set is empty: no identity, seeds, scores or follows");
    } else {
        tracing::info!("Final trust set ({} members):", final_set.len());
    }
    for actor in final_set.iter() {
        println!("{}", actor);
    }

    // Keep the deal index alive until the engine has stopped.
    drop(deal_index);

    tracing::info!("Bazaar trust daemon shut down");
    Ok(())
}

/// Expand a leading `~/` to the user's home directory.
fn expand_tilde(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return format!("{}/{}", home.display(), rest);
        }
    }
    path.to_string()
}
