// crates/bazaar-reputation/src/lib.rs
//
// bazaar-reputation: Graph crawl, deal graph, mute filter, and trust-set
// derivation for the Bazaar trust graph.
//
// Trust is computed locally and cheaply: a two-hop crawl of the follow graph
// turns follow/mute/report assertions into signed scores, and a pure
// derivation unions those scores (above a threshold) with curated seeds,
// self, marketplace counterparties, and an explicit follow network, then
// subtracts everything the current actor muted.

pub mod config;
pub mod crawler;
pub mod deals;
pub mod derive;
pub mod engine;
pub mod mute;
pub mod percentile;
pub mod seeds;
pub mod signal;

pub use config::{CrawlWeights, TrustConfig};
pub use crawler::{CrawlReport, CrawlStatus, GraphCrawler};
pub use deals::{DealEvent, DealGraph, DealGraphIndex, DealPartners};
pub use derive::{derive_trust_set, TrustInputs, TrustSet};
pub use engine::{TrustEngine, TrustInput};
pub use mute::MuteFilter;
pub use percentile::percentile;
pub use seeds::CuratedSeeds;
pub use signal::SignalStore;
