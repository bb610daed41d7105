// crates/bazaar-store/src/lib.rs
//
// bazaar-store: Storage layer for the Bazaar trust graph.
//
// Provides RocksDB-backed persistence of the last successful crawl's score
// map so a restarted node keeps serving its last-known-good trust set until
// the next crawl completes.

pub mod rocks;

// Re-export key types for ergonomic access from downstream crates.
pub use rocks::RocksScoreStore;
