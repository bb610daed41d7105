// crates/bazaar-store/src/rocks.rs
//
// RocksDB-backed persistent storage for the network score map.
//
// Key format:
//   - `score:{actor_id}` -> JSON-serialized f64
//
// A save replaces the whole `score:` keyspace in one WriteBatch, mirroring
// the crawler's all-or-nothing replacement of the in-memory map.

use async_trait::async_trait;
use rocksdb::{DBWithThreadMode, IteratorMode, MultiThreaded, Options, WriteBatch};

use bazaar_core::actor::ActorId;
use bazaar_core::error::BazaarError;
use bazaar_core::score::ScoreMap;
use bazaar_core::traits::ScorePersistence;

const SCORE_PREFIX: &str = "score:";

/// RocksDB wrapper implementing the `ScorePersistence` trait.
#[derive(Debug)]
pub struct RocksScoreStore {
    db: DBWithThreadMode<MultiThreaded>,
}

impl RocksScoreStore {
    /// Open a RocksDB database at the given filesystem path.
    ///
    /// Creates the database directory if it does not exist.
    pub fn open(path: &str) -> Result<Self, BazaarError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);

        let db = DBWithThreadMode::<MultiThreaded>::open(&opts, path)
            .map_err(|e| BazaarError::Storage(format!("Failed to open RocksDB at {}: {}", path, e)))?;

        Ok(Self { db })
    }

    fn score_key(actor: &ActorId) -> Vec<u8> {
        format!("{}{}", SCORE_PREFIX, actor).into_bytes()
    }

    /// Collect every key currently under the `score:` prefix.
    fn score_keys(&self) -> Result<Vec<Box<[u8]>>, BazaarError> {
        let prefix = SCORE_PREFIX.as_bytes();
        let mut keys = Vec::new();
        let iter = self
            .db
            .iterator(IteratorMode::From(prefix, rocksdb::Direction::Forward));
        for item in iter {
            let (key, _value) = item
                .map_err(|e| BazaarError::Storage(format!("RocksDB iteration error: {}", e)))?;
            if !key.starts_with(prefix) {
                break;
            }
            keys.push(key);
        }
        Ok(keys)
    }

    /// Synchronous load, for callers outside an async context.
    pub fn load_scores_sync(&self) -> Result<ScoreMap, BazaarError> {
        let prefix = SCORE_PREFIX.as_bytes();
        let mut scores = ScoreMap::new();

        let iter = self
            .db
            .iterator(IteratorMode::From(prefix, rocksdb::Direction::Forward));
        for item in iter {
            let (key, value) = item
                .map_err(|e| BazaarError::Storage(format!("RocksDB iteration error: {}", e)))?;
            if !key.starts_with(prefix) {
                break;
            }

            let raw_id = std::str::from_utf8(&key[prefix.len()..])
                .map_err(|e| BazaarError::Storage(format!("Non-UTF8 actor key: {}", e)))?;
            let actor = ActorId::parse(raw_id)?;
            let score: f64 = serde_json::from_slice(&value)?;
            scores.insert(actor, score);
        }

        Ok(scores)
    }

    /// Synchronous save: drops every stored score, then writes `scores`.
    pub fn save_scores_sync(&self, scores: &ScoreMap) -> Result<(), BazaarError> {
        let mut batch = WriteBatch::default();
        for key in self.score_keys()? {
            batch.delete(key);
        }
        for (actor, score) in scores.iter() {
            batch.put(Self::score_key(actor), serde_json::to_vec(&score)?);
        }
        self.db
            .write(batch)
            .map_err(|e| BazaarError::Storage(format!("RocksDB write failed: {}", e)))
    }
}

#[async_trait]
impl ScorePersistence for RocksScoreStore {
    async fn load_scores(&self) -> Result<ScoreMap, BazaarError> {
        self.load_scores_sync()
    }

    async fn save_scores(&self, scores: &ScoreMap) -> Result<(), BazaarError> {
        self.save_scores_sync(scores)
    }
}
