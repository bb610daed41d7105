// crates/bazaar-daemon/src/snapshot.rs
//
// File-backed stand-ins for the relay layer and the marketplace record
// stream: an exported assertion snapshot (JSON `AssertionBundle`) served
// through the `AssertionFetcher` trait, and a JSON list of deal records.

use std::fs;

use async_trait::async_trait;

use bazaar_core::actor::ActorId;
use bazaar_core::assertion::AssertionBundle;
use bazaar_core::deal::DealRecord;
use bazaar_core::error::BazaarError;
use bazaar_core::traits::AssertionFetcher;

/// Serves assertions from an in-memory copy of an exported snapshot.
#[derive(Debug, Clone)]
pub struct SnapshotFetcher {
    bundle: AssertionBundle,
}

impl SnapshotFetcher {
    pub fn new(bundle: AssertionBundle) -> Self {
        Self { bundle }
    }

    /// Read a snapshot file. A missing file is a configuration error.
    pub fn load(path: &str) -> Result<Self, BazaarError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| BazaarError::Configuration(format!("cannot read {}: {}", path, e)))?;
        let bundle: AssertionBundle = serde_json::from_str(&contents)?;
        tracing::info!(
            "Loaded assertion snapshot from {} ({} follow lists, {} mute lists, {} report lists)",
            path,
            bundle.follows.len(),
            bundle.mutes.len(),
            bundle.reports.len()
        );
        Ok(Self::new(bundle))
    }

    pub fn bundle(&self) -> &AssertionBundle {
        &self.bundle
    }
}

#[async_trait]
impl AssertionFetcher for SnapshotFetcher {
    async fn fetch_assertions(&self, authors: &[ActorId]) -> Result<AssertionBundle, BazaarError> {
        Ok(self.bundle.restricted_to(authors))
    }
}

/// Read a JSON array of deal records.
pub fn load_deal_records(path: &str) -> Result<Vec<DealRecord>, BazaarError> {
    let contents = fs::read_to_string(path)
        .map_err(|e| BazaarError::Configuration(format!("cannot read {}: {}", path, e)))?;
    let records: Vec<DealRecord> = serde_json::from_str(&contents)?;
    tracing::info!("Loaded {} deal records from {}", records.len(), path);
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    use bazaar_core::assertion::AssertionKind;
    use bazaar_core::deal::DealKind;

    fn id(s: &str) -> ActorId {
        ActorId::parse(s).unwrap()
    }

    fn temp_file(label: &str, contents: &str) -> String {
        let path = std::env::temp_dir().join(format!("bazaar_{}_{}.json", label, uuid::Uuid::new_v4()));
        fs::write(&path, contents).unwrap();
        path.to_string_lossy().to_string()
    }

    #[tokio::test]
    async fn serves_only_requested_authors() {
        let path = temp_file(
            "assertions",
            r#"{
                "follows": {"me": ["alice"], "alice": ["bob"]},
                "mutes": {"me": ["troll"]}
            }"#,
        );
        let fetcher = SnapshotFetcher::load(&path).unwrap();

        let mine = fetcher.fetch_assertions(&[id("me")]).await.unwrap();
        assert_eq!(mine.targets_of(AssertionKind::Follow, &id("me")), &[id("alice")]);
        assert_eq!(mine.targets_of(AssertionKind::Mute, &id("me")), &[id("troll")]);
        assert!(mine.targets_of(AssertionKind::Follow, &id("alice")).is_empty());

        let nobody = fetcher.fetch_assertions(&[id("ghost")]).await.unwrap();
        assert!(nobody.is_empty());
    }

    #[test]
    fn missing_snapshot_is_a_configuration_error() {
        let err = SnapshotFetcher::load("/nonexistent/bazaar/assertions.json").unwrap_err();
        assert!(matches!(err, BazaarError::Configuration(_)));
    }

    #[test]
    fn malformed_snapshot_is_a_serialization_error() {
        let path = temp_file("bad", "{ not json");
        assert!(matches!(
            SnapshotFetcher::load(&path),
            Err(BazaarError::Serialization(_))
        ));
    }

    #[test]
    fn deal_records_load() {
        let path = temp_file(
            "deals",
            r#"[
                {"address": "bid:1", "owner": "f", "kind": "response"},
                {"address": "job:1", "owner": "me", "kind": "offering", "counterparty_address": "bid:1"}
            ]"#,
        );
        let records = load_deal_records(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].kind, DealKind::Offering);
        assert_eq!(records[1].counterparty_address.as_deref(), Some("bid:1"));
    }
}
