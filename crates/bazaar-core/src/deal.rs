// crates/bazaar-core/src/deal.rs
//
// Marketplace transaction references. The engine never looks inside a job,
// bid, service or order; it only needs who owns a record and which
// complementary record it accepted.

use serde::{Deserialize, Serialize};

use crate::actor::ActorId;

/// Which side of a deal a record represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DealKind {
    /// Something put up for others to respond to (a job, a service).
    Offering,
    /// A reply to an offering (a bid, an order).
    Response,
}

impl DealKind {
    /// The kind a record of this kind pairs with.
    pub fn complement(self) -> DealKind {
        match self {
            DealKind::Offering => DealKind::Response,
            DealKind::Response => DealKind::Offering,
        }
    }
}

/// A marketplace record reduced to its ownership and acceptance linkage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DealRecord {
    /// Stable address of this record instance.
    pub address: String,
    /// Actor who created the record.
    pub owner: ActorId,
    /// Address of the complementary record this one accepted, if any
    /// (e.g. a job's accepted bid).
    #[serde(default)]
    pub counterparty_address: Option<String>,
    pub kind: DealKind,
}

impl DealRecord {
    /// An offering with no accepted counterparty yet.
    pub fn offering(address: impl Into<String>, owner: ActorId) -> Self {
        Self {
            address: address.into(),
            owner,
            counterparty_address: None,
            kind: DealKind::Offering,
        }
    }

    /// A response with no accepted counterparty.
    pub fn response(address: impl Into<String>, owner: ActorId) -> Self {
        Self {
            address: address.into(),
            owner,
            counterparty_address: None,
            kind: DealKind::Response,
        }
    }

    /// Mark `address` as the accepted complementary record.
    pub fn accepting(mut self, address: impl Into<String>) -> Self {
        self.counterparty_address = Some(address.into());
        self
    }
}
