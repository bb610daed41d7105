// crates/bazaar-core/src/lib.rs
//
// bazaar-core: Core types, error taxonomy, and collaborator traits for the
// Bazaar trust graph.
//
// This is the leaf crate that all other crates in the workspace depend on.
// It defines actor identifiers, signed assertions, marketplace deal records,
// the score map, and the trait seams through which the engine talks to the
// network layer and to persistence.

pub mod actor;
pub mod assertion;
pub mod deal;
pub mod error;
pub mod score;
pub mod traits;

// Re-export key types for ergonomic access from downstream crates.
// Usage: `use bazaar_core::ActorId;`

pub use actor::ActorId;
pub use assertion::{AssertionBundle, AssertionKind};
pub use deal::{DealKind, DealRecord};
pub use error::BazaarError;
pub use score::ScoreMap;
pub use traits::{AssertionFetcher, ScorePersistence};
