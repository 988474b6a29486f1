//! Everything known about one game in progress.
//!
//! This module is composed of:
//! - `base`: the owned knowledge base (possession grid, envelope statuses,
//!   reveal constraints) and the fact-assertion cascade.
//! - `constraint`: the "showed one of these cards" disjunctions.
//! - `snapshot`: a serializable image of the whole knowledge base.

mod base;
mod constraint;
mod snapshot;

pub use base::{ConstraintOutcome, FactOutcome, KnowledgeBase};
pub use constraint::{Constraint, ConstraintStore};
pub use snapshot::{KnowledgeSnapshot, SnapshotConstraint, SnapshotError};
