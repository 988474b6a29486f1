//! The deductive engine layered over [`crate::knowledge::KnowledgeBase`].
//!
//! This module is composed of:
//! - `propagate`: the rule fixpoint run after every new fact or reveal.
//! - `deep_scan`: proof by contradiction over the cells propagation left
//!   open.

mod deep_scan;
mod propagate;

pub use deep_scan::{ScanOutcome, run_deep_scan};
pub use propagate::{Mode, PropagateOutcome, SolveError, propagate};
