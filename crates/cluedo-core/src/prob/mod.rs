//! Monte Carlo probabilities over the cells deduction could not settle.
//!
//! This module is composed of:
//! - `estimator`: the rejection sampler and its report type.
//! - `cache`: the generation-stamped slot that keeps a report valid until
//!   the knowledge base mutates.

mod cache;
mod estimator;

pub use estimator::{EstimatorConfig, ProbabilityEstimator, ProbabilityReport, SamplingStats};
