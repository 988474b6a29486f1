//! Single-slot cache for sampling reports, keyed by knowledge generation.

use super::estimator::ProbabilityReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ReportKey {
    generation: u64,
    min_valid: usize,
}

impl ReportKey {
    pub(crate) fn new(generation: u64, min_valid: usize) -> Self {
        Self {
            generation,
            min_valid,
        }
    }
}

/// Holds the most recent report. It stays valid until the knowledge base
/// mutates (new generation) or a different sample target is requested.
#[derive(Debug, Default)]
pub(crate) struct ReportCache {
    slot: Option<(ReportKey, ProbabilityReport)>,
}

impl ReportCache {
    /// Removes and returns the cached report if it was computed for `key`.
    pub(crate) fn take_if(&mut self, key: ReportKey) -> Option<ProbabilityReport> {
        match self.slot.take() {
            Some((cached, report)) if cached == key => Some(report),
            _ => None,
        }
    }

    pub(crate) fn store(&mut self, key: ReportKey, report: ProbabilityReport) -> &ProbabilityReport {
        &self.slot.insert((key, report)).1
    }
}
