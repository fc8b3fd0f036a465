//! Parse metrics.
//!
//! This module defines the structs used to observe and debug a parse run.
//!
//! The intended usage is:
//!
//! - `Morpher::parse_word` for normal operation.
//! - `Morpher::parse_word_detailed` for profiling, debugging regressions, and
//!   inspecting how many hypotheses each phase produced.
//!
//! Metrics are cheap: a handful of `Instant::now` calls and counters per
//! parse. The hypothesis lists themselves are only kept by
//! [`ParseReport`].

use crate::word::Word;
use std::time::Duration;

// --- Metrics -----------------------------------------------------------------

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ParseMetrics {
    /// Total elapsed time for the parse.
    pub total: Duration,
    pub analysis: PhaseMetrics,
    pub lookup: PhaseMetrics,
    pub synthesis: PhaseMetrics,
    pub validation: PhaseMetrics,
}

/// Timing and output count for a single phase.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PhaseMetrics {
    pub duration: Duration,
    /// Hypotheses the phase handed to the next one.
    pub produced: usize,
}

impl ParseMetrics {
    pub fn phases(&self) -> [(&'static str, PhaseMetrics); 4] {
        [
            ("analysis", self.analysis),
            ("lookup", self.lookup),
            ("synthesis", self.synthesis),
            ("validation", self.validation),
        ]
    }
}

/// Parse output bundled with every intermediate hypothesis set.
#[derive(Debug, Clone)]
pub struct ParseReport {
    /// Underlying shapes after unapplying the rules.
    pub analyses: Vec<Word>,
    /// Lexical candidates: analyses bound to root allomorphs.
    pub candidates: Vec<Word>,
    /// Surface words synthesized from the candidates, before validation.
    pub synthesized: Vec<Word>,
    /// Valid, ranked results.
    pub results: Vec<Word>,
    pub metrics: ParseMetrics,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phases_are_listed_in_pipeline_order() {
        let metrics = ParseMetrics {
            lookup: PhaseMetrics { duration: Duration::from_millis(2), produced: 3 },
            ..ParseMetrics::default()
        };
        let names: Vec<&str> = metrics.phases().iter().map(|(name, _)| *name).collect();
        assert_eq!(names, ["analysis", "lookup", "synthesis", "validation"]);
        assert_eq!(metrics.phases()[1].1.produced, 3);
    }
}
