//! Observation hooks.
//!
//! Rules report what they did through a [`TraceSink`]. Every hook has a no-op
//! default, so a sink only implements what it cares about. [`NoTrace`] is the
//! sink used unless the caller asks for a trace; [`TraceRecorder`] keeps the
//! events selected by a [`TraceMask`] for later inspection.

use crate::Mode;
use crate::error::MorphError;
use crate::lexicon::MorphemeId;
use crate::word::Word;
use std::cell::RefCell;

bitflags::bitflags! {
    /// Event classes a [`TraceRecorder`] keeps.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TraceMask: u16 {
        const STRATA      = 1 << 0;
        const RULES       = 1 << 1;
        const NOT_APPLIED = 1 << 2;
        const LOOKUP      = 1 << 3;
        const BLOCKED     = 1 << 4;
        const ERRORS      = 1 << 5;
        const RESULTS     = 1 << 6;
        const ALL = Self::STRATA.bits() | Self::RULES.bits() | Self::NOT_APPLIED.bits() | Self::LOOKUP.bits()
            | Self::BLOCKED.bits() | Self::ERRORS.bits() | Self::RESULTS.bits();
    }
}

pub trait TraceSink {
    fn begin_stratum(&self, _mode: Mode, _stratum: &str, _input: &Word) {}

    fn end_stratum(&self, _mode: Mode, _stratum: &str, _outputs: &[Word]) {}

    fn rule_unapplied(&self, _rule: &str, _input: &Word, _output: &Word) {}

    fn rule_applied(&self, _rule: &str, _input: &Word, _output: &Word) {}

    fn rule_not_applied(&self, _mode: Mode, _rule: &str, _input: &Word) {}

    fn lexical_lookup(&self, _input: &Word, _found: &[MorphemeId]) {}

    /// A synthesized word was rejected before it became a result.
    fn blocked(&self, _word: &Word, _reason: &str) {}

    fn branch_error(&self, _rule: &str, _input: &Word, _error: &MorphError) {}

    fn successful_parse(&self, _word: &Word) {}
}

/// Sink that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoTrace;

impl TraceSink for NoTrace {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceEvent {
    BeginStratum { mode: Mode, stratum: String },
    EndStratum { mode: Mode, stratum: String, outputs: usize },
    RuleUnapplied { rule: String },
    RuleApplied { rule: String },
    RuleNotApplied { mode: Mode, rule: String },
    LexicalLookup { found: Vec<MorphemeId> },
    Blocked { morphemes: Vec<MorphemeId>, reason: String },
    BranchError { rule: String, error: MorphError },
    SuccessfulParse { morphemes: Vec<MorphemeId> },
}

/// Sink that records the events selected by its mask.
#[derive(Debug, Default)]
pub struct TraceRecorder {
    mask: TraceMask,
    events: RefCell<Vec<TraceEvent>>,
}

impl TraceRecorder {
    pub fn new(mask: TraceMask) -> Self {
        TraceRecorder { mask, events: RefCell::new(Vec::new()) }
    }

    pub fn events(&self) -> Vec<TraceEvent> {
        self.events.borrow().clone()
    }

    pub fn into_events(self) -> Vec<TraceEvent> {
        self.events.into_inner()
    }

    fn push(&self, class: TraceMask, event: impl FnOnce() -> TraceEvent) {
        if self.mask.contains(class) {
            self.events.borrow_mut().push(event());
        }
    }
}

impl TraceSink for TraceRecorder {
    fn begin_stratum(&self, mode: Mode, stratum: &str, _input: &Word) {
        self.push(TraceMask::STRATA, || TraceEvent::BeginStratum { mode, stratum: stratum.to_string() });
    }

    fn end_stratum(&self, mode: Mode, stratum: &str, outputs: &[Word]) {
        self.push(TraceMask::STRATA, || TraceEvent::EndStratum {
            mode,
            stratum: stratum.to_string(),
            outputs: outputs.len(),
        });
    }

    fn rule_unapplied(&self, rule: &str, _input: &Word, _output: &Word) {
        self.push(TraceMask::RULES, || TraceEvent::RuleUnapplied { rule: rule.to_string() });
    }

    fn rule_applied(&self, rule: &str, _input: &Word, _output: &Word) {
        self.push(TraceMask::RULES, || TraceEvent::RuleApplied { rule: rule.to_string() });
    }

    fn rule_not_applied(&self, mode: Mode, rule: &str, _input: &Word) {
        self.push(TraceMask::NOT_APPLIED, || TraceEvent::RuleNotApplied { mode, rule: rule.to_string() });
    }

    fn lexical_lookup(&self, _input: &Word, found: &[MorphemeId]) {
        self.push(TraceMask::LOOKUP, || TraceEvent::LexicalLookup { found: found.to_vec() });
    }

    fn blocked(&self, word: &Word, reason: &str) {
        self.push(TraceMask::BLOCKED, || TraceEvent::Blocked { morphemes: word.morphemes(), reason: reason.to_string() });
    }

    fn branch_error(&self, rule: &str, _input: &Word, error: &MorphError) {
        self.push(TraceMask::ERRORS, || TraceEvent::BranchError { rule: rule.to_string(), error: error.clone() });
    }

    fn successful_parse(&self, word: &Word) {
        self.push(TraceMask::RESULTS, || TraceEvent::SuccessfulParse { morphemes: word.morphemes() });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::Shape;

    #[test]
    fn recorder_keeps_only_masked_events() {
        let recorder = TraceRecorder::new(TraceMask::RULES | TraceMask::ERRORS);
        let word = Word::new(Shape::new(), 0);
        recorder.rule_applied("lengthening", &word, &word);
        recorder.rule_not_applied(Mode::Synthesis, "epenthesis", &word);
        recorder.branch_error("epenthesis", &word, &MorphError::TooManySegments { limit: 4 });
        assert_eq!(
            recorder.into_events(),
            vec![
                TraceEvent::RuleApplied { rule: "lengthening".to_string() },
                TraceEvent::BranchError { rule: "epenthesis".to_string(), error: MorphError::TooManySegments { limit: 4 } },
            ]
        );
    }

    #[test]
    fn default_recorder_keeps_nothing() {
        let recorder = TraceRecorder::default();
        let word = Word::new(Shape::new(), 0);
        recorder.rule_applied("lengthening", &word, &word);
        recorder.successful_parse(&word);
        assert_eq!(TraceMask::default(), TraceMask::empty());
        assert!(recorder.events().is_empty());
    }

    #[test]
    fn no_trace_accepts_every_hook() {
        let word = Word::new(Shape::new(), 0);
        NoTrace.successful_parse(&word);
        NoTrace.blocked(&word, "unused");
    }
}
