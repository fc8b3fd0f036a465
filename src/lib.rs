extern crate self as phonomorph;

#[macro_use]
mod macros;
mod api;
pub mod engine;
pub mod error;
pub mod feature;
pub mod grammars;
pub mod lexicon;
pub mod pattern;
pub mod shape;
pub mod symbols;
pub mod word;

pub use api::{
    Analysis, CandidateSummary, Options, ParseDetails, ParseResult, ParseResultVerbose, PhaseSummary, parse, parse_verbose,
    parse_verbose_on, parse_verbose_with, parse_with,
};
pub use engine::{
    AffixProcessRule, AffixTemplate, CascadeOrder, ChangeKind, Language, Morpher, MorpherOptions, NoTrace, RewriteRule,
    Rule, RuleCascade, RuleContext, Stratum, TraceEvent, TraceMask, TraceRecorder, TraceSink,
};
pub use error::{FeatureError, MorphError};
pub use feature::{FeatureStruct, FeatureSystem, VariableBindings};
pub use lexicon::{AllomorphRef, LexEntry, Lexicon, MorphemeId, RootAllomorph};
pub use shape::{NodeId, Shape, ShapeNode};
pub use symbols::{CharacterDefinitionTable, SymbolTable};
pub use word::Word;

// --- Core enums --------------------------------------------------------------

/// Scan direction over a shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Direction {
    #[default]
    LeftToRight,
    RightToLeft,
}

impl Direction {
    pub fn reverse(self) -> Direction {
        match self {
            Direction::LeftToRight => Direction::RightToLeft,
            Direction::RightToLeft => Direction::LeftToRight,
        }
    }
}

/// Which way rules run: forward (underlying to surface) or inverse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Synthesis,
    Analysis,
}
