//! Rule application engine.
//!
//! This module is the *public entry point* for applying and unapplying rules.
//! The engine is split into focused submodules under `src/engine/` while the
//! public paths stay flat (for example `crate::engine::Morpher` and
//! `crate::engine::RewriteRule`).
//!
//! ## How the parts work together
//!
//! ```text
//! Language (strata, lexicon, table)
//!     │  CompiledRules::new                      (compiled_rules.rs)
//!     ├──────────────▶ analysis rule tree ──┐    (stratum.rs, cascade.rs)
//!     └──────────────▶ synthesis rule tree  │
//!                                           v
//! surface ── Morpher::parse_word ──▶ unapply every stratum, surface first
//!            (morpher.rs)              - rewrite rules  (rewrite.rs, subrule.rs)
//!                                      - templates      (template.rs)
//!                                      - affixes        (affix.rs)
//!                                      - inflection     (realizational.rs)
//!                                      - compounds      (compound.rs)
//!                                      - dedup via WordKey (dedup.rs)
//!                                           │
//!                                           v
//!                               lexical lookup, then apply every stratum
//!                                           │
//!                                           v
//!                               is_word_valid, disjunction, rank (validate.rs)
//!                                           │
//!                                           v
//!                                       Vec<Word>
//! ```
//!
//! Analysis deliberately overgenerates: unapplying a rule underspecifies what
//! it changed and marks what it may have inserted as optional. Synthesis then
//! re-derives each candidate and only words that reproduce the input survive.
//!
//! ## Responsibilities by module
//!
//! - `subrule.rs`: one `lhs → rhs / left _ right` disjunct, its change kind,
//!   both compiled patterns and the sweeps that apply or unapply it.
//! - `rewrite.rs`: phonological rules made of subrules.
//! - `affix.rs`, `template.rs`: morphological rules and slot templates.
//! - `realizational.rs`, `compound.rs`: affixes keyed on features instead of
//!   the pending stack, and rules joining two roots. Both reuse the part and
//!   output machinery of `affix.rs`.
//! - `cascade.rs`: the `Rule` enum and the ordering policies that combine
//!   rules; branch-local errors are recovered here.
//! - `stratum.rs`: strata and languages, and the cascades they compile to.
//! - `compiled_rules.rs`: the per-language rule trees and affix index.
//! - `validate.rs`: word validity, allomorph disjunction and ranking.
//! - `morpher.rs`: the parse and generation entry points.
//! - `context.rs`, `trace.rs`, `metrics.rs`: configuration, observation hooks
//!   and timings.
//!
//! ## Debugging
//!
//! Every rule application logs through `tracing` at `debug`. The CLI raises
//! the filter to `debug` when `PHONOMORPH_DEBUG_RULES=1` is set.

#[path = "engine/affix.rs"]
mod affix;
#[path = "engine/cascade.rs"]
mod cascade;
#[path = "engine/compiled_rules.rs"]
mod compiled_rules;
#[path = "engine/compound.rs"]
mod compound;
#[path = "engine/context.rs"]
mod context;
#[path = "engine/dedup.rs"]
mod dedup;
#[path = "engine/metrics.rs"]
mod metrics;
#[path = "engine/morpher.rs"]
mod morpher;
#[path = "engine/realizational.rs"]
mod realizational;
#[path = "engine/rewrite.rs"]
mod rewrite;
#[path = "engine/stratum.rs"]
mod stratum;
#[path = "engine/subrule.rs"]
mod subrule;
#[path = "engine/template.rs"]
mod template;
#[path = "engine/trace.rs"]
mod trace;
#[path = "engine/validate.rs"]
mod validate;

#[allow(unused_imports)]
pub use affix::{AffixAllomorph, AffixProcessRule, AffixProcessRuleBuilder, MorphOutput};
#[allow(unused_imports)]
pub use cascade::{CascadeOrder, Rule, RuleCascade};
#[allow(unused_imports)]
pub use compiled_rules::{AllomorphCatalog, CompiledRules};
#[allow(unused_imports)]
pub use compound::{CompoundingRule, CompoundingRuleBuilder, CompoundingSubrule};
#[allow(unused_imports)]
pub use context::{DEFAULT_MAX_SHAPE_LEN, MorpherOptions, RuleContext};
#[allow(unused_imports)]
pub use dedup::WordSet;
#[allow(unused_imports)]
pub use metrics::{ParseMetrics, ParseReport, PhaseMetrics};
#[allow(unused_imports)]
pub use morpher::Morpher;
#[allow(unused_imports)]
pub use realizational::{RealizationalRule, RealizationalRuleBuilder};
#[allow(unused_imports)]
pub use rewrite::{RewriteRule, RewriteRuleBuilder};
#[allow(unused_imports)]
pub use stratum::{Language, MorphologicalRule, MorphologicalRuleOrder, Stratum};
#[allow(unused_imports)]
pub use subrule::{ApplicationMode, ChangeKind, RewriteSubrule, Subrule};
#[allow(unused_imports)]
pub use template::{AffixTemplate, Slot};
#[allow(unused_imports)]
pub use trace::{NoTrace, TraceEvent, TraceMask, TraceRecorder, TraceSink};
#[allow(unused_imports)]
pub use validate::{check_disjunction, free_fluctuates, is_word_valid, rank};
