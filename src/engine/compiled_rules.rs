//! Rule compilation and indexing.
//!
//! This module holds the *static* side of the engine: the structures derived
//! from a [`Language`] once, then shared by every parse.
//!
//! Parsing is split into two phases:
//!
//! 1. **Compile** (this module): turn the strata into one synthesis rule tree
//!    and one analysis rule tree, and index every affix by morpheme id.
//! 2. **Run** (see `morpher.rs`): analyse, look up roots, synthesise and
//!    validate.
//!
//! ## Invariants
//!
//! - Both rule trees hold the same `Arc`ed rules; nothing is copied per
//!   direction.
//! - Every affix reachable from a stratum, directly or through a template
//!   slot, is in the affix index, and every realizational rule is in the
//!   realizational index. Validation relies on this to find the constraints
//!   of an affix allomorph.

use super::affix::{AffixAllomorph, AffixProcessRule};
use super::cascade::Rule;
use super::realizational::RealizationalRule;
use super::stratum::Language;
use crate::lexicon::{AllomorphConstraints, AllomorphRef, Lexicon, MorphemeId};
use std::collections::HashMap;
use std::sync::Arc;

/// Pre-compiled rule trees with an affix index.
#[derive(Debug, Clone)]
pub struct CompiledRules {
    pub synthesis: Rule,
    pub analysis: Rule,
    pub affixes: HashMap<MorphemeId, Arc<AffixProcessRule>>,
    pub realizational: HashMap<MorphemeId, Arc<RealizationalRule>>,
}

impl CompiledRules {
    pub fn new(language: &Language) -> Self {
        let mut affixes = HashMap::new();
        let mut realizational = HashMap::new();
        for stratum in language.strata() {
            for rule in stratum.affixes() {
                affixes.entry(rule.id().clone()).or_insert_with(|| rule.clone());
            }
            for rule in stratum.realizational_rules() {
                realizational.entry(rule.id().clone()).or_insert_with(|| rule.clone());
            }
        }
        tracing::debug!(
            language = language.name(),
            strata = language.strata().len(),
            affixes = affixes.len(),
            realizational = realizational.len(),
            "compiled rules"
        );
        CompiledRules { synthesis: language.synthesis_rule(), analysis: language.analysis_rule(), affixes, realizational }
    }

    pub fn affix(&self, id: &MorphemeId) -> Option<&Arc<AffixProcessRule>> {
        self.affixes.get(id)
    }

    pub fn realizational(&self, id: &MorphemeId) -> Option<&Arc<RealizationalRule>> {
        self.realizational.get(id)
    }

    /// Allomorphs of an affix or realizational rule.
    pub fn affix_allomorphs(&self, id: &MorphemeId) -> Option<&[AffixAllomorph]> {
        match self.affixes.get(id) {
            Some(rule) => Some(rule.allomorphs()),
            None => self.realizational.get(id).map(|r| r.allomorphs()),
        }
    }

    /// Gloss of an affix or realizational rule; `None` when it has none.
    pub fn gloss(&self, id: &MorphemeId) -> Option<&str> {
        let gloss = match self.affixes.get(id) {
            Some(rule) => rule.gloss(),
            None => self.realizational.get(id)?.gloss(),
        };
        (!gloss.is_empty()).then_some(gloss)
    }
}

/// Constraint lookup for any allomorph, root or affix.
#[derive(Debug, Clone, Copy)]
pub struct AllomorphCatalog<'a> {
    pub lexicon: &'a Lexicon,
    pub rules: &'a CompiledRules,
}

impl<'a> AllomorphCatalog<'a> {
    pub fn new(lexicon: &'a Lexicon, rules: &'a CompiledRules) -> Self {
        AllomorphCatalog { lexicon, rules }
    }

    pub fn constraints(&self, allomorph: &AllomorphRef) -> Option<&'a AllomorphConstraints> {
        if let Some(entry) = self.lexicon.get(&allomorph.morpheme) {
            return entry.allomorphs.get(allomorph.index).map(|a| &a.constraints);
        }
        self.rules.affix_allomorphs(&allomorph.morpheme)?.get(allomorph.index).map(|a| &a.constraints)
    }

    /// Number of allomorphs the morpheme has.
    pub fn allomorph_count(&self, morpheme: &MorphemeId) -> usize {
        match self.lexicon.get(morpheme) {
            Some(entry) => entry.allomorphs.len(),
            None => self.rules.affix_allomorphs(morpheme).map_or(0, <[AffixAllomorph]>::len),
        }
    }
}
