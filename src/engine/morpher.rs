//! Parse orchestration.
//!
//! [`Morpher`] ties the compiled rule trees to the lexicon and the character
//! table and runs a parse end to end:
//!
//! ```text
//! surface ── string_to_shape ──▶ analysis rule tree (strata, surface first)
//!                                   │  every underlying hypothesis
//!                                   v
//!                        search_root_allomorphs
//!                                   │  hypotheses bound to a root allomorph,
//!                                   │  compound members bound too
//!                                   v
//!                        synthesis rule tree (strata, deepest first)
//!                                   │
//!                                   v
//!             is_word_valid + surface match ─▶ disjunction ─▶ rank
//! ```
//!
//! Analysis overgenerates on purpose; only words that synthesize back to the
//! input survive.
//!
//! ## Debugging
//!
//! Set `PHONOMORPH_DEBUG_RULES=1` (with the CLI) to see per-rule events, or
//! use [`Morpher::parse_word_traced`] to collect them programmatically.

use super::cascade::{Outcome, Rule};
use super::compiled_rules::{AllomorphCatalog, CompiledRules};
use super::context::{MorpherOptions, RuleContext};
use super::dedup::WordSet;
use super::metrics::{ParseMetrics, ParseReport, PhaseMetrics};
use super::stratum::Language;
use super::trace::{NoTrace, TraceEvent, TraceRecorder, TraceSink};
use super::validate::{check_disjunction, is_word_valid, rank};
use crate::Mode;
use crate::error::Result;
use crate::feature::FeatureStruct;
use crate::lexicon::{AllomorphHit, AllomorphSearch, MorphemeId};
use crate::symbols::SymbolTable;
use crate::word::Word;
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug)]
pub struct Morpher {
    language: Arc<Language>,
    rules: CompiledRules,
    options: MorpherOptions,
}

impl Morpher {
    pub fn new(language: Arc<Language>, options: MorpherOptions) -> Self {
        let rules = CompiledRules::new(&language);
        Morpher { language, rules, options }
    }

    pub fn language(&self) -> &Language {
        &self.language
    }

    pub fn rules(&self) -> &CompiledRules {
        &self.rules
    }

    pub fn options(&self) -> &MorpherOptions {
        &self.options
    }

    fn catalog(&self) -> AllomorphCatalog<'_> {
        AllomorphCatalog::new(self.language.lexicon(), &self.rules)
    }

    /// Surface form of `word`.
    pub fn render(&self, word: &Word) -> String {
        self.language.table().shape_to_string(word.shape(), false, true)
    }

    /// Every valid decomposition of `surface`, most specific first.
    pub fn parse_word(&self, surface: &str) -> Result<Vec<Word>> {
        Ok(self.parse_word_detailed(surface, &NoTrace)?.results)
    }

    /// [`parse_word`](Self::parse_word), recording the events selected by
    /// [`MorpherOptions::trace`].
    pub fn parse_word_traced(&self, surface: &str) -> Result<(Vec<Word>, Vec<TraceEvent>)> {
        let recorder = TraceRecorder::new(self.options.trace);
        let results = self.parse_word_detailed(surface, &recorder)?.results;
        Ok((results, recorder.into_events()))
    }

    /// Full parse keeping every intermediate hypothesis set and phase timings.
    pub fn parse_word_detailed(&self, surface: &str, trace: &dyn TraceSink) -> Result<ParseReport> {
        let started = Instant::now();
        let ctx = RuleContext::new(&self.options, trace);
        let table = self.language.table();
        let mut metrics = ParseMetrics::default();

        let phase = Instant::now();
        let input = Word::new(table.string_to_shape(surface)?, self.language.surface_stratum());
        let analyses = run_tree(&self.rules.analysis, Mode::Analysis, &input, &ctx)?;
        metrics.analysis = PhaseMetrics { duration: phase.elapsed(), produced: analyses.len() };

        let phase = Instant::now();
        let mut candidates = WordSet::new();
        for analysis in &analyses {
            let hits = self.language.lexicon().search_root_allomorphs(analysis.stratum(), analysis.shape());
            let found: Vec<MorphemeId> = hits.iter().map(|h| h.entry.id.clone()).collect();
            ctx.trace.lexical_lookup(analysis, &found);
            if hits.is_empty() {
                continue;
            }
            let members = self.bind_non_heads(analysis, &ctx);
            for hit in hits {
                let Some(mut head) = bind_root(hit, analysis.pending(), analysis.syntactic_fs()) else { continue };
                head.set_realizational_fs(analysis.realizational_fs().clone());
                for non_heads in &members {
                    let mut candidate = head.fork();
                    candidate.set_non_heads(non_heads.clone());
                    candidates.insert(candidate);
                }
            }
        }
        let candidates = candidates.into_vec();
        metrics.lookup = PhaseMetrics { duration: phase.elapsed(), produced: candidates.len() };

        let phase = Instant::now();
        let mut synthesized = WordSet::new();
        for candidate in &candidates {
            synthesized.extend(run_tree(&self.rules.synthesis, Mode::Synthesis, candidate, &ctx)?);
        }
        let synthesized = synthesized.into_vec();
        metrics.synthesis = PhaseMetrics { duration: phase.elapsed(), produced: synthesized.len() };

        let phase = Instant::now();
        let catalog = self.catalog();
        let valid: Vec<Word> = synthesized
            .iter()
            .filter(|word| match is_word_valid(word, &catalog) {
                Err(reason) => {
                    ctx.trace.blocked(word, &reason);
                    false
                }
                Ok(()) if !table.is_match(surface, word.shape()) => {
                    ctx.trace.blocked(word, "surface form does not match the input");
                    false
                }
                Ok(()) => true,
            })
            .cloned()
            .collect();
        let mut results = check_disjunction(valid, &catalog);
        rank(&mut results, morpheme_string);
        if let Some(max) = self.options.max_results {
            results.truncate(max);
        }
        for word in &results {
            ctx.trace.successful_parse(word);
        }
        metrics.validation = PhaseMetrics { duration: phase.elapsed(), produced: results.len() };
        metrics.total = started.elapsed();

        tracing::info!(
            surface,
            analyses = analyses.len(),
            candidates = candidates.len(),
            synthesized = synthesized.len(),
            results = results.len(),
            elapsed_us = metrics.total.as_micros() as u64,
            "parsed word"
        );
        Ok(ParseReport { analyses, candidates, synthesized, results, metrics })
    }

    /// Every way of binding the compound members of `analysis` to roots of
    /// the strata their rules belong to. Empty when some member has no root.
    fn bind_non_heads(&self, analysis: &Word, ctx: &RuleContext<'_>) -> Vec<Vec<Word>> {
        let mut bindings: Vec<Vec<Word>> = vec![Vec::new()];
        for member in analysis.non_heads() {
            let hits = self.language.lexicon().search_root_allomorphs(member.stratum(), member.shape());
            let found: Vec<MorphemeId> = hits.iter().map(|h| h.entry.id.clone()).collect();
            ctx.trace.lexical_lookup(member, &found);
            let roots: Vec<Word> = hits.into_iter().filter_map(|hit| bind_root(hit, &[], member.syntactic_fs())).collect();
            bindings = bindings
                .iter()
                .flat_map(|bound| {
                    roots.iter().map(move |root| {
                        let mut next = bound.clone();
                        next.push(root.clone());
                        next
                    })
                })
                .collect();
        }
        bindings
    }

    /// Surface forms of root `root` followed by `affixes`, innermost first.
    pub fn generate_words(&self, root: &MorphemeId, affixes: &[MorphemeId]) -> Result<Vec<String>> {
        self.generate_words_realizing(root, affixes, &FeatureStruct::new())
    }

    /// [`generate_words`](Self::generate_words) for a word that must also
    /// realize `realizational` through realizational rules.
    pub fn generate_words_realizing(
        &self,
        root: &MorphemeId,
        affixes: &[MorphemeId],
        realizational: &FeatureStruct,
    ) -> Result<Vec<String>> {
        let Some(entry) = self.language.lexicon().get(root) else {
            return Ok(Vec::new());
        };
        let ctx = RuleContext::untraced(&self.options);
        let pending: Vec<MorphemeId> = affixes.iter().rev().cloned().collect();

        let mut synthesized = WordSet::new();
        for index in 0..entry.allomorphs.len() {
            let Some(mut candidate) = bind_root(AllomorphHit { entry, index }, &pending, &FeatureStruct::new()) else { continue };
            candidate.set_realizational_fs(realizational.clone());
            synthesized.extend(run_tree(&self.rules.synthesis, Mode::Synthesis, &candidate, &ctx)?);
        }
        let catalog = self.catalog();
        let valid = synthesized.into_vec().into_iter().filter(|w| is_word_valid(w, &catalog).is_ok()).collect();
        let mut words = check_disjunction(valid, &catalog);
        rank(&mut words, |w| self.render(w));

        let mut forms: Vec<String> = Vec::new();
        for word in &words {
            let form = self.render(word);
            if !forms.contains(&form) {
                forms.push(form);
            }
        }
        Ok(forms)
    }
}

/// A lexical candidate: the root allomorph's shape with `pending` morphemes
/// still to apply. `None` when the entry's category contradicts `fs`.
fn bind_root(hit: AllomorphHit<'_>, pending: &[MorphemeId], fs: &FeatureStruct) -> Option<Word> {
    if !hit.entry.syntactic_fs.is_unifiable(fs) {
        return None;
    }
    let mut shape = hit.allomorph().shape.clone();
    shape.clear_morphs();
    let reference = hit.reference();
    if !shape.is_empty() {
        shape.add_morph(shape.first(), shape.last(), reference.clone());
    }
    let mut word = Word::new(shape, hit.entry.stratum);
    word.set_root(reference);
    word.set_syntactic_fs(hit.entry.syntactic_fs.clone());
    word.set_pending(pending.to_vec());
    Some(word)
}

fn morpheme_string(word: &Word) -> String {
    word.morphemes().iter().map(MorphemeId::as_str).collect::<Vec<_>>().join("+")
}

/// Run a whole rule tree. The top of the tree is a fork boundary too.
fn run_tree(rule: &Rule, mode: Mode, word: &Word, ctx: &RuleContext<'_>) -> Result<Vec<Word>> {
    match rule.run(mode, word, ctx) {
        Ok(Outcome::NotApplied) => Ok(vec![word.fork()]),
        Ok(Outcome::Applied(words)) => Ok(words),
        Err(err) if err.is_branch_local() => {
            tracing::debug!(?mode, error = %err, "dropping hypothesis");
            ctx.trace.branch_error(rule.name(), word, &err);
            Ok(Vec::new())
        }
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::affix::AffixAllomorph;
    use crate::engine::compound::{CompoundingRule, CompoundingSubrule};
    use crate::engine::realizational::RealizationalRule;
    use crate::engine::stratum::Stratum;
    use crate::feature::FeatureSystem;
    use crate::lexicon::{LexEntry, Lexicon, RootAllomorph};
    use crate::symbols::CharacterDefinitionTable;

    /// Stratum `stem` compounds nouns; stratum `word` marks plurals with `-i`.
    /// `tit` is an irregular plural and `dada` is listed in `word`.
    fn morpher() -> Morpher {
        let sys = FeatureSystem::builder()
            .binary("cons")
            .binary("voice")
            .binary("high")
            .symbolic("pos", &["n", "v"])
            .symbolic("num", &["sg", "pl"])
            .build()
            .unwrap();
        let table = CharacterDefinitionTable::builder(sys.clone())
            .segment("t", "+cons -voice")
            .segment("d", "+cons +voice")
            .segment("a", "-cons -high")
            .segment("i", "-cons +high")
            .build()
            .unwrap();
        let fs = |notation: &str| sys.parse(notation).unwrap();

        let mut lexicon = Lexicon::new();
        for (id, stratum, features) in [("tat", 0, "pos=n"), ("dad", 0, "pos=n"), ("tit", 0, "pos=n num=pl"), ("dada", 1, "pos=v")] {
            lexicon.add(LexEntry {
                id: MorphemeId::new(id),
                gloss: id.to_string(),
                stratum,
                syntactic_fs: fs(features),
                allomorphs: vec![RootAllomorph::new(table.string_to_shape(id).unwrap())],
            });
        }

        let compound = CompoundingRule::builder("NN")
            .head_requires(fs("pos=n"))
            .non_head_requires(fs("pos=n"))
            .subrule(CompoundingSubrule::head_first(vec![]))
            .build()
            .unwrap();
        let plural = RealizationalRule::builder("PL")
            .realizes(fs("num=pl"))
            .requires(fs("pos=n"))
            .allomorph(AffixAllomorph::suffix(table.string_to_shape("i").unwrap().nodes().cloned().collect()))
            .build()
            .unwrap();
        let language = Language::new("test", sys.clone(), table, lexicon)
            .stratum(Stratum::new("stem").compound(compound))
            .stratum(Stratum::new("word").realizational(plural));
        Morpher::new(Arc::new(language), MorpherOptions::default())
    }

    fn parses(morpher: &Morpher, surface: &str) -> Vec<String> {
        morpher.parse_word(surface).unwrap().iter().map(morpheme_string).collect()
    }

    #[test]
    fn roots_of_the_surface_stratum_are_looked_up() {
        assert_eq!(parses(&morpher(), "dada"), ["dada"]);
    }

    #[test]
    fn compounds_bind_their_non_head_at_lookup() {
        let morpher = morpher();
        assert_eq!(parses(&morpher, "tatdad"), ["tat+dad"]);
        // `dada` is listed in `word`, too late to head a `stem` compound.
        assert!(parses(&morpher, "dadatat").is_empty());
        assert!(parses(&morpher, "tatdat").is_empty());
    }

    #[test]
    fn realizational_features_reach_synthesis() {
        let morpher = morpher();
        assert_eq!(parses(&morpher, "tati"), ["tat+PL"]);
        let plural = morpher.language().system().parse("num=pl").unwrap();
        assert_eq!(morpher.generate_words_realizing(&MorphemeId::new("tat"), &[], &plural).unwrap(), ["tati"]);
        assert_eq!(morpher.generate_words(&MorphemeId::new("tat"), &[]).unwrap(), ["tat"]);
    }

    #[test]
    fn irregular_roots_block_the_regular_affix() {
        let morpher = morpher();
        let plural = morpher.language().system().parse("num=pl").unwrap();
        assert_eq!(morpher.generate_words_realizing(&MorphemeId::new("tit"), &[], &plural).unwrap(), ["tit"]);
        assert!(parses(&morpher, "titi").is_empty());
        assert_eq!(parses(&morpher, "tit"), ["tit"]);
    }
}
