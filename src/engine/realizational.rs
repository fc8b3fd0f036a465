//! Realizational (inflectional) affixes.
//!
//! A realizational rule is not queued on the pending stack. It fires whenever
//! the word still has to realize the rule's features:
//!
//! ```text
//! word.realizational_fs  ⊒ rule.realizational_fs     the word asks for them
//! word.syntactic_fs      ∌ every feature of the rule  nothing realized them yet
//! ```
//!
//! The second test is blocking: a root listed with the features already in its
//! syntactic structure (an irregular plural, say) keeps the regular affix away.
//! Analysis strips the affix and records the rule's features as realizational,
//! and lexical lookup hands them to every candidate.

use super::affix::{AffixAllomorph, CompiledAllomorph, compile_allomorphs, realize, unrealize};
use super::context::RuleContext;
use crate::Mode;
use crate::error::Result;
use crate::feature::{FeatureStruct, FeatureValue};
use crate::lexicon::{AllomorphRef, MorphemeId};
use crate::word::{RuleEvent, Word};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct RealizationalRule {
    id: MorphemeId,
    name: Arc<str>,
    gloss: String,
    realizational_fs: FeatureStruct,
    required_syntactic_fs: FeatureStruct,
    allomorphs: Vec<AffixAllomorph>,
    compiled: Vec<CompiledAllomorph>,
}

pub struct RealizationalRuleBuilder {
    id: String,
    gloss: String,
    realizational_fs: FeatureStruct,
    required_syntactic_fs: FeatureStruct,
    allomorphs: Vec<AffixAllomorph>,
}

impl RealizationalRuleBuilder {
    pub fn gloss(mut self, gloss: &str) -> Self {
        self.gloss = gloss.to_string();
        self
    }

    /// Features this rule realizes.
    pub fn realizes(mut self, fs: FeatureStruct) -> Self {
        self.realizational_fs = fs;
        self
    }

    pub fn requires(mut self, fs: FeatureStruct) -> Self {
        self.required_syntactic_fs = fs;
        self
    }

    pub fn allomorph(mut self, allomorph: AffixAllomorph) -> Self {
        self.allomorphs.push(allomorph);
        self
    }

    pub fn build(self) -> Result<RealizationalRule> {
        let compiled = compile_allomorphs(&self.id, &self.allomorphs)?;
        Ok(RealizationalRule {
            name: Arc::from(self.id.as_str()),
            id: MorphemeId::new(&self.id),
            gloss: self.gloss,
            realizational_fs: self.realizational_fs,
            required_syntactic_fs: self.required_syntactic_fs,
            allomorphs: self.allomorphs,
            compiled,
        })
    }
}

/// Every feature of `realized` is already present in `syntactic`, recursing
/// into complex values.
fn is_blocked(realized: &FeatureStruct, syntactic: &FeatureStruct) -> bool {
    realized.iter().all(|(id, ours)| match (ours, syntactic.get(id)) {
        (_, None) => false,
        (FeatureValue::Complex(inner), Some(FeatureValue::Complex(theirs))) => is_blocked(inner, theirs),
        _ => true,
    })
}

impl RealizationalRule {
    pub fn builder(id: &str) -> RealizationalRuleBuilder {
        RealizationalRuleBuilder {
            id: id.to_string(),
            gloss: String::new(),
            realizational_fs: FeatureStruct::new(),
            required_syntactic_fs: FeatureStruct::new(),
            allomorphs: Vec::new(),
        }
    }

    pub fn id(&self) -> &MorphemeId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn gloss(&self) -> &str {
        &self.gloss
    }

    pub fn realizational_fs(&self) -> &FeatureStruct {
        &self.realizational_fs
    }

    pub fn allomorphs(&self) -> &[AffixAllomorph] {
        &self.allomorphs
    }

    pub fn allomorph(&self, index: usize) -> Option<&AffixAllomorph> {
        self.allomorphs.get(index)
    }

    pub fn is_applicable(&self, word: &Word) -> bool {
        word.realizational_fs().subsumed_by(&self.realizational_fs)
            && !self.is_blocked(word)
            && self.required_syntactic_fs.is_unifiable(word.syntactic_fs())
    }

    /// Rules realizing nothing are never blocked.
    fn is_blocked(&self, word: &Word) -> bool {
        !self.realizational_fs.is_empty() && is_blocked(&self.realizational_fs, word.syntactic_fs())
    }

    /// Synthesis: realize the rule's features with the first allomorph that fits.
    pub fn apply(&self, word: &Word, ctx: &RuleContext<'_>) -> Result<Vec<Word>> {
        let sfs = match word.syntactic_fs().unify(&self.required_syntactic_fs, &mut Default::default()) {
            Some(sfs) if self.is_applicable(word) => sfs.priority_union(&self.realizational_fs),
            _ => {
                ctx.trace.rule_not_applied(Mode::Synthesis, &self.name, word);
                return Ok(Vec::new());
            }
        };
        let mut outputs = Vec::new();
        for (index, (allomorph, compiled)) in self.allomorphs.iter().zip(&self.compiled).enumerate() {
            if !allomorph.required_syntactic_fs.is_unifiable(word.syntactic_fs()) {
                continue;
            }
            let Some(m) = compiled.synthesis.match_at(word.shape(), compiled.synthesis.scan_start(word.shape())) else { continue };
            let reference = AllomorphRef { morpheme: self.id.clone(), index };
            let shape = realize(word.shape(), &m, &allomorph.rhs, &reference, ctx.options.max_shape_len)?;

            let mut out = word.fork();
            out.set_shape(shape);
            out.record_morph(reference);
            out.set_syntactic_fs(sfs.clone());
            out.record(RuleEvent::Applied(self.name.clone()));
            ctx.trace.rule_applied(&self.name, word, &out);
            tracing::debug!(rule = %self.name, allomorph = index, "realizational affix applied");
            outputs.push(out);

            if allomorph.is_unconditional() {
                break;
            }
        }
        if outputs.is_empty() {
            ctx.trace.rule_not_applied(Mode::Synthesis, &self.name, word);
        }
        Ok(outputs)
    }

    /// Analysis: strip the affix and ask synthesis to realize its features.
    pub fn unapply(&self, word: &Word, ctx: &RuleContext<'_>) -> Result<Vec<Word>> {
        let rfs = word.realizational_fs().unify(&self.realizational_fs, &mut Default::default());
        let sfs = word.syntactic_fs().unify(&self.required_syntactic_fs, &mut Default::default());
        let (Some(rfs), Some(sfs)) = (rfs, sfs) else {
            ctx.trace.rule_not_applied(Mode::Analysis, &self.name, word);
            return Ok(Vec::new());
        };
        if !self.realizational_fs.is_unifiable(word.syntactic_fs()) {
            ctx.trace.rule_not_applied(Mode::Analysis, &self.name, word);
            return Ok(Vec::new());
        }

        let limit = ctx.options.max_shape_len;
        let mut outputs = Vec::new();
        for (allomorph, compiled) in self.allomorphs.iter().zip(&self.compiled) {
            let shape = word.shape();
            for m in compiled.analysis.match_all_at(shape, compiled.analysis.scan_start(shape)) {
                let parts = 0..allomorph.lhs.len();
                let Some(input) = unrealize(shape, &m, &allomorph.lhs, &allomorph.rhs, &compiled.sources, parts, limit)? else {
                    continue;
                };
                let mut out = word.fork();
                out.set_shape(input);
                out.set_realizational_fs(rfs.clone());
                out.set_syntactic_fs(sfs.clone());
                out.record(RuleEvent::Unapplied(self.name.clone()));
                ctx.trace.rule_unapplied(&self.name, word, &out);
                outputs.push(out);
            }
        }
        if outputs.is_empty() {
            ctx.trace.rule_not_applied(Mode::Analysis, &self.name, word);
        } else {
            tracing::debug!(rule = %self.name, outputs = outputs.len(), "realizational affix unapplied");
        }
        Ok(outputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::context::MorpherOptions;
    use crate::feature::FeatureSystem;
    use crate::shape::{Shape, ShapeNode};

    struct Fixture {
        sys: Arc<FeatureSystem>,
    }

    impl Fixture {
        fn new() -> Self {
            let sys = FeatureSystem::builder().binary("cons").binary("voice").symbolic("num", &["sg", "pl"]).build().unwrap();
            Fixture { sys }
        }

        fn fs(&self, notation: &str) -> FeatureStruct {
            self.sys.parse(notation).unwrap()
        }

        fn word(&self, segs: &[&str]) -> Word {
            Word::new(Shape::from_nodes(segs.iter().map(|s| ShapeNode::segment(self.fs(s)))), 0)
        }

        fn plural(&self) -> RealizationalRule {
            RealizationalRule::builder("PL")
                .gloss("plural")
                .realizes(self.fs("num=pl"))
                .allomorph(AffixAllomorph::suffix(vec![ShapeNode::segment(self.fs("+cons +voice"))]))
                .build()
                .unwrap()
        }
    }

    #[test]
    fn features_the_word_asks_for_are_realized() {
        let fx = Fixture::new();
        let rule = fx.plural();
        let options = MorpherOptions::default();
        let ctx = RuleContext::untraced(&options);

        let mut word = fx.word(&["-cons"]);
        assert!(rule.apply(&word, &ctx).unwrap().is_empty());

        word.set_realizational_fs(fx.fs("num=pl"));
        let out = rule.apply(&word, &ctx).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].shape().len(), 2);
        assert_eq!(out[0].syntactic_fs(), &fx.fs("num=pl"));
        assert_eq!(out[0].allomorphs(), &[AllomorphRef { morpheme: rule.id().clone(), index: 0 }]);
        assert!(out[0].pending().is_empty());
        // Realized features block a second application.
        assert!(rule.apply(&out[0], &ctx).unwrap().is_empty());
    }

    #[test]
    fn roots_listed_with_the_features_block_the_rule() {
        let fx = Fixture::new();
        let rule = fx.plural();
        let options = MorpherOptions::default();
        let mut irregular = fx.word(&["-cons", "+cons"]);
        irregular.set_realizational_fs(fx.fs("num=pl"));
        irregular.set_syntactic_fs(fx.fs("num=pl"));
        assert!(!rule.is_applicable(&irregular));
        assert!(rule.apply(&irregular, &RuleContext::untraced(&options)).unwrap().is_empty());
    }

    #[test]
    fn blocking_looks_into_complex_values() {
        let sys = FeatureSystem::builder().symbolic("num", &["sg", "pl"]).symbolic("pers", &["1", "3"]).complex("agr").build().unwrap();
        let realized = sys.parse("agr.num=pl agr.pers=3").unwrap();
        assert!(is_blocked(&realized, &sys.parse("agr.num=sg agr.pers=1").unwrap()));
        assert!(!is_blocked(&realized, &sys.parse("agr.num=sg").unwrap()));
        assert!(!is_blocked(&realized, &FeatureStruct::new()));
    }

    #[test]
    fn analysis_records_the_features_to_realize() {
        let fx = Fixture::new();
        let rule = fx.plural();
        let options = MorpherOptions::default();
        let ctx = RuleContext::untraced(&options);
        let surface = fx.word(&["-cons", "+cons +voice"]);

        let out = rule.unapply(&surface, &ctx).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].shape().len(), 1);
        assert_eq!(out[0].realizational_fs(), &fx.fs("num=pl"));
        assert!(out[0].pending().is_empty());
        assert!(out[0].was_unapplied("PL"));

        let mut singular = surface.fork();
        singular.set_syntactic_fs(fx.fs("num=sg"));
        assert!(rule.unapply(&singular, &ctx).unwrap().is_empty());
    }
}
