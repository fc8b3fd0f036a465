//! Affix templates: ordered slots of mutually exclusive affixes.

use super::affix::AffixProcessRule;
use super::context::RuleContext;
use super::dedup::WordSet;
use crate::Mode;
use crate::error::Result;
use crate::feature::FeatureStruct;
use crate::word::Word;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct Slot {
    pub name: String,
    pub rules: Vec<Arc<AffixProcessRule>>,
    pub optional: bool,
}

impl Slot {
    pub fn new(name: &str, rules: Vec<Arc<AffixProcessRule>>) -> Self {
        Slot { name: name.to_string(), rules, optional: false }
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }
}

/// Slots are filled innermost first in synthesis and peeled outermost first
/// in analysis. At most one affix fills each slot.
#[derive(Debug, Clone)]
pub struct AffixTemplate {
    name: Arc<str>,
    required_syntactic_fs: FeatureStruct,
    slots: Vec<Slot>,
}

impl AffixTemplate {
    pub fn new(name: &str, slots: Vec<Slot>) -> Self {
        AffixTemplate { name: Arc::from(name), required_syntactic_fs: FeatureStruct::new(), slots }
    }

    pub fn requires(mut self, fs: FeatureStruct) -> Self {
        self.required_syntactic_fs = fs;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn is_applicable(&self, word: &Word) -> bool {
        self.required_syntactic_fs.is_unifiable(word.syntactic_fs())
    }

    pub fn apply(&self, word: &Word, ctx: &RuleContext<'_>) -> Result<Vec<Word>> {
        if !self.is_applicable(word) {
            ctx.trace.rule_not_applied(Mode::Synthesis, &self.name, word);
            return Ok(Vec::new());
        }
        let mut current = vec![(word.fork(), false)];
        for slot in &self.slots {
            let mut next = Vec::new();
            for (input, changed) in current {
                let mut filled = false;
                for rule in &slot.rules {
                    let outputs = rule.apply(&input, ctx)?;
                    filled |= !outputs.is_empty();
                    next.extend(outputs.into_iter().map(|w| (w, true)));
                }
                if !filled && slot.optional {
                    next.push((input, changed));
                }
            }
            if next.is_empty() {
                tracing::trace!(template = %self.name, slot = %slot.name, "required slot left empty");
                ctx.trace.rule_not_applied(Mode::Synthesis, &self.name, word);
                return Ok(Vec::new());
            }
            current = next;
        }
        Ok(self.finish(Mode::Synthesis, word, current, ctx))
    }

    pub fn unapply(&self, word: &Word, ctx: &RuleContext<'_>) -> Result<Vec<Word>> {
        let mut current = vec![(word.fork(), false)];
        for slot in self.slots.iter().rev() {
            let mut next = Vec::new();
            for (input, changed) in current {
                for rule in &slot.rules {
                    next.extend(rule.unapply(&input, ctx)?.into_iter().map(|w| (w, true)));
                }
                if slot.optional {
                    next.push((input, changed));
                }
            }
            current = next;
        }
        let mut outputs = self.finish(Mode::Analysis, word, current, ctx);
        outputs.retain(|w| self.required_syntactic_fs.is_unifiable(w.syntactic_fs()));
        Ok(outputs)
    }

    fn finish(&self, mode: Mode, input: &Word, candidates: Vec<(Word, bool)>, ctx: &RuleContext<'_>) -> Vec<Word> {
        let outputs: WordSet = candidates.into_iter().filter(|(_, changed)| *changed).map(|(w, _)| w).collect();
        if outputs.is_empty() {
            ctx.trace.rule_not_applied(mode, &self.name, input);
        }
        outputs.into_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::affix::AffixAllomorph;
    use crate::engine::context::MorpherOptions;
    use crate::feature::FeatureSystem;
    use crate::shape::{Shape, ShapeNode};

    fn system() -> Arc<FeatureSystem> {
        FeatureSystem::builder().binary("cons").binary("voice").binary("round").build().unwrap()
    }

    fn suffix(sys: &FeatureSystem, id: &str, seg: &str) -> Arc<AffixProcessRule> {
        let node = ShapeNode::segment(sys.parse(seg).unwrap());
        Arc::new(AffixProcessRule::builder(id).allomorph(AffixAllomorph::suffix(vec![node])).build().unwrap())
    }

    fn template(sys: &FeatureSystem) -> AffixTemplate {
        AffixTemplate::new(
            "verb",
            vec![
                Slot::new("tense", vec![suffix(sys, "PST", "+cons +voice"), suffix(sys, "FUT", "+cons -voice")]),
                Slot::new("agreement", vec![suffix(sys, "1SG", "-cons +round")]).optional(),
            ],
        )
    }

    fn stem(sys: &FeatureSystem) -> Word {
        Word::new(Shape::from_nodes([ShapeNode::segment(sys.parse("-cons -round").unwrap())]), 0)
    }

    #[test]
    fn required_slots_must_be_filled() {
        let sys = system();
        let options = MorpherOptions::default();
        let ctx = RuleContext::untraced(&options);
        assert!(template(&sys).apply(&stem(&sys), &ctx).unwrap().is_empty());

        let mut word = stem(&sys);
        word.push_pending(crate::lexicon::MorphemeId::new("PST"));
        let outputs = template(&sys).apply(&word, &ctx).unwrap();
        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs[0].shape().len(), 2);
    }

    #[test]
    fn analysis_peels_outer_slots_first() {
        let sys = system();
        let options = MorpherOptions::default();
        let ctx = RuleContext::untraced(&options);
        let surface = Word::new(
            Shape::from_nodes(["-cons -round", "+cons +voice", "-cons +round"].map(|s| ShapeNode::segment(sys.parse(s).unwrap()))),
            0,
        );
        let outputs = template(&sys).unapply(&surface, &ctx).unwrap();
        // Without 1SG peeled first, PST has no voiced final consonant to strip.
        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs[0].shape().len(), 1);
        assert_eq!(outputs[0].pending().len(), 2);
    }
}
