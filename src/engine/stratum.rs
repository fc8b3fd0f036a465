//! Strata and languages.
//!
//! A stratum owns its phonological rules, morphological rules and affix
//! templates. Morphological rules are affixes, realizational affixes and
//! compounding rules, kept in one declared order. Compiling a stratum builds
//! one cascade per direction:
//!
//! ```text
//! synthesis   mrules ──▶ templates ──▶ prules
//! analysis    prules (reversed) ──▶ templates ──▶ mrules
//! ```
//!
//! A language is an ordered list of strata, deepest first.

use super::affix::AffixProcessRule;
use super::cascade::{CascadeOrder, Rule, RuleCascade};
use super::compound::CompoundingRule;
use super::realizational::RealizationalRule;
use super::rewrite::RewriteRule;
use super::template::AffixTemplate;
use crate::feature::FeatureSystem;
use crate::lexicon::Lexicon;
use crate::symbols::CharacterDefinitionTable;
use std::sync::Arc;

/// How a stratum's morphological rules relate to each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MorphologicalRuleOrder {
    /// Rules apply in declared order, innermost first.
    #[default]
    Linear,
    /// Any order.
    Unordered,
}

/// One entry of a stratum's morphological rule list.
#[derive(Debug, Clone)]
pub enum MorphologicalRule {
    Affix(Arc<AffixProcessRule>),
    Realizational(Arc<RealizationalRule>),
    Compound(Arc<CompoundingRule>),
}

impl MorphologicalRule {
    pub fn name(&self) -> &str {
        match self {
            MorphologicalRule::Affix(r) => r.name(),
            MorphologicalRule::Realizational(r) => r.name(),
            MorphologicalRule::Compound(r) => r.name(),
        }
    }

    fn to_rule(&self, stratum: usize) -> Rule {
        match self {
            MorphologicalRule::Affix(r) => Rule::Affix(r.clone()),
            MorphologicalRule::Realizational(r) => Rule::Realizational(r.clone()),
            MorphologicalRule::Compound(r) => Rule::Compound { stratum, rule: r.clone() },
        }
    }
}

#[derive(Debug, Clone)]
pub struct Stratum {
    name: Arc<str>,
    prules: Vec<Arc<RewriteRule>>,
    mrules: Vec<MorphologicalRule>,
    templates: Vec<Arc<AffixTemplate>>,
    mrule_order: MorphologicalRuleOrder,
}

impl Stratum {
    pub fn new(name: &str) -> Self {
        Stratum {
            name: Arc::from(name),
            prules: Vec::new(),
            mrules: Vec::new(),
            templates: Vec::new(),
            mrule_order: MorphologicalRuleOrder::Linear,
        }
    }

    pub fn prule(mut self, rule: RewriteRule) -> Self {
        self.prules.push(Arc::new(rule));
        self
    }

    pub fn mrule(mut self, rule: AffixProcessRule) -> Self {
        self.mrules.push(MorphologicalRule::Affix(Arc::new(rule)));
        self
    }

    pub fn realizational(mut self, rule: RealizationalRule) -> Self {
        self.mrules.push(MorphologicalRule::Realizational(Arc::new(rule)));
        self
    }

    pub fn compound(mut self, rule: CompoundingRule) -> Self {
        self.mrules.push(MorphologicalRule::Compound(Arc::new(rule)));
        self
    }

    pub fn template(mut self, template: AffixTemplate) -> Self {
        self.templates.push(Arc::new(template));
        self
    }

    pub fn unordered(mut self) -> Self {
        self.mrule_order = MorphologicalRuleOrder::Unordered;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn prules(&self) -> &[Arc<RewriteRule>] {
        &self.prules
    }

    pub fn mrules(&self) -> &[MorphologicalRule] {
        &self.mrules
    }

    pub fn templates(&self) -> &[Arc<AffixTemplate>] {
        &self.templates
    }

    pub fn mrule_order(&self) -> MorphologicalRuleOrder {
        self.mrule_order
    }

    /// Every affix the stratum can apply, directly or through a template slot.
    pub fn affixes(&self) -> impl Iterator<Item = &Arc<AffixProcessRule>> {
        let direct = self.mrules.iter().filter_map(|r| match r {
            MorphologicalRule::Affix(rule) => Some(rule),
            _ => None,
        });
        let slotted = self.templates.iter().flat_map(|t| t.slots().iter().flat_map(|s| s.rules.iter()));
        direct.chain(slotted)
    }

    pub fn realizational_rules(&self) -> impl Iterator<Item = &Arc<RealizationalRule>> {
        self.mrules.iter().filter_map(|r| match r {
            MorphologicalRule::Realizational(rule) => Some(rule),
            _ => None,
        })
    }

    pub(crate) fn synthesis_rule(&self, index: usize) -> Rule {
        let mrules = self.mrules.iter().map(|r| r.to_rule(index)).collect();
        let mrules = match self.mrule_order {
            MorphologicalRuleOrder::Linear => RuleCascade::new(CascadeOrder::Pipeline, mrules),
            MorphologicalRuleOrder::Unordered => RuleCascade::new(CascadeOrder::Permutation, mrules).keep_input(),
        };
        let templates = RuleCascade::new(CascadeOrder::Linear, self.templates.iter().cloned().map(Rule::Template).collect());
        let prules = RuleCascade::new(CascadeOrder::Pipeline, self.prules.iter().cloned().map(Rule::Rewrite).collect());
        let body = RuleCascade::new(
            CascadeOrder::Pipeline,
            vec![Rule::Cascade(mrules), Rule::Cascade(templates), Rule::Cascade(prules)],
        );
        Rule::Stratum { index, name: self.name.clone(), body: Box::new(body) }
    }

    pub(crate) fn analysis_rule(&self, index: usize) -> Rule {
        let prules = RuleCascade::new(CascadeOrder::Pipeline, self.prules.iter().rev().cloned().map(Rule::Rewrite).collect());
        let templates =
            RuleCascade::new(CascadeOrder::Combination, self.templates.iter().cloned().map(Rule::Template).collect()).keep_input();
        let mrules = match self.mrule_order {
            MorphologicalRuleOrder::Linear => {
                RuleCascade::new(CascadeOrder::Combination, self.mrules.iter().rev().map(|r| r.to_rule(index)).collect())
            }
            MorphologicalRuleOrder::Unordered => {
                RuleCascade::new(CascadeOrder::Permutation, self.mrules.iter().map(|r| r.to_rule(index)).collect())
            }
        }
        .keep_input();
        let body = RuleCascade::new(
            CascadeOrder::Pipeline,
            vec![Rule::Cascade(prules), Rule::Cascade(templates), Rule::Cascade(mrules)],
        );
        Rule::Stratum { index, name: self.name.clone(), body: Box::new(body) }
    }
}

/// Everything needed to parse and generate words of one language.
#[derive(Debug)]
pub struct Language {
    name: String,
    system: Arc<FeatureSystem>,
    table: CharacterDefinitionTable,
    strata: Vec<Stratum>,
    lexicon: Lexicon,
}

impl Language {
    pub fn new(name: &str, system: Arc<FeatureSystem>, table: CharacterDefinitionTable, lexicon: Lexicon) -> Self {
        Language { name: name.to_string(), system, table, strata: Vec::new(), lexicon }
    }

    /// Strata are added deepest first.
    pub fn stratum(mut self, stratum: Stratum) -> Self {
        self.strata.push(stratum);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn system(&self) -> &Arc<FeatureSystem> {
        &self.system
    }

    pub fn table(&self) -> &CharacterDefinitionTable {
        &self.table
    }

    pub fn strata(&self) -> &[Stratum] {
        &self.strata
    }

    pub fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    /// Index of the stratum surface words start analysis in.
    pub fn surface_stratum(&self) -> usize {
        self.strata.len().saturating_sub(1)
    }

    pub(crate) fn synthesis_rule(&self) -> Rule {
        let strata = self.strata.iter().enumerate().map(|(i, s)| s.synthesis_rule(i)).collect();
        Rule::Cascade(RuleCascade::new(CascadeOrder::Pipeline, strata))
    }

    /// Surface stratum first; the words reached after each stratum are all kept.
    pub(crate) fn analysis_rule(&self) -> Rule {
        let strata = self.strata.iter().enumerate().rev().map(|(i, s)| s.analysis_rule(i)).collect();
        Rule::Cascade(RuleCascade::new(CascadeOrder::Pipeline, strata).keep_input())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Mode;
    use crate::engine::affix::AffixAllomorph;
    use crate::engine::cascade::Outcome;
    use crate::engine::context::{MorpherOptions, RuleContext};
    use crate::engine::subrule::RewriteSubrule;
    use crate::shape::{Shape, ShapeNode};
    use crate::word::Word;

    fn system() -> Arc<FeatureSystem> {
        FeatureSystem::builder().binary("cons").binary("voice").build().unwrap()
    }

    fn stratum(sys: &FeatureSystem) -> Stratum {
        let devoicing = RewriteRule::builder("devoicing", vec![sys.parse("+cons").unwrap()])
            .subrule(RewriteSubrule::new(vec![sys.parse("-voice").unwrap()]).right(vec![crate::pattern::PatternNode::Anchor(
                crate::pattern::AnchorSide::Right,
            )]))
            .build()
            .unwrap();
        let plural = AffixProcessRule::builder("PL")
            .allomorph(AffixAllomorph::suffix(vec![ShapeNode::segment(sys.parse("+cons +voice").unwrap())]))
            .build()
            .unwrap();
        Stratum::new("word").prule(devoicing).mrule(plural)
    }

    #[test]
    fn synthesis_applies_morphology_before_phonology() {
        let sys = system();
        let rule = stratum(&sys).synthesis_rule(0);
        let options = MorpherOptions::default();
        let mut word = Word::new(Shape::from_nodes([ShapeNode::segment(sys.parse("-cons").unwrap())]), 0);
        word.push_pending(crate::lexicon::MorphemeId::new("PL"));
        let Outcome::Applied(out) = rule.run(Mode::Synthesis, &word, &RuleContext::untraced(&options)).unwrap() else {
            panic!("stratum did not run");
        };
        assert_eq!(out.len(), 1);
        let shape = out[0].shape();
        assert_eq!(shape.node(shape.last()).fs, sys.parse("+cons -voice").unwrap());
        assert!(out[0].was_applied("devoicing"));
    }

    #[test]
    fn analysis_keeps_every_depth_of_morphology() {
        let sys = system();
        let rule = stratum(&sys).analysis_rule(0);
        let options = MorpherOptions::default();
        let surface = Word::new(
            Shape::from_nodes(["-cons", "+cons -voice"].map(|s| ShapeNode::segment(sys.parse(s).unwrap()))),
            0,
        );
        let Outcome::Applied(out) = rule.run(Mode::Analysis, &surface, &RuleContext::untraced(&options)).unwrap() else {
            panic!("stratum did not run");
        };
        // Devoicing unapplied, then with or without PL peeled.
        assert_eq!(out.len(), 2);
        assert!(out.iter().any(|w| w.shape().len() == 1 && w.pending().len() == 1));
        assert!(out.iter().any(|w| w.shape().len() == 2 && w.pending().is_empty()));
    }

    #[test]
    fn affixes_include_template_slots() {
        let sys = system();
        let slot_rule = AffixProcessRule::builder("1SG")
            .allomorph(AffixAllomorph::suffix(vec![ShapeNode::segment(sys.parse("-cons").unwrap())]))
            .build()
            .unwrap();
        let template = AffixTemplate::new("agreement", vec![crate::engine::template::Slot::new("person", vec![Arc::new(slot_rule)])]);
        let stratum = stratum(&sys).template(template);
        let ids: Vec<&str> = stratum.affixes().map(|r| r.id().as_str()).collect();
        assert_eq!(ids, vec!["PL", "1SG"]);
    }
}
