//! Compounding rules.
//!
//! A compounding rule joins the word (the head) with a second root (the
//! non-head). Each subrule splits both members into parts and lists the
//! compound's outputs over them; parts are numbered head first:
//!
//! ```text
//! head:      [ stem ]          p0
//! non-head:  [ stem ]          p1
//! rhs:       Copy(0) Copy(1)   head + non-head
//! ```
//!
//! Analysis splits the surface back into both members, queues the rule on
//! the pending stack and pushes the unbound non-head, which lexical lookup
//! binds to a root of the rule's stratum. Synthesis uses the first subrule
//! whose parts match both members and marks what came from the non-head as
//! the non-head root's morph.

use super::affix::{
    MorphOutput, build_output, check_outputs, outputs_pattern, part_name, parts_pattern, stem, unrealize,
};
use super::context::RuleContext;
use crate::Mode;
use crate::error::{MorphError, Result};
use crate::feature::FeatureStruct;
use crate::lexicon::MorphemeId;
use crate::pattern::{Pattern, PatternNode};
use crate::shape::ShapeNode;
use crate::word::{RuleEvent, Word};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct CompoundingSubrule {
    pub head: Vec<Vec<PatternNode>>,
    pub non_head: Vec<Vec<PatternNode>>,
    /// `Copy(i)` with `i >= head.len()` copies non-head part `i - head.len()`.
    pub rhs: Vec<MorphOutput>,
}

impl CompoundingSubrule {
    pub fn new(head: Vec<Vec<PatternNode>>, non_head: Vec<Vec<PatternNode>>, rhs: Vec<MorphOutput>) -> Self {
        CompoundingSubrule { head, non_head, rhs }
    }

    /// Whole head, then `joint`, then the whole non-head.
    pub fn head_first(joint: Vec<ShapeNode>) -> Self {
        Self::new(vec![stem()], vec![stem()], vec![MorphOutput::Copy(0), MorphOutput::Insert(joint), MorphOutput::Copy(1)])
    }

    /// Whole non-head, then `joint`, then the whole head.
    pub fn head_last(joint: Vec<ShapeNode>) -> Self {
        Self::new(vec![stem()], vec![stem()], vec![MorphOutput::Copy(1), MorphOutput::Insert(joint), MorphOutput::Copy(0)])
    }

    fn parts(&self) -> Vec<Vec<PatternNode>> {
        self.head.iter().chain(&self.non_head).cloned().collect()
    }
}

#[derive(Debug, Clone)]
struct CompiledSubrule {
    head: Pattern,
    non_head: Pattern,
    analysis: Pattern,
    parts: Vec<Vec<PatternNode>>,
    sources: Vec<Option<usize>>,
}

impl CompiledSubrule {
    fn new(subrule: &CompoundingSubrule) -> Self {
        let parts = subrule.parts();
        let (analysis, sources) = outputs_pattern(&parts, &subrule.rhs);
        CompiledSubrule {
            head: parts_pattern(&subrule.head, 0),
            non_head: parts_pattern(&subrule.non_head, subrule.head.len()),
            analysis,
            parts,
            sources,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompoundingRule {
    id: MorphemeId,
    name: Arc<str>,
    subrules: Vec<CompoundingSubrule>,
    compiled: Vec<CompiledSubrule>,
    head_required_fs: FeatureStruct,
    non_head_required_fs: FeatureStruct,
    out_syntactic_fs: FeatureStruct,
    max_applications: usize,
}

pub struct CompoundingRuleBuilder {
    id: String,
    subrules: Vec<CompoundingSubrule>,
    head_required_fs: FeatureStruct,
    non_head_required_fs: FeatureStruct,
    out_syntactic_fs: FeatureStruct,
    max_applications: usize,
}

impl CompoundingRuleBuilder {
    pub fn head_requires(mut self, fs: FeatureStruct) -> Self {
        self.head_required_fs = fs;
        self
    }

    pub fn non_head_requires(mut self, fs: FeatureStruct) -> Self {
        self.non_head_required_fs = fs;
        self
    }

    pub fn produces(mut self, fs: FeatureStruct) -> Self {
        self.out_syntactic_fs = fs;
        self
    }

    pub fn max_applications(mut self, n: usize) -> Self {
        self.max_applications = n;
        self
    }

    /// Subrules are tried in the order they are added.
    pub fn subrule(mut self, subrule: CompoundingSubrule) -> Self {
        self.subrules.push(subrule);
        self
    }

    pub fn build(self) -> Result<CompoundingRule> {
        if self.subrules.is_empty() {
            return Err(MorphError::InvalidRule { rule: self.id, reason: "no subrules".to_string() });
        }
        for (index, subrule) in self.subrules.iter().enumerate() {
            check_outputs(&self.id, index, subrule.head.len() + subrule.non_head.len(), &subrule.rhs)?;
        }
        Ok(CompoundingRule {
            name: Arc::from(self.id.as_str()),
            id: MorphemeId::new(&self.id),
            compiled: self.subrules.iter().map(CompiledSubrule::new).collect(),
            subrules: self.subrules,
            head_required_fs: self.head_required_fs,
            non_head_required_fs: self.non_head_required_fs,
            out_syntactic_fs: self.out_syntactic_fs,
            max_applications: self.max_applications,
        })
    }
}

impl CompoundingRule {
    pub fn builder(id: &str) -> CompoundingRuleBuilder {
        CompoundingRuleBuilder {
            id: id.to_string(),
            subrules: Vec::new(),
            head_required_fs: FeatureStruct::new(),
            non_head_required_fs: FeatureStruct::new(),
            out_syntactic_fs: FeatureStruct::new(),
            max_applications: 1,
        }
    }

    pub fn id(&self) -> &MorphemeId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn subrules(&self) -> &[CompoundingSubrule] {
        &self.subrules
    }

    pub fn is_applicable(&self, word: &Word) -> bool {
        word.next_pending() == Some(&self.id)
            && word.applied_count(&self.id) < self.max_applications
            && self.head_required_fs.is_unifiable(word.syntactic_fs())
            && word
                .next_non_head()
                .is_some_and(|member| member.root().is_some() && self.non_head_required_fs.is_unifiable(member.syntactic_fs()))
    }

    /// Synthesis: join the word with its next bound non-head.
    pub fn apply(&self, word: &Word, ctx: &RuleContext<'_>) -> Result<Vec<Word>> {
        let member = match word.next_non_head() {
            Some(non_head) if self.is_applicable(word) => non_head,
            _ => {
                ctx.trace.rule_not_applied(Mode::Synthesis, &self.name, word);
                return Ok(Vec::new());
            }
        };
        let Some(root) = member.root().cloned() else { return Ok(Vec::new()) };

        for (subrule, compiled) in self.subrules.iter().zip(&self.compiled) {
            let Some(head_match) = compiled.head.match_at(word.shape(), compiled.head.scan_start(word.shape())) else { continue };
            let Some(member_match) = compiled.non_head.match_at(member.shape(), compiled.non_head.scan_start(member.shape()))
            else {
                continue;
            };
            let h = subrule.head.len();
            let part = |i: usize| {
                if i < h {
                    Some((word.shape(), head_match.group(&part_name(i))?))
                } else {
                    Some((member.shape(), member_match.group(&part_name(i))?))
                }
            };
            let mut built = build_output(&subrule.rhs, part, ctx.options.max_shape_len)?;
            let copied = built.copied(&subrule.rhs, |i| i < h);
            built.carry_morphs(word.shape(), &copied);
            let from_member = |o: &MorphOutput| matches!(o, MorphOutput::Copy(i) | MorphOutput::Modify(i, _) if *i >= h);
            if let Some((start, end)) = built.span(&subrule.rhs, from_member) {
                built.shape.add_morph(start, end, root.clone());
            }

            let mut out = word.fork();
            out.set_shape(built.shape);
            out.pop_pending();
            out.pop_non_head();
            out.record_compound(self.id.clone(), root);
            out.set_syntactic_fs(word.syntactic_fs().priority_union(&self.out_syntactic_fs));
            out.record(RuleEvent::Applied(self.name.clone()));
            ctx.trace.rule_applied(&self.name, word, &out);
            tracing::debug!(rule = %self.name, "compounding applied");
            return Ok(vec![out]);
        }
        ctx.trace.rule_not_applied(Mode::Synthesis, &self.name, word);
        Ok(Vec::new())
    }

    /// Analysis: split off the non-head, to be looked up in `stratum`.
    pub fn unapply(&self, word: &Word, stratum: usize, ctx: &RuleContext<'_>) -> Result<Vec<Word>> {
        let sfs = match word.syntactic_fs().unify(&self.out_syntactic_fs, &mut Default::default()) {
            Some(sfs) if word.pending_count(&self.id) < self.max_applications => sfs.priority_union(&self.head_required_fs),
            _ => {
                ctx.trace.rule_not_applied(Mode::Analysis, &self.name, word);
                return Ok(Vec::new());
            }
        };

        let limit = ctx.options.max_shape_len;
        let mut outputs = Vec::new();
        for (subrule, compiled) in self.subrules.iter().zip(&self.compiled) {
            let shape = word.shape();
            let h = subrule.head.len();
            let total = compiled.parts.len();
            for m in compiled.analysis.match_all_at(shape, compiled.analysis.scan_start(shape)) {
                let Some(head) = unrealize(shape, &m, &compiled.parts, &subrule.rhs, &compiled.sources, 0..h, limit)? else {
                    continue;
                };
                let Some(rest) = unrealize(shape, &m, &compiled.parts, &subrule.rhs, &compiled.sources, h..total, limit)? else {
                    continue;
                };
                let mut member = Word::new(rest, stratum);
                member.set_syntactic_fs(self.non_head_required_fs.clone());

                let mut out = word.fork();
                out.set_shape(head);
                out.push_pending(self.id.clone());
                out.push_non_head(member);
                out.set_syntactic_fs(sfs.clone());
                out.record(RuleEvent::Unapplied(self.name.clone()));
                ctx.trace.rule_unapplied(&self.name, word, &out);
                outputs.push(out);
            }
        }
        if outputs.is_empty() {
            ctx.trace.rule_not_applied(Mode::Analysis, &self.name, word);
        } else {
            tracing::debug!(rule = %self.name, outputs = outputs.len(), "compounding unapplied");
        }
        Ok(outputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::context::MorpherOptions;
    use crate::feature::FeatureSystem;
    use crate::lexicon::AllomorphRef;
    use crate::shape::Shape;

    struct Fixture {
        sys: Arc<FeatureSystem>,
    }

    impl Fixture {
        fn new() -> Self {
            let sys = FeatureSystem::builder().binary("cons").binary("voice").symbolic("pos", &["n", "v"]).build().unwrap();
            Fixture { sys }
        }

        fn fs(&self, notation: &str) -> FeatureStruct {
            self.sys.parse(notation).unwrap()
        }

        fn shape(&self, segs: &[&str]) -> Shape {
            Shape::from_nodes(segs.iter().map(|s| ShapeNode::segment(self.fs(s))))
        }

        /// A word bound to root `id` over `segs`, its whole shape marked.
        fn root(&self, id: &str, segs: &[&str]) -> Word {
            let mut shape = self.shape(segs);
            let reference = AllomorphRef { morpheme: MorphemeId::new(id), index: 0 };
            shape.add_morph(shape.first(), shape.last(), reference.clone());
            let mut word = Word::new(shape, 0);
            word.set_root(reference);
            word
        }
    }

    #[test]
    fn subrules_must_copy_existing_parts() {
        let err = CompoundingRule::builder("BAD")
            .subrule(CompoundingSubrule::new(vec![stem()], vec![stem()], vec![MorphOutput::Copy(2)]))
            .build()
            .unwrap_err();
        assert!(matches!(err, MorphError::InvalidRule { .. }));
        assert!(CompoundingRule::builder("EMPTY").build().is_err());
    }

    #[test]
    fn synthesis_joins_the_head_with_its_non_head() {
        let fx = Fixture::new();
        let rule = CompoundingRule::builder("NN").produces(fx.fs("pos=n")).subrule(CompoundingSubrule::head_first(vec![])).build().unwrap();
        let options = MorpherOptions::default();
        let ctx = RuleContext::untraced(&options);

        let mut head = fx.root("house", &["+cons", "-cons"]);
        head.push_pending(rule.id().clone());
        head.push_non_head(fx.root("boat", &["+cons +voice", "-cons", "+cons -voice"]));

        let out = rule.apply(&head, &ctx).unwrap();
        assert_eq!(out.len(), 1);
        let compound = &out[0];
        assert_eq!(compound.shape().len(), 5);
        assert!(compound.pending().is_empty());
        assert!(compound.non_heads().is_empty());
        assert_eq!(compound.morphemes(), vec![MorphemeId::new("house"), MorphemeId::new("boat")]);
        assert_eq!(compound.syntactic_fs(), &fx.fs("pos=n"));

        let morphs = compound.shape().morphs_in_order();
        assert_eq!(morphs.len(), 2);
        assert_eq!(morphs[1].allomorph.morpheme, MorphemeId::new("boat"));
        assert_eq!(morphs[1].end, compound.shape().last());
    }

    #[test]
    fn unbound_or_mismatched_non_heads_block_synthesis() {
        let fx = Fixture::new();
        let rule = CompoundingRule::builder("NV")
            .non_head_requires(fx.fs("pos=v"))
            .subrule(CompoundingSubrule::head_first(vec![]))
            .build()
            .unwrap();
        let options = MorpherOptions::default();
        let ctx = RuleContext::untraced(&options);

        let mut head = fx.root("house", &["+cons", "-cons"]);
        head.push_pending(rule.id().clone());
        let mut unbound = head.fork();
        unbound.push_non_head(Word::new(fx.shape(&["-cons"]), 0));
        assert!(rule.apply(&unbound, &ctx).unwrap().is_empty());

        let mut noun = fx.root("boat", &["-cons"]);
        noun.set_syntactic_fs(fx.fs("pos=n"));
        let mut mismatched = head.fork();
        mismatched.push_non_head(noun);
        assert!(!rule.is_applicable(&mismatched));
        assert!(rule.apply(&mismatched, &ctx).unwrap().is_empty());
    }

    #[test]
    fn analysis_splits_every_way_the_surface_allows() {
        let fx = Fixture::new();
        let rule = CompoundingRule::builder("NN")
            .non_head_requires(fx.fs("pos=n"))
            .subrule(CompoundingSubrule::head_last(vec![]))
            .build()
            .unwrap();
        let options = MorpherOptions::default();
        let surface = Word::new(fx.shape(&["+cons", "-cons", "+cons"]), 1);

        let out = rule.unapply(&surface, 0, &RuleContext::untraced(&options)).unwrap();
        // Non-head | head at either internal boundary.
        assert_eq!(out.len(), 2);
        for word in &out {
            let member = word.next_non_head().unwrap();
            assert_eq!(word.shape().len() + member.shape().len(), 3);
            assert_eq!(member.stratum(), 0);
            assert_eq!(member.syntactic_fs(), &fx.fs("pos=n"));
            assert!(member.root().is_none());
            assert_eq!(word.pending(), &[rule.id().clone()]);
        }
        assert!(out.iter().any(|w| w.shape().len() == 1 && w.shape().node(w.shape().first()).fs == fx.fs("+cons")));
    }
}
