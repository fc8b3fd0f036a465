//! Affixal morphological rules.
//!
//! An allomorph rewrites a word whose shape splits into the input parts
//! (`lhs`) into the concatenation of its outputs (`rhs`):
//!
//! ```text
//! lhs:  [ stem ]                    p0 = any segment, one or more
//! rhs:  Copy(0) Insert([s])         stem + s
//! ```
//!
//! Synthesis matches the parts against the whole word and builds the output
//! shape, marking the inserted material as the allomorph's morph. Analysis
//! matches the outputs against the surface and rebuilds the parts, pushing
//! the morpheme onto the word's pending stack so synthesis applies it again.
//!
//! The part and output machinery is shared with realizational and
//! compounding rules.

use super::context::RuleContext;
use super::subrule::restore;
use crate::error::{MorphError, Result};
use crate::feature::FeatureStruct;
use crate::lexicon::{AllomorphConstraints, AllomorphRef, MorphemeId};
use crate::pattern::{AnchorSide, Constraint, GroupMatch, Match, Pattern, PatternNode};
use crate::shape::{NodeFlags, NodeId, NodeKind, NodeKinds, Shape, ShapeNode};
use crate::word::{RuleEvent, Word};
use crate::Mode;
use std::collections::HashMap;
use std::ops::Range;
use std::sync::Arc;

/// One item of an allomorph's output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MorphOutput {
    /// Copy input part `i` unchanged.
    Copy(usize),
    /// Insert new material; this is the allomorph's own morph.
    Insert(Vec<ShapeNode>),
    /// Copy input part `i`, overwriting features on every segment.
    Modify(usize, FeatureStruct),
}

#[derive(Debug, Clone)]
pub struct AffixAllomorph {
    pub lhs: Vec<Vec<PatternNode>>,
    pub rhs: Vec<MorphOutput>,
    pub constraints: AllomorphConstraints,
    pub required_syntactic_fs: FeatureStruct,
}

/// One or more segments of any content.
pub(crate) fn stem() -> Vec<PatternNode> {
    vec![PatternNode::repeat(PatternNode::segment(FeatureStruct::new()), 1, None)]
}

impl AffixAllomorph {
    pub fn new(lhs: Vec<Vec<PatternNode>>, rhs: Vec<MorphOutput>) -> Self {
        AffixAllomorph { lhs, rhs, constraints: AllomorphConstraints::default(), required_syntactic_fs: FeatureStruct::new() }
    }

    pub fn suffix(segments: Vec<ShapeNode>) -> Self {
        Self::new(vec![stem()], vec![MorphOutput::Copy(0), MorphOutput::Insert(segments)])
    }

    pub fn prefix(segments: Vec<ShapeNode>) -> Self {
        Self::new(vec![stem()], vec![MorphOutput::Insert(segments), MorphOutput::Copy(0)])
    }

    pub fn with_constraints(mut self, constraints: AllomorphConstraints) -> Self {
        self.constraints = constraints;
        self
    }

    pub fn requires(mut self, fs: FeatureStruct) -> Self {
        self.required_syntactic_fs = fs;
        self
    }

    /// Synthesis keeps trying later allomorphs only while this one could
    /// still be rejected later on.
    pub(super) fn is_unconditional(&self) -> bool {
        !self.constraints.has_environments() && self.required_syntactic_fs.is_empty()
    }
}

#[derive(Debug, Clone)]
pub(super) struct CompiledAllomorph {
    pub(super) synthesis: Pattern,
    pub(super) analysis: Pattern,
    /// For each input part, the first output that reproduces it.
    pub(super) sources: Vec<Option<usize>>,
}

impl CompiledAllomorph {
    pub(super) fn new(allomorph: &AffixAllomorph) -> Self {
        let (analysis, sources) = outputs_pattern(&allomorph.lhs, &allomorph.rhs);
        CompiledAllomorph { synthesis: parts_pattern(&allomorph.lhs, 0), analysis, sources }
    }
}

/// Compile allomorphs, rejecting outputs that copy a part `lhs` lacks.
pub(super) fn compile_allomorphs(rule: &str, allomorphs: &[AffixAllomorph]) -> Result<Vec<CompiledAllomorph>> {
    if allomorphs.is_empty() {
        return Err(MorphError::InvalidRule { rule: rule.to_string(), reason: "no allomorphs".to_string() });
    }
    let mut compiled = Vec::with_capacity(allomorphs.len());
    for (index, allomorph) in allomorphs.iter().enumerate() {
        check_outputs(rule, index, allomorph.lhs.len(), &allomorph.rhs)?;
        compiled.push(CompiledAllomorph::new(allomorph));
    }
    Ok(compiled)
}

pub(super) fn check_outputs(rule: &str, index: usize, parts: usize, rhs: &[MorphOutput]) -> Result<()> {
    for output in rhs {
        if let MorphOutput::Copy(i) | MorphOutput::Modify(i, _) = output
            && *i >= parts
        {
            return Err(MorphError::InvalidRule {
                rule: rule.to_string(),
                reason: format!("allomorph {index} copies part {i} of {parts}"),
            });
        }
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct AffixProcessRule {
    id: MorphemeId,
    name: Arc<str>,
    gloss: String,
    allomorphs: Vec<AffixAllomorph>,
    compiled: Vec<CompiledAllomorph>,
    required_syntactic_fs: FeatureStruct,
    out_syntactic_fs: FeatureStruct,
    max_applications: usize,
}

pub struct AffixProcessRuleBuilder {
    id: String,
    gloss: String,
    allomorphs: Vec<AffixAllomorph>,
    required_syntactic_fs: FeatureStruct,
    out_syntactic_fs: FeatureStruct,
    max_applications: usize,
}

impl AffixProcessRuleBuilder {
    pub fn gloss(mut self, gloss: &str) -> Self {
        self.gloss = gloss.to_string();
        self
    }

    pub fn requires(mut self, fs: FeatureStruct) -> Self {
        self.required_syntactic_fs = fs;
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

    /// Allomorphs are tried in the order they are added; earlier ones are more specific.
    pub fn allomorph(mut self, allomorph: AffixAllomorph) -> Self {
        self.allomorphs.push(allomorph);
        self
    }

    pub fn build(self) -> Result<AffixProcessRule> {
        let compiled = compile_allomorphs(&self.id, &self.allomorphs)?;
        Ok(AffixProcessRule {
            name: Arc::from(self.id.as_str()),
            id: MorphemeId::new(&self.id),
            gloss: self.gloss,
            allomorphs: self.allomorphs,
            compiled,
            required_syntactic_fs: self.required_syntactic_fs,
            out_syntactic_fs: self.out_syntactic_fs,
            max_applications: self.max_applications,
        })
    }
}

pub(super) fn part_name(i: usize) -> String {
    format!("p{i}")
}

fn output_name(k: usize) -> String {
    format!("o{k}")
}

fn anchored(children: Vec<PatternNode>) -> Vec<PatternNode> {
    let mut out = Vec::with_capacity(children.len() + 2);
    out.push(PatternNode::Anchor(AnchorSide::Left));
    out.extend(children);
    out.push(PatternNode::Anchor(AnchorSide::Right));
    out
}

/// `node` with every constraint overwritten by `fs`.
fn overwrite(node: &PatternNode, fs: &FeatureStruct) -> PatternNode {
    match node {
        PatternNode::Constraint(c) => PatternNode::Constraint(Constraint { fs: c.fs.priority_union(fs), ..c.clone() }),
        PatternNode::Group { name, children } => {
            PatternNode::Group { name: name.clone(), children: children.iter().map(|c| overwrite(c, fs)).collect() }
        }
        PatternNode::Quantifier { min, max, greedy, child } => {
            PatternNode::Quantifier { min: *min, max: *max, greedy: *greedy, child: Box::new(overwrite(child, fs)) }
        }
        PatternNode::Anchor(_) => node.clone(),
    }
}

/// The whole shape split into `lhs`, part `i` captured as `p{offset + i}`.
pub(super) fn parts_pattern(lhs: &[Vec<PatternNode>], offset: usize) -> Pattern {
    let parts = lhs.iter().enumerate().map(|(i, part)| PatternNode::group(&part_name(offset + i), part.clone())).collect();
    Pattern::new(anchored(parts)).filter(NodeKinds::SEGMENT)
}

/// The whole surface split into the outputs of `rhs`, output `k` captured as
/// `o{k}`, plus the first output reproducing each part.
pub(super) fn outputs_pattern(lhs: &[Vec<PatternNode>], rhs: &[MorphOutput]) -> (Pattern, Vec<Option<usize>>) {
    let mut sources = vec![None; lhs.len()];
    let outputs = rhs
        .iter()
        .enumerate()
        .map(|(k, output)| {
            let children = match output {
                MorphOutput::Copy(i) => {
                    sources[*i].get_or_insert(k);
                    lhs[*i].clone()
                }
                MorphOutput::Modify(i, fs) => {
                    sources[*i].get_or_insert(k);
                    lhs[*i].iter().map(|n| overwrite(n, fs)).collect()
                }
                MorphOutput::Insert(nodes) => nodes
                    .iter()
                    .filter(|n| n.kind == NodeKind::Segment)
                    .map(|n| PatternNode::segment(n.fs.clone()))
                    .collect(),
            };
            PatternNode::group(&output_name(k), children)
        })
        .collect();
    let analysis = Pattern::new(anchored(outputs)).filter(NodeKinds::SEGMENT).skip_optional(true);
    (analysis, sources)
}

/// A shape built from an output list, with the nodes each output produced.
pub(super) struct Built {
    pub(super) shape: Shape,
    /// Per output: `(source node, new node)`; inserted nodes have no source.
    pub(super) produced: Vec<Vec<(Option<NodeId>, NodeId)>>,
}

impl Built {
    /// Old-to-new map over the outputs that copy a part `keep` accepts.
    pub(super) fn copied(&self, rhs: &[MorphOutput], keep: impl Fn(usize) -> bool) -> HashMap<NodeId, NodeId> {
        let mut copied = HashMap::new();
        for (output, nodes) in rhs.iter().zip(&self.produced) {
            if let MorphOutput::Copy(i) | MorphOutput::Modify(i, _) = output
                && keep(*i)
            {
                for (old, new) in nodes {
                    if let Some(old) = old {
                        copied.entry(*old).or_insert(*new);
                    }
                }
            }
        }
        copied
    }

    /// First and last node produced by the outputs `keep` accepts.
    pub(super) fn span(&self, rhs: &[MorphOutput], keep: impl Fn(&MorphOutput) -> bool) -> Option<(NodeId, NodeId)> {
        let mut nodes = rhs.iter().zip(&self.produced).filter(|(o, _)| keep(o)).flat_map(|(_, n)| n.iter().map(|(_, new)| *new));
        let first = nodes.next()?;
        Some((first, nodes.last().unwrap_or(first)))
    }

    /// Carry the morphs of `input` whose ends were both copied.
    pub(super) fn carry_morphs(&mut self, input: &Shape, copied: &HashMap<NodeId, NodeId>) {
        for span in input.morphs() {
            if let (Some(start), Some(end)) = (copied.get(&span.start), copied.get(&span.end)) {
                self.shape.add_morph(*start, *end, span.allomorph.clone());
            }
        }
    }
}

/// Build the output shape of `rhs`. `part(i)` is the shape part `i` was
/// matched in and its capture; parts it has no capture for copy nothing.
pub(super) fn build_output<'a>(
    rhs: &[MorphOutput],
    part: impl Fn(usize) -> Option<(&'a Shape, &'a GroupMatch)>,
    limit: usize,
) -> Result<Built> {
    let mut shape = Shape::new();
    let mut produced = Vec::with_capacity(rhs.len());
    for output in rhs {
        let mut nodes = Vec::new();
        match output {
            MorphOutput::Copy(i) | MorphOutput::Modify(i, _) => {
                if let Some((input, group)) = part(*i)
                    && let (Some(first), Some(last)) = (group.first(), group.last())
                {
                    for old in input.span(first, last) {
                        let mut node = input.node(old).clone();
                        node.flags = NodeFlags::empty();
                        if let (MorphOutput::Modify(_, fs), NodeKind::Segment) = (output, node.kind) {
                            node.fs = node.fs.priority_union(fs);
                        }
                        let new = shape.try_insert_after(shape.last(), node, limit)?;
                        nodes.push((Some(old), new));
                    }
                }
            }
            MorphOutput::Insert(inserted) => {
                for node in inserted {
                    let new = shape.try_insert_after(shape.last(), node.clone(), limit)?;
                    nodes.push((None, new));
                }
            }
        }
        produced.push(nodes);
    }
    Ok(Built { shape, produced })
}

/// Synthesis output of one affix allomorph: copied morphs are kept and the
/// inserted material becomes `reference`'s morph.
pub(super) fn realize(
    input: &Shape,
    m: &Match,
    rhs: &[MorphOutput],
    reference: &AllomorphRef,
    limit: usize,
) -> Result<Shape> {
    let mut built = build_output(rhs, |i| Some((input, m.group(&part_name(i))?)), limit)?;
    let copied = built.copied(rhs, |_| true);
    built.carry_morphs(input, &copied);
    if let Some((start, end)) = built.span(rhs, |o| matches!(o, MorphOutput::Insert(_))) {
        built.shape.add_morph(start, end, reference.clone());
    }
    Ok(built.shape)
}

/// Rebuild input parts `parts` from an analysis match. Parts no output
/// reproduces come back as optional segments when they are plain segment
/// sequences; otherwise the match is unusable. `None` also when nothing
/// was rebuilt.
pub(super) fn unrealize(
    surface: &Shape,
    m: &Match,
    lhs: &[Vec<PatternNode>],
    rhs: &[MorphOutput],
    sources: &[Option<usize>],
    parts: Range<usize>,
    limit: usize,
) -> Result<Option<Shape>> {
    let mut shape = Shape::new();
    for i in parts {
        match sources[i] {
            Some(k) => {
                let Some(group) = m.group(&output_name(k)) else { return Ok(None) };
                let (Some(first), Some(last)) = (group.first(), group.last()) else { continue };
                let modified = match &rhs[k] {
                    MorphOutput::Modify(_, fs) => Some(fs),
                    _ => None,
                };
                for old in surface.span(first, last) {
                    let mut node = surface.node(old).clone();
                    if let Some(fs) = modified {
                        node.fs = restore(&node.fs, fs, &FeatureStruct::new());
                    }
                    shape.try_insert_after(shape.last(), node, limit)?;
                }
            }
            None => {
                let mut segments = Vec::new();
                for node in &lhs[i] {
                    match node {
                        PatternNode::Constraint(c) if c.kind == NodeKind::Segment => {
                            segments.push(ShapeNode::segment(c.fs.strip_variables()).optional());
                        }
                        _ => return Ok(None),
                    }
                }
                for node in segments {
                    shape.try_insert_after(shape.last(), node, limit)?;
                }
            }
        }
    }
    Ok((!shape.is_empty()).then_some(shape))
}

impl AffixProcessRule {
    pub fn builder(id: &str) -> AffixProcessRuleBuilder {
        AffixProcessRuleBuilder {
            id: id.to_string(),
            gloss: String::new(),
            allomorphs: Vec::new(),
            required_syntactic_fs: FeatureStruct::new(),
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

    pub fn gloss(&self) -> &str {
        &self.gloss
    }

    pub fn allomorphs(&self) -> &[AffixAllomorph] {
        &self.allomorphs
    }

    pub fn allomorph(&self, index: usize) -> Option<&AffixAllomorph> {
        self.allomorphs.get(index)
    }

    pub fn is_applicable(&self, word: &Word) -> bool {
        word.next_pending() == Some(&self.id)
            && word.applied_count(&self.id) < self.max_applications
            && self.required_syntactic_fs.is_unifiable(word.syntactic_fs())
    }

    /// Synthesis: realize the next pending morpheme if it is this one.
    pub fn apply(&self, word: &Word, ctx: &RuleContext<'_>) -> Result<Vec<Word>> {
        if !self.is_applicable(word) {
            ctx.trace.rule_not_applied(Mode::Synthesis, &self.name, word);
            return Ok(Vec::new());
        }
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
            out.pop_pending();
            out.record_morph(reference);
            out.set_syntactic_fs(word.syntactic_fs().priority_union(&self.out_syntactic_fs));
            out.record(RuleEvent::Applied(self.name.clone()));
            ctx.trace.rule_applied(&self.name, word, &out);
            tracing::debug!(rule = %self.name, allomorph = index, "affix applied");
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

    /// Analysis: strip this affix wherever the surface allows it.
    pub fn unapply(&self, word: &Word, ctx: &RuleContext<'_>) -> Result<Vec<Word>> {
        if word.pending_count(&self.id) >= self.max_applications || !self.out_syntactic_fs.is_unifiable(word.syntactic_fs()) {
            ctx.trace.rule_not_applied(Mode::Analysis, &self.name, word);
            return Ok(Vec::new());
        }
        let Some(sfs) = word.syntactic_fs().unify(&self.out_syntactic_fs, &mut Default::default()) else {
            return Ok(Vec::new());
        };
        let sfs = sfs.priority_union(&self.required_syntactic_fs);

        let mut outputs = Vec::new();
        for (allomorph, compiled) in self.allomorphs.iter().zip(&self.compiled) {
            let shape = word.shape();
            for m in compiled.analysis.match_all_at(shape, compiled.analysis.scan_start(shape)) {
                let parts = 0..allomorph.lhs.len();
                let limit = ctx.options.max_shape_len;
                let Some(input) = unrealize(shape, &m, &allomorph.lhs, &allomorph.rhs, &compiled.sources, parts, limit)? else {
                    continue;
                };
                let mut out = word.fork();
                out.set_shape(input);
                out.push_pending(self.id.clone());
                out.set_syntactic_fs(sfs.clone());
                out.record(RuleEvent::Unapplied(self.name.clone()));
                ctx.trace.rule_unapplied(&self.name, word, &out);
                outputs.push(out);
            }
        }
        if outputs.is_empty() {
            ctx.trace.rule_not_applied(Mode::Analysis, &self.name, word);
        } else {
            tracing::debug!(rule = %self.name, outputs = outputs.len(), "affix unapplied");
        }
        Ok(outputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::context::MorpherOptions;
    use crate::feature::FeatureSystem;
    use crate::lexicon::Environment;

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

        fn seg(&self, notation: &str) -> ShapeNode {
            ShapeNode::segment(self.fs(notation))
        }

        fn word(&self, segs: &[&str]) -> Word {
            Word::new(Shape::from_nodes(segs.iter().map(|s| self.seg(s))), 0)
        }

        fn plural(&self) -> AffixProcessRule {
            let voiceless = Environment::new(vec![PatternNode::segment(self.fs("-voice"))], vec![]);
            AffixProcessRule::builder("PL")
                .gloss("plural")
                .produces(self.fs("num=pl"))
                .allomorph(
                    AffixAllomorph::suffix(vec![self.seg("+cons -voice")])
                        .with_constraints(AllomorphConstraints::default().require_env(voiceless)),
                )
                .allomorph(AffixAllomorph::suffix(vec![self.seg("+cons +voice")]))
                .build()
                .unwrap()
        }
    }

    #[test]
    fn copies_of_missing_parts_are_rejected() {
        let err = AffixProcessRule::builder("BAD")
            .allomorph(AffixAllomorph::new(vec![stem()], vec![MorphOutput::Copy(1)]))
            .build()
            .unwrap_err();
        assert!(matches!(err, MorphError::InvalidRule { .. }));
    }

    #[test]
    fn synthesis_requires_the_morpheme_to_be_pending() {
        let fx = Fixture::new();
        let rule = fx.plural();
        let options = MorpherOptions::default();
        let ctx = RuleContext::untraced(&options);
        let word = fx.word(&["+cons -voice", "-cons +voice"]);
        assert!(rule.apply(&word, &ctx).unwrap().is_empty());

        let mut pending = word.fork();
        pending.push_pending(rule.id().clone());
        let outputs = rule.apply(&pending, &ctx).unwrap();
        // The first allomorph is environment-conditioned, so the second is tried too.
        assert_eq!(outputs.len(), 2);
        for (index, out) in outputs.iter().enumerate() {
            assert_eq!(out.shape().len(), 3);
            assert!(out.pending().is_empty());
            assert_eq!(out.allomorphs(), &[AllomorphRef { morpheme: rule.id().clone(), index }]);
            assert_eq!(out.syntactic_fs(), &fx.fs("num=pl"));
            let span = &out.shape().morphs()[0];
            assert_eq!(span.start, out.shape().last());
            assert_eq!(span.end, out.shape().last());
        }
    }

    #[test]
    fn unconditional_allomorphs_stop_the_search() {
        let fx = Fixture::new();
        let rule = AffixProcessRule::builder("PL")
            .allomorph(AffixAllomorph::suffix(vec![fx.seg("+cons -voice")]))
            .allomorph(AffixAllomorph::suffix(vec![fx.seg("+cons +voice")]))
            .build()
            .unwrap();
        let options = MorpherOptions::default();
        let mut word = fx.word(&["-cons"]);
        word.push_pending(rule.id().clone());
        assert_eq!(rule.apply(&word, &RuleContext::untraced(&options)).unwrap().len(), 1);
    }

    #[test]
    fn analysis_strips_the_suffix_and_queues_the_morpheme() {
        let fx = Fixture::new();
        let rule = fx.plural();
        let options = MorpherOptions::default();
        let word = fx.word(&["+cons -voice", "-cons +voice", "+cons +voice"]);
        let outputs = rule.unapply(&word, &RuleContext::untraced(&options)).unwrap();
        assert_eq!(outputs.len(), 1);
        let stem = &outputs[0];
        assert_eq!(stem.shape().len(), 2);
        assert_eq!(stem.pending(), &[rule.id().clone()]);
        assert!(stem.was_unapplied("PL"));

        // A singular cannot hide a plural suffix.
        let mut singular = word.fork();
        singular.set_syntactic_fs(fx.fs("num=sg"));
        assert!(rule.unapply(&singular, &RuleContext::untraced(&options)).unwrap().is_empty());
    }

    #[test]
    fn modified_parts_are_restored_in_analysis() {
        let fx = Fixture::new();
        // Final devoicing as a morphological process: stem → stem[-voice].
        let rule = AffixProcessRule::builder("DEVOICE")
            .allomorph(AffixAllomorph::new(vec![stem()], vec![MorphOutput::Modify(0, fx.fs("-voice"))]))
            .build()
            .unwrap();
        let options = MorpherOptions::default();
        let ctx = RuleContext::untraced(&options);
        let mut word = fx.word(&["+cons +voice"]);
        word.push_pending(rule.id().clone());
        let out = rule.apply(&word, &ctx).unwrap().remove(0);
        assert_eq!(out.shape().node(out.shape().first()).fs, fx.fs("+cons -voice"));

        let back = rule.unapply(&fx.word(&["+cons -voice"]), &ctx).unwrap().remove(0);
        assert_eq!(back.shape().node(back.shape().first()).fs, fx.fs("+cons"));
    }
}
