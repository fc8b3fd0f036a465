//! One `lhs → rhs / left _ right` line of a rewrite rule.
//!
//! A subrule is compiled twice. The synthesis pattern finds the input side
//! and rewrites it; the analysis pattern finds the output side and undoes the
//! rewrite as far as the surface allows:
//!
//! ```text
//!               synthesis                      analysis
//! change        target ← target ⊕ rhs          target ← lhs values on rhs features
//! epenthesis    insert rhs at the gap          mark rhs nodes optional
//! deletion      remove lhs (keep rhs part)     reinsert lhs as optional, bounded
//! widen         head ⊕ rhs₀, insert rhs₁..     restore head, rhs₁.. optional, bounded
//! ```
//!
//! Both directions share one sweep: search from the scan start, accept the
//! first admissible site at or after the resume point, change it, resume past
//! it. Changed nodes are flagged `SEARCHED` so target constraints cannot pick
//! them up again; the owning rule clears the flag when it is done.

use super::context::RuleContext;
use crate::error::{MorphError, Result};
use crate::feature::{FeatureStruct, FeatureValue, VariableBindings};
use crate::pattern::{Constraint, GroupMatch, Match, Pattern, PatternNode};
use crate::shape::{NodeFlags, NodeId, NodeKind, NodeKinds, Shape, ShapeNode};
use crate::{Direction, Mode};
use std::collections::HashSet;
use std::sync::Arc;

const LEFT_ENV: &str = "leftEnv";
const TARGET: &str = "target";
const RIGHT_ENV: &str = "rightEnv";

/// Structural class of a subrule, from the sizes of its two sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    FeatureChange,
    Epenthesis,
    Deletion,
    Widen,
}

impl ChangeKind {
    pub fn classify(lhs: usize, rhs: usize) -> Option<ChangeKind> {
        match (lhs, rhs) {
            (0, 0) => None,
            (l, r) if l == r => Some(ChangeKind::FeatureChange),
            (0, _) => Some(ChangeKind::Epenthesis),
            (l, r) if l > r => Some(ChangeKind::Deletion),
            (1, _) => Some(ChangeKind::Widen),
            _ => None,
        }
    }
}

/// How a rule treats multiple sites in one word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ApplicationMode {
    /// Find every site on the input, then change them all.
    #[default]
    Simultaneous,
    /// Change each site as it is found; later sites see earlier changes.
    Iterative,
}

/// Declarative form of a subrule, as written in a grammar.
#[derive(Debug, Clone, Default)]
pub struct RewriteSubrule {
    pub rhs: Vec<FeatureStruct>,
    pub left: Vec<PatternNode>,
    pub right: Vec<PatternNode>,
    pub required_syntactic_fs: FeatureStruct,
}

impl RewriteSubrule {
    pub fn new(rhs: Vec<FeatureStruct>) -> Self {
        RewriteSubrule { rhs, ..Default::default() }
    }

    pub fn left(mut self, env: Vec<PatternNode>) -> Self {
        self.left = env;
        self
    }

    pub fn right(mut self, env: Vec<PatternNode>) -> Self {
        self.right = env;
        self
    }

    pub fn requires(mut self, fs: FeatureStruct) -> Self {
        self.required_syntactic_fs = fs;
        self
    }
}

/// A compiled subrule.
#[derive(Debug, Clone)]
pub struct Subrule {
    rule: Arc<str>,
    lhs: Vec<FeatureStruct>,
    rhs: Vec<FeatureStruct>,
    required_syntactic_fs: FeatureStruct,
    kind: ChangeKind,
    self_opaquing: bool,
    synthesis: Pattern,
    analysis: Pattern,
}

/// Part of a shape claimed by a simultaneous site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Claim {
    Node(NodeId),
    Gap(NodeId),
}

impl Subrule {
    pub(crate) fn compile(
        rule: Arc<str>,
        lhs: &[FeatureStruct],
        def: RewriteSubrule,
        mode: ApplicationMode,
        direction: Direction,
    ) -> Result<Subrule> {
        let kind = ChangeKind::classify(lhs.len(), def.rhs.len()).ok_or_else(|| MorphError::InvalidRule {
            rule: rule.to_string(),
            reason: format!("cannot rewrite {} segments as {}", lhs.len(), def.rhs.len()),
        })?;

        let env: Vec<&Constraint> =
            def.left.iter().chain(&def.right).flat_map(PatternNode::constraints).filter(|c| c.kind == NodeKind::Segment).collect();
        let outputs: Vec<FeatureStruct> = match kind {
            ChangeKind::FeatureChange => lhs.iter().zip(&def.rhs).map(|(l, r)| l.priority_union(r)).collect(),
            _ => def.rhs.clone(),
        };
        let feeds_env = outputs.iter().any(|out| env.iter().any(|c| c.fs.is_unifiable(out)));
        let self_opaquing = match kind {
            ChangeKind::FeatureChange => feeds_env,
            ChangeKind::Epenthesis => mode == ApplicationMode::Simultaneous && feeds_env,
            ChangeKind::Deletion | ChangeKind::Widen => true,
        };

        let synthesis = synthesis_pattern(lhs, &def, direction);
        let analysis = analysis_pattern(kind, lhs, &def, direction);
        tracing::trace!(rule = %rule, ?kind, self_opaquing, "compiled subrule");

        Ok(Subrule {
            rule,
            lhs: lhs.to_vec(),
            rhs: def.rhs,
            required_syntactic_fs: def.required_syntactic_fs,
            kind,
            self_opaquing,
            synthesis,
            analysis,
        })
    }

    pub fn kind(&self) -> ChangeKind {
        self.kind
    }

    pub fn is_self_opaquing(&self) -> bool {
        self.self_opaquing
    }

    pub fn required_syntactic_fs(&self) -> &FeatureStruct {
        &self.required_syntactic_fs
    }

    pub fn pattern(&self, mode: Mode) -> &Pattern {
        match mode {
            Mode::Synthesis => &self.synthesis,
            Mode::Analysis => &self.analysis,
        }
    }

    /// Run the subrule over `shape`; returns whether any site was changed.
    pub(crate) fn run(&self, shape: &mut Shape, mode: Mode, application: ApplicationMode, ctx: &RuleContext<'_>) -> Result<bool> {
        let bounded = ctx.reapplication_passes();
        match mode {
            Mode::Synthesis => match (application, self.kind) {
                (ApplicationMode::Iterative, _) => Ok(self.sweep(shape, mode, ctx)? > 0),
                (ApplicationMode::Simultaneous, ChangeKind::Deletion) => repeat(bounded, || self.simultaneous_pass(shape, ctx)),
                (ApplicationMode::Simultaneous, _) if self.self_opaquing => {
                    repeat(usize::MAX, || self.simultaneous_pass(shape, ctx))
                }
                (ApplicationMode::Simultaneous, _) => Ok(self.simultaneous_pass(shape, ctx)? > 0),
            },
            Mode::Analysis => match self.kind {
                ChangeKind::Deletion | ChangeKind::Widen => repeat(bounded, || self.sweep(shape, mode, ctx)),
                _ if application == ApplicationMode::Simultaneous && self.self_opaquing => {
                    repeat(usize::MAX, || self.sweep(shape, mode, ctx))
                }
                _ => Ok(self.sweep(shape, mode, ctx)? > 0),
            },
        }
    }

    // --- Sweeps --------------------------------------------------------------

    /// Change sites one at a time in scan order; returns the number changed.
    fn sweep(&self, shape: &mut Shape, mode: Mode, ctx: &RuleContext<'_>) -> Result<usize> {
        let pattern = self.pattern(mode);
        let dir = pattern.direction;
        let mut resume = pattern.scan_start(shape);
        let mut changed = 0;
        loop {
            let found = {
                let view: &Shape = shape;
                pattern.find_from(view, pattern.scan_start(view), &mut |m| admissible(view, m, dir, resume))
            };
            let Some(m) = found else { break };
            let Some(target) = m.group(TARGET) else { break };
            let edge = far_edge(target, dir);
            let next = shape.step(edge, dir).unwrap_or_else(|| shape.end_anchor(dir));
            match mode {
                Mode::Synthesis => self.synthesize_site(shape, &m, ctx)?,
                Mode::Analysis => self.analyze_site(shape, &m, ctx)?,
            }
            resume = next;
            changed += 1;
        }
        Ok(changed)
    }

    /// Collect every non-overlapping site on the unchanged shape, then change
    /// them all.
    fn simultaneous_pass(&self, shape: &mut Shape, ctx: &RuleContext<'_>) -> Result<usize> {
        let sites = self.collect_sites(shape);
        for m in &sites {
            self.synthesize_site(shape, m, ctx)?;
        }
        Ok(sites.len())
    }

    fn collect_sites(&self, shape: &Shape) -> Vec<Match> {
        let pattern = &self.synthesis;
        let dir = pattern.direction;
        let mut claimed: HashSet<Claim> = HashSet::new();
        let mut sites = Vec::new();
        for start in pattern.candidates(shape, pattern.scan_start(shape)) {
            let found = pattern.match_at_where(shape, start, VariableBindings::new(), &mut |m| {
                m.group(TARGET).is_some_and(|t| {
                    let free = claims(shape, t, dir).iter().all(|c| !claimed.contains(c));
                    free && (!t.is_empty() || !shape.node(t.entry).is_searched())
                })
            });
            if let Some(m) = found {
                if let Some(target) = m.group(TARGET) {
                    claimed.extend(claims(shape, target, dir));
                }
                sites.push(m);
            }
        }
        sites
    }

    // --- Synthesis -----------------------------------------------------------

    fn synthesize_site(&self, shape: &mut Shape, m: &Match, ctx: &RuleContext<'_>) -> Result<()> {
        let Some(target) = m.group(TARGET) else { return Ok(()) };
        let limit = ctx.options.max_shape_len;
        match self.kind {
            ChangeKind::FeatureChange => {
                for (id, rhs) in target.nodes.iter().zip(&self.rhs) {
                    let fs = self.instantiate(&shape.node(*id).fs.priority_union(rhs), &m.bindings)?;
                    let node = shape.node_mut(*id);
                    node.fs = fs;
                    node.flags.insert(NodeFlags::SEARCHED);
                }
            }
            ChangeKind::Epenthesis => {
                let mut after = insertion_point(shape, m, target, m.direction);
                for rhs in &self.rhs {
                    let fs = self.instantiate(rhs, &m.bindings)?;
                    after = shape.try_insert_after(after, searched(ShapeNode::segment(fs)), limit)?;
                }
            }
            ChangeKind::Deletion => {
                let Some(mut after) = target.last() else { return Ok(()) };
                let kept = target
                    .nodes
                    .iter()
                    .zip(&self.rhs)
                    .map(|(id, rhs)| self.instantiate(&shape.node(*id).fs.priority_union(rhs), &m.bindings))
                    .collect::<Result<Vec<_>>>()?;
                for fs in kept {
                    after = shape.try_insert_after(after, searched(ShapeNode::segment(fs)), limit)?;
                }
                for id in &target.nodes {
                    shape.remove(*id);
                }
            }
            ChangeKind::Widen => {
                let Some(head) = target.first() else { return Ok(()) };
                let Some((first, rest)) = self.rhs.split_first() else { return Ok(()) };
                let fs = self.instantiate(&shape.node(head).fs.priority_union(first), &m.bindings)?;
                let node = shape.node_mut(head);
                node.fs = fs;
                node.flags.insert(NodeFlags::SEARCHED);
                let mut after = head;
                for rhs in rest {
                    let fs = self.instantiate(rhs, &m.bindings)?;
                    after = shape.try_insert_after(after, searched(ShapeNode::segment(fs)), limit)?;
                }
            }
        }
        tracing::trace!(rule = %self.rule, kind = ?self.kind, "synthesized site");
        Ok(())
    }

    fn instantiate(&self, fs: &FeatureStruct, bindings: &VariableBindings) -> Result<FeatureStruct> {
        let fs = fs.replace_variables(bindings);
        if fs.has_variables() {
            return Err(MorphError::UninstantiatedFeature { rule: self.rule.to_string() });
        }
        Ok(fs)
    }

    // --- Analysis ------------------------------------------------------------

    fn analyze_site(&self, shape: &mut Shape, m: &Match, ctx: &RuleContext<'_>) -> Result<()> {
        let Some(target) = m.group(TARGET) else { return Ok(()) };
        match self.kind {
            ChangeKind::FeatureChange => {
                for (i, id) in target.nodes.iter().enumerate() {
                    let fs = self.underlying_fs(&shape.node(*id).fs, i, &m.bindings);
                    let node = shape.node_mut(*id);
                    node.fs = fs;
                    node.flags.insert(NodeFlags::SEARCHED);
                }
            }
            ChangeKind::Epenthesis => {
                for id in &target.nodes {
                    shape.node_mut(*id).flags.insert(NodeFlags::OPTIONAL | NodeFlags::SEARCHED);
                }
            }
            ChangeKind::Deletion => {
                let mut after = match target.last() {
                    Some(last) => last,
                    None => insertion_point(shape, m, target, m.direction),
                };
                for lhs in &self.lhs {
                    let fs = lhs.replace_variables(&m.bindings).strip_variables();
                    after = shape.try_insert_after(after, searched(ShapeNode::segment(fs).optional()), ctx.options.max_shape_len)?;
                }
                for id in &target.nodes {
                    shape.node_mut(*id).flags.insert(NodeFlags::OPTIONAL);
                }
            }
            ChangeKind::Widen => {
                let Some((head, rest)) = target.nodes.split_first() else { return Ok(()) };
                let fs = self.underlying_fs(&shape.node(*head).fs, 0, &m.bindings);
                let node = shape.node_mut(*head);
                node.fs = fs;
                node.flags.insert(NodeFlags::SEARCHED);
                for id in rest {
                    shape.node_mut(*id).flags.insert(NodeFlags::OPTIONAL | NodeFlags::SEARCHED);
                }
            }
        }
        tracing::trace!(rule = %self.rule, kind = ?self.kind, "analyzed site");
        Ok(())
    }

    /// Surface features of target node `i` with the rewrite undone: every
    /// feature the rule sets goes back to the input side's value, or becomes
    /// unconstrained when the input side does not mention it.
    fn underlying_fs(&self, surface: &FeatureStruct, i: usize, bindings: &VariableBindings) -> FeatureStruct {
        underlying_fs(&self.lhs, &self.rhs, surface, i, bindings)
    }
}

fn underlying_fs(
    lhs: &[FeatureStruct],
    rhs: &[FeatureStruct],
    surface: &FeatureStruct,
    i: usize,
    bindings: &VariableBindings,
) -> FeatureStruct {
    let original = lhs[i].replace_variables(bindings).strip_variables();
    restore(surface, &rhs[i], &original)
}

/// Whether unapplying at `m` would change anything. Installed as the
/// analysis pattern's acceptance test, so vacuous sites never match.
fn is_nonvacuous(kind: ChangeKind, lhs: &[FeatureStruct], rhs: &[FeatureStruct], shape: &Shape, m: &Match) -> bool {
    let Some(target) = m.group(TARGET) else { return false };
    let changes = |i: usize, id: NodeId| {
        let fs = &shape.node(id).fs;
        underlying_fs(lhs, rhs, fs, i, &m.bindings) != *fs
    };
    match kind {
        ChangeKind::FeatureChange => target.nodes.iter().enumerate().any(|(i, id)| changes(i, *id)),
        ChangeKind::Epenthesis => target.nodes.iter().any(|id| !shape.node(*id).is_optional()),
        ChangeKind::Deletion => true,
        ChangeKind::Widen => match target.nodes.split_first() {
            Some((head, rest)) => changes(0, *head) || rest.iter().any(|id| !shape.node(*id).is_optional()),
            None => false,
        },
    }
}

// --- Pattern construction ------------------------------------------------------

fn target_constraint(fs: FeatureStruct) -> PatternNode {
    PatternNode::Constraint(Constraint::segment(fs).unsearched())
}

fn mentions_boundary(env: &[PatternNode]) -> bool {
    env.iter().flat_map(PatternNode::constraints).any(|c| c.kind == NodeKind::Boundary)
}

fn synthesis_pattern(lhs: &[FeatureStruct], def: &RewriteSubrule, direction: Direction) -> Pattern {
    let filter = if mentions_boundary(&def.left) || mentions_boundary(&def.right) {
        NodeKinds::SEGMENT | NodeKinds::BOUNDARY
    } else {
        NodeKinds::SEGMENT
    };
    Pattern::new(vec![
        PatternNode::group(LEFT_ENV, def.left.clone()),
        PatternNode::group(TARGET, lhs.iter().cloned().map(target_constraint).collect()),
        PatternNode::group(RIGHT_ENV, def.right.clone()),
    ])
    .direction(direction)
    .filter(filter)
}

fn analysis_pattern(kind: ChangeKind, lhs: &[FeatureStruct], def: &RewriteSubrule, direction: Direction) -> Pattern {
    let direction = if kind == ChangeKind::Deletion || direction == Direction::RightToLeft {
        Direction::LeftToRight
    } else {
        Direction::RightToLeft
    };
    let segments_only = |env: &[PatternNode]| -> Vec<PatternNode> {
        env.iter().filter_map(|n| n.retain_constraints(&|c| c.kind != NodeKind::Boundary)).collect()
    };
    let changed = |i: usize| lhs[i].priority_union(&def.rhs[i]);
    let target: Vec<FeatureStruct> = match kind {
        ChangeKind::FeatureChange | ChangeKind::Deletion => (0..def.rhs.len()).map(changed).collect(),
        ChangeKind::Epenthesis => def.rhs.clone(),
        ChangeKind::Widen => std::iter::once(changed(0)).chain(def.rhs[1..].iter().cloned()).collect(),
    };
    let (lhs, rhs) = (lhs.to_vec(), def.rhs.clone());
    Pattern::new(vec![
        PatternNode::group(LEFT_ENV, segments_only(&def.left)),
        PatternNode::group(TARGET, target.into_iter().map(target_constraint).collect()),
        PatternNode::group(RIGHT_ENV, segments_only(&def.right)),
    ])
    .direction(direction)
    .filter(NodeKinds::SEGMENT)
    .skip_optional(true)
    .acceptable(move |shape, m| is_nonvacuous(kind, &lhs, &rhs, shape, m))
}

// --- Site geometry -------------------------------------------------------------

/// First target node in scan order, or the node just past an empty target's gap.
fn site_position(shape: &Shape, target: &GroupMatch, dir: Direction) -> Option<NodeId> {
    let near = match dir {
        Direction::LeftToRight => target.first(),
        Direction::RightToLeft => target.last(),
    };
    near.or_else(|| shape.step(target.entry, dir))
}

/// Last target node in scan order, or the gap's entry node.
fn far_edge(target: &GroupMatch, dir: Direction) -> NodeId {
    let far = match dir {
        Direction::LeftToRight => target.last(),
        Direction::RightToLeft => target.first(),
    };
    far.unwrap_or(target.entry)
}

/// Sites must not start before the resume point. A gap entered from a node
/// the rule itself inserted is not a new site.
fn admissible(shape: &Shape, m: &Match, dir: Direction, resume: NodeId) -> bool {
    let Some(target) = m.group(TARGET) else { return false };
    let Some(position) = site_position(shape, target, dir) else { return false };
    !shape.precedes(position, resume, dir) && (!target.is_empty() || !shape.node(target.entry).is_searched())
}

fn claims(shape: &Shape, target: &GroupMatch, dir: Direction) -> Vec<Claim> {
    if target.is_empty() {
        return site_position(shape, target, dir).map(Claim::Gap).into_iter().collect();
    }
    target.nodes.iter().copied().map(Claim::Node).collect()
}

/// Node after which inserted material goes: after the left context, before
/// the right context, or at the empty target's gap.
fn insertion_point(shape: &Shape, m: &Match, target: &GroupMatch, dir: Direction) -> NodeId {
    if let Some(last) = m.group(LEFT_ENV).and_then(GroupMatch::last) {
        return last;
    }
    if let Some(first) = m.group(RIGHT_ENV).and_then(GroupMatch::first) {
        return shape.prev(first).unwrap_or_else(|| shape.begin());
    }
    match dir {
        Direction::LeftToRight => target.entry,
        Direction::RightToLeft => shape.prev(target.entry).unwrap_or_else(|| shape.begin()),
    }
}

fn searched(mut node: ShapeNode) -> ShapeNode {
    node.flags.insert(NodeFlags::SEARCHED);
    node
}

pub(super) fn restore(surface: &FeatureStruct, rhs: &FeatureStruct, lhs: &FeatureStruct) -> FeatureStruct {
    let mut out = surface.clone();
    for (id, set) in rhs.iter() {
        match (surface.get(id), set, lhs.get(id)) {
            (Some(FeatureValue::Complex(inner)), FeatureValue::Complex(changed), original) => {
                let original = match original {
                    Some(FeatureValue::Complex(fs)) => fs.clone(),
                    _ => FeatureStruct::new(),
                };
                out.set(id, FeatureValue::Complex(restore(inner, changed, &original)));
            }
            (_, _, Some(original)) => out.set(id, original.clone()),
            _ => {
                out.remove(id);
            }
        }
    }
    out
}

/// Run `pass` until it changes nothing or `limit` passes have run.
fn repeat(limit: usize, mut pass: impl FnMut() -> Result<usize>) -> Result<bool> {
    let mut any = false;
    for _ in 0..limit {
        if pass()? == 0 {
            break;
        }
        any = true;
    }
    Ok(any)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::context::MorpherOptions;
    use crate::feature::FeatureSystem;
    use crate::pattern::AnchorSide;

    struct Fixture {
        sys: Arc<FeatureSystem>,
    }

    impl Fixture {
        fn new() -> Self {
            let sys = FeatureSystem::builder()
                .binary("cons")
                .binary("syl")
                .binary("voice")
                .binary("long")
                .binary("round")
                .build()
                .unwrap();
            Fixture { sys }
        }

        fn fs(&self, notation: &str) -> FeatureStruct {
            self.sys.parse(notation).unwrap()
        }

        fn shape(&self, segs: &[&str]) -> Shape {
            Shape::from_nodes(segs.iter().map(|s| ShapeNode::segment(self.fs(s))))
        }

        fn compile(&self, lhs: &[&str], def: RewriteSubrule, mode: ApplicationMode) -> Subrule {
            let lhs: Vec<FeatureStruct> = lhs.iter().map(|s| self.fs(s)).collect();
            Subrule::compile(Arc::from("test"), &lhs, def, mode, Direction::LeftToRight).unwrap()
        }

        fn seg(&self, notation: &str) -> PatternNode {
            PatternNode::segment(self.fs(notation))
        }
    }

    const T: &str = "+cons -syl -voice";
    const N: &str = "+cons -syl +voice";
    const A: &str = "-cons +syl -long";
    const SCHWA: &str = "-cons +syl -long -round";

    fn run(sr: &Subrule, shape: &mut Shape, mode: Mode, application: ApplicationMode, options: &MorpherOptions) -> Result<bool> {
        let ctx = RuleContext::untraced(options);
        let changed = sr.run(shape, mode, application, &ctx);
        shape.clear_flag(NodeFlags::SEARCHED);
        changed
    }

    #[test]
    fn change_kinds_follow_side_lengths() {
        assert_eq!(ChangeKind::classify(1, 1), Some(ChangeKind::FeatureChange));
        assert_eq!(ChangeKind::classify(0, 2), Some(ChangeKind::Epenthesis));
        assert_eq!(ChangeKind::classify(2, 1), Some(ChangeKind::Deletion));
        assert_eq!(ChangeKind::classify(1, 3), Some(ChangeKind::Widen));
        assert_eq!(ChangeKind::classify(2, 3), None);
        assert_eq!(ChangeKind::classify(0, 0), None);
    }

    #[test]
    fn uncompilable_sides_are_rejected() {
        let fx = Fixture::new();
        let lhs = vec![fx.fs(T), fx.fs(T)];
        let def = RewriteSubrule::new(vec![fx.fs(A), fx.fs(A), fx.fs(A)]);
        let err = Subrule::compile(Arc::from("bad"), &lhs, def, ApplicationMode::Simultaneous, Direction::LeftToRight);
        assert!(matches!(err, Err(MorphError::InvalidRule { .. })));
    }

    #[test]
    fn self_opaquing_is_detected_statically() {
        let fx = Fixture::new();
        // Voicing before a voiced consonant feeds itself.
        let voicing = fx.compile(&["+cons"], RewriteSubrule::new(vec![fx.fs("+voice")]).right(vec![fx.seg("+cons +voice")]), ApplicationMode::Simultaneous);
        assert!(voicing.is_self_opaquing());
        let lengthening = fx.compile(&["-cons"], RewriteSubrule::new(vec![fx.fs("+long")]).right(vec![fx.seg("+cons")]), ApplicationMode::Simultaneous);
        assert!(!lengthening.is_self_opaquing());
        let deletion = fx.compile(&[T], RewriteSubrule::new(vec![]), ApplicationMode::Simultaneous);
        assert!(deletion.is_self_opaquing());
        let widen = fx.compile(&[A], RewriteSubrule::new(vec![fx.fs(A), fx.fs(A)]), ApplicationMode::Simultaneous);
        assert!(widen.is_self_opaquing());
    }

    #[test]
    fn feature_change_applies_and_is_idempotent() {
        let fx = Fixture::new();
        let sr = fx.compile(
            &["-cons +syl"],
            RewriteSubrule::new(vec![fx.fs("+long")]).right(vec![fx.seg("+cons"), PatternNode::Anchor(AnchorSide::Right)]),
            ApplicationMode::Simultaneous,
        );
        let options = MorpherOptions::default();
        let mut shape = fx.shape(&[T, A, T]);
        assert!(run(&sr, &mut shape, Mode::Synthesis, ApplicationMode::Simultaneous, &options).unwrap());
        let once = shape.key();
        assert!(shape.node(shape.ids()[1]).fs.subsumed_by(&fx.fs("+long")));

        run(&sr, &mut shape, Mode::Synthesis, ApplicationMode::Simultaneous, &options).unwrap();
        assert_eq!(shape.key(), once);
    }

    #[test]
    fn feature_change_analysis_underspecifies_the_changed_feature() {
        let fx = Fixture::new();
        let sr = fx.compile(&["-cons +syl"], RewriteSubrule::new(vec![fx.fs("+long")]).right(vec![fx.seg("+cons")]), ApplicationMode::Simultaneous);
        let options = MorpherOptions::default();
        let mut shape = fx.shape(&[T, "-cons +syl +long", T]);
        assert!(run(&sr, &mut shape, Mode::Analysis, ApplicationMode::Simultaneous, &options).unwrap());
        let vowel = &shape.node(shape.ids()[1]).fs;
        assert_eq!(vowel, &fx.fs("-cons +syl"));

        // Nothing left to undo.
        assert!(!run(&sr, &mut shape, Mode::Analysis, ApplicationMode::Simultaneous, &options).unwrap());
    }

    #[test]
    fn analysis_pattern_rejects_vacuous_sites() {
        let fx = Fixture::new();
        let sr = fx.compile(&["-cons +syl"], RewriteSubrule::new(vec![fx.fs("+long")]).right(vec![fx.seg("+cons")]), ApplicationMode::Simultaneous);
        let analysis = sr.pattern(Mode::Analysis);
        // A vowel unspecified for length carries nothing the rule could have set.
        assert!(!analysis.is_match(&fx.shape(&["-cons +syl", T])));
        assert!(analysis.is_match(&fx.shape(&["-cons +syl +long", T])));
        // Synthesis sees the same vowel as a site.
        assert!(sr.pattern(Mode::Synthesis).is_match(&fx.shape(&["-cons +syl", T])));
    }

    #[test]
    fn analysis_restores_values_the_input_side_names() {
        let fx = Fixture::new();
        let sr = fx.compile(&["-cons +syl -long"], RewriteSubrule::new(vec![fx.fs("+long")]), ApplicationMode::Simultaneous);
        let options = MorpherOptions::default();
        let mut shape = fx.shape(&["-cons +syl +long"]);
        run(&sr, &mut shape, Mode::Analysis, ApplicationMode::Simultaneous, &options).unwrap();
        assert_eq!(shape.node(shape.first()).fs, fx.fs("-cons +syl -long"));
    }

    #[test]
    fn simultaneous_epenthesis_inserts_at_every_gap() {
        let fx = Fixture::new();
        let sr = fx.compile(&[], RewriteSubrule::new(vec![fx.fs(SCHWA)]).left(vec![fx.seg("+cons")]).right(vec![fx.seg("+cons")]), ApplicationMode::Simultaneous);
        let options = MorpherOptions::default();
        let mut shape = fx.shape(&[T, T, N]);
        assert!(run(&sr, &mut shape, Mode::Synthesis, ApplicationMode::Simultaneous, &options).unwrap());
        assert_eq!(shape.len(), 5);
        let vowels: Vec<bool> = shape.nodes().map(|n| n.fs.is_unifiable(&fx.fs("+syl"))).collect();
        assert_eq!(vowels, vec![false, true, false, true, false]);
    }

    #[test]
    fn iterative_epenthesis_resumes_after_each_insertion() {
        let fx = Fixture::new();
        // ∅ → ə / C _ C, left to right.
        let sr = fx.compile(&[], RewriteSubrule::new(vec![fx.fs(SCHWA)]).left(vec![fx.seg("+cons")]).right(vec![fx.seg("+cons")]), ApplicationMode::Iterative);
        let options = MorpherOptions::default();
        let mut shape = fx.shape(&[T, T, N]);
        run(&sr, &mut shape, Mode::Synthesis, ApplicationMode::Iterative, &options).unwrap();
        assert_eq!(shape.len(), 5);
    }

    #[test]
    fn epenthesis_analysis_marks_nodes_optional() {
        let fx = Fixture::new();
        let sr = fx.compile(&[], RewriteSubrule::new(vec![fx.fs(SCHWA)]).left(vec![fx.seg("+cons")]).right(vec![fx.seg("+cons")]), ApplicationMode::Simultaneous);
        let options = MorpherOptions::default();
        let mut shape = fx.shape(&[T, SCHWA, N]);
        assert!(run(&sr, &mut shape, Mode::Analysis, ApplicationMode::Simultaneous, &options).unwrap());
        assert_eq!(shape.len(), 3);
        assert!(shape.node(shape.ids()[1]).is_optional());
        assert!(!run(&sr, &mut shape, Mode::Analysis, ApplicationMode::Simultaneous, &options).unwrap());
    }

    #[test]
    fn deletion_removes_the_target() {
        let fx = Fixture::new();
        let sr = fx.compile(&[T], RewriteSubrule::new(vec![]).left(vec![fx.seg(N)]).right(vec![PatternNode::Anchor(AnchorSide::Right)]), ApplicationMode::Simultaneous);
        let options = MorpherOptions::default();
        let mut shape = fx.shape(&[A, N, T]);
        assert!(run(&sr, &mut shape, Mode::Synthesis, ApplicationMode::Simultaneous, &options).unwrap());
        assert_eq!(shape.len(), 2);
    }

    #[test]
    fn deletion_analysis_is_bounded_by_the_reapplication_limit() {
        let fx = Fixture::new();
        let sr = fx.compile(&[T], RewriteSubrule::new(vec![]).left(vec![fx.seg(N)]).right(vec![PatternNode::Anchor(AnchorSide::Right)]), ApplicationMode::Simultaneous);
        for k in 0..3 {
            let options = MorpherOptions { deletion_reapplications: k, ..MorpherOptions::default() };
            let mut shape = fx.shape(&[A, N]);
            run(&sr, &mut shape, Mode::Analysis, ApplicationMode::Simultaneous, &options).unwrap();
            let optional = shape.nodes().filter(|n| n.is_optional()).count();
            assert_eq!(optional, k + 1, "bound {k}");
            assert_eq!(shape.len(), 2 + k + 1);
        }
    }

    #[test]
    fn widening_splits_the_head() {
        let fx = Fixture::new();
        let sr = fx.compile(&[A], RewriteSubrule::new(vec![fx.fs("+long"), fx.fs(SCHWA)]), ApplicationMode::Iterative);
        let options = MorpherOptions::default();
        let mut shape = fx.shape(&[T, A]);
        assert!(run(&sr, &mut shape, Mode::Synthesis, ApplicationMode::Iterative, &options).unwrap());
        assert_eq!(shape.len(), 3);
        assert!(shape.node(shape.ids()[1]).fs.subsumed_by(&fx.fs("+long")));

        let mut surface = shape.clone();
        run(&sr, &mut surface, Mode::Analysis, ApplicationMode::Iterative, &options).unwrap();
        assert!(surface.node(surface.ids()[2]).is_optional());
        assert_eq!(surface.node(surface.ids()[1]).fs, fx.fs(A));
    }

    #[test]
    fn unbound_variables_abort_the_branch() {
        let fx = Fixture::new();
        let sr = fx.compile(&["+cons"], RewriteSubrule::new(vec![fx.fs("@a:voice")]), ApplicationMode::Simultaneous);
        let options = MorpherOptions::default();
        let mut shape = fx.shape(&[T]);
        let err = run(&sr, &mut shape, Mode::Synthesis, ApplicationMode::Simultaneous, &options).unwrap_err();
        assert!(matches!(err, MorphError::UninstantiatedFeature { .. }));
    }

    #[test]
    fn variables_carry_values_across_the_rule() {
        let fx = Fixture::new();
        // Voicing assimilation: C → [α voice] / _ [α voice C].
        let sr = fx.compile(&["+cons"], RewriteSubrule::new(vec![fx.fs("@a:voice")]).right(vec![fx.seg("+cons @a:voice")]), ApplicationMode::Iterative);
        let options = MorpherOptions::default();
        let mut shape = fx.shape(&[T, N]);
        run(&sr, &mut shape, Mode::Synthesis, ApplicationMode::Iterative, &options).unwrap();
        assert_eq!(shape.node(shape.first()).fs, fx.fs(N));
    }

    #[test]
    fn epenthesis_growth_hits_the_shape_cap() {
        let fx = Fixture::new();
        // ∅ → t / t _ keeps feeding itself when applied simultaneously.
        let sr = fx.compile(&[], RewriteSubrule::new(vec![fx.fs(T)]).left(vec![fx.seg("+cons")]), ApplicationMode::Simultaneous);
        assert!(sr.is_self_opaquing());
        let options = MorpherOptions { max_shape_len: 8, ..MorpherOptions::default() };
        let mut shape = fx.shape(&[T]);
        let err = run(&sr, &mut shape, Mode::Synthesis, ApplicationMode::Simultaneous, &options).unwrap_err();
        assert_eq!(err, MorphError::TooManySegments { limit: 8 });
    }
}
