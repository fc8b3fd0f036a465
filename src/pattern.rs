//! Constraint trees matched against shapes.
//!
//! A [`Pattern`] is a sequence of [`PatternNode`]s plus the settings that
//! control how it walks a [`Shape`]:
//!
//! - `direction`: scan order; sequences are consumed in this order and
//!   candidate start nodes are tried in this order.
//! - `filter`: node kinds the pattern can see. Everything else is stepped over
//!   (boundaries are invisible to most phonological rules).
//! - `skip_optional`: analysis patterns may step over nodes marked optional.
//! - `acceptable`: a predicate over a complete match; rejecting it resumes the
//!   search.
//!
//! Constraints are compared by unification, so an underspecified constraint
//! matches any consistent node and variables are bound on the way.

#[path = "pattern/matcher.rs"]
mod matcher;
#[path = "pattern/node.rs"]
mod node;

pub use matcher::{GroupMatch, Match};
pub use node::{AnchorSide, Constraint, PatternNode};

use crate::Direction;
use crate::feature::VariableBindings;
use crate::shape::{NodeId, NodeKinds, Shape};
use matcher::Matcher;
use std::sync::Arc;

pub type Acceptable = Arc<dyn Fn(&Shape, &Match) -> bool + Send + Sync>;

#[derive(Clone)]
pub struct Pattern {
    pub children: Vec<PatternNode>,
    pub direction: Direction,
    pub filter: NodeKinds,
    pub skip_optional: bool,
    acceptable: Option<Acceptable>,
}

impl std::fmt::Debug for Pattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pattern")
            .field("children", &self.children)
            .field("direction", &self.direction)
            .field("filter", &self.filter)
            .field("skip_optional", &self.skip_optional)
            .field("acceptable", &self.acceptable.as_ref().map(|_| "<function>"))
            .finish()
    }
}

impl Pattern {
    pub fn new(children: Vec<PatternNode>) -> Self {
        Pattern {
            children,
            direction: Direction::LeftToRight,
            filter: NodeKinds::SEGMENT | NodeKinds::BOUNDARY,
            skip_optional: false,
            acceptable: None,
        }
    }

    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    pub fn filter(mut self, filter: NodeKinds) -> Self {
        self.filter = filter;
        self
    }

    pub fn skip_optional(mut self, skip: bool) -> Self {
        self.skip_optional = skip;
        self
    }

    pub fn acceptable(mut self, f: impl Fn(&Shape, &Match) -> bool + Send + Sync + 'static) -> Self {
        self.acceptable = Some(Arc::new(f));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Try to match with the first pattern node anchored at `start`.
    pub fn match_at(&self, shape: &Shape, start: NodeId) -> Option<Match> {
        self.match_at_where(shape, start, VariableBindings::new(), &mut |_| true)
    }

    /// Like [`match_at`](Self::match_at), with initial bindings and an extra
    /// acceptance test that participates in backtracking.
    pub fn match_at_where(
        &self,
        shape: &Shape,
        start: NodeId,
        bindings: VariableBindings,
        accept: &mut dyn FnMut(&Match) -> bool,
    ) -> Option<Match> {
        let matcher = Matcher { pattern: self, shape };
        let start = matcher.settle(start);
        let mut found = None;
        let st = matcher.initial_state(start, bindings);
        matcher.seq(&self.children, st, &mut |st| {
            let m = matcher.finish(start, st);
            if self.acceptable.as_ref().is_some_and(|f| !f(shape, &m)) || !accept(&m) {
                return false;
            }
            found = Some(m);
            true
        });
        found
    }

    /// Every match anchored at `start`, in backtracking order.
    pub fn match_all_at(&self, shape: &Shape, start: NodeId) -> Vec<Match> {
        let matcher = Matcher { pattern: self, shape };
        let start = matcher.settle(start);
        let mut found = Vec::new();
        let st = matcher.initial_state(start, VariableBindings::new());
        matcher.seq(&self.children, st, &mut |st| {
            let m = matcher.finish(start, st);
            if self.acceptable.as_ref().is_none_or(|f| f(shape, &m)) {
                found.push(m);
            }
            false
        });
        found
    }

    /// Candidate start nodes from `from` onward in scan order.
    pub fn candidates(&self, shape: &Shape, from: NodeId) -> Vec<NodeId> {
        Matcher { pattern: self, shape }.candidates(from)
    }

    /// First node a scan in this pattern's direction starts from.
    pub fn scan_start(&self, shape: &Shape) -> NodeId {
        let anchor = shape.start_anchor(self.direction);
        shape.step(anchor, self.direction).unwrap_or(anchor)
    }

    /// First match whose start is at or after `from`.
    pub fn find_from(&self, shape: &Shape, from: NodeId, accept: &mut dyn FnMut(&Match) -> bool) -> Option<Match> {
        self.candidates(shape, from)
            .into_iter()
            .find_map(|start| self.match_at_where(shape, start, VariableBindings::new(), accept))
    }

    pub fn find(&self, shape: &Shape) -> Option<Match> {
        self.find_from(shape, self.scan_start(shape), &mut |_| true)
    }

    pub fn is_match(&self, shape: &Shape) -> bool {
        self.find(shape).is_some()
    }

    /// Match the whole shape from edge to edge.
    pub fn matches_exactly(&self, shape: &Shape) -> Option<Match> {
        let mut anchored = self.clone();
        anchored.children.insert(0, PatternNode::Anchor(AnchorSide::Left));
        anchored.children.push(PatternNode::Anchor(AnchorSide::Right));
        anchored.match_at(shape, anchored.scan_start(shape))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::{FeatureStruct, FeatureSystem};
    use crate::shape::{NodeFlags, ShapeNode};

    struct Fixture {
        sys: Arc<FeatureSystem>,
    }

    impl Fixture {
        fn new() -> Self {
            let sys = FeatureSystem::builder().binary("cons").binary("voice").binary("syl").build().unwrap();
            Fixture { sys }
        }

        fn fs(&self, notation: &str) -> FeatureStruct {
            self.sys.parse(notation).unwrap()
        }

        fn shape(&self, segs: &[&str]) -> Shape {
            Shape::from_nodes(segs.iter().map(|s| {
                if *s == "+" {
                    ShapeNode::boundary(FeatureStruct::new())
                } else {
                    ShapeNode::segment(self.fs(s))
                }
            }))
        }

        fn seg(&self, notation: &str) -> PatternNode {
            PatternNode::segment(self.fs(notation))
        }
    }

    const C: &str = "+cons -syl";
    const V: &str = "-cons +syl";

    #[test]
    fn finds_consonant_before_word_end() {
        let fx = Fixture::new();
        let shape = fx.shape(&[C, V, C]);
        let pattern = Pattern::new(vec![
            PatternNode::group("target", vec![fx.seg(V)]),
            PatternNode::group("rightEnv", vec![fx.seg(C)]),
            PatternNode::Anchor(AnchorSide::Right),
        ]);
        let m = pattern.find(&shape).unwrap();
        let ids = shape.ids();
        assert_eq!(m.group("target").unwrap().nodes, vec![ids[1]]);
        assert_eq!(m.group("rightEnv").unwrap().nodes, vec![ids[2]]);
        assert_eq!(m.span(), Some((ids[1], ids[2])));
    }

    #[test]
    fn right_to_left_scans_from_the_end() {
        let fx = Fixture::new();
        let shape = fx.shape(&[C, V, C, V, C]);
        let pattern = Pattern::new(vec![fx.seg(V), fx.seg(C)]).direction(Direction::RightToLeft);
        let m = pattern.find(&shape).unwrap();
        let ids = shape.ids();
        assert_eq!(m.nodes, vec![ids[3], ids[4]]);
    }

    #[test]
    fn boundaries_are_invisible_when_filtered() {
        let fx = Fixture::new();
        let shape = fx.shape(&[C, "+", V]);
        let pattern = Pattern::new(vec![fx.seg(C), fx.seg(V)]);
        assert!(!pattern.is_match(&shape));
        assert!(pattern.filter(NodeKinds::SEGMENT).is_match(&shape));
    }

    #[test]
    fn variables_must_agree_across_constraints() {
        let fx = Fixture::new();
        let pattern = Pattern::new(vec![fx.seg("+cons @a:voice"), fx.seg("+cons @a:voice")]);
        assert!(pattern.is_match(&fx.shape(&["+cons +voice", "+cons +voice"])));
        assert!(!pattern.is_match(&fx.shape(&["+cons +voice", "+cons -voice"])));
    }

    #[test]
    fn quantifiers_are_greedy_and_respect_bounds() {
        let fx = Fixture::new();
        let shape = fx.shape(&[C, C, C, V]);
        let pattern = Pattern::new(vec![
            PatternNode::group("cs", vec![PatternNode::repeat(fx.seg(C), 1, Some(2))]),
            PatternNode::group("rest", vec![PatternNode::repeat(fx.seg("+cons"), 0, None), fx.seg(V)]),
        ]);
        let m = pattern.match_at(&shape, shape.first()).unwrap();
        assert_eq!(m.group("cs").unwrap().nodes.len(), 2);
        assert_eq!(m.group("rest").unwrap().nodes.len(), 2);
    }

    #[test]
    fn optional_nodes_are_skipped_only_when_allowed() {
        let fx = Fixture::new();
        let mut shape = fx.shape(&[C, V, C]);
        let mid = shape.ids()[1];
        shape.node_mut(mid).flags.insert(NodeFlags::OPTIONAL);
        let pattern = Pattern::new(vec![fx.seg(C), fx.seg(C), PatternNode::Anchor(AnchorSide::Right)]);
        assert!(!pattern.is_match(&shape));
        assert!(pattern.clone().skip_optional(true).is_match(&shape));
    }

    #[test]
    fn unsearched_constraints_reject_searched_nodes() {
        let fx = Fixture::new();
        let mut shape = fx.shape(&[V]);
        let pattern = Pattern::new(vec![PatternNode::Constraint(Constraint::segment(fx.fs(V)).unsearched())]);
        assert!(pattern.is_match(&shape));
        let only = shape.first();
        shape.node_mut(only).flags.insert(NodeFlags::SEARCHED);
        assert!(!pattern.is_match(&shape));
    }

    #[test]
    fn rejected_matches_resume_at_the_next_candidate() {
        let fx = Fixture::new();
        let shape = fx.shape(&[V, C, V]);
        let first = shape.first();
        let pattern = Pattern::new(vec![fx.seg(V)]).acceptable(move |_, m| m.start != first);
        let m = pattern.find(&shape).unwrap();
        assert_eq!(m.nodes, vec![shape.ids()[2]]);
    }

    #[test]
    fn empty_groups_report_their_entry_node() {
        let fx = Fixture::new();
        let shape = fx.shape(&[C, C]);
        let pattern = Pattern::new(vec![
            PatternNode::group("leftEnv", vec![fx.seg(C)]),
            PatternNode::group("target", vec![]),
            PatternNode::group("rightEnv", vec![fx.seg(C)]),
        ]);
        let m = pattern.find(&shape).unwrap();
        assert_eq!(m.group("target").unwrap().entry, shape.ids()[0]);

        let rtl = pattern.clone().direction(Direction::RightToLeft);
        let m = rtl.find(&shape).unwrap();
        assert_eq!(m.group("target").unwrap().entry, shape.ids()[1]);
    }

    #[test]
    fn exact_matches_cover_the_whole_shape() {
        let fx = Fixture::new();
        let shape = fx.shape(&[C, V]);
        assert!(Pattern::new(vec![fx.seg(C), fx.seg(V)]).matches_exactly(&shape).is_some());
        assert!(Pattern::new(vec![fx.seg(C)]).matches_exactly(&shape).is_none());
    }
}
