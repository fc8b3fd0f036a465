//! Backtracking matcher.
//!
//! Matching is written in continuation-passing style: every pattern node gets
//! the current [`MatchState`] and a continuation for "the rest of the
//! pattern". A node tries each of its alternatives and calls the continuation;
//! the first continuation that returns `true` wins and unwinds the stack.
//!
//! ```text
//! seq([A, group(B, C), D], st, k)
//!   └─ one(A, st, |s| seq([group(B, C), D], s, k))
//!        └─ one(group, s, |s| seq([D], s, k))
//!             └─ seq([B, C], s, |s| { record group; k'(s) })
//! ```
//!
//! Right-to-left patterns walk the same tree with every sequence reversed.

use super::node::{AnchorSide, Constraint, PatternNode};
use super::Pattern;
use crate::Direction;
use crate::feature::VariableBindings;
use crate::shape::{NodeId, Shape};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Span captured by a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupMatch {
    /// Consumed nodes, left to right.
    pub nodes: Vec<NodeId>,
    /// Last node consumed before the group was entered, in scan order. For an
    /// empty group this is where insertions attach: after it when scanning
    /// left to right, before it otherwise.
    pub entry: NodeId,
}

impl GroupMatch {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn first(&self) -> Option<NodeId> {
        self.nodes.first().copied()
    }

    pub fn last(&self) -> Option<NodeId> {
        self.nodes.last().copied()
    }
}

/// A successful match.
#[derive(Debug, Clone)]
pub struct Match {
    /// Candidate node the match was anchored at.
    pub start: NodeId,
    /// All consumed nodes, left to right.
    pub nodes: Vec<NodeId>,
    pub groups: BTreeMap<Arc<str>, GroupMatch>,
    pub bindings: VariableBindings,
    /// Direction the pattern was scanned in.
    pub direction: Direction,
}

impl Match {
    pub fn group(&self, name: &str) -> Option<&GroupMatch> {
        self.groups.get(name)
    }

    /// Leftmost and rightmost consumed nodes.
    pub fn span(&self) -> Option<(NodeId, NodeId)> {
        Some((*self.nodes.first()?, *self.nodes.last()?))
    }
}

#[derive(Debug, Clone)]
pub(super) struct MatchState {
    cursor: NodeId,
    last: NodeId,
    bindings: VariableBindings,
    groups: BTreeMap<Arc<str>, GroupMatch>,
    consumed: Vec<NodeId>,
}

pub(super) struct Matcher<'p, 's> {
    pub(super) pattern: &'p Pattern,
    pub(super) shape: &'s Shape,
}

impl<'p, 's> Matcher<'p, 's> {
    fn dir(&self) -> Direction {
        self.pattern.direction
    }

    fn visible(&self, id: NodeId) -> bool {
        id == self.shape.end_anchor(self.dir()) || self.pattern.filter.contains(self.shape.node(id).kind.mask())
    }

    /// First visible node at or after `id` in scan order.
    pub(super) fn settle(&self, mut id: NodeId) -> NodeId {
        while !self.visible(id) {
            match self.shape.step(id, self.dir()) {
                Some(next) => id = next,
                None => break,
            }
        }
        id
    }

    fn advance(&self, id: NodeId) -> NodeId {
        match self.shape.step(id, self.dir()) {
            Some(next) => self.settle(next),
            None => id,
        }
    }

    /// Visible nodes from `from` onward in scan order, plus the terminal sentinel.
    pub(super) fn candidates(&self, from: NodeId) -> Vec<NodeId> {
        let end = self.shape.end_anchor(self.dir());
        let mut out = Vec::new();
        let mut cursor = self.settle(from);
        loop {
            out.push(cursor);
            if cursor == end {
                break;
            }
            cursor = self.advance(cursor);
        }
        out
    }

    pub(super) fn initial_state(&self, start: NodeId, bindings: VariableBindings) -> MatchState {
        let rev = self.dir().reverse();
        let last = self.shape.step(start, rev).unwrap_or(start);
        MatchState { cursor: start, last, bindings, groups: BTreeMap::new(), consumed: Vec::new() }
    }

    pub(super) fn finish(&self, start: NodeId, st: MatchState) -> Match {
        let mut nodes = st.consumed;
        nodes.sort_by(|a, b| self.shape.compare(*a, *b));
        Match { start, nodes, groups: st.groups, bindings: st.bindings, direction: self.dir() }
    }

    fn split_next<'a>(&self, nodes: &'a [PatternNode]) -> Option<(&'a PatternNode, &'a [PatternNode])> {
        match self.dir() {
            Direction::LeftToRight => nodes.split_first(),
            Direction::RightToLeft => nodes.split_last(),
        }
    }

    pub(super) fn seq(&self, nodes: &[PatternNode], st: MatchState, k: &mut dyn FnMut(MatchState) -> bool) -> bool {
        match self.split_next(nodes) {
            None => k(st),
            Some((head, rest)) => self.one(head, st, &mut |s| self.seq(rest, s, k)),
        }
    }

    fn one(&self, node: &PatternNode, st: MatchState, k: &mut dyn FnMut(MatchState) -> bool) -> bool {
        match node {
            PatternNode::Constraint(c) => self.constraint(c, st, k),
            PatternNode::Group { name, children } => {
                let entry = st.last;
                let mark = st.consumed.len();
                self.seq(children, st, &mut |mut s| {
                    if let Some(name) = name {
                        let mut nodes = s.consumed[mark..].to_vec();
                        nodes.sort_by(|a, b| self.shape.compare(*a, *b));
                        s.groups.insert(name.clone(), GroupMatch { nodes, entry });
                    }
                    k(s)
                })
            }
            PatternNode::Quantifier { min, max, greedy, child } => self.quantifier(child, *min, *max, *greedy, 0, st, k),
            PatternNode::Anchor(side) => {
                if self.at_edge(*side, st.cursor) {
                    k(st)
                } else {
                    false
                }
            }
        }
    }

    fn constraint(&self, c: &Constraint, st: MatchState, k: &mut dyn FnMut(MatchState) -> bool) -> bool {
        let end = self.shape.end_anchor(self.dir());
        let mut cursor = st.cursor;
        while cursor != end {
            let node = self.shape.node(cursor);
            if node.kind == c.kind && !(c.unsearched && node.is_searched()) {
                let mut bindings = st.bindings.clone();
                if c.fs.unify(&node.fs, &mut bindings).is_some() {
                    let mut consumed = st.consumed.clone();
                    consumed.push(cursor);
                    let next =
                        MatchState { cursor: self.advance(cursor), last: cursor, bindings, groups: st.groups.clone(), consumed };
                    tracing::trace!(node = ?cursor, "constraint matched");
                    if k(next) {
                        return true;
                    }
                }
            }
            if self.pattern.skip_optional && node.is_optional() {
                cursor = self.advance(cursor);
            } else {
                break;
            }
        }
        false
    }

    #[allow(clippy::too_many_arguments)]
    fn quantifier(
        &self,
        child: &PatternNode,
        min: usize,
        max: Option<usize>,
        greedy: bool,
        count: usize,
        st: MatchState,
        k: &mut dyn FnMut(MatchState) -> bool,
    ) -> bool {
        let can_repeat = max.is_none_or(|m| count < m);
        let progress = st.consumed.len();
        let stop = count >= min;

        if greedy {
            if can_repeat {
                let repeated = self.one(child, st.clone(), &mut |s| {
                    s.consumed.len() > progress && self.quantifier(child, min, max, greedy, count + 1, s, k)
                });
                if repeated {
                    return true;
                }
            }
            stop && k(st)
        } else {
            if stop && k(st.clone()) {
                return true;
            }
            can_repeat
                && self.one(child, st, &mut |s| {
                    s.consumed.len() > progress && self.quantifier(child, min, max, greedy, count + 1, s, k)
                })
        }
    }

    /// Word-edge test at the gap just before `cursor` (in scan order).
    fn at_edge(&self, side: AnchorSide, cursor: NodeId) -> bool {
        let sentinel = match side {
            AnchorSide::Left => self.shape.begin(),
            AnchorSide::Right => self.shape.end(),
        };
        let skippable = |id: NodeId| {
            let node = self.shape.node(id);
            !self.pattern.filter.contains(node.kind.mask()) || (self.pattern.skip_optional && node.is_optional())
        };
        let walk = if sentinel == self.shape.end_anchor(self.dir()) { self.dir() } else { self.dir().reverse() };
        let mut candidate = if walk == self.dir() { Some(cursor) } else { self.shape.step(cursor, walk) };
        while let Some(id) = candidate {
            if id == sentinel {
                return true;
            }
            if id == self.shape.begin() || id == self.shape.end() || !skippable(id) {
                return false;
            }
            candidate = self.shape.step(id, walk);
        }
        false
    }
}
