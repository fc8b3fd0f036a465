//! Word forms as order-maintained node lists.
//!
//! A [`Shape`] is a doubly linked list of [`ShapeNode`]s stored in an arena and
//! bounded by Begin/End anchor sentinels:
//!
//! ```text
//!   Begin ⇄ k ⇄ a ⇄ t ⇄ End
//!   MIN     …   …   …   MAX      order tags (see order.rs)
//!         └─────────┘            morph span (root allomorph)
//! ```
//!
//! Node handles ([`NodeId`]) stay valid across insertions; removed slots are
//! recycled. Morph spans record which allomorph contributed which nodes and
//! are kept consistent when nodes are removed.

#[path = "shape/node.rs"]
mod node;
#[path = "shape/order.rs"]
mod order;

pub use node::{NodeFlags, NodeKind, NodeKinds, ShapeNode};

use crate::Direction;
use crate::error::MorphError;
use crate::feature::FeatureStruct;
use crate::lexicon::AllomorphRef;
use std::cmp::Ordering;

/// Handle to a node of one particular [`Shape`] (and its clones).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub const BEGIN: NodeId = NodeId(0);
    pub const END: NodeId = NodeId(1);

    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone)]
struct Slot {
    node: ShapeNode,
    prev: NodeId,
    next: NodeId,
    tag: i32,
    live: bool,
}

/// The nodes contributed by one allomorph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MorphSpan {
    pub start: NodeId,
    pub end: NodeId,
    pub allomorph: AllomorphRef,
}

/// Structural identity of a shape: content, optionality and morph spans, in order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShapeKey {
    nodes: Vec<(NodeKind, FeatureStruct, bool)>,
    morphs: Vec<(usize, usize, AllomorphRef)>,
}

#[derive(Clone)]
pub struct Shape {
    slots: Vec<Slot>,
    free: Vec<NodeId>,
    len: usize,
    morphs: Vec<MorphSpan>,
}

impl Default for Shape {
    fn default() -> Self {
        Self::new()
    }
}

impl Shape {
    pub fn new() -> Self {
        let begin = Slot { node: ShapeNode::anchor(), prev: NodeId::BEGIN, next: NodeId::END, tag: i32::MIN, live: true };
        let end = Slot { node: ShapeNode::anchor(), prev: NodeId::BEGIN, next: NodeId::END, tag: i32::MAX, live: true };
        Shape { slots: vec![begin, end], free: Vec::new(), len: 0, morphs: Vec::new() }
    }

    pub fn from_nodes(nodes: impl IntoIterator<Item = ShapeNode>) -> Self {
        let mut shape = Shape::new();
        for node in nodes {
            shape.push(node);
        }
        shape
    }

    /// Number of nodes, sentinels excluded.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn begin(&self) -> NodeId {
        NodeId::BEGIN
    }

    pub fn end(&self) -> NodeId {
        NodeId::END
    }

    /// The sentinel a scan in `dir` starts from.
    pub fn start_anchor(&self, dir: Direction) -> NodeId {
        match dir {
            Direction::LeftToRight => NodeId::BEGIN,
            Direction::RightToLeft => NodeId::END,
        }
    }

    /// The sentinel a scan in `dir` ends on.
    pub fn end_anchor(&self, dir: Direction) -> NodeId {
        self.start_anchor(dir.reverse())
    }

    pub fn first(&self) -> NodeId {
        self.slots[NodeId::BEGIN.index()].next
    }

    pub fn last(&self) -> NodeId {
        self.slots[NodeId::END.index()].prev
    }

    pub fn node(&self, id: NodeId) -> &ShapeNode {
        &self.slots[id.index()].node
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut ShapeNode {
        &mut self.slots[id.index()].node
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.slots.get(id.index()).is_some_and(|s| s.live)
    }

    pub fn tag(&self, id: NodeId) -> i32 {
        self.slots[id.index()].tag
    }

    /// Neighbor of `id` in `dir`; `None` past the sentinels.
    pub fn step(&self, id: NodeId, dir: Direction) -> Option<NodeId> {
        match dir {
            Direction::LeftToRight if id == NodeId::END => None,
            Direction::RightToLeft if id == NodeId::BEGIN => None,
            Direction::LeftToRight => Some(self.slots[id.index()].next),
            Direction::RightToLeft => Some(self.slots[id.index()].prev),
        }
    }

    pub fn next(&self, id: NodeId) -> Option<NodeId> {
        self.step(id, Direction::LeftToRight)
    }

    pub fn prev(&self, id: NodeId) -> Option<NodeId> {
        self.step(id, Direction::RightToLeft)
    }

    pub fn compare(&self, a: NodeId, b: NodeId) -> Ordering {
        self.tag(a).cmp(&self.tag(b))
    }

    /// `a` comes strictly before `b` when walking in `dir`.
    pub fn precedes(&self, a: NodeId, b: NodeId, dir: Direction) -> bool {
        match dir {
            Direction::LeftToRight => self.tag(a) < self.tag(b),
            Direction::RightToLeft => self.tag(a) > self.tag(b),
        }
    }

    /// Node ids left to right, sentinels excluded.
    pub fn ids(&self) -> Vec<NodeId> {
        self.ids_in(Direction::LeftToRight)
    }

    pub fn ids_in(&self, dir: Direction) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(self.len);
        let mut cursor = self.step(self.start_anchor(dir), dir);
        while let Some(id) = cursor {
            if id == self.end_anchor(dir) {
                break;
            }
            out.push(id);
            cursor = self.step(id, dir);
        }
        out
    }

    pub fn nodes(&self) -> impl Iterator<Item = &ShapeNode> + '_ {
        self.ids().into_iter().map(move |id| self.node(id))
    }

    /// Inclusive run from `a` to `b`, which must be in list order.
    pub fn span(&self, a: NodeId, b: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut cursor = a;
        loop {
            out.push(cursor);
            if cursor == b {
                break;
            }
            match self.next(cursor) {
                Some(next) if next != NodeId::END || b == NodeId::END => cursor = next,
                _ => break,
            }
        }
        out
    }

    // --- Mutation ------------------------------------------------------------

    pub fn push(&mut self, node: ShapeNode) -> NodeId {
        self.insert_after(self.last(), node)
    }

    /// Insert `node` directly after `after` (which may be Begin).
    pub fn insert_after(&mut self, after: NodeId, node: ShapeNode) -> NodeId {
        assert!(after != NodeId::END, "cannot insert after the End anchor");
        let mut next = self.slots[after.index()].next;
        if order::offset(self.tag(next)) - order::offset(self.tag(after)) < 2 {
            self.relabel(after);
            next = self.slots[after.index()].next;
        }
        let tag = order::average(self.tag(after), self.tag(next));
        let slot = Slot { node, prev: after, next, tag, live: true };
        let id = match self.free.pop() {
            Some(id) => {
                self.slots[id.index()] = slot;
                id
            }
            None => {
                self.slots.push(slot);
                NodeId(self.slots.len() as u32 - 1)
            }
        };
        self.slots[after.index()].next = id;
        self.slots[next.index()].prev = id;
        self.len += 1;
        id
    }

    /// [`insert_after`](Self::insert_after) guarded by the engine's hard length cap.
    pub fn try_insert_after(&mut self, after: NodeId, node: ShapeNode, limit: usize) -> Result<NodeId, MorphError> {
        if self.len >= limit {
            return Err(MorphError::TooManySegments { limit });
        }
        Ok(self.insert_after(after, node))
    }

    pub fn remove(&mut self, id: NodeId) {
        assert!(id != NodeId::BEGIN && id != NodeId::END, "cannot remove an anchor");
        assert!(self.contains(id), "node {id:?} is not part of this shape");
        let (prev, next) = (self.slots[id.index()].prev, self.slots[id.index()].next);
        self.morphs.retain_mut(|span| {
            if span.start == id && span.end == id {
                return false;
            }
            if span.start == id {
                span.start = next;
            }
            if span.end == id {
                span.end = prev;
            }
            true
        });
        self.slots[prev.index()].next = next;
        self.slots[next.index()].prev = prev;
        let slot = &mut self.slots[id.index()];
        slot.live = false;
        slot.node.flags = NodeFlags::empty();
        self.free.push(id);
        self.len -= 1;
    }

    /// Clear `flag` on every node.
    pub fn clear_flag(&mut self, flag: NodeFlags) {
        for slot in self.slots.iter_mut().filter(|s| s.live) {
            slot.node.flags.remove(flag);
        }
    }

    // --- Morph spans ---------------------------------------------------------

    pub fn morphs(&self) -> &[MorphSpan] {
        &self.morphs
    }

    pub fn add_morph(&mut self, start: NodeId, end: NodeId, allomorph: AllomorphRef) {
        self.morphs.push(MorphSpan { start, end, allomorph });
    }

    pub fn clear_morphs(&mut self) {
        self.morphs.clear();
    }

    /// Morph spans in surface order.
    pub fn morphs_in_order(&self) -> Vec<&MorphSpan> {
        let mut spans: Vec<&MorphSpan> = self.morphs.iter().collect();
        spans.sort_by(|a, b| self.compare(a.start, b.start));
        spans
    }

    // --- Structure -----------------------------------------------------------

    pub fn key(&self) -> ShapeKey {
        let ids = self.ids();
        let position = |id: NodeId| ids.iter().position(|x| *x == id).unwrap_or(usize::MAX);
        let nodes = ids.iter().map(|id| {
            let node = self.node(*id);
            (node.kind, node.fs.clone(), node.is_optional())
        });
        let mut morphs: Vec<_> =
            self.morphs.iter().map(|span| (position(span.start), position(span.end), span.allomorph.clone())).collect();
        morphs.sort();
        ShapeKey { nodes: nodes.collect(), morphs }
    }
}

impl std::fmt::Debug for Shape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shape")
            .field("len", &self.len)
            .field("nodes", &self.nodes().collect::<Vec<_>>())
            .field("morphs", &self.morphs)
            .finish()
    }
}
