use crate::feature::FeatureStruct;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeKind {
    /// Begin/End sentinels; never matched by segment constraints.
    Anchor,
    Segment,
    Boundary,
}

impl NodeKind {
    pub fn mask(self) -> NodeKinds {
        match self {
            NodeKind::Anchor => NodeKinds::ANCHOR,
            NodeKind::Segment => NodeKinds::SEGMENT,
            NodeKind::Boundary => NodeKinds::BOUNDARY,
        }
    }
}

bitflags::bitflags! {
    /// Set of node kinds; used by patterns to decide which nodes are visible.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct NodeKinds: u8 {
        const ANCHOR   = 1 << 0;
        const SEGMENT  = 1 << 1;
        const BOUNDARY = 1 << 2;
    }
}

bitflags::bitflags! {
    /// Per-node state that is not part of the feature content.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub struct NodeFlags: u8 {
        /// The node may be absent from the underlying form (analysis only).
        const OPTIONAL = 1 << 0;
        /// The node was already consumed by the rule currently applying.
        const SEARCHED = 1 << 1;
    }
}

/// One position of a word form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeNode {
    pub kind: NodeKind,
    pub fs: FeatureStruct,
    pub flags: NodeFlags,
}

impl ShapeNode {
    pub fn segment(fs: FeatureStruct) -> Self {
        Self { kind: NodeKind::Segment, fs, flags: NodeFlags::empty() }
    }

    pub fn boundary(fs: FeatureStruct) -> Self {
        Self { kind: NodeKind::Boundary, fs, flags: NodeFlags::empty() }
    }

    pub(crate) fn anchor() -> Self {
        Self { kind: NodeKind::Anchor, fs: FeatureStruct::new(), flags: NodeFlags::empty() }
    }

    pub fn optional(mut self) -> Self {
        self.flags.insert(NodeFlags::OPTIONAL);
        self
    }

    pub fn is_optional(&self) -> bool {
        self.flags.contains(NodeFlags::OPTIONAL)
    }

    pub fn is_searched(&self) -> bool {
        self.flags.contains(NodeFlags::SEARCHED)
    }
}
