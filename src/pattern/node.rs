use crate::feature::FeatureStruct;
use crate::shape::NodeKind;
use std::sync::Arc;

/// Leaf predicate over a single shape node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Constraint {
    pub kind: NodeKind,
    pub fs: FeatureStruct,
    /// Reject nodes already marked as searched by the applying rule.
    pub unsearched: bool,
}

impl Constraint {
    pub fn segment(fs: FeatureStruct) -> Self {
        Self { kind: NodeKind::Segment, fs, unsearched: false }
    }

    pub fn boundary(fs: FeatureStruct) -> Self {
        Self { kind: NodeKind::Boundary, fs, unsearched: false }
    }

    pub fn unsearched(mut self) -> Self {
        self.unsearched = true;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnchorSide {
    /// Word-initial position.
    Left,
    /// Word-final position.
    Right,
}

/// A node of the constraint tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PatternNode {
    Constraint(Constraint),
    /// Named (or anonymous) subsequence whose span is reported in the match.
    Group { name: Option<Arc<str>>, children: Vec<PatternNode> },
    /// Bounded repetition of `child`.
    Quantifier { min: usize, max: Option<usize>, greedy: bool, child: Box<PatternNode> },
    /// Zero-width word-edge assertion.
    Anchor(AnchorSide),
}

impl PatternNode {
    pub fn segment(fs: FeatureStruct) -> Self {
        PatternNode::Constraint(Constraint::segment(fs))
    }

    pub fn group(name: &str, children: Vec<PatternNode>) -> Self {
        PatternNode::Group { name: Some(Arc::from(name)), children }
    }

    pub fn sequence(children: Vec<PatternNode>) -> Self {
        PatternNode::Group { name: None, children }
    }

    pub fn optional(child: PatternNode) -> Self {
        PatternNode::Quantifier { min: 0, max: Some(1), greedy: true, child: Box::new(child) }
    }

    pub fn repeat(child: PatternNode, min: usize, max: Option<usize>) -> Self {
        PatternNode::Quantifier { min, max, greedy: true, child: Box::new(child) }
    }

    /// Every constraint in this subtree, in declaration order.
    pub fn constraints(&self) -> Vec<&Constraint> {
        let mut out = Vec::new();
        self.collect_constraints(&mut out);
        out
    }

    fn collect_constraints<'a>(&'a self, out: &mut Vec<&'a Constraint>) {
        match self {
            PatternNode::Constraint(c) => out.push(c),
            PatternNode::Group { children, .. } => children.iter().for_each(|c| c.collect_constraints(out)),
            PatternNode::Quantifier { child, .. } => child.collect_constraints(out),
            PatternNode::Anchor(_) => {}
        }
    }

    /// A copy of this subtree keeping only nodes accepted by `keep`.
    pub fn retain_constraints(&self, keep: &dyn Fn(&Constraint) -> bool) -> Option<PatternNode> {
        match self {
            PatternNode::Constraint(c) => keep(c).then(|| self.clone()),
            PatternNode::Group { name, children } => Some(PatternNode::Group {
                name: name.clone(),
                children: children.iter().filter_map(|c| c.retain_constraints(keep)).collect(),
            }),
            PatternNode::Quantifier { min, max, greedy, child } => {
                child.retain_constraints(keep).map(|child| PatternNode::Quantifier {
                    min: *min,
                    max: *max,
                    greedy: *greedy,
                    child: Box::new(child),
                })
            }
            PatternNode::Anchor(_) => Some(self.clone()),
        }
    }

    pub fn contains_anchor(&self, side: AnchorSide) -> bool {
        match self {
            PatternNode::Anchor(s) => *s == side,
            PatternNode::Group { children, .. } => children.iter().any(|c| c.contains_anchor(side)),
            PatternNode::Quantifier { child, .. } => child.contains_anchor(side),
            PatternNode::Constraint(_) => false,
        }
    }
}
