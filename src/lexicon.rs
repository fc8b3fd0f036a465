//! Lexical entries, allomorph constraints and root allomorph search.

use crate::Direction;
use crate::pattern::{Pattern, PatternNode};
use crate::shape::{NodeId, NodeKinds, Shape};
use std::fmt;
use std::sync::Arc;

// --- Morphemes and allomorphs ----------------------------------------------------

/// Identifier shared by a morpheme and all of its allomorphs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MorphemeId(Arc<str>);

impl MorphemeId {
    pub fn new(id: &str) -> Self {
        MorphemeId(Arc::from(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MorphemeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One allomorph of a morpheme, by position in the morpheme's allomorph list.
///
/// Lower indices are more specific: disjunctive allomorphs are tried in index
/// order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AllomorphRef {
    pub morpheme: MorphemeId,
    pub index: usize,
}

// --- Constraints -------------------------------------------------------------

/// Where a co-occurring morph must sit relative to the constrained one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Adjacency {
    Anywhere,
    SomewhereToLeft,
    SomewhereToRight,
    AdjacentToLeft,
    AdjacentToRight,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CoOccurrenceTarget {
    Allomorph(AllomorphRef),
    Morpheme(MorphemeId),
}

impl CoOccurrenceTarget {
    pub fn matches(&self, allomorph: &AllomorphRef) -> bool {
        match self {
            CoOccurrenceTarget::Allomorph(a) => a == allomorph,
            CoOccurrenceTarget::Morpheme(m) => *m == allomorph.morpheme,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CoOccurrence {
    pub target: CoOccurrenceTarget,
    pub adjacency: Adjacency,
}

/// Phonological context around a morph: `left _ right`.
///
/// Both sides are written left to right; the left side is matched right to
/// left starting just before the morph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Environment {
    pub left: Vec<PatternNode>,
    pub right: Vec<PatternNode>,
}

impl Environment {
    pub fn new(left: Vec<PatternNode>, right: Vec<PatternNode>) -> Self {
        Self { left, right }
    }

    /// Whether the context around the morph spanning `start..=end` satisfies the environment.
    pub fn is_satisfied(&self, shape: &Shape, start: NodeId, end: NodeId) -> bool {
        let side = |nodes: &[PatternNode], from: Option<NodeId>, dir: Direction| {
            if nodes.is_empty() {
                return true;
            }
            let Some(from) = from else { return false };
            Pattern::new(nodes.to_vec()).direction(dir).filter(NodeKinds::SEGMENT).match_at(shape, from).is_some()
        };
        side(&self.left, shape.prev(start), Direction::RightToLeft)
            && side(&self.right, shape.next(end), Direction::LeftToRight)
    }
}

/// Everything that restricts where an allomorph may surface.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct AllomorphConstraints {
    /// At least one must hold when non-empty.
    pub required_environments: Vec<Environment>,
    /// None may hold.
    pub excluded_environments: Vec<Environment>,
    pub required_cooccurrences: Vec<CoOccurrence>,
    pub excluded_cooccurrences: Vec<CoOccurrence>,
}

impl AllomorphConstraints {
    pub fn has_environments(&self) -> bool {
        !self.required_environments.is_empty() || !self.excluded_environments.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self == &AllomorphConstraints::default()
    }

    pub fn require_env(mut self, env: Environment) -> Self {
        self.required_environments.push(env);
        self
    }

    pub fn exclude_env(mut self, env: Environment) -> Self {
        self.excluded_environments.push(env);
        self
    }

    pub fn require(mut self, target: CoOccurrenceTarget, adjacency: Adjacency) -> Self {
        self.required_cooccurrences.push(CoOccurrence { target, adjacency });
        self
    }

    pub fn exclude(mut self, target: CoOccurrenceTarget, adjacency: Adjacency) -> Self {
        self.excluded_cooccurrences.push(CoOccurrence { target, adjacency });
        self
    }
}

// --- Entries -----------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct RootAllomorph {
    pub shape: Shape,
    pub constraints: AllomorphConstraints,
}

impl RootAllomorph {
    pub fn new(shape: Shape) -> Self {
        Self { shape, constraints: AllomorphConstraints::default() }
    }

    pub fn with_constraints(mut self, constraints: AllomorphConstraints) -> Self {
        self.constraints = constraints;
        self
    }
}

#[derive(Debug, Clone)]
pub struct LexEntry {
    pub id: MorphemeId,
    pub gloss: String,
    pub stratum: usize,
    pub syntactic_fs: crate::feature::FeatureStruct,
    pub allomorphs: Vec<RootAllomorph>,
}

/// A root allomorph returned by [`AllomorphSearch`].
#[derive(Debug, Clone, Copy)]
pub struct AllomorphHit<'a> {
    pub entry: &'a LexEntry,
    pub index: usize,
}

impl<'a> AllomorphHit<'a> {
    pub fn allomorph(&self) -> &'a RootAllomorph {
        &self.entry.allomorphs[self.index]
    }

    pub fn reference(&self) -> AllomorphRef {
        AllomorphRef { morpheme: self.entry.id.clone(), index: self.index }
    }
}

/// Lookup of root allomorphs compatible with an analysed shape.
pub trait AllomorphSearch {
    /// Every allomorph of every entry in `stratum` that has some allomorph
    /// matching `shape`. Optional nodes of `shape` may be skipped.
    fn search_root_allomorphs<'a>(&'a self, stratum: usize, shape: &Shape) -> Vec<AllomorphHit<'a>>;
}

/// In-memory lexicon with a linear search.
#[derive(Debug, Default)]
pub struct Lexicon {
    entries: Vec<LexEntry>,
    patterns: Vec<Vec<Pattern>>,
}

impl Lexicon {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, entry: LexEntry) {
        let patterns = entry.allomorphs.iter().map(|a| allomorph_pattern(&a.shape)).collect();
        self.entries.push(entry);
        self.patterns.push(patterns);
    }

    pub fn entries(&self) -> &[LexEntry] {
        &self.entries
    }

    pub fn get(&self, id: &MorphemeId) -> Option<&LexEntry> {
        self.entries.iter().find(|e| e.id == *id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Segment-only pattern that matches an analysed shape spelling this allomorph.
fn allomorph_pattern(shape: &Shape) -> Pattern {
    let children = shape
        .nodes()
        .filter(|n| n.kind == crate::shape::NodeKind::Segment)
        .map(|n| PatternNode::segment(n.fs.clone()))
        .collect();
    Pattern::new(children).filter(NodeKinds::SEGMENT).skip_optional(true)
}

impl AllomorphSearch for Lexicon {
    fn search_root_allomorphs<'a>(&'a self, stratum: usize, shape: &Shape) -> Vec<AllomorphHit<'a>> {
        let mut hits = Vec::new();
        for (entry, patterns) in self.entries.iter().zip(&self.patterns) {
            if entry.stratum != stratum {
                continue;
            }
            if patterns.iter().any(|p| p.matches_exactly(shape).is_some()) {
                hits.extend((0..entry.allomorphs.len()).map(|index| AllomorphHit { entry, index }));
            }
        }
        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::{FeatureStruct, FeatureSystem};
    use crate::shape::{NodeFlags, ShapeNode};
    use std::sync::Arc;

    fn system() -> Arc<FeatureSystem> {
        FeatureSystem::builder().binary("cons").binary("voice").build().unwrap()
    }

    fn shape(sys: &FeatureSystem, segments: &[&str]) -> Shape {
        Shape::from_nodes(segments.iter().map(|s| ShapeNode::segment(sys.parse(s).unwrap())))
    }

    fn entry(id: &str, stratum: usize, shape: Shape) -> LexEntry {
        LexEntry {
            id: MorphemeId::new(id),
            gloss: id.to_string(),
            stratum,
            syntactic_fs: FeatureStruct::new(),
            allomorphs: vec![RootAllomorph::new(shape)],
        }
    }

    #[test]
    fn search_skips_optional_nodes_and_filters_by_stratum() {
        let sys = system();
        let mut lexicon = Lexicon::new();
        lexicon.add(entry("ta", 0, shape(&sys, &["+cons -voice", "-cons +voice"])));
        lexicon.add(entry("ta-late", 1, shape(&sys, &["+cons -voice", "-cons +voice"])));

        let mut analysed = shape(&sys, &["+cons", "-cons", "+cons +voice"]);
        let last = analysed.last();
        analysed.node_mut(last).flags.insert(NodeFlags::OPTIONAL);

        let hits = lexicon.search_root_allomorphs(0, &analysed);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].entry.id, MorphemeId::new("ta"));
        assert_eq!(hits[0].reference(), AllomorphRef { morpheme: MorphemeId::new("ta"), index: 0 });
        assert!(lexicon.search_root_allomorphs(2, &analysed).is_empty());
        // Required nodes may not be skipped.
        assert!(lexicon.search_root_allomorphs(0, &shape(&sys, &["+cons", "-cons", "+cons"])).is_empty());
    }

    #[test]
    fn environments_look_outward_from_the_morph() {
        let sys = system();
        let word = shape(&sys, &["-cons", "+cons -voice", "-cons"]);
        let ids = word.ids();
        let morph = ids[1];

        let after_vowel = Environment::new(vec![PatternNode::segment(sys.parse("-cons").unwrap())], vec![]);
        assert!(after_vowel.is_satisfied(&word, morph, morph));
        assert!(!after_vowel.is_satisfied(&word, ids[0], ids[0]));

        let before_consonant = Environment::new(vec![], vec![PatternNode::segment(sys.parse("+cons").unwrap())]);
        assert!(!before_consonant.is_satisfied(&word, morph, morph));
        assert!(before_consonant.is_satisfied(&word, ids[0], ids[0]));
        assert!(Environment::default().is_satisfied(&word, morph, morph));
    }

    #[test]
    fn cooccurrence_targets_match_by_allomorph_or_morpheme() {
        let pl0 = AllomorphRef { morpheme: MorphemeId::new("PL"), index: 0 };
        let pl1 = AllomorphRef { morpheme: MorphemeId::new("PL"), index: 1 };
        assert!(CoOccurrenceTarget::Morpheme(MorphemeId::new("PL")).matches(&pl1));
        assert!(CoOccurrenceTarget::Allomorph(pl0.clone()).matches(&pl0));
        assert!(!CoOccurrenceTarget::Allomorph(pl0).matches(&pl1));

        let constraints = AllomorphConstraints::default().exclude(CoOccurrenceTarget::Morpheme(MorphemeId::new("NEG")), Adjacency::AdjacentToLeft);
        assert!(!constraints.is_empty());
        assert!(!constraints.has_environments());
    }
}
