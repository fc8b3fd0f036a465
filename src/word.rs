//! Word hypotheses.
//!
//! A [`Word`] is one branch of the search: a shape plus the morphological
//! bookkeeping needed to re-derive it. Rules never mutate their input word;
//! they [`fork`](Word::fork) it and edit the copy.
//!
//! ```text
//! analysis:  surface ──unapply──> Word { pending: [PL], root: None }
//! lookup:                  └────> Word { pending: [PL], root: cat#0 }
//! synthesis:                         apply PL ──> Word { pending: [], allomorphs: [cat#0, PL#1] }
//! ```
//!
//! A compound carries its non-head members on a stack of their own: analysis
//! pushes an unbound member, lexical lookup binds it to a root and synthesis
//! pops it when the compounding rule applies again.
//!
//! The structural key (everything except the rule history) is computed once
//! and cached; any mutable access drops the cache.

use crate::feature::FeatureStruct;
use crate::lexicon::{AllomorphRef, MorphemeId};
use crate::shape::{ShapeKey, Shape};
use once_cell::sync::OnceCell;
use std::sync::Arc;

/// An entry of a word's derivation history.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RuleEvent {
    Unapplied(Arc<str>),
    Applied(Arc<str>),
}

/// Structural identity of a word hypothesis.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WordKey {
    shape: ShapeKey,
    stratum: usize,
    syntactic_fs: FeatureStruct,
    realizational_fs: FeatureStruct,
    root: Option<AllomorphRef>,
    pending: Vec<MorphemeId>,
    non_heads: Vec<WordKey>,
    allomorphs: Vec<AllomorphRef>,
}

#[derive(Debug, Clone)]
pub struct Word {
    shape: Shape,
    stratum: usize,
    syntactic_fs: FeatureStruct,
    realizational_fs: FeatureStruct,
    root: Option<AllomorphRef>,
    pending: Vec<MorphemeId>,
    non_heads: Vec<Word>,
    applied: Vec<MorphemeId>,
    allomorphs: Vec<AllomorphRef>,
    history: Vec<RuleEvent>,
    key: OnceCell<WordKey>,
}

impl Word {
    pub fn new(shape: Shape, stratum: usize) -> Self {
        Word {
            shape,
            stratum,
            syntactic_fs: FeatureStruct::new(),
            realizational_fs: FeatureStruct::new(),
            root: None,
            pending: Vec::new(),
            non_heads: Vec::new(),
            applied: Vec::new(),
            allomorphs: Vec::new(),
            history: Vec::new(),
            key: OnceCell::new(),
        }
    }

    /// Copy for a new branch.
    pub fn fork(&self) -> Word {
        let mut word = self.clone();
        word.key = OnceCell::new();
        word
    }

    pub fn key(&self) -> &WordKey {
        self.key.get_or_init(|| WordKey {
            shape: self.shape.key(),
            stratum: self.stratum,
            syntactic_fs: self.syntactic_fs.clone(),
            realizational_fs: self.realizational_fs.clone(),
            root: self.root.clone(),
            pending: self.pending.clone(),
            non_heads: self.non_heads.iter().map(|w| w.key().clone()).collect(),
            allomorphs: self.allomorphs.clone(),
        })
    }

    fn touch(&mut self) {
        self.key = OnceCell::new();
    }

    // --- Shape -----------------------------------------------------------------

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn shape_mut(&mut self) -> &mut Shape {
        self.touch();
        &mut self.shape
    }

    pub fn set_shape(&mut self, shape: Shape) {
        self.touch();
        self.shape = shape;
    }

    // --- Stratum and features ----------------------------------------------------

    pub fn stratum(&self) -> usize {
        self.stratum
    }

    pub fn set_stratum(&mut self, stratum: usize) {
        self.touch();
        self.stratum = stratum;
    }

    pub fn syntactic_fs(&self) -> &FeatureStruct {
        &self.syntactic_fs
    }

    pub fn set_syntactic_fs(&mut self, fs: FeatureStruct) {
        self.touch();
        self.syntactic_fs = fs;
    }

    /// Features inflectional rules still have to realize.
    pub fn realizational_fs(&self) -> &FeatureStruct {
        &self.realizational_fs
    }

    pub fn set_realizational_fs(&mut self, fs: FeatureStruct) {
        self.touch();
        self.realizational_fs = fs;
    }

    // --- Morphemes ---------------------------------------------------------------

    pub fn root(&self) -> Option<&AllomorphRef> {
        self.root.as_ref()
    }

    /// Bind the root allomorph; resets the allomorph list to the root alone.
    pub fn set_root(&mut self, root: AllomorphRef) {
        self.touch();
        self.allomorphs = vec![root.clone()];
        self.root = Some(root);
    }

    /// Morphemes unapplied during analysis that synthesis still has to apply;
    /// the last one is applied next.
    pub fn pending(&self) -> &[MorphemeId] {
        &self.pending
    }

    pub fn push_pending(&mut self, id: MorphemeId) {
        self.touch();
        self.pending.push(id);
    }

    pub fn next_pending(&self) -> Option<&MorphemeId> {
        self.pending.last()
    }

    pub fn pop_pending(&mut self) -> Option<MorphemeId> {
        self.touch();
        self.pending.pop()
    }

    pub fn set_pending(&mut self, pending: Vec<MorphemeId>) {
        self.touch();
        self.pending = pending;
    }

    pub fn pending_count(&self, id: &MorphemeId) -> usize {
        self.pending.iter().filter(|m| *m == id).count()
    }

    // --- Compound members -------------------------------------------------------

    /// Non-head members still to be compounded; the last one is next.
    pub fn non_heads(&self) -> &[Word] {
        &self.non_heads
    }

    pub fn next_non_head(&self) -> Option<&Word> {
        self.non_heads.last()
    }

    pub fn push_non_head(&mut self, word: Word) {
        self.touch();
        self.non_heads.push(word);
    }

    pub fn pop_non_head(&mut self) -> Option<Word> {
        self.touch();
        self.non_heads.pop()
    }

    pub fn set_non_heads(&mut self, non_heads: Vec<Word>) {
        self.touch();
        self.non_heads = non_heads;
    }

    /// Record that compounding rule `rule` joined the non-head rooted in `member`.
    pub fn record_compound(&mut self, rule: MorphemeId, member: AllomorphRef) {
        self.touch();
        self.applied.push(rule);
        self.allomorphs.push(member);
    }

    /// Morphological rules applied during synthesis, in order.
    pub fn applied(&self) -> &[MorphemeId] {
        &self.applied
    }

    pub fn applied_count(&self, id: &MorphemeId) -> usize {
        self.applied.iter().filter(|m| *m == id).count()
    }

    /// Record that allomorph `allomorph` of a morphological rule was realized.
    pub fn record_morph(&mut self, allomorph: AllomorphRef) {
        self.touch();
        self.applied.push(allomorph.morpheme.clone());
        self.allomorphs.push(allomorph);
    }

    /// Root first, then affixes in application order.
    pub fn allomorphs(&self) -> &[AllomorphRef] {
        &self.allomorphs
    }

    pub fn morphemes(&self) -> Vec<MorphemeId> {
        self.allomorphs.iter().map(|a| a.morpheme.clone()).collect()
    }

    /// Sum of allomorph indices; lower means more specific allomorphs.
    pub fn allomorph_rank(&self) -> usize {
        self.allomorphs.iter().map(|a| a.index).sum()
    }

    // --- History -----------------------------------------------------------------

    pub fn history(&self) -> &[RuleEvent] {
        &self.history
    }

    pub fn record(&mut self, event: RuleEvent) {
        self.history.push(event);
    }

    pub fn was_unapplied(&self, rule: &str) -> bool {
        self.history.iter().any(|e| matches!(e, RuleEvent::Unapplied(name) if name.as_ref() == rule))
    }

    pub fn was_applied(&self, rule: &str) -> bool {
        self.history.iter().any(|e| matches!(e, RuleEvent::Applied(name) if name.as_ref() == rule))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::ShapeNode;

    #[test]
    fn history_does_not_affect_identity() {
        let shape = Shape::from_nodes([ShapeNode::segment(FeatureStruct::new())]);
        let a = Word::new(shape, 0);
        let mut b = a.fork();
        b.record(RuleEvent::Unapplied(Arc::from("lengthening")));
        assert_eq!(a.key(), b.key());
        assert!(b.was_unapplied("lengthening"));
    }

    #[test]
    fn mutation_invalidates_cached_key() {
        let mut word = Word::new(Shape::new(), 0);
        let before = word.key().clone();
        word.push_pending(MorphemeId::new("PL"));
        assert_ne!(word.key(), &before);
        assert_eq!(word.pop_pending(), Some(MorphemeId::new("PL")));
        assert_eq!(word.key(), &before);
    }

    #[test]
    fn non_heads_are_part_of_identity() {
        let head = Word::new(Shape::new(), 0);
        let mut member = Word::new(Shape::from_nodes([ShapeNode::segment(FeatureStruct::new())]), 0);
        let mut compound = head.fork();
        compound.push_non_head(member.clone());
        assert_ne!(compound.key(), head.key());

        let before = compound.key().clone();
        member.set_root(AllomorphRef { morpheme: MorphemeId::new("dog"), index: 0 });
        compound.set_non_heads(vec![member]);
        assert_ne!(compound.key(), &before);
        assert_eq!(compound.pop_non_head().and_then(|w| w.root().cloned()).map(|r| r.morpheme), Some(MorphemeId::new("dog")));
    }

    #[test]
    fn root_starts_the_allomorph_list() {
        let mut word = Word::new(Shape::new(), 0);
        word.set_root(AllomorphRef { morpheme: MorphemeId::new("cat"), index: 1 });
        word.record_morph(AllomorphRef { morpheme: MorphemeId::new("PL"), index: 0 });
        assert_eq!(word.morphemes(), vec![MorphemeId::new("cat"), MorphemeId::new("PL")]);
        assert_eq!(word.allomorph_rank(), 1);
        assert_eq!(word.applied_count(&MorphemeId::new("PL")), 1);
    }
}
