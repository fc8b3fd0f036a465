//! Deduplication of word hypotheses.
//!
//! Different rule orders routinely converge on the same hypothesis. Every
//! cascade collects its outputs in a [`WordSet`], which keeps the first word
//! seen for each [`WordKey`] and preserves insertion order, so runs are
//! deterministic.
//!
//! ## What counts as "the same word"
//!
//! The key covers the shape (content, optionality, morph spans), the stratum,
//! the syntactic feature structure, the root, the pending morphemes and the
//! realized allomorphs. The rule history is deliberately left out: two
//! derivations of the same hypothesis are one hypothesis.

use crate::word::{Word, WordKey};
use std::collections::HashSet;

#[derive(Debug, Default, Clone)]
pub struct WordSet {
    seen: HashSet<WordKey>,
    words: Vec<Word>,
}

impl WordSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `word` unless an equivalent one is present; returns whether it was added.
    pub fn insert(&mut self, word: Word) -> bool {
        if !self.seen.insert(word.key().clone()) {
            return false;
        }
        self.words.push(word);
        true
    }

    pub fn contains(&self, word: &Word) -> bool {
        self.seen.contains(word.key())
    }

    pub fn extend(&mut self, words: impl IntoIterator<Item = Word>) {
        for word in words {
            self.insert(word);
        }
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Word> {
        self.words.iter()
    }

    pub fn into_vec(self) -> Vec<Word> {
        self.words
    }
}

impl FromIterator<Word> for WordSet {
    fn from_iter<I: IntoIterator<Item = Word>>(iter: I) -> Self {
        let mut set = WordSet::new();
        set.extend(iter);
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::FeatureStruct;
    use crate::shape::{Shape, ShapeNode};
    use crate::word::RuleEvent;
    use std::sync::Arc;

    #[test]
    fn equivalent_derivations_collapse() {
        let word = Word::new(Shape::from_nodes([ShapeNode::segment(FeatureStruct::new())]), 0);
        let mut via_rule = word.fork();
        via_rule.record(RuleEvent::Applied(Arc::from("r1")));
        let mut other_stratum = word.fork();
        other_stratum.set_stratum(1);

        let set: WordSet = [word, via_rule, other_stratum].into_iter().collect();
        assert_eq!(set.len(), 2);
        assert!(set.iter().next().is_some_and(|w| w.history().is_empty()));
    }
}
