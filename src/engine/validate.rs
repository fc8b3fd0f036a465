//! Word validation, disjunctive allomorph precedence and ranking.
//!
//! A synthesized word is only a result if every morpheme and compound member
//! analysis queued has been realized, the features it was asked to realize
//! agree with what it ended up with, and every realized allomorph is happy
//! where it ended up:
//! its environments match the surrounding surface and its co-occurrence
//! requirements are met by the other morphs of the word.
//!
//! Among valid words with the same morphemes, a word that used a later
//! (less specific) allomorph where another result used an earlier one loses,
//! unless the two allomorphs free-fluctuate.

use super::compiled_rules::AllomorphCatalog;
use crate::lexicon::{Adjacency, AllomorphConstraints, AllomorphRef, CoOccurrence};
use crate::shape::Shape;
use crate::word::Word;

/// `Err` carries the reason the word was rejected.
pub fn is_word_valid(word: &Word, catalog: &AllomorphCatalog<'_>) -> Result<(), String> {
    if let Some(pending) = word.next_pending() {
        return Err(format!("morpheme {pending} was never applied"));
    }
    if !word.non_heads().is_empty() {
        return Err("a compound member was never joined".to_string());
    }
    if !word.realizational_fs().is_unifiable(word.syntactic_fs()) {
        return Err("realizational features contradict the word's features".to_string());
    }
    let shape = word.shape();
    let spans = shape.morphs_in_order();
    let order: Vec<&AllomorphRef> = spans.iter().map(|s| &s.allomorph).collect();

    for (position, span) in spans.iter().enumerate() {
        let Some(constraints) = catalog.constraints(&span.allomorph) else { continue };
        if !environments_hold(constraints, shape, span.start, span.end) {
            return Err(format!("environment of {} not met", describe(&span.allomorph)));
        }
        if !cooccurrences_hold(constraints, &order, Some(position), word.allomorphs()) {
            return Err(format!("co-occurrence of {} not met", describe(&span.allomorph)));
        }
    }
    // Allomorphs that left no span of their own (pure modification) only get
    // the position-free checks.
    for allomorph in word.allomorphs() {
        if order.contains(&allomorph) {
            continue;
        }
        let Some(constraints) = catalog.constraints(allomorph) else { continue };
        if !cooccurrences_hold(constraints, &order, None, word.allomorphs()) {
            return Err(format!("co-occurrence of {} not met", describe(allomorph)));
        }
    }
    Ok(())
}

fn describe(allomorph: &AllomorphRef) -> String {
    format!("{}#{}", allomorph.morpheme, allomorph.index)
}

fn environments_hold(
    constraints: &AllomorphConstraints,
    shape: &Shape,
    start: crate::shape::NodeId,
    end: crate::shape::NodeId,
) -> bool {
    let required = constraints.required_environments.is_empty()
        || constraints.required_environments.iter().any(|env| env.is_satisfied(shape, start, end));
    required && !constraints.excluded_environments.iter().any(|env| env.is_satisfied(shape, start, end))
}

fn cooccurrences_hold(
    constraints: &AllomorphConstraints,
    order: &[&AllomorphRef],
    position: Option<usize>,
    all: &[AllomorphRef],
) -> bool {
    constraints.required_cooccurrences.iter().all(|c| cooccurs(c, order, position, all))
        && !constraints.excluded_cooccurrences.iter().any(|c| cooccurs(c, order, position, all))
}

fn cooccurs(rule: &CoOccurrence, order: &[&AllomorphRef], position: Option<usize>, all: &[AllomorphRef]) -> bool {
    let Some(p) = position else {
        return rule.adjacency == Adjacency::Anywhere && all.iter().any(|a| rule.target.matches(a));
    };
    order.iter().enumerate().any(|(q, other)| {
        q != p
            && rule.target.matches(other)
            && match rule.adjacency {
                Adjacency::Anywhere => true,
                Adjacency::SomewhereToLeft => q < p,
                Adjacency::SomewhereToRight => q > p,
                Adjacency::AdjacentToLeft => q + 1 == p,
                Adjacency::AdjacentToRight => q == p + 1,
            }
    })
}

/// Whether `a` and `b` may both surface: every allomorph from the lower index
/// up to the higher one carries the same constraints.
///
/// Panics if the allomorphs belong to different morphemes.
pub fn free_fluctuates(a: &AllomorphRef, b: &AllomorphRef, catalog: &AllomorphCatalog<'_>) -> bool {
    assert_eq!(a.morpheme, b.morpheme, "allomorphs of different morphemes cannot fluctuate");
    let (lo, hi) = if a.index <= b.index { (a.index, b.index) } else { (b.index, a.index) };
    let constraints = |index| catalog.constraints(&AllomorphRef { morpheme: a.morpheme.clone(), index });
    let first = constraints(lo);
    (lo + 1..=hi).all(|index| constraints(index) == first)
}

/// Drop every word beaten by a more specific allomorph choice.
pub fn check_disjunction(words: Vec<Word>, catalog: &AllomorphCatalog<'_>) -> Vec<Word> {
    let beaten: Vec<bool> = words.iter().map(|w| words.iter().any(|other| beats(other, w, catalog))).collect();
    words
        .into_iter()
        .zip(beaten)
        .filter_map(|(word, beaten)| {
            if beaten {
                tracing::debug!(morphemes = ?word.morphemes(), "dropped by a more specific allomorph");
            }
            (!beaten).then_some(word)
        })
        .collect()
}

/// `winner` differs from `loser` in exactly one allomorph, where it uses a
/// lower index that does not free-fluctuate with the loser's.
fn beats(winner: &Word, loser: &Word, catalog: &AllomorphCatalog<'_>) -> bool {
    let (w, l) = (winner.allomorphs(), loser.allomorphs());
    if w.len() != l.len() || w.iter().zip(l).any(|(a, b)| a.morpheme != b.morpheme) {
        return false;
    }
    let mut differing = w.iter().zip(l).filter(|(a, b)| a.index != b.index);
    match (differing.next(), differing.next()) {
        (Some((a, b)), None) => a.index < b.index && !free_fluctuates(a, b, catalog),
        _ => false,
    }
}

/// Most specific first, then by rendered form.
pub fn rank(words: &mut [Word], render: impl Fn(&Word) -> String) {
    words.sort_by_cached_key(|w| (w.allomorph_rank(), render(w)));
}
