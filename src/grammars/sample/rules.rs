use crate::engine::{AffixAllomorph, AffixProcessRule, AffixTemplate, RewriteRule, RewriteSubrule, Slot};
use crate::error::Result;
use crate::feature::FeatureSystem;
use crate::lexicon::{AllomorphConstraints, Environment};
use crate::pattern::{AnchorSide, PatternNode};
use crate::shape::ShapeNode;
use crate::symbols::{CharacterDefinitionTable, SymbolTable};
use std::sync::Arc;

fn seg(sys: &FeatureSystem, notation: &str) -> Result<PatternNode> {
    Ok(PatternNode::segment(sys.parse(notation)?))
}

/// Segments spelled by `text`, ready to be inserted by an affix.
fn material(table: &CharacterDefinitionTable, text: &str) -> Result<Vec<ShapeNode>> {
    Ok(table.string_to_shape(text)?.nodes().cloned().collect())
}

// --- Stratum `root` ----------------------------------------------------------

/// `V → [+long] / _ C #`
pub fn lengthening(sys: &FeatureSystem) -> Result<RewriteRule> {
    RewriteRule::builder("lengthening", vec![fs!(sys, "-cons")])
        .subrule(
            RewriteSubrule::new(vec![fs!(sys, "+long")])
                .right(vec![seg(sys, "+cons")?, PatternNode::Anchor(AnchorSide::Right)]),
        )
        .build()
}

/// `d → ∅ / [+nasal] _ #`
///
/// Ordered after lengthening, so `band` keeps its short vowel.
pub fn d_deletion(sys: &FeatureSystem) -> Result<RewriteRule> {
    RewriteRule::builder("d-deletion", vec![fs!(sys, "+cons -son +voice -strident place=coronal")])
        .subrule(
            RewriteSubrule::new(vec![])
                .left(vec![seg(sys, "+nasal")?])
                .right(vec![PatternNode::Anchor(AnchorSide::Right)]),
        )
        .build()
}

// --- Stratum `word` ----------------------------------------------------------

/// `∅ → ə / [-son] _ [+nasal]`
pub fn epenthesis(sys: &FeatureSystem, table: &CharacterDefinitionTable) -> Result<RewriteRule> {
    let schwa = material(table, "ə")?.into_iter().map(|n| n.fs).collect();
    RewriteRule::builder("epenthesis", vec![])
        .subrule(RewriteSubrule::new(schwa).left(vec![seg(sys, "-son")?]).right(vec![seg(sys, "+nasal")?]))
        .build()
}

/// `[+nasal] → [α place] / _ [-son α place]`
pub fn nasal_assimilation(sys: &FeatureSystem) -> Result<RewriteRule> {
    RewriteRule::builder("nasal-assimilation", vec![fs!(sys, "+nasal")])
        .subrule(RewriteSubrule::new(vec![fs!(sys, "@a:place")]).right(vec![seg(sys, "+cons -son @a:place")?]))
        .build()
}

/// Plural `-s` after voiceless segments, `-z` after voiced ones. Nouns only.
pub fn plural(sys: &FeatureSystem, table: &CharacterDefinitionTable) -> Result<AffixProcessRule> {
    let after = |notation: &str| -> Result<AllomorphConstraints> {
        Ok(AllomorphConstraints::default().require_env(Environment::new(vec![seg(sys, notation)?], vec![])))
    };
    AffixProcessRule::builder("PL")
        .gloss("plural")
        .requires(fs!(sys, "pos=n"))
        .produces(fs!(sys, "num=pl"))
        .allomorph(AffixAllomorph::suffix(material(table, "s")?).with_constraints(after("-voice")?))
        .allomorph(AffixAllomorph::suffix(material(table, "z")?).with_constraints(after("+voice")?))
        .build()
}

pub fn negative(sys: &FeatureSystem, table: &CharacterDefinitionTable) -> Result<AffixProcessRule> {
    AffixProcessRule::builder("NEG")
        .gloss("negative")
        .produces(fs!(sys, "+neg"))
        .allomorph(AffixAllomorph::prefix(material(table, "in")?))
        .build()
}

/// Verbs take a single tense slot.
pub fn verb_template(sys: &FeatureSystem, table: &CharacterDefinitionTable) -> Result<AffixTemplate> {
    let past = AffixProcessRule::builder("PST")
        .gloss("past")
        .requires(fs!(sys, "pos=v"))
        .produces(fs!(sys, "tense=pst"))
        .allomorph(AffixAllomorph::suffix(material(table, "ta")?))
        .build()?;
    Ok(AffixTemplate::new("verb", vec![Slot::new("tense", vec![Arc::new(past)])]).requires(fs!(sys, "pos=v")))
}
