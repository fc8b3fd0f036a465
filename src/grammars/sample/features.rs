use crate::error::FeatureError;
use crate::feature::FeatureSystem;
use crate::symbols::CharacterDefinitionTable;
use std::sync::Arc;

/// Segment inventory. Every segment is specified for every phonological
/// feature the rules mention, so an environment never matches a segment just
/// because it leaves a feature open.
const SEGMENTS: &[(&str, &str)] = &[
    // Obstruents
    ("p", "+cons -son -voice -nasal -strident place=labial"),
    ("b", "+cons -son +voice -nasal -strident place=labial"),
    ("t", "+cons -son -voice -nasal -strident place=coronal"),
    ("d", "+cons -son +voice -nasal -strident place=coronal"),
    ("k", "+cons -son -voice -nasal -strident place=dorsal"),
    ("g", "+cons -son +voice -nasal -strident place=dorsal"),
    ("s", "+cons -son -voice -nasal +strident place=coronal"),
    ("z", "+cons -son +voice -nasal +strident place=coronal"),
    // Sonorants
    ("m", "+cons +son +voice +nasal -strident place=labial"),
    ("n", "+cons +son +voice +nasal -strident place=coronal"),
    ("ŋ", "+cons +son +voice +nasal -strident place=dorsal"),
    ("l", "+cons +son +voice -nasal -strident place=coronal"),
    // Vowels
    ("a", "-cons +son +voice -nasal -strident -high +back -long"),
    ("aː", "-cons +son +voice -nasal -strident -high +back +long"),
    ("i", "-cons +son +voice -nasal -strident +high -back -long"),
    ("iː", "-cons +son +voice -nasal -strident +high -back +long"),
    ("ə", "-cons +son +voice -nasal -strident -high -back -long"),
];

/// Phonological features followed by the syntactic ones.
pub fn system() -> Result<Arc<FeatureSystem>, FeatureError> {
    FeatureSystem::builder()
        .binary("cons")
        .binary("son")
        .binary("voice")
        .binary("nasal")
        .binary("strident")
        .binary("high")
        .binary("back")
        .binary("long")
        .symbolic("place", &["labial", "coronal", "dorsal"])
        .symbolic("pos", &["n", "v"])
        .symbolic("num", &["sg", "pl"])
        .symbolic("tense", &["prs", "pst"])
        .binary("neg")
        .build()
}

pub fn table(system: Arc<FeatureSystem>) -> Result<CharacterDefinitionTable, FeatureError> {
    SEGMENTS
        .iter()
        .fold(CharacterDefinitionTable::builder(system), |builder, (symbol, notation)| builder.segment(symbol, notation))
        .boundary("+")
        .build()
}
