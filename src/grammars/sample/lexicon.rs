use crate::error::Result;
use crate::feature::FeatureSystem;
use crate::lexicon::{LexEntry, Lexicon, MorphemeId, RootAllomorph};
use crate::symbols::{CharacterDefinitionTable, SymbolTable};

/// `(form, gloss, category)`; the form doubles as the morpheme id.
const ROOTS: &[(&str, &str, &str)] = &[
    ("kat", "cat", "pos=n"),
    ("band", "band", "pos=n"),
    ("spn", "spoon", "pos=n"),
    ("pat", "pat", "pos=v"),
];

pub fn lexicon(sys: &FeatureSystem, table: &CharacterDefinitionTable) -> Result<Lexicon> {
    let mut lexicon = Lexicon::new();
    for (form, gloss, category) in ROOTS {
        lexicon.add(LexEntry {
            id: MorphemeId::new(form),
            gloss: gloss.to_string(),
            stratum: 0,
            syntactic_fs: sys.parse(category)?,
            allomorphs: vec![RootAllomorph::new(table.string_to_shape(form)?)],
        });
    }
    Ok(lexicon)
}
