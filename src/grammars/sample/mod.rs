//! A toy language exercising every kind of rule the engine supports.
//!
//! ```text
//! stratum root   lengthening      V → [+long] / _ C #          kat → kaːt
//!                d-deletion       d → ∅ / [+nasal] _ #          band → ban
//! stratum word   PL               -s / [-voice] _ | -z / [+voice] _
//!                NEG              in-
//!                verb template    tense slot: PST -ta
//!                epenthesis       ∅ → ə / [-son] _ [+nasal]     spn → spən
//!                nasal-assim.     [+nasal] → [α place] / _ [-son α place]
//! ```
//!
//! Roots are cycled through `root` before any affix is attached, so `kat+PL`
//! surfaces as `kaːts`.

mod features;
mod lexicon;
mod rules;

pub use features::{system, table};

use crate::engine::{Language, Stratum};
use crate::error::Result;

pub fn language() -> Result<Language> {
    let sys = features::system()?;
    let table = features::table(sys.clone())?;
    let lexicon = lexicon::lexicon(&sys, &table)?;

    let root = Stratum::new("root").prule(rules::lengthening(&sys)?).prule(rules::d_deletion(&sys)?);
    let word = Stratum::new("word")
        .mrule(rules::plural(&sys, &table)?)
        .mrule(rules::negative(&sys, &table)?)
        .template(rules::verb_template(&sys, &table)?)
        .prule(rules::epenthesis(&sys, &table)?)
        .prule(rules::nasal_assimilation(&sys)?);

    Ok(Language::new("sample", sys, table, lexicon).stratum(root).stratum(word))
}
