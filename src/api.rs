use crate::engine::{Morpher, MorpherOptions, ParseReport, TraceEvent, TraceMask, TraceRecorder};
use crate::error::MorphError;
use crate::grammars;
use crate::lexicon::MorphemeId;
use crate::symbols::SymbolTable;
use crate::word::Word;
use crate::Language;
use once_cell::sync::Lazy;
use std::sync::Arc;
use std::time::Duration;

static DEFAULT_LANGUAGE: Lazy<Result<Arc<Language>, MorphError>> =
    Lazy::new(|| grammars::sample::language().map(Arc::new));

/// Options that affect parsing behavior.
#[derive(Debug, Clone, Default)]
pub struct Options {
    /// Engine configuration.
    pub morpher: MorpherOptions,
    /// Record every trace event in [`ParseDetails::trace`], whatever
    /// `morpher.trace` selects.
    pub verbose: bool,
}

/// One decomposition of the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Analysis {
    /// Morpheme ids joined with `+`, root first, e.g. `"kat+PL"`.
    pub underlying: String,
    /// Glosses joined with `-`, e.g. `"cat-plural"`.
    pub gloss: String,
    /// `(morpheme, allomorph index)` in the same order as `underlying`.
    pub allomorphs: Vec<(String, usize)>,
    /// Sum of allomorph indices; lower is more specific.
    pub rank: usize,
}

/// Result from [`parse`] and [`parse_with`].
#[derive(Debug, Clone)]
pub struct ParseResult {
    /// The parsed input text.
    pub text: String,
    /// Valid decompositions, most specific first.
    pub results: Vec<Analysis>,
    /// Total elapsed time.
    pub elapsed: Duration,
}

/// A compact view of one intermediate hypothesis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateSummary {
    /// Shape with boundaries; optional nodes are kept.
    pub shape: String,
    /// Morphemes bound so far, joined with `+`.
    pub morphemes: String,
    /// Morphemes synthesis still has to apply, next one last.
    pub pending: Vec<String>,
}

/// Per-phase trace of a verbose parse.
#[derive(Debug, Clone)]
pub struct PhaseSummary {
    pub phase: &'static str,
    pub duration: Duration,
    pub produced: usize,
    pub samples: Vec<CandidateSummary>,
}

/// Additional details returned by [`parse_verbose`] and [`parse_verbose_with`].
#[derive(Debug, Clone)]
pub struct ParseDetails {
    pub total: Duration,
    /// Analysis, lookup, synthesis and validation, in that order.
    pub phases: Vec<PhaseSummary>,
    /// Strata names, deepest first.
    pub strata: Vec<String>,
    /// Trace events selected by the options.
    pub trace: Vec<TraceEvent>,
}

/// Result from [`parse_verbose`] and [`parse_verbose_with`].
#[derive(Debug, Clone)]
pub struct ParseResultVerbose {
    pub text: String,
    pub results: Vec<Analysis>,
    pub elapsed: Duration,
    pub details: ParseDetails,
}

/// Samples kept per phase in [`PhaseSummary::samples`].
const SAMPLES_PER_PHASE: usize = 8;

fn default_morpher(options: &Options) -> Result<Morpher, MorphError> {
    let language = DEFAULT_LANGUAGE.as_ref().map_err(Clone::clone)?;
    Ok(Morpher::new(language.clone(), options.morpher.clone()))
}

/// Parse `text` with the built-in sample grammar and default options.
///
/// # Example
/// ```
/// use phonomorph::parse;
///
/// let out = parse("kaːts").unwrap();
/// assert_eq!(out.results[0].underlying, "kat+PL");
/// ```
pub fn parse(text: &str) -> Result<ParseResult, MorphError> {
    parse_with(text, &Options::default())
}

/// Parse `text` with the built-in sample grammar and the provided `options`.
pub fn parse_with(text: &str, options: &Options) -> Result<ParseResult, MorphError> {
    let morpher = default_morpher(options)?;
    let report = morpher.parse_word_detailed(text, &crate::engine::NoTrace)?;
    Ok(ParseResult {
        text: text.to_string(),
        results: report.results.iter().map(|w| to_analysis(&morpher, w)).collect(),
        elapsed: report.metrics.total,
    })
}

pub fn parse_verbose(text: &str) -> Result<ParseResultVerbose, MorphError> {
    parse_verbose_with(text, &Options::default())
}

/// Parse `text` and keep per-phase hypotheses, timings and trace events.
///
/// The default [`parse_with`] path records none of these.
pub fn parse_verbose_with(text: &str, options: &Options) -> Result<ParseResultVerbose, MorphError> {
    let morpher = default_morpher(options)?;
    parse_verbose_on(&morpher, text, options.verbose)
}

/// [`parse_verbose_with`] against any morpher.
pub fn parse_verbose_on(morpher: &Morpher, text: &str, verbose: bool) -> Result<ParseResultVerbose, MorphError> {
    let mask = if verbose { TraceMask::ALL } else { morpher.options().trace };
    let recorder = TraceRecorder::new(mask);
    let report = morpher.parse_word_detailed(text, &recorder)?;

    let results = report.results.iter().map(|w| to_analysis(morpher, w)).collect();
    let details = ParseDetails {
        total: report.metrics.total,
        phases: phases(morpher, &report),
        strata: morpher.language().strata().iter().map(|s| s.name().to_string()).collect(),
        trace: recorder.into_events(),
    };

    Ok(ParseResultVerbose { text: text.to_string(), results, elapsed: report.metrics.total, details })
}

fn phases(morpher: &Morpher, report: &ParseReport) -> Vec<PhaseSummary> {
    let words: [&[Word]; 4] = [&report.analyses, &report.candidates, &report.synthesized, &report.results];
    report
        .metrics
        .phases()
        .into_iter()
        .zip(words)
        .map(|((phase, metrics), words)| PhaseSummary {
            phase,
            duration: metrics.duration,
            produced: metrics.produced,
            samples: words.iter().take(SAMPLES_PER_PHASE).map(|w| to_summary(morpher, w)).collect(),
        })
        .collect()
}

fn to_analysis(morpher: &Morpher, word: &Word) -> Analysis {
    let morphemes = word.morphemes();
    Analysis {
        underlying: join(&morphemes, "+"),
        gloss: morphemes.iter().map(|m| gloss(morpher, m)).collect::<Vec<_>>().join("-"),
        allomorphs: word.allomorphs().iter().map(|a| (a.morpheme.to_string(), a.index)).collect(),
        rank: word.allomorph_rank(),
    }
}

fn to_summary(morpher: &Morpher, word: &Word) -> CandidateSummary {
    CandidateSummary {
        shape: morpher.language().table().shape_to_string(word.shape(), true, false),
        morphemes: join(&word.morphemes(), "+"),
        pending: word.pending().iter().map(MorphemeId::to_string).collect(),
    }
}

/// Lexical gloss for roots, rule gloss for affixes, the id otherwise.
fn gloss(morpher: &Morpher, id: &MorphemeId) -> String {
    if let Some(entry) = morpher.language().lexicon().get(id) {
        return entry.gloss.clone();
    }
    morpher.rules().gloss(id).unwrap_or(id.as_str()).to_string()
}

fn join(ids: &[MorphemeId], sep: &str) -> String {
    ids.iter().map(MorphemeId::as_str).collect::<Vec<_>>().join(sep)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_returns_analyses() {
        let res = parse("kaːts").unwrap();

        assert_eq!(res.text, "kaːts");
        assert!(res.elapsed >= Duration::ZERO);

        let plural = &res.results[0];
        assert_eq!(plural.underlying, "kat+PL");
        assert_eq!(plural.gloss, "cat-plural");
        assert_eq!(plural.allomorphs, vec![("kat".to_string(), 0), ("PL".to_string(), 0)]);
        assert_eq!(plural.rank, 0);
    }

    #[test]
    fn parse_reports_segmentation_errors() {
        assert!(matches!(parse("kax"), Err(MorphError::InvalidShape { position: 2, .. })));
    }

    #[test]
    fn parse_with_honours_max_results() {
        let options = Options { morpher: MorpherOptions { max_results: Some(0), ..Default::default() }, verbose: false };
        assert!(parse_with("kaːt", &options).unwrap().results.is_empty());
    }

    #[test]
    fn parse_verbose_includes_phases_and_trace() {
        let res = parse_verbose_with("banz", &Options { verbose: true, ..Options::default() }).unwrap();

        assert_eq!(res.text, "banz");
        assert_eq!(res.elapsed, res.details.total);
        let names: Vec<&str> = res.details.phases.iter().map(|p| p.phase).collect();
        assert_eq!(names, ["analysis", "lookup", "synthesis", "validation"]);
        assert!(res.details.phases.iter().all(|p| p.samples.len() <= SAMPLES_PER_PHASE));
        assert_eq!(res.details.strata, ["root", "word"]);
        assert!(res.details.trace.iter().any(|e| matches!(e, TraceEvent::SuccessfulParse { .. })));
        assert_eq!(res.results[0].gloss, "band-plural");

        let quiet = parse_verbose("banz").unwrap();
        assert!(quiet.details.trace.is_empty());
        assert_eq!(quiet.results, res.results);
    }

    #[test]
    fn candidate_summaries_show_pending_morphemes() {
        let res = parse_verbose("kaːts").unwrap();
        let lookup = &res.details.phases[1];
        assert!(lookup.samples.iter().any(|c| c.morphemes == "kat" && c.pending == ["PL"]));
    }
}
