use super::trace::{NoTrace, TraceMask, TraceSink};

/// Hard cap on shape length used when no other limit is configured.
pub const DEFAULT_MAX_SHAPE_LEN: usize = 256;

/// Engine configuration shared by every rule application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MorpherOptions {
    /// Extra passes allowed for deletion and widening unapplication (and
    /// simultaneous deletion reapplication). A bound of `k` allows `k + 1` passes.
    pub deletion_reapplications: usize,
    /// Insertions that would grow a shape past this many nodes abort the branch.
    pub max_shape_len: usize,
    /// Trace events recorded by [`crate::Morpher::parse_word_traced`].
    pub trace: TraceMask,
    /// Keep at most this many ranked results.
    pub max_results: Option<usize>,
}

impl Default for MorpherOptions {
    fn default() -> Self {
        MorpherOptions {
            deletion_reapplications: 0,
            max_shape_len: DEFAULT_MAX_SHAPE_LEN,
            trace: TraceMask::empty(),
            max_results: None,
        }
    }
}

/// What a rule may see of the engine while it runs: configuration plus the
/// trace hook. Passed down explicitly so rules never hold a morpher reference.
#[derive(Clone, Copy)]
pub struct RuleContext<'a> {
    pub options: &'a MorpherOptions,
    pub trace: &'a dyn TraceSink,
}

static NO_TRACE: NoTrace = NoTrace;

impl<'a> RuleContext<'a> {
    pub fn new(options: &'a MorpherOptions, trace: &'a dyn TraceSink) -> Self {
        RuleContext { options, trace }
    }

    /// Context with the no-op trace sink.
    pub fn untraced(options: &'a MorpherOptions) -> Self {
        RuleContext { options, trace: &NO_TRACE }
    }

    /// Number of passes a bounded reapplication loop may run.
    pub fn reapplication_passes(&self) -> usize {
        self.options.deletion_reapplications.saturating_add(1)
    }
}

impl std::fmt::Debug for RuleContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleContext").field("options", self.options).finish_non_exhaustive()
    }
}
