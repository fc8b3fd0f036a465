//! Phonological rewrite rules.

use super::context::RuleContext;
use super::subrule::{ApplicationMode, RewriteSubrule, Subrule};
use crate::error::{MorphError, Result};
use crate::feature::FeatureStruct;
use crate::shape::NodeFlags;
use crate::word::{RuleEvent, Word};
use crate::{Direction, Mode};
use std::sync::Arc;

/// `lhs → rhs₁ / env₁ | rhs₂ / env₂ | …`
///
/// Subrules are disjunctive and tried in order: a node rewritten by an earlier
/// subrule is not a target for a later one during the same application.
#[derive(Debug, Clone)]
pub struct RewriteRule {
    name: Arc<str>,
    lhs: Vec<FeatureStruct>,
    mode: ApplicationMode,
    direction: Direction,
    subrules: Vec<Subrule>,
}

pub struct RewriteRuleBuilder {
    name: Arc<str>,
    lhs: Vec<FeatureStruct>,
    mode: ApplicationMode,
    direction: Direction,
    subrules: Vec<RewriteSubrule>,
}

impl RewriteRuleBuilder {
    /// Apply site by site in `direction`.
    pub fn iterative(mut self, direction: Direction) -> Self {
        self.mode = ApplicationMode::Iterative;
        self.direction = direction;
        self
    }

    pub fn simultaneous(mut self) -> Self {
        self.mode = ApplicationMode::Simultaneous;
        self.direction = Direction::LeftToRight;
        self
    }

    pub fn subrule(mut self, subrule: RewriteSubrule) -> Self {
        self.subrules.push(subrule);
        self
    }

    pub fn build(self) -> Result<RewriteRule> {
        if self.subrules.is_empty() {
            return Err(MorphError::InvalidRule { rule: self.name.to_string(), reason: "no subrules".to_string() });
        }
        let subrules = self
            .subrules
            .into_iter()
            .map(|def| Subrule::compile(self.name.clone(), &self.lhs, def, self.mode, self.direction))
            .collect::<Result<Vec<_>>>()?;
        Ok(RewriteRule { name: self.name, lhs: self.lhs, mode: self.mode, direction: self.direction, subrules })
    }
}

impl RewriteRule {
    pub fn builder(name: &str, lhs: Vec<FeatureStruct>) -> RewriteRuleBuilder {
        RewriteRuleBuilder {
            name: Arc::from(name),
            lhs,
            mode: ApplicationMode::Simultaneous,
            direction: Direction::LeftToRight,
            subrules: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn lhs(&self) -> &[FeatureStruct] {
        &self.lhs
    }

    pub fn mode(&self) -> ApplicationMode {
        self.mode
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn subrules(&self) -> &[Subrule] {
        &self.subrules
    }

    fn eligible<'a>(&'a self, word: &'a Word) -> impl Iterator<Item = &'a Subrule> + 'a {
        self.subrules.iter().filter(move |sr| sr.required_syntactic_fs().is_unifiable(word.syntactic_fs()))
    }

    /// Whether synthesis would find at least one site.
    pub fn is_applicable(&self, word: &Word) -> bool {
        self.eligible(word).any(|sr| sr.pattern(Mode::Synthesis).is_match(word.shape()))
    }

    /// Synthesis. `None` when no subrule found a site.
    pub fn apply(&self, word: &Word, ctx: &RuleContext<'_>) -> Result<Option<Word>> {
        self.run(Mode::Synthesis, word, ctx)
    }

    /// Analysis. `None` when nothing could be undone.
    pub fn unapply(&self, word: &Word, ctx: &RuleContext<'_>) -> Result<Option<Word>> {
        self.run(Mode::Analysis, word, ctx)
    }

    fn run(&self, mode: Mode, word: &Word, ctx: &RuleContext<'_>) -> Result<Option<Word>> {
        let mut out = word.fork();
        let mut changed = false;
        for sr in self.eligible(word) {
            changed |= sr.run(out.shape_mut(), mode, self.mode, ctx)?;
        }
        out.shape_mut().clear_flag(NodeFlags::SEARCHED);

        if !changed {
            ctx.trace.rule_not_applied(mode, &self.name, word);
            return Ok(None);
        }
        tracing::debug!(rule = %self.name, ?mode, len = out.shape().len(), "rewrite rule ran");
        match mode {
            Mode::Synthesis => {
                out.record(RuleEvent::Applied(self.name.clone()));
                ctx.trace.rule_applied(&self.name, word, &out);
            }
            Mode::Analysis => {
                out.record(RuleEvent::Unapplied(self.name.clone()));
                ctx.trace.rule_unapplied(&self.name, word, &out);
            }
        }
        Ok(Some(out))
    }
}
