//! Rule composition.
//!
//! Every rule kind is a variant of the closed [`Rule`] enum, and every way of
//! combining rules is a [`CascadeOrder`]. A cascade is where hypotheses fork,
//! so it is also where branch-local errors are caught: the failing branch is
//! logged, reported to the trace sink and dropped while its siblings continue.
//!
//! ```text
//! Linear        first rule that applies wins
//! Pipeline      every rule in turn; a rule that does not apply passes the word on
//! Combination   every subset of the rules, applied in declared order
//! Permutation   every ordering of every subset of the rules
//! ```

use super::affix::AffixProcessRule;
use super::compound::CompoundingRule;
use super::context::RuleContext;
use super::dedup::WordSet;
use super::realizational::RealizationalRule;
use super::rewrite::RewriteRule;
use super::template::AffixTemplate;
use crate::Mode;
use crate::error::Result;
use crate::word::Word;
use std::sync::Arc;

/// Result of running one rule on one word.
#[derive(Debug)]
pub(crate) enum Outcome {
    /// The rule had nothing to do; the input stands.
    NotApplied,
    /// The rule ran. An empty list means every branch it opened was dropped.
    Applied(Vec<Word>),
}

impl Outcome {
    fn from_words(words: Vec<Word>) -> Self {
        if words.is_empty() { Outcome::NotApplied } else { Outcome::Applied(words) }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CascadeOrder {
    Linear,
    #[default]
    Pipeline,
    Combination,
    Permutation,
}

#[derive(Debug, Clone)]
pub enum Rule {
    Rewrite(Arc<RewriteRule>),
    Affix(Arc<AffixProcessRule>),
    Realizational(Arc<RealizationalRule>),
    /// A compounding rule; analysis looks its non-heads up in `stratum`.
    Compound { stratum: usize, rule: Arc<CompoundingRule> },
    Template(Arc<AffixTemplate>),
    Cascade(RuleCascade),
    /// A stratum's cascade, tagging its outputs with the stratum index.
    Stratum { index: usize, name: Arc<str>, body: Box<RuleCascade> },
}

impl Rule {
    pub fn name(&self) -> &str {
        match self {
            Rule::Rewrite(r) => r.name(),
            Rule::Affix(r) => r.name(),
            Rule::Realizational(r) => r.name(),
            Rule::Compound { rule, .. } => rule.name(),
            Rule::Template(t) => t.name(),
            Rule::Cascade(_) => "cascade",
            Rule::Stratum { name, .. } => name,
        }
    }

    /// Whether synthesis could change `word`.
    pub fn is_applicable(&self, word: &Word) -> bool {
        match self {
            Rule::Rewrite(r) => r.is_applicable(word),
            Rule::Affix(r) => r.is_applicable(word),
            Rule::Realizational(r) => r.is_applicable(word),
            Rule::Compound { rule, .. } => rule.is_applicable(word),
            Rule::Template(t) => t.is_applicable(word),
            Rule::Cascade(c) => c.is_applicable(word),
            Rule::Stratum { index, body, .. } => word.stratum() <= *index && body.is_applicable(word),
        }
    }

    /// Synthesis. `None` when the rule does not apply.
    pub fn apply(&self, word: &Word, ctx: &RuleContext<'_>) -> Result<Option<Vec<Word>>> {
        Ok(match self.run(Mode::Synthesis, word, ctx)? {
            Outcome::NotApplied => None,
            Outcome::Applied(words) => Some(words),
        })
    }

    /// Analysis. `None` when nothing could be unapplied.
    pub fn unapply(&self, word: &Word, ctx: &RuleContext<'_>) -> Result<Option<Vec<Word>>> {
        Ok(match self.run(Mode::Analysis, word, ctx)? {
            Outcome::NotApplied => None,
            Outcome::Applied(words) => Some(words),
        })
    }

    pub(crate) fn run(&self, mode: Mode, word: &Word, ctx: &RuleContext<'_>) -> Result<Outcome> {
        match (self, mode) {
            (Rule::Rewrite(r), Mode::Synthesis) => Ok(Outcome::from_words(r.apply(word, ctx)?.into_iter().collect())),
            (Rule::Rewrite(r), Mode::Analysis) => Ok(Outcome::from_words(r.unapply(word, ctx)?.into_iter().collect())),
            (Rule::Affix(r), Mode::Synthesis) => Ok(Outcome::from_words(r.apply(word, ctx)?)),
            (Rule::Affix(r), Mode::Analysis) => Ok(Outcome::from_words(r.unapply(word, ctx)?)),
            (Rule::Realizational(r), Mode::Synthesis) => Ok(Outcome::from_words(r.apply(word, ctx)?)),
            (Rule::Realizational(r), Mode::Analysis) => Ok(Outcome::from_words(r.unapply(word, ctx)?)),
            (Rule::Compound { rule, .. }, Mode::Synthesis) => Ok(Outcome::from_words(rule.apply(word, ctx)?)),
            (Rule::Compound { stratum, rule }, Mode::Analysis) => Ok(Outcome::from_words(rule.unapply(word, *stratum, ctx)?)),
            (Rule::Template(t), Mode::Synthesis) => Ok(Outcome::from_words(t.apply(word, ctx)?)),
            (Rule::Template(t), Mode::Analysis) => Ok(Outcome::from_words(t.unapply(word, ctx)?)),
            (Rule::Cascade(c), _) => {
                let outputs = c.run(mode, word, ctx)?;
                let unchanged = match c.order {
                    CascadeOrder::Combination | CascadeOrder::Permutation if !c.keep_input => outputs.is_empty(),
                    _ => outputs.len() == 1 && outputs.contains(word),
                };
                if unchanged {
                    return Ok(Outcome::NotApplied);
                }
                Ok(Outcome::Applied(outputs.into_vec()))
            }
            (Rule::Stratum { index, name, body }, _) => {
                if mode == Mode::Synthesis && word.stratum() > *index {
                    return Ok(Outcome::NotApplied);
                }
                ctx.trace.begin_stratum(mode, name, word);
                let mut outputs = body.run(mode, word, ctx)?.into_vec();
                for out in &mut outputs {
                    out.set_stratum(*index);
                }
                ctx.trace.end_stratum(mode, name, &outputs);
                tracing::debug!(stratum = %name, ?mode, outputs = outputs.len(), "stratum done");
                Ok(Outcome::Applied(outputs))
            }
        }
    }
}

/// Rules combined under one [`CascadeOrder`].
#[derive(Debug, Clone, Default)]
pub struct RuleCascade {
    rules: Vec<Rule>,
    order: CascadeOrder,
    keep_input: bool,
}

impl RuleCascade {
    pub fn new(order: CascadeOrder, rules: Vec<Rule>) -> Self {
        RuleCascade { rules, order, keep_input: false }
    }

    /// Also return words no rule changed. For a pipeline, return the words
    /// reached after every step instead of only the last one.
    pub fn keep_input(mut self) -> Self {
        self.keep_input = true;
        self
    }

    pub fn order(&self) -> CascadeOrder {
        self.order
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn is_applicable(&self, word: &Word) -> bool {
        self.rules.iter().any(|r| r.is_applicable(word))
    }

    pub fn apply(&self, word: &Word, ctx: &RuleContext<'_>) -> Result<WordSet> {
        self.run(Mode::Synthesis, word, ctx)
    }

    pub fn unapply(&self, word: &Word, ctx: &RuleContext<'_>) -> Result<WordSet> {
        self.run(Mode::Analysis, word, ctx)
    }

    pub fn run(&self, mode: Mode, word: &Word, ctx: &RuleContext<'_>) -> Result<WordSet> {
        let mut out = WordSet::new();
        match self.order {
            CascadeOrder::Linear => self.linear(mode, word, ctx, &mut out)?,
            CascadeOrder::Pipeline => self.pipeline(mode, word, ctx, &mut out)?,
            CascadeOrder::Combination => {
                if self.keep_input {
                    out.insert(word.fork());
                }
                self.combine(mode, word, 0, ctx, &mut out)?;
            }
            CascadeOrder::Permutation => {
                if self.keep_input {
                    out.insert(word.fork());
                }
                let mut used = vec![false; self.rules.len()];
                self.permute(mode, word, &mut used, ctx, &mut out)?;
            }
        }
        Ok(out)
    }

    fn linear(&self, mode: Mode, word: &Word, ctx: &RuleContext<'_>, out: &mut WordSet) -> Result<()> {
        for rule in &self.rules {
            if let Outcome::Applied(words) = rule.run(mode, word, ctx)? {
                out.extend(words);
                return Ok(());
            }
        }
        out.insert(word.fork());
        Ok(())
    }

    fn pipeline(&self, mode: Mode, word: &Word, ctx: &RuleContext<'_>, out: &mut WordSet) -> Result<()> {
        let mut current = WordSet::from_iter([word.fork()]);
        for rule in &self.rules {
            let mut next = WordSet::new();
            for input in current.iter() {
                match guarded(rule, mode, input, ctx)? {
                    Some(Outcome::NotApplied) => {
                        next.insert(input.clone());
                    }
                    Some(Outcome::Applied(words)) => next.extend(words),
                    None => {}
                }
            }
            if self.keep_input {
                out.extend(next.iter().cloned());
            }
            current = next;
        }
        if !self.keep_input || self.rules.is_empty() {
            out.extend(current.into_vec());
        }
        Ok(())
    }

    fn combine(&self, mode: Mode, word: &Word, from: usize, ctx: &RuleContext<'_>, out: &mut WordSet) -> Result<()> {
        for (i, rule) in self.rules.iter().enumerate().skip(from) {
            let Some(Outcome::Applied(words)) = guarded(rule, mode, word, ctx)? else { continue };
            for next in words {
                if out.insert(next.clone()) {
                    self.combine(mode, &next, i + 1, ctx, out)?;
                }
            }
        }
        Ok(())
    }

    fn permute(&self, mode: Mode, word: &Word, used: &mut [bool], ctx: &RuleContext<'_>, out: &mut WordSet) -> Result<()> {
        for (i, rule) in self.rules.iter().enumerate() {
            if used[i] {
                continue;
            }
            let Some(Outcome::Applied(words)) = guarded(rule, mode, word, ctx)? else { continue };
            used[i] = true;
            for next in words {
                if out.insert(next.clone()) {
                    self.permute(mode, &next, used, ctx, out)?;
                }
            }
            used[i] = false;
        }
        Ok(())
    }
}

/// Run `rule`, turning a branch-local error into a dropped branch (`None`).
fn guarded(rule: &Rule, mode: Mode, word: &Word, ctx: &RuleContext<'_>) -> Result<Option<Outcome>> {
    match rule.run(mode, word, ctx) {
        Ok(outcome) => Ok(Some(outcome)),
        Err(err) if err.is_branch_local() => {
            tracing::debug!(rule = rule.name(), ?mode, error = %err, "dropping branch");
            ctx.trace.branch_error(rule.name(), word, &err);
            Ok(None)
        }
        Err(err) => Err(err),
    }
}
