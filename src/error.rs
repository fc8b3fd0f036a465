//! Error types for the feature system and the rule engine.
//!
//! Branch-local failures (`TooManySegments`, `UninstantiatedFeature`) are
//! returned from every apply/unapply function and recovered by the cascade
//! that forked the hypothesis. `InvalidShape` surfaces to the caller of
//! [`crate::Morpher::parse_word`].

use thiserror::Error;

/// Errors raised while building or querying a feature system.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FeatureError {
    #[error("unknown feature `{0}`")]
    UnknownFeature(String),

    #[error("feature `{feature}` has no symbol `{symbol}`")]
    UnknownSymbol { feature: String, symbol: String },

    #[error("feature `{0}` is declared more than once")]
    DuplicateFeature(String),

    #[error("`{0}` is not a valid identifier")]
    InvalidIdentifier(String),

    #[error("feature `{feature}` declares {count} symbols, at most 64 are supported")]
    TooManySymbols { feature: String, count: usize },

    #[error("cannot parse feature notation `{0}`")]
    BadNotation(String),

    #[error("feature `{0}` is not symbolic")]
    NotSymbolic(String),
}

/// Errors raised while applying or unapplying rules, or at the symbol-table
/// boundary.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MorphError {
    /// An insertion would grow a shape past the configured hard cap.
    #[error("shape would exceed {limit} nodes")]
    TooManySegments { limit: usize },

    /// A variable in a right-hand side had no binding when it was materialized.
    #[error("rule `{rule}` left a variable feature uninstantiated")]
    UninstantiatedFeature { rule: String },

    /// Input text could not be segmented with the character definition table.
    #[error("cannot segment `{text}` at byte {position}")]
    InvalidShape { text: String, position: usize },

    /// A rule definition cannot be compiled.
    #[error("invalid rule `{rule}`: {reason}")]
    InvalidRule { rule: String, reason: String },

    #[error(transparent)]
    Feature(#[from] FeatureError),
}

impl MorphError {
    /// Whether the error only invalidates the current hypothesis branch.
    pub fn is_branch_local(&self) -> bool {
        matches!(self, MorphError::TooManySegments { .. } | MorphError::UninstantiatedFeature { .. })
    }
}

pub type Result<T, E = MorphError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn branch_local_errors_are_classified() {
        assert!(MorphError::TooManySegments { limit: 256 }.is_branch_local());
        assert!(MorphError::UninstantiatedFeature { rule: "assim".into() }.is_branch_local());
        assert!(!MorphError::InvalidShape { text: "x".into(), position: 0 }.is_branch_local());
    }

    #[test]
    fn messages_name_the_offender() {
        let err = MorphError::InvalidShape { text: "kq".into(), position: 1 };
        assert_eq!(err.to_string(), "cannot segment `kq` at byte 1");
        let err: MorphError = FeatureError::UnknownFeature("nasal".into()).into();
        assert_eq!(err.to_string(), "unknown feature `nasal`");
    }
}
