//! Error types for program construction, transformation and evaluation.

use thiserror::Error;

/// Result type for symlog operations.
pub type SymlogResult<T> = Result<T, SymlogError>;

/// Errors that can occur while building, transforming or running a program.
///
/// Construction errors are raised as soon as the offending rule or fact is
/// seen. Evaluator failures are fatal and never retried; a failed explanation
/// is not an error (see [`crate::provenance::Explained::Unavailable`]).
#[derive(Debug, Error)]
pub enum SymlogError {
    /// A relation is used with two different arities.
    #[error("arity mismatch for `{relation}`: expected {expected}, found {found}")]
    Arity {
        relation: String,
        expected: usize,
        found: usize,
    },

    /// A literal refers to a relation with no declaration.
    #[error("undeclared relation `{relation}`")]
    Undeclared { relation: String },

    /// A rule violates a structural restriction.
    #[error("invalid rule `{rule}`: {reason}")]
    InvalidRule { rule: String, reason: String },

    /// A fact violates a structural restriction.
    #[error("invalid fact `{fact}`: {reason}")]
    InvalidFact { fact: String, reason: String },

    /// Inconsistent or ambiguous types for a relation position or variable.
    #[error("type error: {message}")]
    Type { message: String },

    /// A user value or name collides with the reserved namespace.
    #[error("reserved name or value `{value}`")]
    Reserved { value: String },

    /// A symbolic constant name was allocated twice.
    #[error("symbolic constant `{name}` already exists")]
    DuplicateSymbol { name: String },

    /// The finite pool of symbolic numbers is used up.
    #[error("symbolic number pool exhausted ({capacity} ids)")]
    PoolExhausted { capacity: u32 },

    /// The external evaluator could not be found or launched.
    #[error("evaluator unavailable: {message}")]
    EvaluatorUnavailable { message: String },

    /// The external evaluator ran but reported failure.
    #[error("evaluator failed: {message}")]
    Evaluator { message: String },

    /// Output produced by the evaluator could not be decoded.
    #[error("malformed evaluator output in `{relation}`: {message}")]
    MalformedOutput { relation: String, message: String },

    /// Filesystem failure while preparing or reading scratch state.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SymlogError {
    pub fn invalid_rule(rule: impl ToString, reason: impl Into<String>) -> Self {
        SymlogError::InvalidRule {
            rule: rule.to_string(),
            reason: reason.into(),
        }
    }

    pub fn invalid_fact(fact: impl ToString, reason: impl Into<String>) -> Self {
        SymlogError::InvalidFact {
            fact: fact.to_string(),
            reason: reason.into(),
        }
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        SymlogError::Type {
            message: message.into(),
        }
    }

    pub fn reserved(value: impl Into<String>) -> Self {
        SymlogError::Reserved {
            value: value.into(),
        }
    }

    pub fn evaluator(message: impl Into<String>) -> Self {
        SymlogError::Evaluator {
            message: message.into(),
        }
    }

    pub fn malformed(relation: impl Into<String>, message: impl Into<String>) -> Self {
        SymlogError::MalformedOutput {
            relation: relation.into(),
            message: message.into(),
        }
    }

    /// True for errors raised while validating user input.
    pub fn is_construction_error(&self) -> bool {
        matches!(
            self,
            SymlogError::Arity { .. }
                | SymlogError::Undeclared { .. }
                | SymlogError::InvalidRule { .. }
                | SymlogError::InvalidFact { .. }
                | SymlogError::Type { .. }
                | SymlogError::Reserved { .. }
                | SymlogError::DuplicateSymbol { .. }
                | SymlogError::PoolExhausted { .. }
        )
    }
}
