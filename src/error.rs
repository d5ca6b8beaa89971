//! Error taxonomy for the assignment engine.

/// Result alias used throughout this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Enum representing the ways an experiment, a builder, or an assignment request can fail.
///
/// Variants are grouped the way callers are expected to react to them: `InvalidInput` and
/// `InvalidExperiment` happen at build time and prevent an experiment from being published;
/// `AttributeMissing`, `TypeMismatch`, and `NoMatch` happen at request time and are recoverable by
/// the caller; `Internal` indicates an invariant that validation should have already ruled out.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// A builder precondition was violated (mismatched weight/value lengths, duplicate variable,
    /// too many variables, misaligned weight vectors).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An `Experiment` or `Audience` failed validation after being built.
    #[error("invalid experiment: {0}")]
    InvalidExperiment(String),

    /// A constraint referenced an attribute key that is absent from the supplied context.
    #[error("key not found in context: {0}")]
    AttributeMissing(String),

    /// A constraint's comparison value could not be reconciled with the attribute's runtime type,
    /// or the operator does not apply to that type.
    #[error("type mismatch evaluating constraint on {key}: {reason}")]
    TypeMismatch {
        /// The constraint key being evaluated.
        key: String,
        /// Human-readable explanation of the mismatch.
        reason: String,
    },

    /// No audience in any candidate experiment accepted the request.
    #[error("failed to find variable or could not meet constraints with given context")]
    NoMatch,

    /// No experiment declares the requested variable name.
    #[error("no experiment matching variable '{0}'")]
    NoSuchVariable(String),

    /// An invariant that validation should have guaranteed did not hold (e.g. a declared variable
    /// has no corresponding value group on the accepted audience).
    #[error("internal invariant violated: {0}")]
    Internal(String),
}
