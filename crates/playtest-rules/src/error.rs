//! Error types for rule loading, expression evaluation, and inference.
//!
//! None of these are fatal to a simulation run. [`EvalError`] only skips
//! the rule that raised it, [`RuleError`] surfaces to whoever loads the rule
//! file, and [`InferenceError`] makes the snapshot manager fall back to the
//! legacy diff.

use std::path::PathBuf;

/// A condition or extraction expression could not be evaluated.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EvalError {
    /// The operator does not apply to the operand kinds.
    #[error("cannot apply `{op}` to {lhs} and {rhs}")]
    TypeMismatch {
        /// The operator symbol.
        op: &'static str,
        /// Kind of the left operand.
        lhs: &'static str,
        /// Kind of the right operand.
        rhs: &'static str,
    },

    /// Integer arithmetic overflowed.
    #[error("integer overflow in `{op}`")]
    Overflow {
        /// The operator symbol.
        op: &'static str,
    },

    /// Float arithmetic produced infinity or NaN.
    #[error("non-finite result from `{op}`")]
    NonFinite {
        /// The operator symbol.
        op: &'static str,
    },
}

/// The rule document could not be loaded.
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    /// The rule file exists but could not be read.
    #[error("failed to read rule file {path}: {source}")]
    Io {
        /// Path of the rule file.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The rule document is not valid JSON.
    #[error("failed to parse rule document: {source}")]
    Json {
        /// The underlying parse error.
        #[from]
        source: serde_json::Error,
    },

    /// A category under `state_change_events` is not an object.
    #[error("event category `{category}` must be an object of rules")]
    InvalidCategory {
        /// The offending category key.
        category: String,
    },

    /// A rule definition has the wrong shape.
    #[error("invalid rule `{category}.{event_id}`: {source}")]
    InvalidRule {
        /// Category the rule was declared in.
        category: String,
        /// The rule's event id.
        event_id: String,
        /// The underlying shape error.
        source: serde_json::Error,
    },

    /// A computed value definition is neither a string nor `{expression}`.
    #[error("computed value `{name}` must be a string or an object with `expression`")]
    InvalidComputed {
        /// The computed value's name.
        name: String,
    },
}

/// A whole inference pass failed.
#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    /// A game state could not be converted for path lookup.
    #[error("failed to serialize game state: {source}")]
    Serialize {
        /// The underlying serialization error.
        #[from]
        source: serde_json::Error,
    },

    /// A declared computed value failed to evaluate.
    #[error("computed value `{name}` failed: {source}")]
    ComputedValue {
        /// The computed value's name.
        name: String,
        /// The evaluation error.
        source: EvalError,
    },

    /// A computed value has the wrong type for its diff field.
    #[error("computed value `{name}` is not {expected}")]
    MalformedValue {
        /// The computed value's name.
        name: String,
        /// What the diff field expects.
        expected: &'static str,
    },
}
