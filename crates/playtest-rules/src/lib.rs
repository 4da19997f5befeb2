//! Rule-based event inference for playtest runs.
//!
//! Events are never emitted by the simulation. They are inferred after the
//! fact by comparing two consecutive [`GameState`]s against a declarative
//! rule file.
//!
//! # Modules
//!
//! - [`expression`] -- The condition language: compilation and evaluation.
//! - [`computed`] -- Builtin derived values (`hp_delta`, `battle_started`, ...).
//! - [`loader`] -- Loading the rule document into an immutable [`RuleSet`].
//! - [`inference`] -- [`InferenceEngine`], which runs the rules for one
//!   transition and builds the [`StateDiff`].
//! - [`error`] -- Error types.
//!
//! [`GameState`]: playtest_types::GameState
//! [`StateDiff`]: playtest_types::StateDiff

pub mod computed;
pub mod error;
pub mod expression;
pub mod inference;
pub mod loader;

pub use error::{EvalError, InferenceError, RuleError};
pub use expression::{EvaluationContext, Expr, compile, evaluate, is_truthy};
pub use inference::{Inference, InferenceEngine, InferredEvent};
pub use loader::{ComputedDefinition, EventRule, Extraction, RuleSet};
