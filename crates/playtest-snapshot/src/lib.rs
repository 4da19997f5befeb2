//! Snapshot capture, storage, diffing, and replay for playtest runs.
//!
//! Every simulated tick the caller hands the resulting [`GameState`] to a
//! [`SnapshotManager`], which decides the snapshot kind, stores it, and diffs
//! it against the previous state with the rule engine (or the legacy diff
//! when inference fails).
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from `playtest-config.yaml`.
//! - [`strategy`] -- Full / incremental / checkpoint policy.
//! - [`store`] -- In-memory store with an optional backing directory.
//! - [`manager`] -- Per-tick orchestration and [`StateDiffer`].
//! - [`legacy`] -- Rule-free fallback diff.
//! - [`replay`] -- Reading back a snapshot directory.
//! - [`error`] -- Error types.
//!
//! [`GameState`]: playtest_types::GameState

pub mod config;
pub mod error;
pub mod legacy;
pub mod manager;
pub mod replay;
pub mod store;
pub mod strategy;

pub use config::{ConfigError, PlaytestConfig};
pub use error::{ReplayError, StoreError};
pub use legacy::legacy_diff;
pub use manager::{DiffOutcome, DiffSource, SnapshotManager, StateDiffer};
pub use replay::SnapshotReplayer;
pub use store::SnapshotStore;
pub use strategy::{ChainState, SnapshotStrategy};
