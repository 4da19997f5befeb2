//! Shared type definitions for the playtest workspace.
//!
//! This crate is the single source of truth for the data that flows between
//! the simulation, the snapshot store, and the event inference engine.
//!
//! # Modules
//!
//! - [`ids`] -- Snapshot identifiers
//! - [`enums`] -- Snapshot kinds
//! - [`state`] -- The per-tick [`GameState`] and its substates
//! - [`snapshot`] -- Metadata kept for every persisted snapshot
//! - [`diff`] -- The [`StateDiff`] produced for each tick transition

pub mod diff;
pub mod enums;
pub mod ids;
pub mod snapshot;
pub mod state;

// Re-export all public types at crate root for convenience.
pub use diff::{ComputedValues, StateDiff};
pub use enums::SnapshotType;
pub use ids::SnapshotId;
pub use snapshot::SnapshotMetadata;
pub use state::{
    Attributes, CharacterState, EconomyState, EventState, GameState, InventoryItem,
    InventoryState, MonsterState, PlayerState, QuestState, UiState, WorldState,
};
