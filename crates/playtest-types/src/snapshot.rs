//! Bookkeeping record kept alongside every persisted snapshot.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::enums::SnapshotType;
use crate::ids::SnapshotId;

/// Index entry for one persisted snapshot.
///
/// Owned by the snapshot store; one per saved state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    /// The snapshot's id.
    pub snapshot_id: SnapshotId,
    /// Tick the state was captured at.
    pub tick: u64,
    /// Simulation timestamp of the state.
    pub timestamp: f64,
    /// How the snapshot was persisted.
    pub snapshot_type: SnapshotType,
    /// The snapshot this one chains from.
    pub parent_id: Option<SnapshotId>,
    /// Backing file, when the store writes to disk and the write succeeded.
    pub file_path: Option<PathBuf>,
    /// Wall-clock time the store accepted the snapshot.
    pub recorded_at: DateTime<Utc>,
}
