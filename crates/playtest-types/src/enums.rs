//! Enumeration types shared across the playtest workspace.

use serde::{Deserialize, Serialize};

/// How a snapshot was persisted.
///
/// - `Full` -- self-contained capture that starts a new chain.
/// - `Incremental` -- cheap capture chained onto the previous snapshot.
/// - `Checkpoint` -- capture forced by a significant event (level up, new
///   floor, death).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SnapshotType {
    /// Self-contained capture.
    #[default]
    #[serde(rename = "full")]
    Full,
    /// Capture chained onto the previous snapshot.
    #[serde(rename = "incr")]
    Incremental,
    /// Capture forced by a significant event.
    #[serde(rename = "ckpt")]
    Checkpoint,
}

impl SnapshotType {
    /// Short label used in logs and on disk.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Incremental => "incr",
            Self::Checkpoint => "ckpt",
        }
    }
}

impl core::fmt::Display for SnapshotType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
