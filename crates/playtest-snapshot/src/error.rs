//! Error types for snapshot storage and replay.
//!
//! Restoring an unknown snapshot is not an error: lookups return `Option`.
//! These cover the cases a caller has to act on.

use std::path::PathBuf;

/// The snapshot directory could not be prepared or scanned.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Creating or reading the snapshot directory failed.
    #[error("snapshot directory {path}: {source}")]
    Directory {
        /// The snapshot directory.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The store has no backing directory to scan.
    #[error("snapshot store has no backing directory")]
    NoDirectory,
}

/// A replay session could not be set up.
#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    /// The snapshot directory could not be opened.
    #[error("store error: {source}")]
    Store {
        /// The underlying store error.
        #[from]
        source: StoreError,
    },
}
