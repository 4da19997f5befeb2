//! Keyed snapshot storage, in memory and optionally in a directory.
//!
//! Every saved state is kept in memory behind an [`Arc`]. With a backing
//! directory each snapshot is also written to `<dir>/<id>.json`; the files
//! are a durability aid and let a later process replay the run, but the
//! in-memory metadata is authoritative while the store is alive.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use playtest_types::{GameState, SnapshotId, SnapshotMetadata};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::StoreError;

/// Snapshot store for one playtest run.
#[derive(Debug)]
pub struct SnapshotStore {
    dir: Option<PathBuf>,
    salt: Uuid,
    sequence: u64,
    states: BTreeMap<SnapshotId, Arc<GameState>>,
    metadata: BTreeMap<SnapshotId, SnapshotMetadata>,
}

impl SnapshotStore {
    /// A store that keeps snapshots in memory only.
    pub fn in_memory() -> Self {
        Self {
            dir: None,
            salt: Uuid::new_v4(),
            sequence: 0,
            states: BTreeMap::new(),
            metadata: BTreeMap::new(),
        }
    }

    /// A store that also writes every snapshot under `dir`, creating it if
    /// needed.
    pub fn with_directory(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| StoreError::Directory {
            path: dir.clone(),
            source,
        })?;
        Ok(Self {
            dir: Some(dir),
            ..Self::in_memory()
        })
    }

    /// A store backed by `dir` when given, in memory otherwise.
    pub fn open(dir: Option<&Path>) -> Result<Self, StoreError> {
        dir.map_or_else(|| Ok(Self::in_memory()), Self::with_directory)
    }

    /// The backing directory, if any.
    pub fn directory(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    /// Store `state` and return its new id.
    ///
    /// A failed disk write is logged and leaves the metadata without a file
    /// path; the in-memory copy is still saved.
    pub fn save(&mut self, state: GameState) -> SnapshotId {
        let id = SnapshotId::derive(&self.salt, state.tick, state.timestamp, self.sequence);
        self.sequence = self.sequence.saturating_add(1);

        let file_path = self.dir.as_deref().and_then(|dir| write_snapshot(dir, id, &state));
        let metadata = SnapshotMetadata {
            snapshot_id: id,
            tick: state.tick,
            timestamp: state.timestamp,
            snapshot_type: state.snapshot_type,
            parent_id: state.parent_id,
            file_path,
            recorded_at: Utc::now(),
        };
        debug!(
            snapshot_id = %id,
            tick = state.tick,
            snapshot_type = %state.snapshot_type,
            persisted = metadata.file_path.is_some(),
            "Snapshot saved"
        );

        self.metadata.insert(id, metadata);
        self.states.insert(id, Arc::new(state));
        id
    }

    /// Look up a snapshot by id.
    ///
    /// Falls back to the backing directory when the state is not in memory
    /// and caches what it reads. `None` when neither has it.
    pub fn restore_to(&mut self, id: SnapshotId) -> Option<Arc<GameState>> {
        if let Some(state) = self.states.get(&id) {
            return Some(Arc::clone(state));
        }
        let path = snapshot_path(self.dir.as_deref()?, id);
        let state = Arc::new(read_snapshot(&path)?);
        self.states.insert(id, Arc::clone(&state));
        Some(state)
    }

    /// Metadata for `id`, if the store knows it.
    pub fn get_metadata(&self, id: SnapshotId) -> Option<&SnapshotMetadata> {
        self.metadata.get(&id)
    }

    /// Every known snapshot, ordered by tick.
    pub fn list_snapshots(&self) -> Vec<&SnapshotMetadata> {
        let mut snapshots: Vec<&SnapshotMetadata> = self.metadata.values().collect();
        snapshots.sort_by(|a, b| {
            a.tick
                .cmp(&b.tick)
                .then_with(|| a.timestamp.total_cmp(&b.timestamp))
                .then_with(|| a.recorded_at.cmp(&b.recorded_at))
        });
        snapshots
    }

    /// Number of known snapshots.
    pub fn len(&self) -> usize {
        self.metadata.len()
    }

    /// Whether the store knows no snapshots.
    pub fn is_empty(&self) -> bool {
        self.metadata.is_empty()
    }

    /// Forget every snapshot held in memory. Files on disk are left alone.
    pub fn clear(&mut self) {
        self.states.clear();
        self.metadata.clear();
    }

    /// Register every `*.json` snapshot found in the backing directory.
    ///
    /// Snapshots the store already knows are skipped, as are files that do
    /// not parse. Returns how many were added.
    pub fn index_directory(&mut self) -> Result<usize, StoreError> {
        let dir = self.dir.clone().ok_or(StoreError::NoDirectory)?;
        let entries = fs::read_dir(&dir).map_err(|source| StoreError::Directory {
            path: dir.clone(),
            source,
        })?;

        let mut added: usize = 0;
        for entry in entries {
            let entry = entry.map_err(|source| StoreError::Directory {
                path: dir.clone(),
                source,
            })?;
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            let Some(id) = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .and_then(|stem| stem.parse::<SnapshotId>().ok())
            else {
                debug!(path = %path.display(), "Skipping file that is not a snapshot");
                continue;
            };
            if self.metadata.contains_key(&id) {
                continue;
            }
            let Some(state) = read_snapshot(&path) else {
                continue;
            };

            let recorded_at = entry
                .metadata()
                .and_then(|meta| meta.modified())
                .map_or_else(|_| Utc::now(), DateTime::<Utc>::from);
            self.metadata.insert(
                id,
                SnapshotMetadata {
                    snapshot_id: id,
                    tick: state.tick,
                    timestamp: state.timestamp,
                    snapshot_type: state.snapshot_type,
                    parent_id: state.parent_id,
                    file_path: Some(path),
                    recorded_at,
                },
            );
            self.states.insert(id, Arc::new(state));
            added = added.saturating_add(1);
        }

        info!(dir = %dir.display(), snapshots = added, "Snapshot directory indexed");
        Ok(added)
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::in_memory()
    }
}

fn snapshot_path(dir: &Path, id: SnapshotId) -> PathBuf {
    dir.join(format!("{id}.json"))
}

fn write_snapshot(dir: &Path, id: SnapshotId, state: &GameState) -> Option<PathBuf> {
    let path = snapshot_path(dir, id);
    let bytes = match serde_json::to_vec_pretty(state) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(snapshot_id = %id, error = %e, "Failed to serialize snapshot");
            return None;
        }
    };
    match fs::write(&path, bytes) {
        Ok(()) => Some(path),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to write snapshot file");
            None
        }
    }
}

fn read_snapshot(path: &Path) -> Option<GameState> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            if path.exists() {
                warn!(path = %path.display(), error = %e, "Failed to read snapshot file");
            }
            return None;
        }
    };
    match serde_json::from_slice(&bytes) {
        Ok(state) => Some(state),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to parse snapshot file");
            None
        }
    }
}
