//! Reading back a snapshot directory written by an earlier run.

use std::path::Path;
use std::sync::Arc;

use playtest_types::{GameState, SnapshotId, StateDiff};
use tracing::info;

use crate::error::ReplayError;
use crate::manager::StateDiffer;
use crate::store::SnapshotStore;

/// Replays snapshots from a directory.
#[derive(Debug)]
pub struct SnapshotReplayer {
    store: SnapshotStore,
    differ: StateDiffer,
}

impl SnapshotReplayer {
    /// Open `dir` and index every snapshot in it.
    pub fn open(dir: &Path, differ: StateDiffer) -> Result<Self, ReplayError> {
        let mut store = SnapshotStore::with_directory(dir)?;
        store.index_directory()?;
        Ok(Self { store, differ })
    }

    /// The indexed store.
    pub const fn store(&self) -> &SnapshotStore {
        &self.store
    }

    /// Load one snapshot and log a summary of it.
    pub fn replay(&mut self, id: SnapshotId) -> Option<Arc<GameState>> {
        let state = self.store.restore_to(id)?;
        info!(
            snapshot_id = %id,
            tick = state.tick,
            snapshot_type = %state.snapshot_type,
            hp = state.player.hp,
            max_hp = state.player.max_hp,
            floor = state.world.floor,
            in_battle = state.world.in_battle,
            "Snapshot replayed"
        );
        Some(state)
    }

    /// Every snapshot with `from_tick <= tick <= to_tick`, in tick order.
    pub fn replay_range(&mut self, from_tick: u64, to_tick: u64) -> Vec<Arc<GameState>> {
        let ids: Vec<SnapshotId> = self
            .store
            .list_snapshots()
            .into_iter()
            .filter(|metadata| (from_tick..=to_tick).contains(&metadata.tick))
            .map(|metadata| metadata.snapshot_id)
            .collect();
        ids.into_iter().filter_map(|id| self.store.restore_to(id)).collect()
    }

    /// Diffs between consecutive snapshots in the range.
    pub fn diff_range(&mut self, from_tick: u64, to_tick: u64) -> Vec<StateDiff> {
        let states = self.replay_range(from_tick, to_tick);
        states
            .windows(2)
            .filter_map(|pair| match pair {
                [prev, curr] => Some(self.differ.diff(prev, curr, None).diff),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use playtest_rules::{InferenceEngine, RuleSet};

    fn differ() -> StateDiffer {
        let rules = RuleSet::parse(r#"{"state_change_events": {"combat": {
            "player_damaged": {"condition": "hp_delta < 0"}
        }}}"#)
        .unwrap();
        StateDiffer::new(InferenceEngine::new(Arc::new(rules)), false)
    }

    fn record_run(dir: &Path) -> Vec<SnapshotId> {
        let mut store = SnapshotStore::with_directory(dir).unwrap();
        (1..=4_i64)
            .map(|step| {
                let tick = step.unsigned_abs();
                let mut state = GameState::new(tick, 0.0);
                state.player.hp = 100_i64.saturating_sub(step.saturating_mul(10));
                store.save(state)
            })
            .collect()
    }

    #[test]
    fn replays_a_previous_run() {
        let dir = tempfile::tempdir().unwrap();
        let ids = record_run(dir.path());
        let mut replayer = SnapshotReplayer::open(dir.path(), differ()).unwrap();
        assert_eq!(replayer.store().len(), 4);
        assert_eq!(replayer.replay(ids[2]).map(|s| s.tick), Some(3));
    }

    #[test]
    fn unusable_directory_is_a_store_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("not_a_dir");
        std::fs::write(&file, "x").unwrap();
        let result = SnapshotReplayer::open(&file, differ());
        assert!(matches!(result, Err(ReplayError::Store { .. })));
    }

    #[test]
    fn range_is_inclusive_and_ordered() {
        let dir = tempfile::tempdir().unwrap();
        record_run(dir.path());
        let mut replayer = SnapshotReplayer::open(dir.path(), differ()).unwrap();
        let ticks: Vec<u64> = replayer.replay_range(2, 4).iter().map(|s| s.tick).collect();
        assert_eq!(ticks, vec![2, 3, 4]);
    }

    #[test]
    fn diffs_consecutive_snapshots() {
        let dir = tempfile::tempdir().unwrap();
        record_run(dir.path());
        let mut replayer = SnapshotReplayer::open(dir.path(), differ()).unwrap();
        let diffs = replayer.diff_range(1, 4);
        assert_eq!(diffs.len(), 3);
        assert!(diffs.iter().all(|d| d.hp_delta == -10));
        assert!(diffs.iter().all(|d| d.has_event("player_damaged")));
        assert!(replayer.diff_range(4, 4).is_empty());
    }
}
