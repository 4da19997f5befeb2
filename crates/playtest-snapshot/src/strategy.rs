//! Deciding which kind of snapshot to persist on a tick.

use std::collections::BTreeSet;

use playtest_types::SnapshotType;

use crate::config::SnapshotConfig;

/// Pure snapshot kind policy.
///
/// Checked in order: too long since the last full snapshot, chain too long,
/// a checkpoint trigger fired. Anything else is incremental.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotStrategy {
    full_snapshot_interval: u64,
    max_incremental_chain: u32,
    checkpoint_triggers: BTreeSet<String>,
}

impl SnapshotStrategy {
    /// A strategy with the given thresholds.
    pub fn new(
        full_snapshot_interval: u64,
        max_incremental_chain: u32,
        checkpoint_triggers: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            full_snapshot_interval,
            max_incremental_chain,
            checkpoint_triggers: checkpoint_triggers.into_iter().collect(),
        }
    }

    /// A strategy configured from the `snapshots` section.
    pub fn from_config(config: &SnapshotConfig) -> Self {
        Self::new(
            config.full_snapshot_interval,
            config.max_incremental_chain,
            config.checkpoint_triggers.iter().cloned(),
        )
    }

    /// Decide the kind of snapshot for `tick`.
    pub fn decide(
        &self,
        tick: u64,
        fired: &[String],
        last_full_tick: u64,
        incremental_chain_length: u32,
    ) -> SnapshotType {
        if tick.saturating_sub(last_full_tick) >= self.full_snapshot_interval {
            return SnapshotType::Full;
        }
        if incremental_chain_length >= self.max_incremental_chain {
            return SnapshotType::Full;
        }
        if fired.iter().any(|event| self.checkpoint_triggers.contains(event)) {
            return SnapshotType::Checkpoint;
        }
        SnapshotType::Incremental
    }

    /// Whether `event_id` forces a checkpoint.
    pub fn is_checkpoint_trigger(&self, event_id: &str) -> bool {
        self.checkpoint_triggers.contains(event_id)
    }
}

impl Default for SnapshotStrategy {
    fn default() -> Self {
        Self::from_config(&SnapshotConfig::default())
    }
}

/// Counters the strategy decides from. Owned by the manager.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChainState {
    /// Tick of the most recent full snapshot.
    pub last_full_tick: u64,
    /// Non-full snapshots since then.
    pub incremental_chain_length: u32,
}

impl ChainState {
    /// Update the counters after a snapshot of `kind` was taken at `tick`.
    pub const fn record(&mut self, tick: u64, kind: SnapshotType) {
        match kind {
            SnapshotType::Full => {
                self.last_full_tick = tick;
                self.incremental_chain_length = 0;
            }
            SnapshotType::Incremental | SnapshotType::Checkpoint => {
                self.incremental_chain_length = self.incremental_chain_length.saturating_add(1);
            }
        }
    }
}
