//! Per-tick snapshot capture and diffing.
//!
//! [`SnapshotManager`] ties the strategy, the store, and the inference engine
//! together. Each simulated persona owns one manager.

use std::collections::BTreeMap;
use std::sync::Arc;

use playtest_rules::{InferenceEngine, InferredEvent, RuleSet};
use playtest_types::{Attributes, GameState, SnapshotId, SnapshotMetadata, SnapshotType, StateDiff};
use tracing::{debug, warn};

use crate::config::PlaytestConfig;
use crate::legacy::legacy_diff;
use crate::store::SnapshotStore;
use crate::strategy::{ChainState, SnapshotStrategy};

/// Which algorithm produced a diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffSource {
    /// The rule-based inference engine.
    Rules,
    /// The hand-written fallback.
    Legacy,
}

/// A diff together with what the rule engine inferred for it.
#[derive(Debug, Clone, PartialEq)]
pub struct DiffOutcome {
    /// The diff.
    pub diff: StateDiff,
    /// Fired events with their metadata. Empty for legacy diffs.
    pub events: Vec<InferredEvent>,
    /// Extracted data keyed by event id, one entry per fired event. Empty for
    /// legacy diffs.
    pub extracted: BTreeMap<String, Attributes>,
    /// Which algorithm produced the diff.
    pub source: DiffSource,
}

/// Computes diffs with the rule engine, falling back to the legacy diff.
#[derive(Debug, Clone)]
pub struct StateDiffer {
    engine: InferenceEngine,
    force_legacy: bool,
}

impl StateDiffer {
    /// A differ over `engine`. With `force_legacy` the engine is never used.
    pub const fn new(engine: InferenceEngine, force_legacy: bool) -> Self {
        Self {
            engine,
            force_legacy,
        }
    }

    /// The inference engine.
    pub const fn engine(&self) -> &InferenceEngine {
        &self.engine
    }

    /// Diff `prev` -> `curr`.
    ///
    /// Never fails: any inference error is logged and answered with the
    /// legacy diff.
    pub fn diff(
        &self,
        prev: &GameState,
        curr: &GameState,
        action_result: Option<&Attributes>,
    ) -> DiffOutcome {
        if self.force_legacy {
            return Self::legacy(prev, curr);
        }

        let inferred = self.engine.infer(prev, curr, action_result).and_then(|inference| {
            let diff = InferenceEngine::build_state_diff(
                prev,
                curr,
                &inference.events,
                &inference.computed,
            )?;
            Ok(DiffOutcome {
                diff,
                events: inference.events,
                extracted: inference.extracted,
                source: DiffSource::Rules,
            })
        });

        match inferred {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(
                    tick_from = prev.tick,
                    tick_to = curr.tick,
                    error = %e,
                    "Event inference failed, falling back to legacy diff"
                );
                Self::legacy(prev, curr)
            }
        }
    }

    fn legacy(prev: &GameState, curr: &GameState) -> DiffOutcome {
        DiffOutcome {
            diff: legacy_diff(prev, curr),
            events: Vec::new(),
            extracted: BTreeMap::new(),
            source: DiffSource::Legacy,
        }
    }
}

/// Captures one snapshot per tick and diffs consecutive states.
#[derive(Debug)]
pub struct SnapshotManager {
    store: SnapshotStore,
    strategy: SnapshotStrategy,
    chain: ChainState,
    differ: StateDiffer,
    history: Vec<SnapshotMetadata>,
}

impl SnapshotManager {
    /// A manager from its parts.
    pub fn new(store: SnapshotStore, strategy: SnapshotStrategy, differ: StateDiffer) -> Self {
        Self {
            store,
            strategy,
            chain: ChainState::default(),
            differ,
            history: Vec::new(),
        }
    }

    /// A manager configured from `config`, sharing `rules`.
    pub fn from_config(
        config: &PlaytestConfig,
        store: SnapshotStore,
        rules: Arc<RuleSet>,
    ) -> Self {
        Self::new(
            store,
            SnapshotStrategy::from_config(&config.snapshots),
            StateDiffer::new(InferenceEngine::new(rules), config.diff.force_legacy),
        )
    }

    /// Snapshot `state` for `tick` and return its id.
    ///
    /// `fired` are the events inferred for the transition into this tick;
    /// they decide whether this becomes a checkpoint. Non-full snapshots are
    /// chained to the previous snapshot through `parent_id`.
    pub fn create_snapshot(&mut self, tick: u64, mut state: GameState, fired: &[String]) -> SnapshotId {
        let kind = self.strategy.decide(
            tick,
            fired,
            self.chain.last_full_tick,
            self.chain.incremental_chain_length,
        );
        self.chain.record(tick, kind);

        state.snapshot_type = kind;
        if kind != SnapshotType::Full
            && let Some(previous) = self.history.last()
        {
            state.parent_id = Some(previous.snapshot_id);
        }

        let id = self.store.save(state);
        if let Some(metadata) = self.store.get_metadata(id) {
            self.history.push(metadata.clone());
        }
        debug!(
            snapshot_id = %id,
            tick,
            snapshot_type = %kind,
            chain_length = self.chain.incremental_chain_length,
            "Snapshot created"
        );
        id
    }

    /// Diff `prev` -> `curr`, preferring rule inference.
    pub fn compute_diff(&self, prev: &GameState, curr: &GameState) -> StateDiff {
        self.differ.diff(prev, curr, None).diff
    }

    /// Diff `prev` -> `curr` and keep the inferred events, their extracted
    /// data, and which algorithm was used.
    pub fn compute_diff_detailed(
        &self,
        prev: &GameState,
        curr: &GameState,
        action_result: Option<&Attributes>,
    ) -> DiffOutcome {
        self.differ.diff(prev, curr, action_result)
    }

    /// The latest snapshot taken at or before `tick`.
    pub fn get_snapshot_at_tick(&mut self, tick: u64) -> Option<Arc<GameState>> {
        let id = self
            .history
            .iter()
            .rev()
            .find(|metadata| metadata.tick <= tick)?
            .snapshot_id;
        self.store.restore_to(id)
    }

    /// Up to `count` most recent snapshots, oldest first.
    pub fn get_recent_snapshots(&mut self, count: usize) -> Vec<Arc<GameState>> {
        let start = self.history.len().saturating_sub(count);
        let ids: Vec<SnapshotId> = self
            .history
            .iter()
            .skip(start)
            .map(|metadata| metadata.snapshot_id)
            .collect();
        ids.into_iter().filter_map(|id| self.store.restore_to(id)).collect()
    }

    /// Metadata of every snapshot this manager created, in creation order.
    pub fn history(&self) -> &[SnapshotMetadata] {
        &self.history
    }

    /// The strategy counters.
    pub const fn chain(&self) -> ChainState {
        self.chain
    }

    /// The underlying store.
    pub const fn store(&self) -> &SnapshotStore {
        &self.store
    }

    /// Drop every snapshot and reset the strategy counters.
    pub fn clear(&mut self) {
        self.store.clear();
        self.history.clear();
        self.chain = ChainState::default();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const RULES: &str = r#"{"state_change_events": {
        "combat": {
            "battle_start": {"condition": "battle_started", "priority": 1},
            "player_damaged": {"condition": "hp_delta < 0", "priority": 5}
        },
        "progress": {
            "level_up": {"condition": "level_up", "priority": 2}
        }
    }}"#;

    fn manager(rules: &str, force_legacy: bool) -> SnapshotManager {
        let mut config = PlaytestConfig::default();
        config.diff.force_legacy = force_legacy;
        SnapshotManager::from_config(
            &config,
            SnapshotStore::in_memory(),
            Arc::new(RuleSet::parse(rules).unwrap()),
        )
    }

    fn battle() -> (GameState, GameState) {
        let prev = GameState::new(1, 0.0);
        let mut curr = GameState::new(2, 1.0);
        curr.player.hp = 80;
        curr.world.in_battle = true;
        (prev, curr)
    }

    #[test]
    fn first_snapshot_starts_a_chain() {
        let mut manager = manager(RULES, false);
        let first = manager.create_snapshot(1, GameState::new(1, 0.0), &[]);
        let second = manager.create_snapshot(2, GameState::new(2, 1.0), &[]);
        let first_meta = manager.store().get_metadata(first).unwrap();
        let second_meta = manager.store().get_metadata(second).unwrap();
        assert_eq!(first_meta.snapshot_type, SnapshotType::Incremental);
        assert_eq!(first_meta.parent_id, None);
        assert_eq!(second_meta.parent_id, Some(first));
    }

    #[test]
    fn checkpoint_on_trigger_event() {
        let mut manager = manager(RULES, false);
        manager.create_snapshot(1, GameState::new(1, 0.0), &[]);
        let id = manager.create_snapshot(2, GameState::new(2, 1.0), &["level_up".to_owned()]);
        let state = manager.get_snapshot_at_tick(2).unwrap();
        assert_eq!(state.snapshot_type, SnapshotType::Checkpoint);
        assert_eq!(manager.history().last().map(|m| m.snapshot_id), Some(id));
    }

    #[test]
    fn full_snapshots_have_no_parent() {
        let mut manager = manager(RULES, false);
        manager.create_snapshot(1, GameState::new(1, 0.0), &[]);
        let id = manager.create_snapshot(150, GameState::new(150, 1.0), &[]);
        let metadata = manager.store().get_metadata(id).unwrap();
        assert_eq!(metadata.snapshot_type, SnapshotType::Full);
        assert_eq!(metadata.parent_id, None);
        assert_eq!(manager.chain().incremental_chain_length, 0);
        assert_eq!(manager.chain().last_full_tick, 150);
    }

    #[test]
    fn snapshot_lookup_by_tick() {
        let mut manager = manager(RULES, false);
        for tick in [10, 20, 30] {
            manager.create_snapshot(tick, GameState::new(tick, 0.0), &[]);
        }
        assert_eq!(manager.get_snapshot_at_tick(25).map(|s| s.tick), Some(20));
        assert_eq!(manager.get_snapshot_at_tick(30).map(|s| s.tick), Some(30));
        assert!(manager.get_snapshot_at_tick(5).is_none());

        let recent: Vec<u64> = manager.get_recent_snapshots(2).iter().map(|s| s.tick).collect();
        assert_eq!(recent, vec![20, 30]);
        assert_eq!(manager.get_recent_snapshots(10).len(), 3);
    }

    #[test]
    fn clear_resets_everything() {
        let mut manager = manager(RULES, false);
        manager.create_snapshot(150, GameState::new(150, 0.0), &[]);
        manager.clear();
        assert!(manager.history().is_empty());
        assert!(manager.store().is_empty());
        assert_eq!(manager.chain(), ChainState::default());
    }

    #[test]
    fn rules_drive_the_diff() {
        let manager = manager(RULES, false);
        let (prev, curr) = battle();
        let outcome = manager.compute_diff_detailed(&prev, &curr, None);
        assert_eq!(outcome.source, DiffSource::Rules);
        assert_eq!(outcome.diff.events_inferred, vec!["battle_start", "player_damaged"]);
        assert_eq!(outcome.diff.hp_delta, -20);
    }

    #[test]
    fn failing_inference_falls_back_to_legacy() {
        let rules = r#"{"computed_values": {"broken": "curr.ui.current_scene * 2"}}"#;
        let manager = manager(rules, false);
        let (prev, curr) = battle();
        let outcome = manager.compute_diff_detailed(&prev, &curr, None);
        assert_eq!(outcome.source, DiffSource::Legacy);
        assert!(outcome.diff.battle_started);
        assert_eq!(outcome.diff.events_inferred, vec!["battle_start", "player_damaged"]);
    }

    #[test]
    fn force_legacy_skips_rules() {
        let manager = manager(RULES, true);
        let (prev, curr) = battle();
        let outcome = manager.compute_diff_detailed(&prev, &curr, None);
        assert_eq!(outcome.source, DiffSource::Legacy);
        assert!(outcome.events.is_empty());
        assert_eq!(manager.compute_diff(&prev, &curr).hp_delta, -20);
    }
}
