//! Replay binary for playtest snapshot directories.
//!
//! Reads the snapshots a previous run wrote, re-infers the events of every
//! consecutive pair with the current rule document, and logs the results.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `playtest-config.yaml`
//! 2. Initialize structured logging (tracing)
//! 3. Load the event rules
//! 4. Index the snapshot directory
//! 5. Replay and diff every snapshot in it

mod error;

use std::path::Path;
use std::sync::Arc;

use playtest_rules::{InferenceEngine, RuleSet};
use playtest_snapshot::{PlaytestConfig, SnapshotReplayer, StateDiffer};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::error::CliError;

fn main() -> Result<(), CliError> {
    // 1. Load configuration.
    let config = load_config()?;

    // 2. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_target(true)
        .init();

    info!("playtest-replay starting");

    // 3. Load event rules.
    let rules = RuleSet::load(&config.rules.path)?;
    info!(
        rules = rules.len(),
        computed_values = rules.computed_definitions().len(),
        force_legacy = config.diff.force_legacy,
        "Event rules ready"
    );
    let differ = StateDiffer::new(
        InferenceEngine::new(Arc::new(rules)),
        config.diff.force_legacy,
    );

    // 4. Index the snapshot directory.
    let dir = config.snapshots.snapshot_dir.ok_or(CliError::NoSnapshotDir)?;
    let mut replayer = SnapshotReplayer::open(&dir, differ)?;
    info!(
        dir = %dir.display(),
        snapshots = replayer.store().len(),
        "Snapshot directory opened"
    );

    // 5. Replay and diff.
    let states = replayer.replay_range(0, u64::MAX);
    for state in &states {
        info!(
            tick = state.tick,
            snapshot_type = %state.snapshot_type,
            hp = state.player.hp,
            max_hp = state.player.max_hp,
            floor = state.world.floor,
            in_battle = state.world.in_battle,
            "Snapshot"
        );
    }

    let diffs = replayer.diff_range(0, u64::MAX);
    let mut event_total: usize = 0;
    for diff in &diffs {
        event_total = event_total.saturating_add(diff.events_inferred.len());
        info!(
            tick_from = diff.tick_from,
            tick_to = diff.tick_to,
            hp_delta = diff.hp_delta,
            gold_delta = diff.gold_delta,
            exp_delta = diff.exp_delta,
            events = ?diff.events_inferred,
            "Diff"
        );
    }

    info!(
        snapshots = states.len(),
        diffs = diffs.len(),
        events = event_total,
        "Replay complete"
    );
    Ok(())
}

/// Load configuration from `playtest-config.yaml`.
///
/// If the file does not exist, defaults are used (environment overrides
/// still apply).
fn load_config() -> Result<PlaytestConfig, CliError> {
    let config_path = Path::new("playtest-config.yaml");
    if config_path.exists() {
        Ok(PlaytestConfig::from_file(config_path)?)
    } else {
        let mut config = PlaytestConfig::default();
        config.apply_env_overrides();
        Ok(config)
    }
}
