//! The delta between two consecutive game states.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Named derived values computed for one tick transition.
///
/// Keys are the names rule conditions reference (`hp_delta`, `hp_ratio`,
/// `battle_started`, ...).
pub type ComputedValues = BTreeMap<String, serde_json::Value>;

/// What changed between two ticks and which events that implies.
///
/// Never stored; produced and consumed within one tick's processing. The
/// fixed fields are convenience views over `changes`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateDiff {
    /// Tick of the earlier state.
    pub tick_from: u64,
    /// Tick of the later state.
    pub tick_to: u64,
    /// Every computed value for this transition.
    pub changes: ComputedValues,
    /// Ids of inferred events, in firing order.
    pub events_inferred: Vec<String>,

    /// Change in player hit points.
    pub hp_delta: i64,
    /// Change in gold.
    pub gold_delta: i64,
    /// Change in experience.
    pub exp_delta: i64,
    /// Whether the floor changed.
    pub floor_changed: bool,
    /// Whether a battle began.
    pub battle_started: bool,
    /// Whether a battle finished.
    pub battle_ended: bool,
    /// Whether the player gained a level.
    pub level_up: bool,
    /// Item ids that appeared or grew.
    pub item_obtained: Vec<String>,
    /// Item ids that disappeared or shrank.
    pub item_used: Vec<String>,
    /// Id of the monster defeated in a battle that just ended.
    pub monster_killed: Option<String>,
    /// Whether the player just died.
    pub player_died: bool,

    /// Whether the scene changed.
    pub scene_changed: bool,
    /// Scene left, when the scene changed.
    pub scene_from: Option<String>,
    /// Scene entered, when the scene changed.
    pub scene_to: Option<String>,
    /// Whether a dialog opened.
    pub dialog_opened: bool,
    /// Whether a dialog closed.
    pub dialog_closed: bool,
    /// Whether the tutorial moved forward.
    pub tutorial_advanced: bool,
    /// Newly unlocked achievements.
    pub achievement_unlocked: Vec<String>,
    /// Newly unlocked features.
    pub feature_unlocked: Vec<String>,
    /// Whether story flags changed.
    pub story_progress_updated: bool,
    /// Play time elapsed in milliseconds.
    pub playtime_delta_ms: i64,
}

impl StateDiff {
    /// Whether `event_id` was inferred for this transition.
    pub fn has_event(&self, event_id: &str) -> bool {
        self.events_inferred.iter().any(|e| e == event_id)
    }
}
