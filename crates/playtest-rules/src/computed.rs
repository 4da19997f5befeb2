//! Derived values computed for every tick transition.
//!
//! These are the names rule conditions use most (`hp_delta`,
//! `battle_started`, `item_obtained`, ...). The computation is total: it never
//! fails, and zero denominators give 0.

use playtest_types::{ComputedValues, GameState, InventoryState};
use serde_json::Value;

/// Names of the builtin computed values. Declared computed values may not
/// reuse them.
pub const BUILTIN_VALUES: &[&str] = &[
    "hp_delta",
    "mp_delta",
    "gold_delta",
    "exp_delta",
    "hp_ratio",
    "mp_ratio",
    "item_obtained",
    "item_used",
    "item_count_delta",
    "floor_changed",
    "battle_started",
    "battle_ended",
    "level_up",
    "player_died",
    "monster_killed",
    "scene_changed",
    "scene_from",
    "scene_to",
    "dialog_opened",
    "dialog_closed",
    "tutorial_advanced",
    "achievement_unlocked",
    "feature_unlocked",
    "story_progress_updated",
    "playtime_delta_ms",
];

/// Compute every builtin value for the `prev` -> `curr` transition.
pub fn builtin_values(prev: &GameState, curr: &GameState) -> ComputedValues {
    let mut computed = ComputedValues::new();
    let mut put = |name: &str, value: Value| {
        computed.insert(name.to_owned(), value);
    };

    put("hp_delta", curr.player.hp.saturating_sub(prev.player.hp).into());
    put("mp_delta", curr.player.mp.saturating_sub(prev.player.mp).into());
    put("gold_delta", curr.player.gold.saturating_sub(prev.player.gold).into());
    put("exp_delta", curr.player.exp.saturating_sub(prev.player.exp).into());
    put("hp_ratio", ratio(curr.player.hp, curr.player.max_hp));
    put("mp_ratio", ratio(curr.player.mp, curr.player.max_mp));

    let (obtained, used) = item_changes(&prev.inventory, &curr.inventory);
    let prev_kinds = item_counts(&prev.inventory).len();
    let curr_kinds = item_counts(&curr.inventory).len();
    put("item_obtained", obtained.into());
    put("item_used", used.into());
    put("item_count_delta", signed_difference(curr_kinds, prev_kinds).into());

    let battle_ended = prev.world.in_battle && !curr.world.in_battle;
    put("floor_changed", (curr.world.floor != prev.world.floor).into());
    put("battle_started", (curr.world.in_battle && !prev.world.in_battle).into());
    put("battle_ended", battle_ended.into());
    put("level_up", (curr.player.level > prev.player.level).into());
    put("player_died", (curr.player.hp <= 0 && prev.player.hp > 0).into());
    put("monster_killed", monster_killed(prev, curr, battle_ended).into());

    let scene_changed = curr.ui.current_scene != prev.ui.current_scene;
    put("scene_changed", scene_changed.into());
    put(
        "scene_from",
        scene_changed.then(|| prev.ui.current_scene.clone()).into(),
    );
    put(
        "scene_to",
        scene_changed.then(|| curr.ui.current_scene.clone()).into(),
    );
    put(
        "dialog_opened",
        (has_dialog(curr.ui.active_dialog.as_deref()) && !has_dialog(prev.ui.active_dialog.as_deref()))
            .into(),
    );
    put(
        "dialog_closed",
        (has_dialog(prev.ui.active_dialog.as_deref()) && !has_dialog(curr.ui.active_dialog.as_deref()))
            .into(),
    );
    put(
        "tutorial_advanced",
        matches!(
            (prev.ui.tutorial_step, curr.ui.tutorial_step),
            (Some(before), Some(after)) if after > before
        )
        .into(),
    );

    put(
        "achievement_unlocked",
        newly_added(&prev.character.achievements, &curr.character.achievements).into(),
    );
    put(
        "feature_unlocked",
        newly_added(
            &prev.character.unlocked_features,
            &curr.character.unlocked_features,
        )
        .into(),
    );
    put(
        "story_progress_updated",
        (curr.character.story_progress != prev.character.story_progress).into(),
    );
    put(
        "playtime_delta_ms",
        curr.character
            .playtime_ms
            .saturating_sub(prev.character.playtime_ms)
            .into(),
    );

    computed
}

/// Distinct item ids with their stack counts, in first-seen order. A
/// repeated id keeps its first position and its last count.
pub fn item_counts(inventory: &InventoryState) -> Vec<(&str, u32)> {
    let mut counts: Vec<(&str, u32)> = Vec::with_capacity(inventory.items.len());
    for item in &inventory.items {
        if let Some(entry) = counts.iter_mut().find(|(id, _)| *id == item.id) {
            entry.1 = item.count;
        } else {
            counts.push((item.id.as_str(), item.count));
        }
    }
    counts
}

/// Item ids that appeared or grew, and item ids that disappeared or shrank.
pub fn item_changes(prev: &InventoryState, curr: &InventoryState) -> (Vec<String>, Vec<String>) {
    let before = item_counts(prev);
    let after = item_counts(curr);
    let count_in = |counts: &[(&str, u32)], id: &str| {
        counts.iter().find(|(other, _)| *other == id).map(|(_, n)| *n)
    };

    let obtained = after
        .iter()
        .filter(|(id, count)| count_in(&before, id).is_none_or(|old| *count > old))
        .map(|(id, _)| (*id).to_owned())
        .collect();
    let used = before
        .iter()
        .filter(|(id, count)| count_in(&after, id).is_none_or(|new| *count > new))
        .map(|(id, _)| (*id).to_owned())
        .collect();

    (obtained, used)
}

/// Entries of `curr` not present in `prev`, in `curr` order.
pub fn newly_added(prev: &[String], curr: &[String]) -> Vec<String> {
    curr.iter().filter(|entry| !prev.contains(entry)).cloned().collect()
}

/// Id of the monster that was present before a battle ended and is gone now.
pub fn monster_killed(prev: &GameState, curr: &GameState, battle_ended: bool) -> Option<String> {
    match (&prev.monster, &curr.monster) {
        (Some(monster), None) if battle_ended => Some(monster.id.clone()),
        _ => None,
    }
}

/// Whether a dialog slot holds an open dialog.
pub fn has_dialog(slot: Option<&str>) -> bool {
    slot.is_some_and(|dialog| !dialog.is_empty())
}

#[allow(clippy::cast_precision_loss)]
fn ratio(value: i64, max: i64) -> Value {
    if max > 0 {
        Value::from(value as f64 / max as f64)
    } else {
        Value::from(0)
    }
}

fn signed_difference(a: usize, b: usize) -> i64 {
    let a = i64::try_from(a).unwrap_or(i64::MAX);
    let b = i64::try_from(b).unwrap_or(i64::MAX);
    a.saturating_sub(b)
}
