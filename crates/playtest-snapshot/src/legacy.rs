//! Hand-written diff used when rule inference is unavailable.
//!
//! Recomputes the [`StateDiff`] fields straight from the two states and
//! infers a fixed set of events without consulting any rules. Kept alongside
//! the rule engine as a fallback; the two are not guaranteed to agree on the
//! event list.

use playtest_rules::computed::{has_dialog, item_changes, monster_killed, newly_added};
use playtest_types::{ComputedValues, GameState, StateDiff};
use serde_json::Value;

/// Diff `prev` -> `curr` without rules.
///
/// `changes` only carries the nonzero deltas and a floor change flag.
/// Events are listed once each, in the order first detected.
pub fn legacy_diff(prev: &GameState, curr: &GameState) -> StateDiff {
    let mut changes = ComputedValues::new();
    let mut events = EventList::default();

    let hp_delta = curr.player.hp.saturating_sub(prev.player.hp);
    let gold_delta = curr.player.gold.saturating_sub(prev.player.gold);
    let exp_delta = curr.player.exp.saturating_sub(prev.player.exp);
    for (name, delta) in [("hp_delta", hp_delta), ("gold_delta", gold_delta), ("exp_delta", exp_delta)] {
        if delta != 0 {
            changes.insert(name.to_owned(), Value::from(delta));
        }
    }

    let floor_changed = curr.world.floor != prev.world.floor;
    if floor_changed {
        changes.insert("floor_changed".to_owned(), Value::Bool(true));
        events.push("floor_advance");
    }

    let battle_started = curr.world.in_battle && !prev.world.in_battle;
    if battle_started {
        events.push("battle_start");
    }
    let battle_ended = prev.world.in_battle && !curr.world.in_battle;
    if battle_ended {
        events.push("battle_end");
    }

    let killed = monster_killed(prev, curr, battle_ended);
    if killed.is_some() {
        events.push("monster_killed");
    }

    let player_died = curr.player.hp <= 0 && prev.player.hp > 0;
    if player_died {
        events.push("player_death");
    }

    let level_up = curr.player.level > prev.player.level;
    if level_up {
        events.push("level_up");
    }

    if hp_delta < 0 {
        events.push("player_damaged");
    } else if hp_delta > 0 && !level_up {
        events.push("player_healed");
    }

    let (item_obtained, item_used) = item_changes(&prev.inventory, &curr.inventory);
    if !item_obtained.is_empty() {
        events.push("item_obtain");
    }
    if !item_used.is_empty() {
        events.push("item_use");
    }

    let scene_changed = curr.ui.current_scene != prev.ui.current_scene;
    if scene_changed {
        events.push("scene_change");
    }

    let prev_dialog = has_dialog(prev.ui.active_dialog.as_deref());
    let curr_dialog = has_dialog(curr.ui.active_dialog.as_deref());
    let dialog_opened = curr_dialog && !prev_dialog;
    let dialog_closed = prev_dialog && !curr_dialog;
    if dialog_opened {
        events.push("dialog_open");
    }
    if dialog_closed {
        events.push("dialog_close");
    }

    let tutorial_advanced = matches!(
        (prev.ui.tutorial_step, curr.ui.tutorial_step),
        (Some(before), Some(after)) if after > before
    );
    if tutorial_advanced {
        events.push("tutorial_advance");
    }

    let achievement_unlocked = newly_added(&prev.character.achievements, &curr.character.achievements);
    if !achievement_unlocked.is_empty() {
        events.push("achievement_unlock");
    }
    let feature_unlocked = newly_added(
        &prev.character.unlocked_features,
        &curr.character.unlocked_features,
    );
    if !feature_unlocked.is_empty() {
        events.push("feature_unlock");
    }

    let story_progress_updated = curr.character.story_progress != prev.character.story_progress;
    if story_progress_updated {
        events.push("story_progress");
    }

    StateDiff {
        tick_from: prev.tick,
        tick_to: curr.tick,
        changes,
        events_inferred: events.0,
        hp_delta,
        gold_delta,
        exp_delta,
        floor_changed,
        battle_started,
        battle_ended,
        level_up,
        item_obtained,
        item_used,
        monster_killed: killed,
        player_died,
        scene_changed,
        scene_from: scene_changed.then(|| prev.ui.current_scene.clone()),
        scene_to: scene_changed.then(|| curr.ui.current_scene.clone()),
        dialog_opened,
        dialog_closed,
        tutorial_advanced,
        achievement_unlocked,
        feature_unlocked,
        story_progress_updated,
        playtime_delta_ms: curr
            .character
            .playtime_ms
            .saturating_sub(prev.character.playtime_ms),
    }
}

/// Insertion-ordered event ids without repeats.
#[derive(Default)]
struct EventList(Vec<String>);

impl EventList {
    fn push(&mut self, event_id: &str) {
        if !self.0.iter().any(|e| e == event_id) {
            self.0.push(event_id.to_owned());
        }
    }
}
