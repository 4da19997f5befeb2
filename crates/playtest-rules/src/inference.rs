//! Rule-based event inference.
//!
//! No simulated component emits events. Instead, for every tick transition
//! the engine computes derived values from the two states, runs every loaded
//! rule in priority order, and reports the rules whose condition held. A rule
//! may reference events fired earlier in the same pass by id, as a boolean.

use std::collections::BTreeMap;
use std::sync::Arc;

use playtest_types::{Attributes, ComputedValues, GameState, StateDiff};
use serde_json::Value;
use tracing::debug;

use crate::computed::builtin_values;
use crate::error::{EvalError, InferenceError};
use crate::expression::{EvaluationContext, is_truthy};
use crate::loader::{EventRule, RuleSet};

/// An event inferred for one tick transition.
#[derive(Debug, Clone, PartialEq)]
pub struct InferredEvent {
    /// The rule's event id.
    pub event_id: String,
    /// The rule's description.
    pub description: String,
    /// The rule's category.
    pub category: String,
    /// The rule's priority.
    pub priority: i64,
    /// Values extracted by the rule's `data_extract` expressions.
    pub data: Attributes,
}

/// Everything one inference pass produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Inference {
    /// Fired events in priority order.
    pub events: Vec<InferredEvent>,
    /// Extracted data keyed by event id.
    ///
    /// Every fired event has an entry, empty when its rule extracts nothing.
    /// Test for a field, not for the key, to tell whether data was extracted.
    pub extracted: BTreeMap<String, Attributes>,
    /// The computed values the rules were evaluated against.
    pub computed: ComputedValues,
}

impl Inference {
    /// Fired event ids in order.
    pub fn event_ids(&self) -> Vec<String> {
        self.events.iter().map(|e| e.event_id.clone()).collect()
    }
}

/// Infers events from pairs of game states using a shared [`RuleSet`].
#[derive(Debug, Clone)]
pub struct InferenceEngine {
    rules: Arc<RuleSet>,
}

impl InferenceEngine {
    /// An engine over `rules`.
    pub const fn new(rules: Arc<RuleSet>) -> Self {
        Self { rules }
    }

    /// The rules this engine evaluates.
    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Infer the events implied by the `prev` -> `curr` transition.
    ///
    /// A rule whose condition or extraction fails to evaluate is skipped and
    /// logged. The pass as a whole only fails when the states cannot be
    /// prepared or a declared computed value fails.
    pub fn infer(
        &self,
        prev: &GameState,
        curr: &GameState,
        action_result: Option<&Attributes>,
    ) -> Result<Inference, InferenceError> {
        let prev_tree = serde_json::to_value(prev)?;
        let curr_tree = serde_json::to_value(curr)?;
        let computed = self.compute_values(prev, curr, &prev_tree, &curr_tree, action_result)?;

        let mut ctx = EvaluationContext::new(&prev_tree, &curr_tree, &computed, action_result);
        let mut events = Vec::new();
        let mut extracted = BTreeMap::new();

        for rule in self.rules.rules() {
            match fire(rule, &ctx) {
                Ok(Some(data)) => {
                    ctx.fired.push(rule.event_id.clone());
                    extracted.insert(rule.event_id.clone(), data.clone());
                    events.push(InferredEvent {
                        event_id: rule.event_id.clone(),
                        description: rule.description.clone(),
                        category: rule.category.clone(),
                        priority: rule.priority,
                        data,
                    });
                }
                Ok(None) => {}
                Err(e) => {
                    debug!(event_id = rule.event_id, error = %e, "Skipping rule that failed to evaluate");
                }
            }
        }

        Ok(Inference {
            events,
            extracted,
            computed,
        })
    }

    /// Builtin computed values plus every declared definition, in order.
    ///
    /// Each declaration sees the builtins and the declarations before it.
    fn compute_values(
        &self,
        prev: &GameState,
        curr: &GameState,
        prev_tree: &Value,
        curr_tree: &Value,
        action_result: Option<&Attributes>,
    ) -> Result<ComputedValues, InferenceError> {
        let mut computed = builtin_values(prev, curr);
        for definition in self.rules.computed_definitions() {
            let value = {
                let ctx = EvaluationContext::new(prev_tree, curr_tree, &computed, action_result);
                definition
                    .compiled
                    .evaluate(&ctx)
                    .map_err(|source| InferenceError::ComputedValue {
                        name: definition.name.clone(),
                        source,
                    })?
            };
            computed.insert(definition.name.clone(), value);
        }
        Ok(computed)
    }

    /// Map computed values and fired events onto the fixed [`StateDiff`]
    /// shape.
    ///
    /// Missing values take their neutral default; a value of the wrong type
    /// is an error.
    pub fn build_state_diff(
        prev: &GameState,
        curr: &GameState,
        events: &[InferredEvent],
        computed: &ComputedValues,
    ) -> Result<StateDiff, InferenceError> {
        let view = ComputedView(computed);
        Ok(StateDiff {
            tick_from: prev.tick,
            tick_to: curr.tick,
            changes: computed.clone(),
            events_inferred: events.iter().map(|e| e.event_id.clone()).collect(),
            hp_delta: view.int("hp_delta")?,
            gold_delta: view.int("gold_delta")?,
            exp_delta: view.int("exp_delta")?,
            floor_changed: view.flag("floor_changed")?,
            battle_started: view.flag("battle_started")?,
            battle_ended: view.flag("battle_ended")?,
            level_up: view.flag("level_up")?,
            item_obtained: view.strings("item_obtained")?,
            item_used: view.strings("item_used")?,
            monster_killed: view.text("monster_killed")?,
            player_died: view.flag("player_died")?,
            scene_changed: view.flag("scene_changed")?,
            scene_from: view.text("scene_from")?,
            scene_to: view.text("scene_to")?,
            dialog_opened: view.flag("dialog_opened")?,
            dialog_closed: view.flag("dialog_closed")?,
            tutorial_advanced: view.flag("tutorial_advanced")?,
            achievement_unlocked: view.strings("achievement_unlocked")?,
            feature_unlocked: view.strings("feature_unlocked")?,
            story_progress_updated: view.flag("story_progress_updated")?,
            playtime_delta_ms: view.int("playtime_delta_ms")?,
        })
    }
}

/// Evaluate one rule. `Ok(Some(data))` when it fires.
fn fire(rule: &EventRule, ctx: &EvaluationContext<'_>) -> Result<Option<Attributes>, EvalError> {
    if !is_truthy(&rule.compiled.evaluate(ctx)?) {
        return Ok(None);
    }
    let mut data = Attributes::new();
    for extraction in &rule.data_extract {
        data.insert(extraction.key.clone(), extraction.expr.evaluate(ctx)?);
    }
    Ok(Some(data))
}

/// Typed reads from a computed value map.
struct ComputedView<'a>(&'a ComputedValues);

impl ComputedView<'_> {
    fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name).filter(|value| !value.is_null())
    }

    fn malformed(name: &str, expected: &'static str) -> InferenceError {
        InferenceError::MalformedValue {
            name: name.to_owned(),
            expected,
        }
    }

    fn int(&self, name: &str) -> Result<i64, InferenceError> {
        self.get(name).map_or(Ok(0), |value| {
            value.as_i64().ok_or_else(|| Self::malformed(name, "an integer"))
        })
    }

    fn flag(&self, name: &str) -> Result<bool, InferenceError> {
        self.get(name).map_or(Ok(false), |value| {
            value.as_bool().ok_or_else(|| Self::malformed(name, "a boolean"))
        })
    }

    fn text(&self, name: &str) -> Result<Option<String>, InferenceError> {
        self.get(name).map_or(Ok(None), |value| {
            value
                .as_str()
                .map(|s| Some(s.to_owned()))
                .ok_or_else(|| Self::malformed(name, "a string"))
        })
    }

    fn strings(&self, name: &str) -> Result<Vec<String>, InferenceError> {
        let Some(value) = self.get(name) else {
            return Ok(Vec::new());
        };
        let items = value
            .as_array()
            .ok_or_else(|| Self::malformed(name, "a list of strings"))?;
        items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_owned)
                    .ok_or_else(|| Self::malformed(name, "a list of strings"))
            })
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    const RULES: &str = r#"{
        "state_change_events": {
            "combat": {
                "battle_start": {"condition": "battle_started", "priority": 1, "data_extract": ["curr.monster.id"]},
                "player_damaged": {"condition": "hp_delta < 0", "priority": 5, "data_extract": ["hp_delta", "hp_ratio"]},
                "ambushed": {"condition": "battle_start && player_damaged", "priority": 6},
                "broken": {"condition": "curr.ui.current_scene > 3", "priority": 0},
                "bad_extract": {"condition": "battle_started", "priority": 2, "data_extract": ["curr.monster * 2"]}
            },
            "progress": {
                "level_up": {"condition": "level_up", "priority": 3},
                "low_hp_warning": {"condition": "low_hp", "priority": 7}
            }
        },
        "computed_values": {
            "low_hp": "hp_ratio < 0.9"
        }
    }"#;

    fn engine(json: &str) -> InferenceEngine {
        InferenceEngine::new(Arc::new(RuleSet::parse(json).unwrap()))
    }

    fn ambush() -> (GameState, GameState) {
        let prev = GameState::new(1, 1000.0);
        let mut curr = GameState::new(2, 1001.0);
        curr.player.hp = 80;
        curr.world.in_battle = true;
        curr.monster = Some(playtest_types::MonsterState {
            id: "goblin".to_owned(),
            name: "Goblin".to_owned(),
            hp: 40,
            max_hp: 40,
            atk: 8,
            defense: 2,
            crit_rate: 0.1,
            dodge_rate: 0.05,
            is_boss: false,
        });
        (prev, curr)
    }

    #[test]
    fn fires_in_priority_order_and_chains_on_earlier_events() {
        let (prev, curr) = ambush();
        let inference = engine(RULES).infer(&prev, &curr, None).unwrap();
        assert_eq!(
            inference.event_ids(),
            ["battle_start", "player_damaged", "ambushed", "low_hp_warning"]
        );
        assert_eq!(inference.extracted["battle_start"]["id"], json!("goblin"));
        assert_eq!(inference.extracted["player_damaged"]["hp_delta"], json!(-20));
        assert_eq!(inference.extracted["player_damaged"]["hp_ratio"], json!(0.8));
        assert!(inference.extracted["ambushed"].is_empty());
        assert_eq!(inference.extracted.len(), inference.events.len());
    }

    #[test]
    fn failing_rules_are_skipped() {
        let (prev, curr) = ambush();
        let inference = engine(RULES).infer(&prev, &curr, None).unwrap();
        assert!(!inference.event_ids().contains(&"broken".to_owned()));
        assert!(!inference.event_ids().contains(&"bad_extract".to_owned()));
    }

    #[test]
    fn declared_values_join_the_computed_map() {
        let (prev, curr) = ambush();
        let inference = engine(RULES).infer(&prev, &curr, None).unwrap();
        assert_eq!(inference.computed["low_hp"], json!(true));
    }

    #[test]
    fn identical_states_fire_nothing() {
        let state = GameState::new(5, 1000.0);
        let inference = engine(RULES).infer(&state, &state, None).unwrap();
        assert!(inference.events.is_empty());
    }

    #[test]
    fn action_result_is_visible_to_rules() {
        let json = r#"{"state_change_events": {"combat": {
            "critical_hit": {"condition": "action_result.crit == true", "data_extract": ["action_result.damage"]}
        }}}"#;
        let state = GameState::new(1, 0.0);
        let mut outcome = Attributes::new();
        outcome.insert("crit".to_owned(), json!(true));
        outcome.insert("damage".to_owned(), json!(33));
        let inference = engine(json).infer(&state, &state, Some(&outcome)).unwrap();
        assert_eq!(inference.event_ids(), ["critical_hit"]);
        assert_eq!(inference.extracted["critical_hit"]["damage"], json!(33));
    }

    #[test]
    fn failing_computed_value_fails_the_pass() {
        let json = r#"{"computed_values": {"nonsense": "curr.ui.current_scene - 1"}}"#;
        let state = GameState::new(1, 0.0);
        let result = engine(json).infer(&state, &state, None);
        assert!(matches!(result, Err(InferenceError::ComputedValue { .. })));
    }

    #[test]
    fn state_diff_mirrors_computed_values() {
        let (prev, curr) = ambush();
        let inference = engine(RULES).infer(&prev, &curr, None).unwrap();
        let diff =
            InferenceEngine::build_state_diff(&prev, &curr, &inference.events, &inference.computed)
                .unwrap();
        assert_eq!(diff.tick_from, 1);
        assert_eq!(diff.tick_to, 2);
        assert_eq!(diff.hp_delta, -20);
        assert!(diff.battle_started);
        assert!(!diff.battle_ended);
        assert!(diff.has_event("player_damaged"));
        assert_eq!(diff.changes["hp_ratio"], json!(0.8));
    }

    #[test]
    fn malformed_computed_map_is_rejected() {
        let state = GameState::new(1, 0.0);
        let mut computed = ComputedValues::new();
        computed.insert("hp_delta".to_owned(), json!("lots"));
        let result = InferenceEngine::build_state_diff(&state, &state, &[], &computed);
        assert!(matches!(result, Err(InferenceError::MalformedValue { .. })));
    }
}
