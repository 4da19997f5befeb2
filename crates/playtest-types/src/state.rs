//! Game state captured once per simulated tick.
//!
//! A [`GameState`] is the full picture of the simulated world at one tick:
//! the player, the monster currently engaged (if any), inventory, floor
//! progression, meta-progress, UI scene, quests, economy, and event progress.
//! The simulation produces it; this workspace only reads it.
//!
//! Field names serialize in `snake_case` because event rules address them by
//! dotted path (`curr.player.max_hp`, `prev.world.in_battle`). A handful of
//! legacy spellings are accepted on input via `serde(alias)`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::enums::SnapshotType;
use crate::ids::SnapshotId;

/// Free-form structured payload (buffs, notifications, quest entries).
pub type Attributes = serde_json::Map<String, serde_json::Value>;

// ---------------------------------------------------------------------------
// Player
// ---------------------------------------------------------------------------

/// The player character's combat stats and loadout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    /// Current hit points. May drop to zero or below on death.
    pub hp: i64,
    /// Maximum hit points.
    pub max_hp: i64,
    /// Current mana.
    #[serde(default)]
    pub mp: i64,
    /// Maximum mana.
    #[serde(default)]
    pub max_mp: i64,
    /// Character level.
    pub level: u32,
    /// Experience towards the next level.
    pub exp: i64,
    /// Experience required for the next level.
    pub max_exp: i64,
    /// Attack power.
    pub atk: i64,
    /// Defense rating.
    #[serde(default, alias = "def")]
    pub defense: i64,
    /// Carried gold.
    pub gold: i64,
    /// Critical hit chance (0.0 to 1.0).
    #[serde(default = "default_crit_rate")]
    pub crit_rate: f64,
    /// Dodge chance (0.0 to 1.0).
    #[serde(default = "default_dodge_rate")]
    pub dodge_rate: f64,
    /// Equipped weapon id.
    #[serde(default)]
    pub weapon: Option<String>,
    /// Equipped armor id.
    #[serde(default)]
    pub armor: Option<String>,
    /// Skills the player has learned.
    #[serde(default)]
    pub learned_skills: Vec<String>,
    /// Skills currently slotted for use.
    #[serde(default)]
    pub equipped_skills: Vec<String>,
    /// Remaining cooldown ticks per skill id.
    #[serde(default)]
    pub skill_cooldowns: BTreeMap<String, i64>,
    /// Current stamina.
    #[serde(default = "default_stamina")]
    pub stamina: i64,
    /// Maximum stamina.
    #[serde(default = "default_stamina")]
    pub max_stamina: i64,
    /// Active positive effects.
    #[serde(default)]
    pub buffs: Vec<Attributes>,
    /// Active negative effects.
    #[serde(default)]
    pub debuffs: Vec<Attributes>,
}

impl Default for PlayerState {
    fn default() -> Self {
        Self {
            hp: 100,
            max_hp: 100,
            mp: 50,
            max_mp: 50,
            level: 1,
            exp: 0,
            max_exp: 100,
            atk: 10,
            defense: 5,
            gold: 0,
            crit_rate: default_crit_rate(),
            dodge_rate: default_dodge_rate(),
            weapon: None,
            armor: None,
            learned_skills: Vec::new(),
            equipped_skills: Vec::new(),
            skill_cooldowns: BTreeMap::new(),
            stamina: default_stamina(),
            max_stamina: default_stamina(),
            buffs: Vec::new(),
            debuffs: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Monster
// ---------------------------------------------------------------------------

/// The monster the player is currently fighting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonsterState {
    /// Monster template id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Current hit points.
    pub hp: i64,
    /// Maximum hit points.
    #[serde(alias = "maxHP")]
    pub max_hp: i64,
    /// Attack power.
    pub atk: i64,
    /// Defense rating.
    #[serde(default, alias = "def")]
    pub defense: i64,
    /// Critical hit chance.
    #[serde(default = "default_crit_rate")]
    pub crit_rate: f64,
    /// Dodge chance.
    #[serde(default = "default_dodge_rate")]
    pub dodge_rate: f64,
    /// Whether this is a floor boss.
    #[serde(default)]
    pub is_boss: bool,
}

// ---------------------------------------------------------------------------
// Inventory
// ---------------------------------------------------------------------------

/// One stack in the player's bag.
///
/// Only `id` and `count` matter for diffing; everything else the simulation
/// attaches (name, rarity, forge level) is kept verbatim in `attributes`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryItem {
    /// Item id.
    pub id: String,
    /// Stack size.
    #[serde(default = "default_item_count")]
    pub count: u32,
    /// Any other fields the simulation attached to the item.
    #[serde(flatten)]
    pub attributes: Attributes,
}

impl InventoryItem {
    /// A stack of `count` items with no extra attributes.
    pub fn new(id: impl Into<String>, count: u32) -> Self {
        Self {
            id: id.into(),
            count,
            attributes: Attributes::new(),
        }
    }
}

/// The player's bag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryState {
    /// Number of slots.
    pub slots: u32,
    /// Item stacks in bag order.
    #[serde(default)]
    pub items: Vec<InventoryItem>,
}

impl Default for InventoryState {
    fn default() -> Self {
        Self {
            slots: 20,
            items: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// World
// ---------------------------------------------------------------------------

/// Floor progression and calendar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldState {
    /// Current dungeon floor.
    pub floor: u32,
    /// Monsters killed on the current floor.
    #[serde(default, alias = "killed")]
    pub killed_on_floor: u32,
    /// Kills required before the next floor opens.
    #[serde(default = "default_monsters_to_advance")]
    pub monsters_to_advance: u32,
    /// Whether the next floor is open.
    #[serde(default, alias = "canAdvanceFloor")]
    pub can_advance: bool,
    /// Whether a battle is in progress.
    pub in_battle: bool,
    /// Area id.
    #[serde(default = "default_area_id")]
    pub area_id: String,
    /// Area display name.
    #[serde(default = "default_area_name")]
    pub area_name: String,
    /// In-game day counter.
    #[serde(default = "default_one")]
    pub game_day: u32,
    /// Time of day label.
    #[serde(default = "default_time_period")]
    pub time_period: String,
    /// In-game week counter.
    #[serde(default = "default_one")]
    pub week_number: u32,
    /// In-game month counter.
    #[serde(default = "default_one")]
    pub month_number: u32,
    /// Limited-time events currently running.
    #[serde(default)]
    pub active_events: Vec<Attributes>,
}

impl Default for WorldState {
    fn default() -> Self {
        Self {
            floor: 1,
            killed_on_floor: 0,
            monsters_to_advance: default_monsters_to_advance(),
            can_advance: false,
            in_battle: false,
            area_id: default_area_id(),
            area_name: default_area_name(),
            game_day: 1,
            time_period: default_time_period(),
            week_number: 1,
            month_number: 1,
            active_events: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Character meta-progress
// ---------------------------------------------------------------------------

/// Account-level progress that survives death.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CharacterState {
    /// Points invested per skill tree node.
    pub skill_tree: BTreeMap<String, i64>,
    /// Unlocked achievement ids, in unlock order.
    pub achievements: Vec<String>,
    /// Unlocked feature ids, in unlock order.
    pub unlocked_features: Vec<String>,
    /// Story flags and chapter markers.
    pub story_progress: Attributes,
    /// Total play time in milliseconds.
    pub playtime_ms: i64,
    /// Battles fought.
    pub total_battles: u32,
    /// Monsters killed.
    pub total_kills: u32,
    /// Deepest floor reached.
    pub highest_floor: u32,
    /// Times the player died.
    pub deaths: u32,
    /// Consecutive login days.
    pub login_streak: u32,
    /// Date of the last login (`YYYY-MM-DD`).
    pub last_login_date: Option<String>,
}

impl Default for CharacterState {
    fn default() -> Self {
        Self {
            skill_tree: BTreeMap::new(),
            achievements: Vec::new(),
            unlocked_features: Vec::new(),
            story_progress: Attributes::new(),
            playtime_ms: 0,
            total_battles: 0,
            total_kills: 0,
            highest_floor: 1,
            deaths: 0,
            login_streak: 0,
            last_login_date: None,
        }
    }
}

// ---------------------------------------------------------------------------
// UI / scene
// ---------------------------------------------------------------------------

/// What the player is looking at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiState {
    /// Active scene (`explore`, `battle`, `shop`, ...).
    pub current_scene: String,
    /// Open dialog id, if any.
    pub active_dialog: Option<String>,
    /// Choices offered by the open dialog.
    pub dialog_options: Vec<String>,
    /// Choices the player has picked so far.
    pub selected_options: Vec<String>,
    /// Tutorial step, if the tutorial is running.
    pub tutorial_step: Option<i64>,
    /// Pending toast notifications.
    pub notifications: Vec<Attributes>,
    /// Element under the cursor.
    pub hovered_element: Option<String>,
    /// Panel with keyboard focus.
    pub focused_panel: Option<String>,
    /// Timestamp the current scene was entered.
    pub scene_enter_time: f64,
    /// Timestamp of the last player input.
    pub last_action_time: f64,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            current_scene: "explore".to_owned(),
            active_dialog: None,
            dialog_options: Vec::new(),
            selected_options: Vec::new(),
            tutorial_step: None,
            notifications: Vec::new(),
            hovered_element: None,
            focused_panel: None,
            scene_enter_time: 0.0,
            last_action_time: 0.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Quests, economy, events
// ---------------------------------------------------------------------------

/// Quest log.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuestState {
    /// Quests in progress.
    pub active_quests: Vec<Attributes>,
    /// Completed quest ids.
    pub completed_quests: Vec<String>,
    /// Daily quest resets performed.
    pub daily_reset_count: u32,
    /// Quest chains made available.
    pub unlocked_chains: Vec<String>,
}

/// Premium currency and shop activity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EconomyState {
    /// Premium currency balance.
    pub premium_currency: i64,
    /// VIP tier.
    pub vip_level: u32,
    /// Progress towards the next VIP tier.
    pub vip_exp: i64,
    /// Real money spent, in minor units.
    pub total_spent: i64,
    /// Last shop action (`buy`, `sell`, `refresh`).
    pub shop_last_action: Option<String>,
    /// Item touched by the last shop action.
    pub shop_last_item: Option<String>,
}

/// Progress through limited-time events.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventState {
    /// Reward ids already claimed.
    pub rewards_claimed: Vec<String>,
    /// Progress counter per event id.
    pub event_progress: BTreeMap<String, i64>,
}

// ---------------------------------------------------------------------------
// GameState
// ---------------------------------------------------------------------------

/// The whole simulated world at one tick.
///
/// Built once per tick by the caller, stamped with its [`SnapshotType`] and
/// parent by the snapshot manager, then never mutated again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    /// Monotonic tick counter.
    pub tick: u64,
    /// Simulation time in seconds.
    pub timestamp: f64,
    /// The player.
    pub player: PlayerState,
    /// The monster being fought, if any.
    #[serde(default)]
    pub monster: Option<MonsterState>,
    /// The player's bag.
    pub inventory: InventoryState,
    /// Floor progression.
    pub world: WorldState,
    /// Meta-progress.
    #[serde(default)]
    pub character: CharacterState,
    /// UI and scene.
    #[serde(default)]
    pub ui: UiState,
    /// Quest log.
    #[serde(default)]
    pub quest: QuestState,
    /// Premium economy.
    #[serde(default)]
    pub economy: EconomyState,
    /// Limited-time event progress.
    #[serde(default)]
    pub event: EventState,
    /// Kind of snapshot this state was persisted as.
    #[serde(default)]
    pub snapshot_type: SnapshotType,
    /// The snapshot this one chains from. Lookup only.
    #[serde(default)]
    pub parent_id: Option<SnapshotId>,
}

impl GameState {
    /// A fresh state at `tick` with default substates.
    pub fn new(tick: u64, timestamp: f64) -> Self {
        Self {
            tick,
            timestamp,
            player: PlayerState::default(),
            monster: None,
            inventory: InventoryState::default(),
            world: WorldState::default(),
            character: CharacterState::default(),
            ui: UiState::default(),
            quest: QuestState::default(),
            economy: EconomyState::default(),
            event: EventState::default(),
            snapshot_type: SnapshotType::default(),
            parent_id: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Serde default helpers
// ---------------------------------------------------------------------------

const fn default_crit_rate() -> f64 {
    0.1
}

const fn default_dodge_rate() -> f64 {
    0.05
}

const fn default_stamina() -> i64 {
    100
}

const fn default_item_count() -> u32 {
    1
}

const fn default_monsters_to_advance() -> u32 {
    3
}

const fn default_one() -> u32 {
    1
}

fn default_area_id() -> String {
    "default".to_owned()
}

fn default_area_name() -> String {
    "Starting Area".to_owned()
}

fn default_time_period() -> String {
    "day".to_owned()
}
