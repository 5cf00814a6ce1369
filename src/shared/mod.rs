//! Shared resources, events, and states for FocusQuest.
//!
//! This is the type contract. Every domain plugin imports from here.
//! No domain imports from any other domain directly.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ═══════════════════════════════════════════════════════════════════════
// GAME STATE — top-level app state machine
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, States, Default)]
pub enum GameState {
    #[default]
    Loading,
    MainMenu,
    Playing,
}

// ═══════════════════════════════════════════════════════════════════════
// ERRORS
// ═══════════════════════════════════════════════════════════════════════

/// Discriminated failure values surfaced by core operations. All of these
/// are recoverable by the caller; none are fatal to the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameError {
    /// An action was dispatched in a state where it is not legal
    /// (pause outside Work, re-opening a chest, resume without pause…).
    InvalidState(String),
    /// Input data failed a bounds or shape check (timer config out of range).
    Validation(String),
    /// Storage read/write failed; carries the underlying error string.
    Persistence(String),
    /// A persisted snapshot carried a different version string.
    VersionMismatch { found: String, expected: String },
}

impl std::fmt::Display for GameError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GameError::InvalidState(msg) => write!(f, "invalid state: {}", msg),
            GameError::Validation(msg) => write!(f, "validation failed: {}", msg),
            GameError::Persistence(msg) => write!(f, "persistence error: {}", msg),
            GameError::VersionMismatch { found, expected } => write!(
                f,
                "save version {} is incompatible with {}",
                found, expected
            ),
        }
    }
}

impl std::error::Error for GameError {}

// ═══════════════════════════════════════════════════════════════════════
// POMODORO TIMER
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Phase {
    #[default]
    Idle,
    Work,
    ShortBreak,
    LongBreak,
}

impl Phase {
    pub fn is_break(self) -> bool {
        matches!(self, Phase::ShortBreak | Phase::LongBreak)
    }
}

/// The actions the timer understands. Dispatched by the UI layer via
/// [`TimerActionEvent`] or synthesized by the tick system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerAction {
    Start,
    Pause,
    Resume,
    Skip,
    Reset,
    Tick { delta_seconds: u32 },
}

/// User-set phase durations, validated to bounded ranges at load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerConfig {
    pub work_minutes: u32,
    pub short_break_minutes: u32,
    pub long_break_minutes: u32,
    pub sessions_before_long_break: u32,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            work_minutes: 25,
            short_break_minutes: 5,
            long_break_minutes: 15,
            sessions_before_long_break: 4,
        }
    }
}

impl TimerConfig {
    pub const MIN_WORK_MINUTES: u32 = 1;
    pub const MAX_WORK_MINUTES: u32 = 120;
    pub const MIN_BREAK_MINUTES: u32 = 1;
    pub const MAX_BREAK_MINUTES: u32 = 60;
    pub const MIN_SESSIONS: u32 = 1;
    pub const MAX_SESSIONS: u32 = 12;

    pub fn validate(&self) -> Result<(), GameError> {
        if !(Self::MIN_WORK_MINUTES..=Self::MAX_WORK_MINUTES).contains(&self.work_minutes) {
            return Err(GameError::Validation(format!(
                "work_minutes {} out of range {}..={}",
                self.work_minutes,
                Self::MIN_WORK_MINUTES,
                Self::MAX_WORK_MINUTES
            )));
        }
        for (label, minutes) in [
            ("short_break_minutes", self.short_break_minutes),
            ("long_break_minutes", self.long_break_minutes),
        ] {
            if !(Self::MIN_BREAK_MINUTES..=Self::MAX_BREAK_MINUTES).contains(&minutes) {
                return Err(GameError::Validation(format!(
                    "{} {} out of range {}..={}",
                    label,
                    minutes,
                    Self::MIN_BREAK_MINUTES,
                    Self::MAX_BREAK_MINUTES
                )));
            }
        }
        if !(Self::MIN_SESSIONS..=Self::MAX_SESSIONS).contains(&self.sessions_before_long_break) {
            return Err(GameError::Validation(format!(
                "sessions_before_long_break {} out of range {}..={}",
                self.sessions_before_long_break,
                Self::MIN_SESSIONS,
                Self::MAX_SESSIONS
            )));
        }
        Ok(())
    }

    /// Seconds the given phase lasts. Idle shows the upcoming work length.
    pub fn phase_seconds(&self, phase: Phase) -> u32 {
        let minutes = match phase {
            Phase::Idle | Phase::Work => self.work_minutes,
            Phase::ShortBreak => self.short_break_minutes,
            Phase::LongBreak => self.long_break_minutes,
        };
        minutes * 60
    }
}

/// The Pomodoro phase state machine. Mutated only through
/// `dispatch` (implemented in the `timer` domain).
///
/// Invariants: `is_paused` implies `is_running`; `remaining_seconds`
/// resets to the entered phase's duration on every phase entry and is
/// never negative.
#[derive(Resource, Debug, Clone, Serialize, Deserialize)]
pub struct PomodoroTimer {
    pub phase: Phase,
    pub remaining_seconds: u32,
    pub is_running: bool,
    pub is_paused: bool,
    pub completed_sessions: u32,
    pub total_completed_sessions: u32,
    pub last_update_timestamp: u64,
    pub config: TimerConfig,
}

impl Default for PomodoroTimer {
    fn default() -> Self {
        Self::new(TimerConfig::default())
    }
}

impl PomodoroTimer {
    pub fn new(config: TimerConfig) -> Self {
        Self {
            phase: Phase::Idle,
            remaining_seconds: config.phase_seconds(Phase::Idle),
            is_running: false,
            is_paused: false,
            completed_sessions: 0,
            total_completed_sessions: 0,
            last_update_timestamp: current_timestamp(),
            config,
        }
    }
}

/// A phase boundary crossed by a dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseTransition {
    pub from: Phase,
    pub to: Phase,
}

/// What a dispatch did. `changed` is false for no-op ticks so the driving
/// system only notifies subscribers when observable state moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DispatchOutcome {
    pub changed: bool,
    pub transition: Option<PhaseTransition>,
}

// ═══════════════════════════════════════════════════════════════════════
// CHARACTER
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CharacterClass {
    #[default]
    Knight,
    Ranger,
    Scholar,
    Alchemist,
}

/// A full stat block. `health` is the current pool; everything else is
/// either a base value or a derived value depending on which block this is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub power: i32,
    pub focus: i32,
    pub defense: i32,
    pub luck: i32,
    pub health: i32,
    pub max_health: i32,
}

impl Default for Stats {
    fn default() -> Self {
        Self {
            power: 10,
            focus: 10,
            defense: 5,
            luck: 5,
            health: 100,
            max_health: 100,
        }
    }
}

/// Partial stat deltas carried by equipment, status effects, and buffs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct StatBonuses {
    pub power: i32,
    pub focus: i32,
    pub defense: i32,
    pub luck: i32,
    pub max_health: i32,
}

impl StatBonuses {
    pub fn is_zero(&self) -> bool {
        *self == StatBonuses::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum InjurySeverity {
    Minor,
    Moderate,
    Severe,
}

impl InjurySeverity {
    /// Percentage of *base* power/focus lost while injured.
    pub fn stat_penalty_percent(self) -> i32 {
        match self {
            InjurySeverity::Minor => 5,
            InjurySeverity::Moderate => 10,
            InjurySeverity::Severe => 20,
        }
    }

    /// Flat percentage subtracted from task success chance while injured.
    pub fn success_penalty_percent(self) -> i32 {
        match self {
            InjurySeverity::Minor => 5,
            InjurySeverity::Moderate => 10,
            InjurySeverity::Severe => 20,
        }
    }

    /// Flat gold fee the hospital charges to treat this severity.
    pub fn treatment_cost(self) -> u32 {
        match self {
            InjurySeverity::Minor => 50,
            InjurySeverity::Moderate => 120,
            InjurySeverity::Severe => 250,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct InjuryState {
    pub is_injured: bool,
    pub severity: Option<InjurySeverity>,
    pub injured_at: Option<u64>,
}

/// Debt created when injury treatment cost exceeds available gold.
/// Carries a focus penalty of `min(10, amount / 10)` until paid off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HospitalBill {
    pub amount: u32,
    pub created_at: u64,
}

impl HospitalBill {
    pub fn focus_penalty(&self) -> i32 {
        ((self.amount / 10) as i32).min(10)
    }
}

/// A timed (or permanent) stat modifier. `duration_ms == None` means the
/// effect lasts until explicitly removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEffect {
    pub name: String,
    pub bonuses: StatBonuses,
    pub applied_at_ms: u64,
    pub duration_ms: Option<u64>,
}

impl StatusEffect {
    pub fn is_expired(&self, now_ms: u64) -> bool {
        match self.duration_ms {
            Some(duration) => now_ms.saturating_sub(self.applied_at_ms) >= duration,
            None => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EquipSlot {
    Weapon,
    Armor,
    Accessory,
}

/// The three fixed equipment slots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Equipment {
    pub weapon: Option<Item>,
    pub armor: Option<Item>,
    pub accessory: Option<Item>,
}

impl Equipment {
    pub fn get(&self, slot: EquipSlot) -> Option<&Item> {
        match slot {
            EquipSlot::Weapon => self.weapon.as_ref(),
            EquipSlot::Armor => self.armor.as_ref(),
            EquipSlot::Accessory => self.accessory.as_ref(),
        }
    }

    pub fn get_mut(&mut self, slot: EquipSlot) -> &mut Option<Item> {
        match slot {
            EquipSlot::Weapon => &mut self.weapon,
            EquipSlot::Armor => &mut self.armor,
            EquipSlot::Accessory => &mut self.accessory,
        }
    }

    /// Sum of stat bonuses across all equipped items.
    pub fn total_bonuses(&self) -> StatBonuses {
        let mut total = StatBonuses::default();
        for item in [&self.weapon, &self.armor, &self.accessory]
            .into_iter()
            .flatten()
        {
            total.power += item.bonuses.power;
            total.focus += item.bonuses.focus;
            total.defense += item.bonuses.defense;
            total.luck += item.bonuses.luck;
            total.max_health += item.bonuses.max_health;
        }
        total
    }
}

/// The player character. `computed_stats` is always a pure function of
/// `base_stats` plus active modifiers; `recalculate_stats` (in the
/// `character` domain) must run after any mutation that could affect it.
#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CharacterState {
    pub class: CharacterClass,
    pub base_stats: Stats,
    pub computed_stats: Stats,
    pub equipment: Equipment,
    pub injury: InjuryState,
    pub hospital_bill: Option<HospitalBill>,
    pub status_effects: Vec<StatusEffect>,
}

// ═══════════════════════════════════════════════════════════════════════
// PROGRESSION
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct StreakState {
    pub current_streak: u32,
    pub longest_streak: u32,
    /// Epoch day (`unix_secs / 86_400`) of the last completed task.
    pub last_completion_day: Option<u64>,
    pub total_active_days: u32,
}

#[derive(Resource, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressionState {
    pub level: u32,
    pub current_xp: u32,
    pub xp_to_next_level: u32,
    pub total_xp: u64,
    pub streak: StreakState,
}

impl Default for ProgressionState {
    fn default() -> Self {
        Self {
            level: 1,
            current_xp: 0,
            xp_to_next_level: xp_for_level(1),
            total_xp: 0,
            streak: StreakState::default(),
        }
    }
}

/// XP required to advance *from* the given level.
pub fn xp_for_level(level: u32) -> u32 {
    100 * level
}

// ═══════════════════════════════════════════════════════════════════════
// ITEMS & INVENTORY
// ═══════════════════════════════════════════════════════════════════════

pub type ItemId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemCategory {
    Weapon,
    Armor,
    Accessory,
    Consumable,
    Material,
}

impl ItemCategory {
    pub fn equip_slot(self) -> Option<EquipSlot> {
        match self {
            ItemCategory::Weapon => Some(EquipSlot::Weapon),
            ItemCategory::Armor => Some(EquipSlot::Armor),
            ItemCategory::Accessory => Some(EquipSlot::Accessory),
            _ => None,
        }
    }
}

/// Five ordered quality tiers. Higher tiers scale item stats and value.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub enum Rarity {
    #[default]
    Common,
    Uncommon,
    Rare,
    Epic,
    Legendary,
}

impl Rarity {
    pub const ALL: [Rarity; 5] = [
        Rarity::Common,
        Rarity::Uncommon,
        Rarity::Rare,
        Rarity::Epic,
        Rarity::Legendary,
    ];

    pub fn stat_multiplier(self) -> f32 {
        match self {
            Rarity::Common => 1.0,
            Rarity::Uncommon => 1.2,
            Rarity::Rare => 1.5,
            Rarity::Epic => 2.0,
            Rarity::Legendary => 3.0,
        }
    }

    pub fn value_multiplier(self) -> f32 {
        match self {
            Rarity::Common => 1.0,
            Rarity::Uncommon => 1.5,
            Rarity::Rare => 2.5,
            Rarity::Epic => 4.0,
            Rarity::Legendary => 8.0,
        }
    }

    /// Draw weight before the luck shift is applied.
    pub fn base_weight(self) -> u32 {
        match self {
            Rarity::Common => 100,
            Rarity::Uncommon => 55,
            Rarity::Rare => 25,
            Rarity::Epic => 8,
            Rarity::Legendary => 2,
        }
    }
}

/// Inclusive integer range sampled uniformly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct EffectRange {
    pub min: i32,
    pub max: i32,
}

impl EffectRange {
    pub const fn new(min: i32, max: i32) -> Self {
        Self { min, max }
    }

    pub fn sample(&self, rng: &mut impl rand::Rng) -> i32 {
        if self.min >= self.max {
            self.min
        } else {
            rng.gen_range(self.min..=self.max)
        }
    }
}

/// Stat ranges an equippable template rolls its bonuses from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct StatRanges {
    pub power: EffectRange,
    pub focus: EffectRange,
    pub defense: EffectRange,
    pub luck: EffectRange,
    pub max_health: EffectRange,
}

/// What using a consumable does.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ConsumableEffect {
    pub heal: u32,
    pub cures_injury: bool,
    pub buff: Option<BuffSpec>,
}

/// A buff a consumable grants, instantiated into a [`StatusEffect`] on use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuffSpec {
    pub name: String,
    pub bonuses: StatBonuses,
    pub duration_ms: Option<u64>,
}

/// Immutable catalog definition an [`Item`] instance is rolled from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemTemplate {
    pub id: ItemId,
    pub name: String,
    pub category: ItemCategory,
    pub stat_ranges: StatRanges,
    pub effect: Option<ConsumableEffect>,
    pub base_value: u32,
    pub max_stack: u32,
}

/// A concrete item instance. Equippables carry rolled stat bonuses;
/// consumables carry their effect. Stacks merge on (template_id, rarity).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub template_id: ItemId,
    pub name: String,
    pub category: ItemCategory,
    pub rarity: Rarity,
    pub bonuses: StatBonuses,
    pub effect: Option<ConsumableEffect>,
    pub value: u32,
    pub max_stack: u32,
}

impl Item {
    pub fn stacks_with(&self, other: &Item) -> bool {
        self.template_id == other.template_id && self.rarity == other.rarity
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventorySlot {
    pub slot_id: usize,
    pub item: Option<Item>,
    pub quantity: u32,
    pub locked: bool,
}

impl InventorySlot {
    fn empty(slot_id: usize) -> Self {
        Self {
            slot_id,
            item: None,
            quantity: 0,
            locked: false,
        }
    }
}

pub const INVENTORY_SLOTS: usize = 24;

/// Fixed-size slot inventory plus the gold purse. Stackable items never
/// exceed `max_stack` per slot; total quantity per item id is conserved
/// across add/remove/move.
#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inventory {
    pub slots: Vec<InventorySlot>,
    pub gold: u32,
    pub total_items_collected: u64,
    pub total_gold_earned: u64,
}

impl Default for Inventory {
    fn default() -> Self {
        Self {
            slots: (0..INVENTORY_SLOTS).map(InventorySlot::empty).collect(),
            gold: 100,
            total_items_collected: 0,
            total_gold_earned: 0,
        }
    }
}

impl Inventory {
    /// Try to add `quantity` of an item, stacking onto compatible slots
    /// first, then filling empty unlocked slots. Returns the quantity
    /// that did not fit.
    pub fn add_item(&mut self, item: &Item, quantity: u32) -> u32 {
        let mut remaining = quantity;

        for slot in self.slots.iter_mut() {
            if remaining == 0 {
                break;
            }
            if slot.locked {
                continue;
            }
            if let Some(ref existing) = slot.item {
                if existing.stacks_with(item) && slot.quantity < item.max_stack {
                    let space = item.max_stack - slot.quantity;
                    let add = remaining.min(space);
                    slot.quantity += add;
                    remaining -= add;
                }
            }
        }

        for slot in self.slots.iter_mut() {
            if remaining == 0 {
                break;
            }
            if slot.locked || slot.item.is_some() {
                continue;
            }
            let add = remaining.min(item.max_stack);
            slot.item = Some(item.clone());
            slot.quantity = add;
            remaining -= add;
        }

        let added = quantity - remaining;
        self.total_items_collected += added as u64;
        remaining
    }

    /// Remove up to `quantity` units of a template id. Returns how many
    /// were actually removed.
    pub fn remove_item(&mut self, template_id: &str, quantity: u32) -> u32 {
        let mut remaining = quantity;
        for slot in self.slots.iter_mut() {
            if remaining == 0 {
                break;
            }
            if slot.locked {
                continue;
            }
            let matches = slot
                .item
                .as_ref()
                .map(|i| i.template_id == template_id)
                .unwrap_or(false);
            if matches {
                let take = remaining.min(slot.quantity);
                slot.quantity -= take;
                remaining -= take;
                if slot.quantity == 0 {
                    slot.item = None;
                }
            }
        }
        quantity - remaining
    }

    /// Move a stack between slots: merge if compatible, otherwise swap.
    /// Locked slots refuse both ends of the move.
    pub fn move_item(&mut self, from: usize, to: usize) -> Result<(), GameError> {
        if from == to {
            return Ok(());
        }
        let len = self.slots.len();
        if from >= len || to >= len {
            return Err(GameError::Validation(format!(
                "slot index out of range (from {}, to {}, slots {})",
                from, to, len
            )));
        }
        if self.slots[from].locked || self.slots[to].locked {
            return Err(GameError::InvalidState("slot is locked".to_string()));
        }
        if self.slots[from].item.is_none() {
            return Err(GameError::InvalidState(format!("slot {} is empty", from)));
        }

        let can_merge = match (&self.slots[from].item, &self.slots[to].item) {
            (Some(a), Some(b)) => a.stacks_with(b),
            _ => false,
        };

        if can_merge {
            let max_stack = self.slots[to].item.as_ref().map(|i| i.max_stack).unwrap_or(1);
            let space = max_stack.saturating_sub(self.slots[to].quantity);
            let transfer = self.slots[from].quantity.min(space);
            self.slots[to].quantity += transfer;
            self.slots[from].quantity -= transfer;
            if self.slots[from].quantity == 0 {
                self.slots[from].item = None;
            }
        } else {
            let from_item = self.slots[from].item.take();
            let from_qty = self.slots[from].quantity;
            let to_item = self.slots[to].item.take();
            let to_qty = self.slots[to].quantity;
            self.slots[from].item = to_item;
            self.slots[from].quantity = to_qty;
            self.slots[to].item = from_item;
            self.slots[to].quantity = from_qty;
        }
        Ok(())
    }

    /// Total quantity of a template id across all slots.
    pub fn count(&self, template_id: &str) -> u32 {
        self.slots
            .iter()
            .filter(|s| {
                s.item
                    .as_ref()
                    .map(|i| i.template_id == template_id)
                    .unwrap_or(false)
            })
            .map(|s| s.quantity)
            .sum()
    }

    pub fn has(&self, template_id: &str, quantity: u32) -> bool {
        self.count(template_id) >= quantity
    }
}

// ═══════════════════════════════════════════════════════════════════════
// TASKS
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskKind {
    Expedition,
    Raid,
    Scavenge,
    Training,
    Rest,
}

impl TaskKind {
    pub const ALL: [TaskKind; 5] = [
        TaskKind::Expedition,
        TaskKind::Raid,
        TaskKind::Scavenge,
        TaskKind::Training,
        TaskKind::Rest,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    Safe,
    Standard,
    Risky,
}

impl RiskLevel {
    pub fn reward_multiplier(self) -> f32 {
        match self {
            RiskLevel::Safe => 0.8,
            RiskLevel::Standard => 1.0,
            RiskLevel::Risky => 1.5,
        }
    }

    /// Flat percentage added to the task's base success chance.
    pub fn success_modifier(self) -> i32 {
        match self {
            RiskLevel::Safe => 10,
            RiskLevel::Standard => 0,
            RiskLevel::Risky => -10,
        }
    }

    /// Width of the partial-success band above the success threshold.
    pub fn partial_band(self) -> i32 {
        match self {
            RiskLevel::Safe => 5,
            RiskLevel::Standard => 10,
            RiskLevel::Risky => 15,
        }
    }
}

/// Relative weights for which item category a chest from this task rolls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LootWeights {
    pub weapon: u32,
    pub armor: u32,
    pub accessory: u32,
    pub consumable: u32,
}

impl Default for LootWeights {
    fn default() -> Self {
        Self {
            weapon: 20,
            armor: 20,
            accessory: 10,
            consumable: 50,
        }
    }
}

/// Immutable task definition from the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskDef {
    pub id: String,
    pub name: String,
    pub kind: TaskKind,
    pub risk: RiskLevel,
    /// Base percent chance of success before modifiers.
    pub base_success_chance: i32,
    pub gold_reward: EffectRange,
    pub xp_reward: EffectRange,
    pub material_reward: EffectRange,
    pub material_id: ItemId,
    /// Percent chance of injury when the task fails, before defense.
    pub injury_chance_on_failure: i32,
    pub loot_weights: LootWeights,
}

/// Pending reward/penalty accumulators mutated by encounter effects
/// during the work session and settled at finalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PendingEffects {
    pub gold: i32,
    pub xp: i32,
    pub damage: i32,
    pub heal: i32,
    pub success_modifier: i32,
}

/// The one task run tracked across a Work phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRun {
    pub task_id: String,
    pub kind: TaskKind,
    pub risk: RiskLevel,
    /// Completion percentage, clamped to [0, 100].
    pub progress: f32,
    pub events: Vec<GameEvent>,
    pub pending: PendingEffects,
}

#[derive(Resource, Debug, Clone, Default)]
pub struct ActiveTask(pub Option<TaskRun>);

/// Which catalog task the next work session will run. Set by the UI via
/// [`SelectTaskEvent`]; defaults to the first catalog entry.
#[derive(Resource, Debug, Clone, Default)]
pub struct SelectedTask(pub Option<String>);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskResult {
    Success,
    Partial,
    Failure,
}

/// Finalized outcome of one task run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskOutcome {
    pub task_id: String,
    pub kind: TaskKind,
    pub risk: RiskLevel,
    pub result: TaskResult,
    pub gold: u32,
    pub xp: u32,
    pub materials: u32,
    pub material_id: ItemId,
    pub net_health: i32,
    pub injury: Option<InjurySeverity>,
    pub completed_at: u64,
}

pub const MAX_TASK_HISTORY: usize = 10;

/// Last N completed tasks, newest first.
#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TaskHistory {
    pub entries: Vec<TaskOutcome>,
}

impl TaskHistory {
    pub fn push(&mut self, outcome: TaskOutcome) {
        self.entries.insert(0, outcome);
        self.entries.truncate(MAX_TASK_HISTORY);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TaskTally {
    pub attempted: u32,
    pub succeeded: u32,
    pub partial: u32,
    pub failed: u32,
    pub gold_earned: u64,
    pub xp_earned: u64,
}

impl TaskTally {
    pub fn record(&mut self, outcome: &TaskOutcome) {
        self.attempted += 1;
        match outcome.result {
            TaskResult::Success => self.succeeded += 1,
            TaskResult::Partial => self.partial += 1,
            TaskResult::Failure => self.failed += 1,
        }
        self.gold_earned += outcome.gold as u64;
        self.xp_earned += outcome.xp as u64;
    }
}

/// Cumulative statistics by task kind and risk level.
#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TaskStatistics {
    pub by_kind: HashMap<TaskKind, TaskTally>,
    pub by_risk: HashMap<RiskLevel, TaskTally>,
}

impl TaskStatistics {
    pub fn record(&mut self, outcome: &TaskOutcome) {
        self.by_kind.entry(outcome.kind).or_default().record(outcome);
        self.by_risk.entry(outcome.risk).or_default().record(outcome);
    }
}

// ═══════════════════════════════════════════════════════════════════════
// ENCOUNTERS (narrative events during a work session)
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventSeverity {
    Flavor,
    Info,
    Warning,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventCategory {
    Discovery,
    Combat,
    Hazard,
    Fortune,
    Mishap,
}

/// Numeric effect ranges a template may roll. Absent fields roll nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct EventEffects {
    pub gold: Option<EffectRange>,
    pub xp: Option<EffectRange>,
    pub damage: Option<EffectRange>,
    pub heal: Option<EffectRange>,
    pub success_modifier: Option<EffectRange>,
}

/// Eligibility conditions checked against an [`EventContext`] snapshot.
/// All present conditions must hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct EventConditions {
    pub min_level: Option<u32>,
    pub max_level: Option<u32>,
    pub min_health_percent: Option<u32>,
    pub max_health_percent: Option<u32>,
    pub requires_injured: Option<bool>,
    pub min_gold: Option<u32>,
    pub requires_equipped: Option<EquipSlot>,
}

/// Static catalog definition of a narrative event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventTemplate {
    pub id: String,
    pub severity: EventSeverity,
    pub category: EventCategory,
    /// Message variants; one is picked at random with placeholder
    /// substitution ({gold}, {damage}, {heal}, {xp}).
    pub messages: Vec<String>,
    pub effects: EventEffects,
    /// Empty list = applies to every task kind.
    pub applicable_tasks: Vec<TaskKind>,
    pub conditions: Option<EventConditions>,
    pub weight: u32,
    pub repeatable: bool,
}

/// Concrete rolled values for one fired event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct EventRoll {
    pub gold: i32,
    pub xp: i32,
    pub damage: i32,
    pub heal: i32,
    pub success_modifier: i32,
}

/// An instantiated, timestamped realization of an [`EventTemplate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameEvent {
    pub template_id: String,
    pub severity: EventSeverity,
    pub category: EventCategory,
    pub message: String,
    pub roll: EventRoll,
    pub occurred_at: u64,
}

/// Character/inventory snapshot the generator checks conditions against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventContext {
    pub level: u32,
    pub health_percent: u32,
    pub injured: bool,
    pub gold: u32,
    pub has_weapon: bool,
    pub has_armor: bool,
    pub has_accessory: bool,
}

// ═══════════════════════════════════════════════════════════════════════
// CHESTS & LOOT
// ═══════════════════════════════════════════════════════════════════════

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub enum ChestQuality {
    #[default]
    Basic,
    Fine,
    Superior,
    Masterwork,
}

impl ChestQuality {
    /// How many items a chest of this quality yields.
    pub fn item_count_range(self) -> EffectRange {
        match self {
            ChestQuality::Basic => EffectRange::new(1, 2),
            ChestQuality::Fine => EffectRange::new(2, 3),
            ChestQuality::Superior => EffectRange::new(3, 4),
            ChestQuality::Masterwork => EffectRange::new(4, 6),
        }
    }

    pub fn loot_multiplier(self) -> f32 {
        match self {
            ChestQuality::Basic => 1.0,
            ChestQuality::Fine => 1.3,
            ChestQuality::Superior => 1.7,
            ChestQuality::Masterwork => 2.5,
        }
    }
}

/// A loot container awarded on task completion. Opened exactly once;
/// a second open is an invalid-state error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chest {
    pub id: u64,
    pub quality: ChestQuality,
    pub source_task: String,
    pub source_kind: TaskKind,
    pub loot_quality: f32,
    pub opened: bool,
    pub earned_at: u64,
}

/// Unopened (and recently opened) chests the player holds.
#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ChestVault {
    pub chests: Vec<Chest>,
    pub next_id: u64,
}

impl ChestVault {
    pub fn award(&mut self, quality: ChestQuality, source_task: &str, kind: TaskKind) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.chests.push(Chest {
            id,
            quality,
            source_task: source_task.to_string(),
            source_kind: kind,
            loot_quality: quality.loot_multiplier(),
            opened: false,
            earned_at: current_timestamp(),
        });
        id
    }

    pub fn get_mut(&mut self, id: u64) -> Option<&mut Chest> {
        self.chests.iter_mut().find(|c| c.id == id)
    }
}

/// What opening a chest produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChestLoot {
    pub items: Vec<Item>,
    pub gold: u32,
    pub total_value: u32,
    /// Informational celebratory flag; does not change reward magnitude.
    pub was_lucky: bool,
}

// ═══════════════════════════════════════════════════════════════════════
// REGISTRIES — populated by the data layer
// ═══════════════════════════════════════════════════════════════════════

#[derive(Resource, Debug, Clone, Default)]
pub struct ItemCatalog {
    pub templates: HashMap<ItemId, ItemTemplate>,
}

impl ItemCatalog {
    pub fn get(&self, id: &str) -> Option<&ItemTemplate> {
        self.templates.get(id)
    }

    pub fn of_category(&self, category: ItemCategory) -> Vec<&ItemTemplate> {
        let mut templates: Vec<&ItemTemplate> = self
            .templates
            .values()
            .filter(|t| t.category == category)
            .collect();
        templates.sort_by(|a, b| a.id.cmp(&b.id));
        templates
    }
}

#[derive(Resource, Debug, Clone, Default)]
pub struct TaskCatalog {
    pub tasks: HashMap<String, TaskDef>,
    /// Catalog order for stable default selection.
    pub order: Vec<String>,
}

impl TaskCatalog {
    pub fn get(&self, id: &str) -> Option<&TaskDef> {
        self.tasks.get(id)
    }

    pub fn first(&self) -> Option<&TaskDef> {
        self.order.first().and_then(|id| self.tasks.get(id))
    }
}

#[derive(Resource, Debug, Clone, Default)]
pub struct EncounterBank {
    pub templates: Vec<EventTemplate>,
}

// ═══════════════════════════════════════════════════════════════════════
// EVENTS — UI intents
// ═══════════════════════════════════════════════════════════════════════

/// Sent by the UI layer to drive the Pomodoro state machine.
#[derive(Event, Debug, Clone)]
pub struct TimerActionEvent {
    pub action: TimerAction,
}

/// Sent by the UI to choose which task the next work session runs.
#[derive(Event, Debug, Clone)]
pub struct SelectTaskEvent {
    pub task_id: String,
}

#[derive(Event, Debug, Clone)]
pub struct OpenChestEvent {
    pub chest_id: u64,
}

/// Use the item in an inventory slot (consumables only).
#[derive(Event, Debug, Clone)]
pub struct UseItemEvent {
    pub slot: usize,
}

/// Equip the equippable item in an inventory slot.
#[derive(Event, Debug, Clone)]
pub struct EquipItemEvent {
    pub slot: usize,
}

#[derive(Event, Debug, Clone)]
pub struct UnequipEvent {
    pub slot: EquipSlot,
}

#[derive(Event, Debug, Clone)]
pub struct MoveItemEvent {
    pub from: usize,
    pub to: usize,
}

/// Pay the hospital to clear the current injury.
#[derive(Event, Debug, Clone)]
pub struct TreatInjuryEvent;

/// Pay off an outstanding hospital bill.
#[derive(Event, Debug, Clone)]
pub struct PayBillEvent;

// ═══════════════════════════════════════════════════════════════════════
// EVENTS — cross-domain notifications
// ═══════════════════════════════════════════════════════════════════════

/// The timer's observable state changed (any field).
#[derive(Event, Debug, Clone)]
pub struct TimerChangedEvent;

#[derive(Event, Debug, Clone)]
pub struct PhaseChangedEvent {
    pub from: Phase,
    pub to: Phase,
}

/// A narrative event fired during the current work session.
#[derive(Event, Debug, Clone)]
pub struct EncounterFiredEvent {
    pub event: GameEvent,
}

#[derive(Event, Debug, Clone)]
pub struct TaskCompletedEvent {
    pub outcome: TaskOutcome,
}

#[derive(Event, Debug, Clone)]
pub struct ChestAwardedEvent {
    pub chest_id: u64,
    pub quality: ChestQuality,
}

#[derive(Event, Debug, Clone)]
pub struct ChestOpenedEvent {
    pub chest_id: u64,
    pub loot: ChestLoot,
}

#[derive(Event, Debug, Clone)]
pub struct GoldChangeEvent {
    pub amount: i64, // positive = gain, negative = spend
    pub reason: String,
}

#[derive(Event, Debug, Clone)]
pub struct LevelUpEvent {
    pub new_level: u32,
}

/// Player-facing feedback line for the UI layer to display.
#[derive(Event, Debug, Clone)]
pub struct ToastEvent {
    pub message: String,
}

/// Mutating systems send this to request a debounced autosave.
#[derive(Event, Debug, Clone)]
pub struct StateDirtyEvent;

/// Force an immediate snapshot write.
#[derive(Event, Debug, Clone)]
pub struct SaveRequestEvent;

#[derive(Event, Debug, Clone)]
pub struct LoadRequestEvent;

#[derive(Event, Debug, Clone)]
pub struct SaveCompleteEvent {
    pub success: bool,
    pub error_message: Option<String>,
}

#[derive(Event, Debug, Clone)]
pub struct LoadCompleteEvent {
    pub success: bool,
    pub error_message: Option<String>,
}

/// Reset every resource to a fresh game.
#[derive(Event, Debug, Clone)]
pub struct NewGameEvent;

// ═══════════════════════════════════════════════════════════════════════
// SAVE DATA
// ═══════════════════════════════════════════════════════════════════════

pub const SAVE_VERSION: &str = "1.0.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveMetadata {
    pub version: String,
    pub saved_at: u64,
}

/// The single persisted snapshot, replaced wholesale on save.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveData {
    pub metadata: SaveMetadata,
    pub timer: PomodoroTimer,
    pub character: CharacterState,
    pub inventory: Inventory,
    pub chest_vault: ChestVault,
    pub task_history: TaskHistory,
    pub task_statistics: TaskStatistics,
    pub progression: ProgressionState,
}

// ═══════════════════════════════════════════════════════════════════════
// TIME HELPERS
// ═══════════════════════════════════════════════════════════════════════

#[cfg(not(target_arch = "wasm32"))]
pub fn current_timestamp() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(target_arch = "wasm32")]
pub fn current_timestamp() -> u64 {
    0
}

#[cfg(not(target_arch = "wasm32"))]
pub fn current_timestamp_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(target_arch = "wasm32")]
pub fn current_timestamp_ms() -> u64 {
    0
}

/// Epoch day used by streak tracking.
pub fn epoch_day(timestamp_secs: u64) -> u64 {
    timestamp_secs / 86_400
}
