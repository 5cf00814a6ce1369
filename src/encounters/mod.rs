//! Encounters domain — narrative events that fire during a work session.
//!
//! The generator itself is pure: it rolls a [`GameEvent`] from the static
//! bank against a context snapshot. The task executor owns applying the
//! rolled effects to the active run.

use bevy::prelude::*;
use rand::Rng;
use std::collections::HashSet;

use crate::loot::weighted::weighted_pick;
use crate::shared::*;

// ──────────────────────────────────────────────────────────────────────────────
// CONSTANTS
// ──────────────────────────────────────────────────────────────────────────────

/// Shortest possible gap between two events in one session, in seconds.
pub const MIN_EVENT_GAP_SECONDS: u32 = 45;

/// Longest possible gap between two events, in seconds.
pub const MAX_EVENT_GAP_SECONDS: u32 = 180;

/// Hard cap on events per work session; generation declines afterwards.
pub const MAX_EVENTS_PER_SESSION: u32 = 5;

// ──────────────────────────────────────────────────────────────────────────────
// RESOURCES
// ──────────────────────────────────────────────────────────────────────────────

/// Per-work-session throttling state. Reset on every Work entry.
#[derive(Resource, Debug, Clone)]
pub struct EncounterSession {
    pub events_fired: u32,
    pub fired_template_ids: HashSet<String>,
    pub seconds_until_next: u32,
}

impl Default for EncounterSession {
    fn default() -> Self {
        Self {
            events_fired: 0,
            fired_template_ids: HashSet::new(),
            seconds_until_next: MIN_EVENT_GAP_SECONDS,
        }
    }
}

impl EncounterSession {
    pub fn reset(&mut self, rng: &mut impl Rng) {
        self.events_fired = 0;
        self.fired_template_ids.clear();
        self.seconds_until_next = roll_gap(rng);
    }

    pub fn capped(&self) -> bool {
        self.events_fired >= MAX_EVENTS_PER_SESSION
    }

    pub fn record(&mut self, template_id: &str, rng: &mut impl Rng) {
        self.events_fired += 1;
        self.fired_template_ids.insert(template_id.to_string());
        self.seconds_until_next = roll_gap(rng);
    }
}

fn roll_gap(rng: &mut impl Rng) -> u32 {
    rng.gen_range(MIN_EVENT_GAP_SECONDS..=MAX_EVENT_GAP_SECONDS)
}

pub struct EncounterPlugin;

impl Plugin for EncounterPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<EncounterSession>().add_systems(
            Update,
            (reset_session_on_work_entry, run_encounter_clock)
                .chain()
                .run_if(in_state(GameState::Playing)),
        );
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// SEVERITY WEIGHTS
// ──────────────────────────────────────────────────────────────────────────────

/// Per-task-kind severity skew applied on top of template weights. Raids
/// lean dangerous, rest sessions lean calm (a critical event during Rest
/// never fires).
pub fn severity_weight(kind: TaskKind, severity: EventSeverity) -> u32 {
    use EventSeverity::*;
    use TaskKind::*;
    match (kind, severity) {
        (Expedition, Flavor) => 30,
        (Expedition, Info) => 35,
        (Expedition, Warning) => 25,
        (Expedition, Critical) => 10,
        (Raid, Flavor) => 10,
        (Raid, Info) => 25,
        (Raid, Warning) => 40,
        (Raid, Critical) => 25,
        (Scavenge, Flavor) => 30,
        (Scavenge, Info) => 40,
        (Scavenge, Warning) => 20,
        (Scavenge, Critical) => 10,
        (Training, Flavor) => 35,
        (Training, Info) => 40,
        (Training, Warning) => 20,
        (Training, Critical) => 5,
        (Rest, Flavor) => 60,
        (Rest, Info) => 35,
        (Rest, Warning) => 5,
        (Rest, Critical) => 0,
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// ELIGIBILITY & GENERATION
// ──────────────────────────────────────────────────────────────────────────────

fn conditions_hold(conditions: &EventConditions, ctx: &EventContext) -> bool {
    if let Some(min) = conditions.min_level {
        if ctx.level < min {
            return false;
        }
    }
    if let Some(max) = conditions.max_level {
        if ctx.level > max {
            return false;
        }
    }
    if let Some(min) = conditions.min_health_percent {
        if ctx.health_percent < min {
            return false;
        }
    }
    if let Some(max) = conditions.max_health_percent {
        if ctx.health_percent > max {
            return false;
        }
    }
    if let Some(required) = conditions.requires_injured {
        if ctx.injured != required {
            return false;
        }
    }
    if let Some(min) = conditions.min_gold {
        if ctx.gold < min {
            return false;
        }
    }
    if let Some(slot) = conditions.requires_equipped {
        let equipped = match slot {
            EquipSlot::Weapon => ctx.has_weapon,
            EquipSlot::Armor => ctx.has_armor,
            EquipSlot::Accessory => ctx.has_accessory,
        };
        if !equipped {
            return false;
        }
    }
    true
}

/// True when the template may fire for this task kind, context, and
/// session history.
pub fn is_eligible(
    template: &EventTemplate,
    kind: TaskKind,
    ctx: &EventContext,
    fired: &HashSet<String>,
) -> bool {
    if !template.repeatable && fired.contains(&template.id) {
        return false;
    }
    if !template.applicable_tasks.is_empty() && !template.applicable_tasks.contains(&kind) {
        return false;
    }
    match &template.conditions {
        Some(conditions) => conditions_hold(conditions, ctx),
        None => true,
    }
}

/// Rolls one event from the bank, or None when nothing is eligible or the
/// session cap is reached. Does not mutate any game state; the caller
/// records the fire on the session and applies the effects.
pub fn generate_event(
    rng: &mut impl Rng,
    bank: &EncounterBank,
    kind: TaskKind,
    ctx: &EventContext,
    session: &EncounterSession,
) -> Option<GameEvent> {
    if session.capped() {
        return None;
    }

    let eligible: Vec<&EventTemplate> = bank
        .templates
        .iter()
        .filter(|t| is_eligible(t, kind, ctx, &session.fired_template_ids))
        .collect();

    let template = weighted_pick(rng, &eligible, |t| {
        t.weight * severity_weight(kind, t.severity)
    })?;

    let roll = EventRoll {
        gold: template.effects.gold.map(|r| r.sample(rng)).unwrap_or(0),
        xp: template.effects.xp.map(|r| r.sample(rng)).unwrap_or(0),
        damage: template.effects.damage.map(|r| r.sample(rng)).unwrap_or(0),
        heal: template.effects.heal.map(|r| r.sample(rng)).unwrap_or(0),
        success_modifier: template
            .effects
            .success_modifier
            .map(|r| r.sample(rng))
            .unwrap_or(0),
    };

    let raw_message = if template.messages.is_empty() {
        template.id.clone()
    } else {
        template.messages[rng.gen_range(0..template.messages.len())].clone()
    };

    Some(GameEvent {
        template_id: template.id.clone(),
        severity: template.severity,
        category: template.category,
        message: substitute_placeholders(&raw_message, &roll),
        roll,
        occurred_at: current_timestamp(),
    })
}

/// Replaces `{gold}`, `{xp}`, `{damage}`, and `{heal}` with the rolled
/// absolute values.
fn substitute_placeholders(message: &str, roll: &EventRoll) -> String {
    message
        .replace("{gold}", &roll.gold.abs().to_string())
        .replace("{xp}", &roll.xp.abs().to_string())
        .replace("{damage}", &roll.damage.abs().to_string())
        .replace("{heal}", &roll.heal.abs().to_string())
}

// ──────────────────────────────────────────────────────────────────────────────
// SYSTEMS
// ──────────────────────────────────────────────────────────────────────────────

fn reset_session_on_work_entry(
    mut phase_events: EventReader<PhaseChangedEvent>,
    mut session: ResMut<EncounterSession>,
) {
    for ev in phase_events.read() {
        if ev.to == Phase::Work {
            session.reset(&mut rand::thread_rng());
            info!(
                "[Encounters] Session reset; first event in {}s",
                session.seconds_until_next
            );
        }
    }
}

/// Counts down the gap while the timer is actively working and fires an
/// event when it elapses.
fn run_encounter_clock(
    time: Res<Time>,
    timer: Res<PomodoroTimer>,
    active_task: Res<ActiveTask>,
    bank: Res<EncounterBank>,
    character: Res<CharacterState>,
    inventory: Res<Inventory>,
    progression: Res<ProgressionState>,
    mut session: ResMut<EncounterSession>,
    mut accumulator: Local<f32>,
    mut fired_writer: EventWriter<EncounterFiredEvent>,
    mut toast_writer: EventWriter<ToastEvent>,
) {
    if timer.phase != Phase::Work || !timer.is_running || timer.is_paused {
        return;
    }
    let Some(run) = active_task.0.as_ref() else {
        return;
    };

    *accumulator += time.delta_secs();
    if *accumulator < 1.0 {
        return;
    }
    let elapsed = accumulator.floor() as u32;
    *accumulator -= elapsed as f32;

    if session.seconds_until_next > elapsed {
        session.seconds_until_next -= elapsed;
        return;
    }
    session.seconds_until_next = 0;

    let ctx = build_context(&character, &inventory, &progression);
    let mut rng = rand::thread_rng();
    match generate_event(&mut rng, &bank, run.kind, &ctx, &session) {
        Some(event) => {
            info!(
                "[Encounters] {:?}/{:?}: {}",
                event.severity, event.category, event.message
            );
            session.record(&event.template_id, &mut rng);
            toast_writer.send(ToastEvent {
                message: event.message.clone(),
            });
            fired_writer.send(EncounterFiredEvent { event });
        }
        None => {
            // Nothing eligible right now; try again after a fresh gap.
            session.seconds_until_next = roll_gap(&mut rng);
        }
    }
}

pub fn build_context(
    character: &CharacterState,
    inventory: &Inventory,
    progression: &ProgressionState,
) -> EventContext {
    let stats = &character.computed_stats;
    let health_percent = if stats.max_health > 0 {
        (stats.health.max(0) * 100 / stats.max_health) as u32
    } else {
        0
    };
    EventContext {
        level: progression.level,
        health_percent,
        injured: character.injury.is_injured,
        gold: inventory.gold,
        has_weapon: character.equipment.weapon.is_some(),
        has_armor: character.equipment.armor.is_some(),
        has_accessory: character.equipment.accessory.is_some(),
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// TESTS
// ──────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> EventContext {
        EventContext {
            level: 3,
            health_percent: 80,
            injured: false,
            gold: 100,
            has_weapon: true,
            has_armor: false,
            has_accessory: false,
        }
    }

    fn template(id: &str) -> EventTemplate {
        EventTemplate {
            id: id.to_string(),
            severity: EventSeverity::Info,
            category: EventCategory::Discovery,
            messages: vec!["You found {gold} gold.".to_string()],
            effects: EventEffects {
                gold: Some(EffectRange::new(10, 10)),
                ..Default::default()
            },
            applicable_tasks: Vec::new(),
            conditions: None,
            weight: 10,
            repeatable: true,
        }
    }

    #[test]
    fn test_wildcard_template_applies_to_every_kind() {
        let t = template("find_gold");
        let fired = HashSet::new();
        for kind in TaskKind::ALL {
            assert!(is_eligible(&t, kind, &ctx(), &fired));
        }
    }

    #[test]
    fn test_task_filter_excludes_other_kinds() {
        let mut t = template("raid_only");
        t.applicable_tasks = vec![TaskKind::Raid];
        let fired = HashSet::new();
        assert!(is_eligible(&t, TaskKind::Raid, &ctx(), &fired));
        assert!(!is_eligible(&t, TaskKind::Rest, &ctx(), &fired));
    }

    #[test]
    fn test_non_repeatable_excluded_after_firing() {
        let mut t = template("once");
        t.repeatable = false;
        let mut fired = HashSet::new();
        assert!(is_eligible(&t, TaskKind::Expedition, &ctx(), &fired));
        fired.insert("once".to_string());
        assert!(!is_eligible(&t, TaskKind::Expedition, &ctx(), &fired));
    }

    #[test]
    fn test_conditions_gate_eligibility() {
        let mut t = template("rich_only");
        t.conditions = Some(EventConditions {
            min_gold: Some(500),
            ..Default::default()
        });
        let fired = HashSet::new();
        assert!(!is_eligible(&t, TaskKind::Expedition, &ctx(), &fired));

        let mut rich = ctx();
        rich.gold = 1000;
        assert!(is_eligible(&t, TaskKind::Expedition, &rich, &fired));
    }

    #[test]
    fn test_requires_equipped_checks_the_right_slot() {
        let mut t = template("armed");
        t.conditions = Some(EventConditions {
            requires_equipped: Some(EquipSlot::Armor),
            ..Default::default()
        });
        let fired = HashSet::new();
        // Context has a weapon but no armor.
        assert!(!is_eligible(&t, TaskKind::Expedition, &ctx(), &fired));
    }

    #[test]
    fn test_generate_substitutes_placeholders() {
        let bank = EncounterBank {
            templates: vec![template("find_gold")],
        };
        let session = EncounterSession::default();
        let mut rng = rand::thread_rng();
        let event = generate_event(&mut rng, &bank, TaskKind::Expedition, &ctx(), &session)
            .expect("one eligible template");
        assert_eq!(event.message, "You found 10 gold.");
        assert_eq!(event.roll.gold, 10);
    }

    #[test]
    fn test_cap_stops_generation() {
        let bank = EncounterBank {
            templates: vec![template("find_gold")],
        };
        let mut session = EncounterSession::default();
        let mut rng = rand::thread_rng();
        for _ in 0..MAX_EVENTS_PER_SESSION {
            let event = generate_event(&mut rng, &bank, TaskKind::Expedition, &ctx(), &session)
                .expect("under the cap");
            session.record(&event.template_id, &mut rng);
        }
        assert!(session.capped());
        assert!(
            generate_event(&mut rng, &bank, TaskKind::Expedition, &ctx(), &session).is_none()
        );
    }

    #[test]
    fn test_empty_bank_generates_nothing() {
        let bank = EncounterBank::default();
        let session = EncounterSession::default();
        let mut rng = rand::thread_rng();
        assert!(
            generate_event(&mut rng, &bank, TaskKind::Expedition, &ctx(), &session).is_none()
        );
    }

    #[test]
    fn test_rest_never_rolls_critical() {
        assert_eq!(severity_weight(TaskKind::Rest, EventSeverity::Critical), 0);
        let mut t = template("rest_disaster");
        t.severity = EventSeverity::Critical;
        let bank = EncounterBank { templates: vec![t] };
        let session = EncounterSession::default();
        let mut rng = rand::thread_rng();
        assert!(generate_event(&mut rng, &bank, TaskKind::Rest, &ctx(), &session).is_none());
    }

    #[test]
    fn test_session_reset_clears_history() {
        let mut session = EncounterSession::default();
        let mut rng = rand::thread_rng();
        session.record("a", &mut rng);
        session.record("b", &mut rng);
        session.reset(&mut rng);
        assert_eq!(session.events_fired, 0);
        assert!(session.fired_template_ids.is_empty());
        assert!(
            (MIN_EVENT_GAP_SECONDS..=MAX_EVENT_GAP_SECONDS)
                .contains(&session.seconds_until_next)
        );
    }
}
