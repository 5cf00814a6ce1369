//! Tasks domain — the one RPG task that runs across each work session.
//!
//! A run starts on Work entry, accumulates encounter effects while the
//! timer counts down, and is settled into a [`TaskOutcome`] when the Work
//! phase ends (naturally or by skip).

use bevy::prelude::*;
use rand::Rng;

use crate::character::roll_injury;
use crate::shared::*;

/// Success probability is clamped to this band so no task is ever a
/// guaranteed success or a guaranteed failure.
pub const MIN_SUCCESS_CHANCE: i32 = 5;
pub const MAX_SUCCESS_CHANCE: i32 = 95;

pub struct TaskPlugin;

impl Plugin for TaskPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            Update,
            (
                handle_select_task,
                apply_encounter_effects,
                manage_task_lifecycle,
                update_progress,
                cleanup_abandoned_run,
            )
                .chain()
                .run_if(in_state(GameState::Playing)),
        );
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// PURE OUTCOME MATH
// ──────────────────────────────────────────────────────────────────────────────

/// Final success probability for a run: base chance, risk modifier, event
/// modifiers, minus the injury and hospital-bill penalties, clamped.
pub fn success_chance(
    def: &TaskDef,
    pending: &PendingEffects,
    injury: &InjuryState,
    bill: Option<&HospitalBill>,
) -> i32 {
    let mut chance = def.base_success_chance + def.risk.success_modifier() + pending.success_modifier;
    if let Some(severity) = injury.severity.filter(|_| injury.is_injured) {
        chance -= severity.success_penalty_percent();
    }
    if let Some(bill) = bill {
        chance -= bill.focus_penalty();
    }
    chance.clamp(MIN_SUCCESS_CHANCE, MAX_SUCCESS_CHANCE)
}

/// Bands a percentile roll (0..100) against the success chance. Rolls just
/// above the success boundary land in a risk-dependent partial band.
pub fn classify_roll(chance: i32, roll: i32, risk: RiskLevel) -> TaskResult {
    if roll < chance {
        TaskResult::Success
    } else if roll < chance + risk.partial_band() {
        TaskResult::Partial
    } else {
        TaskResult::Failure
    }
}

/// Gold/xp/material payout: sampled base ranges scaled by the risk reward
/// multiplier, plus event accumulators. Partial pays half; failure pays
/// nothing. Never negative.
pub fn compute_rewards(
    rng: &mut impl Rng,
    def: &TaskDef,
    pending: &PendingEffects,
    result: TaskResult,
) -> (u32, u32, u32) {
    if result == TaskResult::Failure {
        return (0, 0, 0);
    }
    let multiplier = def.risk.reward_multiplier();
    let mut gold = (def.gold_reward.sample(rng) as f32 * multiplier) as i32 + pending.gold;
    let mut xp = (def.xp_reward.sample(rng) as f32 * multiplier) as i32 + pending.xp;
    let mut materials = (def.material_reward.sample(rng) as f32 * multiplier) as i32;
    if result == TaskResult::Partial {
        gold /= 2;
        xp /= 2;
        materials /= 2;
    }
    (gold.max(0) as u32, xp.max(0) as u32, materials.max(0) as u32)
}

// ──────────────────────────────────────────────────────────────────────────────
// SYSTEMS
// ──────────────────────────────────────────────────────────────────────────────

fn handle_select_task(
    mut select_events: EventReader<SelectTaskEvent>,
    catalog: Res<TaskCatalog>,
    mut selected: ResMut<SelectedTask>,
    mut toast_writer: EventWriter<ToastEvent>,
) {
    for ev in select_events.read() {
        match catalog.get(&ev.task_id) {
            Some(def) => {
                info!("[Tasks] Selected '{}' ({:?}, {:?})", def.name, def.kind, def.risk);
                selected.0 = Some(def.id.clone());
            }
            None => {
                warn!("[Tasks] Unknown task id '{}'", ev.task_id);
                toast_writer.send(ToastEvent {
                    message: format!("Unknown task: {}", ev.task_id),
                });
            }
        }
    }
}

/// Folds fired encounter effects into the active run's accumulators.
fn apply_encounter_effects(
    mut fired_events: EventReader<EncounterFiredEvent>,
    mut active: ResMut<ActiveTask>,
) {
    for ev in fired_events.read() {
        let Some(run) = active.0.as_mut() else {
            continue;
        };
        let roll = &ev.event.roll;
        run.pending.gold += roll.gold;
        run.pending.xp += roll.xp;
        run.pending.damage += roll.damage;
        run.pending.heal += roll.heal;
        run.pending.success_modifier += roll.success_modifier;
        run.events.push(ev.event.clone());
    }
}

/// Starts a run on Work entry and settles it on Work exit.
fn manage_task_lifecycle(
    mut phase_events: EventReader<PhaseChangedEvent>,
    mut active: ResMut<ActiveTask>,
    selected: Res<SelectedTask>,
    catalog: Res<TaskCatalog>,
    character: Res<CharacterState>,
    mut history: ResMut<TaskHistory>,
    mut statistics: ResMut<TaskStatistics>,
    mut completed_writer: EventWriter<TaskCompletedEvent>,
    mut gold_writer: EventWriter<GoldChangeEvent>,
    mut toast_writer: EventWriter<ToastEvent>,
    mut dirty_writer: EventWriter<StateDirtyEvent>,
) {
    for ev in phase_events.read() {
        if ev.from == Phase::Work {
            if let Some(run) = active.0.take() {
                let outcome = finalize_run(&run, &catalog, &character);
                info!(
                    "[Tasks] '{}' finished: {:?} (+{}g, +{}xp, {} materials)",
                    outcome.task_id, outcome.result, outcome.gold, outcome.xp, outcome.materials
                );
                if outcome.gold > 0 {
                    gold_writer.send(GoldChangeEvent {
                        amount: outcome.gold as i64,
                        reason: format!("task '{}'", outcome.task_id),
                    });
                }
                toast_writer.send(ToastEvent {
                    message: match outcome.result {
                        TaskResult::Success => format!("Task complete! +{} gold", outcome.gold),
                        TaskResult::Partial => {
                            format!("Partial success. +{} gold", outcome.gold)
                        }
                        TaskResult::Failure => "The task failed.".to_string(),
                    },
                });
                history.push(outcome.clone());
                statistics.record(&outcome);
                completed_writer.send(TaskCompletedEvent { outcome });
                dirty_writer.send(StateDirtyEvent);
            }
        }
        if ev.to == Phase::Work {
            let def = selected
                .0
                .as_deref()
                .and_then(|id| catalog.get(id))
                .or_else(|| catalog.first());
            match def {
                Some(def) => {
                    info!("[Tasks] Starting '{}' for this session", def.name);
                    active.0 = Some(TaskRun {
                        task_id: def.id.clone(),
                        kind: def.kind,
                        risk: def.risk,
                        progress: 0.0,
                        events: Vec::new(),
                        pending: PendingEffects::default(),
                    });
                }
                None => warn!("[Tasks] No task available; session runs without one"),
            }
        }
    }
}

fn finalize_run(run: &TaskRun, catalog: &TaskCatalog, character: &CharacterState) -> TaskOutcome {
    let mut rng = rand::thread_rng();

    // A run whose definition disappeared settles as a zero-reward failure.
    let fallback = TaskDef {
        id: run.task_id.clone(),
        name: run.task_id.clone(),
        kind: run.kind,
        risk: run.risk,
        base_success_chance: 0,
        gold_reward: EffectRange::default(),
        xp_reward: EffectRange::default(),
        material_reward: EffectRange::default(),
        material_id: String::new(),
        injury_chance_on_failure: 0,
        loot_weights: LootWeights::default(),
    };
    let def = catalog.get(&run.task_id).unwrap_or(&fallback);

    let chance = success_chance(
        def,
        &run.pending,
        &character.injury,
        character.hospital_bill.as_ref(),
    );
    let roll = rng.gen_range(0..100);
    let result = classify_roll(chance, roll, def.risk);
    let (gold, xp, materials) = compute_rewards(&mut rng, def, &run.pending, result);

    let injury = if result == TaskResult::Failure {
        roll_injury(
            &mut rng,
            def.injury_chance_on_failure,
            character.computed_stats.defense,
            def.risk,
        )
    } else {
        None
    };

    TaskOutcome {
        task_id: run.task_id.clone(),
        kind: run.kind,
        risk: run.risk,
        result,
        gold,
        xp,
        materials,
        material_id: def.material_id.clone(),
        net_health: run.pending.heal - run.pending.damage,
        injury,
        completed_at: current_timestamp(),
    }
}

/// Keeps the run's completion percentage in step with the timer.
fn update_progress(timer: Res<PomodoroTimer>, mut active: ResMut<ActiveTask>) {
    let Some(run) = active.0.as_mut() else {
        return;
    };
    if timer.phase != Phase::Work {
        return;
    }
    let total = timer.config.phase_seconds(Phase::Work);
    if total == 0 {
        return;
    }
    let elapsed = total.saturating_sub(timer.remaining_seconds);
    run.progress = (elapsed as f32 / total as f32 * 100.0).clamp(0.0, 100.0);
}

/// A timer Reset drops back to Idle without a phase transition; any run
/// still in flight is abandoned without rewards.
fn cleanup_abandoned_run(timer: Res<PomodoroTimer>, mut active: ResMut<ActiveTask>) {
    if timer.phase == Phase::Idle && active.0.is_some() {
        info!("[Tasks] Run abandoned by timer reset");
        active.0 = None;
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// TESTS
// ──────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn task(risk: RiskLevel) -> TaskDef {
        TaskDef {
            id: "ruins_expedition".to_string(),
            name: "Ruins Expedition".to_string(),
            kind: TaskKind::Expedition,
            risk,
            base_success_chance: 70,
            gold_reward: EffectRange::new(40, 40),
            xp_reward: EffectRange::new(30, 30),
            material_reward: EffectRange::new(2, 2),
            material_id: "relic_shard".to_string(),
            injury_chance_on_failure: 30,
            loot_weights: LootWeights::default(),
        }
    }

    #[test]
    fn test_success_chance_applies_all_modifiers() {
        let def = task(RiskLevel::Risky);
        let pending = PendingEffects {
            success_modifier: 5,
            ..Default::default()
        };
        let injury = InjuryState {
            is_injured: true,
            severity: Some(InjurySeverity::Moderate),
            injured_at: Some(0),
        };
        let bill = HospitalBill {
            amount: 50,
            created_at: 0,
        };
        // 70 - 10 (risky) + 5 (events) - 10 (injury) - 5 (bill) = 50
        assert_eq!(success_chance(&def, &pending, &injury, Some(&bill)), 50);
    }

    #[test]
    fn test_success_chance_is_clamped() {
        let mut def = task(RiskLevel::Safe);
        def.base_success_chance = 150;
        let pending = PendingEffects::default();
        let healthy = InjuryState::default();
        assert_eq!(success_chance(&def, &pending, &healthy, None), 95);

        def.base_success_chance = -40;
        assert_eq!(success_chance(&def, &pending, &healthy, None), 5);
    }

    #[test]
    fn test_classify_roll_banding() {
        // Standard risk: 10-wide partial band above the success boundary.
        assert_eq!(classify_roll(60, 0, RiskLevel::Standard), TaskResult::Success);
        assert_eq!(classify_roll(60, 59, RiskLevel::Standard), TaskResult::Success);
        assert_eq!(classify_roll(60, 60, RiskLevel::Standard), TaskResult::Partial);
        assert_eq!(classify_roll(60, 69, RiskLevel::Standard), TaskResult::Partial);
        assert_eq!(classify_roll(60, 70, RiskLevel::Standard), TaskResult::Failure);
        assert_eq!(classify_roll(60, 99, RiskLevel::Standard), TaskResult::Failure);
    }

    #[test]
    fn test_partial_band_width_follows_risk() {
        assert_eq!(classify_roll(50, 54, RiskLevel::Safe), TaskResult::Partial);
        assert_eq!(classify_roll(50, 55, RiskLevel::Safe), TaskResult::Failure);
        assert_eq!(classify_roll(50, 64, RiskLevel::Risky), TaskResult::Partial);
        assert_eq!(classify_roll(50, 65, RiskLevel::Risky), TaskResult::Failure);
    }

    #[test]
    fn test_failure_pays_nothing() {
        let def = task(RiskLevel::Standard);
        let pending = PendingEffects {
            gold: 100,
            xp: 100,
            ..Default::default()
        };
        let mut rng = rand::thread_rng();
        assert_eq!(
            compute_rewards(&mut rng, &def, &pending, TaskResult::Failure),
            (0, 0, 0)
        );
    }

    #[test]
    fn test_risky_multiplier_and_event_gold() {
        let def = task(RiskLevel::Risky);
        let pending = PendingEffects {
            gold: 10,
            ..Default::default()
        };
        let mut rng = rand::thread_rng();
        let (gold, xp, materials) =
            compute_rewards(&mut rng, &def, &pending, TaskResult::Success);
        // 40 * 1.5 + 10 = 70 gold, 30 * 1.5 = 45 xp, 2 * 1.5 = 3 materials.
        assert_eq!(gold, 70);
        assert_eq!(xp, 45);
        assert_eq!(materials, 3);
    }

    #[test]
    fn test_partial_pays_half() {
        let def = task(RiskLevel::Standard);
        let pending = PendingEffects::default();
        let mut rng = rand::thread_rng();
        let (gold, xp, _) = compute_rewards(&mut rng, &def, &pending, TaskResult::Partial);
        assert_eq!(gold, 20);
        assert_eq!(xp, 15);
    }

    #[test]
    fn test_negative_event_gold_never_goes_below_zero() {
        let def = task(RiskLevel::Standard);
        let pending = PendingEffects {
            gold: -500,
            ..Default::default()
        };
        let mut rng = rand::thread_rng();
        let (gold, _, _) = compute_rewards(&mut rng, &def, &pending, TaskResult::Success);
        assert_eq!(gold, 0);
    }
}
