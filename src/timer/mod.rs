//! Timer domain — the heartbeat of FocusQuest.
//!
//! Responsible for:
//! - The Pomodoro phase state machine (Idle → Work → break → Work …)
//! - Dispatching user actions (start/pause/resume/skip/reset)
//! - Converting real elapsed time into whole-second ticks
//! - Reconciling wall-clock drift after a reload
//! - Loading the user timer settings from `settings.ron`

use bevy::prelude::*;

use crate::shared::*;

/// Path of the user-editable RON settings file, resolved relative to the
/// working directory.
pub const SETTINGS_PATH: &str = "settings.ron";

pub struct TimerPlugin;

impl Plugin for TimerPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            Update,
            (tick_timer, handle_timer_actions)
                .chain()
                .run_if(in_state(GameState::Playing)),
        );
    }
}

// ─── Settings loading ─────────────────────────────────────────────────────────

/// Loads the timer config from `path`, validating its bounds. Any read,
/// parse, or validation failure falls back to the defaults.
pub fn load_timer_config(path: &str) -> TimerConfig {
    match try_load_timer_config(path) {
        Ok(config) => {
            info!("[Timer] Loaded settings from {}: {:?}", path, config);
            config
        }
        Err(e) => {
            warn!("[Timer] {} — using default settings", e);
            TimerConfig::default()
        }
    }
}

fn try_load_timer_config(path: &str) -> Result<TimerConfig, GameError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| GameError::Persistence(format!("could not read {}: {}", path, e)))?;
    let config: TimerConfig = ron::from_str(&text)
        .map_err(|e| GameError::Validation(format!("could not parse {}: {}", path, e)))?;
    config.validate()?;
    Ok(config)
}

// ─── State machine ────────────────────────────────────────────────────────────

impl PomodoroTimer {
    /// Mutates the timer according to `action`. Returns what changed, or an
    /// invalid-state error for actions that are not legal right now.
    pub fn dispatch(&mut self, action: TimerAction) -> Result<DispatchOutcome, GameError> {
        let outcome = match action {
            TimerAction::Start => self.start()?,
            TimerAction::Pause => self.pause()?,
            TimerAction::Resume => self.resume()?,
            TimerAction::Skip => self.skip()?,
            TimerAction::Reset => self.reset(),
            TimerAction::Tick { delta_seconds } => self.tick(delta_seconds),
        };
        if outcome.changed {
            self.last_update_timestamp = current_timestamp();
        }
        Ok(outcome)
    }

    fn start(&mut self) -> Result<DispatchOutcome, GameError> {
        if self.phase != Phase::Idle || self.is_running {
            return Err(GameError::InvalidState(format!(
                "cannot start from {:?} (running: {})",
                self.phase, self.is_running
            )));
        }
        let transition = self.enter_phase(Phase::Work);
        self.is_running = true;
        Ok(DispatchOutcome {
            changed: true,
            transition: Some(transition),
        })
    }

    fn pause(&mut self) -> Result<DispatchOutcome, GameError> {
        if !self.is_running || self.phase != Phase::Work {
            return Err(GameError::InvalidState(format!(
                "pause is only legal while working (phase {:?}, running {})",
                self.phase, self.is_running
            )));
        }
        if self.is_paused {
            return Err(GameError::InvalidState("already paused".to_string()));
        }
        self.is_paused = true;
        Ok(DispatchOutcome {
            changed: true,
            transition: None,
        })
    }

    fn resume(&mut self) -> Result<DispatchOutcome, GameError> {
        if !self.is_paused {
            return Err(GameError::InvalidState("not paused".to_string()));
        }
        self.is_paused = false;
        Ok(DispatchOutcome {
            changed: true,
            transition: None,
        })
    }

    fn skip(&mut self) -> Result<DispatchOutcome, GameError> {
        if !self.is_running {
            return Err(GameError::InvalidState(
                "nothing to skip while idle".to_string(),
            ));
        }
        let transition = self.complete_phase();
        Ok(DispatchOutcome {
            changed: true,
            transition: Some(transition),
        })
    }

    /// Unconditionally returns to the freshly-initialized Idle state,
    /// discarding elapsed progress. Keeps the loaded config.
    fn reset(&mut self) -> DispatchOutcome {
        let config = self.config;
        *self = PomodoroTimer::new(config);
        DispatchOutcome {
            changed: true,
            transition: None,
        }
    }

    /// No-op unless running and unpaused. Decrements by `delta_seconds`
    /// clamped at zero and completes the phase when it reaches zero.
    fn tick(&mut self, delta_seconds: u32) -> DispatchOutcome {
        if !self.is_running || self.is_paused || delta_seconds == 0 {
            return DispatchOutcome::default();
        }
        self.remaining_seconds = self.remaining_seconds.saturating_sub(delta_seconds);
        let transition = if self.remaining_seconds == 0 {
            Some(self.complete_phase())
        } else {
            None
        };
        DispatchOutcome {
            changed: true,
            transition,
        }
    }

    /// Natural completion / skip of the current phase.
    fn complete_phase(&mut self) -> PhaseTransition {
        let next = match self.phase {
            Phase::Work => {
                self.completed_sessions += 1;
                self.total_completed_sessions += 1;
                if self.completed_sessions >= self.config.sessions_before_long_break {
                    Phase::LongBreak
                } else {
                    Phase::ShortBreak
                }
            }
            Phase::LongBreak => {
                self.completed_sessions = 0;
                Phase::Work
            }
            Phase::ShortBreak => Phase::Work,
            // Unreachable through dispatch: ticks/skips require is_running.
            Phase::Idle => Phase::Work,
        };
        self.enter_phase(next)
    }

    fn enter_phase(&mut self, next: Phase) -> PhaseTransition {
        let from = self.phase;
        self.phase = next;
        self.remaining_seconds = self.config.phase_seconds(next);
        self.is_paused = false;
        PhaseTransition { from, to: next }
    }

    /// Applies a single catch-up tick for the wall-clock seconds elapsed
    /// since the last dispatch. Models "the timer kept running while the
    /// app was closed."
    pub fn sync_with_real_time(&mut self, now_secs: u64) -> DispatchOutcome {
        let elapsed = now_secs.saturating_sub(self.last_update_timestamp);
        if elapsed == 0 {
            return DispatchOutcome::default();
        }
        let delta = elapsed.min(u32::MAX as u64) as u32;
        let outcome = self.tick(delta);
        self.last_update_timestamp = now_secs;
        outcome
    }
}

// ─── Systems ──────────────────────────────────────────────────────────────────

/// Accumulates real delta-seconds and dispatches one Tick per whole
/// elapsed second, broadcasting changes and phase boundaries.
fn tick_timer(
    time: Res<Time>,
    mut timer: ResMut<PomodoroTimer>,
    mut accumulator: Local<f32>,
    mut changed_writer: EventWriter<TimerChangedEvent>,
    mut phase_writer: EventWriter<PhaseChangedEvent>,
    mut dirty_writer: EventWriter<StateDirtyEvent>,
) {
    *accumulator += time.delta_secs();
    if *accumulator < 1.0 {
        return;
    }
    let whole = accumulator.floor();
    *accumulator -= whole;

    let outcome = timer
        .dispatch(TimerAction::Tick {
            delta_seconds: whole as u32,
        })
        .unwrap_or_default(); // Tick never errors
    broadcast(
        &timer,
        outcome,
        &mut changed_writer,
        &mut phase_writer,
        &mut dirty_writer,
    );
}

/// Applies UI-dispatched timer actions, surfacing invalid-state errors
/// back to the UI as toasts.
fn handle_timer_actions(
    mut actions: EventReader<TimerActionEvent>,
    mut timer: ResMut<PomodoroTimer>,
    mut changed_writer: EventWriter<TimerChangedEvent>,
    mut phase_writer: EventWriter<PhaseChangedEvent>,
    mut dirty_writer: EventWriter<StateDirtyEvent>,
    mut toast_writer: EventWriter<ToastEvent>,
) {
    for ev in actions.read() {
        match timer.dispatch(ev.action) {
            Ok(outcome) => {
                info!("[Timer] {:?} -> phase {:?}", ev.action, timer.phase);
                broadcast(
                    &timer,
                    outcome,
                    &mut changed_writer,
                    &mut phase_writer,
                    &mut dirty_writer,
                );
            }
            Err(e) => {
                warn!("[Timer] {:?} rejected: {}", ev.action, e);
                toast_writer.send(ToastEvent {
                    message: e.to_string(),
                });
            }
        }
    }
}

fn broadcast(
    timer: &PomodoroTimer,
    outcome: DispatchOutcome,
    changed_writer: &mut EventWriter<TimerChangedEvent>,
    phase_writer: &mut EventWriter<PhaseChangedEvent>,
    dirty_writer: &mut EventWriter<StateDirtyEvent>,
) {
    if !outcome.changed {
        return;
    }
    changed_writer.send(TimerChangedEvent);
    if let Some(transition) = outcome.transition {
        info!(
            "[Timer] Phase {:?} -> {:?} (session {}/{})",
            transition.from,
            transition.to,
            timer.completed_sessions,
            timer.config.sessions_before_long_break
        );
        phase_writer.send(PhaseChangedEvent {
            from: transition.from,
            to: transition.to,
        });
        dirty_writer.send(StateDirtyEvent);
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn started() -> PomodoroTimer {
        let mut timer = PomodoroTimer::default();
        timer.dispatch(TimerAction::Start).unwrap();
        timer
    }

    #[test]
    fn test_start_enters_work_with_full_duration() {
        let timer = started();
        assert_eq!(timer.phase, Phase::Work);
        assert!(timer.is_running);
        assert!(!timer.is_paused);
        assert_eq!(timer.remaining_seconds, 25 * 60);
    }

    #[test]
    fn test_start_twice_is_invalid() {
        let mut timer = started();
        assert!(matches!(
            timer.dispatch(TimerAction::Start),
            Err(GameError::InvalidState(_))
        ));
    }

    #[test]
    fn test_tick_is_noop_when_idle() {
        let mut timer = PomodoroTimer::default();
        let outcome = timer
            .dispatch(TimerAction::Tick { delta_seconds: 10 })
            .unwrap();
        assert!(!outcome.changed);
        assert_eq!(timer.remaining_seconds, 25 * 60);
    }

    #[test]
    fn test_tick_never_goes_negative() {
        let mut timer = started();
        let outcome = timer
            .dispatch(TimerAction::Tick {
                delta_seconds: 99_999,
            })
            .unwrap();
        // Completed the work phase and entered a break with a fresh duration.
        assert!(outcome.transition.is_some());
        assert_eq!(timer.phase, Phase::ShortBreak);
        assert_eq!(timer.remaining_seconds, 5 * 60);
    }

    #[test]
    fn test_pause_requires_running_work() {
        let mut timer = PomodoroTimer::default();
        assert!(matches!(
            timer.dispatch(TimerAction::Pause),
            Err(GameError::InvalidState(_))
        ));

        // Pause during a break is also invalid.
        let mut timer = started();
        timer.dispatch(TimerAction::Skip).unwrap();
        assert_eq!(timer.phase, Phase::ShortBreak);
        assert!(matches!(
            timer.dispatch(TimerAction::Pause),
            Err(GameError::InvalidState(_))
        ));
    }

    #[test]
    fn test_resume_requires_paused() {
        let mut timer = started();
        assert!(matches!(
            timer.dispatch(TimerAction::Resume),
            Err(GameError::InvalidState(_))
        ));
    }

    #[test]
    fn test_pause_resume_round_trip_preserves_remaining() {
        let mut timer = started();
        timer.dispatch(TimerAction::Tick { delta_seconds: 30 }).unwrap();
        let before = timer.remaining_seconds;
        timer.dispatch(TimerAction::Pause).unwrap();
        // Ticks while paused are no-ops.
        timer.dispatch(TimerAction::Tick { delta_seconds: 60 }).unwrap();
        timer.dispatch(TimerAction::Resume).unwrap();
        assert_eq!(timer.remaining_seconds, before);
    }

    #[test]
    fn test_long_break_every_fourth_session() {
        let mut timer = started();
        for session in 1..=4u32 {
            // Complete the work phase.
            let remaining = timer.remaining_seconds;
            let outcome = timer
                .dispatch(TimerAction::Tick {
                    delta_seconds: remaining,
                })
                .unwrap();
            let transition = outcome.transition.expect("work phase should complete");
            if session == 4 {
                assert_eq!(transition.to, Phase::LongBreak);
                assert_eq!(timer.remaining_seconds, 15 * 60);
            } else {
                assert_eq!(transition.to, Phase::ShortBreak, "session {}", session);
                // Complete the short break back into work.
                let remaining = timer.remaining_seconds;
                timer
                    .dispatch(TimerAction::Tick {
                        delta_seconds: remaining,
                    })
                    .unwrap();
                assert_eq!(timer.phase, Phase::Work);
            }
        }
        assert_eq!(timer.total_completed_sessions, 4);

        // Long break completion returns to work and resets the cycle count.
        let remaining = timer.remaining_seconds;
        timer
            .dispatch(TimerAction::Tick {
                delta_seconds: remaining,
            })
            .unwrap();
        assert_eq!(timer.phase, Phase::Work);
        assert_eq!(timer.completed_sessions, 0);
    }

    #[test]
    fn test_skip_behaves_like_completion() {
        let mut timer = started();
        let outcome = timer.dispatch(TimerAction::Skip).unwrap();
        assert_eq!(
            outcome.transition,
            Some(PhaseTransition {
                from: Phase::Work,
                to: Phase::ShortBreak
            })
        );
        assert_eq!(timer.completed_sessions, 1);
    }

    #[test]
    fn test_skip_while_idle_is_invalid() {
        let mut timer = PomodoroTimer::default();
        assert!(matches!(
            timer.dispatch(TimerAction::Skip),
            Err(GameError::InvalidState(_))
        ));
    }

    #[test]
    fn test_reset_returns_to_fresh_idle() {
        let mut timer = started();
        timer.dispatch(TimerAction::Tick { delta_seconds: 100 }).unwrap();
        timer.dispatch(TimerAction::Reset).unwrap();
        assert_eq!(timer.phase, Phase::Idle);
        assert!(!timer.is_running);
        assert_eq!(timer.completed_sessions, 0);
        assert_eq!(timer.remaining_seconds, 25 * 60);
    }

    #[test]
    fn test_sync_with_real_time_applies_elapsed() {
        let mut timer = started();
        let then = timer.last_update_timestamp;
        let outcome = timer.sync_with_real_time(then + 120);
        assert!(outcome.changed);
        assert_eq!(timer.remaining_seconds, 25 * 60 - 120);
        assert_eq!(timer.last_update_timestamp, then + 120);
    }

    #[test]
    fn test_config_validation_bounds() {
        let mut config = TimerConfig::default();
        assert!(config.validate().is_ok());

        config.work_minutes = 0;
        assert!(matches!(
            config.validate(),
            Err(GameError::Validation(_))
        ));

        config.work_minutes = 25;
        config.sessions_before_long_break = 99;
        assert!(matches!(
            config.validate(),
            Err(GameError::Validation(_))
        ));
    }

    #[test]
    fn test_load_timer_config_missing_file_falls_back() {
        let config = load_timer_config("definitely_missing_settings.ron");
        assert_eq!(config, TimerConfig::default());
    }
}
