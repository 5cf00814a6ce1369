//! Save domain — one JSON snapshot, written atomically, loaded at boot.
//!
//! Mutating systems mark the world dirty with [`StateDirtyEvent`]; a short
//! debounce coalesces those into a single write. [`SaveRequestEvent`]
//! forces an immediate flush. Loading rejects any snapshot whose version
//! string differs from [`SAVE_VERSION`].

use bevy::app::AppExit;
use bevy::prelude::*;
#[cfg(not(target_arch = "wasm32"))]
use std::fs;
#[cfg(not(target_arch = "wasm32"))]
use std::path::{Path, PathBuf};

use crate::character::recalculate_stats;
use crate::shared::*;

/// Seconds the autosave debounce waits after the first dirty mark.
pub const AUTOSAVE_DEBOUNCE_SECONDS: f32 = 2.0;

// ═══════════════════════════════════════════════════════════════════════
// RESOURCES
// ═══════════════════════════════════════════════════════════════════════

/// Pending-autosave state for the debounce system.
#[derive(Resource, Debug, Clone, Default)]
pub struct AutosaveDebounce {
    pub pending: bool,
    pub seconds_remaining: f32,
}

pub struct SavePlugin;

impl Plugin for SavePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<AutosaveDebounce>()
            .add_systems(OnEnter(GameState::MainMenu), request_boot_load)
            .add_systems(
                Update,
                (handle_load_request, advance_after_load).run_if(in_state(GameState::MainMenu)),
            )
            .add_systems(
                Update,
                (
                    watch_dirty_state,
                    tick_autosave_debounce,
                    handle_save_request,
                    handle_load_request,
                    handle_new_game,
                )
                    .run_if(in_state(GameState::Playing)),
            )
            // An exit inside the debounce window must not drop the write.
            .add_systems(Last, flush_on_exit);
    }
}

// ═══════════════════════════════════════════════════════════════════════
// FILESYSTEM HELPERS
// ═══════════════════════════════════════════════════════════════════════

#[cfg(not(target_arch = "wasm32"))]
fn saves_directory() -> PathBuf {
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|p| p.to_path_buf()))
        .unwrap_or_else(|| PathBuf::from("."));
    exe_dir.join("saves")
}

#[cfg(not(target_arch = "wasm32"))]
fn snapshot_path() -> PathBuf {
    saves_directory().join("snapshot.json")
}

// ═══════════════════════════════════════════════════════════════════════
// SNAPSHOT IO
// ═══════════════════════════════════════════════════════════════════════

/// Serializes and writes a snapshot via temp-file + rename.
#[cfg(not(target_arch = "wasm32"))]
pub fn write_snapshot_to(path: &Path, data: &SaveData) -> Result<(), GameError> {
    if let Some(dir) = path.parent() {
        if !dir.exists() {
            fs::create_dir_all(dir).map_err(|e| {
                GameError::Persistence(format!("could not create {}: {}", dir.display(), e))
            })?;
        }
    }
    let json = serde_json::to_string_pretty(data)
        .map_err(|e| GameError::Persistence(format!("serialization failed: {}", e)))?;
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, &json).map_err(|e| {
        GameError::Persistence(format!("write failed for {}: {}", tmp_path.display(), e))
    })?;
    fs::rename(&tmp_path, path)
        .map_err(|e| GameError::Persistence(format!("rename failed: {}", e)))?;
    Ok(())
}

/// Reads and validates a snapshot. A version-string mismatch is rejected
/// outright rather than migrated.
#[cfg(not(target_arch = "wasm32"))]
pub fn read_snapshot_from(path: &Path) -> Result<SaveData, GameError> {
    if !path.exists() {
        return Err(GameError::Persistence(format!(
            "no snapshot at {}",
            path.display()
        )));
    }
    let json = fs::read_to_string(path).map_err(|e| {
        GameError::Persistence(format!("read failed for {}: {}", path.display(), e))
    })?;
    let data: SaveData = serde_json::from_str(&json)
        .map_err(|e| GameError::Persistence(format!("deserialization failed: {}", e)))?;
    if data.metadata.version != SAVE_VERSION {
        return Err(GameError::VersionMismatch {
            found: data.metadata.version,
            expected: SAVE_VERSION.to_string(),
        });
    }
    Ok(data)
}

#[cfg(not(target_arch = "wasm32"))]
fn write_snapshot(data: &SaveData) -> Result<(), GameError> {
    write_snapshot_to(&snapshot_path(), data)
}

#[cfg(not(target_arch = "wasm32"))]
fn read_snapshot() -> Result<SaveData, GameError> {
    read_snapshot_from(&snapshot_path())
}

#[cfg(not(target_arch = "wasm32"))]
fn delete_snapshot() {
    let path = snapshot_path();
    if path.exists() {
        if let Err(e) = fs::remove_file(&path) {
            warn!("[Save] Could not delete {}: {}", path.display(), e);
        }
    }
}

#[cfg(target_arch = "wasm32")]
fn write_snapshot(_data: &SaveData) -> Result<(), GameError> {
    Ok(())
}

#[cfg(target_arch = "wasm32")]
fn read_snapshot() -> Result<SaveData, GameError> {
    Err(GameError::Persistence(
        "saves not available in browser".to_string(),
    ))
}

#[cfg(target_arch = "wasm32")]
fn delete_snapshot() {}

// ═══════════════════════════════════════════════════════════════════════
// SYSTEMS
// ═══════════════════════════════════════════════════════════════════════

fn request_boot_load(mut load_writer: EventWriter<LoadRequestEvent>) {
    info!("[Save] Requesting boot load");
    load_writer.send(LoadRequestEvent);
}

/// Marks an autosave pending on the first dirty event; later dirty events
/// within the window coalesce into the same write.
fn watch_dirty_state(
    mut dirty_events: EventReader<StateDirtyEvent>,
    mut debounce: ResMut<AutosaveDebounce>,
) {
    if dirty_events.read().next().is_none() {
        return;
    }
    dirty_events.clear();
    if !debounce.pending {
        debounce.pending = true;
        debounce.seconds_remaining = AUTOSAVE_DEBOUNCE_SECONDS;
    }
}

fn tick_autosave_debounce(
    time: Res<Time>,
    mut debounce: ResMut<AutosaveDebounce>,
    mut save_writer: EventWriter<SaveRequestEvent>,
) {
    if !debounce.pending {
        return;
    }
    debounce.seconds_remaining -= time.delta_secs();
    if debounce.seconds_remaining <= 0.0 {
        debounce.pending = false;
        save_writer.send(SaveRequestEvent);
    }
}

fn snapshot_world(
    timer: &PomodoroTimer,
    character: &CharacterState,
    inventory: &Inventory,
    chest_vault: &ChestVault,
    task_history: &TaskHistory,
    task_statistics: &TaskStatistics,
    progression: &ProgressionState,
) -> SaveData {
    SaveData {
        metadata: SaveMetadata {
            version: SAVE_VERSION.to_string(),
            saved_at: current_timestamp(),
        },
        timer: timer.clone(),
        character: character.clone(),
        inventory: inventory.clone(),
        chest_vault: chest_vault.clone(),
        task_history: task_history.clone(),
        task_statistics: task_statistics.clone(),
        progression: progression.clone(),
    }
}

fn handle_save_request(
    mut save_events: EventReader<SaveRequestEvent>,
    mut complete_writer: EventWriter<SaveCompleteEvent>,
    mut debounce: ResMut<AutosaveDebounce>,
    timer: Res<PomodoroTimer>,
    character: Res<CharacterState>,
    inventory: Res<Inventory>,
    chest_vault: Res<ChestVault>,
    task_history: Res<TaskHistory>,
    task_statistics: Res<TaskStatistics>,
    progression: Res<ProgressionState>,
) {
    if save_events.read().next().is_none() {
        return;
    }
    save_events.clear();
    debounce.pending = false;

    let data = snapshot_world(
        &timer,
        &character,
        &inventory,
        &chest_vault,
        &task_history,
        &task_statistics,
        &progression,
    );

    match write_snapshot(&data) {
        Ok(()) => {
            info!("[Save] Snapshot written");
            complete_writer.send(SaveCompleteEvent {
                success: true,
                error_message: None,
            });
        }
        Err(e) => {
            warn!("[Save] Snapshot write FAILED: {}", e);
            complete_writer.send(SaveCompleteEvent {
                success: false,
                error_message: Some(e.to_string()),
            });
        }
    }
}

/// Writes any autosave still inside the debounce window before the app
/// shuts down.
fn flush_on_exit(
    mut exit_events: EventReader<AppExit>,
    mut debounce: ResMut<AutosaveDebounce>,
    timer: Res<PomodoroTimer>,
    character: Res<CharacterState>,
    inventory: Res<Inventory>,
    chest_vault: Res<ChestVault>,
    task_history: Res<TaskHistory>,
    task_statistics: Res<TaskStatistics>,
    progression: Res<ProgressionState>,
) {
    if exit_events.read().next().is_none() {
        return;
    }
    if !debounce.pending {
        return;
    }
    debounce.pending = false;

    let data = snapshot_world(
        &timer,
        &character,
        &inventory,
        &chest_vault,
        &task_history,
        &task_statistics,
        &progression,
    );
    match write_snapshot(&data) {
        Ok(()) => info!("[Save] Pending autosave flushed on exit"),
        Err(e) => warn!("[Save] Exit flush FAILED: {}", e),
    }
}

fn handle_load_request(
    mut load_events: EventReader<LoadRequestEvent>,
    mut complete_writer: EventWriter<LoadCompleteEvent>,
    mut timer: ResMut<PomodoroTimer>,
    mut character: ResMut<CharacterState>,
    mut inventory: ResMut<Inventory>,
    mut chest_vault: ResMut<ChestVault>,
    mut task_history: ResMut<TaskHistory>,
    mut task_statistics: ResMut<TaskStatistics>,
    mut progression: ResMut<ProgressionState>,
) {
    if load_events.read().next().is_none() {
        return;
    }
    load_events.clear();

    match read_snapshot() {
        Ok(data) => {
            *timer = data.timer;
            *character = data.character;
            *inventory = data.inventory;
            *chest_vault = data.chest_vault;
            *task_history = data.task_history;
            *task_statistics = data.task_statistics;
            *progression = data.progression;

            // The timer kept running while the app was closed.
            let outcome = timer.sync_with_real_time(current_timestamp());
            if let Some(transition) = outcome.transition {
                info!(
                    "[Save] Timer advanced past {:?} -> {:?} while offline",
                    transition.from, transition.to
                );
            }
            recalculate_stats(&mut character, current_timestamp_ms());

            info!("[Save] Snapshot loaded");
            complete_writer.send(LoadCompleteEvent {
                success: true,
                error_message: None,
            });
        }
        Err(e) => {
            // A fresh game keeps its default resources; running state is
            // never partially overwritten by a bad snapshot.
            warn!("[Save] Snapshot load failed: {}", e);
            complete_writer.send(LoadCompleteEvent {
                success: false,
                error_message: Some(e.to_string()),
            });
        }
    }
}

/// Loaded or not, the game proceeds once the boot load settles.
fn advance_after_load(
    mut complete_events: EventReader<LoadCompleteEvent>,
    mut next_state: ResMut<NextState<GameState>>,
) {
    for ev in complete_events.read() {
        if ev.success {
            info!("[Save] Continuing saved game");
        } else {
            info!("[Save] Starting fresh game");
        }
        next_state.set(GameState::Playing);
    }
}

fn handle_new_game(
    mut new_game_events: EventReader<NewGameEvent>,
    mut timer: ResMut<PomodoroTimer>,
    mut character: ResMut<CharacterState>,
    mut inventory: ResMut<Inventory>,
    mut chest_vault: ResMut<ChestVault>,
    mut task_history: ResMut<TaskHistory>,
    mut task_statistics: ResMut<TaskStatistics>,
    mut progression: ResMut<ProgressionState>,
    mut selected: ResMut<SelectedTask>,
    mut active: ResMut<ActiveTask>,
) {
    if new_game_events.read().next().is_none() {
        return;
    }
    new_game_events.clear();

    info!("[Save] Starting new game; all state reset");
    let config = timer.config;
    *timer = PomodoroTimer::new(config);
    *character = CharacterState::default();
    *inventory = Inventory::default();
    *chest_vault = ChestVault::default();
    *task_history = TaskHistory::default();
    *task_statistics = TaskStatistics::default();
    *progression = ProgressionState::default();
    selected.0 = None;
    active.0 = None;
    recalculate_stats(&mut character, current_timestamp_ms());
    delete_snapshot();
}

// ═══════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_data() -> SaveData {
        let mut inventory = Inventory::default();
        inventory.gold = 321;
        SaveData {
            metadata: SaveMetadata {
                version: SAVE_VERSION.to_string(),
                saved_at: 1_700_000_000,
            },
            timer: PomodoroTimer::default(),
            character: CharacterState::default(),
            inventory,
            chest_vault: ChestVault::default(),
            task_history: TaskHistory::default(),
            task_statistics: TaskStatistics::default(),
            progression: ProgressionState::default(),
        }
    }

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("focusquest_{}_{}.json", name, std::process::id()))
    }

    #[test]
    fn test_snapshot_round_trip() {
        let path = temp_path("roundtrip");
        let data = sample_data();
        write_snapshot_to(&path, &data).unwrap();
        let loaded = read_snapshot_from(&path).unwrap();
        assert_eq!(loaded.inventory.gold, 321);
        assert_eq!(loaded.metadata.version, SAVE_VERSION);
        fs::remove_file(&path).ok();
    }

    #[test]
    fn test_version_mismatch_is_rejected() {
        let path = temp_path("version");
        let mut data = sample_data();
        data.metadata.version = "0.9.0".to_string();
        write_snapshot_to(&path, &data).unwrap();
        let result = read_snapshot_from(&path);
        assert!(matches!(
            result,
            Err(GameError::VersionMismatch { .. })
        ));
        fs::remove_file(&path).ok();
    }

    #[test]
    fn test_missing_snapshot_is_a_persistence_error() {
        let path = temp_path("missing_never_written");
        let result = read_snapshot_from(&path);
        assert!(matches!(result, Err(GameError::Persistence(_))));
    }

    #[test]
    fn test_exit_flushes_pending_autosave() {
        let path = snapshot_path();
        fs::remove_file(&path).ok();

        let mut app = App::new();
        app.add_event::<AppExit>();
        app.insert_resource(AutosaveDebounce {
            pending: true,
            seconds_remaining: 1.5,
        });
        app.init_resource::<PomodoroTimer>();
        app.init_resource::<CharacterState>();
        let mut inventory = Inventory::default();
        inventory.gold = 777;
        app.insert_resource(inventory);
        app.init_resource::<ChestVault>();
        app.init_resource::<TaskHistory>();
        app.init_resource::<TaskStatistics>();
        app.init_resource::<ProgressionState>();
        app.add_systems(Last, flush_on_exit);

        app.world_mut().send_event(AppExit::Success);
        app.update();

        let loaded = read_snapshot_from(&path).unwrap();
        assert_eq!(loaded.inventory.gold, 777);
        assert!(!app.world().resource::<AutosaveDebounce>().pending);
        fs::remove_file(&path).ok();
    }

    #[test]
    fn test_corrupt_snapshot_is_a_persistence_error() {
        let path = temp_path("corrupt");
        fs::write(&path, "{ not json").unwrap();
        let result = read_snapshot_from(&path);
        assert!(matches!(result, Err(GameError::Persistence(_))));
        fs::remove_file(&path).ok();
    }
}
