mod shared;
mod timer;
mod encounters;
mod tasks;
mod loot;
mod character;
mod inventory;
mod data;
mod save;

use std::time::Duration;

use bevy::app::ScheduleRunnerPlugin;
use bevy::log::LogPlugin;
use bevy::prelude::*;
use bevy::state::app::StatesPlugin;

use shared::*;
use timer::{load_timer_config, SETTINGS_PATH};

fn main() {
    let config = load_timer_config(SETTINGS_PATH);

    App::new()
        // Headless shell: the core runs without rendering or windowing and
        // ticks ten times a second, which is plenty for one-second timers.
        .add_plugins(
            MinimalPlugins.set(ScheduleRunnerPlugin::run_loop(Duration::from_millis(100))),
        )
        .add_plugins(LogPlugin::default())
        .add_plugins(StatesPlugin)
        // Game state
        .init_state::<GameState>()
        // Shared resources
        .insert_resource(PomodoroTimer::new(config))
        .init_resource::<CharacterState>()
        .init_resource::<Inventory>()
        .init_resource::<ChestVault>()
        .init_resource::<ActiveTask>()
        .init_resource::<SelectedTask>()
        .init_resource::<TaskHistory>()
        .init_resource::<TaskStatistics>()
        .init_resource::<ProgressionState>()
        .init_resource::<ItemCatalog>()
        .init_resource::<TaskCatalog>()
        .init_resource::<EncounterBank>()
        // UI intent events
        .add_event::<TimerActionEvent>()
        .add_event::<SelectTaskEvent>()
        .add_event::<OpenChestEvent>()
        .add_event::<UseItemEvent>()
        .add_event::<EquipItemEvent>()
        .add_event::<UnequipEvent>()
        .add_event::<MoveItemEvent>()
        .add_event::<TreatInjuryEvent>()
        .add_event::<PayBillEvent>()
        // Notification events
        .add_event::<TimerChangedEvent>()
        .add_event::<PhaseChangedEvent>()
        .add_event::<EncounterFiredEvent>()
        .add_event::<TaskCompletedEvent>()
        .add_event::<ChestAwardedEvent>()
        .add_event::<ChestOpenedEvent>()
        .add_event::<GoldChangeEvent>()
        .add_event::<LevelUpEvent>()
        .add_event::<ToastEvent>()
        .add_event::<StateDirtyEvent>()
        .add_event::<SaveRequestEvent>()
        .add_event::<LoadRequestEvent>()
        .add_event::<SaveCompleteEvent>()
        .add_event::<LoadCompleteEvent>()
        .add_event::<NewGameEvent>()
        // Domain plugins
        .add_plugins(timer::TimerPlugin)
        .add_plugins(encounters::EncounterPlugin)
        .add_plugins(tasks::TaskPlugin)
        .add_plugins(loot::LootPlugin)
        .add_plugins(character::CharacterPlugin)
        .add_plugins(inventory::InventoryPlugin)
        .add_plugins(save::SavePlugin)
        // Data loading
        .add_plugins(data::DataPlugin)
        .run();
}
