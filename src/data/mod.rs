//! Data layer — populates all catalogs at startup.
//!
//! Runs in OnEnter(GameState::Loading), fills every catalog (ItemCatalog,
//! TaskCatalog, EncounterBank) from the hard-coded game-design data in the
//! submodules, then transitions to GameState::MainMenu.
//!
//! No other domain seeds these resources; everything can read them once
//! GameState has advanced past Loading.

mod encounters;
mod items;
mod tasks;

use bevy::prelude::*;

use crate::shared::*;

pub struct DataPlugin;

impl Plugin for DataPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(OnEnter(GameState::Loading), load_all_data);
    }
}

fn load_all_data(
    mut item_catalog: ResMut<ItemCatalog>,
    mut task_catalog: ResMut<TaskCatalog>,
    mut encounter_bank: ResMut<EncounterBank>,
    mut next_state: ResMut<NextState<GameState>>,
) {
    info!("DataPlugin: populating catalogs…");

    items::populate_items(&mut item_catalog);
    info!("  Item templates loaded: {}", item_catalog.templates.len());

    tasks::populate_tasks(&mut task_catalog);
    info!("  Tasks loaded: {}", task_catalog.tasks.len());

    encounters::populate_encounters(&mut encounter_bank);
    info!("  Encounter templates loaded: {}", encounter_bank.templates.len());

    info!("DataPlugin: all catalogs populated. Transitioning to MainMenu.");
    next_state.set(GameState::MainMenu);
}
