//! Inventory domain — the single writer for gold, slot moves, and
//! material payouts.

use bevy::prelude::*;

use crate::shared::*;

pub struct InventoryPlugin;

impl Plugin for InventoryPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            Update,
            (apply_gold_changes, handle_move_item, grant_task_materials)
                .run_if(in_state(GameState::Playing)),
        );
    }
}

/// All gold mutations flow through here so the purse can never go
/// negative and lifetime earnings stay accurate.
fn apply_gold_changes(
    mut gold_events: EventReader<GoldChangeEvent>,
    mut inventory: ResMut<Inventory>,
    mut dirty_writer: EventWriter<StateDirtyEvent>,
) {
    for ev in gold_events.read() {
        let before = inventory.gold;
        let after = (before as i64 + ev.amount).max(0) as u32;
        inventory.gold = after;
        if ev.amount > 0 {
            inventory.total_gold_earned += ev.amount as u64;
        }
        info!(
            "[Inventory] Gold {} -> {} ({:+}, {})",
            before, after, ev.amount, ev.reason
        );
        dirty_writer.send(StateDirtyEvent);
    }
}

fn handle_move_item(
    mut move_events: EventReader<MoveItemEvent>,
    mut inventory: ResMut<Inventory>,
    mut toast_writer: EventWriter<ToastEvent>,
    mut dirty_writer: EventWriter<StateDirtyEvent>,
) {
    for ev in move_events.read() {
        match inventory.move_item(ev.from, ev.to) {
            Ok(()) => {
                dirty_writer.send(StateDirtyEvent);
            }
            Err(e) => {
                warn!("[Inventory] Move {} -> {} rejected: {}", ev.from, ev.to, e);
                toast_writer.send(ToastEvent {
                    message: e.to_string(),
                });
            }
        }
    }
}

/// Pays out the material rewards of a completed task as stacked items.
fn grant_task_materials(
    mut completed: EventReader<TaskCompletedEvent>,
    catalog: Res<ItemCatalog>,
    mut inventory: ResMut<Inventory>,
    mut toast_writer: EventWriter<ToastEvent>,
    mut dirty_writer: EventWriter<StateDirtyEvent>,
) {
    for ev in completed.read() {
        let outcome = &ev.outcome;
        if outcome.materials == 0 {
            continue;
        }
        let Some(template) = catalog.get(&outcome.material_id) else {
            warn!(
                "[Inventory] Material '{}' missing from catalog",
                outcome.material_id
            );
            continue;
        };
        let item = Item {
            template_id: template.id.clone(),
            name: template.name.clone(),
            category: template.category,
            rarity: Rarity::Common,
            bonuses: StatBonuses::default(),
            effect: template.effect.clone(),
            value: template.base_value,
            max_stack: template.max_stack,
        };
        let leftover = inventory.add_item(&item, outcome.materials);
        let granted = outcome.materials - leftover;
        if granted > 0 {
            info!("[Inventory] +{} {}", granted, template.name);
            toast_writer.send(ToastEvent {
                message: format!("+{} {}", granted, template.name),
            });
        }
        if leftover > 0 {
            warn!("[Inventory] Full: {} {} lost", leftover, template.name);
            toast_writer.send(ToastEvent {
                message: format!("Inventory full! {} {} lost.", leftover, template.name),
            });
        }
        dirty_writer.send(StateDirtyEvent);
    }
}
