//! Loot domain — chest quality rolls, chest opening, and item generation.

pub mod weighted;

use bevy::prelude::*;
use rand::Rng;

use crate::shared::*;
use weighted::weighted_pick;

// ──────────────────────────────────────────────────────────────────────────────
// CONSTANTS
// ──────────────────────────────────────────────────────────────────────────────

/// Base gold a chest pays before quality/luck scaling.
const CHEST_GOLD_RANGE: EffectRange = EffectRange::new(20, 50);

/// Baseline probability of the celebratory lucky flag.
const LUCKY_BASE_CHANCE: f64 = 0.05;

pub struct LootPlugin;

impl Plugin for LootPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            Update,
            (award_chests, handle_open_chest).run_if(in_state(GameState::Playing)),
        );
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// PURE ROLLS
// ──────────────────────────────────────────────────────────────────────────────

/// Rolls a chest quality. Failed tasks always get a Basic chest; successes
/// roll an ascending threshold table nudged upward by luck.
pub fn determine_chest_quality(rng: &mut impl Rng, succeeded: bool, luck: i32) -> ChestQuality {
    if !succeeded {
        return ChestQuality::Basic;
    }
    let roll = rng.gen_range(1..=100) + luck.max(0) / 2;
    if roll >= 92 {
        ChestQuality::Masterwork
    } else if roll >= 75 {
        ChestQuality::Superior
    } else if roll >= 45 {
        ChestQuality::Fine
    } else {
        ChestQuality::Basic
    }
}

/// Luck-weighted rarity draw. Each point of luck shifts weight toward the
/// higher tiers proportionally to the tier index.
pub fn roll_rarity(rng: &mut impl Rng, luck: i32) -> Rarity {
    let luck = luck.max(0) as u32;
    let tiers: Vec<(Rarity, u32)> = Rarity::ALL
        .iter()
        .enumerate()
        .map(|(index, &rarity)| (rarity, rarity.base_weight() + luck * index as u32))
        .collect();
    weighted_pick(rng, &tiers, |(_, w)| *w)
        .map(|(rarity, _)| *rarity)
        .unwrap_or(Rarity::Common)
}

/// Instantiates an item from its template at the given rarity: stat bonuses
/// sampled from the template ranges and scaled by the rarity multiplier,
/// value scaled by rarity and character level.
pub fn roll_item(rng: &mut impl Rng, template: &ItemTemplate, rarity: Rarity, level: u32) -> Item {
    let scale = rarity.stat_multiplier();
    let ranges = &template.stat_ranges;
    let bonuses = StatBonuses {
        power: scale_stat(ranges.power.sample(rng), scale),
        focus: scale_stat(ranges.focus.sample(rng), scale),
        defense: scale_stat(ranges.defense.sample(rng), scale),
        luck: scale_stat(ranges.luck.sample(rng), scale),
        max_health: scale_stat(ranges.max_health.sample(rng), scale),
    };
    let level_scale = 1.0 + 0.05 * (level.saturating_sub(1)) as f32;
    let value = (template.base_value as f32 * rarity.value_multiplier() * level_scale) as u32;
    Item {
        template_id: template.id.clone(),
        name: template.name.clone(),
        category: template.category,
        rarity,
        bonuses,
        effect: template.effect.clone(),
        value,
        max_stack: template.max_stack,
    }
}

fn scale_stat(base: i32, multiplier: f32) -> i32 {
    (base as f32 * multiplier).floor() as i32
}

/// Rolls the full contents of a chest: item count from the quality range,
/// categories weighted by the source task's loot table, rarities by luck.
pub fn roll_chest_loot(
    rng: &mut impl Rng,
    chest: &Chest,
    catalog: &ItemCatalog,
    loot_weights: &LootWeights,
    level: u32,
    luck: i32,
) -> ChestLoot {
    let count = chest.quality.item_count_range().sample(rng).max(1) as usize;
    let categories = [
        (ItemCategory::Weapon, loot_weights.weapon),
        (ItemCategory::Armor, loot_weights.armor),
        (ItemCategory::Accessory, loot_weights.accessory),
        (ItemCategory::Consumable, loot_weights.consumable),
    ];

    let mut items = Vec::with_capacity(count);
    for _ in 0..count {
        let category = weighted_pick(rng, &categories, |(_, w)| *w)
            .map(|(c, _)| *c)
            .unwrap_or(ItemCategory::Consumable);
        let candidates = catalog.of_category(category);
        if candidates.is_empty() {
            continue;
        }
        let template = candidates[rng.gen_range(0..candidates.len())];
        let rarity = roll_rarity(rng, luck);
        items.push(roll_item(rng, template, rarity, level));
    }

    let base_gold = CHEST_GOLD_RANGE.sample(rng).max(0) as f32;
    let luck_bonus = 1.0 + (luck.max(0) as f32) * 0.01;
    let gold = (base_gold * chest.loot_quality * luck_bonus) as u32;

    let total_value = gold + items.iter().map(|i| i.value).sum::<u32>();
    let lucky_chance = (LUCKY_BASE_CHANCE + luck.max(0) as f64 * 0.002).min(0.5);

    ChestLoot {
        items,
        gold,
        total_value,
        was_lucky: rng.gen_bool(lucky_chance),
    }
}

/// Marks the chest opened and rolls its contents. A second open on the
/// same chest is an invalid-state error and yields nothing.
pub fn open_chest(
    rng: &mut impl Rng,
    chest: &mut Chest,
    catalog: &ItemCatalog,
    loot_weights: &LootWeights,
    level: u32,
    luck: i32,
) -> Result<ChestLoot, GameError> {
    if chest.opened {
        return Err(GameError::InvalidState(format!(
            "chest {} has already been opened",
            chest.id
        )));
    }
    chest.opened = true;
    Ok(roll_chest_loot(rng, chest, catalog, loot_weights, level, luck))
}

// ──────────────────────────────────────────────────────────────────────────────
// SYSTEMS
// ──────────────────────────────────────────────────────────────────────────────

/// Awards a chest for every completed task. Failures still yield a Basic
/// chest; success quality is a luck-biased roll.
fn award_chests(
    mut completed: EventReader<TaskCompletedEvent>,
    mut vault: ResMut<ChestVault>,
    character: Res<CharacterState>,
    mut awarded_writer: EventWriter<ChestAwardedEvent>,
    mut toast_writer: EventWriter<ToastEvent>,
    mut dirty_writer: EventWriter<StateDirtyEvent>,
) {
    for ev in completed.read() {
        let mut rng = rand::thread_rng();
        let succeeded = ev.outcome.result != TaskResult::Failure;
        let quality =
            determine_chest_quality(&mut rng, succeeded, character.computed_stats.luck);
        let chest_id = vault.award(quality, &ev.outcome.task_id, ev.outcome.kind);
        info!(
            "[Loot] Awarded {:?} chest #{} from '{}'",
            quality, chest_id, ev.outcome.task_id
        );
        awarded_writer.send(ChestAwardedEvent { chest_id, quality });
        toast_writer.send(ToastEvent {
            message: format!("You earned a {:?} chest!", quality),
        });
        dirty_writer.send(StateDirtyEvent);
    }
}

/// Opens a chest on request: rolls loot, stores the items, pays the gold.
fn handle_open_chest(
    mut open_events: EventReader<OpenChestEvent>,
    mut vault: ResMut<ChestVault>,
    mut inventory: ResMut<Inventory>,
    catalog: Res<ItemCatalog>,
    task_catalog: Res<TaskCatalog>,
    character: Res<CharacterState>,
    progression: Res<ProgressionState>,
    mut opened_writer: EventWriter<ChestOpenedEvent>,
    mut gold_writer: EventWriter<GoldChangeEvent>,
    mut toast_writer: EventWriter<ToastEvent>,
    mut dirty_writer: EventWriter<StateDirtyEvent>,
) {
    for ev in open_events.read() {
        let Some(chest) = vault.get_mut(ev.chest_id) else {
            warn!("[Loot] Open request for unknown chest {}", ev.chest_id);
            toast_writer.send(ToastEvent {
                message: "That chest is gone.".to_string(),
            });
            continue;
        };

        let loot_weights = task_catalog
            .get(&chest.source_task)
            .map(|def| def.loot_weights)
            .unwrap_or_default();

        let mut rng = rand::thread_rng();
        let loot = match open_chest(
            &mut rng,
            chest,
            &catalog,
            &loot_weights,
            progression.level,
            character.computed_stats.luck,
        ) {
            Ok(loot) => loot,
            Err(e) => {
                warn!("[Loot] Chest {} open rejected: {}", ev.chest_id, e);
                toast_writer.send(ToastEvent {
                    message: e.to_string(),
                });
                continue;
            }
        };

        let mut overflow = 0;
        for item in &loot.items {
            overflow += inventory.add_item(item, 1);
        }
        if overflow > 0 {
            warn!("[Loot] Inventory full: {} item(s) lost", overflow);
            toast_writer.send(ToastEvent {
                message: format!("Inventory full! {} item(s) were left behind.", overflow),
            });
        }

        if loot.gold > 0 {
            gold_writer.send(GoldChangeEvent {
                amount: loot.gold as i64,
                reason: format!("chest #{}", ev.chest_id),
            });
        }

        info!(
            "[Loot] Chest {} opened: {} item(s), {} gold{}",
            ev.chest_id,
            loot.items.len(),
            loot.gold,
            if loot.was_lucky { " (lucky!)" } else { "" }
        );
        if loot.was_lucky {
            toast_writer.send(ToastEvent {
                message: "A lucky find!".to_string(),
            });
        }

        opened_writer.send(ChestOpenedEvent {
            chest_id: ev.chest_id,
            loot,
        });
        dirty_writer.send(StateDirtyEvent);
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// TESTS
// ──────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn sword_template() -> ItemTemplate {
        ItemTemplate {
            id: "iron_sword".to_string(),
            name: "Iron Sword".to_string(),
            category: ItemCategory::Weapon,
            stat_ranges: StatRanges {
                power: EffectRange::new(3, 6),
                ..Default::default()
            },
            effect: None,
            base_value: 40,
            max_stack: 1,
        }
    }

    #[test]
    fn test_failed_task_chest_is_always_basic() {
        let mut rng = rand::thread_rng();
        for _ in 0..100 {
            assert_eq!(
                determine_chest_quality(&mut rng, false, 999),
                ChestQuality::Basic
            );
        }
    }

    #[test]
    fn test_success_chest_quality_is_within_table() {
        let mut rng = rand::thread_rng();
        for _ in 0..100 {
            let quality = determine_chest_quality(&mut rng, true, 5);
            assert!(matches!(
                quality,
                ChestQuality::Basic
                    | ChestQuality::Fine
                    | ChestQuality::Superior
                    | ChestQuality::Masterwork
            ));
        }
    }

    #[test]
    fn test_roll_item_scales_with_rarity() {
        let template = sword_template();
        let mut rng = rand::thread_rng();
        let legendary = roll_item(&mut rng, &template, Rarity::Legendary, 1);
        // Legendary triples the stat roll: minimum base 3 becomes at least 9.
        assert!(legendary.bonuses.power >= 9);
        assert_eq!(legendary.value, 40 * 8);
        assert_eq!(legendary.rarity, Rarity::Legendary);
    }

    #[test]
    fn test_open_chest_twice_is_invalid() {
        let mut vault = ChestVault::default();
        let id = vault.award(ChestQuality::Fine, "test_task", TaskKind::Expedition);
        let chest = vault.get_mut(id).unwrap();

        let mut catalog = ItemCatalog::default();
        catalog
            .templates
            .insert("iron_sword".to_string(), sword_template());
        let weights = LootWeights::default();
        let mut rng = rand::thread_rng();

        let first = open_chest(&mut rng, chest, &catalog, &weights, 1, 5);
        assert!(first.is_ok());
        let second = open_chest(&mut rng, chest, &catalog, &weights, 1, 5);
        assert!(matches!(second, Err(GameError::InvalidState(_))));
    }

    #[test]
    fn test_chest_item_count_matches_quality_range() {
        let mut vault = ChestVault::default();
        let id = vault.award(ChestQuality::Masterwork, "test_task", TaskKind::Raid);
        let chest = vault.get_mut(id).unwrap();

        let mut catalog = ItemCatalog::default();
        catalog
            .templates
            .insert("iron_sword".to_string(), sword_template());
        // All weight on weapons so every roll finds a candidate.
        let weights = LootWeights {
            weapon: 100,
            armor: 0,
            accessory: 0,
            consumable: 0,
        };
        let mut rng = rand::thread_rng();
        let loot = roll_chest_loot(&mut rng, chest, &catalog, &weights, 1, 0);
        assert!((4..=6).contains(&loot.items.len()));
        assert!(loot.gold > 0);
    }

    #[test]
    fn test_empty_catalog_yields_gold_only() {
        let mut vault = ChestVault::default();
        let id = vault.award(ChestQuality::Basic, "test_task", TaskKind::Scavenge);
        let chest = vault.get_mut(id).unwrap();
        let catalog = ItemCatalog::default();
        let weights = LootWeights::default();
        let mut rng = rand::thread_rng();
        let loot = roll_chest_loot(&mut rng, chest, &catalog, &weights, 1, 0);
        assert!(loot.items.is_empty());
        assert!(loot.gold >= 20);
    }
}
