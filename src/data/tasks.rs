use crate::shared::*;

/// Populate the TaskCatalog with every task definition.
///
/// Base success chances are pre-modifier values; the executor applies the
/// risk modifier, event modifiers, and injury/bill penalties on top.
pub fn populate_tasks(catalog: &mut TaskCatalog) {
    let tasks: Vec<TaskDef> = vec![
        TaskDef {
            id: "ruins_expedition".into(),
            name: "Ruins Expedition".into(),
            kind: TaskKind::Expedition,
            risk: RiskLevel::Standard,
            base_success_chance: 70,
            gold_reward: EffectRange::new(30, 50),
            xp_reward: EffectRange::new(25, 40),
            material_reward: EffectRange::new(1, 3),
            material_id: "relic_shard".into(),
            injury_chance_on_failure: 30,
            loot_weights: LootWeights {
                weapon: 25,
                armor: 20,
                accessory: 15,
                consumable: 40,
            },
        },
        TaskDef {
            id: "night_expedition".into(),
            name: "Night Expedition".into(),
            kind: TaskKind::Expedition,
            risk: RiskLevel::Risky,
            base_success_chance: 60,
            gold_reward: EffectRange::new(45, 70),
            xp_reward: EffectRange::new(35, 55),
            material_reward: EffectRange::new(2, 4),
            material_id: "relic_shard".into(),
            injury_chance_on_failure: 40,
            loot_weights: LootWeights {
                weapon: 25,
                armor: 15,
                accessory: 25,
                consumable: 35,
            },
        },
        TaskDef {
            id: "dragon_raid".into(),
            name: "Dragon's Den Raid".into(),
            kind: TaskKind::Raid,
            risk: RiskLevel::Risky,
            base_success_chance: 55,
            gold_reward: EffectRange::new(60, 100),
            xp_reward: EffectRange::new(40, 60),
            material_reward: EffectRange::new(1, 2),
            material_id: "dragon_scale".into(),
            injury_chance_on_failure: 50,
            loot_weights: LootWeights {
                weapon: 35,
                armor: 30,
                accessory: 15,
                consumable: 20,
            },
        },
        TaskDef {
            id: "field_scavenge".into(),
            name: "Field Scavenge".into(),
            kind: TaskKind::Scavenge,
            risk: RiskLevel::Safe,
            base_success_chance: 85,
            gold_reward: EffectRange::new(15, 25),
            xp_reward: EffectRange::new(10, 20),
            material_reward: EffectRange::new(2, 4),
            material_id: "herb_bundle".into(),
            injury_chance_on_failure: 10,
            loot_weights: LootWeights {
                weapon: 5,
                armor: 10,
                accessory: 10,
                consumable: 75,
            },
        },
        TaskDef {
            id: "mine_scavenge".into(),
            name: "Old Mine Scavenge".into(),
            kind: TaskKind::Scavenge,
            risk: RiskLevel::Standard,
            base_success_chance: 75,
            gold_reward: EffectRange::new(20, 35),
            xp_reward: EffectRange::new(15, 25),
            material_reward: EffectRange::new(2, 5),
            material_id: "iron_ore".into(),
            injury_chance_on_failure: 25,
            loot_weights: LootWeights {
                weapon: 15,
                armor: 25,
                accessory: 10,
                consumable: 50,
            },
        },
        TaskDef {
            id: "combat_training".into(),
            name: "Combat Training".into(),
            kind: TaskKind::Training,
            risk: RiskLevel::Standard,
            base_success_chance: 75,
            gold_reward: EffectRange::new(10, 20),
            xp_reward: EffectRange::new(35, 50),
            material_reward: EffectRange::new(0, 1),
            material_id: "iron_ore".into(),
            injury_chance_on_failure: 20,
            loot_weights: LootWeights::default(),
        },
        TaskDef {
            id: "quiet_rest".into(),
            name: "Quiet Rest".into(),
            kind: TaskKind::Rest,
            risk: RiskLevel::Safe,
            base_success_chance: 90,
            gold_reward: EffectRange::new(0, 5),
            xp_reward: EffectRange::new(5, 10),
            material_reward: EffectRange::new(0, 0),
            material_id: "herb_bundle".into(),
            injury_chance_on_failure: 5,
            loot_weights: LootWeights {
                weapon: 0,
                armor: 0,
                accessory: 10,
                consumable: 90,
            },
        },
    ];

    for task in tasks {
        catalog.order.push(task.id.clone());
        catalog.tasks.insert(task.id.clone(), task);
    }
}
