use crate::shared::*;

/// Populate the ItemCatalog with every item template.
///
/// Equippables roll their bonuses from `stat_ranges` when generated, so
/// the ranges here are pre-rarity values. Consumables and materials leave
/// the ranges at zero.
pub fn populate_items(catalog: &mut ItemCatalog) {
    let templates: Vec<ItemTemplate> = vec![
        // ── Weapons ─────────────────────────────────────────────────────────────
        ItemTemplate {
            id: "iron_sword".into(),
            name: "Iron Sword".into(),
            category: ItemCategory::Weapon,
            stat_ranges: StatRanges {
                power: EffectRange::new(3, 6),
                ..Default::default()
            },
            effect: None,
            base_value: 40,
            max_stack: 1,
        },
        ItemTemplate {
            id: "hunting_bow".into(),
            name: "Hunting Bow".into(),
            category: ItemCategory::Weapon,
            stat_ranges: StatRanges {
                power: EffectRange::new(2, 4),
                focus: EffectRange::new(1, 3),
                ..Default::default()
            },
            effect: None,
            base_value: 45,
            max_stack: 1,
        },
        ItemTemplate {
            id: "arcane_staff".into(),
            name: "Arcane Staff".into(),
            category: ItemCategory::Weapon,
            stat_ranges: StatRanges {
                power: EffectRange::new(1, 3),
                focus: EffectRange::new(3, 5),
                ..Default::default()
            },
            effect: None,
            base_value: 55,
            max_stack: 1,
        },
        // ── Armor ───────────────────────────────────────────────────────────────
        ItemTemplate {
            id: "leather_vest".into(),
            name: "Leather Vest".into(),
            category: ItemCategory::Armor,
            stat_ranges: StatRanges {
                defense: EffectRange::new(2, 4),
                ..Default::default()
            },
            effect: None,
            base_value: 35,
            max_stack: 1,
        },
        ItemTemplate {
            id: "chain_mail".into(),
            name: "Chain Mail".into(),
            category: ItemCategory::Armor,
            stat_ranges: StatRanges {
                defense: EffectRange::new(3, 6),
                max_health: EffectRange::new(5, 10),
                ..Default::default()
            },
            effect: None,
            base_value: 60,
            max_stack: 1,
        },
        ItemTemplate {
            id: "scholars_robe".into(),
            name: "Scholar's Robe".into(),
            category: ItemCategory::Armor,
            stat_ranges: StatRanges {
                defense: EffectRange::new(1, 2),
                focus: EffectRange::new(2, 4),
                ..Default::default()
            },
            effect: None,
            base_value: 50,
            max_stack: 1,
        },
        // ── Accessories ─────────────────────────────────────────────────────────
        ItemTemplate {
            id: "lucky_coin".into(),
            name: "Lucky Coin".into(),
            category: ItemCategory::Accessory,
            stat_ranges: StatRanges {
                luck: EffectRange::new(2, 5),
                ..Default::default()
            },
            effect: None,
            base_value: 70,
            max_stack: 1,
        },
        ItemTemplate {
            id: "focus_band".into(),
            name: "Focus Band".into(),
            category: ItemCategory::Accessory,
            stat_ranges: StatRanges {
                focus: EffectRange::new(2, 4),
                luck: EffectRange::new(0, 2),
                ..Default::default()
            },
            effect: None,
            base_value: 65,
            max_stack: 1,
        },
        // ── Consumables ─────────────────────────────────────────────────────────
        ItemTemplate {
            id: "healing_potion".into(),
            name: "Healing Potion".into(),
            category: ItemCategory::Consumable,
            stat_ranges: StatRanges::default(),
            effect: Some(ConsumableEffect {
                heal: 30,
                cures_injury: false,
                buff: None,
            }),
            base_value: 25,
            max_stack: 10,
        },
        ItemTemplate {
            id: "field_bandage".into(),
            name: "Field Bandage".into(),
            category: ItemCategory::Consumable,
            stat_ranges: StatRanges::default(),
            effect: Some(ConsumableEffect {
                heal: 10,
                cures_injury: true,
                buff: None,
            }),
            base_value: 40,
            max_stack: 5,
        },
        ItemTemplate {
            id: "focus_tonic".into(),
            name: "Focus Tonic".into(),
            category: ItemCategory::Consumable,
            stat_ranges: StatRanges::default(),
            effect: Some(ConsumableEffect {
                heal: 0,
                cures_injury: false,
                buff: Some(BuffSpec {
                    name: "Focused".into(),
                    bonuses: StatBonuses {
                        focus: 5,
                        ..Default::default()
                    },
                    // One work session at default settings.
                    duration_ms: Some(25 * 60 * 1000),
                }),
            }),
            base_value: 30,
            max_stack: 10,
        },
        ItemTemplate {
            id: "fortune_brew".into(),
            name: "Fortune Brew".into(),
            category: ItemCategory::Consumable,
            stat_ranges: StatRanges::default(),
            effect: Some(ConsumableEffect {
                heal: 0,
                cures_injury: false,
                buff: Some(BuffSpec {
                    name: "Fortunate".into(),
                    bonuses: StatBonuses {
                        luck: 8,
                        ..Default::default()
                    },
                    duration_ms: Some(60 * 60 * 1000),
                }),
            }),
            base_value: 50,
            max_stack: 10,
        },
        // ── Materials ───────────────────────────────────────────────────────────
        ItemTemplate {
            id: "relic_shard".into(),
            name: "Relic Shard".into(),
            category: ItemCategory::Material,
            stat_ranges: StatRanges::default(),
            effect: None,
            base_value: 8,
            max_stack: 99,
        },
        ItemTemplate {
            id: "iron_ore".into(),
            name: "Iron Ore".into(),
            category: ItemCategory::Material,
            stat_ranges: StatRanges::default(),
            effect: None,
            base_value: 5,
            max_stack: 99,
        },
        ItemTemplate {
            id: "dragon_scale".into(),
            name: "Dragon Scale".into(),
            category: ItemCategory::Material,
            stat_ranges: StatRanges::default(),
            effect: None,
            base_value: 20,
            max_stack: 99,
        },
        ItemTemplate {
            id: "herb_bundle".into(),
            name: "Herb Bundle".into(),
            category: ItemCategory::Material,
            stat_ranges: StatRanges::default(),
            effect: None,
            base_value: 4,
            max_stack: 99,
        },
    ];

    for template in templates {
        catalog.templates.insert(template.id.clone(), template);
    }
}
