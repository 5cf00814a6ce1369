use crate::shared::*;

/// Populate the EncounterBank with every narrative event template.
///
/// Weights here are pre-skew values; the generator multiplies them by the
/// per-task-kind severity table, so a Critical template can carry a large
/// weight and still never fire during a Rest session.
pub fn populate_encounters(bank: &mut EncounterBank) {
    bank.templates = vec![
        // ── Fortune ─────────────────────────────────────────────────────────────
        EventTemplate {
            id: "coin_pouch".into(),
            severity: EventSeverity::Info,
            category: EventCategory::Fortune,
            messages: vec![
                "You stumble over a dropped pouch holding {gold} gold.".into(),
                "A glint in the dirt turns out to be {gold} gold.".into(),
            ],
            effects: EventEffects {
                gold: Some(EffectRange::new(5, 20)),
                ..Default::default()
            },
            applicable_tasks: Vec::new(),
            conditions: None,
            weight: 12,
            repeatable: true,
        },
        EventTemplate {
            id: "merchant_gratitude".into(),
            severity: EventSeverity::Info,
            category: EventCategory::Fortune,
            messages: vec![
                "A grateful merchant presses {gold} gold into your hand.".into(),
            ],
            effects: EventEffects {
                gold: Some(EffectRange::new(15, 40)),
                ..Default::default()
            },
            applicable_tasks: vec![TaskKind::Expedition, TaskKind::Scavenge],
            conditions: None,
            weight: 6,
            repeatable: false,
        },
        // ── Discovery ───────────────────────────────────────────────────────────
        EventTemplate {
            id: "hidden_cache".into(),
            severity: EventSeverity::Info,
            category: EventCategory::Discovery,
            messages: vec![
                "You uncover a hidden cache. (+{xp} xp)".into(),
                "An old map fragment points the way. (+{xp} xp)".into(),
            ],
            effects: EventEffects {
                xp: Some(EffectRange::new(8, 20)),
                ..Default::default()
            },
            applicable_tasks: Vec::new(),
            conditions: None,
            weight: 10,
            repeatable: true,
        },
        EventTemplate {
            id: "ancient_inscription".into(),
            severity: EventSeverity::Info,
            category: EventCategory::Discovery,
            messages: vec![
                "You decipher an ancient inscription. (+{xp} xp)".into(),
            ],
            effects: EventEffects {
                xp: Some(EffectRange::new(15, 30)),
                success_modifier: Some(EffectRange::new(3, 8)),
                ..Default::default()
            },
            applicable_tasks: vec![TaskKind::Expedition],
            conditions: Some(EventConditions {
                min_level: Some(3),
                ..Default::default()
            }),
            weight: 6,
            repeatable: false,
        },
        // ── Combat ──────────────────────────────────────────────────────────────
        EventTemplate {
            id: "bandit_ambush".into(),
            severity: EventSeverity::Warning,
            category: EventCategory::Combat,
            messages: vec![
                "Bandits ambush you! You take {damage} damage.".into(),
                "A skirmish on the road costs you {damage} health.".into(),
            ],
            effects: EventEffects {
                damage: Some(EffectRange::new(5, 15)),
                ..Default::default()
            },
            applicable_tasks: vec![TaskKind::Expedition, TaskKind::Raid, TaskKind::Scavenge],
            conditions: None,
            weight: 10,
            repeatable: true,
        },
        EventTemplate {
            id: "guardian_beast".into(),
            severity: EventSeverity::Critical,
            category: EventCategory::Combat,
            messages: vec![
                "A guardian beast mauls you for {damage} damage!".into(),
            ],
            effects: EventEffects {
                damage: Some(EffectRange::new(15, 30)),
                success_modifier: Some(EffectRange::new(-10, -5)),
                ..Default::default()
            },
            applicable_tasks: vec![TaskKind::Raid],
            conditions: None,
            weight: 8,
            repeatable: true,
        },
        EventTemplate {
            id: "clean_parry".into(),
            severity: EventSeverity::Info,
            category: EventCategory::Combat,
            messages: vec![
                "You parry cleanly and press the advantage.".into(),
            ],
            effects: EventEffects {
                success_modifier: Some(EffectRange::new(5, 10)),
                ..Default::default()
            },
            applicable_tasks: vec![TaskKind::Raid, TaskKind::Training],
            conditions: Some(EventConditions {
                requires_equipped: Some(EquipSlot::Weapon),
                ..Default::default()
            }),
            weight: 8,
            repeatable: true,
        },
        // ── Hazard ──────────────────────────────────────────────────────────────
        EventTemplate {
            id: "collapsing_floor".into(),
            severity: EventSeverity::Warning,
            category: EventCategory::Hazard,
            messages: vec![
                "The floor gives way beneath you. {damage} damage.".into(),
            ],
            effects: EventEffects {
                damage: Some(EffectRange::new(8, 18)),
                ..Default::default()
            },
            applicable_tasks: vec![TaskKind::Expedition, TaskKind::Scavenge],
            conditions: None,
            weight: 8,
            repeatable: true,
        },
        EventTemplate {
            id: "sudden_storm".into(),
            severity: EventSeverity::Warning,
            category: EventCategory::Hazard,
            messages: vec![
                "A sudden storm slows your progress.".into(),
            ],
            effects: EventEffects {
                success_modifier: Some(EffectRange::new(-8, -3)),
                ..Default::default()
            },
            applicable_tasks: Vec::new(),
            conditions: None,
            weight: 8,
            repeatable: true,
        },
        // ── Mishap ──────────────────────────────────────────────────────────────
        EventTemplate {
            id: "torn_satchel".into(),
            severity: EventSeverity::Warning,
            category: EventCategory::Mishap,
            messages: vec![
                "Your satchel tears and {gold} gold spills into a ravine.".into(),
            ],
            effects: EventEffects {
                gold: Some(EffectRange::new(-15, -5)),
                ..Default::default()
            },
            applicable_tasks: Vec::new(),
            conditions: Some(EventConditions {
                min_gold: Some(20),
                ..Default::default()
            }),
            weight: 7,
            repeatable: true,
        },
        EventTemplate {
            id: "old_wound_aches".into(),
            severity: EventSeverity::Warning,
            category: EventCategory::Mishap,
            messages: vec![
                "Your injury flares up at the worst moment.".into(),
            ],
            effects: EventEffects {
                success_modifier: Some(EffectRange::new(-10, -5)),
                ..Default::default()
            },
            applicable_tasks: Vec::new(),
            conditions: Some(EventConditions {
                requires_injured: Some(true),
                ..Default::default()
            }),
            weight: 10,
            repeatable: true,
        },
        // ── Flavor & recovery ───────────────────────────────────────────────────
        EventTemplate {
            id: "warm_campfire".into(),
            severity: EventSeverity::Flavor,
            category: EventCategory::Fortune,
            messages: vec![
                "You rest by a warm campfire and recover {heal} health.".into(),
            ],
            effects: EventEffects {
                heal: Some(EffectRange::new(5, 12)),
                ..Default::default()
            },
            applicable_tasks: Vec::new(),
            conditions: Some(EventConditions {
                max_health_percent: Some(90),
                ..Default::default()
            }),
            weight: 8,
            repeatable: true,
        },
        EventTemplate {
            id: "birdsong".into(),
            severity: EventSeverity::Flavor,
            category: EventCategory::Discovery,
            messages: vec![
                "Birdsong carries on the wind. Nothing comes of it.".into(),
                "The road is quiet. You keep a steady pace.".into(),
            ],
            effects: EventEffects::default(),
            applicable_tasks: Vec::new(),
            conditions: None,
            weight: 10,
            repeatable: true,
        },
        EventTemplate {
            id: "second_wind".into(),
            severity: EventSeverity::Flavor,
            category: EventCategory::Fortune,
            messages: vec![
                "You catch a second wind and recover {heal} health.".into(),
            ],
            effects: EventEffects {
                heal: Some(EffectRange::new(8, 15)),
                ..Default::default()
            },
            applicable_tasks: vec![TaskKind::Rest, TaskKind::Training],
            conditions: Some(EventConditions {
                max_health_percent: Some(70),
                ..Default::default()
            }),
            weight: 12,
            repeatable: true,
        },
    ];
}
