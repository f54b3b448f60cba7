use restream_tracker::catalog::Catalog;
use restream_tracker::state::{ParticipantState, StatePatch, StateStore};

fn catalog() -> Catalog {
    Catalog::from_json(
        r#"{
            "tracker_type": "ssr_inventory",
            "asset_dir": "tracker/ssr",
            "dungeons": ["SV", "ET", "LMF"],
            "items": [
                {"id": "bow", "kind": "cycle", "asset_base": "bow", "level_values": [0, 1, 2]},
                {"id": "bomb", "kind": "toggle", "asset_base": "bomb"},
                {"id": "keys", "kind": "counter", "asset_base": "smallkey",
                 "counter_min": 0, "counter_max": 9, "counter_step": 1},
                {"id": "gratitude", "kind": "counter", "asset_base": "gratitudecrystal",
                 "counter_min": 0, "counter_max": 80, "counter_step": 5},
                {"id": "wallet", "kind": "wallet", "asset_base": "wallet",
                 "level_values": [1, 2, 3, 4, 5],
                 "wallet_bonus_values": [0, 300, 600, 900]},
                {"id": "tablets", "kind": "composite", "base_asset": "tablet0.png",
                 "overlays": [
                    {"key": "emerald", "asset": "tabletemerald.png"},
                    {"key": "ruby", "asset": "tabletruby.png"},
                    {"key": "amber", "asset": "tabletamber.png"}
                 ]}
            ]
        }"#,
    )
    .expect("test catalog")
}

#[test]
fn cycling_clamps_at_both_ends() {
    let catalog = catalog();
    let mut store = StateStore::new(ParticipantState::initial(&catalog));

    // Forward from the last value stays at the last value.
    store.apply(&catalog, StatePatch::CycleItem { id: "bow", delta: 1 });
    store.apply(&catalog, StatePatch::CycleItem { id: "bow", delta: 1 });
    assert_eq!(store.get().items["bow"], 2);
    let changed = store.apply(&catalog, StatePatch::CycleItem { id: "bow", delta: 1 });
    assert!(!changed);
    assert_eq!(store.get().items["bow"], 2);

    // Backward works, and clamps at the first value.
    let changed = store.apply(&catalog, StatePatch::CycleItem { id: "bow", delta: -1 });
    assert!(changed);
    assert_eq!(store.get().items["bow"], 1);
    store.apply(&catalog, StatePatch::CycleItem { id: "bow", delta: -1 });
    let changed = store.apply(&catalog, StatePatch::CycleItem { id: "bow", delta: -1 });
    assert!(!changed);
    assert_eq!(store.get().items["bow"], 0);
}

#[test]
fn toggle_items_cycle_two_levels() {
    let catalog = catalog();
    let mut store = StateStore::new(ParticipantState::initial(&catalog));

    assert!(store.apply(&catalog, StatePatch::CycleItem { id: "bomb", delta: 1 }));
    assert_eq!(store.get().items["bomb"], 1);
    assert!(!store.apply(&catalog, StatePatch::CycleItem { id: "bomb", delta: 1 }));
    assert!(store.apply(&catalog, StatePatch::CycleItem { id: "bomb", delta: -1 }));
    assert_eq!(store.get().items["bomb"], 0);
}

#[test]
fn counters_stay_within_bounds() {
    let catalog = catalog();
    let mut store = StateStore::new(ParticipantState::initial(&catalog));

    // Decrement at the minimum is a no-op.
    let changed = store.apply(&catalog, StatePatch::StepCounter { id: "keys", delta: -1 });
    assert!(!changed);
    assert_eq!(store.get().items["keys"], 0);

    for _ in 0..20 {
        store.apply(&catalog, StatePatch::StepCounter { id: "keys", delta: 1 });
    }
    assert_eq!(store.get().items["keys"], 9);
}

#[test]
fn counters_step_by_configured_increment() {
    let catalog = catalog();
    let mut store = StateStore::new(ParticipantState::initial(&catalog));

    store.apply(&catalog, StatePatch::StepCounter { id: "gratitude", delta: 1 });
    store.apply(&catalog, StatePatch::StepCounter { id: "gratitude", delta: 1 });
    assert_eq!(store.get().items["gratitude"], 10);

    for _ in 0..30 {
        store.apply(&catalog, StatePatch::StepCounter { id: "gratitude", delta: 1 });
    }
    assert_eq!(store.get().items["gratitude"], 80);
}

#[test]
fn dungeons_cycle_tri_state_only() {
    let catalog = catalog();
    let mut store = StateStore::new(ParticipantState::initial(&catalog));

    for expected in [1u8, 2, 2, 2] {
        store.apply(&catalog, StatePatch::CycleDungeon { code: "SV", delta: 1 });
        assert_eq!(store.get().dungeons["SV"], expected);
    }
    for expected in [1u8, 0, 0] {
        store.apply(&catalog, StatePatch::CycleDungeon { code: "SV", delta: -1 });
        assert_eq!(store.get().dungeons["SV"], expected);
    }
}

#[test]
fn wallet_bonus_cycles_configured_values() {
    let catalog = catalog();
    let mut store = StateStore::new(ParticipantState::initial(&catalog));

    assert!(store.apply(&catalog, StatePatch::CycleWalletBonus { delta: 1 }));
    assert_eq!(store.get().wallet_bonus, 300);
    store.apply(&catalog, StatePatch::CycleWalletBonus { delta: 1 });
    store.apply(&catalog, StatePatch::CycleWalletBonus { delta: 1 });
    assert_eq!(store.get().wallet_bonus, 900);
    assert!(!store.apply(&catalog, StatePatch::CycleWalletBonus { delta: 1 }));
    assert_eq!(store.get().wallet_bonus, 900);

    for _ in 0..5 {
        store.apply(&catalog, StatePatch::CycleWalletBonus { delta: -1 });
    }
    assert_eq!(store.get().wallet_bonus, 0);
}

#[test]
fn composite_flags_toggle_and_force() {
    let catalog = catalog();
    let mut store = StateStore::new(ParticipantState::initial(&catalog));

    assert!(store.apply(
        &catalog,
        StatePatch::ToggleComposite {
            composite_id: "tablets",
            key: "ruby",
            force: None,
        },
    ));
    assert!(store.get().tablets["ruby"]);

    // Force-clear is idempotent: clearing an already clear flag reports
    // no change.
    assert!(store.apply(
        &catalog,
        StatePatch::ToggleComposite {
            composite_id: "tablets",
            key: "ruby",
            force: Some(false),
        },
    ));
    assert!(!store.apply(
        &catalog,
        StatePatch::ToggleComposite {
            composite_id: "tablets",
            key: "ruby",
            force: Some(false),
        },
    ));
    assert!(!store.get().tablets["ruby"]);
}

#[test]
fn unknown_ids_are_no_ops() {
    let catalog = catalog();
    let mut store = StateStore::new(ParticipantState::initial(&catalog));
    let before = store.get().clone();

    assert!(!store.apply(&catalog, StatePatch::CycleItem { id: "nothing", delta: 1 }));
    assert!(!store.apply(&catalog, StatePatch::StepCounter { id: "nothing", delta: 1 }));
    assert!(!store.apply(
        &catalog,
        StatePatch::ToggleComposite {
            composite_id: "unknown",
            key: "x",
            force: None,
        },
    ));
    assert_eq!(store.get(), &before);
}

#[test]
fn initial_state_follows_catalog() {
    let catalog = catalog();
    let state = ParticipantState::initial(&catalog);

    assert_eq!(state.items["bow"], 0);
    // Wallet starts at its first level value, not zero.
    assert_eq!(state.items["wallet"], 1);
    assert_eq!(state.wallet_bonus, 0);
    for code in ["SV", "ET", "LMF"] {
        assert_eq!(state.dungeons[code], 0);
    }
    for key in ["emerald", "ruby", "amber"] {
        assert!(!state.tablets[key]);
    }
    assert_eq!(state.extra["gomode"], serde_json::Value::from(0));
}

#[test]
fn unrecognized_participant_fields_survive_roundtrip() {
    let json = r#"{
        "slot": 2,
        "label": "Team Blue",
        "team_id": 14,
        "show_final_time": true,
        "items": {"bow": 1},
        "dungeons": {"SV": 2},
        "wallet_bonus": 300,
        "tablets": {"ruby": true},
        "triforces": {}
    }"#;

    let state: ParticipantState = serde_json::from_str(json).expect("participant parses");
    assert_eq!(state.slot, 2);
    assert_eq!(state.extra["label"], serde_json::Value::from("Team Blue"));

    let mut store = StateStore::new(ParticipantState::default());
    store.replace(state);

    let out = serde_json::to_value(store.get()).expect("serializes");
    assert_eq!(out["team_id"], serde_json::Value::from(14));
    assert_eq!(out["show_final_time"], serde_json::Value::from(true));
    assert_eq!(out["label"], serde_json::Value::from("Team Blue"));
}
