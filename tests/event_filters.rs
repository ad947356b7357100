use goshawk_plugin::{
    Core, EntityKind, EntityPayload, EventKind, GlobalEvent, Reference, ScriptHook, ScriptRuntime,
};
use rhai::{Dynamic, FnPtr};

fn activate(core: &mut Core, kind: EntityKind, id: i64) {
    assert!(core.activate(kind, id, false, EntityPayload::None));
}

fn hook(name: &str) -> ScriptHook {
    ScriptHook::new(FnPtr::new(name).expect("valid function name"))
}

#[test]
fn include_exclude_round_trip() {
    let mut core = Core::with_defaults();
    let rt = ScriptRuntime::new();
    activate(&mut core, EntityKind::Player, 1);
    let player = Reference::new(&mut core, EntityKind::Player, 1);

    let event = GlobalEvent::new(&mut core, EventKind::PlayerChat, false);
    assert_eq!(event.filter_count(EntityKind::Player), 0);

    assert!(event.include(&mut core, &rt, &player, 0));
    assert!(event.enabled(&player));
    assert_eq!(event.filter_count(EntityKind::Player), 1);

    assert!(event.exclude(&mut core, &rt, &player, 0));
    assert!(!event.enabled(&player));
    assert_eq!(event.filter_count(EntityKind::Player), 0);
}

#[test]
fn double_include_is_a_no_op() {
    let mut core = Core::with_defaults();
    let rt = ScriptRuntime::new();
    activate(&mut core, EntityKind::Player, 1);
    let player = Reference::new(&mut core, EntityKind::Player, 1);

    let event = GlobalEvent::new(&mut core, EventKind::PlayerChat, false);
    assert!(event.include(&mut core, &rt, &player, 0));
    assert!(!event.include(&mut core, &rt, &player, 0));
    assert_eq!(event.filter_count(EntityKind::Player), 1);
}

#[test]
fn filters_reject_invalid_and_incompatible_entities() {
    let mut core = Core::with_defaults();
    let rt = ScriptRuntime::new();
    activate(&mut core, EntityKind::Vehicle, 0);

    let event = GlobalEvent::new(&mut core, EventKind::PlayerChat, false);

    let ghost = Reference::unbound(EntityKind::Player);
    assert!(!event.include(&mut core, &rt, &ghost, 0));

    // vehicles never participate in chat events
    let vehicle = Reference::new(&mut core, EntityKind::Vehicle, 0);
    assert!(!event.include(&mut core, &rt, &vehicle, 0));
    assert_eq!(event.filter_count(EntityKind::Vehicle), 0);
}

#[test]
fn incidental_kinds_are_filterable() {
    let mut core = Core::with_defaults();
    let rt = ScriptRuntime::new();
    activate(&mut core, EntityKind::Player, 0);
    let player = Reference::new(&mut core, EntityKind::Player, 0);

    // players are the incidental side of checkpoint-entered events
    let event = GlobalEvent::new(&mut core, EventKind::CheckpointEntered, false);
    assert!(event.include(&mut core, &rt, &player, 0));
    assert!(event.enabled(&player));
}

#[test]
fn destroying_a_filtered_entity_heals_the_filter() {
    let mut core = Core::with_defaults();
    let rt = ScriptRuntime::new();
    activate(&mut core, EntityKind::Player, 2);
    activate(&mut core, EntityKind::Player, 3);
    let second = Reference::new(&mut core, EntityKind::Player, 3);

    let event = GlobalEvent::new(&mut core, EventKind::PlayerChat, false);
    {
        let doomed = Reference::new(&mut core, EntityKind::Player, 2);
        assert!(event.include(&mut core, &rt, &doomed, 0));
    }
    assert!(event.include(&mut core, &rt, &second, 0));
    assert_eq!(event.filter_count(EntityKind::Player), 2);

    // deactivation alone must be enough; no exclude call anywhere
    assert!(core.deactivate(&rt, EntityKind::Player, 2, 0, Dynamic::UNIT));
    assert_eq!(event.filter_count(EntityKind::Player), 1);
    assert!(event.enabled(&second));
}

#[test]
fn flip_never_includes_inactive_slots() {
    let mut config = goshawk_plugin::PluginConfig::default();
    config.pools.players = 8;
    let mut core = Core::new(&config).expect("build core");
    let rt = ScriptRuntime::new();
    for id in 0..8 {
        activate(&mut core, EntityKind::Player, id);
    }
    let two = Reference::new(&mut core, EntityKind::Player, 2);
    let five = Reference::new(&mut core, EntityKind::Player, 5);

    let event = GlobalEvent::new(&mut core, EventKind::PlayerChat, false);
    assert!(event.include(&mut core, &rt, &two, 0));
    assert!(event.include(&mut core, &rt, &five, 0));

    // slot five dies; its bit self-heals away before the flip
    assert!(core.deactivate(&rt, EntityKind::Player, 5, 0, Dynamic::UNIT));
    event.flip_filter(&mut core, EntityKind::Player, 0);

    assert_eq!(event.filter_count(EntityKind::Player), 6);
    assert!(!event.enabled(&two));
    for id in [0_i64, 1, 3, 4, 6, 7] {
        let probe = Reference::new(&mut core, EntityKind::Player, id);
        assert!(event.enabled(&probe), "slot {id} should be included after the flip");
    }
}

#[test]
fn clear_resets_every_bit_and_survives_repeats() {
    let mut core = Core::with_defaults();
    let rt = ScriptRuntime::new();
    for id in 0..4 {
        activate(&mut core, EntityKind::Player, id);
    }
    let event = GlobalEvent::new(&mut core, EventKind::PlayerChat, false);
    for id in 0..4 {
        let player = Reference::new(&mut core, EntityKind::Player, id);
        assert!(event.include(&mut core, &rt, &player, 0));
    }
    assert!(event.filter_any(EntityKind::Player));

    event.clear_filter(&mut core, &rt, EntityKind::Player, 0);
    assert!(event.filter_none(EntityKind::Player));
    // clearing an empty filter is a quiet no-op
    event.clear_filter(&mut core, &rt, EntityKind::Player, 0);
    assert!(event.filter_none(EntityKind::Player));
}

#[test]
fn inclusion_hook_gates_the_filter() {
    let mut core = Core::with_defaults();
    let rt = ScriptRuntime::compile(
        r#"
        fn veto(ent, header) { false }
        fn admit(ent, header) { true }
        "#,
    )
    .expect("compile hooks");
    activate(&mut core, EntityKind::Player, 0);
    let player = Reference::new(&mut core, EntityKind::Player, 0);

    let event = GlobalEvent::new(&mut core, EventKind::PlayerChat, false);

    event.set_on_include(Some(hook("veto")));
    assert!(!event.include(&mut core, &rt, &player, 0));
    assert_eq!(event.filter_count(EntityKind::Player), 0);

    event.set_on_include(Some(hook("admit")));
    assert!(event.include(&mut core, &rt, &player, 0));
    assert_eq!(event.filter_count(EntityKind::Player), 1);
}

#[test]
fn exclusion_hook_can_refuse_removal() {
    let mut core = Core::with_defaults();
    let rt = ScriptRuntime::compile("fn veto(ent, header) { false }").expect("compile hook");
    activate(&mut core, EntityKind::Player, 0);
    let player = Reference::new(&mut core, EntityKind::Player, 0);

    let event = GlobalEvent::new(&mut core, EventKind::PlayerChat, false);
    assert!(event.include(&mut core, &rt, &player, 0));

    event.set_on_exclude(Some(hook("veto")));
    assert!(!event.exclude(&mut core, &rt, &player, 0));
    assert!(event.enabled(&player));
}

#[test]
fn faulting_inclusion_hook_counts_as_a_veto() {
    let mut core = Core::with_defaults();
    let rt = ScriptRuntime::compile("fn broken(ent, header) { no_such_function() }")
        .expect("compile hook");
    activate(&mut core, EntityKind::Player, 0);
    let player = Reference::new(&mut core, EntityKind::Player, 0);

    let event = GlobalEvent::new(&mut core, EventKind::PlayerChat, false);
    event.set_on_include(Some(hook("broken")));
    assert!(!event.include(&mut core, &rt, &player, 0));
    assert_eq!(event.filter_count(EntityKind::Player), 0);
}

#[test]
fn destroy_typed_events_drop_their_subject_bit_after_dispatch() {
    let mut core = Core::with_defaults();
    let rt = ScriptRuntime::new();
    activate(&mut core, EntityKind::Player, 1);
    let player = Reference::new(&mut core, EntityKind::Player, 1);

    // the event watches the very destroy notification of its filtered kind
    let event = GlobalEvent::new(&mut core, EventKind::PlayerDestroyed, false);
    assert!(event.include(&mut core, &rt, &player, 0));

    assert!(core.entity_destroyed(&rt, EntityKind::Player, 1, 0, Dynamic::UNIT));
    assert_eq!(event.filter_count(EntityKind::Player), 0);
}

#[test]
fn vm_close_releases_hooks_and_filters() {
    let mut core = Core::with_defaults();
    let rt = ScriptRuntime::compile("fn noop(a, b, c) { }").expect("compile hook");
    activate(&mut core, EntityKind::Player, 0);
    let player = Reference::new(&mut core, EntityKind::Player, 0);

    let event = GlobalEvent::new(&mut core, EventKind::PlayerChat, false);
    event.set_on_trigger(Some(hook("noop")));
    assert!(event.include(&mut core, &rt, &player, 0));

    core.vm_close();
    assert!(event.on_trigger().is_none());
    assert!(event.filter_none(EntityKind::Player));
    assert!(event.suspended());
}
