use goshawk_plugin::config::{PluginConfig, POOL_HARD_LIMIT};
use goshawk_plugin::{Core, EntityKind, EntityPayload, Reference, ScriptRuntime};
use rhai::Dynamic;

fn activate(core: &mut Core, kind: EntityKind, id: i64) -> bool {
    core.activate(kind, id, false, EntityPayload::None)
}

#[test]
fn verify_tracks_activation_state() {
    let mut core = Core::with_defaults();
    let rt = ScriptRuntime::new();

    assert!(!core.verify(EntityKind::Vehicle, 4));
    assert!(activate(&mut core, EntityKind::Vehicle, 4));
    assert!(core.verify(EntityKind::Vehicle, 4));
    assert!(core.deactivate(&rt, EntityKind::Vehicle, 4, 0, Dynamic::UNIT));
    assert!(!core.verify(EntityKind::Vehicle, 4));
}

#[test]
fn activation_is_not_idempotent() {
    let mut core = Core::with_defaults();

    assert!(activate(&mut core, EntityKind::Player, 0));
    assert!(!activate(&mut core, EntityKind::Player, 0));
}

#[test]
fn deactivating_an_inactive_slot_fails() {
    let mut core = Core::with_defaults();
    let rt = ScriptRuntime::new();

    assert!(!core.deactivate(&rt, EntityKind::Player, 7, 0, Dynamic::UNIT));
}

#[test]
fn out_of_range_ids_are_rejected() {
    let mut core = Core::with_defaults();

    let limit = core.pool(EntityKind::Player).capacity() as i64;
    assert!(!activate(&mut core, EntityKind::Player, limit));
    assert!(!activate(&mut core, EntityKind::Player, -1));
    assert!(!core.verify(EntityKind::Player, limit));
}

#[test]
fn reactivation_preserves_script_set_tag() {
    let mut core = Core::with_defaults();
    let rt = ScriptRuntime::new();

    assert!(activate(&mut core, EntityKind::Vehicle, 2));
    let vehicle = Reference::new(&mut core, EntityKind::Vehicle, 2);
    vehicle.set_global_tag(&mut core, "taxi");

    assert!(core.deactivate(&rt, EntityKind::Vehicle, 2, 0, Dynamic::UNIT));
    assert!(activate(&mut core, EntityKind::Vehicle, 2));
    let vehicle = Reference::new(&mut core, EntityKind::Vehicle, 2);
    assert_eq!(vehicle.global_tag(&core), "taxi");
}

#[test]
fn explicit_fresh_mark_clears_tag_on_next_activation() {
    let mut core = Core::with_defaults();
    let rt = ScriptRuntime::new();

    assert!(activate(&mut core, EntityKind::Vehicle, 2));
    let vehicle = Reference::new(&mut core, EntityKind::Vehicle, 2);
    vehicle.set_global_tag(&mut core, "taxi");

    assert!(core.deactivate(&rt, EntityKind::Vehicle, 2, 0, Dynamic::UNIT));
    core.pool_mut(EntityKind::Vehicle).set_fresh(2);
    assert!(activate(&mut core, EntityKind::Vehicle, 2));
    let vehicle = Reference::new(&mut core, EntityKind::Vehicle, 2);
    assert_eq!(vehicle.global_tag(&core), "");
}

#[test]
fn creation_picks_the_first_free_slot() {
    let mut core = Core::with_defaults();
    let rt = ScriptRuntime::new();

    let first = core
        .create_vehicle(&rt, 400, 1, glam::Vec3::ZERO, 0.0, -1, -1, 0, Dynamic::UNIT)
        .expect("create first vehicle");
    let second = core
        .create_vehicle(&rt, 411, 1, glam::Vec3::ZERO, 0.0, -1, -1, 0, Dynamic::UNIT)
        .expect("create second vehicle");
    assert_eq!(first.id(), 0);
    assert_eq!(second.id(), 1);

    assert!(core.deactivate(&rt, EntityKind::Vehicle, 0, 0, Dynamic::UNIT));
    let reused = core
        .create_vehicle(&rt, 451, 1, glam::Vec3::ZERO, 0.0, -1, -1, 0, Dynamic::UNIT)
        .expect("reuse freed slot");
    assert_eq!(reused.id(), 0);
}

#[test]
fn creation_rejects_invalid_arguments() {
    let mut core = Core::with_defaults();
    let rt = ScriptRuntime::new();

    assert!(core.create_vehicle(&rt, 0, 1, glam::Vec3::ZERO, 0.0, -1, -1, 0, Dynamic::UNIT).is_err());
    assert!(core.create_sphere(&rt, 1, glam::Vec3::ZERO, Default::default(), 0.0, 0, Dynamic::UNIT).is_err());
    assert!(core.create_sprite(&rt, "", 0, Dynamic::UNIT).is_err());
    assert!(core.create_textdraw(&rt, "", 0, Dynamic::UNIT).is_err());
}

#[test]
fn creation_stores_the_payload_and_marks_ownership() {
    let mut core = Core::with_defaults();
    let rt = ScriptRuntime::new();

    let blip = core
        .create_blip(
            &rt,
            1,
            glam::Vec3::new(4.0, 5.0, 6.0),
            2,
            goshawk_plugin::Color::from_rgba(0xff0000ff),
            7,
            0,
            Dynamic::UNIT,
        )
        .expect("create blip");
    assert!(core.pool(EntityKind::Blip).owned(blip.id()));
    match core.pool(EntityKind::Blip).payload(blip.id()) {
        Some(EntityPayload::Blip { world, scale, sprite, .. }) => {
            assert_eq!((*world, *scale, *sprite), (1, 2, 7));
        }
        other => panic!("unexpected payload {other:?}"),
    }

    // server-notified entities are not owned
    assert!(activate(&mut core, EntityKind::Object, 0));
    assert!(!core.pool(EntityKind::Object).owned(0));
}

#[test]
fn invalid_pool_capacity_fails_construction() {
    let mut config = PluginConfig::default();
    config.pools.players = 0;
    assert!(Core::new(&config).is_err());

    let mut config = PluginConfig::default();
    config.pools.vehicles = POOL_HARD_LIMIT + 1;
    assert!(Core::new(&config).is_err());
}

#[test]
fn option_store_round_trip() {
    let mut core = Core::with_defaults();

    assert!(core.option("gamemode").is_none());
    core.set_option("gamemode", "race");
    assert_eq!(core.option("gamemode"), Some("race"));
    core.set_option("gamemode", "deathmatch");
    assert_eq!(core.option("gamemode"), Some("deathmatch"));
}
