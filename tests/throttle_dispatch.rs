use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use goshawk_plugin::{
    Core, EntityKind, EntityPayload, EventArgs, EventKind, GlobalEvent, Reference, ScriptHook,
    ScriptRuntime,
};
use rhai::{FnPtr, INT};

fn activate(core: &mut Core, kind: EntityKind, id: i64) {
    assert!(core.activate(kind, id, false, EntityPayload::None));
}

fn hook(name: &str) -> ScriptHook {
    ScriptHook::new(FnPtr::new(name).expect("valid function name"))
}

/// A runtime whose scripts can push into a Rust-side log through `record`.
fn recording_runtime(source: &str) -> (ScriptRuntime, Rc<RefCell<Vec<i64>>>) {
    let mut rt = ScriptRuntime::new();
    let log = Rc::new(RefCell::new(Vec::new()));
    let sink = log.clone();
    rt.engine_mut().register_fn("record", move |value: INT| sink.borrow_mut().push(value));
    rt.load(source).expect("compile test script");
    (rt, log)
}

fn chat(player: i32) -> EventArgs {
    EventArgs::PlayerText { player, text: "hello".to_string() }
}

#[test]
fn plain_event_forwards_every_raise() {
    let mut core = Core::with_defaults();
    let (rt, log) = recording_runtime("fn on_chat(player, message) { record(player); }");
    activate(&mut core, EntityKind::Player, 0);

    let event = GlobalEvent::new(&mut core, EventKind::PlayerChat, false);
    event.set_on_trigger(Some(hook("on_chat")));

    for _ in 0..3 {
        core.raise(&rt, EventKind::PlayerChat, chat(0));
    }
    assert_eq!(log.borrow().len(), 3);
}

#[test]
fn stride_fires_on_every_nth_raise() {
    let mut core = Core::with_defaults();
    let (rt, log) = recording_runtime("fn on_chat(player, message) { record(player); }");
    activate(&mut core, EntityKind::Player, 0);

    let event = GlobalEvent::new(&mut core, EventKind::PlayerChat, false);
    event.set_on_trigger(Some(hook("on_chat")));
    event.set_stride(3);

    let mut fired = Vec::new();
    for raise in 1..=9 {
        let before = log.borrow().len();
        core.raise(&rt, EventKind::PlayerChat, chat(0));
        if log.borrow().len() > before {
            fired.push(raise);
        }
    }
    assert_eq!(fired, vec![3, 6, 9]);
}

#[test]
fn ignore_suppresses_the_next_raises_then_stride_resumes() {
    let mut core = Core::with_defaults();
    let (rt, log) = recording_runtime("fn on_chat(player, message) { record(player); }");
    activate(&mut core, EntityKind::Player, 0);

    let event = GlobalEvent::new(&mut core, EventKind::PlayerChat, false);
    event.set_on_trigger(Some(hook("on_chat")));
    event.set_stride(3);

    for _ in 0..3 {
        core.raise(&rt, EventKind::PlayerChat, chat(0));
    }
    assert_eq!(log.borrow().len(), 1);

    event.set_ignore(2);
    let mut fired = Vec::new();
    for raise in 4..=6 {
        let before = log.borrow().len();
        core.raise(&rt, EventKind::PlayerChat, chat(0));
        if log.borrow().len() > before {
            fired.push(raise);
        }
    }
    assert_eq!(fired, vec![6]);
    assert_eq!(event.ignore(), 0);
}

#[test]
fn idle_enforces_a_minimum_gap_between_fires() {
    let mut core = Core::with_defaults();
    let (rt, log) = recording_runtime("fn on_chat(player, message) { record(player); }");
    activate(&mut core, EntityKind::Player, 0);

    let event = GlobalEvent::new(&mut core, EventKind::PlayerChat, false);
    event.set_on_trigger(Some(hook("on_chat")));
    event.set_idle(100);

    core.raise(&rt, EventKind::PlayerChat, chat(0));
    core.raise(&rt, EventKind::PlayerChat, chat(0));
    assert_eq!(log.borrow().len(), 1);
    assert!(event.is_idle());

    std::thread::sleep(Duration::from_millis(120));
    core.raise(&rt, EventKind::PlayerChat, chat(0));
    assert_eq!(log.borrow().len(), 2);
}

#[test]
fn a_faulting_listener_does_not_starve_other_events() {
    let mut core = Core::with_defaults();
    let (rt, log) = recording_runtime(
        r#"
        fn broken(player, message) { no_such_function(); }
        fn working(player, message) { record(player); }
        "#,
    );
    activate(&mut core, EntityKind::Player, 4);

    let faulty = GlobalEvent::new(&mut core, EventKind::PlayerChat, false);
    faulty.set_on_trigger(Some(hook("broken")));
    let healthy = GlobalEvent::new(&mut core, EventKind::PlayerChat, false);
    healthy.set_on_trigger(Some(hook("working")));

    core.raise(&rt, EventKind::PlayerChat, chat(4));
    assert_eq!(*log.borrow(), vec![4]);
}

#[test]
fn a_populated_filter_restricts_forwarding() {
    let mut core = Core::with_defaults();
    let (rt, log) = recording_runtime("fn on_chat(player, message) { record(player); }");
    activate(&mut core, EntityKind::Player, 0);
    activate(&mut core, EntityKind::Player, 1);
    let wanted = Reference::new(&mut core, EntityKind::Player, 1);

    let event = GlobalEvent::new(&mut core, EventKind::PlayerChat, false);
    event.set_on_trigger(Some(hook("on_chat")));

    core.raise(&rt, EventKind::PlayerChat, chat(0));
    assert_eq!(*log.borrow(), vec![0]);

    assert!(event.include(&mut core, &rt, &wanted, 0));
    core.raise(&rt, EventKind::PlayerChat, chat(0));
    core.raise(&rt, EventKind::PlayerChat, chat(1));
    assert_eq!(*log.borrow(), vec![0, 1]);
}

#[test]
fn confined_events_filter_the_incidental_entity_too() {
    let mut core = Core::with_defaults();
    let (rt, log) = recording_runtime("fn on_enter(player, checkpoint) { record(player); }");
    activate(&mut core, EntityKind::Player, 0);
    activate(&mut core, EntityKind::Player, 1);
    activate(&mut core, EntityKind::Checkpoint, 6);
    let wanted = Reference::new(&mut core, EntityKind::Player, 1);

    let event = GlobalEvent::new(&mut core, EventKind::CheckpointEntered, false);
    event.set_on_trigger(Some(hook("on_enter")));
    assert!(event.include(&mut core, &rt, &wanted, 0));

    // unconfined: the player filter is ignored for the incidental entity
    core.raise(&rt, EventKind::CheckpointEntered, EventArgs::PlayerCheckpoint {
        player: 0,
        checkpoint: 6,
    });
    assert_eq!(*log.borrow(), vec![0]);

    event.set_confined(true);
    core.raise(&rt, EventKind::CheckpointEntered, EventArgs::PlayerCheckpoint {
        player: 0,
        checkpoint: 6,
    });
    core.raise(&rt, EventKind::CheckpointEntered, EventArgs::PlayerCheckpoint {
        player: 1,
        checkpoint: 6,
    });
    assert_eq!(*log.borrow(), vec![0, 1]);
}

#[test]
fn suspension_gates_dispatch() {
    let mut core = Core::with_defaults();
    let (rt, log) = recording_runtime("fn on_chat(player, message) { record(player); }");
    activate(&mut core, EntityKind::Player, 0);

    let event = GlobalEvent::new(&mut core, EventKind::PlayerChat, true);
    event.set_on_trigger(Some(hook("on_chat")));
    core.raise(&rt, EventKind::PlayerChat, chat(0));
    assert!(log.borrow().is_empty());

    event.set_suspended(&mut core, false);
    core.raise(&rt, EventKind::PlayerChat, chat(0));
    assert_eq!(log.borrow().len(), 1);
}

#[test]
fn adapting_re_targets_the_event_and_clears_filters() {
    let mut core = Core::with_defaults();
    let (rt, log) = recording_runtime("fn on_any(a) { record(a); }");
    activate(&mut core, EntityKind::Player, 0);
    activate(&mut core, EntityKind::Vehicle, 5);
    let player = Reference::new(&mut core, EntityKind::Player, 0);

    let event = GlobalEvent::new(&mut core, EventKind::PlayerSpawn, false);
    event.set_on_trigger(Some(hook("on_any")));
    assert!(event.include(&mut core, &rt, &player, 0));

    event.adapt(&mut core, EventKind::VehicleRespawn);
    assert_eq!(event.event_type(), EventKind::VehicleRespawn);
    assert!(event.filter_none(EntityKind::Player));

    core.raise(&rt, EventKind::PlayerSpawn, EventArgs::Player { player: 0 });
    assert!(log.borrow().is_empty());
    core.raise(&rt, EventKind::VehicleRespawn, EventArgs::Vehicle { vehicle: 5 });
    assert_eq!(*log.borrow(), vec![5]);
}

#[test]
fn entity_custom_reaches_global_listeners() {
    let mut core = Core::with_defaults();
    let (rt, log) = recording_runtime("fn on_custom(id, header, payload) { record(id); }");
    activate(&mut core, EntityKind::Pickup, 3);

    let event = GlobalEvent::new(&mut core, EventKind::PickupCustom, false);
    event.set_on_trigger(Some(hook("on_custom")));

    assert!(core.entity_custom(&rt, EntityKind::Pickup, 3, 7, rhai::Dynamic::UNIT));
    assert_eq!(*log.borrow(), vec![3]);
}
