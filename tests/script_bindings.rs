use std::cell::RefCell;
use std::rc::Rc;

use goshawk_plugin::bindings::{register_api, PluginApi};
use goshawk_plugin::{
    Core, EntityKind, EntityPayload, EventArgs, EventKind, GlobalEvent, ScriptHook, ScriptRuntime,
};
use rhai::{Dynamic, FnPtr, INT};

fn hook(name: &str) -> ScriptHook {
    ScriptHook::new(FnPtr::new(name).expect("valid function name"))
}

#[test]
fn scripts_create_entities_and_read_their_properties() {
    let mut core = Core::with_defaults();
    let mut rt = ScriptRuntime::new();
    let api = PluginApi::new(&mut core, &rt);
    register_api(rt.engine_mut(), api);
    rt.load(
        r#"
        fn probe() {
            let v = create_vehicle(411, 1, 0.0, 1.0, 2.0, 90.0);
            v.persistent = true;
            v.gtag = "taxi";
            v.ltag = "mine";
            [v.id, v.active, v.gtag, v.ltag, v.refs, v.prefs, v.max]
        }
        "#,
    )
    .expect("compile script");

    let result = rt.call(&hook("probe"), Vec::new()).expect("script runs");
    let values = result.into_array().expect("array result");
    assert_eq!(values[0].as_int().unwrap(), 0);
    assert!(values[1].as_bool().unwrap());
    assert_eq!(values[2].clone().into_string().unwrap(), "taxi");
    assert_eq!(values[3].clone().into_string().unwrap(), "mine");
    assert_eq!(values[4].as_int().unwrap(), 1);
    assert_eq!(values[5].as_int().unwrap(), 1);
    assert_eq!(values[6].as_int().unwrap() as usize, core.pool(EntityKind::Vehicle).capacity());
    assert!(core.verify(EntityKind::Vehicle, 0));
}

#[test]
fn invalid_creation_arguments_raise_catchable_script_errors() {
    let mut core = Core::with_defaults();
    let mut rt = ScriptRuntime::new();
    let api = PluginApi::new(&mut core, &rt);
    register_api(rt.engine_mut(), api);
    rt.load(
        r#"
        fn attempt() {
            try {
                create_vehicle(0, 1, 0.0, 0.0, 0.0, 0.0);
                false
            } catch (err) {
                true
            }
        }
        "#,
    )
    .expect("compile script");

    let caught = rt.call(&hook("attempt"), Vec::new()).expect("script runs");
    assert!(caught.as_bool().unwrap());
    assert_eq!(core.pool(EntityKind::Vehicle).active_count(), 0);
}

#[test]
fn scripts_wire_global_events_with_filters_and_hooks() {
    let mut core = Core::with_defaults();
    let mut rt = ScriptRuntime::new();
    let api = PluginApi::new(&mut core, &rt);
    let log = Rc::new(RefCell::new(Vec::new()));
    let sink = log.clone();
    register_api(rt.engine_mut(), api);
    rt.engine_mut().register_fn("record", move |value: INT| sink.borrow_mut().push(value));
    rt.load(
        r#"
        fn on_chat(player, message) { record(player); }

        fn wire(target) {
            let ev = GameEvent("player_chat");
            ev.on_trigger(Fn("on_chat"));
            ev.stride = 1;
            let filter = ev.player_filter();
            filter.include(target);
            ev
        }
        "#,
    )
    .expect("compile script");

    assert!(core.activate(EntityKind::Player, 0, false, EntityPayload::None));
    assert!(core.activate(EntityKind::Player, 1, false, EntityPayload::None));
    let target = goshawk_plugin::Reference::new(&mut core, EntityKind::Player, 1);

    let wired = rt
        .call(&hook("wire"), vec![Dynamic::from(target.clone())])
        .expect("script runs");
    let event = wired.try_cast::<GlobalEvent>().expect("event handle");
    assert_eq!(event.event_type(), EventKind::PlayerChat);
    assert_eq!(event.filter_count(EntityKind::Player), 1);

    core.raise(&rt, EventKind::PlayerChat, EventArgs::PlayerText {
        player: 0,
        text: "ignored".to_string(),
    });
    core.raise(&rt, EventKind::PlayerChat, EventArgs::PlayerText {
        player: 1,
        text: "heard".to_string(),
    });
    assert_eq!(*log.borrow(), vec![1]);
}
