use glam::Vec3;
use log::{error, info, warn};
use rhai::{Dynamic, Engine, EvalAltResult, FnPtr, FLOAT, INT};

use crate::core::Core;
use crate::entity::{Color, EntityKind, KindMask};
use crate::events::EventKind;
use crate::global::GlobalEvent;
use crate::reference::Reference;
use crate::scripts::{ScriptHook, ScriptRuntime};

/// Raw access handles captured by the registered closures. The script engine
/// only ever runs from the host callback thread, which also owns the core;
/// the pointers are valid for as long as the engine is.
#[derive(Clone, Copy)]
pub struct PluginApi {
    core: *mut Core,
    rt: *const ScriptRuntime,
}

unsafe impl Send for PluginApi {}
unsafe impl Sync for PluginApi {}

impl PluginApi {
    pub fn new(core: &mut Core, rt: &ScriptRuntime) -> PluginApi {
        PluginApi { core: core as *mut Core, rt: rt as *const ScriptRuntime }
    }
}

/// Script-side view of one entity-kind filter of one global event.
#[derive(Clone)]
pub struct FilterHandle {
    event: GlobalEvent,
    kind: EntityKind,
}

impl FilterHandle {
    fn check_kind(&self, ent: &Reference) -> bool {
        if ent.kind() != self.kind {
            error!(
                "cannot pass a <{}> entity to the <{}> filter",
                ent.kind().name(),
                self.kind.name()
            );
            return false;
        }
        true
    }
}

fn ctor_name(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Blip => "Blip",
        EntityKind::Checkpoint => "Checkpoint",
        EntityKind::Keybind => "Keybind",
        EntityKind::Object => "Object",
        EntityKind::Pickup => "Pickup",
        EntityKind::Player => "Player",
        EntityKind::Sphere => "Sphere",
        EntityKind::Sprite => "Sprite",
        EntityKind::Textdraw => "Textdraw",
        EntityKind::Vehicle => "Vehicle",
    }
}

fn filter_name(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Blip => "blip_filter",
        EntityKind::Checkpoint => "checkpoint_filter",
        EntityKind::Keybind => "keybind_filter",
        EntityKind::Object => "object_filter",
        EntityKind::Pickup => "pickup_filter",
        EntityKind::Player => "player_filter",
        EntityKind::Sphere => "sphere_filter",
        EntityKind::Sprite => "sprite_filter",
        EntityKind::Textdraw => "textdraw_filter",
        EntityKind::Vehicle => "vehicle_filter",
    }
}

fn vec3(x: FLOAT, y: FLOAT, z: FLOAT) -> Vec3 {
    Vec3::new(x as f32, y as f32, z as f32)
}

pub fn register_api(engine: &mut Engine, api: PluginApi) {
    engine.register_type_with_name::<Reference>("Entity");
    engine.register_type_with_name::<GlobalEvent>("GameEvent");
    engine.register_type_with_name::<FilterHandle>("EntityFilter");

    register_reference(engine, api);
    register_creation(engine, api);
    register_events(engine, api);
    register_filters(engine, api);

    engine.register_fn("log_info", |message: &str| info!("[script] {message}"));
    engine.register_fn("log_warn", |message: &str| warn!("[script] {message}"));
    engine.register_fn("log_error", |message: &str| error!("[script] {message}"));
}

fn register_reference(engine: &mut Engine, api: PluginApi) {
    engine.register_get("id", |r: &mut Reference| r.id());
    engine.register_set("id", move |r: &mut Reference, id: INT| {
        let core = unsafe { &mut *api.core };
        r.set_id(core, id);
    });
    engine.register_get("persistent", |r: &mut Reference| r.persistent());
    engine.register_set("persistent", |r: &mut Reference, on: bool| r.set_persistent(on));
    engine.register_get("active", |r: &mut Reference| r.is_active());
    engine.register_get("max", move |r: &mut Reference| {
        let core = unsafe { &*api.core };
        r.max(core) as INT
    });
    engine.register_get("gtag", move |r: &mut Reference| {
        let core = unsafe { &*api.core };
        r.global_tag(core)
    });
    engine.register_set("gtag", move |r: &mut Reference, tag: &str| {
        let core = unsafe { &mut *api.core };
        r.set_global_tag(core, tag);
    });
    engine.register_get("gdata", move |r: &mut Reference| {
        let core = unsafe { &*api.core };
        r.global_data(core)
    });
    engine.register_set("gdata", move |r: &mut Reference, data: Dynamic| {
        let core = unsafe { &mut *api.core };
        r.set_global_data(core, data);
    });
    engine.register_get("ltag", |r: &mut Reference| r.local_tag());
    engine.register_set("ltag", |r: &mut Reference, tag: &str| r.set_local_tag(tag));
    engine.register_get("ldata", |r: &mut Reference| r.local_data());
    engine.register_set("ldata", |r: &mut Reference, data: Dynamic| r.set_local_data(data));
    engine.register_get("sref", move |r: &mut Reference| {
        let core = unsafe { &mut *api.core };
        r.duplicate(core)
    });
    engine.register_get("refs", move |r: &mut Reference| {
        let core = unsafe { &*api.core };
        r.count_refs(core) as INT
    });
    engine.register_get("prefs", move |r: &mut Reference| {
        let core = unsafe { &*api.core };
        r.count_persistent_refs(core) as INT
    });
    engine.register_fn("to_string", |r: &mut Reference| {
        format!("{}({})", ctor_name(r.kind()), r.id())
    });
    engine.register_fn("==", |a: Reference, b: Reference| a == b);
    engine.register_fn("!=", |a: Reference, b: Reference| a != b);

    for kind in EntityKind::ALL {
        engine.register_fn(ctor_name(kind), move || Reference::unbound(kind));
        engine.register_fn(ctor_name(kind), move |id: INT| {
            let core = unsafe { &mut *api.core };
            Reference::new(core, kind, id)
        });
    }
}

fn register_creation(engine: &mut Engine, api: PluginApi) {
    engine.register_fn(
        "create_blip",
        move |world: INT,
              x: FLOAT,
              y: FLOAT,
              z: FLOAT,
              scale: INT,
              color: INT,
              sprite: INT|
              -> Result<Reference, Box<EvalAltResult>> {
            let core = unsafe { &mut *api.core };
            let rt = unsafe { &*api.rt };
            core.create_blip(
                rt,
                world as i32,
                vec3(x, y, z),
                scale as i32,
                Color::from_rgba(color as u32),
                sprite as i32,
                0,
                Dynamic::UNIT,
            )
            .map_err(|err| err.to_string().into())
        },
    );
    engine.register_fn(
        "create_checkpoint",
        move |world: INT,
              x: FLOAT,
              y: FLOAT,
              z: FLOAT,
              color: INT,
              radius: FLOAT|
              -> Result<Reference, Box<EvalAltResult>> {
            let core = unsafe { &mut *api.core };
            let rt = unsafe { &*api.rt };
            core.create_checkpoint(
                rt,
                world as i32,
                vec3(x, y, z),
                Color::from_rgba(color as u32),
                radius as f32,
                0,
                Dynamic::UNIT,
            )
            .map_err(|err| err.to_string().into())
        },
    );
    engine.register_fn(
        "create_keybind",
        move |release: bool,
              primary: INT,
              secondary: INT,
              alternative: INT|
              -> Result<Reference, Box<EvalAltResult>> {
            let core = unsafe { &mut *api.core };
            let rt = unsafe { &*api.rt };
            core.create_keybind(
                rt,
                release,
                primary as i32,
                secondary as i32,
                alternative as i32,
                0,
                Dynamic::UNIT,
            )
            .map_err(|err| err.to_string().into())
        },
    );
    engine.register_fn(
        "create_object",
        move |model: INT,
              world: INT,
              x: FLOAT,
              y: FLOAT,
              z: FLOAT,
              alpha: INT|
              -> Result<Reference, Box<EvalAltResult>> {
            let core = unsafe { &mut *api.core };
            let rt = unsafe { &*api.rt };
            core.create_object(rt, model as i32, world as i32, vec3(x, y, z), alpha as i32, 0, Dynamic::UNIT)
                .map_err(|err| err.to_string().into())
        },
    );
    engine.register_fn(
        "create_pickup",
        move |model: INT,
              world: INT,
              quantity: INT,
              x: FLOAT,
              y: FLOAT,
              z: FLOAT,
              alpha: INT,
              automatic: bool|
              -> Result<Reference, Box<EvalAltResult>> {
            let core = unsafe { &mut *api.core };
            let rt = unsafe { &*api.rt };
            core.create_pickup(
                rt,
                model as i32,
                world as i32,
                quantity as i32,
                vec3(x, y, z),
                alpha as i32,
                automatic,
                0,
                Dynamic::UNIT,
            )
            .map_err(|err| err.to_string().into())
        },
    );
    engine.register_fn(
        "create_sphere",
        move |world: INT,
              x: FLOAT,
              y: FLOAT,
              z: FLOAT,
              color: INT,
              radius: FLOAT|
              -> Result<Reference, Box<EvalAltResult>> {
            let core = unsafe { &mut *api.core };
            let rt = unsafe { &*api.rt };
            core.create_sphere(
                rt,
                world as i32,
                vec3(x, y, z),
                Color::from_rgba(color as u32),
                radius as f32,
                0,
                Dynamic::UNIT,
            )
            .map_err(|err| err.to_string().into())
        },
    );
    engine.register_fn(
        "create_sprite",
        move |path: &str| -> Result<Reference, Box<EvalAltResult>> {
            let core = unsafe { &mut *api.core };
            let rt = unsafe { &*api.rt };
            core.create_sprite(rt, path, 0, Dynamic::UNIT).map_err(|err| err.to_string().into())
        },
    );
    engine.register_fn(
        "create_textdraw",
        move |text: &str| -> Result<Reference, Box<EvalAltResult>> {
            let core = unsafe { &mut *api.core };
            let rt = unsafe { &*api.rt };
            core.create_textdraw(rt, text, 0, Dynamic::UNIT).map_err(|err| err.to_string().into())
        },
    );
    engine.register_fn(
        "create_vehicle",
        move |model: INT,
              world: INT,
              x: FLOAT,
              y: FLOAT,
              z: FLOAT,
              angle: FLOAT|
              -> Result<Reference, Box<EvalAltResult>> {
            let core = unsafe { &mut *api.core };
            let rt = unsafe { &*api.rt };
            core.create_vehicle(
                rt,
                model as i32,
                world as i32,
                vec3(x, y, z),
                angle as f32,
                -1,
                -1,
                0,
                Dynamic::UNIT,
            )
            .map_err(|err| err.to_string().into())
        },
    );
}

fn register_events(engine: &mut Engine, api: PluginApi) {
    engine.register_fn("GameEvent", move |name: &str| -> Result<GlobalEvent, Box<EvalAltResult>> {
        let core = unsafe { &mut *api.core };
        match EventKind::from_name(name) {
            Some(ty) => Ok(GlobalEvent::new(core, ty, false)),
            None => Err(format!("unknown event type '{name}'").into()),
        }
    });
    engine.register_fn(
        "GameEvent",
        move |name: &str, suspended: bool| -> Result<GlobalEvent, Box<EvalAltResult>> {
            let core = unsafe { &mut *api.core };
            match EventKind::from_name(name) {
                Some(ty) => Ok(GlobalEvent::new(core, ty, suspended)),
                None => Err(format!("unknown event type '{name}'").into()),
            }
        },
    );

    engine.register_get("type", |ev: &mut GlobalEvent| ev.event_type().name().to_string());
    engine.register_set("type", move |ev: &mut GlobalEvent, name: &str| {
        let core = unsafe { &mut *api.core };
        match EventKind::from_name(name) {
            Some(ty) => ev.adapt(core, ty),
            None => error!("cannot re-type an event to unknown event type '{name}'"),
        }
    });
    engine.register_fn("compatible", |_ev: &mut GlobalEvent, name: &str| {
        GlobalEvent::compatible(name)
    });
    engine.register_get("tag", |ev: &mut GlobalEvent| ev.tag());
    engine.register_set("tag", |ev: &mut GlobalEvent, tag: &str| ev.set_tag(tag));
    engine.register_get("data", |ev: &mut GlobalEvent| ev.data());
    engine.register_set("data", |ev: &mut GlobalEvent, data: Dynamic| ev.set_data(data));
    engine.register_get("idle", |ev: &mut GlobalEvent| ev.idle() as INT);
    engine.register_set("idle", |ev: &mut GlobalEvent, millis: INT| ev.set_idle(millis));
    engine.register_get("stride", |ev: &mut GlobalEvent| ev.stride() as INT);
    engine.register_set("stride", |ev: &mut GlobalEvent, stride: INT| ev.set_stride(stride));
    engine.register_get("ignore", |ev: &mut GlobalEvent| ev.ignore() as INT);
    engine.register_set("ignore", |ev: &mut GlobalEvent, ignore: INT| ev.set_ignore(ignore));
    engine.register_get("primary", |ev: &mut GlobalEvent| ev.primary().bits() as INT);
    engine.register_set("primary", |ev: &mut GlobalEvent, mask: INT| {
        ev.set_primary(KindMask::from_bits_truncate(mask as u16));
    });
    engine.register_get("secondary", |ev: &mut GlobalEvent| ev.secondary().bits() as INT);
    engine.register_set("secondary", |ev: &mut GlobalEvent, mask: INT| {
        ev.set_secondary(KindMask::from_bits_truncate(mask as u16));
    });
    engine.register_get("confined", |ev: &mut GlobalEvent| ev.confined());
    engine.register_set("confined", |ev: &mut GlobalEvent, on: bool| ev.set_confined(on));
    engine.register_get("suspended", |ev: &mut GlobalEvent| ev.suspended());
    engine.register_set("suspended", move |ev: &mut GlobalEvent, on: bool| {
        let core = unsafe { &mut *api.core };
        ev.set_suspended(core, on);
    });

    engine.register_fn("on_trigger", |ev: &mut GlobalEvent, func: FnPtr| {
        ev.set_on_trigger(Some(ScriptHook::new(func)));
    });
    engine.register_fn("on_trigger", |ev: &mut GlobalEvent, env: Dynamic, func: FnPtr| {
        ev.set_on_trigger(Some(ScriptHook::with_env(env, func)));
    });
    engine.register_fn("on_include", |ev: &mut GlobalEvent, func: FnPtr| {
        ev.set_on_include(Some(ScriptHook::new(func)));
    });
    engine.register_fn("on_include", |ev: &mut GlobalEvent, env: Dynamic, func: FnPtr| {
        ev.set_on_include(Some(ScriptHook::with_env(env, func)));
    });
    engine.register_fn("on_exclude", |ev: &mut GlobalEvent, func: FnPtr| {
        ev.set_on_exclude(Some(ScriptHook::new(func)));
    });
    engine.register_fn("on_exclude", |ev: &mut GlobalEvent, env: Dynamic, func: FnPtr| {
        ev.set_on_exclude(Some(ScriptHook::with_env(env, func)));
    });
    engine.register_fn("on_cleared", |ev: &mut GlobalEvent, func: FnPtr| {
        ev.set_on_cleared(Some(ScriptHook::new(func)));
    });
    engine.register_fn("on_cleared", |ev: &mut GlobalEvent, env: Dynamic, func: FnPtr| {
        ev.set_on_cleared(Some(ScriptHook::with_env(env, func)));
    });
    engine.register_fn("on_release", |ev: &mut GlobalEvent, func: FnPtr| {
        ev.set_on_release(Some(ScriptHook::new(func)));
    });
    engine.register_fn("on_release", |ev: &mut GlobalEvent, env: Dynamic, func: FnPtr| {
        ev.set_on_release(Some(ScriptHook::with_env(env, func)));
    });
}

fn register_filters(engine: &mut Engine, api: PluginApi) {
    for kind in EntityKind::ALL {
        engine.register_fn(filter_name(kind), move |ev: &mut GlobalEvent| FilterHandle {
            event: ev.clone(),
            kind,
        });
    }

    engine.register_fn("include", move |f: &mut FilterHandle, ent: Reference| {
        let core = unsafe { &mut *api.core };
        let rt = unsafe { &*api.rt };
        f.check_kind(&ent) && f.event.include(core, rt, &ent, 0)
    });
    engine.register_fn("include", move |f: &mut FilterHandle, ent: Reference, header: INT| {
        let core = unsafe { &mut *api.core };
        let rt = unsafe { &*api.rt };
        f.check_kind(&ent) && f.event.include(core, rt, &ent, header as i32)
    });
    engine.register_fn("exclude", move |f: &mut FilterHandle, ent: Reference| {
        let core = unsafe { &mut *api.core };
        let rt = unsafe { &*api.rt };
        f.check_kind(&ent) && f.event.exclude(core, rt, &ent, 0)
    });
    engine.register_fn("exclude", move |f: &mut FilterHandle, ent: Reference, header: INT| {
        let core = unsafe { &mut *api.core };
        let rt = unsafe { &*api.rt };
        f.check_kind(&ent) && f.event.exclude(core, rt, &ent, header as i32)
    });
    engine.register_fn("enabled", |f: &mut FilterHandle, ent: Reference| {
        f.check_kind(&ent) && f.event.enabled(&ent)
    });
    engine.register_fn("clear", move |f: &mut FilterHandle| {
        let core = unsafe { &mut *api.core };
        let rt = unsafe { &*api.rt };
        f.event.clear_filter(core, rt, f.kind, 0);
    });
    engine.register_fn("clear", move |f: &mut FilterHandle, header: INT| {
        let core = unsafe { &mut *api.core };
        let rt = unsafe { &*api.rt };
        f.event.clear_filter(core, rt, f.kind, header as i32);
    });
    engine.register_fn("flip", move |f: &mut FilterHandle| {
        let core = unsafe { &mut *api.core };
        f.event.flip_filter(core, f.kind, 0);
    });
    engine.register_fn("flip", move |f: &mut FilterHandle, header: INT| {
        let core = unsafe { &mut *api.core };
        f.event.flip_filter(core, f.kind, header as i32);
    });
    engine.register_get("count", |f: &mut FilterHandle| f.event.filter_count(f.kind) as INT);
    engine.register_get("any", |f: &mut FilterHandle| f.event.filter_any(f.kind));
    engine.register_get("none", |f: &mut FilterHandle| f.event.filter_none(f.kind));
    engine.register_get("all", |f: &mut FilterHandle| f.event.filter_all(f.kind));
}
