use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use log::{error, warn};
use rhai::Dynamic;

use crate::core::Core;
use crate::entity::{EntityKind, KindMask};
use crate::events::{self, EventArgs, EventKind};
use crate::filter::EntityFilter;
use crate::reference::Reference;
use crate::scripts::{ScriptHook, ScriptRuntime};
use crate::signal::SubscriberId;

pub(crate) struct GlobalEventState {
    ty: EventKind,
    tag: String,
    data: Dynamic,
    stride: i64,
    stride_left: i64,
    ignore: i64,
    idle: Duration,
    last_fire: Option<Instant>,
    primary: KindMask,
    secondary: KindMask,
    confined: bool,
    suspended: bool,
    on_trigger: Option<ScriptHook>,
    on_include: Option<ScriptHook>,
    on_exclude: Option<ScriptHook>,
    on_cleared: Option<ScriptHook>,
    on_release: Option<ScriptHook>,
    filters: Vec<EntityFilter>,
    subscriber: SubscriberId,
}

impl GlobalEventState {
    /// Filter gate: an all-zero filter imposes no restriction, any set bit
    /// turns the filter into an allowlist.
    fn allowed(&self, kind: EntityKind, id: i32) -> bool {
        let filter = &self.filters[kind.index()];
        if filter.none() {
            return true;
        }
        id >= 0 && filter.enabled(id as usize)
    }

    /// Stride, ignore and idle gates, in that order. The stride countdown and
    /// the ignore counter tick on every raise; the idle clock is consulted and
    /// re-armed only when the raise would otherwise go through.
    fn throttle(&mut self) -> bool {
        let mut pass = true;
        if self.stride > 0 {
            self.stride_left -= 1;
            if self.stride_left > 0 {
                pass = false;
            } else {
                self.stride_left = self.stride;
            }
        }
        if self.ignore > 0 {
            self.ignore -= 1;
            pass = false;
        }
        if pass && !self.idle.is_zero() {
            let now = Instant::now();
            match self.last_fire {
                Some(previous) if now.duration_since(previous) < self.idle => pass = false,
                _ => self.last_fire = Some(now),
            }
        }
        pass
    }
}

struct Decision {
    hook: Option<ScriptHook>,
    name: &'static str,
    release: Option<(EntityKind, usize)>,
}

/// One script-declared interest in one event kind: per-kind entity filters,
/// throttling, and the script hooks. State is shared behind `Rc<RefCell<_>>`;
/// every operation releases its borrow before a script hook runs, so hooks
/// may freely call back into the same event.
#[derive(Clone)]
pub struct GlobalEvent {
    state: Rc<RefCell<GlobalEventState>>,
}

impl GlobalEvent {
    pub fn new(core: &mut Core, ty: EventKind, suspended: bool) -> GlobalEvent {
        let subscriber = core.subscriber_id();
        let filters = EntityKind::ALL
            .iter()
            .map(|&kind| EntityFilter::new(kind, core.pool(kind).capacity()))
            .collect();
        let state = Rc::new(RefCell::new(GlobalEventState {
            ty,
            tag: String::new(),
            data: Dynamic::UNIT,
            stride: 0,
            stride_left: 0,
            ignore: 0,
            idle: Duration::ZERO,
            last_fire: None,
            primary: KindMask::all(),
            secondary: KindMask::all(),
            confined: false,
            suspended,
            on_trigger: None,
            on_include: None,
            on_exclude: None,
            on_cleared: None,
            on_release: None,
            filters,
            subscriber,
        }));
        core.register_event(Rc::downgrade(&state));
        let event = GlobalEvent { state };
        if !suspended {
            event.attach(core);
        }
        event
    }

    pub(crate) fn from_state(state: Rc<RefCell<GlobalEventState>>) -> GlobalEvent {
        GlobalEvent { state }
    }

    // ---------- wiring ----------

    pub fn attach(&self, core: &mut Core) {
        let (ty, subscriber) = {
            let state = self.state.borrow();
            (state.ty, state.subscriber)
        };
        let weak = Rc::downgrade(&self.state);
        core.connect_global(
            ty,
            subscriber,
            Rc::new(move |rt, args| {
                if let Some(state) = weak.upgrade() {
                    GlobalEvent::from_state(state).dispatch(rt, args);
                }
            }),
        );
    }

    pub fn detach(&self, core: &mut Core) {
        let (ty, subscriber) = {
            let state = self.state.borrow();
            (state.ty, state.subscriber)
        };
        core.disconnect_global(ty, subscriber);
    }

    /// Re-target this event to another kind, reusing the filter storage:
    /// tear down the old subscriptions, reset the filters, rewire.
    pub fn adapt(&self, core: &mut Core, ty: EventKind) {
        let (current, suspended) = {
            let state = self.state.borrow();
            (state.ty, state.suspended)
        };
        if current == ty {
            return;
        }
        if !suspended {
            self.detach(core);
        }
        self.unhook(core);
        {
            let mut state = self.state.borrow_mut();
            for filter in &mut state.filters {
                filter.reset();
            }
            state.ty = ty;
        }
        if !suspended {
            self.attach(core);
        }
    }

    /// Whether a runtime event-id names a known event kind; used defensively
    /// before re-typing.
    pub fn compatible(name: &str) -> bool {
        EventKind::from_name(name).is_some()
    }

    // ---------- dispatch ----------

    pub(crate) fn dispatch(&self, rt: &ScriptRuntime, args: &EventArgs) {
        let decision = {
            let mut state = self.state.borrow_mut();
            if state.suspended {
                return;
            }
            let ty = state.ty;
            let (subject, incidental) = args.participants(ty);
            // A destroy-type event is the teardown notice for its subject:
            // the bit drops once this raise is handled, hooked or not.
            let release = subject.and_then(|(kind, id)| {
                (events::destroyed_for(kind) == ty && id >= 0).then_some((kind, id as usize))
            });
            let mut pass = true;
            if let Some((kind, id)) = subject {
                if state.primary.contains_kind(kind) && !state.allowed(kind, id) {
                    pass = false;
                }
            }
            if pass && state.confined {
                if let Some((kind, id)) = incidental {
                    if state.secondary.contains_kind(kind) && !state.allowed(kind, id) {
                        pass = false;
                    }
                }
            }
            let hook = if pass && state.throttle() { state.on_trigger.clone() } else { None };
            Decision { hook, name: ty.name(), release }
        };
        if let Some(hook) = decision.hook {
            rt.call_listener(&hook, decision.name, args.to_script_args());
        }
        if let Some((kind, id)) = decision.release {
            self.release(rt, kind, id);
        }
    }

    /// Destroy-signal handler for filtered entities: notify and drop the bit.
    /// No unhook call is needed; the slot firing this is already tearing its
    /// endpoints down.
    pub(crate) fn filtered_destroyed(&self, rt: &ScriptRuntime, kind: EntityKind, id: usize) {
        self.release(rt, kind, id);
    }

    fn release(&self, rt: &ScriptRuntime, kind: EntityKind, id: usize) {
        let (hook, name, was_set) = {
            let state = self.state.borrow();
            (
                state.on_release.clone(),
                state.ty.name(),
                state.filters[kind.index()].enabled(id),
            )
        };
        if !was_set {
            return;
        }
        if let Some(hook) = hook {
            rt.call_listener(&hook, name, vec![Dynamic::from(id as i64)]);
        }
        self.state.borrow_mut().filters[kind.index()].set(id, false);
    }

    // ---------- filtering ----------

    pub fn include(
        &self,
        core: &mut Core,
        rt: &ScriptRuntime,
        ent: &Reference,
        header: i32,
    ) -> bool {
        let kind = ent.kind();
        if !ent.is_active() {
            error!("attempting to <filter {} events> using an invalid entity instance", kind.name());
            return false;
        }
        let (ty, subscriber, hook) = {
            let state = self.state.borrow();
            if !kind.in_event(state.ty) {
                error!(
                    "attempting to <filter {} events> using an incompatible event type: {}",
                    kind.name(),
                    state.ty.name()
                );
                return false;
            }
            if state.filters[kind.index()].enabled(ent.id() as usize) {
                return false;
            }
            (state.ty, state.subscriber, state.on_include.clone())
        };
        let allow = match hook {
            Some(hook) => rt.call_bool(
                &hook,
                ty.name(),
                vec![Dynamic::from(ent.clone()), Dynamic::from(header as i64)],
            ),
            None => true,
        };
        if !allow {
            return false;
        }
        let id = ent.id();
        if id < 0 {
            // the inclusion hook tore the entity down underneath us
            return false;
        }
        if events::destroyed_for(kind) != ty {
            self.hook_entity(core, kind, id, subscriber);
        }
        self.state.borrow_mut().filters[kind.index()].set(id as usize, true);
        true
    }

    pub fn exclude(
        &self,
        core: &mut Core,
        rt: &ScriptRuntime,
        ent: &Reference,
        header: i32,
    ) -> bool {
        let kind = ent.kind();
        if !ent.is_active() {
            error!("attempting to <unfilter {} events> using an invalid entity instance", kind.name());
            return false;
        }
        let (ty, subscriber, hook) = {
            let state = self.state.borrow();
            if !kind.in_event(state.ty) {
                error!(
                    "attempting to <unfilter {} events> using an incompatible event type: {}",
                    kind.name(),
                    state.ty.name()
                );
                return false;
            }
            if !state.filters[kind.index()].enabled(ent.id() as usize) {
                return false;
            }
            (state.ty, state.subscriber, state.on_exclude.clone())
        };
        let allow = match hook {
            Some(hook) => rt.call_bool(
                &hook,
                ty.name(),
                vec![Dynamic::from(ent.clone()), Dynamic::from(header as i64)],
            ),
            None => true,
        };
        if !allow {
            return false;
        }
        let id = ent.id();
        if id < 0 {
            return false;
        }
        if events::destroyed_for(kind) != ty {
            core.disconnect_entity(kind, id, events::destroyed_for(kind), subscriber);
        }
        self.state.borrow_mut().filters[kind.index()].set(id as usize, false);
        true
    }

    pub fn enabled(&self, ent: &Reference) -> bool {
        if !ent.is_active() {
            warn!(
                "cannot test whether a <{}> entity is filtered using an invalid instance",
                ent.kind().name()
            );
            return false;
        }
        self.state.borrow().filters[ent.kind().index()].enabled(ent.id() as usize)
    }

    pub fn clear_filter(&self, core: &mut Core, rt: &ScriptRuntime, kind: EntityKind, header: i32) {
        let (ty, any, hook) = {
            let state = self.state.borrow();
            if !kind.in_event(state.ty) {
                warn!(
                    "attempting to <clear {} filter> using an incompatible event type: {}",
                    kind.name(),
                    state.ty.name()
                );
                return;
            }
            (state.ty, state.filters[kind.index()].any(), state.on_cleared.clone())
        };
        if !any {
            return;
        }
        if let Some(hook) = hook {
            rt.call_listener(&hook, ty.name(), vec![Dynamic::from(header as i64)]);
        }
        self.unhook_kind(core, kind);
        self.state.borrow_mut().filters[kind.index()].reset();
    }

    /// Invert the filter. A flipped-in bit for an inactive entity is dropped
    /// again while rehooking.
    pub fn flip_filter(&self, core: &mut Core, kind: EntityKind, _header: i32) {
        {
            let state = self.state.borrow();
            if !kind.in_event(state.ty) {
                warn!(
                    "attempting to <flip {} filter> using an incompatible event type: {}",
                    kind.name(),
                    state.ty.name()
                );
                return;
            }
        }
        self.unhook_kind(core, kind);
        self.state.borrow_mut().filters[kind.index()].flip_all();
        self.hook_kind(core, kind);
    }

    pub fn filter_count(&self, kind: EntityKind) -> usize {
        self.state.borrow().filters[kind.index()].count()
    }

    pub fn filter_any(&self, kind: EntityKind) -> bool {
        self.state.borrow().filters[kind.index()].any()
    }

    pub fn filter_none(&self, kind: EntityKind) -> bool {
        self.state.borrow().filters[kind.index()].none()
    }

    pub fn filter_all(&self, kind: EntityKind) -> bool {
        self.state.borrow().filters[kind.index()].all()
    }

    /// (Re)subscribe to the destroy signal of every filtered live entity,
    /// dropping bits whose entity is gone. No-op for the kind whose destroy
    /// event this very object represents.
    fn hook_kind(&self, core: &mut Core, kind: EntityKind) {
        let (ty, subscriber, included) = {
            let state = self.state.borrow();
            (state.ty, state.subscriber, state.filters[kind.index()].included())
        };
        if events::destroyed_for(kind) == ty {
            return;
        }
        for id in included {
            if core.pool(kind).verify(id as i64) {
                self.hook_entity(core, kind, id as i64, subscriber);
            } else {
                self.state.borrow_mut().filters[kind.index()].set(id, false);
            }
        }
    }

    fn unhook_kind(&self, core: &mut Core, kind: EntityKind) {
        let (ty, subscriber, included) = {
            let state = self.state.borrow();
            (state.ty, state.subscriber, state.filters[kind.index()].included())
        };
        if events::destroyed_for(kind) == ty {
            return;
        }
        for id in included {
            if core.pool(kind).verify(id as i64) {
                core.disconnect_entity(kind, id as i64, events::destroyed_for(kind), subscriber);
            } else {
                self.state.borrow_mut().filters[kind.index()].set(id, false);
            }
        }
    }

    pub fn hook(&self, core: &mut Core) {
        for kind in EntityKind::ALL {
            self.hook_kind(core, kind);
        }
    }

    pub fn unhook(&self, core: &mut Core) {
        for kind in EntityKind::ALL {
            self.unhook_kind(core, kind);
        }
    }

    fn hook_entity(&self, core: &mut Core, kind: EntityKind, id: i64, subscriber: SubscriberId) {
        let weak = Rc::downgrade(&self.state);
        core.connect_entity(
            kind,
            id,
            events::destroyed_for(kind),
            subscriber,
            Rc::new(move |rt, args| {
                if let Some(state) = weak.upgrade() {
                    if let EventArgs::Instance { id, .. } = args {
                        GlobalEvent::from_state(state).filtered_destroyed(rt, kind, *id as usize);
                    }
                }
            }),
        );
    }

    // ---------- properties ----------

    pub fn event_type(&self) -> EventKind {
        self.state.borrow().ty
    }

    pub fn tag(&self) -> String {
        self.state.borrow().tag.clone()
    }

    pub fn set_tag(&self, tag: &str) {
        self.state.borrow_mut().tag = tag.to_string();
    }

    pub fn data(&self) -> Dynamic {
        self.state.borrow().data.clone()
    }

    pub fn set_data(&self, data: Dynamic) {
        self.state.borrow_mut().data = data;
    }

    pub fn idle(&self) -> i64 {
        self.state.borrow().idle.as_millis() as i64
    }

    pub fn set_idle(&self, millis: i64) {
        self.state.borrow_mut().idle = Duration::from_millis(millis.max(0) as u64);
    }

    pub fn is_idle(&self) -> bool {
        let state = self.state.borrow();
        match state.last_fire {
            Some(previous) => previous.elapsed() < state.idle,
            None => false,
        }
    }

    pub fn stride(&self) -> i64 {
        self.state.borrow().stride
    }

    pub fn set_stride(&self, stride: i64) {
        let mut state = self.state.borrow_mut();
        state.stride = stride.max(0);
        state.stride_left = state.stride;
    }

    pub fn ignore(&self) -> i64 {
        self.state.borrow().ignore
    }

    pub fn set_ignore(&self, ignore: i64) {
        self.state.borrow_mut().ignore = ignore.max(0);
    }

    pub fn primary(&self) -> KindMask {
        self.state.borrow().primary
    }

    pub fn set_primary(&self, mask: KindMask) {
        self.state.borrow_mut().primary = mask;
    }

    pub fn secondary(&self) -> KindMask {
        self.state.borrow().secondary
    }

    pub fn set_secondary(&self, mask: KindMask) {
        self.state.borrow_mut().secondary = mask;
    }

    pub fn confined(&self) -> bool {
        self.state.borrow().confined
    }

    pub fn set_confined(&self, confined: bool) {
        self.state.borrow_mut().confined = confined;
    }

    pub fn suspended(&self) -> bool {
        self.state.borrow().suspended
    }

    pub fn set_suspended(&self, core: &mut Core, suspended: bool) {
        let current = self.state.borrow().suspended;
        if current == suspended {
            return;
        }
        if suspended {
            self.detach(core);
        } else {
            self.attach(core);
        }
        self.state.borrow_mut().suspended = suspended;
    }

    pub fn on_trigger(&self) -> Option<ScriptHook> {
        self.state.borrow().on_trigger.clone()
    }

    pub fn set_on_trigger(&self, hook: Option<ScriptHook>) {
        self.state.borrow_mut().on_trigger = hook;
    }

    pub fn on_include(&self) -> Option<ScriptHook> {
        self.state.borrow().on_include.clone()
    }

    pub fn set_on_include(&self, hook: Option<ScriptHook>) {
        self.state.borrow_mut().on_include = hook;
    }

    pub fn on_exclude(&self) -> Option<ScriptHook> {
        self.state.borrow().on_exclude.clone()
    }

    pub fn set_on_exclude(&self, hook: Option<ScriptHook>) {
        self.state.borrow_mut().on_exclude = hook;
    }

    pub fn on_cleared(&self) -> Option<ScriptHook> {
        self.state.borrow().on_cleared.clone()
    }

    pub fn set_on_cleared(&self, hook: Option<ScriptHook>) {
        self.state.borrow_mut().on_cleared = hook;
    }

    pub fn on_release(&self) -> Option<ScriptHook> {
        self.state.borrow().on_release.clone()
    }

    pub fn set_on_release(&self, hook: Option<ScriptHook>) {
        self.state.borrow_mut().on_release = hook;
    }

    // ---------- teardown ----------

    /// VM shutdown: detach from everything and drop every script hook so no
    /// script value outlives the runtime.
    pub fn vm_close(&self, core: &mut Core) {
        let suspended = self.state.borrow().suspended;
        if !suspended {
            self.detach(core);
        }
        self.unhook(core);
        let mut state = self.state.borrow_mut();
        for filter in &mut state.filters {
            filter.reset();
        }
        state.on_trigger = None;
        state.on_include = None;
        state.on_exclude = None;
        state.on_cleared = None;
        state.on_release = None;
        state.suspended = true;
    }
}
