use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Weak;

use anyhow::{bail, Context, Result};
use glam::Vec3;
use log::error;
use rhai::Dynamic;

use crate::config::PluginConfig;
use crate::entity::{Color, EntityKind, EntityPayload};
use crate::events::{self, EventArgs, EventKind};
use crate::global::{GlobalEvent, GlobalEventState};
use crate::pool::Pool;
use crate::reference::Reference;
use crate::scripts::ScriptRuntime;
use crate::signal::{Callback, Signal, SubscriberId};

#[derive(Clone, Copy)]
struct PlayerTrack {
    weapon: i32,
    health: f32,
    armour: f32,
    position: Vec3,
    fresh: bool,
}

impl Default for PlayerTrack {
    fn default() -> Self {
        PlayerTrack { weapon: 0, health: 0.0, armour: 0.0, position: Vec3::ZERO, fresh: true }
    }
}

#[derive(Clone, Copy)]
struct VehicleTrack {
    health: f32,
    position: Vec3,
    fresh: bool,
}

impl Default for VehicleTrack {
    fn default() -> Self {
        VehicleTrack { health: 0.0, position: Vec3::ZERO, fresh: true }
    }
}

/// Process-wide state of the binding layer: one pool per entity kind, the
/// global per-event signals, the registry of live global events and the
/// player/vehicle track tables. Owned by the host and passed explicitly;
/// torn down with `vm_close` rather than drop order.
pub struct Core {
    pools: Vec<Pool>,
    globals: HashMap<EventKind, Signal>,
    events: Vec<Weak<RefCell<GlobalEventState>>>,
    next_subscriber: SubscriberId,
    options: HashMap<String, String>,
    player_track: Vec<PlayerTrack>,
    vehicle_track: Vec<VehicleTrack>,
}

impl Core {
    pub fn new(config: &PluginConfig) -> Result<Core> {
        config.pools.validate()?;
        let pools = EntityKind::ALL
            .iter()
            .map(|&kind| Pool::new(kind, config.pools.capacity(kind)))
            .collect::<Vec<_>>();
        let players = pools[EntityKind::Player.index()].capacity();
        let vehicles = pools[EntityKind::Vehicle.index()].capacity();
        Ok(Core {
            pools,
            globals: HashMap::new(),
            events: Vec::new(),
            next_subscriber: 1,
            options: HashMap::new(),
            player_track: vec![PlayerTrack::default(); players],
            vehicle_track: vec![VehicleTrack::default(); vehicles],
        })
    }

    pub fn with_defaults() -> Core {
        Core::new(&PluginConfig::default()).expect("default configuration is valid")
    }

    pub fn subscriber_id(&mut self) -> SubscriberId {
        let id = self.next_subscriber;
        self.next_subscriber += 1;
        id
    }

    pub fn pool(&self, kind: EntityKind) -> &Pool {
        &self.pools[kind.index()]
    }

    pub fn pool_mut(&mut self, kind: EntityKind) -> &mut Pool {
        &mut self.pools[kind.index()]
    }

    pub fn verify(&self, kind: EntityKind, id: i64) -> bool {
        self.pool(kind).verify(id)
    }

    // ---------- signal plumbing ----------

    pub fn connect_global(&mut self, event: EventKind, id: SubscriberId, callback: Callback) {
        self.globals.entry(event).or_default().connect(id, callback);
    }

    pub fn disconnect_global(&mut self, event: EventKind, id: SubscriberId) {
        if let Some(signal) = self.globals.get_mut(&event) {
            signal.disconnect(id);
        }
    }

    /// Attach a listener to one entity's signal endpoint. Fails quietly when
    /// the entity is not live; endpoints die with the slot.
    pub fn connect_entity(
        &mut self,
        kind: EntityKind,
        entity: i64,
        event: EventKind,
        id: SubscriberId,
        callback: Callback,
    ) -> bool {
        if !self.pool(kind).verify(entity) {
            return false;
        }
        self.pool_mut(kind)
            .slot_mut(entity as u32)
            .signal_mut(event)
            .connect(id, callback);
        true
    }

    pub fn disconnect_entity(
        &mut self,
        kind: EntityKind,
        entity: i64,
        event: EventKind,
        id: SubscriberId,
    ) {
        if entity < 0 || entity as usize >= self.pool(kind).capacity() {
            return;
        }
        let slot = self.pool_mut(kind).slot_mut(entity as u32);
        if let Some(signal) = slot.signal(event) {
            if signal.is_connected(id) {
                slot.signal_mut(event).disconnect(id);
            }
        }
    }

    /// Dispatch one raised event: the per-slot endpoints of every live
    /// participant first, then the global signal for the event kind.
    pub fn raise(&mut self, rt: &ScriptRuntime, event: EventKind, args: EventArgs) {
        let (subject, incidental) = args.participants(event);
        let mut signals = Vec::new();
        for participant in [subject, incidental].into_iter().flatten() {
            let (kind, id) = participant;
            if self.pool(kind).verify(id as i64) {
                if let Some(signal) = self.pool(kind).slot(id as u32).signal(event) {
                    signals.push(signal.clone());
                }
            }
        }
        if let Some(signal) = self.globals.get(&event) {
            signals.push(signal.clone());
        }
        for signal in signals {
            signal.fire(rt, &args);
        }
    }

    // ---------- lifecycle ----------

    pub fn activate(&mut self, kind: EntityKind, id: i64, owned: bool, payload: EntityPayload) -> bool {
        let done = self.pool_mut(kind).activate(id, owned, payload);
        if done {
            self.reset_track(kind, id);
        }
        done
    }

    /// Quiet teardown: notifies the slot's own destroy endpoint (so filters
    /// self-heal) without going through global dispatch. The native callback
    /// path is `entity_destroyed`.
    pub fn deactivate(
        &mut self,
        rt: &ScriptRuntime,
        kind: EntityKind,
        id: i64,
        header: i32,
        payload: Dynamic,
    ) -> bool {
        if !self.pool(kind).verify(id) {
            error!("cannot deactivate an already inactive <{}> instance {id}", kind.name());
            return false;
        }
        let signal = self
            .pool(kind)
            .slot(id as u32)
            .signal(events::destroyed_for(kind))
            .cloned();
        if let Some(signal) = signal {
            let args = EventArgs::Instance { id: id as i32, header, payload };
            signal.fire(rt, &args);
        }
        self.pool_mut(kind).deactivate(id)
    }

    pub fn entity_created(
        &mut self,
        rt: &ScriptRuntime,
        kind: EntityKind,
        id: i64,
        header: i32,
        payload: Dynamic,
        store: EntityPayload,
    ) -> bool {
        if !self.activate(kind, id, false, store) {
            return false;
        }
        self.raise(rt, events::created_for(kind), EventArgs::Instance {
            id: id as i32,
            header,
            payload,
        });
        true
    }

    pub fn entity_destroyed(
        &mut self,
        rt: &ScriptRuntime,
        kind: EntityKind,
        id: i64,
        header: i32,
        payload: Dynamic,
    ) -> bool {
        if !self.pool(kind).verify(id) {
            error!("cannot destroy an already inactive <{}> instance {id}", kind.name());
            return false;
        }
        self.raise(rt, events::destroyed_for(kind), EventArgs::Instance {
            id: id as i32,
            header,
            payload,
        });
        self.pool_mut(kind).deactivate(id)
    }

    pub fn entity_custom(
        &mut self,
        rt: &ScriptRuntime,
        kind: EntityKind,
        id: i64,
        header: i32,
        payload: Dynamic,
    ) -> bool {
        if !self.pool(kind).verify(id) {
            error!("cannot forward a custom event for inactive <{}> instance {id}", kind.name());
            return false;
        }
        self.raise(rt, events::custom_for(kind), EventArgs::Instance {
            id: id as i32,
            header,
            payload,
        });
        true
    }

    /// Pool notifications from the server: entities appearing or vanishing
    /// without one of our creation calls.
    pub fn on_entity_pool(
        &mut self,
        rt: &ScriptRuntime,
        kind: EntityKind,
        id: i64,
        deleted: bool,
        header: i32,
        payload: Dynamic,
    ) {
        if deleted {
            if self.pool(kind).verify(id) {
                self.entity_destroyed(rt, kind, id, header, payload);
            }
        } else if !self.pool(kind).verify(id) {
            self.entity_created(rt, kind, id, header, payload, EntityPayload::None);
        }
    }

    pub fn connect_player(
        &mut self,
        rt: &ScriptRuntime,
        id: i64,
        header: i32,
        payload: Dynamic,
    ) -> bool {
        self.entity_created(rt, EntityKind::Player, id, header, payload, EntityPayload::None)
    }

    pub fn disconnect_player(
        &mut self,
        rt: &ScriptRuntime,
        id: i64,
        header: i32,
        payload: Dynamic,
    ) -> bool {
        self.entity_destroyed(rt, EntityKind::Player, id, header, payload)
    }

    // ---------- creation ----------

    pub fn create_blip(
        &mut self,
        rt: &ScriptRuntime,
        world: i32,
        position: Vec3,
        scale: i32,
        color: Color,
        sprite: i32,
        header: i32,
        payload: Dynamic,
    ) -> Result<Reference> {
        if scale < 0 {
            bail!("cannot create a blip with negative scale {scale}");
        }
        if sprite < 0 {
            bail!("cannot create a blip with invalid sprite id {sprite}");
        }
        let store = EntityPayload::Blip { world, scale, sprite, position, color };
        self.spawn(rt, EntityKind::Blip, store, header, payload)
    }

    pub fn create_checkpoint(
        &mut self,
        rt: &ScriptRuntime,
        world: i32,
        _position: Vec3,
        _color: Color,
        radius: f32,
        header: i32,
        payload: Dynamic,
    ) -> Result<Reference> {
        if radius <= 0.0 {
            bail!("cannot create a checkpoint with non-positive radius {radius}");
        }
        if world < 0 {
            bail!("cannot create a checkpoint in invalid world {world}");
        }
        self.spawn(rt, EntityKind::Checkpoint, EntityPayload::None, header, payload)
    }

    pub fn create_keybind(
        &mut self,
        rt: &ScriptRuntime,
        release: bool,
        primary: i32,
        secondary: i32,
        alternative: i32,
        header: i32,
        payload: Dynamic,
    ) -> Result<Reference> {
        if primary < 0 {
            bail!("cannot create a keybind without a valid primary key code");
        }
        let store = EntityPayload::Keybind { primary, secondary, alternative, release };
        self.spawn(rt, EntityKind::Keybind, store, header, payload)
    }

    pub fn create_object(
        &mut self,
        rt: &ScriptRuntime,
        model: i32,
        world: i32,
        _position: Vec3,
        alpha: i32,
        header: i32,
        payload: Dynamic,
    ) -> Result<Reference> {
        if model <= 0 {
            bail!("cannot create an object with invalid model {model}");
        }
        if world < 0 {
            bail!("cannot create an object in invalid world {world}");
        }
        if !(0..=255).contains(&alpha) {
            bail!("cannot create an object with out-of-range alpha {alpha}");
        }
        self.spawn(rt, EntityKind::Object, EntityPayload::None, header, payload)
    }

    pub fn create_pickup(
        &mut self,
        rt: &ScriptRuntime,
        model: i32,
        world: i32,
        quantity: i32,
        _position: Vec3,
        alpha: i32,
        _automatic: bool,
        header: i32,
        payload: Dynamic,
    ) -> Result<Reference> {
        if model <= 0 {
            bail!("cannot create a pickup with invalid model {model}");
        }
        if quantity < 0 {
            bail!("cannot create a pickup with negative quantity {quantity}");
        }
        if world < 0 || !(0..=255).contains(&alpha) {
            bail!("cannot create a pickup with invalid world or alpha");
        }
        self.spawn(rt, EntityKind::Pickup, EntityPayload::None, header, payload)
    }

    pub fn create_sphere(
        &mut self,
        rt: &ScriptRuntime,
        world: i32,
        _position: Vec3,
        _color: Color,
        radius: f32,
        header: i32,
        payload: Dynamic,
    ) -> Result<Reference> {
        if radius <= 0.0 {
            bail!("cannot create a sphere with non-positive radius {radius}");
        }
        if world < 0 {
            bail!("cannot create a sphere in invalid world {world}");
        }
        self.spawn(rt, EntityKind::Sphere, EntityPayload::None, header, payload)
    }

    pub fn create_sprite(
        &mut self,
        rt: &ScriptRuntime,
        path: &str,
        header: i32,
        payload: Dynamic,
    ) -> Result<Reference> {
        if path.is_empty() {
            bail!("cannot create a sprite from an empty file path");
        }
        let store = EntityPayload::Sprite { path: path.to_string() };
        self.spawn(rt, EntityKind::Sprite, store, header, payload)
    }

    pub fn create_textdraw(
        &mut self,
        rt: &ScriptRuntime,
        text: &str,
        header: i32,
        payload: Dynamic,
    ) -> Result<Reference> {
        if text.is_empty() {
            bail!("cannot create a textdraw with empty text");
        }
        let store = EntityPayload::Textdraw { text: text.to_string() };
        self.spawn(rt, EntityKind::Textdraw, store, header, payload)
    }

    pub fn create_vehicle(
        &mut self,
        rt: &ScriptRuntime,
        model: i32,
        world: i32,
        _position: Vec3,
        _angle: f32,
        _primary: i32,
        _secondary: i32,
        header: i32,
        payload: Dynamic,
    ) -> Result<Reference> {
        if model <= 0 {
            bail!("cannot create a vehicle with invalid model {model}");
        }
        if world < 0 {
            bail!("cannot create a vehicle in invalid world {world}");
        }
        self.spawn(rt, EntityKind::Vehicle, EntityPayload::None, header, payload)
    }

    fn spawn(
        &mut self,
        rt: &ScriptRuntime,
        kind: EntityKind,
        store: EntityPayload,
        header: i32,
        payload: Dynamic,
    ) -> Result<Reference> {
        let id = self
            .pool(kind)
            .first_free()
            .with_context(|| format!("the {} pool is exhausted", kind.name()))?;
        self.activate(kind, id as i64, true, store);
        let reference = Reference::new(self, kind, id as i64);
        self.raise(rt, events::created_for(kind), EventArgs::Instance {
            id: id as i32,
            header,
            payload,
        });
        Ok(reference)
    }

    // ---------- state tracking ----------

    /// Diff the server-side player state against the last snapshot and
    /// synthesize the transition events scripts actually listen for. A fresh
    /// track only primes the baseline.
    pub fn player_update(
        &mut self,
        rt: &ScriptRuntime,
        id: i64,
        weapon: i32,
        health: f32,
        armour: f32,
        position: Vec3,
    ) {
        if !self.pool(EntityKind::Player).verify(id) {
            error!("cannot track state of inactive <player> instance {id}");
            return;
        }
        let track = &mut self.player_track[id as usize];
        let previous = *track;
        track.weapon = weapon;
        track.health = health;
        track.armour = armour;
        track.position = position;
        if previous.fresh {
            track.fresh = false;
            return;
        }
        let player = id as i32;
        if previous.weapon != weapon {
            self.raise(rt, EventKind::PlayerWeapon, EventArgs::PlayerTransition {
                player,
                previous: previous.weapon,
                current: weapon,
            });
        }
        if previous.health != health {
            self.raise(rt, EventKind::PlayerHealth, EventArgs::PlayerGauge {
                player,
                previous: previous.health,
                current: health,
            });
        }
        if previous.armour != armour {
            self.raise(rt, EventKind::PlayerArmour, EventArgs::PlayerGauge {
                player,
                previous: previous.armour,
                current: armour,
            });
        }
        if previous.position != position {
            self.raise(rt, EventKind::PlayerMove, EventArgs::PlayerMove {
                player,
                previous: previous.position,
                current: position,
            });
        }
    }

    pub fn vehicle_update(&mut self, rt: &ScriptRuntime, id: i64, health: f32, position: Vec3) {
        if !self.pool(EntityKind::Vehicle).verify(id) {
            error!("cannot track state of inactive <vehicle> instance {id}");
            return;
        }
        let track = &mut self.vehicle_track[id as usize];
        let previous = *track;
        track.health = health;
        track.position = position;
        if previous.fresh {
            track.fresh = false;
            return;
        }
        let vehicle = id as i32;
        if previous.health != health {
            self.raise(rt, EventKind::VehicleHealth, EventArgs::VehicleGauge {
                vehicle,
                previous: previous.health,
                current: health,
            });
        }
        if previous.position != position {
            self.raise(rt, EventKind::VehicleMove, EventArgs::VehicleMove {
                vehicle,
                previous: previous.position,
                current: position,
            });
        }
    }

    fn reset_track(&mut self, kind: EntityKind, id: i64) {
        match kind {
            EntityKind::Player => {
                if let Some(track) = self.player_track.get_mut(id as usize) {
                    *track = PlayerTrack::default();
                }
            }
            EntityKind::Vehicle => {
                if let Some(track) = self.vehicle_track.get_mut(id as usize) {
                    *track = VehicleTrack::default();
                }
            }
            _ => {}
        }
    }

    // ---------- options ----------

    pub fn option(&self, name: &str) -> Option<&str> {
        self.options.get(name).map(String::as_str)
    }

    pub fn set_option(&mut self, name: &str, value: &str) {
        self.options.insert(name.to_string(), value.to_string());
    }

    // ---------- teardown ----------

    pub(crate) fn register_event(&mut self, event: Weak<RefCell<GlobalEventState>>) {
        self.events.push(event);
    }

    /// Explicit shutdown on VM close: every global event detaches and drops
    /// its hooks, every signal endpoint empties. Safe to call more than once.
    pub fn vm_close(&mut self) {
        let events: Vec<_> = self.events.drain(..).filter_map(|weak| weak.upgrade()).collect();
        for state in events {
            GlobalEvent::from_state(state).vm_close(self);
        }
        for pool in &mut self.pools {
            pool.clear_all_signals();
        }
        self.globals.clear();
    }
}
