use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Weak;

use log::error;
use rhai::Dynamic;

use crate::entity::{EntityKind, EntityPayload};
use crate::events::EventKind;
use crate::reference::RefNode;
use crate::signal::Signal;

/// One element of a fixed-capacity entity table. `id` is `Some(index)` for
/// exactly as long as the entity is live; the chain holds every reference
/// node currently bound here, live or persistently disabled.
pub struct Slot {
    pub(crate) id: Option<u32>,
    pub(crate) owned: bool,
    pub(crate) fresh: bool,
    pub(crate) tag: String,
    pub(crate) data: Dynamic,
    pub(crate) payload: EntityPayload,
    pub(crate) chain: Vec<Weak<RefCell<RefNode>>>,
    signals: HashMap<EventKind, Signal>,
}

impl Slot {
    fn new() -> Slot {
        Slot {
            id: None,
            owned: false,
            fresh: true,
            tag: String::new(),
            data: Dynamic::UNIT,
            payload: EntityPayload::None,
            chain: Vec::new(),
            signals: HashMap::new(),
        }
    }

    pub fn signal(&self, event: EventKind) -> Option<&Signal> {
        self.signals.get(&event)
    }

    pub fn signal_mut(&mut self, event: EventKind) -> &mut Signal {
        self.signals.entry(event).or_default()
    }

    fn clear_signals(&mut self) {
        for signal in self.signals.values_mut() {
            signal.clear();
        }
        self.signals.clear();
    }
}

/// Fixed-capacity table of slots for one entity kind.
pub struct Pool {
    kind: EntityKind,
    slots: Vec<Slot>,
}

impl Pool {
    pub fn new(kind: EntityKind, capacity: usize) -> Pool {
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, Slot::new);
        Pool { kind, slots }
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// True iff `id` denotes a slot that was activated and not yet
    /// deactivated.
    pub fn verify(&self, id: i64) -> bool {
        id >= 0
            && (id as usize) < self.slots.len()
            && self.slots[id as usize].id == Some(id as u32)
    }

    pub fn first_free(&self) -> Option<u32> {
        self.slots.iter().position(|slot| slot.id.is_none()).map(|i| i as u32)
    }

    pub fn active_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.id.is_some()).count()
    }

    pub(crate) fn slot(&self, id: u32) -> &Slot {
        &self.slots[id as usize]
    }

    pub(crate) fn slot_mut(&mut self, id: u32) -> &mut Slot {
        &mut self.slots[id as usize]
    }

    /// Bring a slot to life. Persistent references still chained here from a
    /// previous life get their id restored; anything else left in the chain
    /// is stale and gets dropped.
    pub fn activate(&mut self, id: i64, owned: bool, payload: EntityPayload) -> bool {
        if id < 0 || id as usize >= self.slots.len() {
            error!("cannot activate <{}> instance with invalid identifier {id}", self.kind.name());
            return false;
        }
        if self.verify(id) {
            error!("cannot activate an already active <{}> instance {id}", self.kind.name());
            return false;
        }
        let index = id as u32;
        let slot = &mut self.slots[index as usize];
        slot.chain.retain(|weak| match weak.upgrade() {
            Some(node) => {
                let mut node = node.borrow_mut();
                if node.persistent {
                    node.id = Some(index);
                    true
                } else {
                    node.id = None;
                    false
                }
            }
            None => false,
        });
        slot.id = Some(index);
        slot.owned = owned;
        if slot.fresh {
            slot.tag.clear();
            slot.data = Dynamic::UNIT;
            slot.fresh = false;
        }
        slot.payload = payload;
        true
    }

    /// Tear a slot down. Persistent references go id-unknown but stay
    /// chained for a later resurrection; the rest are evicted and become
    /// permanently dangling. Does not fire any signal; the owning context
    /// announces destruction before calling this.
    pub fn deactivate(&mut self, id: i64) -> bool {
        if !self.verify(id) {
            error!(
                "cannot deactivate an already inactive <{}> instance {id}",
                self.kind.name()
            );
            return false;
        }
        let slot = &mut self.slots[id as usize];
        slot.chain.retain(|weak| match weak.upgrade() {
            Some(node) => {
                let mut node = node.borrow_mut();
                node.id = None;
                node.persistent
            }
            None => false,
        });
        slot.id = None;
        slot.payload = EntityPayload::None;
        slot.clear_signals();
        true
    }

    /// Creation-time payload of a live entity.
    pub fn payload(&self, id: i64) -> Option<&EntityPayload> {
        self.verify(id).then(|| &self.slots[id as usize].payload)
    }

    /// Whether a live entity was created through the plugin rather than
    /// showing up in a server pool notification.
    pub fn owned(&self, id: i64) -> bool {
        self.verify(id) && self.slots[id as usize].owned
    }

    /// Mark a slot so its next activation starts with clean tag/data again.
    pub fn set_fresh(&mut self, id: i64) {
        if id >= 0 && (id as usize) < self.slots.len() {
            self.slots[id as usize].fresh = true;
        }
    }

    pub(crate) fn clear_all_signals(&mut self) {
        for slot in &mut self.slots {
            slot.clear_signals();
        }
    }
}
