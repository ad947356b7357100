use bitvec::prelude::*;

use crate::entity::EntityKind;

/// Which entities of one kind are of interest to one global event. A bit per
/// slot index; all-zero means the filter imposes no restriction. The gating
/// logic, hook plumbing and destroy-signal subscriptions live on the owning
/// event, which knows its own type and hooks.
pub struct EntityFilter {
    kind: EntityKind,
    bits: BitVec,
}

impl EntityFilter {
    pub fn new(kind: EntityKind, capacity: usize) -> EntityFilter {
        EntityFilter { kind, bits: bitvec![0; capacity] }
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn capacity(&self) -> usize {
        self.bits.len()
    }

    pub fn enabled(&self, id: usize) -> bool {
        id < self.bits.len() && self.bits[id]
    }

    pub(crate) fn set(&mut self, id: usize, on: bool) {
        if id < self.bits.len() {
            self.bits.set(id, on);
        }
    }

    pub(crate) fn reset(&mut self) {
        self.bits.fill(false);
    }

    pub(crate) fn flip_all(&mut self) {
        for mut bit in self.bits.iter_mut() {
            *bit = !*bit;
        }
    }

    pub fn count(&self) -> usize {
        self.bits.count_ones()
    }

    pub fn any(&self) -> bool {
        self.bits.any()
    }

    pub fn none(&self) -> bool {
        self.bits.not_any()
    }

    pub fn all(&self) -> bool {
        self.bits.all()
    }

    /// Indices currently included, collected so the caller may mutate the
    /// filter while walking.
    pub(crate) fn included(&self) -> Vec<usize> {
        self.bits.iter_ones().collect()
    }
}
