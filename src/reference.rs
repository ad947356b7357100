use std::cell::RefCell;
use std::rc::{Rc, Weak};

use log::warn;
use rhai::Dynamic;

use crate::core::Core;
use crate::entity::EntityKind;

/// Sentinel id reported by handles that do not currently denote an entity.
pub const UNKNOWN: i64 = -1;

/// Shared state behind a `Reference`. The slot's chain holds a weak entry per
/// node, so dropping the last handle to a node unlinks it without any help.
#[derive(Debug)]
pub(crate) struct RefNode {
    pub(crate) id: Option<u32>,
    pub(crate) persistent: bool,
    pub(crate) tag: String,
    pub(crate) data: Dynamic,
}

/// A script-held handle to an entity slot. Many references may target one
/// slot at a time; cloning shares the node (value semantics for the script
/// layer), while `duplicate` creates a new chain entry of its own.
#[derive(Debug, Clone)]
pub struct Reference {
    kind: EntityKind,
    node: Rc<RefCell<RefNode>>,
}

impl Reference {
    /// Binds to `id` when it denotes a live entity, otherwise starts unknown.
    pub fn new(core: &mut Core, kind: EntityKind, id: i64) -> Reference {
        let reference = Reference::unbound(kind);
        if core.pool(kind).verify(id) {
            reference.node.borrow_mut().id = Some(id as u32);
            reference.link(core);
        }
        reference
    }

    pub fn unbound(kind: EntityKind) -> Reference {
        Reference {
            kind,
            node: Rc::new(RefCell::new(RefNode {
                id: None,
                persistent: false,
                tag: String::new(),
                data: Dynamic::UNIT,
            })),
        }
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn id(&self) -> i64 {
        self.node.borrow().id.map_or(UNKNOWN, |id| id as i64)
    }

    pub fn is_active(&self) -> bool {
        self.node.borrow().id.is_some()
    }

    /// Rebind to another id. Invalid targets silently leave the handle
    /// unknown; the old chain entry is dropped either way.
    pub fn set_id(&self, core: &mut Core, id: i64) {
        if self.id() == id {
            return;
        }
        self.unlink(core);
        if core.pool(self.kind).verify(id) {
            self.node.borrow_mut().id = Some(id as u32);
            self.link(core);
        } else {
            self.node.borrow_mut().id = None;
        }
    }

    pub fn persistent(&self) -> bool {
        self.node.borrow().persistent
    }

    pub fn set_persistent(&self, persistent: bool) {
        self.node.borrow_mut().persistent = persistent;
    }

    pub fn global_tag(&self, core: &Core) -> String {
        match self.node.borrow().id {
            Some(id) => core.pool(self.kind).slot(id).tag.clone(),
            None => {
                warn!("attempting to <get global tag> using an invalid {} reference", self.kind.name());
                String::new()
            }
        }
    }

    pub fn set_global_tag(&self, core: &mut Core, tag: &str) {
        match self.node.borrow().id {
            Some(id) => core.pool_mut(self.kind).slot_mut(id).tag = tag.to_string(),
            None => {
                warn!("attempting to <set global tag> using an invalid {} reference", self.kind.name());
            }
        }
    }

    pub fn global_data(&self, core: &Core) -> Dynamic {
        match self.node.borrow().id {
            Some(id) => core.pool(self.kind).slot(id).data.clone(),
            None => {
                warn!("attempting to <get global data> using an invalid {} reference", self.kind.name());
                Dynamic::UNIT
            }
        }
    }

    pub fn set_global_data(&self, core: &mut Core, data: Dynamic) {
        match self.node.borrow().id {
            Some(id) => core.pool_mut(self.kind).slot_mut(id).data = data,
            None => {
                warn!("attempting to <set global data> using an invalid {} reference", self.kind.name());
            }
        }
    }

    pub fn local_tag(&self) -> String {
        self.node.borrow().tag.clone()
    }

    pub fn set_local_tag(&self, tag: &str) {
        self.node.borrow_mut().tag = tag.to_string();
    }

    pub fn local_data(&self) -> Dynamic {
        self.node.borrow().data.clone()
    }

    pub fn set_local_data(&self, data: Dynamic) {
        self.node.borrow_mut().data = data;
    }

    pub fn max(&self, core: &Core) -> usize {
        core.pool(self.kind).capacity()
    }

    /// A fresh handle with its own chain entry, copying id, tags, data and
    /// persistence from this one.
    pub fn duplicate(&self, core: &mut Core) -> Reference {
        let copy = {
            let node = self.node.borrow();
            Reference {
                kind: self.kind,
                node: Rc::new(RefCell::new(RefNode {
                    id: node.id,
                    persistent: node.persistent,
                    tag: node.tag.clone(),
                    data: node.data.clone(),
                })),
            }
        };
        copy.link(core);
        copy
    }

    /// Number of live reference nodes currently chained to this handle's
    /// entity; zero when the handle is unknown.
    pub fn count_refs(&self, core: &Core) -> usize {
        match self.node.borrow().id {
            Some(id) => core
                .pool(self.kind)
                .slot(id)
                .chain
                .iter()
                .filter(|weak| weak.upgrade().is_some())
                .count(),
            None => 0,
        }
    }

    pub fn count_persistent_refs(&self, core: &Core) -> usize {
        match self.node.borrow().id {
            Some(id) => core
                .pool(self.kind)
                .slot(id)
                .chain
                .iter()
                .filter_map(|weak| weak.upgrade())
                .filter(|node| node.borrow().persistent)
                .count(),
            None => 0,
        }
    }

    fn link(&self, core: &mut Core) {
        if let Some(id) = self.node.borrow().id {
            core.pool_mut(self.kind)
                .slot_mut(id)
                .chain
                .push(Rc::downgrade(&self.node));
        }
    }

    fn unlink(&self, core: &mut Core) {
        if let Some(id) = self.node.borrow().id {
            let me: Weak<RefCell<RefNode>> = Rc::downgrade(&self.node);
            core.pool_mut(self.kind)
                .slot_mut(id)
                .chain
                .retain(|weak| !Weak::ptr_eq(weak, &me));
        }
    }
}

impl PartialEq for Reference {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.id() == other.id()
    }
}
