use std::rc::Rc;

use smallvec::SmallVec;

use crate::events::EventArgs;
use crate::scripts::ScriptRuntime;

/// Identity under which a listener registers; disconnect is by this id.
pub type SubscriberId = u64;

pub type Callback = Rc<dyn Fn(&ScriptRuntime, &EventArgs)>;

/// An ordered list of listeners fired synchronously, in connection order.
/// Firing walks a snapshot, so handlers are free to connect, disconnect or
/// redispatch while a fire is in progress.
#[derive(Clone, Default)]
pub struct Signal {
    subs: SmallVec<[(SubscriberId, Callback); 2]>,
}

impl Signal {
    pub fn new() -> Signal {
        Signal::default()
    }

    /// One subscription per identity; connecting an already-connected id is
    /// a no-op, mirroring disconnect-by-identity on the other end.
    pub fn connect(&mut self, id: SubscriberId, callback: Callback) {
        if !self.subs.iter().any(|(sid, _)| *sid == id) {
            self.subs.push((id, callback));
        }
    }

    pub fn disconnect(&mut self, id: SubscriberId) {
        self.subs.retain(|(sid, _)| *sid != id);
    }

    pub fn is_connected(&self, id: SubscriberId) -> bool {
        self.subs.iter().any(|(sid, _)| *sid == id)
    }

    pub fn clear(&mut self) {
        self.subs.clear();
    }

    pub fn len(&self) -> usize {
        self.subs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subs.is_empty()
    }

    pub fn fire(&self, rt: &ScriptRuntime, args: &EventArgs) {
        let snapshot: SmallVec<[Callback; 2]> =
            self.subs.iter().map(|(_, cb)| cb.clone()).collect();
        for callback in snapshot {
            callback(rt, args);
        }
    }
}
