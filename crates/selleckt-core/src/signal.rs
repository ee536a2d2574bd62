//! Typed notifications from a widget to whoever listens.
//!
//! A [`Signal`] owns an ordered list of slots. Emitting runs every slot with
//! a shared reference to the payload. Everything runs on one thread, so slots
//! may hold `Rc` handles, including one to the widget that owns the signal.
//!
//! The slot list is copied before the first slot runs: a slot may connect,
//! disconnect or emit again on the same signal, and the change applies from
//! the next emission on.
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! use selleckt_core::Signal;
//!
//! let filtered = Signal::<String>::new();
//! let terms = Rc::new(RefCell::new(Vec::new()));
//!
//! let sink = terms.clone();
//! let id = filtered.connect(move |term| sink.borrow_mut().push(term.clone()));
//! filtered.emit("ba".to_string());
//! filtered.disconnect(id);
//! filtered.emit("baz".to_string());
//!
//! assert_eq!(*terms.borrow(), ["ba"]);
//! ```

use std::rc::Rc;

use parking_lot::Mutex;
use slotmap::{new_key_type, SlotMap};

use crate::logging::targets;

new_key_type! {
    /// Handle to one connected slot, used to disconnect it.
    pub struct ConnectionId;
}

type Slot<Args> = Rc<dyn Fn(&Args)>;

struct Connections<Args> {
    slots: SlotMap<ConnectionId, Slot<Args>>,
    /// Connection order; slots run in this order.
    order: Vec<ConnectionId>,
}

/// A notification carrying `Args` to every connected slot.
pub struct Signal<Args> {
    connections: Mutex<Connections<Args>>,
}

impl<Args: 'static> Default for Signal<Args> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Args: 'static> Signal<Args> {
    pub fn new() -> Self {
        Self {
            connections: Mutex::new(Connections {
                slots: SlotMap::with_key(),
                order: Vec::new(),
            }),
        }
    }

    /// Add a slot. It runs after every slot connected before it.
    pub fn connect<F>(&self, slot: F) -> ConnectionId
    where
        F: Fn(&Args) + 'static,
    {
        let mut connections = self.connections.lock();
        let id = connections.slots.insert(Rc::new(slot));
        connections.order.push(id);
        id
    }

    /// Remove a slot. Returns `false` if it was already gone.
    pub fn disconnect(&self, id: ConnectionId) -> bool {
        let mut connections = self.connections.lock();
        if connections.slots.remove(id).is_none() {
            return false;
        }
        connections.order.retain(|other| *other != id);
        true
    }

    pub fn connection_count(&self) -> usize {
        self.connections.lock().slots.len()
    }

    /// Run every connected slot with `args`.
    pub fn emit(&self, args: Args) {
        let slots: Vec<Slot<Args>> = {
            let connections = self.connections.lock();
            connections
                .order
                .iter()
                .filter_map(|id| connections.slots.get(*id).cloned())
                .collect()
        };
        tracing::trace!(target: targets::SIGNAL, slots = slots.len(), "emit");

        for slot in slots {
            slot(&args);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};

    fn recorder<T: Clone + 'static>(signal: &Signal<T>) -> Rc<RefCell<Vec<T>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = log.clone();
        signal.connect(move |value: &T| sink.borrow_mut().push(value.clone()));
        log
    }

    #[test]
    fn test_slots_run_in_connection_order() {
        let signal = Signal::<()>::new();
        let order = Rc::new(RefCell::new(Vec::new()));

        let ids: Vec<ConnectionId> = (0..3)
            .map(|n| {
                let order = order.clone();
                signal.connect(move |_| order.borrow_mut().push(n))
            })
            .collect();
        signal.disconnect(ids[0]);
        let late = order.clone();
        signal.connect(move |_| late.borrow_mut().push(3));

        signal.emit(());
        assert_eq!(*order.borrow(), [1, 2, 3]);
        assert_eq!(signal.connection_count(), 3);
    }

    #[test]
    fn test_disconnect_twice() {
        let signal = Signal::<u8>::new();
        let id = signal.connect(|_| {});
        assert!(signal.disconnect(id));
        assert!(!signal.disconnect(id));
        assert_eq!(signal.connection_count(), 0);
    }

    #[test]
    fn test_payload_reaches_every_slot() {
        let signal = Signal::<String>::new();
        let first = recorder(&signal);
        let second = recorder(&signal);

        signal.emit("foo".to_string());

        assert_eq!(*first.borrow(), ["foo"]);
        assert_eq!(*second.borrow(), ["foo"]);
    }

    #[test]
    fn test_slot_disconnecting_itself_runs_once() {
        let signal = Rc::new(Signal::<()>::new());
        let own_id = Rc::new(Cell::new(None));
        let runs = Rc::new(Cell::new(0));

        let id = {
            let inner_signal = signal.clone();
            let own_id = own_id.clone();
            let runs = runs.clone();
            signal.connect(move |_| {
                runs.set(runs.get() + 1);
                if let Some(id) = own_id.get() {
                    inner_signal.disconnect(id);
                }
            })
        };
        own_id.set(Some(id));

        signal.emit(());
        signal.emit(());
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn test_slot_connected_during_emit_waits_for_next_emit() {
        let signal = Rc::new(Signal::<u32>::new());
        let log = Rc::new(RefCell::new(Vec::new()));

        {
            let inner_signal = signal.clone();
            let log = log.clone();
            signal.connect(move |&n| {
                if n == 0 {
                    let log = log.clone();
                    inner_signal.connect(move |&m| log.borrow_mut().push(m));
                }
            });
        }

        signal.emit(0);
        assert!(log.borrow().is_empty());
        signal.emit(1);
        assert_eq!(*log.borrow(), [1]);
    }

    #[test]
    fn test_slot_may_emit_again() {
        let signal = Rc::new(Signal::<u32>::new());
        let log = Rc::new(RefCell::new(Vec::new()));

        {
            let inner_signal = signal.clone();
            let log = log.clone();
            signal.connect(move |&depth| {
                log.borrow_mut().push(depth);
                if depth < 2 {
                    inner_signal.emit(depth + 1);
                }
            });
        }

        signal.emit(0);
        assert_eq!(*log.borrow(), [0, 1, 2]);
    }
}
