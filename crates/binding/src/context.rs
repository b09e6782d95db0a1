//! Connection context.
//!
//! A `ConnectionContext` is the slot through which components reach the open
//! connection of their subtree. It is injected explicitly: whoever builds a
//! binding hands it a context, and every clone of a context shares the same
//! slot. A context that no provider created is *detached*; it never holds a
//! connection and ignores writes.

use core::cell::{Cell, RefCell};
use core::fmt;
use hashbrown::HashMap;
use livebind_core::Connection;
use std::rc::Rc;
use tracing::debug;

/// Identifier of a context watcher.
pub type WatchId = u64;

/// Callback invoked after the connection of a context changes.
pub type WatchCallback = Rc<dyn Fn()>;

/// Tracks watchers of one context.
struct WatcherManager {
    watchers: HashMap<WatchId, WatchCallback>,
    next_id: WatchId,
}

impl WatcherManager {
    fn new() -> Self {
        Self {
            watchers: HashMap::new(),
            next_id: 1,
        }
    }

    fn watch(&mut self, callback: WatchCallback) -> WatchId {
        let id = self.next_id;
        self.next_id += 1;
        self.watchers.insert(id, callback);
        id
    }

    fn unwatch(&mut self, id: WatchId) -> bool {
        self.watchers.remove(&id).is_some()
    }

    /// Watchers in registration order.
    fn snapshot(&self) -> Vec<(WatchId, WatchCallback)> {
        let mut all: Vec<_> = self
            .watchers
            .iter()
            .map(|(id, cb)| (*id, cb.clone()))
            .collect();
        all.sort_unstable_by_key(|(id, _)| *id);
        all
    }
}

struct Slot<C> {
    connection: RefCell<Option<C>>,
    generation: Cell<u64>,
    watchers: RefCell<WatcherManager>,
}

/// Shared, observable slot holding the current connection.
pub struct ConnectionContext<C> {
    slot: Option<Rc<Slot<C>>>,
}

impl<C> Clone for ConnectionContext<C> {
    fn clone(&self) -> Self {
        Self {
            slot: self.slot.clone(),
        }
    }
}

impl<C> Default for ConnectionContext<C> {
    fn default() -> Self {
        Self::detached()
    }
}

impl<C> ConnectionContext<C> {
    /// Returns the context components see when no provider is present.
    pub fn detached() -> Self {
        Self { slot: None }
    }

    /// Creates a live context seeded with `initial`.
    pub(crate) fn provided(initial: Option<C>) -> Self {
        Self {
            slot: Some(Rc::new(Slot {
                connection: RefCell::new(initial),
                generation: Cell::new(0),
                watchers: RefCell::new(WatcherManager::new()),
            })),
        }
    }

    /// Returns true if this context was created by a provider.
    #[inline]
    pub fn is_provided(&self) -> bool {
        self.slot.is_some()
    }

    /// Number of effective changes so far. Always 0 when detached.
    pub fn generation(&self) -> u64 {
        self.slot.as_ref().map_or(0, |s| s.generation.get())
    }

    /// Calls `callback` after every effective change of the connection.
    ///
    /// Watching a detached context registers nothing and returns 0.
    pub fn watch(&self, callback: impl Fn() + 'static) -> WatchId {
        match &self.slot {
            Some(slot) => slot.watchers.borrow_mut().watch(Rc::new(callback)),
            None => 0,
        }
    }

    /// Removes a watcher. Returns true if it was registered.
    pub fn unwatch(&self, id: WatchId) -> bool {
        self.slot
            .as_ref()
            .map_or(false, |s| s.watchers.borrow_mut().unwatch(id))
    }

    /// Returns true if both contexts share the same slot.
    pub fn same_slot(&self, other: &Self) -> bool {
        match (&self.slot, &other.slot) {
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl<C: Connection> ConnectionContext<C> {
    /// Returns a clone of the current connection.
    pub fn get(&self) -> Option<C> {
        self.slot
            .as_ref()
            .and_then(|slot| slot.connection.borrow().clone())
    }

    /// Runs `f` with the current connection.
    ///
    /// `f` sees a snapshot and may call `set` on this context.
    pub fn consume<T>(&self, f: impl FnOnce(Option<&C>) -> T) -> T {
        let current = self.get();
        f(current.as_ref())
    }

    /// Replaces the connection and notifies watchers.
    ///
    /// Setting the connection that is already current (same `ConnectionId`,
    /// or `None` over `None`) changes nothing. Returns true if the value
    /// changed.
    pub fn set(&self, connection: Option<C>) -> bool {
        let Some(slot) = &self.slot else {
            debug!("ignoring connection change on a detached context");
            return false;
        };

        let next = connection.as_ref().map(Connection::id);
        {
            let mut current = slot.connection.borrow_mut();
            if current.as_ref().map(Connection::id) == next {
                return false;
            }
            *current = connection;
        }
        let generation = slot.generation.get() + 1;
        slot.generation.set(generation);

        let watchers = slot.watchers.borrow().snapshot();
        debug!(
            connection = ?next,
            generation,
            watchers = watchers.len(),
            "connection changed"
        );
        for (id, callback) in watchers {
            // An earlier watcher may have unwatched this one.
            if slot.watchers.borrow().watchers.contains_key(&id) {
                callback();
            }
        }
        true
    }
}

impl<C> fmt::Debug for ConnectionContext<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionContext")
            .field("provided", &self.is_provided())
            .field("generation", &self.generation())
            .finish()
    }
}
