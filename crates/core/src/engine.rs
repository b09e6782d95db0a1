//! Engine traits.
//!
//! The binding never talks to a concrete database. It consumes these two
//! traits: a `Connection` that hands out live result sets by type name, and a
//! `Results` handle that can be refined, read, and observed.
//!
//! Handles are cheap to clone; a clone is the same handle (same id) and shares
//! the same listeners.

use crate::change::CollectionChange;
use crate::id::{ConnectionId, ListenerId, ResultsId};
use crate::sort::SortDescriptor;
use crate::value::Value;
use alloc::rc::Rc;
use alloc::vec::Vec;

/// Callback invoked with every change notification on a result set.
pub type ChangeListener = Rc<dyn Fn(&CollectionChange)>;

/// An open session against an embedded database.
pub trait Connection: Clone {
    /// Result-set handle produced by this connection.
    type Results: Results<Error = Self::Error>;
    /// Engine error, passed through the binding unmodified.
    type Error: core::error::Error + 'static;

    /// Returns the identity of this connection.
    fn id(&self) -> ConnectionId;

    /// Returns a live collection of all objects of the given type.
    fn objects(&self, type_name: &str) -> Result<Self::Results, Self::Error>;
}

/// A live, engine-managed view over stored objects.
pub trait Results: Clone {
    /// Item yielded when the view is read.
    type Item;
    /// Engine error.
    type Error: core::error::Error + 'static;

    /// Returns the identity of this handle.
    fn id(&self) -> ResultsId;

    /// Derives a new handle restricted by a filter expression.
    ///
    /// `args` are bound positionally to `$0`, `$1`, ... in the expression.
    fn filtered(&self, expression: &str, args: &[Value]) -> Result<Self, Self::Error>;

    /// Derives a new handle ordered by the descriptors, first one primary.
    fn sorted(&self, descriptors: &[SortDescriptor]) -> Result<Self, Self::Error>;

    /// Returns the number of objects currently in the view.
    fn len(&self) -> usize;

    /// Returns true if the view is currently empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the current contents of the view.
    fn to_vec(&self) -> Vec<Self::Item>;

    /// Registers a change listener and returns its deregistration token.
    fn add_listener(&self, listener: ChangeListener) -> Result<ListenerId, Self::Error>;

    /// Deregisters a listener. Returns true if it was registered.
    fn remove_listener(&self, id: ListenerId) -> bool;
}
