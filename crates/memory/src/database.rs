//! Database handle.
//!
//! `Database` is a cheap, clonable handle on an open in-memory database. It
//! implements the `Connection` trait so the binding layer can derive live
//! result sets from it.
//!
//! Paths are tracked in a per-thread registry rather than on disk: reopening a
//! path restores its last committed objects, and `exists` / `delete_file` give
//! test fixtures the usual lifecycle.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::notify::ListenerRegistry;
use crate::object::Object;
use crate::results::{MemoryResults, Origin, Plan};
use crate::schema::{self, ObjectSchema, PropertyType};
use crate::store::Store;
use crate::transaction::Transaction;
use core::cell::{Cell, RefCell};
use core::fmt;
use hashbrown::HashMap;
use livebind_core::{ChangeListener, Connection, ConnectionId, ListenerId, ResultsId, Value};
use std::rc::{Rc, Weak};
use tracing::{debug, trace};

struct FileEntry {
    store: Store,
    open: Weak<Inner>,
}

thread_local! {
    static FILES: RefCell<HashMap<String, FileEntry>> = RefCell::new(HashMap::new());
}

pub(crate) struct Inner {
    id: ConnectionId,
    config: Config,
    schema: HashMap<String, ObjectSchema>,
    store: RefCell<Store>,
    listeners: RefCell<ListenerRegistry>,
    closed: Cell<bool>,
    writing: Cell<bool>,
    /// Commits not yet delivered to listeners
    pending: Cell<bool>,
    /// A notification round is running
    delivering: Cell<bool>,
}

/// Clears a busy flag even if the guarded code panics.
struct FlagGuard<'a>(&'a Cell<bool>);

impl Drop for FlagGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// Handle on an open in-memory database.
#[derive(Clone)]
pub struct Database {
    inner: Rc<Inner>,
}

impl Database {
    /// Opens the database at `config.path`.
    ///
    /// If the path is already open on this thread the existing database is
    /// returned. Otherwise a new one is created, seeded with the objects last
    /// committed under that path.
    pub fn open(config: Config) -> Result<Self> {
        let live = FILES.with(|files| {
            files
                .borrow()
                .get(&config.path)
                .and_then(|f| f.open.upgrade())
                .filter(|inner| !inner.closed.get())
        });
        if let Some(inner) = live {
            debug!(path = %config.path, connection = %inner.id, "reusing open database");
            return Ok(Self { inner });
        }

        schema::validate(&config.schema)?;
        let store = FILES.with(|files| {
            files
                .borrow()
                .get(&config.path)
                .map(|f| f.store.clone())
                .unwrap_or_default()
        });
        let schema = config
            .schema
            .iter()
            .map(|s| (s.name().to_string(), s.clone()))
            .collect();
        let inner = Rc::new(Inner {
            id: ConnectionId::next(),
            config,
            schema,
            store: RefCell::new(store.clone()),
            listeners: RefCell::new(ListenerRegistry::new()),
            closed: Cell::new(false),
            writing: Cell::new(false),
            pending: Cell::new(false),
            delivering: Cell::new(false),
        });
        FILES.with(|files| {
            files.borrow_mut().insert(
                inner.config.path.clone(),
                FileEntry {
                    store,
                    open: Rc::downgrade(&inner),
                },
            );
        });

        debug!(
            path = %inner.config.path,
            connection = %inner.id,
            types = inner.schema.len(),
            "opened database"
        );
        Ok(Self { inner })
    }

    /// Returns true if a database was ever opened at `path` and not deleted.
    pub fn exists(path: &str) -> bool {
        FILES.with(|files| files.borrow().contains_key(path))
    }

    /// Forgets everything stored under `path`.
    ///
    /// Fails if the path is still open. Deleting a missing path is a no-op.
    pub fn delete_file(path: &str) -> Result<()> {
        FILES.with(|files| {
            let mut files = files.borrow_mut();
            let in_use = files
                .get(path)
                .and_then(|f| f.open.upgrade())
                .map_or(false, |inner| !inner.closed.get());
            if in_use {
                return Err(Error::FileInUse { path: path.into() });
            }
            if files.remove(path).is_some() {
                debug!(path, "deleted database file");
            }
            Ok(())
        })
    }

    #[inline]
    pub fn path(&self) -> &str {
        &self.inner.config.path
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.inner.closed.get()
    }

    /// Closes the database and drops every listener. Idempotent.
    pub fn close(&self) {
        if self.inner.closed.replace(true) {
            return;
        }
        let dropped = self.inner.listeners.borrow().len();
        self.inner.listeners.borrow_mut().clear();
        debug!(path = %self.path(), connection = %self.inner.id, listeners = dropped, "closed database");
    }

    /// Returns true if no object of any type is stored.
    pub fn is_empty(&self) -> bool {
        self.inner.store.borrow().is_empty()
    }

    /// Looks up an object by primary key.
    pub fn object_for_primary_key(
        &self,
        type_name: &str,
        key: impl Into<Value>,
    ) -> Result<Option<Rc<Object>>> {
        self.check_open()?;
        self.schema_for(type_name)?;
        let key = key.into();
        Ok(self.inner.store.borrow().get(type_name, &key).cloned())
    }

    /// Returns the live backlink collection `property` of one object.
    ///
    /// For a `Person` declaring `tasks` as linking objects from `Task.person`,
    /// `linking_objects("Person", "p1", "tasks")` yields every task whose
    /// `person` is `p1`.
    pub fn linking_objects(
        &self,
        type_name: &str,
        key: impl Into<Value>,
        property: &str,
    ) -> Result<MemoryResults> {
        self.check_open()?;
        let schema = self.schema_for(type_name)?;
        let Some(PropertyType::LinkingObjects {
            object_type,
            property: origin,
        }) = schema.get_property(property).map(|p| p.property_type())
        else {
            return Err(Error::unknown_property(type_name, property));
        };

        let key = key.into();
        if self.inner.store.borrow().get(type_name, &key).is_none() {
            return Err(Error::not_found(type_name, key));
        }

        Ok(MemoryResults::new(
            self.clone(),
            Plan::new(Origin::Backlinks {
                object_type: object_type.clone(),
                property: origin.clone(),
                target: key,
            }),
        ))
    }

    /// Runs `f` inside a write transaction.
    ///
    /// Changes become visible when `f` returns `Ok`; an `Err` discards them.
    /// Every commit, even an empty one, produces a notification round.
    pub fn write<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Transaction<'_>) -> Result<T>,
    {
        self.check_open()?;
        if self.inner.writing.replace(true) {
            return Err(Error::NestedWrite);
        }
        let guard = FlagGuard(&self.inner.writing);

        let staged = self.inner.store.borrow().clone();
        let mut tx = Transaction::new(self, staged);
        let outcome = f(&mut tx);
        drop(guard);

        let value = match outcome {
            Ok(value) => value,
            Err(err) => {
                debug!(path = %self.path(), error = %err, "write rolled back");
                return Err(err);
            }
        };
        self.check_open()?;

        let (store, ops) = tx.finish();
        FILES.with(|files| {
            if let Some(file) = files.borrow_mut().get_mut(self.path()) {
                file.store = store.clone();
            }
        });
        *self.inner.store.borrow_mut() = store;
        self.inner.pending.set(true);
        debug!(path = %self.path(), ops, "write committed");

        if self.inner.config.auto_refresh {
            self.refresh();
        }
        Ok(value)
    }

    /// Delivers change notifications for commits made since the last refresh.
    ///
    /// Listeners are called in registration order, one at a time. A commit
    /// made from inside a listener is delivered after the current round has
    /// reached every listener. Returns false if there was nothing to deliver.
    pub fn refresh(&self) -> bool {
        if self.is_closed() || !self.inner.pending.get() {
            return false;
        }
        if self.inner.delivering.replace(true) {
            // The running round picks the commit up.
            return false;
        }
        let _guard = FlagGuard(&self.inner.delivering);

        while !self.is_closed() && self.inner.pending.replace(false) {
            let deliveries = {
                let store = self.inner.store.borrow();
                self.inner.listeners.borrow_mut().collect(&store)
            };
            for (id, callback, change) in deliveries {
                // A previous callback may have removed this listener.
                if !self.inner.listeners.borrow().contains(id) {
                    continue;
                }
                trace!(listener = %id, changes = change.len(), "delivering notification");
                callback(&change);
            }
        }
        true
    }

    /// Total number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.borrow().len()
    }

    pub(crate) fn check_open(&self) -> Result<()> {
        if self.is_closed() {
            Err(Error::closed(self.path()))
        } else {
            Ok(())
        }
    }

    pub(crate) fn schema_for(&self, type_name: &str) -> Result<&ObjectSchema> {
        self.inner
            .schema
            .get(type_name)
            .ok_or_else(|| Error::unknown_type(type_name))
    }

    pub(crate) fn schemas(&self) -> impl Iterator<Item = &ObjectSchema> {
        self.inner.schema.values()
    }

    /// Reads the committed store. Closed databases read as empty.
    pub(crate) fn read<T>(&self, f: impl FnOnce(&Store) -> T) -> T {
        if self.is_closed() {
            f(&Store::new())
        } else {
            f(&self.inner.store.borrow())
        }
    }

    pub(crate) fn register_listener(
        &self,
        owner: ResultsId,
        plan: Rc<Plan>,
        callback: ChangeListener,
    ) -> Result<ListenerId> {
        self.check_open()?;
        let baseline = plan.fingerprint(&self.inner.store.borrow());
        let id = self
            .inner
            .listeners
            .borrow_mut()
            .register(owner, plan, baseline, callback);
        debug!(results = %owner, listener = %id, "listener added");
        Ok(id)
    }

    pub(crate) fn unregister_listener(&self, id: ListenerId) -> bool {
        let removed = self.inner.listeners.borrow_mut().unregister(id);
        if removed {
            debug!(listener = %id, "listener removed");
        }
        removed
    }

    pub(crate) fn unregister_owner(&self, owner: ResultsId) -> usize {
        self.inner.listeners.borrow_mut().unregister_owner(owner)
    }

    pub(crate) fn listener_count_for(&self, owner: ResultsId) -> usize {
        self.inner.listeners.borrow().count_for(owner)
    }
}

impl Connection for Database {
    type Results = MemoryResults;
    type Error = Error;

    fn id(&self) -> ConnectionId {
        self.inner.id
    }

    fn objects(&self, type_name: &str) -> Result<MemoryResults> {
        self.check_open()?;
        self.schema_for(type_name)?;
        Ok(MemoryResults::new(
            self.clone(),
            Plan::new(Origin::Type(type_name.to_string())),
        ))
    }
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("id", &self.inner.id)
            .field("path", &self.path())
            .field("closed", &self.is_closed())
            .finish()
    }
}
