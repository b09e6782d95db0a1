//! Listener registry and change computation.
//!
//! Every registered listener remembers the `(key, version)` list its result
//! set had when it was last notified. After a commit the registry re-evaluates
//! each listener's plan and diffs the two lists into a `CollectionChange`.

use crate::results::Plan;
use crate::store::Store;
use hashbrown::{HashMap, HashSet};
use livebind_core::{ChangeListener, CollectionChange, ListenerId, ResultsId, Value};
use std::rc::Rc;

/// `(primary key, version)` per position of a result set.
pub(crate) type Fingerprint = Vec<(Value, u64)>;

/// A pending delivery: listener, its callback, and the change to report.
pub(crate) type Delivery = (ListenerId, ChangeListener, CollectionChange);

struct ListenerEntry {
    /// Result-set handle the listener was registered through
    owner: ResultsId,
    plan: Rc<Plan>,
    baseline: Fingerprint,
    callback: ChangeListener,
}

/// Registered change listeners of one database.
#[derive(Default)]
pub(crate) struct ListenerRegistry {
    entries: HashMap<ListenerId, ListenerEntry>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        owner: ResultsId,
        plan: Rc<Plan>,
        baseline: Fingerprint,
        callback: ChangeListener,
    ) -> ListenerId {
        let id = ListenerId::next();
        self.entries.insert(
            id,
            ListenerEntry {
                owner,
                plan,
                baseline,
                callback,
            },
        );
        id
    }

    /// Removes one listener. Returns true if it was registered.
    pub fn unregister(&mut self, id: ListenerId) -> bool {
        self.entries.remove(&id).is_some()
    }

    /// Removes every listener registered through `owner`.
    pub fn unregister_owner(&mut self, owner: ResultsId) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, e| e.owner != owner);
        before - self.entries.len()
    }

    #[inline]
    pub fn contains(&self, id: ListenerId) -> bool {
        self.entries.contains_key(&id)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Number of listeners registered through `owner`.
    pub fn count_for(&self, owner: ResultsId) -> usize {
        self.entries.values().filter(|e| e.owner == owner).count()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Computes the change of every listener against `store` and advances
    /// each baseline. Deliveries come back in registration order.
    pub fn collect(&mut self, store: &Store) -> Vec<Delivery> {
        let mut ids: Vec<ListenerId> = self.entries.keys().copied().collect();
        ids.sort_unstable();

        let mut deliveries = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(entry) = self.entries.get_mut(&id) {
                let current = entry.plan.fingerprint(store);
                let change = diff(&entry.baseline, &current);
                entry.baseline = current;
                deliveries.push((id, entry.callback.clone(), change));
            }
        }
        deliveries
    }
}

/// Diffs two fingerprints of the same result set.
///
/// Deletions index into `old`; insertions and modifications index into `new`.
pub(crate) fn diff(old: &[(Value, u64)], new: &[(Value, u64)]) -> CollectionChange {
    let previous: HashMap<&Value, u64> = old.iter().map(|(k, v)| (k, *v)).collect();
    let next: HashSet<&Value> = new.iter().map(|(k, _)| k).collect();

    let mut change = CollectionChange::new();
    for (index, (key, _)) in old.iter().enumerate() {
        if !next.contains(key) {
            change.delete(index);
        }
    }
    for (index, (key, version)) in new.iter().enumerate() {
        match previous.get(key) {
            None => change.insert(index),
            Some(v) if v != version => change.modify(index),
            Some(_) => {}
        }
    }
    change
}
