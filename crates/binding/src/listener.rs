//! Change subscriptions.
//!
//! A `ResultsListener` keeps at most one listener registered on one result-set
//! handle and turns change notifications into render requests. Notifications
//! that carry no change are dropped.

use crate::signal::RenderSignal;
use core::cell::Cell;
use core::fmt;
use livebind_core::{ChangeListener, CollectionChange, ListenerId, Results, ResultsId};
use std::rc::Rc;
use tracing::{debug, trace};

struct Registration<R> {
    handle: R,
    id: ListenerId,
    /// Cleared on detach so a delivery already in flight is ignored
    alive: Rc<Cell<bool>>,
}

/// Subscribes to one result-set handle at a time and requests renders.
///
/// Can be used on its own for handles obtained outside a `QueryBinding`.
pub struct ResultsListener<R: Results> {
    signal: Rc<dyn RenderSignal>,
    current: Option<Registration<R>>,
}

impl<R: Results> ResultsListener<R> {
    /// Creates a listener that reports to `signal`. Nothing is attached yet.
    pub fn new(signal: impl RenderSignal + 'static) -> Self {
        Self::with_shared(Rc::new(signal))
    }

    pub(crate) fn with_shared(signal: Rc<dyn RenderSignal>) -> Self {
        Self {
            signal,
            current: None,
        }
    }

    /// Subscribes to `results`, replacing the current subscription.
    ///
    /// Attaching the handle that is already attached does nothing. Otherwise
    /// the previous listener is removed before the new one is registered.
    pub fn attach(&mut self, results: Option<&R>) -> Result<(), R::Error> {
        if self.attached_id() == results.map(Results::id) {
            return Ok(());
        }
        self.detach();

        let Some(results) = results else {
            return Ok(());
        };
        let alive = Rc::new(Cell::new(true));
        let id = results.add_listener(render_on_change(self.signal.clone(), alive.clone()))?;
        debug!(results = %results.id(), listener = %id, "attached results listener");
        self.current = Some(Registration {
            handle: results.clone(),
            id,
            alive,
        });
        Ok(())
    }

    /// Removes the current listener, if any. Returns true if one was removed.
    pub fn detach(&mut self) -> bool {
        let Some(registration) = self.current.take() else {
            return false;
        };
        registration.alive.set(false);
        registration.handle.remove_listener(registration.id);
        debug!(
            results = %registration.handle.id(),
            listener = %registration.id,
            "detached results listener"
        );
        true
    }

    #[inline]
    pub fn is_attached(&self) -> bool {
        self.current.is_some()
    }

    /// Id of the attached handle.
    pub fn attached_id(&self) -> Option<ResultsId> {
        self.current.as_ref().map(|r| r.handle.id())
    }

    /// Id of the registered engine listener.
    pub fn listener_id(&self) -> Option<ListenerId> {
        self.current.as_ref().map(|r| r.id)
    }
}

/// Builds the engine callback: render iff the change is not empty.
fn render_on_change(signal: Rc<dyn RenderSignal>, alive: Rc<Cell<bool>>) -> ChangeListener {
    Rc::new(move |change: &CollectionChange| {
        if !alive.get() {
            return;
        }
        if change.len() == 0 {
            trace!("suppressed empty change notification");
            return;
        }
        trace!(
            insertions = change.insertions.len(),
            modifications = change.modifications.len(),
            deletions = change.deletions.len(),
            "requesting render"
        );
        signal.request_render();
    })
}

impl<R: Results> Drop for ResultsListener<R> {
    fn drop(&mut self) {
        self.detach();
    }
}

impl<R: Results> fmt::Debug for ResultsListener<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultsListener")
            .field("results", &self.attached_id())
            .field("listener", &self.listener_id())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_callback_suppresses_empty_changes() {
        let count = Rc::new(Cell::new(0));
        let counter = count.clone();
        let signal: Rc<dyn RenderSignal> = Rc::new(move || counter.set(counter.get() + 1));
        let alive = Rc::new(Cell::new(true));
        let callback = render_on_change(signal, alive.clone());

        callback(&CollectionChange::new());
        assert_eq!(count.get(), 0);

        let mut change = CollectionChange::new();
        change.insert(0);
        change.modify(2);
        callback(&change);
        assert_eq!(count.get(), 1);

        alive.set(false);
        callback(&change);
        assert_eq!(count.get(), 1);
    }
}
