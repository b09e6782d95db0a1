//! Query bindings.
//!
//! A `QueryBinding` is the per-component state behind a live query. Each
//! evaluation reads the connection from the context, derives (or reuses) the
//! result set for the given `QuerySpec`, and keeps exactly one change listener
//! on it. When the result set changes, or the context switches connections,
//! the binding asks the host to render again; the host answers by calling
//! `evaluate` once more.

use crate::context::{ConnectionContext, WatchId};
use crate::identity::IdentityKey;
use crate::listener::ResultsListener;
use crate::query::{QuerySpec, Source};
use crate::signal::RenderSignal;
use core::fmt;
use livebind_core::{Connection, Results};
use std::rc::Rc;
use tracing::{debug, warn};

/// Derives the result set described by `spec` from `connection`.
///
/// The base collection is refined by the filter (if any) and then by the sort
/// order (if non-empty).
pub fn derive_results<C: Connection>(
    connection: &C,
    spec: &QuerySpec<C::Results>,
) -> Result<C::Results, C::Error> {
    let mut results = match spec.source() {
        Source::Type(name) => connection.objects(name)?,
        Source::Results(handle) => handle.clone(),
    };
    if let Some(filter) = spec.filter() {
        results = results.filtered(filter, spec.variables())?;
    }
    if !spec.sort().is_empty() {
        results = results.sorted(spec.sort())?;
    }
    Ok(results)
}

/// Live query state of one component.
pub struct QueryBinding<C: Connection> {
    context: ConnectionContext<C>,
    listener: ResultsListener<C::Results>,
    cache: Option<(IdentityKey, C::Results)>,
    watch: WatchId,
    /// Missing `source_key` already reported
    warned: bool,
}

impl<C: Connection> QueryBinding<C> {
    /// Creates a binding reading from `context` and reporting to `signal`.
    pub fn new(context: ConnectionContext<C>, signal: impl RenderSignal + 'static) -> Self {
        let signal: Rc<dyn RenderSignal> = Rc::new(signal);
        let on_swap = signal.clone();
        let watch = context.watch(move || on_swap.request_render());
        Self {
            context,
            listener: ResultsListener::with_shared(signal),
            cache: None,
            watch,
            warned: false,
        }
    }

    /// Returns the live result set for `spec`.
    ///
    /// Returns `Ok(None)` while the context holds no connection. Engine
    /// errors are returned as-is and leave the previous result set and its
    /// subscription in place.
    pub fn evaluate(&mut self, spec: &QuerySpec<C::Results>) -> Result<Option<C::Results>, C::Error> {
        let Some(connection) = self.context.get() else {
            self.teardown();
            return Ok(None);
        };

        let key = IdentityKey::new(connection.id(), spec);
        if key.is_handle_fallback() && !self.warned {
            self.warned = true;
            warn!(
                "query source is a results handle without a source_key; \
                 results are re-derived whenever the handle changes"
            );
        }

        if let Some((cached, results)) = &self.cache {
            if *cached == key {
                return Ok(Some(results.clone()));
            }
        }

        let results = derive_results(&connection, spec)?;
        if let Err(err) = self.listener.attach(Some(&results)) {
            // The old subscription is already gone; force a retry next time.
            self.cache = None;
            return Err(err);
        }
        debug!(
            connection = %key.connection(),
            source = ?key.source(),
            results = %results.id(),
            "derived results"
        );
        self.cache = Some((key, results.clone()));
        Ok(Some(results))
    }

    /// Returns the cached result set, if any.
    pub fn current(&self) -> Option<&C::Results> {
        self.cache.as_ref().map(|(_, results)| results)
    }

    /// Returns the context this binding reads from.
    pub fn context(&self) -> &ConnectionContext<C> {
        &self.context
    }

    /// Returns true if a change listener is registered.
    pub fn is_subscribed(&self) -> bool {
        self.listener.is_attached()
    }

    /// Drops the cached result set and its listener.
    ///
    /// The binding stays usable; the next evaluation derives afresh.
    pub fn unmount(&mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        self.listener.detach();
        if self.cache.take().is_some() {
            debug!("dropped cached results");
        }
    }
}

impl<C: Connection> Drop for QueryBinding<C> {
    fn drop(&mut self) {
        self.context.unwatch(self.watch);
        self.teardown();
    }
}

impl<C: Connection> fmt::Debug for QueryBinding<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryBinding")
            .field("context", &self.context)
            .field("cached", &self.cache.as_ref().map(|(k, _)| k))
            .field("listener", &self.listener)
            .finish()
    }
}
