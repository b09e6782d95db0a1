//! Re-render signals.
//!
//! Bindings never render anything themselves. When a live result set changes
//! they call `RenderSignal::request_render` and leave scheduling to the host.

use core::cell::Cell;
use std::rc::Rc;

/// Receives re-render requests from a binding.
pub trait RenderSignal {
    /// Asks the host to re-evaluate the component owning the binding.
    fn request_render(&self);
}

impl<F: Fn()> RenderSignal for F {
    fn request_render(&self) {
        self()
    }
}

#[derive(Debug, Default)]
struct FlagState {
    dirty: Cell<bool>,
    requests: Cell<u64>,
}

/// Dirty flag for hosts that poll before painting.
///
/// Clones share the same flag, so one clone can be handed to a binding while
/// the host keeps another.
///
/// ```rust
/// use livebind::{RenderFlag, RenderSignal};
///
/// let flag = RenderFlag::new();
/// let handed_out = flag.clone();
/// handed_out.request_render();
/// handed_out.request_render();
///
/// assert_eq!(flag.requests(), 2);
/// assert!(flag.take());
/// assert!(!flag.take());
/// ```
#[derive(Clone, Debug, Default)]
pub struct RenderFlag {
    state: Rc<FlagState>,
}

impl RenderFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if a render was requested since the last `take`.
    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.state.dirty.get()
    }

    /// Total number of requests ever received.
    #[inline]
    pub fn requests(&self) -> u64 {
        self.state.requests.get()
    }

    /// Clears the flag, returning whether it was set.
    pub fn take(&self) -> bool {
        self.state.dirty.replace(false)
    }
}

impl RenderSignal for RenderFlag {
    fn request_render(&self) {
        self.state.dirty.set(true);
        self.state.requests.set(self.state.requests.get() + 1);
    }
}
