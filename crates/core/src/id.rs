//! Identity tokens for connections, result sets and listeners.
//!
//! Engine handles are not comparable by value, so every handle carries a
//! process-unique id. Two handles with the same id are the same handle.

use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);
static NEXT_RESULTS_ID: AtomicU64 = AtomicU64::new(1);
static NEXT_LISTENER_ID: AtomicU64 = AtomicU64::new(1);

macro_rules! handle_id {
    ($(#[$meta:meta])* $name:ident, $counter:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(u64);

        impl $name {
            /// Allocates the next unique id.
            pub fn next() -> Self {
                Self($counter.fetch_add(1, Ordering::SeqCst))
            }

            /// Returns the raw id.
            #[inline]
            pub fn get(&self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "#{}"), self.0)
            }
        }
    };
}

handle_id!(
    /// Identity of an open connection.
    ConnectionId,
    NEXT_CONNECTION_ID,
    "connection"
);

handle_id!(
    /// Identity of one result-set handle. Derived handles get fresh ids.
    ResultsId,
    NEXT_RESULTS_ID,
    "results"
);

handle_id!(
    /// Token returned by listener registration, used to deregister.
    ListenerId,
    NEXT_LISTENER_ID,
    "listener"
);
