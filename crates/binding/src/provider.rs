//! Connection provider.

use crate::context::ConnectionContext;
use livebind_core::Connection;

/// Establishes one live `ConnectionContext` for a subtree of components.
///
/// The provider only holds the slot. Opening and closing the connection stays
/// with the caller.
///
/// ```rust
/// use livebind::ConnectionProvider;
/// use livebind_memory::{Config, Database};
///
/// let provider: ConnectionProvider<Database> = ConnectionProvider::new(None);
/// assert!(provider.connection().is_none());
///
/// let db = Database::open(Config::new("provider-doc.realm")).unwrap();
/// provider.set_connection(Some(db));
/// assert!(provider.context().get().is_some());
/// ```
#[derive(Debug)]
pub struct ConnectionProvider<C: Connection> {
    context: ConnectionContext<C>,
}

impl<C: Connection> ConnectionProvider<C> {
    /// Creates a provider seeded with an optional initial connection.
    pub fn new(initial: Option<C>) -> Self {
        Self {
            context: ConnectionContext::provided(initial),
        }
    }

    /// Returns a context handle for a descendant.
    pub fn context(&self) -> ConnectionContext<C> {
        self.context.clone()
    }

    /// Returns the current connection.
    pub fn connection(&self) -> Option<C> {
        self.context.get()
    }

    /// Replaces the connection. Returns true if it changed.
    pub fn set_connection(&self, connection: Option<C>) -> bool {
        self.context.set(connection)
    }
}

impl<C: Connection> Default for ConnectionProvider<C> {
    fn default() -> Self {
        Self::new(None)
    }
}
