//! livebind - Live query bindings for component-based UIs.
//!
//! This crate connects an embedded object database's live result sets to UI
//! components that re-render on demand:
//!
//! - `ConnectionProvider` / `ConnectionContext`: Explicitly injected slot
//!   holding the open connection of a subtree
//! - `QuerySpec`: Source, filter, variables and sort of a live query
//! - `QueryBinding`: Derives, memoizes and observes the result set of a query
//! - `ResultsListener`: One change subscription turned into render requests
//! - `RenderSignal` / `RenderFlag`: How bindings ask the host to render
//!
//! The database itself is reached through the `Connection` and `Results`
//! traits of `livebind-core`.
//!
//! # Example
//!
//! ```rust
//! use livebind::{ConnectionProvider, QueryBinding, QuerySpec, RenderFlag};
//! use livebind_core::{Results, Value};
//! use livebind_memory::{Config, Database, ObjectSchema, PropertyType, UpdateMode};
//!
//! let db = Database::open(
//!     Config::new("binding-doc.realm").object(
//!         ObjectSchema::new("Person")
//!             .primary_key("id")
//!             .property("id", PropertyType::String)
//!             .property("age", PropertyType::Int),
//!     ),
//! )
//! .unwrap();
//!
//! let provider = ConnectionProvider::new(Some(db.clone()));
//! let flag = RenderFlag::new();
//! let mut binding = QueryBinding::new(provider.context(), flag.clone());
//!
//! let spec = QuerySpec::objects("Person").with_filter("age > $0").with_variables([30]);
//! let people = binding.evaluate(&spec).unwrap().unwrap();
//! assert_eq!(people.len(), 0);
//!
//! db.write(|tx| {
//!     tx.create("Person", [("id", Value::from("p1")), ("age", Value::Int(40))], UpdateMode::Never)
//! })
//! .unwrap();
//!
//! assert!(flag.take());
//! assert_eq!(binding.evaluate(&spec).unwrap().unwrap().len(), 1);
//! ```

mod binding;
mod context;
mod identity;
mod listener;
mod provider;
mod query;
mod signal;

pub use binding::{derive_results, QueryBinding};
pub use context::{ConnectionContext, WatchCallback, WatchId};
pub use identity::{IdentityKey, SourceIdentity};
pub use listener::ResultsListener;
pub use provider::ConnectionProvider;
pub use query::{QuerySpec, Source};
pub use signal::{RenderFlag, RenderSignal};
