//! livebind Memory - In-memory object database for livebind.
//!
//! This crate implements the `Connection` / `Results` engine traits over a
//! single-threaded in-memory store:
//!
//! - `Config`: Path, schema and notification delivery settings
//! - `ObjectSchema`: Typed object declarations with links and backlinks
//! - `Database`: Open handle with write transactions and queries
//! - `Transaction`: Create / update / delete inside `Database::write`
//! - `MemoryResults`: Live, filterable, sortable result sets with listeners
//! - `filter`: The predicate language accepted by `Results::filtered`
//!
//! # Example
//!
//! ```rust
//! use livebind_core::{Connection, Results, SortDescriptor, Value};
//! use livebind_memory::{Config, Database, ObjectSchema, PropertyType, UpdateMode};
//!
//! let db = Database::open(
//!     Config::new("lib-doc.realm").object(
//!         ObjectSchema::new("Person")
//!             .primary_key("id")
//!             .property("id", PropertyType::String)
//!             .property("age", PropertyType::Int),
//!     ),
//! )
//! .unwrap();
//!
//! db.write(|tx| {
//!     tx.create("Person", [("id", Value::from("p1")), ("age", Value::Int(25))], UpdateMode::Never)?;
//!     tx.create("Person", [("id", Value::from("p2")), ("age", Value::Int(35))], UpdateMode::Never)?;
//!     Ok(())
//! })
//! .unwrap();
//!
//! let people = db.objects("Person").unwrap();
//! let older = people
//!     .filtered("age > $0", &[Value::Int(30)])
//!     .unwrap()
//!     .sorted(&[SortDescriptor::desc("age")])
//!     .unwrap();
//! assert_eq!(older.len(), 1);
//! assert_eq!(older.to_vec()[0].get_str("id"), Some("p2"));
//! ```

mod config;
mod database;
mod error;
pub mod filter;
mod notify;
mod object;
mod results;
mod schema;
mod store;
mod transaction;

pub use config::{Config, DEFAULT_PATH};
pub use database::Database;
pub use error::{Error, Result};
pub use object::Object;
pub use results::MemoryResults;
pub use schema::{ObjectSchema, Property, PropertyType};
pub use transaction::{Transaction, UpdateMode};
