//! livebind Core - Shared types and engine traits for livebind.
//!
//! This crate provides the vocabulary the binding layer and database engines
//! agree on:
//!
//! - `Value`: Property values and filter arguments
//! - `DataType`: Scalar types of stored properties
//! - `SortDescriptor`: One `(field, descending)` sort key
//! - `CollectionChange`: Inserted / modified / deleted positions of a result set
//! - `ConnectionId`, `ResultsId`, `ListenerId`: Handle identities
//! - `Connection`, `Results`: The engine surface the binding consumes
//!
//! # Example
//!
//! ```rust
//! use livebind_core::{CollectionChange, SortDescriptor, Value};
//!
//! let sort: Vec<SortDescriptor> = vec![("age", true).into(), "name".into()];
//! assert!(sort[0].descending);
//! assert!(!sort[1].descending);
//!
//! let mut change = CollectionChange::new();
//! assert!(change.is_empty());
//! change.insert(0);
//! assert_eq!(change.len(), 1);
//!
//! assert!(Value::Int(30) < Value::Int(40));
//! ```

#![no_std]

extern crate alloc;

mod change;
mod engine;
mod id;
mod sort;
mod types;
mod value;

pub use change::CollectionChange;
pub use engine::{ChangeListener, Connection, Results};
pub use id::{ConnectionId, ListenerId, ResultsId};
pub use sort::SortDescriptor;
pub use types::DataType;
pub use value::Value;
