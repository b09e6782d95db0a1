//! Error types for the in-memory engine.

use livebind_core::Value;
use thiserror::Error;

/// Result type alias for engine operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Error types for engine operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Object type is not declared in the schema.
    #[error("Object type '{name}' is not part of the schema")]
    UnknownType { name: String },
    /// Property is not declared on the object type.
    #[error("Property '{property}' does not exist on '{type_name}'")]
    UnknownProperty { type_name: String, property: String },
    /// Computed property written to.
    #[error("Property '{property}' on '{type_name}' is read-only")]
    ReadOnlyProperty { type_name: String, property: String },
    /// Invalid schema definition.
    #[error("Invalid schema: {message}")]
    InvalidSchema { message: String },
    /// Malformed filter expression.
    #[error("Invalid filter at position {position}: {message}")]
    InvalidFilter { message: String, position: usize },
    /// Filter references a positional argument that was not supplied.
    #[error("Filter argument ${index} requested but {provided} argument(s) supplied")]
    MissingArgument { index: usize, provided: usize },
    /// Value does not match the property type.
    #[error("Property '{property}' expects {expected}, got {got}")]
    TypeMismatch {
        property: String,
        expected: String,
        got: String,
    },
    /// Primary key collision on create.
    #[error("Object of type '{type_name}' with primary key {key} already exists")]
    DuplicatePrimaryKey { type_name: String, key: Value },
    /// Object lookup by primary key failed.
    #[error("No object of type '{type_name}' with primary key {key}")]
    NotFound { type_name: String, key: Value },
    /// Operation on a closed database.
    #[error("Database at '{path}' is closed")]
    Closed { path: String },
    /// `write` called from inside a write transaction.
    #[error("Nested write transactions are not supported")]
    NestedWrite,
    /// `delete_file` on a path that is still open.
    #[error("Cannot delete '{path}' while it is open")]
    FileInUse { path: String },
}

impl Error {
    pub fn unknown_type(name: impl Into<String>) -> Self {
        Error::UnknownType { name: name.into() }
    }

    pub fn unknown_property(type_name: impl Into<String>, property: impl Into<String>) -> Self {
        Error::UnknownProperty {
            type_name: type_name.into(),
            property: property.into(),
        }
    }

    pub fn invalid_schema(message: impl Into<String>) -> Self {
        Error::InvalidSchema {
            message: message.into(),
        }
    }

    pub fn invalid_filter(message: impl Into<String>, position: usize) -> Self {
        Error::InvalidFilter {
            message: message.into(),
            position,
        }
    }

    pub fn type_mismatch(
        property: impl Into<String>,
        expected: impl Into<String>,
        got: impl Into<String>,
    ) -> Self {
        Error::TypeMismatch {
            property: property.into(),
            expected: expected.into(),
            got: got.into(),
        }
    }

    pub fn not_found(type_name: impl Into<String>, key: Value) -> Self {
        Error::NotFound {
            type_name: type_name.into(),
            key,
        }
    }

    pub fn closed(path: impl Into<String>) -> Self {
        Error::Closed { path: path.into() }
    }
}
