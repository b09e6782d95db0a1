//! Database configuration.

use crate::schema::ObjectSchema;

/// Path used when none is configured.
pub const DEFAULT_PATH: &str = "default.realm";

/// Configuration for opening a `Database`.
///
/// ```rust
/// use livebind_memory::{Config, ObjectSchema, PropertyType};
///
/// let config = Config::new("todos.realm")
///     .object(ObjectSchema::new("Todo").property("title", PropertyType::String))
///     .auto_refresh(false);
/// assert_eq!(config.path, "todos.realm");
/// assert!(!config.auto_refresh);
/// ```
#[derive(Clone, Debug)]
pub struct Config {
    /// Path identifying the database file.
    pub path: String,
    /// Object types stored in the database.
    pub schema: Vec<ObjectSchema>,
    /// Deliver change notifications right after each commit. When false,
    /// notifications queue until `Database::refresh` is called.
    pub auto_refresh: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            path: DEFAULT_PATH.into(),
            schema: Vec::new(),
            auto_refresh: true,
        }
    }
}

impl Config {
    /// Creates a configuration for the given path.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Replaces the schema.
    pub fn schema(mut self, schema: Vec<ObjectSchema>) -> Self {
        self.schema = schema;
        self
    }

    /// Adds one object type to the schema.
    pub fn object(mut self, schema: ObjectSchema) -> Self {
        self.schema.push(schema);
        self
    }

    pub fn auto_refresh(mut self, enabled: bool) -> Self {
        self.auto_refresh = enabled;
        self
    }
}
