//! Stored objects.
//!
//! An `Object` is an immutable snapshot of one stored record. Writes replace
//! the snapshot with a new one carrying a higher version, so readers holding
//! an `Rc<Object>` never observe a half-applied transaction.

use hashbrown::HashMap;
use livebind_core::Value;

/// A stored object of some declared type.
#[derive(Clone, Debug, PartialEq)]
pub struct Object {
    /// Declared type name.
    type_name: String,
    /// Primary key (or a generated key for types without one).
    key: Value,
    /// Version for change detection. Bumped on every effective update.
    version: u64,
    /// Stored property values by name.
    fields: HashMap<String, Value>,
}

impl Object {
    pub(crate) fn new(
        type_name: impl Into<String>,
        key: Value,
        version: u64,
        fields: HashMap<String, Value>,
    ) -> Self {
        Self {
            type_name: type_name.into(),
            key,
            version,
            fields,
        }
    }

    #[inline]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Returns the primary key.
    #[inline]
    pub fn key(&self) -> &Value {
        &self.key
    }

    /// Returns the version number.
    #[inline]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Gets a property value by name.
    #[inline]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Gets a string property.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    /// Gets an integer property.
    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Value::as_i64)
    }

    /// Gets a boolean property.
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(Value::as_bool)
    }

    /// Returns all stored fields.
    #[inline]
    pub fn fields(&self) -> &HashMap<String, Value> {
        &self.fields
    }

    /// Returns a copy with the given fields overwritten, or None if every
    /// given value equals the stored one.
    pub(crate) fn updated(&self, changes: &HashMap<String, Value>, version: u64) -> Option<Self> {
        let differs = changes
            .iter()
            .any(|(name, value)| self.fields.get(name) != Some(value));
        if !differs {
            return None;
        }
        let mut fields = self.fields.clone();
        for (name, value) in changes {
            fields.insert(name.clone(), value.clone());
        }
        Some(Self::new(self.type_name.clone(), self.key.clone(), version, fields))
    }
}
