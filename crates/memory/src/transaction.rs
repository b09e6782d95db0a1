//! Write transactions.
//!
//! A `Transaction` works on a staged copy of the committed store. Nothing it
//! does is visible to readers until `Database::write` commits the copy, and
//! dropping the copy is the whole rollback.

use crate::database::Database;
use crate::error::{Error, Result};
use crate::object::Object;
use crate::schema::{ObjectSchema, Property, PropertyType};
use crate::store::Store;
use hashbrown::HashMap;
use livebind_core::{DataType, Value};
use std::rc::Rc;
use tracing::trace;

/// What `create` does when an object with the same primary key exists.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UpdateMode {
    /// Fail with `Error::DuplicatePrimaryKey`.
    #[default]
    Never,
    /// Overwrite the given fields; fields that are left out keep their
    /// values. An update that changes nothing leaves the version alone.
    Modified,
}

/// A write transaction, handed to the closure of `Database::write`.
pub struct Transaction<'a> {
    db: &'a Database,
    store: Store,
    /// Number of effective operations
    ops: usize,
}

impl<'a> Transaction<'a> {
    pub(crate) fn new(db: &'a Database, store: Store) -> Self {
        Self { db, store, ops: 0 }
    }

    pub(crate) fn finish(self) -> (Store, usize) {
        (self.store, self.ops)
    }

    /// Creates an object, or updates it according to `mode`.
    ///
    /// Values are checked against the schema. Integers are widened for float
    /// properties, links must name an existing object, and stored properties
    /// left out of a new object get their type's default (null if optional).
    pub fn create<I, K, V>(&mut self, type_name: &str, fields: I, mode: UpdateMode) -> Result<Rc<Object>>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let db = self.db;
        let schema = db.schema_for(type_name)?;
        let values = self.check_fields(schema, fields)?;

        let key = match schema.primary_key_name() {
            Some(pk) => match values.get(pk) {
                Some(value) if !value.is_null() => value.clone(),
                _ => {
                    let expected = schema
                        .get_property(pk)
                        .and_then(|p| p.property_type().data_type())
                        .map_or("primary key", |dt| dt.name());
                    return Err(Error::type_mismatch(pk, expected, "null"));
                }
            },
            None => self.store.next_auto_key(),
        };

        if let Some(existing) = self.store.get(type_name, &key).cloned() {
            return match mode {
                UpdateMode::Never => Err(Error::DuplicatePrimaryKey {
                    type_name: type_name.into(),
                    key,
                }),
                UpdateMode::Modified => Ok(self.apply(&existing, &values)),
            };
        }

        let mut values = values;
        for property in schema.properties() {
            if property.property_type().is_computed() || values.contains_key(property.name()) {
                continue;
            }
            let default = match property.property_type().data_type() {
                Some(dt) if !property.is_optional() => Value::default_for_type(dt),
                _ => Value::Null,
            };
            values.insert(property.name().to_string(), default);
        }

        let version = self.store.next_version();
        let object = Rc::new(Object::new(type_name, key, version, values));
        self.store.table_mut(type_name).put(object.clone());
        self.ops += 1;
        trace!(type_name, key = %object.key(), version, "created object");
        Ok(object)
    }

    /// Updates fields of an existing object.
    ///
    /// The primary key cannot change. Returns the object as it is after the
    /// update.
    pub fn update<I, K, V>(&mut self, type_name: &str, key: impl Into<Value>, fields: I) -> Result<Rc<Object>>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let db = self.db;
        let schema = db.schema_for(type_name)?;
        let key = key.into();
        let existing = self
            .store
            .get(type_name, &key)
            .cloned()
            .ok_or_else(|| Error::not_found(type_name, key.clone()))?;

        let values = self.check_fields(schema, fields)?;
        if let Some(pk) = schema.primary_key_name() {
            if values.get(pk).map_or(false, |v| v != &key) {
                return Err(Error::ReadOnlyProperty {
                    type_name: type_name.into(),
                    property: pk.into(),
                });
            }
        }
        Ok(self.apply(&existing, &values))
    }

    /// Deletes an object by primary key and returns it.
    ///
    /// Links pointing at the deleted object are set to null.
    pub fn delete(&mut self, type_name: &str, key: impl Into<Value>) -> Result<Rc<Object>> {
        self.db.schema_for(type_name)?;
        let key = key.into();
        let removed = self
            .store
            .table_mut(type_name)
            .remove(&key)
            .ok_or_else(|| Error::not_found(type_name, key.clone()))?;
        self.ops += 1;
        trace!(type_name, key = %key, "deleted object");

        self.nullify_links(type_name, &key);
        Ok(removed)
    }

    /// Deletes every object of a type. Returns how many were deleted.
    pub fn delete_all(&mut self, type_name: &str) -> Result<usize> {
        self.db.schema_for(type_name)?;
        let keys: Vec<Value> = self
            .store
            .objects(type_name)
            .iter()
            .map(|o| o.key().clone())
            .collect();
        for key in &keys {
            self.delete(type_name, key.clone())?;
        }
        Ok(keys.len())
    }

    /// Looks up an object in the staged state, including this transaction's
    /// own writes.
    pub fn object_for_primary_key(
        &self,
        type_name: &str,
        key: impl Into<Value>,
    ) -> Result<Option<Rc<Object>>> {
        self.db.schema_for(type_name)?;
        Ok(self.store.get(type_name, &key.into()).cloned())
    }

    /// Number of staged objects of a type.
    pub fn count(&self, type_name: &str) -> Result<usize> {
        self.db.schema_for(type_name)?;
        Ok(self.store.objects(type_name).len())
    }

    /// Writes `values` over `existing`, bumping the version only if something
    /// changed.
    fn apply(&mut self, existing: &Rc<Object>, values: &HashMap<String, Value>) -> Rc<Object> {
        let version = self.store.next_version();
        match existing.updated(values, version) {
            Some(updated) => {
                let updated = Rc::new(updated);
                self.store
                    .table_mut(existing.type_name())
                    .put(updated.clone());
                self.ops += 1;
                trace!(type_name = existing.type_name(), key = %existing.key(), version, "updated object");
                updated
            }
            None => existing.clone(),
        }
    }

    fn check_fields<I, K, V>(&self, schema: &ObjectSchema, fields: I) -> Result<HashMap<String, Value>>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let mut values = HashMap::new();
        for (name, value) in fields {
            let name = name.into();
            let property = schema
                .get_property(&name)
                .ok_or_else(|| Error::unknown_property(schema.name(), &name))?;
            let value = self.check_value(schema, property, value.into())?;
            values.insert(name, value);
        }
        Ok(values)
    }

    fn check_value(&self, schema: &ObjectSchema, property: &Property, value: Value) -> Result<Value> {
        let got = || value.data_type().map_or("null", |dt| dt.name());
        match property.property_type() {
            PropertyType::LinkingObjects { .. } => Err(Error::ReadOnlyProperty {
                type_name: schema.name().into(),
                property: property.name().into(),
            }),
            _ if value.is_null() => {
                if property.is_optional() {
                    Ok(Value::Null)
                } else {
                    let expected = property.property_type().data_type().map_or("value", |dt| dt.name());
                    Err(Error::type_mismatch(property.name(), expected, "null"))
                }
            }
            PropertyType::Object(target) => {
                if self.store.get(target, &value).is_some() {
                    Ok(value)
                } else {
                    Err(Error::not_found(target.as_str(), value))
                }
            }
            other => {
                let Some(dt) = other.data_type() else {
                    return Err(Error::unknown_property(schema.name(), property.name()));
                };
                if !value.fits(dt) {
                    return Err(Error::type_mismatch(property.name(), dt.name(), got()));
                }
                Ok(match value {
                    Value::Int(i) if dt == DataType::Float => Value::Float(i as f64),
                    v => v,
                })
            }
        }
    }

    /// Sets every link to `type_name`/`key` to null.
    fn nullify_links(&mut self, type_name: &str, key: &Value) {
        let db = self.db;
        for schema in db.schemas() {
            for property in schema.properties() {
                if !matches!(property.property_type(), PropertyType::Object(t) if t == type_name) {
                    continue;
                }
                let linked: Vec<Rc<Object>> = self
                    .store
                    .objects(schema.name())
                    .iter()
                    .filter(|o| o.get(property.name()) == Some(key))
                    .cloned()
                    .collect();
                let mut cleared = HashMap::new();
                cleared.insert(property.name().to_string(), Value::Null);
                for object in linked {
                    self.apply(&object, &cleared);
                }
            }
        }
    }
}
