//! Committed object storage.
//!
//! `Store` keeps one `Table` per object type. Tables preserve insertion order
//! and index objects by primary key. Cloning a store is shallow (objects are
//! shared through `Rc`), which is how write transactions stage their changes.

use crate::object::Object;
use hashbrown::HashMap;
use livebind_core::Value;
use std::rc::Rc;

/// Objects of one type in insertion order.
#[derive(Clone, Debug, Default)]
pub(crate) struct Table {
    objects: Vec<Rc<Object>>,
    index: HashMap<Value, usize>,
}

impl Table {
    #[inline]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    #[inline]
    pub fn objects(&self) -> &[Rc<Object>] {
        &self.objects
    }

    pub fn get(&self, key: &Value) -> Option<&Rc<Object>> {
        self.index.get(key).map(|&pos| &self.objects[pos])
    }

    /// Inserts a new object or replaces the one with the same key in place.
    pub fn put(&mut self, object: Rc<Object>) {
        match self.index.get(object.key()) {
            Some(&pos) => self.objects[pos] = object,
            None => {
                self.index.insert(object.key().clone(), self.objects.len());
                self.objects.push(object);
            }
        }
    }

    /// Removes an object by key, keeping the order of the rest.
    pub fn remove(&mut self, key: &Value) -> Option<Rc<Object>> {
        let pos = self.index.remove(key)?;
        let removed = self.objects.remove(pos);
        for slot in self.index.values_mut() {
            if *slot > pos {
                *slot -= 1;
            }
        }
        Some(removed)
    }

    pub fn clear(&mut self) -> usize {
        let n = self.objects.len();
        self.objects.clear();
        self.index.clear();
        n
    }
}

/// All committed objects of a database.
#[derive(Clone, Debug)]
pub(crate) struct Store {
    tables: HashMap<String, Table>,
    next_version: u64,
    next_auto_key: i64,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    pub fn new() -> Self {
        Self {
            tables: HashMap::new(),
            next_version: 1,
            next_auto_key: 1,
        }
    }

    pub fn table(&self, type_name: &str) -> Option<&Table> {
        self.tables.get(type_name)
    }

    pub fn table_mut(&mut self, type_name: &str) -> &mut Table {
        self.tables.entry_ref(type_name).or_default()
    }

    /// Objects of a type, empty if none were ever stored.
    pub fn objects(&self, type_name: &str) -> &[Rc<Object>] {
        self.table(type_name).map(Table::objects).unwrap_or(&[])
    }

    pub fn get(&self, type_name: &str, key: &Value) -> Option<&Rc<Object>> {
        self.table(type_name).and_then(|t| t.get(key))
    }

    /// Allocates a version number for a new or updated object.
    pub fn next_version(&mut self) -> u64 {
        let v = self.next_version;
        self.next_version += 1;
        v
    }

    /// Allocates a key for an object type without a primary key.
    pub fn next_auto_key(&mut self) -> Value {
        let k = self.next_auto_key;
        self.next_auto_key += 1;
        Value::Int(k)
    }

    /// Returns true if no table holds any object.
    pub fn is_empty(&self) -> bool {
        self.tables.values().all(|t| t.len() == 0)
    }
}
