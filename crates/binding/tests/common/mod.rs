//! Shared fixture for livebind integration tests.
//!
//! Every fixture opens its own database path, seeded with two people
//! (`p1` aged 25, `p2` aged 35) and four tasks belonging to `p1`. The path is
//! closed and deleted when the fixture drops.

#![allow(dead_code)]

use livebind::{ConnectionProvider, QueryBinding, RenderFlag};
use livebind_core::Value;
use livebind_memory::{Config, Database, ObjectSchema, PropertyType, UpdateMode};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT: AtomicU64 = AtomicU64::new(0);

pub fn person_schema() -> ObjectSchema {
    ObjectSchema::new("Person")
        .primary_key("id")
        .property("id", PropertyType::String)
        .property("name", PropertyType::String)
        .property("age", PropertyType::Int)
        .linking_objects("tasks", "Task", "person")
}

pub fn task_schema() -> ObjectSchema {
    ObjectSchema::new("Task")
        .primary_key("id")
        .property("id", PropertyType::String)
        .property("description", PropertyType::String)
        .property("done", PropertyType::Bool)
        .property("person", PropertyType::Object("Person".into()))
}

pub struct Fixture {
    pub db: Database,
}

impl Fixture {
    pub fn new() -> Self {
        let path = format!("test-{}.realm", NEXT.fetch_add(1, Ordering::SeqCst));
        let db = Database::open(Config::new(path).schema(vec![person_schema(), task_schema()])).unwrap();
        db.write(|tx| {
            put_person(tx, "p1", "Person 1", 25)?;
            put_person(tx, "p2", "Person 2", 35)?;
            for (id, n, done) in [("p1r1", 1, true), ("p1t2", 2, true), ("p1t3", 3, false), ("p1t4", 4, false)] {
                tx.create(
                    "Task",
                    [
                        ("id", Value::from(id)),
                        ("description", Value::from(format!("Person 1 Task {n}"))),
                        ("done", Value::Bool(done)),
                        ("person", Value::from("p1")),
                    ],
                    UpdateMode::Never,
                )?;
            }
            Ok(())
        })
        .unwrap();
        Self { db }
    }

    /// Provider seeded with the fixture database.
    pub fn provider(&self) -> ConnectionProvider<Database> {
        ConnectionProvider::new(Some(self.db.clone()))
    }

    /// Binding on a fresh provider, with the flag it reports to.
    pub fn binding(&self) -> (QueryBinding<Database>, RenderFlag) {
        let flag = RenderFlag::new();
        let binding = QueryBinding::new(self.provider().context(), flag.clone());
        (binding, flag)
    }

    /// Upserts a person (partial fields keep their values).
    pub fn upsert(&self, fields: &[(&str, Value)]) {
        self.db
            .write(|tx| tx.create("Person", fields.iter().cloned(), UpdateMode::Modified))
            .unwrap();
    }

    pub fn delete_person(&self, id: &str) {
        self.db.write(|tx| tx.delete("Person", id)).unwrap();
    }
}

impl Drop for Fixture {
    fn drop(&mut self) {
        let path = self.db.path().to_string();
        self.db.close();
        if Database::exists(&path) {
            let _ = Database::delete_file(&path);
        }
    }
}

fn put_person(
    tx: &mut livebind_memory::Transaction<'_>,
    id: &str,
    name: &str,
    age: i64,
) -> livebind_memory::Result<()> {
    tx.create(
        "Person",
        [
            ("id", Value::from(id)),
            ("name", Value::from(name)),
            ("age", Value::Int(age)),
        ],
        UpdateMode::Modified,
    )
    .map(|_| ())
}

pub fn names(people: &livebind_memory::MemoryResults) -> Vec<String> {
    use livebind_core::Results;
    people
        .to_vec()
        .iter()
        .map(|p| p.get_str("name").unwrap_or_default().to_string())
        .collect()
}
