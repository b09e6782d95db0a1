//! Property-based tests for livebind using proptest.

use livebind::{ConnectionProvider, QueryBinding, QuerySpec, RenderFlag};
use livebind_core::{Results, Value};
use livebind_memory::{Config, Database, MemoryResults, ObjectSchema, PropertyType, UpdateMode};
use proptest::prelude::*;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT: AtomicU64 = AtomicU64::new(0);

fn open() -> Database {
    let path = format!("binding-proptest-{}.realm", NEXT.fetch_add(1, Ordering::SeqCst));
    Database::open(
        Config::new(path).object(
            ObjectSchema::new("Person")
                .primary_key("id")
                .property("id", PropertyType::Int)
                .property("age", PropertyType::Int),
        ),
    )
    .unwrap()
}

#[derive(Clone, Debug)]
enum Op {
    Upsert(i64, i64),
    Delete(i64),
    Noop,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0i64..12, 0i64..80).prop_map(|(id, age)| Op::Upsert(id, age)),
        2 => (0i64..12).prop_map(Op::Delete),
        1 => Just(Op::Noop),
    ]
}

fn apply(db: &Database, op: &Op) {
    db.write(|tx| {
        match *op {
            Op::Upsert(id, age) => {
                tx.create(
                    "Person",
                    [("id", Value::Int(id)), ("age", Value::Int(age))],
                    UpdateMode::Modified,
                )?;
            }
            Op::Delete(id) => {
                if tx.object_for_primary_key("Person", id)?.is_some() {
                    tx.delete("Person", id)?;
                }
            }
            Op::Noop => {}
        }
        Ok(())
    })
    .unwrap();
}

fn snapshot(results: &MemoryResults) -> Vec<(Value, u64)> {
    results
        .to_vec()
        .iter()
        .map(|p| (p.key().clone(), p.version()))
        .collect()
}

proptest! {
    /// Test that a render is requested exactly when the visible rows change.
    #[test]
    fn render_iff_view_changed(ops in prop::collection::vec(op(), 1..40), min_age in 0i64..80) {
        let db = open();
        let provider = ConnectionProvider::new(Some(db.clone()));
        let flag = RenderFlag::new();
        let mut binding = QueryBinding::new(provider.context(), flag.clone());
        let spec = QuerySpec::objects("Person")
            .with_filter("age >= $0")
            .with_variables([min_age])
            .with_sort(["age"]);

        let mut before = snapshot(&binding.evaluate(&spec).unwrap().unwrap());
        for op in &ops {
            apply(&db, op);
            let rendered = flag.take();
            let view = binding.evaluate(&spec).unwrap().unwrap();
            let after = snapshot(&view);
            prop_assert_eq!(rendered, before != after);
            before = after;
        }
    }

    /// Test that equal specs always yield the same handle.
    #[test]
    fn equal_specs_reuse_handle(min_age in 0i64..80, repeats in 2usize..6) {
        let db = open();
        let provider = ConnectionProvider::new(Some(db.clone()));
        let mut binding = QueryBinding::new(provider.context(), RenderFlag::new());
        let ids: Vec<_> = (0..repeats)
            .map(|_| {
                let spec: QuerySpec<MemoryResults> = QuerySpec::objects("Person")
                    .with_filter("age >= $0")
                    .with_variables([min_age]);
                binding.evaluate(&spec).unwrap().unwrap().id()
            })
            .collect();
        prop_assert!(ids.windows(2).all(|w| w[0] == w[1]));
        prop_assert_eq!(db.listener_count(), 1);
    }
}
