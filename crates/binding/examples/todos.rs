//! Todo list demo.
//!
//! Two workspaces with three todos each, rendered as text. Every "component"
//! owns a `QueryBinding` and a `RenderFlag`; the host loop repaints only the
//! components whose flag is set.
//!
//! Run with `RUST_LOG=livebind=debug cargo run -p livebind --example todos`
//! to see subscriptions come and go.

use livebind::{ConnectionContext, ConnectionProvider, QueryBinding, QuerySpec, RenderFlag};
use livebind_core::{Results, SortDescriptor, Value};
use livebind_memory::{
    Config, Database, MemoryResults, Object, ObjectSchema, PropertyType, UpdateMode,
};
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Clone, Copy, Debug)]
enum Filter {
    All,
    Done,
    NotDone,
}

impl Filter {
    fn expression(self) -> Option<&'static str> {
        match self {
            Filter::All => None,
            Filter::Done => Some("doneAt != null"),
            Filter::NotDone => Some("doneAt = null"),
        }
    }
}

fn open_database() -> livebind_memory::Result<Database> {
    let db = Database::open(
        Config::new("todos.realm")
            .object(
                ObjectSchema::new("Workspace")
                    .primary_key("id")
                    .property("id", PropertyType::String)
                    .property("title", PropertyType::String)
                    .linking_objects("todos", "Todo", "workspace"),
            )
            .object(
                ObjectSchema::new("Todo")
                    .primary_key("id")
                    .property("id", PropertyType::String)
                    .property("title", PropertyType::String)
                    .optional_property("doneAt", PropertyType::Date)
                    .property("workspace", PropertyType::Object("Workspace".into())),
            ),
    )?;

    if db.is_empty() {
        db.write(|tx| {
            for id in ["personal", "work"] {
                let title = format!("{}{}", id[..1].to_uppercase(), &id[1..]);
                tx.create(
                    "Workspace",
                    [("id", Value::from(id)), ("title", Value::from(title.as_str()))],
                    UpdateMode::Never,
                )?;
                for n in 1..=3 {
                    tx.create(
                        "Todo",
                        [
                            ("id", Value::from(format!("{id}-{n}"))),
                            ("title", Value::from(format!("{title} Task {n}"))),
                            ("workspace", Value::from(id)),
                        ],
                        UpdateMode::Never,
                    )?;
                }
            }
            Ok(())
        })?;
    }
    Ok(db)
}

/// Todos of one workspace.
struct TodosList {
    workspace: String,
    binding: QueryBinding<Database>,
    flag: RenderFlag,
}

impl TodosList {
    fn new(context: ConnectionContext<Database>, workspace: &str) -> Self {
        let flag = RenderFlag::new();
        Self {
            workspace: workspace.to_string(),
            binding: QueryBinding::new(context, flag.clone()),
            flag,
        }
    }

    fn render(&mut self, filter: Filter) -> livebind_memory::Result<()> {
        let Some(db) = self.binding.context().get() else {
            println!("  (no database)");
            return Ok(());
        };
        let mut spec = QuerySpec::results(db.linking_objects("Workspace", self.workspace.as_str(), "todos")?)
            .with_source_key(format!("{}-todos", self.workspace));
        if let Some(expression) = filter.expression() {
            spec = spec.with_filter(expression);
        }

        if let Some(todos) = self.binding.evaluate(&spec)? {
            for todo in todos.to_vec() {
                let done = if todo.get("doneAt").map_or(false, |v| !v.is_null()) {
                    "x"
                } else {
                    " "
                };
                println!("  [{done}] {}", todo.get_str("title").unwrap_or_default());
            }
        }
        Ok(())
    }
}

fn now() -> Value {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis() as i64);
    Value::Date(millis)
}

fn toggle(db: &Database, todo: &Rc<Object>) -> livebind_memory::Result<()> {
    let next = match todo.get("doneAt") {
        Some(v) if !v.is_null() => Value::Null,
        _ => now(),
    };
    db.write(|tx| tx.update("Todo", todo.key().clone(), [("doneAt", next)]))?;
    Ok(())
}

fn workspaces(binding: &mut QueryBinding<Database>) -> livebind_memory::Result<Vec<Rc<Object>>> {
    let spec: QuerySpec<MemoryResults> =
        QuerySpec::objects("Workspace").with_sort([SortDescriptor::asc("id")]);
    Ok(binding
        .evaluate(&spec)?
        .map(|w| w.to_vec())
        .unwrap_or_default())
}

fn paint(
    screen: &mut QueryBinding<Database>,
    lists: &mut [TodosList],
    filter: Filter,
    force: bool,
) -> livebind_memory::Result<()> {
    for (workspace, list) in workspaces(screen)?.iter().zip(lists.iter_mut()) {
        let dirty = list.flag.take();
        if force || dirty {
            println!("{} ({filter:?})", workspace.get_str("title").unwrap_or_default());
            list.render(filter)?;
        }
    }
    Ok(())
}

fn main() -> livebind_memory::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let db = open_database()?;
    let provider = ConnectionProvider::new(Some(db.clone()));
    let screen_flag = RenderFlag::new();
    let mut screen = QueryBinding::new(provider.context(), screen_flag.clone());
    let mut lists: Vec<TodosList> = workspaces(&mut screen)?
        .iter()
        .filter_map(|w| w.get_str("id").map(|id| TodosList::new(provider.context(), id)))
        .collect();

    info!(workspaces = lists.len(), "initial render");
    paint(&mut screen, &mut lists, Filter::All, true)?;

    println!("\n-- complete the first personal task --");
    if let Some(todo) = db.object_for_primary_key("Todo", "personal-1")? {
        toggle(&db, &todo)?;
    }
    paint(&mut screen, &mut lists, Filter::All, false)?;

    println!("\n-- add a work task --");
    db.write(|tx| {
        tx.create(
            "Todo",
            [
                ("id", Value::from("work-4")),
                ("title", Value::from("Work Task 4")),
                ("workspace", Value::from("work")),
            ],
            UpdateMode::Never,
        )
    })?;
    paint(&mut screen, &mut lists, Filter::All, false)?;

    println!("\n-- show incomplete tasks only --");
    paint(&mut screen, &mut lists, Filter::NotDone, true)?;

    println!("\n-- show completed tasks only --");
    paint(&mut screen, &mut lists, Filter::Done, true)?;

    println!("\n-- a commit that changes nothing repaints nothing --");
    db.write(|_| Ok(()))?;
    paint(&mut screen, &mut lists, Filter::Done, false)?;
    info!(screen_renders = screen_flag.requests(), "done");

    provider.set_connection(None);
    drop(lists);
    drop(screen);
    db.close();
    Ok(())
}
