//! Live result sets.
//!
//! A `MemoryResults` is a handle on a `Plan`: where objects come from, which
//! filters they must pass, and how they are ordered. The plan is re-evaluated
//! on every read, so a handle always reflects the last committed state.
//! Refining a handle (`filtered`, `sorted`) produces a new handle with a new
//! id; cloning a handle keeps the id.

use crate::database::Database;
use crate::error::{Error, Result};
use crate::filter::{self, Expr};
use crate::notify::Fingerprint;
use crate::object::Object;
use crate::store::Store;
use core::cmp::Ordering;
use core::fmt;
use livebind_core::{ChangeListener, ListenerId, Results, ResultsId, SortDescriptor, Value};
use std::rc::Rc;
use tracing::debug;

/// Where the objects of a result set come from.
#[derive(Clone, Debug)]
pub(crate) enum Origin {
    /// Every object of a type.
    Type(String),
    /// Objects of `object_type` whose `property` links to `target`.
    Backlinks {
        object_type: String,
        property: String,
        target: Value,
    },
}

/// Evaluation plan of a result set.
#[derive(Clone, Debug)]
pub(crate) struct Plan {
    origin: Origin,
    filters: Vec<Rc<Expr>>,
    sort: Vec<SortDescriptor>,
}

impl Plan {
    pub fn new(origin: Origin) -> Self {
        Self {
            origin,
            filters: Vec::new(),
            sort: Vec::new(),
        }
    }

    /// Type of the objects this plan yields.
    pub fn item_type(&self) -> &str {
        match &self.origin {
            Origin::Type(name) => name,
            Origin::Backlinks { object_type, .. } => object_type,
        }
    }

    fn with_filter(&self, expr: Expr) -> Self {
        let mut plan = self.clone();
        plan.filters.push(Rc::new(expr));
        plan
    }

    fn with_sort(&self, sort: &[SortDescriptor]) -> Self {
        let mut plan = self.clone();
        plan.sort = sort.to_vec();
        plan
    }

    /// Evaluates the plan against a store.
    pub fn evaluate(&self, store: &Store) -> Vec<Rc<Object>> {
        let base = store.objects(self.item_type()).iter();
        let mut items: Vec<Rc<Object>> = match &self.origin {
            Origin::Type(_) => base
                .filter(|o| self.filters.iter().all(|f| f.matches(o)))
                .cloned()
                .collect(),
            Origin::Backlinks {
                property, target, ..
            } => base
                .filter(|o| o.get(property) == Some(target))
                .filter(|o| self.filters.iter().all(|f| f.matches(o)))
                .cloned()
                .collect(),
        };

        if !self.sort.is_empty() {
            items.sort_by(|a, b| compare_by(&self.sort, a, b));
        }
        items
    }

    /// `(key, version)` of every object the plan currently yields.
    pub fn fingerprint(&self, store: &Store) -> Fingerprint {
        self.evaluate(store)
            .iter()
            .map(|o| (o.key().clone(), o.version()))
            .collect()
    }
}

static NULL: Value = Value::Null;

/// Compares two objects by a list of sort descriptors, first one primary.
fn compare_by(sort: &[SortDescriptor], a: &Object, b: &Object) -> Ordering {
    for descriptor in sort {
        let av = a.get(&descriptor.field).unwrap_or(&NULL);
        let bv = b.get(&descriptor.field).unwrap_or(&NULL);
        let ord = if descriptor.descending {
            bv.cmp(av)
        } else {
            av.cmp(bv)
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

/// A live view over objects of a `Database`.
#[derive(Clone)]
pub struct MemoryResults {
    id: ResultsId,
    db: Database,
    plan: Rc<Plan>,
}

impl MemoryResults {
    pub(crate) fn new(db: Database, plan: Plan) -> Self {
        Self {
            id: ResultsId::next(),
            db,
            plan: Rc::new(plan),
        }
    }

    /// Type of the objects in this view.
    pub fn object_type(&self) -> &str {
        self.plan.item_type()
    }

    /// Returns the database this view reads from.
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Returns the object at `index`, if any.
    pub fn get(&self, index: usize) -> Option<Rc<Object>> {
        self.to_vec().into_iter().nth(index)
    }

    /// Removes every listener registered through this handle.
    pub fn remove_all_listeners(&self) -> usize {
        self.db.unregister_owner(self.id)
    }

    /// Number of listeners registered through this handle.
    pub fn listener_count(&self) -> usize {
        self.db.listener_count_for(self.id)
    }

    fn refine(&self, plan: Plan) -> Self {
        Self::new(self.db.clone(), plan)
    }
}

impl fmt::Debug for MemoryResults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryResults")
            .field("id", &self.id)
            .field("object_type", &self.object_type())
            .field("filters", &self.plan.filters.len())
            .field("sort", &self.plan.sort)
            .finish()
    }
}

impl Results for MemoryResults {
    type Item = Rc<Object>;
    type Error = Error;

    fn id(&self) -> ResultsId {
        self.id
    }

    fn filtered(&self, expression: &str, args: &[Value]) -> Result<Self> {
        self.db.check_open()?;
        let schema = self.db.schema_for(self.object_type())?;
        let expr = filter::parse(expression)?.bind(args)?;
        expr.validate(schema)?;
        debug!(results = %self.id, expression, args = args.len(), "filtered");
        Ok(self.refine(self.plan.with_filter(expr)))
    }

    fn sorted(&self, descriptors: &[SortDescriptor]) -> Result<Self> {
        self.db.check_open()?;
        let schema = self.db.schema_for(self.object_type())?;
        for descriptor in descriptors {
            schema.stored_property(&descriptor.field)?;
        }
        Ok(self.refine(self.plan.with_sort(descriptors)))
    }

    fn len(&self) -> usize {
        self.db.read(|store| self.plan.evaluate(store).len())
    }

    fn to_vec(&self) -> Vec<Rc<Object>> {
        self.db.read(|store| self.plan.evaluate(store))
    }

    fn add_listener(&self, listener: ChangeListener) -> Result<ListenerId> {
        self.db.register_listener(self.id, self.plan.clone(), listener)
    }

    fn remove_listener(&self, id: ListenerId) -> bool {
        self.db.unregister_listener(id)
    }
}
