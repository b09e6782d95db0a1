//! Live query descriptions.
//!
//! A `QuerySpec` describes what a binding should show: a source, an optional
//! filter with its positional variables, and a sort order. It is a plain value;
//! the binding decides from it whether the previously derived result set can
//! be reused.

use livebind_core::{SortDescriptor, Value};

/// Where a query starts.
#[derive(Clone, Debug)]
pub enum Source<R> {
    /// All objects of the named type.
    Type(String),
    /// An existing result-set handle, such as a backlink collection.
    Results(R),
}

/// Parameters of a live query.
///
/// ```rust
/// use livebind::{QuerySpec, Source};
/// use livebind_core::{SortDescriptor, Value};
///
/// let spec: QuerySpec<()> = QuerySpec::objects("Person")
///     .with_filter("age > $0")
///     .with_variables([30])
///     .with_sort([("name", true)]);
///
/// assert!(matches!(spec.source(), Source::Type(name) if name == "Person"));
/// assert_eq!(spec.variables(), [Value::Int(30)]);
/// assert_eq!(spec.sort(), [SortDescriptor::desc("name")]);
/// ```
#[derive(Clone, Debug)]
pub struct QuerySpec<R> {
    source: Source<R>,
    source_key: Option<String>,
    filter: Option<String>,
    variables: Vec<Value>,
    sort: Vec<SortDescriptor>,
}

impl<R> QuerySpec<R> {
    /// Queries all objects of a type.
    pub fn objects(type_name: impl Into<String>) -> Self {
        Self::from_source(Source::Type(type_name.into()))
    }

    /// Queries an existing result-set handle.
    ///
    /// Handles have no stable identity across renders, so pair this with
    /// `with_source_key` to let the binding reuse its derived results.
    pub fn results(handle: R) -> Self {
        Self::from_source(Source::Results(handle))
    }

    pub fn from_source(source: Source<R>) -> Self {
        Self {
            source,
            source_key: None,
            filter: None,
            variables: Vec::new(),
            sort: Vec::new(),
        }
    }

    /// Sets the caller-chosen identity of a handle source.
    pub fn with_source_key(mut self, key: impl Into<String>) -> Self {
        self.source_key = Some(key.into());
        self
    }

    pub fn with_filter(mut self, expression: impl Into<String>) -> Self {
        self.filter = Some(expression.into());
        self
    }

    /// Sets the positional arguments of the filter (`$0`, `$1`, ...).
    pub fn with_variables<I, V>(mut self, variables: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.variables = variables.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the sort order, first descriptor primary.
    pub fn with_sort<I, S>(mut self, sort: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SortDescriptor>,
    {
        self.sort = sort.into_iter().map(Into::into).collect();
        self
    }

    #[inline]
    pub fn source(&self) -> &Source<R> {
        &self.source
    }

    #[inline]
    pub fn source_key(&self) -> Option<&str> {
        self.source_key.as_deref()
    }

    #[inline]
    pub fn filter(&self) -> Option<&str> {
        self.filter.as_deref()
    }

    #[inline]
    pub fn variables(&self) -> &[Value] {
        &self.variables
    }

    #[inline]
    pub fn sort(&self) -> &[SortDescriptor] {
        &self.sort
    }
}
