//! Memoization keys.
//!
//! Two evaluations of a binding may reuse the same derived result set exactly
//! when their `IdentityKey`s are equal. The key is recomputed on every
//! evaluation from the connection identity and the query parameters.

use crate::query::{QuerySpec, Source};
use livebind_core::{ConnectionId, Results, ResultsId, SortDescriptor, Value};

/// Identity of a query source.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SourceIdentity {
    /// All objects of a type.
    Type(String),
    /// A handle source identified by its caller-provided key.
    Key(String),
    /// A handle source without a key. Every fresh handle changes this.
    Handle(ResultsId),
}

/// Value-equal identity of one derived result set.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct IdentityKey {
    connection: ConnectionId,
    source: SourceIdentity,
    filter: Option<String>,
    variables: Vec<Value>,
    sort: Vec<SortDescriptor>,
}

impl IdentityKey {
    /// Computes the key of `spec` evaluated against `connection`.
    pub fn new<R: Results>(connection: ConnectionId, spec: &QuerySpec<R>) -> Self {
        let source = match (spec.source(), spec.source_key()) {
            (Source::Type(name), _) => SourceIdentity::Type(name.clone()),
            (Source::Results(_), Some(key)) => SourceIdentity::Key(key.to_string()),
            (Source::Results(handle), None) => SourceIdentity::Handle(handle.id()),
        };
        Self {
            connection,
            source,
            filter: spec.filter().map(str::to_string),
            variables: spec.variables().to_vec(),
            sort: spec.sort().to_vec(),
        }
    }

    #[inline]
    pub fn connection(&self) -> ConnectionId {
        self.connection
    }

    #[inline]
    pub fn source(&self) -> &SourceIdentity {
        &self.source
    }

    /// Returns true if the source fell back to the raw handle identity.
    #[inline]
    pub fn is_handle_fallback(&self) -> bool {
        matches!(self.source, SourceIdentity::Handle(_))
    }
}
