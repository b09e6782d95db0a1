//! Sort descriptors.

use alloc::string::{String, ToString};

/// One sort key: a property name and its direction.
///
/// A list of descriptors is applied in priority order, the first entry being
/// the primary key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SortDescriptor {
    /// Property to sort by
    pub field: String,
    /// True for descending order
    pub descending: bool,
}

impl SortDescriptor {
    /// Creates a descriptor with an explicit direction.
    pub fn new(field: impl Into<String>, descending: bool) -> Self {
        Self {
            field: field.into(),
            descending,
        }
    }

    /// Creates an ascending descriptor.
    pub fn asc(field: impl Into<String>) -> Self {
        Self::new(field, false)
    }

    /// Creates a descending descriptor.
    pub fn desc(field: impl Into<String>) -> Self {
        Self::new(field, true)
    }
}

impl From<&str> for SortDescriptor {
    fn from(field: &str) -> Self {
        Self::asc(field)
    }
}

impl From<(&str, bool)> for SortDescriptor {
    fn from((field, descending): (&str, bool)) -> Self {
        Self::new(field.to_string(), descending)
    }
}

impl From<(String, bool)> for SortDescriptor {
    fn from((field, descending): (String, bool)) -> Self {
        Self::new(field, descending)
    }
}
