//! Object schemas.
//!
//! An `ObjectSchema` names an object type, its primary key, and its typed
//! properties. Links to other objects store the target's primary key; linking
//! objects are computed backlinks and cannot be written.

use crate::error::{Error, Result};
use hashbrown::HashSet;
use livebind_core::DataType;

/// Type of a declared property.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PropertyType {
    Bool,
    Int,
    Float,
    String,
    Date,
    /// Link to an object of the named type, stored as its primary key.
    Object(String),
    /// Objects of `object_type` whose `property` links back to this object.
    LinkingObjects { object_type: String, property: String },
}

impl PropertyType {
    /// Returns the scalar data type, or None for links and backlinks.
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            PropertyType::Bool => Some(DataType::Bool),
            PropertyType::Int => Some(DataType::Int),
            PropertyType::Float => Some(DataType::Float),
            PropertyType::String => Some(DataType::String),
            PropertyType::Date => Some(DataType::Date),
            PropertyType::Object(_) | PropertyType::LinkingObjects { .. } => None,
        }
    }

    /// Returns true for computed properties that are never stored.
    #[inline]
    pub fn is_computed(&self) -> bool {
        matches!(self, PropertyType::LinkingObjects { .. })
    }
}

/// A property declaration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Property {
    name: String,
    property_type: PropertyType,
    optional: bool,
}

impl Property {
    pub fn new(name: impl Into<String>, property_type: PropertyType) -> Self {
        Self {
            name: name.into(),
            property_type,
            optional: false,
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn property_type(&self) -> &PropertyType {
        &self.property_type
    }

    /// Returns true if the property accepts null. Links are always nullable.
    #[inline]
    pub fn is_optional(&self) -> bool {
        self.optional || matches!(self.property_type, PropertyType::Object(_))
    }
}

/// Schema of one object type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectSchema {
    name: String,
    primary_key: Option<String>,
    properties: Vec<Property>,
}

impl ObjectSchema {
    /// Starts a schema for the named type.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            primary_key: None,
            properties: Vec::new(),
        }
    }

    /// Sets the primary key property.
    pub fn primary_key(mut self, property: impl Into<String>) -> Self {
        self.primary_key = Some(property.into());
        self
    }

    /// Adds a required property.
    pub fn property(mut self, name: impl Into<String>, property_type: PropertyType) -> Self {
        self.properties.push(Property::new(name, property_type));
        self
    }

    /// Adds a property that accepts null.
    pub fn optional_property(mut self, name: impl Into<String>, property_type: PropertyType) -> Self {
        let mut property = Property::new(name, property_type);
        property.optional = true;
        self.properties.push(property);
        self
    }

    /// Adds a backlink collection.
    pub fn linking_objects(
        self,
        name: impl Into<String>,
        object_type: impl Into<String>,
        property: impl Into<String>,
    ) -> Self {
        self.property(
            name,
            PropertyType::LinkingObjects {
                object_type: object_type.into(),
                property: property.into(),
            },
        )
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn primary_key_name(&self) -> Option<&str> {
        self.primary_key.as_deref()
    }

    #[inline]
    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    /// Gets a property by name.
    pub fn get_property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name() == name)
    }

    /// Gets a stored (non-computed) property by name, or fails.
    pub(crate) fn stored_property(&self, name: &str) -> Result<&Property> {
        match self.get_property(name) {
            Some(p) if !p.property_type().is_computed() => Ok(p),
            _ => Err(Error::unknown_property(&self.name, name)),
        }
    }
}

/// Validates a set of schemas against each other.
pub(crate) fn validate(schemas: &[ObjectSchema]) -> Result<()> {
    let mut names = HashSet::new();
    for schema in schemas {
        if schema.name.is_empty() {
            return Err(Error::invalid_schema("object type name cannot be empty"));
        }
        if !names.insert(schema.name.as_str()) {
            return Err(Error::invalid_schema(format!(
                "object type '{}' declared twice",
                schema.name
            )));
        }
    }

    for schema in schemas {
        let mut props = HashSet::new();
        for property in &schema.properties {
            if !props.insert(property.name()) {
                return Err(Error::invalid_schema(format!(
                    "property '{}.{}' declared twice",
                    schema.name,
                    property.name()
                )));
            }
            match property.property_type() {
                PropertyType::Object(target) => {
                    if !names.contains(target.as_str()) {
                        return Err(Error::invalid_schema(format!(
                            "'{}.{}' links to unknown type '{}'",
                            schema.name,
                            property.name(),
                            target
                        )));
                    }
                }
                PropertyType::LinkingObjects {
                    object_type,
                    property: origin,
                } => {
                    let source = schemas
                        .iter()
                        .find(|s| &s.name == object_type)
                        .ok_or_else(|| {
                            Error::invalid_schema(format!(
                                "'{}.{}' has backlinks from unknown type '{}'",
                                schema.name,
                                property.name(),
                                object_type
                            ))
                        })?;
                    let links_back = matches!(
                        source.get_property(origin).map(|p| p.property_type()),
                        Some(PropertyType::Object(target)) if target == &schema.name
                    );
                    if !links_back {
                        return Err(Error::invalid_schema(format!(
                            "'{}.{}' does not link to '{}'",
                            object_type, origin, schema.name
                        )));
                    }
                }
                _ => {}
            }
        }

        if let Some(pk) = &schema.primary_key {
            match schema.get_property(pk).map(|p| p.property_type()) {
                Some(PropertyType::Int) | Some(PropertyType::String) => {}
                Some(_) => {
                    return Err(Error::invalid_schema(format!(
                        "primary key '{}.{}' must be int or string",
                        schema.name, pk
                    )))
                }
                None => {
                    return Err(Error::invalid_schema(format!(
                        "primary key '{}' is not a property of '{}'",
                        pk, schema.name
                    )))
                }
            }
        }
    }

    Ok(())
}
