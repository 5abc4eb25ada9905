//! Value object trait: equality by value, not identity.
//!
//! Value objects have **no identity**: they are defined entirely by their
//! attribute values, and two value objects with the same values are equal.

use serde::{Deserialize, Serialize};

use crate::error::{DomainResult, require_text};
use crate::version::{TypeShape, Versioned};

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value**. To "modify" one,
/// build a new one with the new values.
///
/// - **Value object**: `Attribute { name: "status", value: "open" }`
/// - **Entity**: identified by its identifiers whatever its other state
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}

/// Named, non-blank textual value carried by facts (event specification, etc.).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Attribute {
    name: String,
    value: String,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> DomainResult<Self> {
        let name = name.into();
        let value = value.into();
        require_text(&name, "attribute name")?;
        require_text(&value, "attribute value")?;
        Ok(Self { name, value })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

impl ValueObject for Attribute {}

impl Versioned for Attribute {
    fn type_shape() -> TypeShape {
        TypeShape::new("Attribute")
            .field("name", "String")
            .field("value", "String")
    }
}

/// Insert or replace (by name) an attribute inside a specification list.
///
/// Returns `true` when an existing attribute was replaced.
pub fn append_specification(specification: &mut Vec<Attribute>, attribute: Attribute) -> bool {
    match specification.iter_mut().find(|a| a.name == attribute.name) {
        Some(existing) => {
            *existing = attribute;
            true
        }
        None => {
            specification.push(attribute);
            false
        }
    }
}
