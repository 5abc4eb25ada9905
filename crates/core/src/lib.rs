//! `factline-core`: immutable identity and versioning building blocks.
//!
//! This crate contains **pure domain** primitives (no storage concerns).

pub mod aggregate;
pub mod entity;
pub mod error;
pub mod identifier;
pub mod property;
pub mod value_object;
pub mod version;

pub use aggregate::{Aggregate, AggregateRoot};
pub use entity::{Entity, IdentifiableFact};
pub use error::{DomainError, DomainResult, require_text};
pub use identifier::{CorrelationId, GENERIC_ID_NAME, IdentityEquality, Identifier};
pub use property::{HistoryState, MutableProperty, PropertyHistory, PropertyValue, VersionId};
pub use value_object::{Attribute, ValueObject, append_specification};
pub use version::{StructuralVersionStrategy, TypeShape, VersionStrategy, Versioned};
