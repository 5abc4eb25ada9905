use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use factline_core::{
    Attribute, CorrelationId, DomainResult, Entity, IdentifiableFact, Identifier, TypeShape,
    Versioned, append_specification, require_text,
};

use crate::command::Command;

/// An immutable domain fact.
///
/// Events are:
/// - **immutable** (built once, then only read)
/// - **versioned** (tagged with the structural hash of their type)
/// - designed to be **append-only**
///
/// Event-specific data travels in the `specification` attributes. Typed events
/// declare their own shape through [`Versioned`] and are built with
/// [`DomainEvent::of`]; ad hoc events built with [`DomainEvent::new`] carry the
/// hash of `DomainEvent` itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainEvent {
    identified_by: Entity,
    event_type: String,
    correlation_id: Option<CorrelationId>,
    occurred_at: DateTime<Utc>,
    specification: Vec<Attribute>,
    version_hash: String,
}

impl DomainEvent {
    /// Ad hoc event identified by `identified_by`, named `event_type`.
    pub fn new(identified_by: Entity, event_type: impl Into<String>) -> DomainResult<Self> {
        let event_type = event_type.into();
        require_text(&event_type, "event type")?;
        Ok(Self {
            identified_by,
            event_type,
            correlation_id: None,
            occurred_at: Utc::now(),
            specification: Vec::new(),
            version_hash: <Self as Versioned>::version_hash(),
        })
    }

    /// Event of the typed kind `K`: named after and versioned by `K`'s shape.
    pub fn of<K: Versioned>(identified_by: Entity) -> Self {
        Self {
            identified_by,
            event_type: K::type_shape().name().to_string(),
            correlation_id: None,
            occurred_at: Utc::now(),
            specification: Vec::new(),
            version_hash: K::version_hash(),
        }
    }

    pub fn with_correlation_id(mut self, correlation_id: CorrelationId) -> Self {
        self.correlation_id = Some(correlation_id);
        self
    }

    /// Correlate this event with the command that caused it.
    pub fn caused_by(self, command: &Command) -> Self {
        self.with_correlation_id(command.correlation_id())
    }

    /// Add (or replace, by name) one specification attribute.
    pub fn with_attribute(mut self, attribute: Attribute) -> Self {
        append_specification(&mut self.specification, attribute);
        self
    }

    pub fn with_specification(self, attributes: impl IntoIterator<Item = Attribute>) -> Self {
        attributes.into_iter().fold(self, Self::with_attribute)
    }

    pub fn with_occurred_at(mut self, occurred_at: DateTime<Utc>) -> Self {
        self.occurred_at = occurred_at;
        self
    }

    pub fn identified_by(&self) -> &Entity {
        &self.identified_by
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn correlation_id(&self) -> Option<CorrelationId> {
        self.correlation_id
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    pub fn specification(&self) -> &[Attribute] {
        &self.specification
    }

    /// Value of the specification attribute named `name`.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.specification
            .iter()
            .find(|a| a.name() == name)
            .map(Attribute::value)
    }

    /// Structural hash of this event's type.
    pub fn type_version(&self) -> &str {
        &self.version_hash
    }
}

impl IdentifiableFact for DomainEvent {
    fn identified(&self) -> Identifier {
        self.identified_by.identified()
    }
}

impl Versioned for DomainEvent {
    fn type_shape() -> TypeShape {
        TypeShape::new("DomainEvent")
            .field("identified_by", "Entity")
            .field("event_type", "String")
            .field("correlation_id", "CorrelationId")
            .field("occurred_at", "DateTime")
            .field("specification", "Vec")
            .field("version_hash", "String")
    }
}
