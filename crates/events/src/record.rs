use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

use factline_core::{IdentifiableFact, TypeShape, Versioned};

use crate::DomainEvent;

/// Failure to encode or decode an [`EventRecord`] body.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("event body serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The decoded body does not match the type version captured at append time.
    #[error("record {fact_id} was stored as type version {recorded} but decodes as {found}")]
    VersionMismatch {
        fact_id: String,
        recorded: String,
        found: String,
    },
}

/// Storage envelope for one [`DomainEvent`].
///
/// This is the unit a backend persists. It captures the event's structural
/// type version next to its serialized body so a single stream can hold
/// several event types (and several versions of one type) without losing
/// type fidelity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Combined identifier value of the wrapped event.
    fact_id: String,
    event_type: String,
    type_version: String,
    occurred_at: DateTime<Utc>,
    recorded_at: DateTime<Utc>,
    body: JsonValue,
}

impl EventRecord {
    pub fn new(event: &DomainEvent) -> Result<Self, RecordError> {
        Ok(Self {
            fact_id: event.identified().value().to_string(),
            event_type: event.event_type().to_string(),
            type_version: event.type_version().to_string(),
            occurred_at: event.occurred_at(),
            recorded_at: Utc::now(),
            body: serde_json::to_value(event)?,
        })
    }

    /// Decode the wrapped event, checking it against the recorded type version.
    pub fn decode(&self) -> Result<DomainEvent, RecordError> {
        let event: DomainEvent = serde_json::from_value(self.body.clone())?;
        if event.type_version() != self.type_version {
            return Err(RecordError::VersionMismatch {
                fact_id: self.fact_id.clone(),
                recorded: self.type_version.clone(),
                found: event.type_version().to_string(),
            });
        }
        Ok(event)
    }

    pub fn fact_id(&self) -> &str {
        &self.fact_id
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    /// Structural hash of the wrapped event's type.
    pub fn type_version(&self) -> &str {
        &self.type_version
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    pub fn recorded_at(&self) -> DateTime<Utc> {
        self.recorded_at
    }

    pub fn body(&self) -> &JsonValue {
        &self.body
    }

    /// Whether this record was written by the current shape of `K`.
    pub fn is_version_of<K: Versioned>(&self) -> bool {
        self.type_version == K::version_hash()
    }
}

impl Versioned for EventRecord {
    fn type_shape() -> TypeShape {
        TypeShape::new("EventRecord")
            .field("fact_id", "String")
            .field("event_type", "String")
            .field("type_version", "String")
            .field("occurred_at", "DateTime")
            .field("recorded_at", "DateTime")
            .field("body", "JsonValue")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use factline_core::{Attribute, Entity, Identifier};

    fn event() -> DomainEvent {
        DomainEvent::new(Entity::new(Identifier::new("uid", "e1").unwrap()), "ticket.opened")
            .unwrap()
            .with_attribute(Attribute::new("title", "Broken door").unwrap())
    }

    #[test]
    fn record_captures_identity_and_type_version() {
        let event = event();
        let record = EventRecord::new(&event).unwrap();
        assert_eq!(record.fact_id(), "e1");
        assert_eq!(record.event_type(), "ticket.opened");
        assert_eq!(record.type_version(), DomainEvent::version_hash());
        assert!(record.is_version_of::<DomainEvent>());
        assert_eq!(record.decode().unwrap(), event);
    }

    #[test]
    fn tampered_type_version_is_detected() {
        let mut record = EventRecord::new(&event()).unwrap();
        record.type_version = "stale".to_string();
        assert!(matches!(
            record.decode(),
            Err(RecordError::VersionMismatch { .. })
        ));
    }

    #[test]
    fn undecodable_body_is_a_serialization_error() {
        let mut record = EventRecord::new(&event()).unwrap();
        record.body = serde_json::json!({ "unexpected": true });
        assert!(matches!(record.decode(), Err(RecordError::Serialization(_))));
    }

    use proptest::prelude::*;

    proptest! {
        /// Property: whatever the specification holds, storage gives it back unchanged.
        #[test]
        fn specification_survives_storage(
            pairs in prop::collection::vec(("[a-z]{1,8}", "[a-zA-Z0-9][ -~]{0,15}"), 0..8)
        ) {
            let original = pairs.iter().fold(event(), |e, (name, value)| {
                e.with_attribute(Attribute::new(name.as_str(), value.as_str()).unwrap())
            });
            let restored = EventRecord::new(&original).unwrap().decode().unwrap();
            prop_assert_eq!(restored.specification(), original.specification());
        }
    }
}
