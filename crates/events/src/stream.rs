use serde::{Deserialize, Serialize};

use factline_core::IdentifiableFact;

use crate::DomainEvent;

/// Ordered (oldest first) events of one aggregate, as returned by a load.
///
/// A stream always holds at least one event: "no events" is modelled as the
/// absence of a stream. Streams are built fresh on every load and expose no
/// mutating API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventStream {
    aggregate_id: String,
    version: String,
    commit_version: String,
    events: Vec<DomainEvent>,
}

impl EventStream {
    /// Build a stream, or `None` when `events` is empty.
    pub fn from_events(aggregate_id: impl Into<String>, events: Vec<DomainEvent>) -> Option<Self> {
        let last = events.last()?;
        let version = last.type_version().to_string();
        let commit_version = last.identified().value().to_string();
        Some(Self {
            aggregate_id: aggregate_id.into(),
            version,
            commit_version,
            events,
        })
    }

    pub fn aggregate_id(&self) -> &str {
        &self.aggregate_id
    }

    /// Structural hash of the last recorded event type.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Identifier value of the last event in the stream.
    pub fn commit_version(&self) -> &str {
        &self.commit_version
    }

    pub fn events(&self) -> &[DomainEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Always `false`; present for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn into_events(self) -> Vec<DomainEvent> {
        self.events
    }
}

impl<'a> IntoIterator for &'a EventStream {
    type Item = &'a DomainEvent;
    type IntoIter = core::slice::Iter<'a, DomainEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}
