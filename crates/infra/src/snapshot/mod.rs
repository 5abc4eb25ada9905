//! Aggregate snapshots.
//!
//! A snapshot is the serialized state of an aggregate at a known point of its
//! stream (the identifier of the last event it includes). Loading an aggregate
//! then only replays what came after that point.

pub mod process;
pub mod repository;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use factline_core::{TypeShape, Versioned};
use factline_events::EventStream;

use crate::event_store::StoreError;

pub use process::{AggregateRehydrator, Rehydrator, SnapshotProcess};
pub use repository::{BackendSnapshotRepository, SnapshotRepository};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    aggregate_id: String,
    /// Identifier value of the last event folded into `state`.
    commit_version: String,
    /// Version tag of the stream when the snapshot was taken.
    stream_version: String,
    taken_at: DateTime<Utc>,
    /// Structural hash of the state type.
    state_version: String,
    state: JsonValue,
}

impl Snapshot {
    /// Capture `state` as the result of replaying `stream`.
    pub fn capture<S>(stream: &EventStream, state: &S) -> Result<Self, StoreError>
    where
        S: Serialize + Versioned,
    {
        Ok(Self {
            aggregate_id: stream.aggregate_id().to_string(),
            commit_version: stream.commit_version().to_string(),
            stream_version: stream.version().to_string(),
            taken_at: Utc::now(),
            state_version: S::version_hash(),
            state: serde_json::to_value(state)?,
        })
    }

    /// Deserialize the captured state.
    ///
    /// Fails when the state type changed shape since the snapshot was taken.
    pub fn restore<S>(&self) -> Result<S, StoreError>
    where
        S: DeserializeOwned + Versioned,
    {
        let expected = S::version_hash();
        if self.state_version != expected {
            return Err(StoreError::unoperational(format!(
                "snapshot of {} holds state version {}, expected {expected}",
                self.aggregate_id, self.state_version
            )));
        }
        Ok(serde_json::from_value(self.state.clone())?)
    }

    pub fn aggregate_id(&self) -> &str {
        &self.aggregate_id
    }

    pub fn commit_version(&self) -> &str {
        &self.commit_version
    }

    pub fn stream_version(&self) -> &str {
        &self.stream_version
    }

    pub fn taken_at(&self) -> DateTime<Utc> {
        self.taken_at
    }

    pub fn state(&self) -> &JsonValue {
        &self.state
    }
}

impl Versioned for Snapshot {
    fn type_shape() -> TypeShape {
        TypeShape::new("Snapshot")
            .field("aggregate_id", "String")
            .field("commit_version", "String")
            .field("stream_version", "String")
            .field("taken_at", "DateTime<Utc>")
            .field("state_version", "String")
            .field("state", "JsonValue")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use factline_core::{Entity, Identifier};
    use factline_events::DomainEvent;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Tally {
        count: u32,
    }

    impl Versioned for Tally {
        fn type_shape() -> TypeShape {
            TypeShape::new("Tally").field("count", "u32")
        }
    }

    #[derive(Debug, Serialize, Deserialize)]
    struct Renamed {
        count: u32,
    }

    impl Versioned for Renamed {
        fn type_shape() -> TypeShape {
            TypeShape::new("Renamed").field("count", "u32")
        }
    }

    fn stream() -> EventStream {
        let event = DomainEvent::new(Entity::new(Identifier::new("uid", "e7").unwrap()), "tally.bumped").unwrap();
        EventStream::from_events("t1", vec![event]).unwrap()
    }

    #[test]
    fn captures_stream_position_and_state() {
        let snapshot = Snapshot::capture(&stream(), &Tally { count: 3 }).unwrap();
        assert_eq!(snapshot.aggregate_id(), "t1");
        assert_eq!(snapshot.commit_version(), "e7");
        assert_eq!(snapshot.stream_version(), DomainEvent::version_hash());
        assert_eq!(snapshot.restore::<Tally>().unwrap(), Tally { count: 3 });
    }

    #[test]
    fn restoring_into_another_shape_fails() {
        let snapshot = Snapshot::capture(&stream(), &Tally { count: 3 }).unwrap();
        let err = snapshot.restore::<Renamed>().unwrap_err();
        assert!(err.is_retryable());
    }
}
