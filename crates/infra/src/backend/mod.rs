//! Storage backend contract.
//!
//! The event store and the snapshot repository never talk to a database
//! directly; they go through a [`StorageBackend`], which offers two things:
//!
//! - append-only **streams** of [`EventRecord`]s, addressed by stream key
//! - versioned **resources** (serialized documents) addressed by id within a
//!   namespace, optionally expiring

pub mod in_memory;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use factline_events::EventRecord;

use crate::event_store::StoreError;

pub use in_memory::InMemoryBackend;

/// Metadata identifying one saved resource version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    pub resource_id: String,
    /// Structural hash of the serialized type.
    pub type_version: String,
    pub version_date: DateTime<Utc>,
    pub namespace: String,
}

/// A serialized document plus its descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedResource {
    pub descriptor: ResourceDescriptor,
    pub value: JsonValue,
}

pub trait StorageBackend: Send + Sync {
    /// Append `records` to `stream` as one contiguous batch.
    ///
    /// Fact ids are unique within a stream: a batch repeating an id, or
    /// carrying an id the stream already holds, is an argument error and
    /// nothing from it is written.
    fn append(&self, stream: &str, records: Vec<EventRecord>) -> Result<(), StoreError>;

    /// Every record of `stream`, oldest first; `None` when the stream is absent.
    fn read_all_from(&self, stream: &str) -> Result<Option<Vec<EventRecord>>, StoreError>;

    /// Records strictly after the one whose fact id is `change_id`.
    ///
    /// `None` when the stream is absent, an empty list when nothing follows,
    /// and an argument error when `change_id` is not in the stream.
    fn read_all_after_change_id(&self, stream: &str, change_id: &str) -> Result<Option<Vec<EventRecord>>, StoreError>;

    /// `limit` records starting at `offset`; `None` when the stream is absent.
    fn read_range(&self, stream: &str, offset: usize, limit: usize) -> Result<Option<Vec<EventRecord>>, StoreError> {
        Ok(self
            .read_all_from(stream)?
            .map(|records| records.into_iter().skip(offset).take(limit).collect()))
    }

    /// Save a new version of a resource; older versions are kept but superseded.
    fn save_resource(
        &self,
        resource: SerializedResource,
        namespace: &str,
        expire_in: Option<Duration>,
    ) -> Result<(), StoreError>;

    /// Latest unexpired version of resource `id` in `namespace`.
    fn read_serialized_resource_from_id(&self, id: &str, namespace: &str) -> Result<Option<SerializedResource>, StoreError>;
}

impl<B> StorageBackend for Arc<B>
where
    B: StorageBackend + ?Sized,
{
    fn append(&self, stream: &str, records: Vec<EventRecord>) -> Result<(), StoreError> {
        (**self).append(stream, records)
    }

    fn read_all_from(&self, stream: &str) -> Result<Option<Vec<EventRecord>>, StoreError> {
        (**self).read_all_from(stream)
    }

    fn read_all_after_change_id(&self, stream: &str, change_id: &str) -> Result<Option<Vec<EventRecord>>, StoreError> {
        (**self).read_all_after_change_id(stream, change_id)
    }

    fn read_range(&self, stream: &str, offset: usize, limit: usize) -> Result<Option<Vec<EventRecord>>, StoreError> {
        (**self).read_range(stream, offset, limit)
    }

    fn save_resource(
        &self,
        resource: SerializedResource,
        namespace: &str,
        expire_in: Option<Duration>,
    ) -> Result<(), StoreError> {
        (**self).save_resource(resource, namespace, expire_in)
    }

    fn read_serialized_resource_from_id(&self, id: &str, namespace: &str) -> Result<Option<SerializedResource>, StoreError> {
        (**self).read_serialized_resource_from_id(id, namespace)
    }
}
