use std::collections::{HashMap, HashSet};
use std::sync::RwLock;
use std::time::Duration;

use chrono::{DateTime, Utc};

use factline_events::EventRecord;

use super::{SerializedResource, StorageBackend};
use crate::event_store::StoreError;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ResourceKey {
    namespace: String,
    id: String,
}

#[derive(Debug, Clone)]
struct StoredResource {
    resource: SerializedResource,
    expires_at: Option<DateTime<Utc>>,
}

impl StoredResource {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

/// In-memory storage backend.
///
/// Intended for tests/dev. Not optimized for performance.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    streams: RwLock<HashMap<String, Vec<EventRecord>>>,
    resources: RwLock<HashMap<ResourceKey, Vec<StoredResource>>>,
}

fn poisoned() -> StoreError {
    StoreError::unoperational("in-memory backend lock poisoned")
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored streams.
    pub fn stream_count(&self) -> Result<usize, StoreError> {
        Ok(self.streams.read().map_err(|_| poisoned())?.len())
    }
}

impl StorageBackend for InMemoryBackend {
    fn append(&self, stream: &str, records: Vec<EventRecord>) -> Result<(), StoreError> {
        if records.is_empty() {
            return Ok(());
        }
        // One write lock for the whole batch keeps it contiguous.
        let mut streams = self.streams.write().map_err(|_| poisoned())?;
        {
            let existing = streams.get(stream).map(Vec::as_slice).unwrap_or_default();
            let mut batch_ids = HashSet::with_capacity(records.len());
            for record in &records {
                let fact_id = record.fact_id();
                if !batch_ids.insert(fact_id) || existing.iter().any(|r| r.fact_id() == fact_id) {
                    return Err(StoreError::invalid_argument(format!(
                        "duplicate fact id '{fact_id}' in stream {stream}"
                    )));
                }
            }
        }

        streams.entry(stream.to_string()).or_default().extend(records);
        Ok(())
    }

    fn read_all_from(&self, stream: &str) -> Result<Option<Vec<EventRecord>>, StoreError> {
        let streams = self.streams.read().map_err(|_| poisoned())?;
        Ok(streams.get(stream).cloned())
    }

    fn read_all_after_change_id(&self, stream: &str, change_id: &str) -> Result<Option<Vec<EventRecord>>, StoreError> {
        let streams = self.streams.read().map_err(|_| poisoned())?;
        let Some(records) = streams.get(stream) else {
            return Ok(None);
        };
        let position = records
            .iter()
            .position(|r| r.fact_id() == change_id)
            .ok_or_else(|| StoreError::invalid_argument(format!("unknown change id '{change_id}' in stream {stream}")))?;
        Ok(Some(records[position + 1..].to_vec()))
    }

    fn read_range(&self, stream: &str, offset: usize, limit: usize) -> Result<Option<Vec<EventRecord>>, StoreError> {
        let streams = self.streams.read().map_err(|_| poisoned())?;
        Ok(streams
            .get(stream)
            .map(|records| records.iter().skip(offset).take(limit).cloned().collect()))
    }

    fn save_resource(
        &self,
        resource: SerializedResource,
        namespace: &str,
        expire_in: Option<Duration>,
    ) -> Result<(), StoreError> {
        let now = Utc::now();
        let expires_at = match expire_in {
            Some(ttl) => {
                let ttl = chrono::Duration::from_std(ttl)
                    .map_err(|e| StoreError::invalid_argument(format!("expiration out of range: {e}")))?;
                Some(now + ttl)
            }
            None => None,
        };
        let key = ResourceKey {
            namespace: namespace.to_string(),
            id: resource.descriptor.resource_id.clone(),
        };

        let mut resources = self.resources.write().map_err(|_| poisoned())?;
        let versions = resources.entry(key).or_default();
        versions.retain(|v| v.is_live(now));
        versions.push(StoredResource { resource, expires_at });
        Ok(())
    }

    fn read_serialized_resource_from_id(&self, id: &str, namespace: &str) -> Result<Option<SerializedResource>, StoreError> {
        let key = ResourceKey {
            namespace: namespace.to_string(),
            id: id.to_string(),
        };
        let now = Utc::now();
        let resources = self.resources.read().map_err(|_| poisoned())?;
        Ok(resources
            .get(&key)
            .and_then(|versions| versions.iter().rev().find(|v| v.is_live(now)))
            .map(|v| v.resource.clone()))
    }
}
