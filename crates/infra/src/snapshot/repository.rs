use std::time::Duration;

use factline_core::{Versioned, require_text};

use super::Snapshot;
use crate::backend::{ResourceDescriptor, SerializedResource, StorageBackend};
use crate::event_store::StoreError;

/// Persistence of aggregate snapshots.
pub trait SnapshotRepository: Send + Sync {
    /// Latest unexpired snapshot of aggregate `id` in `namespace`.
    fn get_latest_snapshot_by_id(&self, id: &str, namespace: &str) -> Result<Option<Snapshot>, StoreError>;

    /// Save `snapshot`; it supersedes earlier ones and disappears after `expire_in`.
    fn save_snapshot(&self, snapshot: &Snapshot, namespace: &str, expire_in: Option<Duration>) -> Result<(), StoreError>;
}

/// [`SnapshotRepository`] storing snapshots as backend resources.
#[derive(Debug, Clone, Default)]
pub struct BackendSnapshotRepository<B> {
    backend: B,
}

impl<B: StorageBackend> BackendSnapshotRepository<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}

impl<B: StorageBackend> SnapshotRepository for BackendSnapshotRepository<B> {
    fn get_latest_snapshot_by_id(&self, id: &str, namespace: &str) -> Result<Option<Snapshot>, StoreError> {
        require_text(id, "snapshot id")?;
        require_text(namespace, "snapshot namespace")?;
        let Some(resource) = self.backend.read_serialized_resource_from_id(id, namespace)? else {
            return Ok(None);
        };
        if resource.descriptor.type_version != Snapshot::version_hash() {
            return Err(StoreError::unoperational(format!(
                "resource {id} in {namespace} is not a snapshot (type version {})",
                resource.descriptor.type_version
            )));
        }
        Ok(Some(serde_json::from_value(resource.value)?))
    }

    fn save_snapshot(&self, snapshot: &Snapshot, namespace: &str, expire_in: Option<Duration>) -> Result<(), StoreError> {
        require_text(namespace, "snapshot namespace")?;
        let resource = SerializedResource {
            descriptor: ResourceDescriptor {
                resource_id: snapshot.aggregate_id().to_string(),
                type_version: Snapshot::version_hash(),
                version_date: snapshot.taken_at(),
                namespace: namespace.to_string(),
            },
            value: serde_json::to_value(snapshot)?,
        };
        self.backend.save_resource(resource, namespace, expire_in)?;
        tracing::debug!(aggregate_id = snapshot.aggregate_id(), namespace, "saved snapshot");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::InMemoryBackend;
    use factline_core::{Entity, Identifier, TypeShape};
    use factline_events::{DomainEvent, EventStream};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize)]
    struct Tally(u32);

    impl Versioned for Tally {
        fn type_shape() -> TypeShape {
            TypeShape::new("Tally").field("0", "u32")
        }
    }

    fn snapshot(aggregate: &str, last_event: &str) -> Snapshot {
        let event = DomainEvent::new(Entity::new(Identifier::new("uid", last_event).unwrap()), "tally.bumped").unwrap();
        let stream = EventStream::from_events(aggregate, vec![event]).unwrap();
        Snapshot::capture(&stream, &Tally(1)).unwrap()
    }

    #[test]
    fn latest_saved_snapshot_is_returned() {
        let repo = BackendSnapshotRepository::new(InMemoryBackend::new());
        assert!(repo.get_latest_snapshot_by_id("t1", "cockpit:snapshot").unwrap().is_none());

        repo.save_snapshot(&snapshot("t1", "e1"), "cockpit:snapshot", None).unwrap();
        repo.save_snapshot(&snapshot("t1", "e4"), "cockpit:snapshot", None).unwrap();

        let latest = repo.get_latest_snapshot_by_id("t1", "cockpit:snapshot").unwrap().unwrap();
        assert_eq!(latest.commit_version(), "e4");
        assert!(repo.get_latest_snapshot_by_id("t1", "other:snapshot").unwrap().is_none());
    }

    #[test]
    fn expired_snapshots_are_invisible() {
        let repo = BackendSnapshotRepository::new(InMemoryBackend::new());
        repo.save_snapshot(&snapshot("t1", "e1"), "ns", Some(Duration::ZERO)).unwrap();
        assert!(repo.get_latest_snapshot_by_id("t1", "ns").unwrap().is_none());
    }

    #[test]
    fn blank_keys_are_argument_errors() {
        let repo = BackendSnapshotRepository::new(InMemoryBackend::new());
        assert!(matches!(
            repo.get_latest_snapshot_by_id(" ", "ns"),
            Err(StoreError::InvalidArgument(_))
        ));
        assert!(matches!(
            repo.save_snapshot(&snapshot("t1", "e1"), "", None),
            Err(StoreError::InvalidArgument(_))
        ));
    }
}
