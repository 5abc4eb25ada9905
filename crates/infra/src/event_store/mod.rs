//! Append-only event store boundary.
//!
//! [`DomainEventStore`] implements [`EventStore`] over any
//! [`StorageBackend`](crate::backend::StorageBackend) and publishes committed
//! events to its [`DomainEventPublisher`]. Snapshot-relative loads go through
//! an optional [`SnapshotRepository`].
//!
//! Ordering invariant: **publish happens only after append succeeds**.

pub mod query;
pub mod r#trait;

use std::sync::Arc;

use factline_core::require_text;
use factline_events::{DomainEvent, DomainEventPublisher, DomainEventSubscriber, EventRecord, EventStream, SubscriptionId};

use crate::backend::StorageBackend;
use crate::config::KernelConfig;
use crate::naming::NamingConvention;
use crate::snapshot::SnapshotRepository;

pub use query::Pagination;
pub use r#trait::{BoxError, EventStore, StoreError};

/// Event store over a storage backend, with publish-after-append.
pub struct DomainEventStore<B> {
    backend: B,
    publisher: Arc<DomainEventPublisher>,
    naming: NamingConvention,
    max_page_size: u32,
    snapshots: Option<Arc<dyn SnapshotRepository>>,
    snapshot_namespace: String,
}

impl<B: StorageBackend> DomainEventStore<B> {
    pub fn new(backend: B, config: &KernelConfig) -> Result<Self, StoreError> {
        config.validate()?;
        let naming = NamingConvention::new(config.domain_name.clone())?;
        let snapshot_namespace = naming.snapshot_namespace()?;
        Ok(Self {
            backend,
            publisher: Arc::new(DomainEventPublisher::new()),
            naming,
            max_page_size: config.max_page_size,
            snapshots: None,
            snapshot_namespace,
        })
    }

    /// Look up snapshots in `repository` for snapshot-relative loads.
    pub fn with_snapshots(mut self, repository: Arc<dyn SnapshotRepository>) -> Self {
        self.snapshots = Some(repository);
        self
    }

    /// Share an existing publisher instead of owning a fresh one.
    pub fn with_publisher(mut self, publisher: Arc<DomainEventPublisher>) -> Self {
        self.publisher = publisher;
        self
    }

    pub fn publisher(&self) -> &Arc<DomainEventPublisher> {
        &self.publisher
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn naming(&self) -> &NamingConvention {
        &self.naming
    }

    fn stream_key(&self, aggregate_id: &str) -> Result<String, StoreError> {
        require_text(aggregate_id, "aggregate id")?;
        Ok(self.naming.stream_key(aggregate_id)?)
    }

    fn load_after(&self, aggregate_id: &str, change_id: &str) -> Result<Option<EventStream>, StoreError> {
        let stream = self.stream_key(aggregate_id)?;
        let records = self.backend.read_all_after_change_id(&stream, change_id)?;
        let loaded = Self::decode(aggregate_id, records)?;
        tracing::debug!(
            stream = %stream,
            after = change_id,
            events = loaded.as_ref().map_or(0, EventStream::len),
            "loaded stream tail"
        );
        Ok(loaded)
    }

    fn decode(aggregate_id: &str, records: Option<Vec<EventRecord>>) -> Result<Option<EventStream>, StoreError> {
        let Some(records) = records else {
            return Ok(None);
        };
        let events = records
            .iter()
            .map(EventRecord::decode)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(EventStream::from_events(aggregate_id, events))
    }
}

impl<B: StorageBackend> EventStore for DomainEventStore<B> {
    fn append_to_stream(&self, aggregate_id: &str, events: &[DomainEvent]) -> Result<(), StoreError> {
        if events.is_empty() {
            return Ok(());
        }
        let stream = self.stream_key(aggregate_id)?;

        // 1) Encode the whole batch up front: a failure writes nothing.
        let records = events.iter().map(EventRecord::new).collect::<Result<Vec<_>, _>>()?;

        // 2) Durable append.
        self.backend.append(&stream, records)?;
        tracing::debug!(stream = %stream, count = events.len(), "appended events");

        // 3) Publish; subscriber failures are isolated by the publisher.
        for event in events {
            let report = self.publisher.publish(event);
            if report.failed > 0 {
                tracing::debug!(
                    stream = %stream,
                    event_type = event.event_type(),
                    failed = report.failed,
                    "some subscribers failed"
                );
            }
        }
        Ok(())
    }

    fn load_event_stream(&self, aggregate_id: &str) -> Result<Option<EventStream>, StoreError> {
        let stream = self.stream_key(aggregate_id)?;
        let loaded = Self::decode(aggregate_id, self.backend.read_all_from(&stream)?)?;
        tracing::debug!(stream = %stream, events = loaded.as_ref().map_or(0, EventStream::len), "loaded stream");
        Ok(loaded)
    }

    fn load_event_stream_after_version(
        &self,
        aggregate_id: &str,
        snapshot_commit_version: &str,
    ) -> Result<Option<EventStream>, StoreError> {
        require_text(snapshot_commit_version, "snapshot commit version")?;
        require_text(aggregate_id, "aggregate id")?;
        let Some(repository) = &self.snapshots else {
            tracing::debug!(aggregate_id, "no snapshot repository configured");
            return Ok(None);
        };
        let Some(snapshot) = repository.get_latest_snapshot_by_id(aggregate_id, &self.snapshot_namespace)? else {
            return Ok(None);
        };
        if snapshot.commit_version() != snapshot_commit_version {
            tracing::debug!(
                aggregate_id,
                requested = snapshot_commit_version,
                latest = snapshot.commit_version(),
                "reading after the latest snapshot"
            );
        }
        self.load_after(aggregate_id, snapshot.commit_version())
    }

    fn load_event_stream_after_change(
        &self,
        aggregate_id: &str,
        change_id: &str,
    ) -> Result<Option<EventStream>, StoreError> {
        require_text(change_id, "change id")?;
        self.load_after(aggregate_id, change_id)
    }

    fn load_event_stream_page(
        &self,
        aggregate_id: &str,
        page: Pagination,
    ) -> Result<Option<EventStream>, StoreError> {
        let page = page.capped(self.max_page_size)?;
        let stream = self.stream_key(aggregate_id)?;
        let records = self
            .backend
            .read_range(&stream, page.offset as usize, page.limit as usize)?;
        Self::decode(aggregate_id, records)
    }

    fn subscribe(&self, subscriber: Arc<dyn DomainEventSubscriber>) -> SubscriptionId {
        self.publisher.subscribe(subscriber)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.publisher.remove(id)
    }
}

impl<B> core::fmt::Debug for DomainEventStore<B> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DomainEventStore")
            .field("naming", &self.naming)
            .field("publisher", &self.publisher)
            .field("max_page_size", &self.max_page_size)
            .field("snapshot_namespace", &self.snapshot_namespace)
            .field("snapshots", &self.snapshots.is_some())
            .finish()
    }
}
