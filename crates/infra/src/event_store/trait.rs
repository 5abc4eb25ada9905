use std::sync::Arc;

use thiserror::Error;

use factline_core::DomainError;
use factline_events::{DomainEvent, DomainEventSubscriber, EventStream, RecordError, SubscriptionId};

use super::query::Pagination;

/// Boxed cause kept on operational failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Event store / snapshot operation error.
///
/// Two kinds, never conflated:
///
/// - **InvalidArgument**: the caller passed something unusable (blank id,
///   unknown change id, duplicate fact id, zero page size). Retrying is
///   pointless.
/// - **Unoperational**: the store could not do its job (backend failure,
///   serialization failure, inconsistent stored data, bad configuration). The
///   underlying cause is preserved as the error source.
///
/// Absence of data is **not** an error: loads return `Ok(None)`.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("unoperational state: {message}")]
    Unoperational {
        message: String,
        #[source]
        source: Option<BoxError>,
    },
}

impl StoreError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn unoperational(msg: impl Into<String>) -> Self {
        Self::Unoperational {
            message: msg.into(),
            source: None,
        }
    }

    pub fn unoperational_caused_by(
        msg: impl Into<String>,
        cause: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Unoperational {
            message: msg.into(),
            source: Some(Box::new(cause)),
        }
    }

    /// Operational failures may succeed on retry; argument errors never do.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unoperational { .. })
    }
}

impl From<DomainError> for StoreError {
    fn from(err: DomainError) -> Self {
        Self::InvalidArgument(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::unoperational_caused_by("serialization failure", err)
    }
}

impl From<RecordError> for StoreError {
    fn from(err: RecordError) -> Self {
        Self::unoperational_caused_by("event record codec failure", err)
    }
}

/// Append-only store of aggregate event streams.
///
/// ## Append semantics
///
/// `append_to_stream()`:
/// - is a no-op for an empty batch
/// - serializes every event before touching storage (a failure aborts the
///   whole batch, nothing is written)
/// - appends the batch contiguously; concurrent appends to the same stream
///   never interleave
/// - publishes each event to subscribers, in append order, only after the
///   append is durable
///
/// Every method takes the aggregate id as the plain identifier value that keys
/// its stream; blank ids are argument errors.
///
/// ## Load semantics
///
/// - Streams are returned **oldest first**.
/// - A missing stream (or an empty selection) is `Ok(None)`.
/// - The stream's `version()` is the structural hash of its last event and
///   `commit_version()` the identifier value of that event.
pub trait EventStore: Send + Sync {
    /// Append `events` to the stream of `aggregate_id`.
    fn append_to_stream(&self, aggregate_id: &str, events: &[DomainEvent]) -> Result<(), StoreError>;

    /// Load the whole stream of `aggregate_id`.
    fn load_event_stream(&self, aggregate_id: &str) -> Result<Option<EventStream>, StoreError>;

    /// Load the events recorded strictly after the commit version of the
    /// latest snapshot of `aggregate_id`.
    ///
    /// `snapshot_commit_version` is mandatory (non-blank) but the marker used
    /// is the one stored with the latest snapshot. `Ok(None)` when the store
    /// has no snapshot repository, no snapshot exists, or nothing follows it.
    fn load_event_stream_after_version(
        &self,
        aggregate_id: &str,
        snapshot_commit_version: &str,
    ) -> Result<Option<EventStream>, StoreError>;

    /// Load the events recorded strictly after the event whose fact id is
    /// `change_id`. An id that is not in the stream is an argument error.
    fn load_event_stream_after_change(
        &self,
        aggregate_id: &str,
        change_id: &str,
    ) -> Result<Option<EventStream>, StoreError>;

    /// Load one page (offset + limit, oldest first) of a stream.
    fn load_event_stream_page(
        &self,
        aggregate_id: &str,
        page: Pagination,
    ) -> Result<Option<EventStream>, StoreError>;

    /// Register a subscriber notified of every committed event it accepts.
    fn subscribe(&self, subscriber: Arc<dyn DomainEventSubscriber>) -> SubscriptionId;

    /// Remove a subscriber; returns `false` if it was not registered.
    fn unsubscribe(&self, id: SubscriptionId) -> bool;
}

impl<S> EventStore for Arc<S>
where
    S: EventStore + ?Sized,
{
    fn append_to_stream(&self, aggregate_id: &str, events: &[DomainEvent]) -> Result<(), StoreError> {
        (**self).append_to_stream(aggregate_id, events)
    }

    fn load_event_stream(&self, aggregate_id: &str) -> Result<Option<EventStream>, StoreError> {
        (**self).load_event_stream(aggregate_id)
    }

    fn load_event_stream_after_version(
        &self,
        aggregate_id: &str,
        snapshot_commit_version: &str,
    ) -> Result<Option<EventStream>, StoreError> {
        (**self).load_event_stream_after_version(aggregate_id, snapshot_commit_version)
    }

    fn load_event_stream_after_change(
        &self,
        aggregate_id: &str,
        change_id: &str,
    ) -> Result<Option<EventStream>, StoreError> {
        (**self).load_event_stream_after_change(aggregate_id, change_id)
    }

    fn load_event_stream_page(
        &self,
        aggregate_id: &str,
        page: Pagination,
    ) -> Result<Option<EventStream>, StoreError> {
        (**self).load_event_stream_page(aggregate_id, page)
    }

    fn subscribe(&self, subscriber: Arc<dyn DomainEventSubscriber>) -> SubscriptionId {
        (**self).subscribe(subscriber)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        (**self).unsubscribe(id)
    }
}
