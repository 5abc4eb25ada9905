use std::marker::PhantomData;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;

use factline_core::{Aggregate, DomainError, Versioned};
use factline_events::{DomainEvent, EventStream};

use super::Snapshot;
use super::repository::SnapshotRepository;
use crate::config::KernelConfig;
use crate::event_store::{EventStore, StoreError};
use crate::naming::NamingConvention;

/// Rebuilds aggregate state from events.
pub trait Rehydrator: Send + Sync {
    type State: Serialize + DeserializeOwned + Versioned;

    /// Full replay of a stream from an empty aggregate.
    fn rehydrate(&self, history: &EventStream) -> Result<Self::State, DomainError>;

    /// Apply the events that follow a snapshot onto its restored state.
    fn replay(&self, state: Self::State, changes: &EventStream) -> Result<Self::State, DomainError>;
}

/// [`Rehydrator`] for any aggregate consuming [`DomainEvent`]s.
///
/// `factory` builds the empty aggregate for a stream id.
pub struct AggregateRehydrator<A, F> {
    factory: F,
    _aggregate: PhantomData<fn() -> A>,
}

impl<A, F> AggregateRehydrator<A, F>
where
    F: Fn(&str) -> Result<A, DomainError>,
{
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            _aggregate: PhantomData,
        }
    }
}

impl<A, F> Rehydrator for AggregateRehydrator<A, F>
where
    A: Aggregate<Event = DomainEvent> + Serialize + DeserializeOwned + Versioned,
    F: Fn(&str) -> Result<A, DomainError> + Send + Sync,
{
    type State = A;

    fn rehydrate(&self, history: &EventStream) -> Result<A, DomainError> {
        let aggregate = (self.factory)(history.aggregate_id())?;
        self.replay(aggregate, history)
    }

    fn replay(&self, mut state: A, changes: &EventStream) -> Result<A, DomainError> {
        for event in changes {
            state.apply(event);
        }
        Ok(state)
    }
}

fn rehydration_failed(aggregate_id: &str, err: DomainError) -> StoreError {
    StoreError::unoperational_caused_by(format!("rehydration of {aggregate_id} failed"), err)
}

/// Snapshot generation and snapshot-assisted loading for one aggregate kind.
pub struct SnapshotProcess<S, R, H> {
    store: S,
    repository: R,
    rehydrator: H,
    namespace: String,
    frequency: u64,
    ttl: Option<Duration>,
}

impl<S, R, H> SnapshotProcess<S, R, H>
where
    S: EventStore,
    R: SnapshotRepository,
    H: Rehydrator,
{
    pub fn new(store: S, repository: R, rehydrator: H, config: &KernelConfig) -> Result<Self, StoreError> {
        config.validate()?;
        let namespace = NamingConvention::new(config.domain_name.clone())?.snapshot_namespace()?;
        Ok(Self {
            store,
            repository,
            rehydrator,
            namespace,
            frequency: config.snapshot_frequency,
            ttl: config.snapshot_ttl(),
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Whether a stream that just reached `stream_len` events is due a snapshot.
    pub fn should_snapshot(&self, stream_len: usize) -> bool {
        self.frequency > 0 && stream_len > 0 && (stream_len as u64) % self.frequency == 0
    }

    /// Replay the full stream and save the resulting state.
    ///
    /// `Ok(None)` when the aggregate has no events.
    pub fn generate_snapshot(&self, aggregate_id: &str) -> Result<Option<Snapshot>, StoreError> {
        let Some(history) = self.store.load_event_stream(aggregate_id)? else {
            return Ok(None);
        };
        let state = self
            .rehydrator
            .rehydrate(&history)
            .map_err(|e| rehydration_failed(aggregate_id, e))?;
        let snapshot = Snapshot::capture(&history, &state)?;
        self.repository.save_snapshot(&snapshot, &self.namespace, self.ttl)?;
        tracing::info!(
            aggregate_id,
            commit_version = snapshot.commit_version(),
            events = history.len(),
            "generated snapshot"
        );
        Ok(Some(snapshot))
    }

    /// Load the current state: latest snapshot plus the events after it, or a
    /// full replay when no usable snapshot exists.
    ///
    /// `Ok(None)` when the aggregate has no events.
    pub fn load_aggregate(&self, aggregate_id: &str) -> Result<Option<H::State>, StoreError> {
        if let Some(snapshot) = self.repository.get_latest_snapshot_by_id(aggregate_id, &self.namespace)? {
            match snapshot.restore::<H::State>() {
                Ok(state) => {
                    let tail = self
                        .store
                        .load_event_stream_after_change(aggregate_id, snapshot.commit_version())?;
                    let state = match tail {
                        Some(changes) => self
                            .rehydrator
                            .replay(state, &changes)
                            .map_err(|e| rehydration_failed(aggregate_id, e))?,
                        None => state,
                    };
                    return Ok(Some(state));
                }
                Err(err) => {
                    tracing::warn!(aggregate_id, error = %err, "unusable snapshot, replaying full stream");
                }
            }
        }

        let Some(history) = self.store.load_event_stream(aggregate_id)? else {
            return Ok(None);
        };
        let state = self
            .rehydrator
            .rehydrate(&history)
            .map_err(|e| rehydration_failed(aggregate_id, e))?;
        Ok(Some(state))
    }
}
