//! Infrastructure layer: storage backends, event store, snapshots, config.

pub mod backend;
pub mod config;
pub mod event_store;
pub mod naming;
pub mod snapshot;


pub use backend::{InMemoryBackend, StorageBackend};
pub use config::KernelConfig;
pub use event_store::{DomainEventStore, EventStore, Pagination, StoreError};
pub use naming::{KEY_NAME_SEPARATOR, NamingCategory, NamingConvention};
pub use snapshot::{
    AggregateRehydrator, BackendSnapshotRepository, Rehydrator, Snapshot, SnapshotProcess, SnapshotRepository,
};
