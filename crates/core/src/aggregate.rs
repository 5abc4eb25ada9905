//! Aggregate root traits for event-sourced domain models.

use crate::entity::IdentifiableFact;

/// Aggregate root marker + minimal interface.
///
/// Kept small so domain models decide how they represent state (plain fields,
/// [`PropertyHistory`](crate::property::PropertyHistory) versions, ...) without
/// pulling in storage concerns.
pub trait AggregateRoot: IdentifiableFact {
    /// Number of events applied to this instance.
    fn version(&self) -> u64;
}

/// Aggregate execution semantics (pure, deterministic).
///
/// - **Decision logic**: `handle(&self, cmd)` returns events.
/// - **State mutation**: `apply(&mut self, event)` evolves state.
///
/// Aggregates must not perform IO. They only return events describing what
/// happened; persisting them is the event store's job.
pub trait Aggregate: AggregateRoot {
    type Command: Clone + core::fmt::Debug;
    type Event: Clone + core::fmt::Debug;
    type Error: core::fmt::Debug;

    /// Evolve in-memory state from a single event.
    ///
    /// Implementations should bump their `version()` by one per applied event so
    /// that full replay and snapshot-assisted replay agree.
    fn apply(&mut self, event: &Self::Event);

    /// Decide which events to emit given the current state and a command.
    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error>;
}
