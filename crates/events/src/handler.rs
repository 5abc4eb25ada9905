use factline_core::DomainError;

use crate::{Command, DomainEvent};

/// Turns a command into the events it causes (command handler abstraction).
///
/// Standalone alternative to [`factline_core::Aggregate::handle`] for handlers
/// that do not own aggregate state. Handlers make no storage assumptions;
/// appending the returned events is the caller's job.
pub trait CommandHandler {
    fn handle(&self, command: &Command) -> Result<Vec<DomainEvent>, DomainError>;
}

impl<F> CommandHandler for F
where
    F: Fn(&Command) -> Result<Vec<DomainEvent>, DomainError>,
{
    fn handle(&self, command: &Command) -> Result<Vec<DomainEvent>, DomainError> {
        self(command)
    }
}

/// Execute an aggregate command deterministically (no IO).
///
/// 1. **Decide**: `aggregate.handle(command)` produces the events.
/// 2. **Evolve**: each event is applied to the aggregate in order.
///
/// The returned events are the aggregate's pending changes, ready for
/// `append_to_stream`.
pub fn execute<A>(aggregate: &mut A, command: &A::Command) -> Result<Vec<A::Event>, A::Error>
where
    A: factline_core::Aggregate,
{
    let events = A::handle(aggregate, command)?;
    for ev in &events {
        A::apply(aggregate, ev);
    }
    Ok(events)
}
