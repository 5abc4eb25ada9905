use std::collections::HashSet;
use std::sync::Mutex;

use factline_core::IdentifiableFact;

use crate::publisher::{DomainEventSubscriber, SubscribedTo, SubscriberError};
use crate::{DomainEvent, EventStream};

/// A projection builds a read model from published domain events.
///
/// Read models are **disposable**: events are the source of truth, and a
/// projection can always be rebuilt by replaying streams through it.
pub trait Projection: Send {
    /// Events this projection cares about.
    fn subscribed_to(&self) -> SubscribedTo {
        SubscribedTo::AnyEvent
    }

    /// Apply a single event to the read model.
    fn apply(&mut self, event: &DomainEvent) -> Result<(), SubscriberError>;
}

/// Adapter registering a [`Projection`] as a store subscriber.
///
/// Events already applied (same event identifier) are skipped, so re-publishing
/// or replaying a stream through a live projection is harmless.
pub struct ProjectionSubscriber<P> {
    inner: Mutex<Applied<P>>,
}

struct Applied<P> {
    projection: P,
    seen: HashSet<String>,
}

impl<P: Projection> ProjectionSubscriber<P> {
    pub fn new(projection: P) -> Self {
        Self {
            inner: Mutex::new(Applied {
                projection,
                seen: HashSet::new(),
            }),
        }
    }

    /// Build a projection from scratch by replaying one stream.
    pub fn rebuild_from_stream(projection: P, stream: &EventStream) -> Result<Self, SubscriberError> {
        let subscriber = Self::new(projection);
        for event in stream {
            subscriber.apply_once(event)?;
        }
        Ok(subscriber)
    }

    /// Read the projection's current state.
    pub fn with_projection<R>(&self, read: impl FnOnce(&P) -> R) -> R {
        let guard = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        read(&guard.projection)
    }

    pub fn into_projection(self) -> P {
        self.inner
            .into_inner()
            .unwrap_or_else(|p| p.into_inner())
            .projection
    }

    fn apply_once(&self, event: &DomainEvent) -> Result<(), SubscriberError> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| SubscriberError::new("projection lock poisoned"))?;
        let fact_id = event.identified().value().to_string();
        if guard.seen.contains(&fact_id) {
            tracing::debug!(fact_id = %fact_id, "projection skipped already applied event");
            return Ok(());
        }
        guard.projection.apply(event)?;
        guard.seen.insert(fact_id);
        Ok(())
    }
}

impl<P: Projection> DomainEventSubscriber for ProjectionSubscriber<P> {
    fn subscribed_to(&self) -> SubscribedTo {
        self.with_projection(|p| p.subscribed_to())
    }

    fn handle_event(&self, event: &DomainEvent) -> Result<(), SubscriberError> {
        self.apply_once(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use factline_core::{Attribute, Entity, Identifier};

    #[derive(Default)]
    struct OpenTitles(Vec<String>);

    impl Projection for OpenTitles {
        fn subscribed_to(&self) -> SubscribedTo {
            SubscribedTo::event_type("ticket.opened")
        }

        fn apply(&mut self, event: &DomainEvent) -> Result<(), SubscriberError> {
            let title = event
                .attribute("title")
                .ok_or_else(|| SubscriberError::new("missing title"))?;
            self.0.push(title.to_string());
            Ok(())
        }
    }

    fn opened(id: &str, title: &str) -> DomainEvent {
        DomainEvent::new(Entity::new(Identifier::new("uid", id).unwrap()), "ticket.opened")
            .unwrap()
            .with_attribute(Attribute::new("title", title).unwrap())
    }

    #[test]
    fn duplicate_deliveries_are_applied_once() {
        let subscriber = ProjectionSubscriber::new(OpenTitles::default());
        let event = opened("e1", "Broken door");
        subscriber.handle_event(&event).unwrap();
        subscriber.handle_event(&event).unwrap();
        assert_eq!(subscriber.with_projection(|p| p.0.clone()), ["Broken door"]);
    }

    #[test]
    fn failed_applications_can_be_retried() {
        let subscriber = ProjectionSubscriber::new(OpenTitles::default());
        let untitled = DomainEvent::new(Entity::new(Identifier::new("uid", "e9").unwrap()), "ticket.opened").unwrap();
        assert!(subscriber.handle_event(&untitled).is_err());
        assert!(subscriber.handle_event(&untitled).is_err());
        assert!(subscriber.into_projection().0.is_empty());
    }

    #[test]
    fn rebuild_replays_the_stream() {
        let stream = EventStream::from_events("t1", vec![opened("e1", "a"), opened("e2", "b")]).unwrap();
        let rebuilt = ProjectionSubscriber::rebuild_from_stream(OpenTitles::default(), &stream).unwrap();
        assert_eq!(rebuilt.into_projection().0, ["a", "b"]);
        assert_eq!(
            ProjectionSubscriber::new(OpenTitles::default()).subscribed_to(),
            SubscribedTo::event_type("ticket.opened")
        );
    }
}
