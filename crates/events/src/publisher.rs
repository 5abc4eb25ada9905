//! Synchronous, in-process domain event fan-out (observer registry).
//!
//! The event store publishes through a [`DomainEventPublisher`] once a batch is
//! durably appended:
//!
//! ```text
//! append_to_stream → StorageBackend (durable) → DomainEventPublisher → subscribers
//!                                                                      ├─ projections
//!                                                                      └─ handlers
//! ```
//!
//! ## Delivery
//!
//! - Subscribers run **synchronously**, on the publishing thread, in
//!   **registration order**.
//! - Each subscriber declares which events it wants ([`SubscribedTo`]).
//! - A failing subscriber (error *or* panic) is isolated and logged; it never
//!   aborts delivery to the others and never surfaces as an append failure.
//! - The registry is snapshotted before fan-out, so a subscriber may register or
//!   remove subscribers while handling an event; the change applies to the next
//!   publish.
//!
//! Publishers are explicit instances owned by (or injected into) a store; there
//! is no process-wide registry.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use thiserror::Error;

use crate::DomainEvent;

/// Error reported by a subscriber while handling an event.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("subscriber failed: {0}")]
pub struct SubscriberError(pub String);

impl SubscriberError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// Which events a subscriber wants to receive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscribedTo {
    /// Every published event.
    AnyEvent,
    /// Only events whose `event_type` matches.
    EventType(String),
}

impl SubscribedTo {
    pub fn event_type(name: impl Into<String>) -> Self {
        Self::EventType(name.into())
    }

    pub fn matches(&self, event: &DomainEvent) -> bool {
        match self {
            SubscribedTo::AnyEvent => true,
            SubscribedTo::EventType(name) => name == event.event_type(),
        }
    }
}

/// Component notified of published events.
pub trait DomainEventSubscriber: Send + Sync {
    fn subscribed_to(&self) -> SubscribedTo;

    fn handle_event(&self, event: &DomainEvent) -> Result<(), SubscriberError>;
}

/// Subscriber backed by a closure.
pub struct CallbackSubscriber<F> {
    subscribed_to: SubscribedTo,
    callback: F,
}

impl<F> CallbackSubscriber<F>
where
    F: Fn(&DomainEvent) -> Result<(), SubscriberError> + Send + Sync,
{
    pub fn new(subscribed_to: SubscribedTo, callback: F) -> Self {
        Self {
            subscribed_to,
            callback,
        }
    }
}

impl<F> DomainEventSubscriber for CallbackSubscriber<F>
where
    F: Fn(&DomainEvent) -> Result<(), SubscriberError> + Send + Sync,
{
    fn subscribed_to(&self) -> SubscribedTo {
        self.subscribed_to.clone()
    }

    fn handle_event(&self, event: &DomainEvent) -> Result<(), SubscriberError> {
        (self.callback)(event)
    }
}

/// Handle returned on registration, used to remove a subscriber.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

/// Outcome of one publish call.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct PublishReport {
    /// Subscribers that handled the event successfully.
    pub delivered: usize,
    /// Subscribers that returned an error or panicked.
    pub failed: usize,
}

type Registered = (SubscriptionId, Arc<dyn DomainEventSubscriber>);

/// Ordered registry of subscribers.
#[derive(Default)]
pub struct DomainEventPublisher {
    next_id: AtomicU64,
    subscribers: RwLock<Vec<Registered>>,
}

impl DomainEventPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, subscriber: Arc<dyn DomainEventSubscriber>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        // A poisoned registry is still structurally valid; keep using it.
        let mut subs = self
            .subscribers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        subs.push((id, subscriber));
        id
    }

    /// Remove a subscriber; returns `false` if it was not registered.
    pub fn remove(&self, id: SubscriptionId) -> bool {
        let mut subs = self
            .subscribers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let before = subs.len();
        subs.retain(|(sid, _)| *sid != id);
        subs.len() != before
    }

    /// Remove every subscriber.
    pub fn reset(&self) {
        self.subscribers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }

    pub fn len(&self) -> usize {
        self.registered().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn registered(&self) -> Vec<Registered> {
        self.subscribers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Deliver `event` to every matching subscriber, in registration order.
    pub fn publish(&self, event: &DomainEvent) -> PublishReport {
        let mut report = PublishReport::default();

        for (id, subscriber) in self.registered() {
            if !subscriber.subscribed_to().matches(event) {
                continue;
            }
            match catch_unwind(AssertUnwindSafe(|| subscriber.handle_event(event))) {
                Ok(Ok(())) => report.delivered += 1,
                Ok(Err(err)) => {
                    report.failed += 1;
                    tracing::warn!(
                        subscription = ?id,
                        event_type = event.event_type(),
                        error = %err,
                        "subscriber failed to handle event"
                    );
                }
                Err(_) => {
                    report.failed += 1;
                    tracing::error!(
                        subscription = ?id,
                        event_type = event.event_type(),
                        "subscriber panicked while handling event"
                    );
                }
            }
        }

        report
    }
}

impl core::fmt::Debug for DomainEventPublisher {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DomainEventPublisher")
            .field("subscribers", &self.len())
            .finish()
    }
}
