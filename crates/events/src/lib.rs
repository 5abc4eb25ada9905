//! Domain events, commands and their storage envelopes.

pub mod command;
pub mod event;
pub mod handler;
pub mod projection;
pub mod publisher;
pub mod record;
pub mod stream;

pub use command::Command;
pub use event::DomainEvent;
pub use handler::{CommandHandler, execute};
pub use projection::{Projection, ProjectionSubscriber};
pub use publisher::{
    CallbackSubscriber, DomainEventPublisher, DomainEventSubscriber, PublishReport, SubscribedTo,
    SubscriberError, SubscriptionId,
};
pub use record::{EventRecord, RecordError};
pub use stream::EventStream;
