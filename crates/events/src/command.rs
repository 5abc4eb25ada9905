use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use factline_core::{
    Attribute, CorrelationId, DomainResult, Entity, IdentifiableFact, Identifier, TypeShape,
    Versioned, append_specification, require_text,
};

/// A request to change an aggregate (command abstraction).
///
/// Commands represent **intent**; events represent accepted facts. A command
/// has the same shape as a [`DomainEvent`](crate::DomainEvent) plus an optional
/// reference to the command it follows, and always carries a correlation id so
/// the events it causes can be traced back to it.
///
/// Commands are never appended to a stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    identified_by: Entity,
    command_type: String,
    correlation_id: CorrelationId,
    occurred_at: DateTime<Utc>,
    specification: Vec<Attribute>,
    prior_command: Option<Identifier>,
    version_hash: String,
}

impl Command {
    pub fn new(identified_by: Entity, command_type: impl Into<String>) -> DomainResult<Self> {
        let command_type = command_type.into();
        require_text(&command_type, "command type")?;
        Ok(Self {
            identified_by,
            command_type,
            correlation_id: CorrelationId::new(),
            occurred_at: Utc::now(),
            specification: Vec::new(),
            prior_command: None,
            version_hash: <Self as Versioned>::version_hash(),
        })
    }

    /// Command of the typed kind `K`: named after and versioned by `K`'s shape.
    pub fn of<K: Versioned>(identified_by: Entity) -> Self {
        Self {
            identified_by,
            command_type: K::type_shape().name().to_string(),
            correlation_id: CorrelationId::new(),
            occurred_at: Utc::now(),
            specification: Vec::new(),
            prior_command: None,
            version_hash: K::version_hash(),
        }
    }

    pub fn with_correlation_id(mut self, correlation_id: CorrelationId) -> Self {
        self.correlation_id = correlation_id;
        self
    }

    /// Reference the command this one follows up on.
    pub fn following(mut self, prior: &Command) -> Self {
        self.prior_command = Some(prior.identified());
        self
    }

    pub fn with_attribute(mut self, attribute: Attribute) -> Self {
        append_specification(&mut self.specification, attribute);
        self
    }

    pub fn identified_by(&self) -> &Entity {
        &self.identified_by
    }

    pub fn command_type(&self) -> &str {
        &self.command_type
    }

    pub fn correlation_id(&self) -> CorrelationId {
        self.correlation_id
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    pub fn specification(&self) -> &[Attribute] {
        &self.specification
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.specification
            .iter()
            .find(|a| a.name() == name)
            .map(Attribute::value)
    }

    pub fn prior_command(&self) -> Option<&Identifier> {
        self.prior_command.as_ref()
    }

    pub fn type_version(&self) -> &str {
        &self.version_hash
    }
}

impl IdentifiableFact for Command {
    fn identified(&self) -> Identifier {
        self.identified_by.identified()
    }
}

impl Versioned for Command {
    fn type_shape() -> TypeShape {
        TypeShape::new("Command")
            .field("identified_by", "Entity")
            .field("command_type", "String")
            .field("correlation_id", "CorrelationId")
            .field("occurred_at", "DateTime")
            .field("specification", "Vec")
            .field("prior_command", "Identifier")
            .field("version_hash", "String")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DomainEvent;

    fn entity(value: &str) -> Entity {
        Entity::new(Identifier::new("uid", value).unwrap())
    }

    #[test]
    fn follow_up_commands_reference_their_prior() {
        let open = Command::new(entity("c1"), "ticket.open").unwrap();
        let assign = Command::new(entity("c2"), "ticket.assign")
            .unwrap()
            .following(&open);
        assert_eq!(assign.prior_command().map(Identifier::value), Some("c1"));
        assert!(open.prior_command().is_none());
    }

    #[test]
    fn caused_events_share_the_command_correlation_id() {
        let cmd = Command::new(entity("c1"), "ticket.open").unwrap();
        let event = DomainEvent::new(entity("e1"), "ticket.opened")
            .unwrap()
            .caused_by(&cmd);
        assert_eq!(event.correlation_id(), Some(cmd.correlation_id()));
    }

    #[test]
    fn commands_and_events_have_distinct_shapes() {
        assert_ne!(Command::version_hash(), DomainEvent::version_hash());
    }
}
