//! Entity: identity + continuity across state changes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::identifier::Identifier;

/// Anything identified by a (possibly combined) [`Identifier`].
pub trait IdentifiableFact {
    /// Identifier derived from the fact's identity.
    fn identified(&self) -> Identifier;
}

/// Immutable identity built from an ordered set of identifiers.
///
/// Insertion order is significant: it drives the value of [`Entity::identified`].
/// Every structural change produces a new `Entity`; nothing mutates in place.
/// Deserialization recomputes the combined identifier from `identified_by`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "EntityParts")]
pub struct Entity {
    identified_by: Vec<Identifier>,
    identified: Identifier,
    created_at: DateTime<Utc>,
}

impl Entity {
    pub fn new(id: Identifier) -> Self {
        let identified = id.clone();
        Self {
            identified_by: vec![id],
            identified,
            created_at: Utc::now(),
        }
    }

    /// Build an entity from an ordered, non-empty, duplicate-free set of identifiers.
    pub fn with_identifiers<I>(identifiers: I) -> DomainResult<Self>
    where
        I: IntoIterator<Item = Identifier>,
    {
        let mut identified_by: Vec<Identifier> = Vec::new();
        for id in identifiers {
            if identified_by.contains(&id) {
                return Err(DomainError::invalid_argument(format!(
                    "duplicate identifier in entity identity: {id}"
                )));
            }
            identified_by.push(id);
        }
        let identified = Identifier::combine(&identified_by)?;
        Ok(Self {
            identified_by,
            identified,
            created_at: Utc::now(),
        })
    }

    /// Copy of this entity with one more identifier appended to its identity.
    pub fn with_identifier(&self, id: Identifier) -> DomainResult<Self> {
        let mut identifiers = self.identified_by.clone();
        identifiers.push(id);
        let mut copy = Self::with_identifiers(identifiers)?;
        copy.created_at = self.created_at;
        Ok(copy)
    }

    pub fn identifiers(&self) -> &[Identifier] {
        &self.identified_by
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Wire form of an [`Entity`]; the serialized `identified` field is ignored.
#[derive(Deserialize)]
struct EntityParts {
    identified_by: Vec<Identifier>,
    created_at: DateTime<Utc>,
}

impl TryFrom<EntityParts> for Entity {
    type Error = DomainError;

    fn try_from(parts: EntityParts) -> Result<Self, Self::Error> {
        let mut entity = Self::with_identifiers(parts.identified_by)?;
        entity.created_at = parts.created_at;
        Ok(entity)
    }
}

impl IdentifiableFact for Entity {
    fn identified(&self) -> Identifier {
        self.identified.clone()
    }
}

impl PartialEq for Entity {
    fn eq(&self, other: &Self) -> bool {
        self.identified == other.identified
    }
}

impl Eq for Entity {}

impl core::hash::Hash for Entity {
    fn hash<H: core::hash::Hasher>(&self, state: &mut H) {
        self.identified.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(name: &str, value: &str) -> Identifier {
        Identifier::new(name, value).unwrap()
    }

    #[test]
    fn identified_concatenates_identifiers_in_insertion_order() {
        let entity = Entity::with_identifiers([id("tenant", "t1"), id("tenant", "x9")]).unwrap();
        assert_eq!(entity.identified().value(), "t1x9");

        let reversed = Entity::with_identifiers([id("tenant", "x9"), id("tenant", "t1")]).unwrap();
        assert_eq!(reversed.identified().value(), "x9t1");
        assert_ne!(entity, reversed);
    }

    #[test]
    fn empty_or_duplicate_identity_is_rejected() {
        assert!(Entity::with_identifiers(Vec::new()).is_err());
        assert!(Entity::with_identifiers([id("uid", "1"), id("uid", "1")]).is_err());
    }

    #[test]
    fn with_identifier_leaves_the_original_untouched() {
        let original = Entity::new(id("uid", "a"));
        let extended = original.with_identifier(id("uid", "b")).unwrap();

        assert_eq!(original.identifiers().len(), 1);
        assert_eq!(original.identified().value(), "a");
        assert_eq!(extended.identifiers().len(), 2);
        assert_eq!(extended.identified().value(), "ab");
        assert_eq!(extended.created_at(), original.created_at());
    }

    #[test]
    fn deserialization_recomputes_identity_and_keeps_creation_time() {
        let entity = Entity::with_identifiers([id("tenant", "t1"), id("tenant", "x9")]).unwrap();
        let mut json = serde_json::to_value(&entity).unwrap();
        json["identified"] = serde_json::json!({ "name": "forged", "value": "zz" });

        let decoded: Entity = serde_json::from_value(json).unwrap();
        assert_eq!(decoded.identified().value(), "t1x9");
        assert_eq!(decoded.identified().name(), "tenant");
        assert_eq!(decoded.created_at(), entity.created_at());
    }

    #[test]
    fn deserialization_rejects_empty_or_duplicate_identity() {
        let empty = serde_json::json!({
            "identified_by": [],
            "created_at": "2024-01-01T00:00:00Z",
        });
        assert!(serde_json::from_value::<Entity>(empty).is_err());

        let duplicate = serde_json::json!({
            "identified_by": [
                { "name": "uid", "value": "1" },
                { "name": "uid", "value": "1" },
            ],
            "created_at": "2024-01-01T00:00:00Z",
        });
        assert!(serde_json::from_value::<Entity>(duplicate).is_err());
    }

    #[test]
    fn equality_is_identity_based() {
        let a = Entity::new(id("uid", "42"));
        let b = Entity::new(id("uid", "42"));
        assert_eq!(a, b);
    }
}
