//! Naming building blocks: `(name, value)` identifiers and correlation ids.

use core::hash::{Hash, Hasher};
use core::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{DomainError, DomainResult, require_text};

/// Generic identifier name used when combined identifiers disagree on naming.
pub const GENERIC_ID_NAME: &str = "ID";

/// Equality policy applied when comparing two identifiers.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityEquality {
    /// Only the value takes part in equality.
    #[default]
    ValueOnly,
    /// Both name and value take part in equality.
    NameAndValue,
}

/// Immutable `(name, value)` identifier.
///
/// Both parts are mandatory and non-blank, also when deserialized. Identifiers
/// carrying different [`IdentityEquality`] policies never compare equal;
/// otherwise the shared policy decides whether names take part. Hashing only
/// uses the value so that it stays consistent with both policies.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "IdentifierParts")]
pub struct Identifier {
    name: String,
    value: String,
    #[serde(default)]
    equality: IdentityEquality,
}

impl Identifier {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> DomainResult<Self> {
        let name = name.into();
        let value = value.into();
        require_text(&name, "identifier name")
            .map_err(|_| DomainError::invalid_id("identifier name is required"))?;
        require_text(&value, "identifier value")
            .map_err(|_| DomainError::invalid_id(format!("identifier '{name}' requires a value")))?;
        Ok(Self {
            name,
            value,
            equality: IdentityEquality::default(),
        })
    }

    /// Generate a new identifier with a time-ordered (UUIDv7) value.
    pub fn generate(name: impl Into<String>) -> DomainResult<Self> {
        Self::new(name, Uuid::now_v7().to_string())
    }

    /// Build one identifier from an ordered, non-empty set of identifiers.
    ///
    /// Values are concatenated in order. The shared name is kept when every
    /// identifier carries the same name, otherwise [`GENERIC_ID_NAME`] is used.
    pub fn combine<'a, I>(based_on: I) -> DomainResult<Self>
    where
        I: IntoIterator<Item = &'a Identifier>,
    {
        let mut combined = String::new();
        let mut shared_name: Option<&str> = None;
        let mut unique_name = true;

        for id in based_on {
            combined.push_str(&id.value);
            match shared_name {
                None => shared_name = Some(&id.name),
                Some(name) if name != id.name => unique_name = false,
                Some(_) => {}
            }
        }

        let Some(name) = shared_name else {
            return Err(DomainError::invalid_argument(
                "a minimum of one identifier is required to combine",
            ));
        };

        Self::new(if unique_name { name } else { GENERIC_ID_NAME }, combined)
    }

    /// Copy of this identifier using another equality policy.
    pub fn with_equality(&self, equality: IdentityEquality) -> Self {
        Self {
            equality,
            ..self.clone()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn equality(&self) -> IdentityEquality {
        self.equality
    }
}

/// Unvalidated wire form of an [`Identifier`].
#[derive(Deserialize)]
struct IdentifierParts {
    name: String,
    value: String,
    #[serde(default)]
    equality: IdentityEquality,
}

impl TryFrom<IdentifierParts> for Identifier {
    type Error = DomainError;

    fn try_from(parts: IdentifierParts) -> Result<Self, Self::Error> {
        Ok(Self::new(parts.name, parts.value)?.with_equality(parts.equality))
    }
}

impl PartialEq for Identifier {
    fn eq(&self, other: &Self) -> bool {
        if self.equality != other.equality || self.value != other.value {
            return false;
        }
        match self.equality {
            IdentityEquality::ValueOnly => true,
            IdentityEquality::NameAndValue => self.name == other.name,
        }
    }
}

impl Eq for Identifier {}

impl Hash for Identifier {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl core::fmt::Display for Identifier {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}={}", self.name, self.value)
    }
}

/// Correlation identifier linking a fact to the command or event that caused it.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(Uuid);

impl CorrelationId {
    /// Create a new correlation id.
    ///
    /// Uses UUIDv7 (time-ordered). Prefer passing ids explicitly in tests for
    /// determinism.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl From<Uuid> for CorrelationId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl FromStr for CorrelationId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let uuid =
            Uuid::from_str(s).map_err(|e| DomainError::invalid_id(format!("CorrelationId: {e}")))?;
        Ok(Self(uuid))
    }
}
