//! Versioned attribute bundles with a multi-predecessor history graph.
//!
//! A [`MutableProperty`] never changes after construction. A "change" is a new
//! version whose predecessors are the versions it was derived from. Versions
//! live in a [`PropertyHistory`] arena and refer to their predecessors by
//! [`VersionId`], so concurrent branches can later be merged without shared
//! ownership cycles.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::entity::{Entity, IdentifiableFact};
use crate::error::{DomainError, DomainResult};
use crate::version::{TypeShape, Versioned};

/// Attribute values of one property version.
pub type PropertyValue = BTreeMap<String, JsonValue>;

/// Status of a property version in its history.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HistoryState {
    /// Linear version derived from at most one predecessor.
    Committed,
    /// Version combining two or more predecessors.
    Merged,
    /// Version kept for history only.
    Archived,
    /// Version whose change was abandoned.
    Cancelled,
}

/// Position of a version inside its [`PropertyHistory`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionId(u32);

impl VersionId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl core::fmt::Display for VersionId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Immutable version of an attribute bundle owned by an entity.
///
/// Equality compares owner, status and attribute values; creation time and
/// predecessors are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MutableProperty {
    owner: Entity,
    value: PropertyValue,
    status: HistoryState,
    changed_at: DateTime<Utc>,
    prior: BTreeSet<VersionId>,
}

impl MutableProperty {
    /// Version without predecessors. An empty attribute map is a valid value.
    pub fn new(owner: Entity, value: PropertyValue, status: HistoryState) -> Self {
        Self {
            owner,
            value,
            status,
            changed_at: Utc::now(),
            prior: BTreeSet::new(),
        }
    }

    /// Independent deep copy (owner included).
    pub fn immutable(&self) -> Self {
        self.clone()
    }

    pub fn owner(&self) -> &Entity {
        &self.owner
    }

    pub fn current_value(&self) -> &PropertyValue {
        &self.value
    }

    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.value.get(key)
    }

    pub fn history_status(&self) -> HistoryState {
        self.status
    }

    pub fn changed_at(&self) -> DateTime<Utc> {
        self.changed_at
    }

    /// Direct predecessors of this version.
    pub fn prior(&self) -> &BTreeSet<VersionId> {
        &self.prior
    }
}

impl PartialEq for MutableProperty {
    fn eq(&self, other: &Self) -> bool {
        self.owner == other.owner && self.status == other.status && self.value == other.value
    }
}

impl Versioned for MutableProperty {
    fn type_shape() -> TypeShape {
        TypeShape::new("MutableProperty")
            .field("owner", "Entity")
            .field("value", "BTreeMap")
            .field("status", "HistoryState")
            .field("changed_at", "DateTime")
            .field("prior", "BTreeSet")
    }
}

/// Arena holding every version of one property.
///
/// Predecessors must already be in the arena when a version is committed, so
/// the graph is acyclic and no version is ever part of its own history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyHistory {
    versions: Vec<MutableProperty>,
}

impl PropertyHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new version derived from `predecessors`.
    pub fn commit(
        &mut self,
        owner: Entity,
        value: PropertyValue,
        status: HistoryState,
        predecessors: &[VersionId],
    ) -> DomainResult<VersionId> {
        let mut property = MutableProperty::new(owner, value, status);

        let mut prior = BTreeSet::new();
        for id in predecessors {
            let predecessor = self.version(*id)?;
            if predecessor.owner != property.owner {
                return Err(DomainError::invariant(format!(
                    "predecessor {id} belongs to another owner ({})",
                    predecessor.owner.identified()
                )));
            }
            prior.insert(*id);
        }

        if status == HistoryState::Merged && prior.len() < 2 {
            return Err(DomainError::invariant(
                "a merged version requires at least two distinct predecessors",
            ));
        }

        let id = VersionId(u32::try_from(self.versions.len()).map_err(|_| {
            DomainError::invariant("property history exceeds the maximum number of versions")
        })?);
        property.prior = prior;
        tracing::trace!(version = %id, status = ?status, "property version committed");
        self.versions.push(property);
        Ok(id)
    }

    /// Committed successor of a single version, owned by the same entity.
    pub fn change(&mut self, from: VersionId, value: PropertyValue) -> DomainResult<VersionId> {
        let owner = self.version(from)?.owner.clone();
        self.commit(owner, value, HistoryState::Committed, &[from])
    }

    /// Merged successor of two or more versions, owned by their common entity.
    ///
    /// `value` is the already-resolved result; choosing between conflicting
    /// predecessor values is left to the caller.
    pub fn merge(&mut self, predecessors: &[VersionId], value: PropertyValue) -> DomainResult<VersionId> {
        let first = predecessors
            .first()
            .ok_or_else(|| DomainError::invalid_argument("merge requires predecessors"))?;
        let owner = self.version(*first)?.owner.clone();
        self.commit(owner, value, HistoryState::Merged, predecessors)
    }

    pub fn get(&self, id: VersionId) -> Option<&MutableProperty> {
        self.versions.get(id.index())
    }

    fn version(&self, id: VersionId) -> DomainResult<&MutableProperty> {
        self.get(id)
            .ok_or_else(|| DomainError::invalid_argument(format!("unknown property version {id}")))
    }

    /// Direct predecessors of `id`.
    ///
    /// Deeper history is reached by asking again for each returned version.
    pub fn changes_history(&self, id: VersionId) -> DomainResult<Vec<(VersionId, &MutableProperty)>> {
        let version = self.version(id)?;
        version
            .prior
            .iter()
            .map(|p| self.version(*p).map(|v| (*p, v)))
            .collect()
    }

    /// All direct and transitive predecessors of `id` (never `id` itself).
    pub fn lineage(&self, id: VersionId) -> DomainResult<BTreeSet<VersionId>> {
        let mut seen = BTreeSet::new();
        let mut pending: Vec<VersionId> = self.version(id)?.prior.iter().copied().collect();
        while let Some(next) = pending.pop() {
            if seen.insert(next) {
                pending.extend(self.version(next)?.prior.iter().copied());
            }
        }
        Ok(seen)
    }

    /// Versions that no other version derives from (open branches).
    pub fn heads(&self) -> Vec<VersionId> {
        let derived: BTreeSet<VersionId> = self
            .versions
            .iter()
            .flat_map(|v| v.prior.iter().copied())
            .collect();
        (0..self.versions.len())
            .map(|i| VersionId(i as u32))
            .filter(|id| !derived.contains(id))
            .collect()
    }

    /// Most recently committed version.
    pub fn latest(&self) -> Option<(VersionId, &MutableProperty)> {
        let last = self.versions.len().checked_sub(1)?;
        Some((VersionId(last as u32), &self.versions[last]))
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifier::Identifier;
    use serde_json::json;

    fn owner(value: &str) -> Entity {
        Entity::new(Identifier::new("uid", value).unwrap())
    }

    fn value(label: &str) -> PropertyValue {
        PropertyValue::from([("label".to_string(), json!(label))])
    }

    #[test]
    fn empty_attribute_map_is_a_valid_value() {
        let mut history = PropertyHistory::new();
        let v0 = history
            .commit(owner("p1"), PropertyValue::new(), HistoryState::Committed, &[])
            .unwrap();
        assert!(history.get(v0).unwrap().current_value().is_empty());

        let v1 = history.change(v0, value("draft")).unwrap();
        let prior: Vec<VersionId> = history.changes_history(v1).unwrap().into_iter().map(|(id, _)| id).collect();
        assert_eq!(prior, vec![v0]);
    }

    #[test]
    fn immutable_copy_is_equal_and_independent() {
        let original = MutableProperty::new(owner("p1"), value("draft"), HistoryState::Committed);
        let mut copy = original.immutable();
        assert_eq!(copy, original);

        copy.owner = owner("someone-else");
        assert_ne!(copy, original);
        assert_eq!(original.owner().identified().value(), "p1");
    }

    #[test]
    fn equality_ignores_time_and_history() {
        let mut history = PropertyHistory::new();
        let v0 = history.commit(owner("p1"), value("draft"), HistoryState::Committed, &[]).unwrap();
        let v1 = history.change(v0, value("draft")).unwrap();
        assert_eq!(history.get(v0), history.get(v1));
    }

    #[test]
    fn a_version_is_never_part_of_its_own_history() {
        let mut history = PropertyHistory::new();
        let v0 = history.commit(owner("p1"), value("a"), HistoryState::Committed, &[]).unwrap();
        let v1 = history.change(v0, value("b")).unwrap();
        let v2 = history.change(v1, value("c")).unwrap();

        for id in [v0, v1, v2] {
            let direct: Vec<VersionId> = history.changes_history(id).unwrap().iter().map(|(i, _)| *i).collect();
            assert!(!direct.contains(&id));
            assert!(!history.lineage(id).unwrap().contains(&id));
        }
        assert!(history.changes_history(v0).unwrap().is_empty());
    }

    #[test]
    fn changes_history_is_direct_and_lineage_is_transitive() {
        let mut history = PropertyHistory::new();
        let v0 = history.commit(owner("p1"), value("a"), HistoryState::Committed, &[]).unwrap();
        let v1 = history.change(v0, value("b")).unwrap();
        let v2 = history.change(v1, value("c")).unwrap();

        let direct: Vec<VersionId> = history.changes_history(v2).unwrap().iter().map(|(i, _)| *i).collect();
        assert_eq!(direct, vec![v1]);
        assert_eq!(history.lineage(v2).unwrap(), BTreeSet::from([v0, v1]));
    }

    #[test]
    fn concurrent_branches_merge_into_one_head() {
        let mut history = PropertyHistory::new();
        let root = history.commit(owner("p1"), value("root"), HistoryState::Committed, &[]).unwrap();
        let left = history.change(root, value("left")).unwrap();
        let right = history.change(root, value("right")).unwrap();
        assert_eq!(history.heads(), vec![left, right]);

        let merged = history.merge(&[left, right], value("left+right")).unwrap();
        assert_eq!(history.heads(), vec![merged]);
        assert_eq!(history.get(merged).unwrap().history_status(), HistoryState::Merged);
        assert_eq!(history.changes_history(merged).unwrap().len(), 2);
        assert_eq!(history.lineage(merged).unwrap(), BTreeSet::from([root, left, right]));
        assert_eq!(history.latest().map(|(id, _)| id), Some(merged));
    }

    #[test]
    fn merge_requires_two_distinct_predecessors() {
        let mut history = PropertyHistory::new();
        let root = history.commit(owner("p1"), value("root"), HistoryState::Committed, &[]).unwrap();
        assert!(matches!(
            history.merge(&[root, root], value("x")),
            Err(DomainError::InvariantViolation(_))
        ));
        assert!(history.merge(&[], value("x")).is_err());
    }

    #[test]
    fn unknown_or_foreign_predecessors_are_rejected() {
        let mut history = PropertyHistory::new();
        let root = history.commit(owner("p1"), value("root"), HistoryState::Committed, &[]).unwrap();

        assert!(matches!(
            history.commit(owner("p1"), value("x"), HistoryState::Committed, &[VersionId(7)]),
            Err(DomainError::InvalidArgument(_))
        ));
        assert!(matches!(
            history.commit(owner("p2"), value("x"), HistoryState::Committed, &[root]),
            Err(DomainError::InvariantViolation(_))
        ));
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn history_survives_serialization() {
        let mut history = PropertyHistory::new();
        let root = history.commit(owner("p1"), value("root"), HistoryState::Committed, &[]).unwrap();
        history.change(root, value("next")).unwrap();

        let json = serde_json::to_string(&history).unwrap();
        let back: PropertyHistory = serde_json::from_str(&json).unwrap();
        assert_eq!(back, history);
        assert_eq!(back.lineage(VersionId(1)).unwrap(), BTreeSet::from([root]));
    }
}
