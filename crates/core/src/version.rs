//! Structural type versioning.
//!
//! Stored facts carry a digest of their type's *shape* (simple name plus the
//! sorted `(field, type)` pairs, inherited ones included). Two types with the
//! same name and field set hash identically regardless of declaration order;
//! adding, removing or retyping a field changes the digest. Shapes are declared
//! explicitly by each type, so nothing is inspected at runtime.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use sha2::{Digest, Sha512};

/// Declared shape of a versioned type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeShape {
    name: &'static str,
    parent: Option<Box<TypeShape>>,
    fields: Vec<FieldShape>,
}

/// One declared field of a [`TypeShape`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FieldShape {
    pub name: &'static str,
    pub type_name: &'static str,
}

impl TypeShape {
    pub fn new(name: &'static str) -> Self {
        debug_assert!(!name.trim().is_empty(), "type shape name is required");
        Self {
            name,
            parent: None,
            fields: Vec::new(),
        }
    }

    /// Declare the shape this type inherits fields from.
    pub fn extends(mut self, parent: TypeShape) -> Self {
        self.parent = Some(Box::new(parent));
        self
    }

    pub fn field(mut self, name: &'static str, type_name: &'static str) -> Self {
        self.fields.push(FieldShape { name, type_name });
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn own_fields(&self) -> &[FieldShape] {
        &self.fields
    }

    /// Ancestor fields first (root-most first), then own fields, each level in
    /// declaration order.
    pub fn all_fields(&self) -> Vec<FieldShape> {
        let mut result = match &self.parent {
            Some(parent) => parent.all_fields(),
            None => Vec::new(),
        };
        result.extend_from_slice(&self.fields);
        result
    }
}

/// Strategy turning a type shape into a stable version digest.
pub trait VersionStrategy {
    fn compose_canonical_version_hash(&self, shape: &TypeShape) -> String;
}

/// SHA-512 + base64 digest over `TypeName{a:TypeA;b:TypeB}`.
#[derive(Debug, Default, Copy, Clone)]
pub struct StructuralVersionStrategy;

impl StructuralVersionStrategy {
    /// Canonical textual form hashed by [`VersionStrategy::compose_canonical_version_hash`].
    pub fn canonical_form(shape: &TypeShape) -> String {
        let mut fields = shape.all_fields();
        // Stable sort: same-named fields keep ancestor-first order.
        fields.sort_by(|a, b| a.name.cmp(b.name));

        let described: Vec<String> = fields
            .iter()
            .map(|f| format!("{}:{}", f.name, f.type_name))
            .collect();
        format!("{}{{{}}}", shape.name(), described.join(";"))
    }
}

impl VersionStrategy for StructuralVersionStrategy {
    fn compose_canonical_version_hash(&self, shape: &TypeShape) -> String {
        let digest = Sha512::digest(Self::canonical_form(shape).as_bytes());
        STANDARD.encode(digest)
    }
}

/// A type whose stored instances are tagged with a structural version hash.
pub trait Versioned {
    fn type_shape() -> TypeShape;

    fn version_hash() -> String {
        StructuralVersionStrategy.compose_canonical_version_hash(&Self::type_shape())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hash(shape: &TypeShape) -> String {
        StructuralVersionStrategy.compose_canonical_version_hash(shape)
    }

    fn ticket() -> TypeShape {
        TypeShape::new("Ticket")
            .field("title", "String")
            .field("priority", "u8")
    }

    #[test]
    fn canonical_form_sorts_fields_by_name() {
        assert_eq!(
            StructuralVersionStrategy::canonical_form(&ticket()),
            "Ticket{priority:u8;title:String}"
        );
        assert_eq!(
            StructuralVersionStrategy::canonical_form(&TypeShape::new("Empty")),
            "Empty{}"
        );
    }

    #[test]
    fn hashing_is_deterministic() {
        assert_eq!(hash(&ticket()), hash(&ticket()));
        // 64-byte digest, padded standard base64.
        assert_eq!(hash(&ticket()).len(), 88);
    }

    #[test]
    fn declaration_order_does_not_matter() {
        let reordered = TypeShape::new("Ticket")
            .field("priority", "u8")
            .field("title", "String");
        assert_eq!(hash(&ticket()), hash(&reordered));
    }

    #[test]
    fn structural_changes_change_the_digest() {
        let added = ticket().field("owner", "String");
        let retyped = TypeShape::new("Ticket")
            .field("title", "String")
            .field("priority", "u16");
        let renamed = TypeShape::new("Incident")
            .field("title", "String")
            .field("priority", "u8");
        let removed = TypeShape::new("Ticket").field("title", "String");

        for other in [added, retyped, renamed, removed] {
            assert_ne!(hash(&ticket()), hash(&other));
        }
    }

    #[test]
    fn inherited_fields_take_part_in_the_digest() {
        let base = TypeShape::new("Fact").field("occurred_at", "DateTime");
        let child = TypeShape::new("Ticket")
            .extends(base)
            .field("title", "String");
        assert_eq!(
            StructuralVersionStrategy::canonical_form(&child),
            "Ticket{occurred_at:DateTime;title:String}"
        );

        let flattened = TypeShape::new("Ticket")
            .field("title", "String")
            .field("occurred_at", "DateTime");
        assert_eq!(hash(&child), hash(&flattened));
    }

    #[test]
    fn versioned_types_expose_their_hash() {
        struct Sample;
        impl Versioned for Sample {
            fn type_shape() -> TypeShape {
                TypeShape::new("Sample").field("id", "String")
            }
        }
        assert_eq!(Sample::version_hash(), hash(&Sample::type_shape()));
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        const NAMES: [&str; 6] = ["alpha", "beta", "gamma", "delta", "epsilon", "zeta"];
        const TYPES: [&str; 3] = ["String", "u64", "bool"];

        proptest! {
            /// Property: any permutation of the same field set hashes identically.
            #[test]
            fn permutation_invariant(
                picks in proptest::collection::vec((0usize..6, 0usize..3), 0..6),
                seed in any::<u64>(),
            ) {
                let mut fields: Vec<(&'static str, &'static str)> = Vec::new();
                for (n, t) in picks {
                    if !fields.iter().any(|(name, _)| *name == NAMES[n]) {
                        fields.push((NAMES[n], TYPES[t]));
                    }
                }
                let mut shuffled = fields.clone();
                if !shuffled.is_empty() {
                    let len = shuffled.len();
                    shuffled.rotate_left((seed as usize) % len);
                    shuffled.reverse();
                }

                let a = fields.iter().fold(TypeShape::new("T"), |s, &(n, t)| s.field(n, t));
                let b = shuffled.iter().fold(TypeShape::new("T"), |s, &(n, t)| s.field(n, t));
                prop_assert_eq!(hash(&a), hash(&b));
            }
        }
    }
}
