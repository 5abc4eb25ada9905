//! Persistence naming convention.
//!
//! Every stored component is addressed as `domainName:category[:identifier]`.

use factline_core::{DomainError, DomainResult, require_text};

/// Separator between the segments of a persistence name.
pub const KEY_NAME_SEPARATOR: &str = ":";

/// Kind of persisted component.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum NamingCategory {
    Tenant,
    Stream,
    Snapshot,
}

impl NamingCategory {
    pub fn label(self) -> &'static str {
        match self {
            NamingCategory::Tenant => "tenant",
            NamingCategory::Stream => "stream",
            NamingCategory::Snapshot => "snapshot",
        }
    }
}

impl core::fmt::Display for NamingCategory {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.label())
    }
}

fn segment(value: &str, what: &str) -> DomainResult<()> {
    require_text(value, what)?;
    if value.contains(KEY_NAME_SEPARATOR) {
        return Err(DomainError::invalid_argument(format!(
            "{what} must not contain '{KEY_NAME_SEPARATOR}'"
        )));
    }
    Ok(())
}

/// `domainName:category`
pub fn build_namespace(category: NamingCategory, domain_name: &str) -> DomainResult<String> {
    segment(domain_name, "domain name")?;
    Ok([domain_name, category.label()].join(KEY_NAME_SEPARATOR))
}

/// `domainName:category:identifier`
///
/// The identifier may itself contain separators (combined identifiers do).
pub fn build_component_name(category: NamingCategory, domain_name: &str, identifier: &str) -> DomainResult<String> {
    require_text(identifier, "component identifier")?;
    let namespace = build_namespace(category, domain_name)?;
    Ok([namespace.as_str(), identifier].join(KEY_NAME_SEPARATOR))
}

/// Naming convention bound to one domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamingConvention {
    domain_name: String,
}

impl NamingConvention {
    pub fn new(domain_name: impl Into<String>) -> DomainResult<Self> {
        let domain_name = domain_name.into();
        segment(&domain_name, "domain name")?;
        Ok(Self { domain_name })
    }

    pub fn domain_name(&self) -> &str {
        &self.domain_name
    }

    pub fn namespace(&self, category: NamingCategory) -> DomainResult<String> {
        build_namespace(category, &self.domain_name)
    }

    /// Storage key of one aggregate's event stream.
    pub fn stream_key(&self, aggregate_id: &str) -> DomainResult<String> {
        build_component_name(NamingCategory::Stream, &self.domain_name, aggregate_id)
    }

    /// Namespace holding the snapshots of this domain.
    pub fn snapshot_namespace(&self) -> DomainResult<String> {
        self.namespace(NamingCategory::Snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_colon_separated_names() {
        assert_eq!(build_namespace(NamingCategory::Stream, "cockpit").unwrap(), "cockpit:stream");
        assert_eq!(
            build_component_name(NamingCategory::Tenant, "access", "t-42").unwrap(),
            "access:tenant:t-42"
        );

        let naming = NamingConvention::new("cockpit").unwrap();
        assert_eq!(naming.stream_key("a:b").unwrap(), "cockpit:stream:a:b");
        assert_eq!(naming.snapshot_namespace().unwrap(), "cockpit:snapshot");
    }

    #[test]
    fn blank_segments_are_rejected() {
        assert!(build_namespace(NamingCategory::Stream, " ").is_err());
        assert!(build_component_name(NamingCategory::Stream, "cockpit", "").is_err());
        assert!(NamingConvention::new("bad:name").is_err());
    }
}
