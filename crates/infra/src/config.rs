//! Kernel configuration.
//!
//! Loaded from the environment with per-key fallbacks:
//!
//! | variable                     | field               | default   |
//! |------------------------------|---------------------|-----------|
//! | `FACTLINE_DOMAIN`            | `domain_name`       | `factline`|
//! | `FACTLINE_SNAPSHOT_EVERY`    | `snapshot_frequency`| `0`       |
//! | `FACTLINE_SNAPSHOT_TTL_SECS` | `snapshot_ttl_secs` | none      |
//! | `FACTLINE_MAX_PAGE_SIZE`     | `max_page_size`     | `1000`    |

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::event_store::StoreError;
use crate::event_store::query::MAX_PAGE_SIZE;

pub const ENV_DOMAIN: &str = "FACTLINE_DOMAIN";
pub const ENV_SNAPSHOT_EVERY: &str = "FACTLINE_SNAPSHOT_EVERY";
pub const ENV_SNAPSHOT_TTL_SECS: &str = "FACTLINE_SNAPSHOT_TTL_SECS";
pub const ENV_MAX_PAGE_SIZE: &str = "FACTLINE_MAX_PAGE_SIZE";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    /// First segment of every persistence name.
    pub domain_name: String,
    /// Take a snapshot every N events (0 = never).
    pub snapshot_frequency: u64,
    /// Snapshot lifetime; `None` keeps snapshots forever.
    pub snapshot_ttl_secs: Option<u64>,
    /// Upper bound applied to paginated loads.
    pub max_page_size: u32,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            domain_name: "factline".to_string(),
            snapshot_frequency: 0,
            snapshot_ttl_secs: None,
            max_page_size: MAX_PAGE_SIZE,
        }
    }
}

impl KernelConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup (environment, test map, ...).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let domain_name = match lookup(ENV_DOMAIN) {
            Some(v) if !v.trim().is_empty() => v.trim().to_string(),
            _ => defaults.domain_name,
        };

        Self {
            domain_name,
            snapshot_frequency: parsed(&lookup, ENV_SNAPSHOT_EVERY).unwrap_or(defaults.snapshot_frequency),
            snapshot_ttl_secs: parsed(&lookup, ENV_SNAPSHOT_TTL_SECS).or(defaults.snapshot_ttl_secs),
            max_page_size: parsed(&lookup, ENV_MAX_PAGE_SIZE).unwrap_or(defaults.max_page_size),
        }
    }

    pub fn validate(&self) -> Result<(), StoreError> {
        if self.domain_name.trim().is_empty() {
            return Err(StoreError::unoperational("configuration: domain_name is blank"));
        }
        if self.max_page_size == 0 {
            return Err(StoreError::unoperational("configuration: max_page_size must be greater than zero"));
        }
        Ok(())
    }

    pub fn snapshot_ttl(&self) -> Option<Duration> {
        self.snapshot_ttl_secs.map(Duration::from_secs)
    }
}

fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "unparsable configuration value, using default");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn reads_every_key() {
        let cfg = KernelConfig::from_lookup(lookup(&[
            (ENV_DOMAIN, "cockpit"),
            (ENV_SNAPSHOT_EVERY, "25"),
            (ENV_SNAPSHOT_TTL_SECS, "3600"),
            (ENV_MAX_PAGE_SIZE, "200"),
        ]));
        assert_eq!(cfg.domain_name, "cockpit");
        assert_eq!(cfg.snapshot_frequency, 25);
        assert_eq!(cfg.snapshot_ttl(), Some(Duration::from_secs(3600)));
        assert_eq!(cfg.max_page_size, 200);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn bad_values_fall_back_to_defaults() {
        let cfg = KernelConfig::from_lookup(lookup(&[(ENV_DOMAIN, "  "), (ENV_SNAPSHOT_EVERY, "often")]));
        assert_eq!(cfg, KernelConfig::default());
    }

    #[test]
    fn validate_rejects_unusable_settings() {
        let cfg = KernelConfig {
            max_page_size: 0,
            ..KernelConfig::default()
        };
        assert!(cfg.validate().is_err());

        let cfg: KernelConfig = serde_json::from_str(r#"{"domain_name": ""}"#).unwrap();
        assert!(cfg.validate().is_err());
    }
}
