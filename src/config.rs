//! Conformer configuration.
//!
//! ## Configuration
//!
//! All settings can be configured via environment variables:
//! - `CONFORMITY_MARKER_ATTRIBUTE`: explicit marker attribute (default: detected per store)
//! - `CONFORMITY_SYNC_TIMEOUT_MS`: schema-sync bound used when a change unit
//!   map sets none (default: no wait)

use std::time::Duration;

/// Configuration for a [`Conformer`](crate::Conformer).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConformityConfig {
    /// Marker attribute to use instead of detecting one.
    pub marker_attribute: Option<String>,
    /// Fallback schema-sync timeout.
    pub sync_schema_timeout: Option<Duration>,
}

impl ConformityConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// Blank values are treated as unset; unparsable timeouts are ignored.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let marker_attribute = lookup("CONFORMITY_MARKER_ATTRIBUTE")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        let sync_schema_timeout = lookup("CONFORMITY_SYNC_TIMEOUT_MS")
            .and_then(|s| s.trim().parse::<u64>().ok())
            .map(Duration::from_millis);

        Self {
            marker_attribute,
            sync_schema_timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        assert_eq!(ConformityConfig::from_lookup(lookup(&[])), ConformityConfig::default());
    }

    #[test]
    fn test_reads_values() {
        let config = ConformityConfig::from_lookup(lookup(&[
            ("CONFORMITY_MARKER_ATTRIBUTE", " app/conformed "),
            ("CONFORMITY_SYNC_TIMEOUT_MS", "1500"),
        ]));

        assert_eq!(config.marker_attribute.as_deref(), Some("app/conformed"));
        assert_eq!(config.sync_schema_timeout, Some(Duration::from_millis(1500)));
    }

    #[test]
    fn test_ignores_blank_and_garbage() {
        let config = ConformityConfig::from_lookup(lookup(&[
            ("CONFORMITY_MARKER_ATTRIBUTE", "  "),
            ("CONFORMITY_SYNC_TIMEOUT_MS", "soon"),
        ]));

        assert_eq!(config, ConformityConfig::default());
    }
}
