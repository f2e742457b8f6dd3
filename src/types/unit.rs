//! Change units and change unit maps.
//!
//! ## Source Format
//!
//! A [`ChangeUnitMap`] deserializes from JSON of the form:
//!
//! ```json
//! {
//!   "settings": { "sync_schema_timeout_ms": 5000 },
//!   "units": {
//!     "users/schema": { "tx": [ { "op": "install_attribute", "ident": "user/email", "value_type": "string", "unique": true } ] },
//!     "users/backfill": { "generator": "users/backfill", "requires": ["users/schema"] }
//!   }
//! }
//! ```
//!
//! Loading that JSON from files or bundled resources is left to the caller.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::tx::TxData;

/// A named, idempotently applicable bundle of writes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangeUnit {
    /// Literal transaction. Takes precedence over `generator`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx: Option<TxData>,
    /// Registry key of a generator that builds the transaction at
    /// resolution time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generator: Option<String>,
    /// Units that must be conformed first, in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requires: Vec<String>,
}

impl ChangeUnit {
    /// A unit with a literal transaction.
    pub fn transaction(tx: TxData) -> Self {
        Self {
            tx: Some(tx),
            ..Self::default()
        }
    }

    /// A unit whose transaction comes from a registered generator.
    pub fn generated(key: impl Into<String>) -> Self {
        Self {
            generator: Some(key.into()),
            ..Self::default()
        }
    }

    /// Set the required units.
    pub fn requires<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.requires = names.into_iter().map(Into::into).collect();
        self
    }
}

/// Global settings carried alongside the units.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapSettings {
    /// Upper bound for the schema-sync wait before each commit.
    /// No wait is performed when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync_schema_timeout_ms: Option<u64>,
}

impl MapSettings {
    /// The schema-sync timeout as a `Duration`.
    pub fn sync_schema_timeout(&self) -> Option<Duration> {
        self.sync_schema_timeout_ms.map(Duration::from_millis)
    }
}

/// Mapping from change unit name to definition.
///
/// Uses a `BTreeMap` so "all units" has a deterministic order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangeUnitMap {
    /// Global settings.
    #[serde(default)]
    pub settings: MapSettings,
    /// Units by name.
    #[serde(default)]
    pub units: BTreeMap<String, ChangeUnit>,
}

impl ChangeUnitMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a unit, builder style.
    pub fn with_unit(mut self, name: impl Into<String>, unit: ChangeUnit) -> Self {
        self.units.insert(name.into(), unit);
        self
    }

    /// Set the schema-sync timeout, builder style.
    pub fn with_sync_schema_timeout(mut self, timeout: Duration) -> Self {
        let millis = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self.settings.sync_schema_timeout_ms = Some(millis);
        self
    }

    /// Look up a unit.
    pub fn get(&self, name: &str) -> Option<&ChangeUnit> {
        self.units.get(name)
    }

    /// All unit names in key order.
    pub fn names(&self) -> Vec<String> {
        self.units.keys().cloned().collect()
    }

    /// Number of units.
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Whether the map has no units.
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}
