//! Change unit resolver.
//!
//! The resolver brings a store into conformance with a set of requested
//! change units, applying each at most once.
//!
//! ## Algorithm
//!
//! 1. Pick the marker attribute (configured, else detected) and bootstrap
//!    the ledger
//! 2. Compute the application order: dependencies first, depth-first,
//!    left-to-right
//! 3. For each unit in order:
//!    - Re-read the current snapshot; skip the unit if it is conformed
//!    - Resolve its payload (literal, else registered generator)
//!    - If a sync timeout is configured, wait for schema sync within it
//!    - Submit payload + marker through the guard as one transaction
//!    - Record the unit if the transaction produced datoms
//! 4. On the first failure, stop and return what was applied so far
//!
//! Committed units are never rolled back. Retrying is safe: applied units
//! are skipped, and the guard turns a racing duplicate into an empty commit.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::canonical::canonical_hash_hex;
use crate::config::ConformityConfig;
use crate::error::{ConformityError, ResolutionError};
use crate::generator::GeneratorRegistry;
use crate::guard::guarded_statement;
use crate::ledger;
use crate::plan::application_order;
use crate::store::{Snapshot, SpeculativeOutcome, SpeculativeStore, Store, StoreError};
use crate::types::{AppliedUnit, ApplicationResult, ChangeUnitMap, TxData};

/// Applies change units to a store.
///
/// Holds the generator registry and resolution settings; the store and the
/// change unit map are supplied per call.
#[derive(Debug, Clone, Default)]
pub struct Conformer {
    generators: GeneratorRegistry,
    marker_attribute: Option<String>,
    sync_schema_timeout: Option<Duration>,
}

impl Conformer {
    /// Create a conformer with no generators, a detected marker attribute
    /// and no schema-sync wait.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a conformer from configuration.
    pub fn from_config(config: &ConformityConfig) -> Self {
        Self {
            generators: GeneratorRegistry::new(),
            marker_attribute: config.marker_attribute.clone(),
            sync_schema_timeout: config.sync_schema_timeout,
        }
    }

    /// Use `generators` to resolve generator payloads.
    pub fn with_generators(mut self, generators: GeneratorRegistry) -> Self {
        self.generators = generators;
        self
    }

    /// Use an explicit marker attribute instead of detecting one.
    pub fn with_marker_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.marker_attribute = Some(attribute.into());
        self
    }

    /// Schema-sync bound used when the change unit map sets none.
    pub fn with_sync_schema_timeout(mut self, timeout: Duration) -> Self {
        self.sync_schema_timeout = Some(timeout);
        self
    }

    /// The generator registry.
    pub fn generators(&self) -> &GeneratorRegistry {
        &self.generators
    }

    /// Marker attribute this conformer uses for `snapshot`.
    pub fn marker_attribute_for(&self, snapshot: &Snapshot) -> String {
        self.marker_attribute
            .clone()
            .unwrap_or_else(|| ledger::detect_marker_attribute(snapshot))
    }

    /// Whether `name` is conformed in the store's current snapshot.
    pub async fn conforms_to<S: Store>(&self, store: &S, name: &str) -> Result<bool, StoreError> {
        let snapshot = store.current_snapshot().await?;
        let attribute = self.marker_attribute_for(&snapshot);
        Ok(ledger::conforms_to(&snapshot, &attribute, name))
    }

    /// Conform the store to the requested units, in order.
    pub async fn ensure_conforms<S, N>(
        &self,
        store: &S,
        map: &ChangeUnitMap,
        names: &[N],
    ) -> Result<ApplicationResult, ConformityError>
    where
        S: Store,
        N: AsRef<str>,
    {
        self.resolve(store, map, names).await
    }

    /// Conform the store to every unit of the map, in key order.
    pub async fn ensure_all<S: Store>(
        &self,
        store: &S,
        map: &ChangeUnitMap,
    ) -> Result<ApplicationResult, ConformityError> {
        let names = map.names();
        self.resolve(store, map, names.as_slice()).await
    }

    /// Run the same resolution against a throwaway copy of `snapshot`.
    pub async fn with_conforms<N: AsRef<str>>(
        &self,
        snapshot: Snapshot,
        map: &ChangeUnitMap,
        names: &[N],
    ) -> Result<SpeculativeOutcome, ConformityError> {
        let store = SpeculativeStore::new(snapshot);
        let result = self.resolve(&store, map, names).await?;
        Ok(SpeculativeOutcome {
            snapshot: store.into_snapshot(),
            result,
        })
    }

    /// Speculative counterpart of [`ensure_all`](Self::ensure_all).
    pub async fn with_all(
        &self,
        snapshot: Snapshot,
        map: &ChangeUnitMap,
    ) -> Result<SpeculativeOutcome, ConformityError> {
        let names = map.names();
        self.with_conforms(snapshot, map, names.as_slice()).await
    }

    async fn resolve<S, N>(
        &self,
        store: &S,
        map: &ChangeUnitMap,
        names: &[N],
    ) -> Result<ApplicationResult, ConformityError>
    where
        S: Store,
        N: AsRef<str>,
    {
        let snapshot = store
            .current_snapshot()
            .await
            .map_err(ConformityError::bootstrap)?;
        let marker_attribute = self.marker_attribute_for(&snapshot);
        ledger::ensure_ledger(store, &marker_attribute)
            .await
            .map_err(ConformityError::bootstrap)?;

        let order = application_order(map, names).map_err(|cycle| {
            let unit = cycle.unit.clone();
            ConformityError::for_unit(unit, cycle.into(), ApplicationResult::new())
        })?;

        let timeout = map.settings.sync_schema_timeout().or(self.sync_schema_timeout);
        let mut applied = ApplicationResult::new();

        for name in order {
            match self.conform_unit(store, &marker_attribute, map, &name, timeout).await {
                Ok(Some(entry)) => applied.push(entry),
                Ok(None) => {}
                Err(cause) => {
                    warn!(
                        unit = %name,
                        applied = applied.len(),
                        error = %cause,
                        "Resolution aborted"
                    );
                    return Err(ConformityError::for_unit(name, cause, applied));
                }
            }
        }

        Ok(applied)
    }

    async fn conform_unit<S: Store>(
        &self,
        store: &S,
        marker_attribute: &str,
        map: &ChangeUnitMap,
        name: &str,
        timeout: Option<Duration>,
    ) -> Result<Option<AppliedUnit>, ResolutionError> {
        let snapshot = store.current_snapshot().await?;
        if ledger::conforms_to(&snapshot, marker_attribute, name) {
            debug!(unit = %name, "Already conformed");
            return Ok(None);
        }

        let payload = self.payload(store, map, name).await?;
        let fingerprint = canonical_hash_hex(&payload);

        if let Some(timeout) = timeout {
            tokio::time::timeout(timeout, store.sync_schema())
                .await
                .map_err(|_| ResolutionError::SyncTimeout { timeout })??;
        }

        let report = store
            .transact(vec![guarded_statement(marker_attribute, name, payload)])
            .await
            .map_err(ResolutionError::StoreSubmission)?;

        if report.is_noop() {
            debug!(unit = %name, tx_id = report.tx_id, "Conformed concurrently");
            return Ok(None);
        }

        info!(
            unit = %name,
            tx_id = report.tx_id,
            datoms = report.datom_count(),
            fingerprint = %fingerprint,
            "Applied change unit"
        );
        Ok(Some(AppliedUnit {
            name: name.to_string(),
            fingerprint,
            tx: report,
        }))
    }

    async fn payload<S: Store>(
        &self,
        store: &S,
        map: &ChangeUnitMap,
        name: &str,
    ) -> Result<TxData, ResolutionError> {
        let missing = || ResolutionError::MissingPayload {
            name: name.to_string(),
        };
        let unit = map.get(name).ok_or_else(missing)?;

        let payload = match (&unit.tx, &unit.generator) {
            (Some(tx), _) if !tx.is_empty() => tx.clone(),
            (_, Some(key)) => {
                let generator = self.generators.resolve(key).ok_or_else(|| {
                    ResolutionError::UnregisteredGenerator {
                        generator: key.clone(),
                    }
                })?;
                generator
                    .generate(store)
                    .await
                    .map_err(|e| ResolutionError::GeneratorFailure {
                        generator: key.clone(),
                        reason: e.to_string(),
                    })?
            }
            _ => return Err(missing()),
        };

        if payload.is_empty() {
            return Err(missing());
        }
        Ok(payload)
    }
}

/// Conform `store` to `names` with a default [`Conformer`].
pub async fn ensure_conforms<S, N>(
    store: &S,
    map: &ChangeUnitMap,
    names: &[N],
) -> Result<ApplicationResult, ConformityError>
where
    S: Store,
    N: AsRef<str>,
{
    Conformer::new().ensure_conforms(store, map, names).await
}

/// Conform `store` to every unit of `map` with a default [`Conformer`].
pub async fn ensure_all<S: Store>(
    store: &S,
    map: &ChangeUnitMap,
) -> Result<ApplicationResult, ConformityError> {
    Conformer::new().ensure_all(store, map).await
}

/// Speculatively conform `snapshot` to `names` with a default [`Conformer`].
pub async fn with_conforms<N: AsRef<str>>(
    snapshot: Snapshot,
    map: &ChangeUnitMap,
    names: &[N],
) -> Result<SpeculativeOutcome, ConformityError> {
    Conformer::new().with_conforms(snapshot, map, names).await
}

/// Speculatively conform `snapshot` to every unit of `map`.
pub async fn with_all(
    snapshot: Snapshot,
    map: &ChangeUnitMap,
) -> Result<SpeculativeOutcome, ConformityError> {
    Conformer::new().with_all(snapshot, map).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AttributeSpec, ChangeUnit, EntityRef, TxStatement, Value, ValueType};

    fn schema_map() -> ChangeUnitMap {
        ChangeUnitMap::new()
            .with_unit(
                "a",
                ChangeUnit::transaction(vec![TxStatement::InstallAttribute(AttributeSpec::new(
                    "a/x",
                    ValueType::Long,
                ))]),
            )
            .with_unit(
                "b",
                ChangeUnit::transaction(vec![TxStatement::add(EntityRef::temp("e"), "a/x", Value::Long(1))])
                    .requires(["a"]),
            )
    }

    #[tokio::test]
    async fn test_explicit_marker_attribute_is_used() {
        let store = crate::store::InMemoryStore::new();
        let conformer = Conformer::new().with_marker_attribute("app/applied");

        let result = conformer.ensure_conforms(&store, &schema_map(), &["b"]).await.unwrap();
        assert_eq!(result.names(), vec!["a", "b"]);

        let snapshot = store.current_snapshot().await.unwrap();
        assert!(snapshot.has_attribute("app/applied"));
        assert!(!snapshot.has_attribute(ledger::DEFAULT_MARKER_ATTRIBUTE));
        assert!(conformer.conforms_to(&store, "b").await.unwrap());
        assert!(!Conformer::new().conforms_to(&store, "b").await.unwrap());
    }

    #[tokio::test]
    async fn test_from_config_carries_settings() {
        let config = ConformityConfig {
            marker_attribute: Some("app/applied".to_string()),
            sync_schema_timeout: Some(Duration::from_millis(10)),
        };
        let store = crate::store::InMemoryStore::new().with_schema_latency(Duration::from_millis(200));

        let err = Conformer::from_config(&config)
            .ensure_conforms(&store, &schema_map(), &["a"])
            .await
            .unwrap_err();

        assert_eq!(
            err.cause(),
            &ResolutionError::SyncTimeout { timeout: Duration::from_millis(10) }
        );
        let snapshot = store.current_snapshot().await.unwrap();
        assert!(snapshot.has_attribute("app/applied"));
    }

    #[tokio::test]
    async fn test_cycle_names_the_closing_unit() {
        let map = schema_map()
            .with_unit("root", ChangeUnit::transaction(vec![]).requires(["x"]))
            .with_unit("x", ChangeUnit::transaction(vec![]).requires(["y"]))
            .with_unit("y", ChangeUnit::transaction(vec![]).requires(["x"]));
        let store = crate::store::InMemoryStore::new();

        let err = ensure_conforms(&store, &map, &["a", "root"]).await.unwrap_err();

        assert_eq!(err.failed().unwrap().name, "x");
        assert_eq!(err.reason(), "Dependency cycle: x -> y -> x");
        assert!(err.succeeded().is_empty());
        assert!(!store.current_snapshot().await.unwrap().has_attribute("a/x"));
    }

    #[tokio::test]
    async fn test_empty_literal_falls_back_to_generator() {
        let mut generators = GeneratorRegistry::new();
        generators.register_fn("gen/x", |_| {
            Ok(vec![TxStatement::add(EntityRef::temp("e"), "a/x", Value::Long(2))])
        });
        let map = schema_map().with_unit(
            "c",
            ChangeUnit {
                tx: Some(vec![]),
                generator: Some("gen/x".to_string()),
                requires: vec!["a".to_string()],
            },
        );

        let store = crate::store::InMemoryStore::new();
        let result = Conformer::new()
            .with_generators(generators)
            .ensure_conforms(&store, &map, &["c"])
            .await
            .unwrap();
        assert_eq!(result.names(), vec!["a", "c"]);
    }

    #[tokio::test]
    async fn test_undefined_unit_is_missing_payload() {
        let store = crate::store::InMemoryStore::new();
        let err = ensure_conforms(&store, &schema_map(), &["a", "nope"]).await.unwrap_err();

        assert_eq!(err.succeeded().names(), vec!["a"]);
        assert_eq!(
            err.cause(),
            &ResolutionError::MissingPayload { name: "nope".to_string() }
        );
    }

    #[tokio::test]
    async fn test_with_all_leaves_origin_untouched() {
        let origin = Snapshot::empty();
        let outcome = with_all(origin.clone(), &schema_map()).await.unwrap();

        assert_eq!(outcome.result.names(), vec!["a", "b"]);
        assert!(outcome.snapshot.has_attribute("a/x"));
        assert!(!origin.has_attribute("a/x"));
    }
}
