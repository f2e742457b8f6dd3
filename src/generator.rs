//! Transaction generators.
//!
//! A change unit may name a generator instead of carrying a literal
//! transaction. Generators are registered by the embedding application under
//! stable keys and looked up explicitly; an unknown key is an error, never a
//! dynamic load.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::store::{Snapshot, Store, StoreError};
use crate::types::TxData;

/// Error raised by a generator.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{0}")]
pub struct GeneratorError(pub String);

impl GeneratorError {
    /// Create a generator error from any message.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<StoreError> for GeneratorError {
    fn from(e: StoreError) -> Self {
        Self(e.to_string())
    }
}

/// Builds a change unit's transaction at resolution time.
///
/// Receives a live store handle and may read or transact through it.
#[async_trait]
pub trait TxGenerator: Send + Sync {
    /// Produce transaction data.
    async fn generate(&self, store: &dyn Store) -> Result<TxData, GeneratorError>;
}

/// Generator built from a function of the current snapshot.
pub struct SnapshotFn<F>(F);

#[async_trait]
impl<F> TxGenerator for SnapshotFn<F>
where
    F: Fn(&Snapshot) -> Result<TxData, GeneratorError> + Send + Sync,
{
    async fn generate(&self, store: &dyn Store) -> Result<TxData, GeneratorError> {
        let snapshot = store.current_snapshot().await?;
        (self.0)(&snapshot)
    }
}

/// Registry of generators by key.
#[derive(Clone, Default)]
pub struct GeneratorRegistry {
    generators: BTreeMap<String, Arc<dyn TxGenerator>>,
}

impl GeneratorRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a generator, replacing any previous one under `key`.
    pub fn register(&mut self, key: impl Into<String>, generator: Arc<dyn TxGenerator>) -> &mut Self {
        self.generators.insert(key.into(), generator);
        self
    }

    /// Register a function of the current snapshot.
    pub fn register_fn<F>(&mut self, key: impl Into<String>, f: F) -> &mut Self
    where
        F: Fn(&Snapshot) -> Result<TxData, GeneratorError> + Send + Sync + 'static,
    {
        self.register(key, Arc::new(SnapshotFn(f)))
    }

    /// Look up a generator.
    pub fn resolve(&self, key: &str) -> Option<Arc<dyn TxGenerator>> {
        self.generators.get(key).cloned()
    }

    /// Registered keys in order.
    pub fn keys(&self) -> Vec<&str> {
        self.generators.keys().map(String::as_str).collect()
    }

    /// Number of registered generators.
    pub fn len(&self) -> usize {
        self.generators.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.generators.is_empty()
    }
}

impl std::fmt::Debug for GeneratorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeneratorRegistry")
            .field("keys", &self.keys())
            .finish()
    }
}
