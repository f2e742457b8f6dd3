//! In-memory transactor.

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{ProcedureSpec, Snapshot, Store, StoreError};
use crate::types::{TxData, TxReport};

/// In-memory transactor.
///
/// Every transaction, including procedure expansion, runs while holding one
/// lock, so a procedure's read of the current snapshot and the resulting
/// write are never interleaved with another transaction.
///
/// Keeps an append-only log of committed transaction reports.
#[derive(Debug)]
pub struct InMemoryStore {
    state: Mutex<TransactorState>,
    schema_latency: Option<Duration>,
}

#[derive(Debug)]
struct TransactorState {
    snapshot: Snapshot,
    log: Vec<TxReport>,
}

impl InMemoryStore {
    /// Create a store holding an empty snapshot.
    pub fn new() -> Self {
        Self::from_snapshot(Snapshot::empty())
    }

    /// Create a store starting from an existing snapshot.
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        Self {
            state: Mutex::new(TransactorState {
                snapshot,
                log: Vec::new(),
            }),
            schema_latency: None,
        }
    }

    /// Simulate asynchronous schema propagation: `sync_schema` takes
    /// `latency` to complete.
    pub fn with_schema_latency(mut self, latency: Duration) -> Self {
        self.schema_latency = Some(latency);
        self
    }

    /// Reports of every committed transaction, oldest first.
    pub fn log(&self) -> Vec<TxReport> {
        self.state.lock().log.clone()
    }

    /// Number of committed transactions.
    pub fn log_len(&self) -> usize {
        self.state.lock().log.len()
    }

    fn snapshot(&self) -> Snapshot {
        self.state.lock().snapshot.clone()
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn current_snapshot(&self) -> Result<Snapshot, StoreError> {
        Ok(self.snapshot())
    }

    async fn transact(&self, tx_data: TxData) -> Result<TxReport, StoreError> {
        let mut state = self.state.lock();
        let (next, report) = state.snapshot.with(tx_data)?;
        state.snapshot = next;
        state.log.push(report.clone());
        Ok(report)
    }

    async fn sync(&self) -> Result<Snapshot, StoreError> {
        Ok(self.snapshot())
    }

    async fn sync_schema(&self) -> Result<Snapshot, StoreError> {
        if let Some(latency) = self.schema_latency {
            tokio::time::sleep(latency).await;
        }
        Ok(self.snapshot())
    }

    async fn install_procedure(&self, spec: ProcedureSpec) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        state.snapshot = state.snapshot.with_procedure(spec);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AttributeSpec, EntityRef, TxStatement, Value, ValueType};

    #[tokio::test]
    async fn test_transact_advances_snapshot_and_log() {
        let store = InMemoryStore::new();
        store
            .install_attribute(AttributeSpec::new("item/sku", ValueType::String).unique())
            .await
            .unwrap();

        let report = store
            .transact(vec![TxStatement::add(EntityRef::temp("i"), "item/sku", Value::string("A-1"))])
            .await
            .unwrap();

        let snapshot = store.current_snapshot().await.unwrap();
        assert_eq!(snapshot.basis_t(), 2);
        assert_eq!(store.log_len(), 2);
        assert_eq!(store.log()[1], report);
        assert_eq!(
            snapshot.entities_with("item/sku", &Value::string("A-1")),
            vec![report.tempid("i").unwrap()]
        );
    }

    #[tokio::test]
    async fn test_failed_transaction_is_not_logged() {
        let store = InMemoryStore::new();
        let err = store
            .transact(vec![TxStatement::add(EntityRef::Tx, "item/sku", Value::string("A-1"))])
            .await
            .unwrap_err();

        assert_eq!(err, StoreError::UnknownAttribute("item/sku".to_string()));
        assert_eq!(store.log_len(), 0);
        assert_eq!(store.current_snapshot().await.unwrap().basis_t(), 0);
    }

    #[tokio::test]
    async fn test_sync_schema_waits_for_latency() {
        let store = InMemoryStore::new().with_schema_latency(Duration::from_millis(200));

        let waited = tokio::time::timeout(Duration::from_millis(10), store.sync_schema()).await;
        assert!(waited.is_err());

        assert!(store.sync().await.is_ok());
    }
}
