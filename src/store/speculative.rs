//! Speculative store for dry runs.
//!
//! Holds "the snapshot as of the last speculative transaction" in a single
//! slot. Transactions are applied with [`Snapshot::with`] and swap the slot;
//! nothing leaves the process.
//!
//! Intended for one logical caller at a time. The lock makes individual calls
//! safe but gives no isolation between interleaved dry runs.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;

use super::{ProcedureSpec, Snapshot, Store, StoreError};
use crate::types::{ApplicationResult, TxData, TxReport};

/// Single-slot in-memory store.
#[derive(Debug)]
pub struct SpeculativeStore {
    slot: Mutex<Snapshot>,
}

impl SpeculativeStore {
    /// Wrap a snapshot.
    pub fn new(snapshot: Snapshot) -> Self {
        Self {
            slot: Mutex::new(snapshot),
        }
    }

    /// The snapshot currently held.
    pub fn snapshot(&self) -> Snapshot {
        self.slot.lock().clone()
    }

    /// Consume the store, returning the held snapshot.
    pub fn into_snapshot(self) -> Snapshot {
        self.slot.into_inner()
    }
}

#[async_trait]
impl Store for SpeculativeStore {
    async fn current_snapshot(&self) -> Result<Snapshot, StoreError> {
        Ok(self.snapshot())
    }

    async fn transact(&self, tx_data: TxData) -> Result<TxReport, StoreError> {
        let mut slot = self.slot.lock();
        let (next, report) = slot.with(tx_data)?;
        *slot = next;
        Ok(report)
    }

    async fn sync(&self) -> Result<Snapshot, StoreError> {
        Ok(self.snapshot())
    }

    async fn sync_schema(&self) -> Result<Snapshot, StoreError> {
        Ok(self.snapshot())
    }

    async fn install_procedure(&self, spec: ProcedureSpec) -> Result<(), StoreError> {
        let mut slot = self.slot.lock();
        *slot = slot.with_procedure(spec);
        Ok(())
    }
}

/// Result of a speculative resolution.
#[derive(Debug, Clone, Serialize)]
pub struct SpeculativeOutcome {
    /// Snapshot after every speculative transaction.
    #[serde(skip)]
    pub snapshot: Snapshot,
    /// Units that would have been applied.
    pub result: ApplicationResult,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AttributeSpec, EntityRef, TxStatement, Value, ValueType};

    #[tokio::test]
    async fn test_transact_swaps_slot_without_touching_origin() {
        let (origin, _) = Snapshot::empty()
            .with(vec![TxStatement::InstallAttribute(AttributeSpec::new("note/text", ValueType::String))])
            .unwrap();
        let store = SpeculativeStore::new(origin.clone());

        let report = store
            .transact(vec![TxStatement::add(EntityRef::temp("n"), "note/text", Value::string("draft"))])
            .await
            .unwrap();
        let eid = report.tempid("n").unwrap();

        let held = store.into_snapshot();
        assert_eq!(held.basis_t(), origin.basis_t() + 1);
        assert_eq!(held.values(eid, "note/text"), vec![Value::string("draft")]);
        assert!(origin.values(eid, "note/text").is_empty());
    }

    #[tokio::test]
    async fn test_sync_returns_held_snapshot() {
        let store = SpeculativeStore::new(Snapshot::empty());
        store.transact(vec![]).await.unwrap();

        assert_eq!(store.sync().await.unwrap().basis_t(), 1);
        assert_eq!(store.sync_schema().await.unwrap().basis_t(), 1);
    }
}
