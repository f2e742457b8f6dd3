//! Transaction data and transaction reports.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::schema::AttributeSpec;
use super::value::{EntityId, EntityRef, Value};

/// An ordered sequence of write statements submitted as one transaction.
pub type TxData = Vec<TxStatement>;

/// A single write statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum TxStatement {
    /// Assert `attribute = value` on `entity`.
    Add {
        /// Target entity.
        entity: EntityRef,
        /// Attribute ident.
        attribute: String,
        /// Asserted value.
        value: Value,
    },
    /// Retract `attribute = value` from `entity`. Retracting an absent fact
    /// produces no datom.
    Retract {
        /// Target entity.
        entity: EntityRef,
        /// Attribute ident.
        attribute: String,
        /// Retracted value.
        value: Value,
    },
    /// Install an attribute.
    InstallAttribute(AttributeSpec),
    /// Invoke an installed procedure. The engine replaces the statement with
    /// whatever the procedure expands to, evaluated against the snapshot the
    /// transaction is applied to.
    Invoke(Invocation),
}

impl TxStatement {
    /// Shorthand for [`TxStatement::Add`].
    pub fn add(entity: EntityRef, attribute: impl Into<String>, value: Value) -> Self {
        Self::Add {
            entity,
            attribute: attribute.into(),
            value,
        }
    }

    /// Shorthand for [`TxStatement::Retract`].
    pub fn retract(entity: EntityRef, attribute: impl Into<String>, value: Value) -> Self {
        Self::Retract {
            entity,
            attribute: attribute.into(),
            value,
        }
    }
}

/// A procedure call inside a transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invocation {
    /// Installed procedure name.
    pub procedure: String,
    /// Arguments, passed through to the procedure unchanged.
    pub args: Vec<Arg>,
}

/// A procedure argument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Arg {
    /// A plain value.
    Value(Value),
    /// Nested transaction data.
    Tx(TxData),
}

/// A fact produced by a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Datom {
    /// Entity.
    pub entity: EntityId,
    /// Attribute ident.
    pub attribute: String,
    /// Value.
    pub value: Value,
    /// Transaction entity that produced this datom.
    pub tx: EntityId,
    /// `true` for an assertion, `false` for a retraction.
    pub added: bool,
}

/// Outcome of a committed (or speculatively applied) transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TxReport {
    /// Transaction entity id.
    pub tx_id: EntityId,
    /// Basis of the snapshot the transaction was applied to.
    pub basis_before: u64,
    /// Basis of the resulting snapshot.
    pub basis_after: u64,
    /// Commit time.
    pub tx_instant: DateTime<Utc>,
    /// Datoms produced, in statement order.
    pub tx_data: Vec<Datom>,
    /// Entity ids allocated for temporary labels.
    pub tempids: BTreeMap<String, EntityId>,
}

impl TxReport {
    /// Number of datoms produced.
    pub fn datom_count(&self) -> usize {
        self.tx_data.len()
    }

    /// Whether the transaction committed without producing any datom.
    pub fn is_noop(&self) -> bool {
        self.tx_data.is_empty()
    }

    /// Entity id allocated for a temporary label.
    pub fn tempid(&self, label: &str) -> Option<EntityId> {
        self.tempids.get(label).copied()
    }
}
