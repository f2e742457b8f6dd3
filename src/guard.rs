//! Exactly-once guard procedure.
//!
//! The guard is installed into the store and invoked *inside* the
//! transaction that carries a change unit's payload:
//!
//! ```text
//! [Invoke(conformity/ensure-norm-tx, [marker_attribute, name, payload])]
//!        │
//!        ├─ marker present in snapshot → []                      (empty commit)
//!        └─ marker absent              → payload ++ [Tx marker_attribute name]
//! ```
//!
//! Because the store applies the expansion and the writes as one
//! transaction, two callers racing on the same unit cannot both commit it.
//! Checking first and writing in a second round trip would lose that.

use crate::ledger;
use crate::store::{Snapshot, StoreError, TxProcedure};
use crate::types::{Arg, EntityRef, Invocation, TxData, TxStatement, Value};

/// Name the guard procedure is installed under.
pub const GUARD_PROCEDURE: &str = "conformity/ensure-norm-tx";

/// The guard procedure.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnsureNormTx;

impl TxProcedure for EnsureNormTx {
    fn expand(&self, snapshot: &Snapshot, args: &[Arg]) -> Result<TxData, StoreError> {
        let (marker_attribute, name, payload) = match args {
            [Arg::Value(Value::Symbol(attr)), Arg::Value(Value::Symbol(name)), Arg::Tx(payload)] => {
                (attr, name, payload)
            }
            _ => {
                return Err(StoreError::ProcedureFailed {
                    procedure: GUARD_PROCEDURE.to_string(),
                    reason: "expected [marker attribute, unit name, transaction data]".to_string(),
                })
            }
        };

        if ledger::conforms_to(snapshot, marker_attribute, name) {
            return Ok(Vec::new());
        }

        let mut guarded = Vec::with_capacity(payload.len() + 1);
        guarded.extend(payload.iter().cloned());
        guarded.push(TxStatement::add(
            EntityRef::Tx,
            marker_attribute.clone(),
            Value::symbol(name.clone()),
        ));
        Ok(guarded)
    }
}

/// Build the single statement that applies `payload` for `name` at most once.
pub fn guarded_statement(marker_attribute: &str, name: &str, payload: TxData) -> TxStatement {
    TxStatement::Invoke(Invocation {
        procedure: GUARD_PROCEDURE.to_string(),
        args: vec![
            Arg::Value(Value::symbol(marker_attribute)),
            Arg::Value(Value::symbol(name)),
            Arg::Tx(payload),
        ],
    })
}
