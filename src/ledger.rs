//! Conformity ledger: marker attribute and guard bootstrap.
//!
//! A change unit counts as conformed once some entity carries
//! `marker_attribute = Symbol(name)`. The guard writes that fact on the
//! transaction entity that applied the unit, so the log itself records what
//! was applied and when.

use std::sync::Arc;

use tracing::info;

use crate::guard::{EnsureNormTx, GUARD_PROCEDURE};
use crate::store::{ProcedureSpec, Snapshot, Store, StoreError};
use crate::types::{AttributeSpec, Value, ValueType};

/// Marker attribute installed on stores that have none.
pub const DEFAULT_MARKER_ATTRIBUTE: &str = "conformity/conformed-norms";

/// Marker attributes written by earlier releases, probed in order.
pub const LEGACY_MARKER_ATTRIBUTES: &[&str] = &["confirmity/conformed-norms"];

/// Definition of a marker attribute.
pub fn marker_attribute_spec(ident: &str) -> AttributeSpec {
    AttributeSpec::new(ident, ValueType::Symbol)
        .indexed()
        .with_doc("Name of a change unit conformed by the transaction carrying this fact")
}

/// Pick the marker attribute for a store.
///
/// The first legacy attribute installed in `snapshot` wins, so stores that
/// already recorded conformance keep a single marker attribute. Otherwise
/// [`DEFAULT_MARKER_ATTRIBUTE`].
pub fn detect_marker_attribute(snapshot: &Snapshot) -> String {
    LEGACY_MARKER_ATTRIBUTES
        .iter()
        .find(|ident| snapshot.has_attribute(ident))
        .copied()
        .unwrap_or(DEFAULT_MARKER_ATTRIBUTE)
        .to_string()
}

/// Whether `name` has been conformed in `snapshot`.
pub fn conforms_to(snapshot: &Snapshot, marker_attribute: &str, name: &str) -> bool {
    snapshot.has_attribute(marker_attribute)
        && !snapshot
            .entities_with(marker_attribute, &Value::symbol(name))
            .is_empty()
}

/// Make sure the marker attribute and the guard procedure are installed.
///
/// Safe to call on every run. The existence check and the install are not
/// atomic, but the store treats re-installing an identical attribute as a
/// no-op, so concurrent bootstraps converge.
pub async fn ensure_ledger<S>(store: &S, marker_attribute: &str) -> Result<(), StoreError>
where
    S: Store + ?Sized,
{
    let snapshot = store.current_snapshot().await?;

    if !snapshot.has_attribute(marker_attribute) {
        let report = store
            .install_attribute(marker_attribute_spec(marker_attribute))
            .await?;
        info!(
            marker_attribute = %marker_attribute,
            tx_id = report.tx_id,
            "Installed marker attribute"
        );
    }

    if !snapshot.has_procedure(GUARD_PROCEDURE) {
        store
            .install_procedure(ProcedureSpec::new(GUARD_PROCEDURE, Arc::new(EnsureNormTx)))
            .await?;
        info!(procedure = GUARD_PROCEDURE, "Installed guard procedure");
    }

    Ok(())
}
