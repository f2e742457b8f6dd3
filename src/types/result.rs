//! Application results and failure context.

use serde::{Deserialize, Serialize};

use super::tx::TxReport;

/// One change unit that caused a write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedUnit {
    /// Change unit name.
    pub name: String,
    /// xxh64 fingerprint of the submitted payload (canonical JSON).
    pub fingerprint: String,
    /// Report of the guarded transaction.
    pub tx: TxReport,
}

/// Ordered record of the units applied by one resolution.
///
/// Units skipped because they were already conformed have no entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicationResult {
    entries: Vec<AppliedUnit>,
}

impl ApplicationResult {
    /// Create an empty result.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, entry: AppliedUnit) {
        self.entries.push(entry);
    }

    /// Applied unit names, in application order.
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }

    /// Entry for a unit, if it was applied.
    pub fn get(&self, name: &str) -> Option<&AppliedUnit> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Iterate over entries in application order.
    pub fn iter(&self) -> std::slice::Iter<'_, AppliedUnit> {
        self.entries.iter()
    }

    /// Number of applied units.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing was applied.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl IntoIterator for ApplicationResult {
    type Item = AppliedUnit;
    type IntoIter = std::vec::IntoIter<AppliedUnit>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a ApplicationResult {
    type Item = &'a AppliedUnit;
    type IntoIter = std::slice::Iter<'a, AppliedUnit>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// The unit a resolution stopped at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedUnit {
    /// Change unit name.
    pub name: String,
    /// Failure reason.
    pub reason: String,
}

/// Progress made before a resolution aborted.
///
/// Units in `succeeded` are committed and stay committed; retrying the same
/// call skips them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FailureContext {
    /// Units applied before the failure.
    pub succeeded: ApplicationResult,
    /// The failing unit. `None` when the failure happened before any unit
    /// was attempted (ledger bootstrap).
    pub failed: Option<FailedUnit>,
}
