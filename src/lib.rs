//! # conformity-kernel
//!
//! Exactly-once application of named change units ("norms") to a
//! transactional fact store.
//!
//! The kernel answers one question:
//!
//! > Given the units a caller asks for, which still need applying, in what
//! > order, and how do we make sure each is committed at most once?
//!
//! ## Core Contract
//!
//! 1. Dependencies (`requires`) are applied before the units that need them
//! 2. A unit already marked conformed in the current snapshot is skipped
//! 3. Payload and conformance marker are committed in one transaction through
//!    a guard procedure running inside the store, so concurrent callers cannot
//!    both apply the same unit
//! 4. The same resolution can run against a throwaway snapshot (dry run)
//!
//! ## Architecture
//!
//! ```text
//! ChangeUnitMap → Conformer → plan → guard(payload) → Store
//!                                                       ↓
//!                                  InMemoryStore (commit) | SpeculativeStore (dry run)
//!                                                       ↓
//!                                                 Snapshot::with
//! ```
//!
//! ## Failure Semantics
//!
//! A failed resolution returns [`ConformityError`] carrying the units applied
//! before the failure. Those stay committed; retrying is safe.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod types;
pub mod store;
pub mod guard;
pub mod ledger;
pub mod generator;
pub mod plan;
pub mod resolver;
pub mod error;
pub mod config;
pub mod canonical;
pub mod telemetry;

// Re-exports
pub use types::{
    AppliedUnit, ApplicationResult, Arg, AttributeSpec, Cardinality, ChangeUnit, ChangeUnitMap,
    Datom, EntityId, EntityRef, FailedUnit, FailureContext, Invocation, MapSettings, TxData,
    TxReport, TxStatement, Value, ValueType,
};
pub use store::{
    InMemoryStore, ProcedureSpec, Snapshot, SpeculativeOutcome, SpeculativeStore, Store,
    StoreError, TxProcedure,
};
pub use guard::{EnsureNormTx, GUARD_PROCEDURE};
pub use ledger::{
    conforms_to, detect_marker_attribute, ensure_ledger, DEFAULT_MARKER_ATTRIBUTE,
    LEGACY_MARKER_ATTRIBUTES,
};
pub use generator::{GeneratorError, GeneratorRegistry, TxGenerator};
pub use resolver::{ensure_all, ensure_conforms, with_all, with_conforms, Conformer};
pub use error::{ConformityError, ResolutionError};
pub use config::ConformityConfig;
pub use canonical::canonical_hash_hex;
