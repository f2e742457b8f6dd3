//! Store adapters.
//!
//! The conformity core only talks to a [`Store`]; it never assumes a concrete
//! backend. Two implementations ship with the crate:
//!
//! - [`InMemoryStore`]: a transactor that serializes every transaction through
//!   one lock and keeps an append-only log. This is the commit path.
//! - [`SpeculativeStore`]: a single-slot snapshot for dry runs.
//!
//! Both apply transactions with [`Snapshot::with`].

pub mod snapshot;
pub mod memory;
pub mod speculative;

use std::sync::Arc;

use async_trait::async_trait;

use crate::types::{Arg, AttributeSpec, EntityId, TxData, TxReport, TxStatement, Value, ValueType};

pub use memory::InMemoryStore;
pub use snapshot::{Snapshot, IDENT_ATTRIBUTE};
pub use speculative::{SpeculativeOutcome, SpeculativeStore};

/// Error type for store operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    /// Statement names an attribute that is not installed.
    #[error("Unknown attribute: {0}")]
    UnknownAttribute(String),
    /// Value does not match the attribute's value type.
    #[error("Type mismatch on {attribute}: expected {expected}, found {found}")]
    TypeMismatch {
        /// Attribute ident.
        attribute: String,
        /// Declared type.
        expected: ValueType,
        /// Supplied type.
        found: ValueType,
    },
    /// Unique attribute value already held by another entity.
    #[error("Unique conflict on {attribute}: {value} already belongs to entity {entity}")]
    UniqueConflict {
        /// Attribute ident.
        attribute: String,
        /// Conflicting value.
        value: Value,
        /// Current owner.
        entity: EntityId,
    },
    /// Attribute re-installed with a different definition.
    #[error("Schema conflict: {attribute} is already installed with a different definition")]
    SchemaConflict {
        /// Attribute ident.
        attribute: String,
    },
    /// Statement names an entity id that was never allocated.
    #[error("Unknown entity: {0}")]
    UnknownEntity(EntityId),
    /// Invocation of a procedure that is not installed.
    #[error("Unknown procedure: {0}")]
    UnknownProcedure(String),
    /// A procedure rejected its arguments or failed while expanding.
    #[error("Procedure {procedure} failed: {reason}")]
    ProcedureFailed {
        /// Procedure name.
        procedure: String,
        /// Failure reason.
        reason: String,
    },
    /// Procedures kept expanding into further invocations.
    #[error("Procedure expansion exceeded depth {depth} at {procedure}")]
    ExpansionTooDeep {
        /// Procedure being expanded when the limit was hit.
        procedure: String,
        /// Depth limit.
        depth: usize,
    },
    /// Backend could not be reached or refused the request.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// A procedure that runs inside the store's transaction boundary.
///
/// The engine calls `expand` with the snapshot the transaction is being
/// applied to and replaces the invocation with the returned statements.
/// Whatever serialization the store gives transactions also covers the
/// procedure's reads.
pub trait TxProcedure: Send + Sync {
    /// Expand an invocation into transaction data.
    fn expand(&self, snapshot: &Snapshot, args: &[Arg]) -> Result<TxData, StoreError>;
}

/// A procedure together with the name it is installed under.
#[derive(Clone)]
pub struct ProcedureSpec {
    /// Installed name.
    pub ident: String,
    /// Implementation.
    pub procedure: Arc<dyn TxProcedure>,
}

impl ProcedureSpec {
    /// Create a procedure spec.
    pub fn new(ident: impl Into<String>, procedure: Arc<dyn TxProcedure>) -> Self {
        Self {
            ident: ident.into(),
            procedure,
        }
    }
}

impl std::fmt::Debug for ProcedureSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcedureSpec")
            .field("ident", &self.ident)
            .finish_non_exhaustive()
    }
}

/// Capability set over a transactional fact store.
///
/// All methods are async to support remote backends.
#[async_trait]
pub trait Store: Send + Sync {
    /// The most recent snapshot visible to this connection.
    async fn current_snapshot(&self) -> Result<Snapshot, StoreError>;

    /// Submit a transaction and wait for it to commit.
    async fn transact(&self, tx_data: TxData) -> Result<TxReport, StoreError>;

    /// Wait until every transaction committed so far is visible.
    async fn sync(&self) -> Result<Snapshot, StoreError>;

    /// Wait until every schema change committed so far is visible.
    async fn sync_schema(&self) -> Result<Snapshot, StoreError>;

    /// Install an attribute.
    async fn install_attribute(&self, spec: AttributeSpec) -> Result<TxReport, StoreError> {
        self.transact(vec![TxStatement::InstallAttribute(spec)]).await
    }

    /// Install a procedure, replacing any procedure of the same name.
    async fn install_procedure(&self, spec: ProcedureSpec) -> Result<(), StoreError>;
}
