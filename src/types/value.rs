//! Values, value types and entity references.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Entity identifier inside a store.
///
/// Transactions are entities too: every committed transaction gets an id
/// from the same sequence, which is what lets a marker fact live directly
/// on the transaction that applied a change unit.
pub type EntityId = u64;

/// Value type of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    /// Symbolic keyword, e.g. a change unit name.
    Symbol,
    /// UTF-8 string.
    String,
    /// Signed 64-bit integer.
    Long,
    /// Boolean.
    Boolean,
    /// Reference to another entity.
    Ref,
    /// Point in time (UTC).
    Instant,
}

impl std::fmt::Display for ValueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Symbol => write!(f, "symbol"),
            Self::String => write!(f, "string"),
            Self::Long => write!(f, "long"),
            Self::Boolean => write!(f, "boolean"),
            Self::Ref => write!(f, "ref"),
            Self::Instant => write!(f, "instant"),
        }
    }
}

/// A value stored in a fact.
///
/// Implements `Ord` so values can key the attribute/value index.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    /// Symbolic keyword.
    Symbol(String),
    /// UTF-8 string.
    String(String),
    /// Signed 64-bit integer.
    Long(i64),
    /// Boolean.
    Boolean(bool),
    /// Reference to an entity.
    Ref(EntityId),
    /// Point in time.
    Instant(DateTime<Utc>),
}

impl Value {
    /// Create a symbol value.
    pub fn symbol(s: impl Into<String>) -> Self {
        Self::Symbol(s.into())
    }

    /// Create a string value.
    pub fn string(s: impl Into<String>) -> Self {
        Self::String(s.into())
    }

    /// The value type this value belongs to.
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::Symbol(_) => ValueType::Symbol,
            Self::String(_) => ValueType::String,
            Self::Long(_) => ValueType::Long,
            Self::Boolean(_) => ValueType::Boolean,
            Self::Ref(_) => ValueType::Ref,
            Self::Instant(_) => ValueType::Instant,
        }
    }

    /// Borrow the symbol name, if this is a symbol.
    pub fn as_symbol(&self) -> Option<&str> {
        match self {
            Self::Symbol(s) => Some(s),
            _ => None,
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Symbol(s) => write!(f, ":{}", s),
            Self::String(s) => write!(f, "{:?}", s),
            Self::Long(n) => write!(f, "{}", n),
            Self::Boolean(b) => write!(f, "{}", b),
            Self::Ref(id) => write!(f, "#{}", id),
            Self::Instant(t) => write!(f, "{}", t.to_rfc3339()),
        }
    }
}

/// How a transaction statement names the entity it writes to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityRef {
    /// An existing entity.
    Id(EntityId),
    /// A new entity, allocated on commit. Statements sharing a label
    /// within one transaction write to the same new entity.
    Temp(String),
    /// The transaction entity being committed.
    Tx,
}

impl EntityRef {
    /// Create a temporary entity reference.
    pub fn temp(label: impl Into<String>) -> Self {
        Self::Temp(label.into())
    }
}
