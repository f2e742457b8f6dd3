//! Core types for the conformity kernel.

pub mod value;
pub mod schema;
pub mod tx;
pub mod unit;
pub mod result;

pub use value::{EntityId, EntityRef, Value, ValueType};
pub use schema::{AttributeSpec, Cardinality};
pub use tx::{Arg, Datom, Invocation, TxData, TxReport, TxStatement};
pub use unit::{ChangeUnit, ChangeUnitMap, MapSettings};
pub use result::{AppliedUnit, ApplicationResult, FailedUnit, FailureContext};
