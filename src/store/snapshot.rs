//! Immutable database values and the local transaction engine.
//!
//! A [`Snapshot`] is a point-in-time view of the store: installed attributes,
//! installed procedures and the current facts, indexed by entity and (for
//! indexed attributes) by attribute/value.
//!
//! ## Applying a Transaction
//!
//! [`Snapshot::with`] applies transaction data without touching `self`:
//!
//! 1. Expand `Invoke` statements by running the installed procedure against
//!    `self`, recursively, up to a fixed depth
//! 2. Allocate the transaction entity, then resolve `Temp` labels to new ids
//! 3. Apply statements in order, validating attribute, value type, uniqueness
//! 4. Return the new snapshot plus a [`TxReport`] of the datoms produced
//!
//! Redundant assertions and retractions of absent facts produce no datoms, so
//! a transaction can legally commit empty.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::Utc;
use tracing::trace;

use super::{ProcedureSpec, StoreError, TxProcedure};
use crate::types::{
    AttributeSpec, Cardinality, Datom, EntityId, EntityRef, TxData, TxReport, TxStatement, Value,
    ValueType,
};

/// Attribute naming schema entities. Installed in every snapshot.
pub const IDENT_ATTRIBUTE: &str = "db/ident";

/// Maximum nesting of procedure invocations within one transaction.
const MAX_EXPANSION_DEPTH: usize = 16;

/// Immutable database value.
///
/// Cloning is cheap; the state is shared until a transaction produces a new
/// snapshot.
#[derive(Clone)]
pub struct Snapshot {
    state: Arc<SnapshotState>,
}

#[derive(Clone, Default)]
struct SnapshotState {
    basis_t: u64,
    next_entity: EntityId,
    attributes: BTreeMap<String, AttributeSpec>,
    procedures: BTreeMap<String, Arc<dyn TxProcedure>>,
    eav: BTreeMap<EntityId, BTreeMap<String, BTreeSet<Value>>>,
    ave: BTreeMap<String, BTreeMap<Value, BTreeSet<EntityId>>>,
}

/// A statement with all invocations expanded away.
enum Write {
    Install(AttributeSpec),
    Add {
        entity: EntityRef,
        attribute: String,
        value: Value,
    },
    Retract {
        entity: EntityRef,
        attribute: String,
        value: Value,
    },
}

impl Snapshot {
    /// Create an empty snapshot holding only the built-in `db/ident` attribute.
    pub fn empty() -> Self {
        let mut state = SnapshotState::default();
        let ident = AttributeSpec::new(IDENT_ATTRIBUTE, ValueType::Symbol).unique();
        state.attributes.insert(ident.ident.clone(), ident);
        let eid = state.allocate();
        state.assert_fact(eid, IDENT_ATTRIBUTE, Value::symbol(IDENT_ATTRIBUTE));
        Self {
            state: Arc::new(state),
        }
    }

    /// Number of transactions applied to reach this snapshot.
    pub fn basis_t(&self) -> u64 {
        self.state.basis_t
    }

    /// Whether an attribute is installed.
    pub fn has_attribute(&self, ident: &str) -> bool {
        self.state.attributes.contains_key(ident)
    }

    /// Definition of an installed attribute.
    pub fn attribute(&self, ident: &str) -> Option<&AttributeSpec> {
        self.state.attributes.get(ident)
    }

    /// All installed attributes, ordered by ident.
    pub fn attributes(&self) -> impl Iterator<Item = &AttributeSpec> {
        self.state.attributes.values()
    }

    /// Whether a procedure is installed.
    pub fn has_procedure(&self, ident: &str) -> bool {
        self.state.procedures.contains_key(ident)
    }

    /// Values of `attribute` on `entity`, in value order.
    pub fn values(&self, entity: EntityId, attribute: &str) -> Vec<Value> {
        self.state
            .values(entity, attribute)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Entities carrying `attribute = value`, in id order.
    ///
    /// Uses the attribute/value index when the attribute has one, otherwise
    /// scans every entity.
    pub fn entities_with(&self, attribute: &str, value: &Value) -> Vec<EntityId> {
        if let Some(index) = self.state.ave.get(attribute) {
            return index
                .get(value)
                .map(|owners| owners.iter().copied().collect())
                .unwrap_or_default();
        }

        self.state
            .eav
            .iter()
            .filter(|(_, attrs)| attrs.get(attribute).is_some_and(|vals| vals.contains(value)))
            .map(|(eid, _)| *eid)
            .collect()
    }

    /// Total number of facts currently asserted.
    pub fn datom_count(&self) -> usize {
        self.state
            .eav
            .values()
            .flat_map(|attrs| attrs.values())
            .map(BTreeSet::len)
            .sum()
    }

    /// Return a snapshot with `spec` installed, replacing any procedure of the
    /// same name. Does not advance the basis.
    pub fn with_procedure(&self, spec: ProcedureSpec) -> Snapshot {
        let mut next = (*self.state).clone();
        next.procedures.insert(spec.ident, spec.procedure);
        Snapshot {
            state: Arc::new(next),
        }
    }

    /// Apply transaction data, producing a new snapshot and a report.
    ///
    /// `self` is never modified. On error no partial effect is visible.
    pub fn with(&self, tx_data: TxData) -> Result<(Snapshot, TxReport), StoreError> {
        let mut writes = Vec::with_capacity(tx_data.len());
        self.expand(tx_data, 0, &mut writes)?;

        let mut next = (*self.state).clone();
        let tx_id = next.allocate();
        let mut tempids: BTreeMap<String, EntityId> = BTreeMap::new();
        let mut datoms = Vec::new();

        for write in writes {
            match write {
                Write::Install(spec) => next.install_attribute(spec, tx_id, &mut datoms)?,
                Write::Add { entity, attribute, value } => {
                    let entity = next.resolve_entity(&entity, tx_id, &mut tempids)?;
                    next.add(entity, &attribute, value, tx_id, &mut datoms)?;
                }
                Write::Retract { entity, attribute, value } => {
                    let entity = next.resolve_entity(&entity, tx_id, &mut tempids)?;
                    next.retract(entity, &attribute, &value, tx_id, &mut datoms)?;
                }
            }
        }

        next.basis_t += 1;
        let report = TxReport {
            tx_id,
            basis_before: self.state.basis_t,
            basis_after: next.basis_t,
            tx_instant: Utc::now(),
            tx_data: datoms,
            tempids,
        };

        trace!(
            tx_id = report.tx_id,
            basis_t = report.basis_after,
            datoms = report.datom_count(),
            "Applied transaction"
        );

        Ok((
            Snapshot {
                state: Arc::new(next),
            },
            report,
        ))
    }

    fn expand(&self, tx_data: TxData, depth: usize, out: &mut Vec<Write>) -> Result<(), StoreError> {
        for statement in tx_data {
            match statement {
                TxStatement::Invoke(call) => {
                    if depth >= MAX_EXPANSION_DEPTH {
                        return Err(StoreError::ExpansionTooDeep {
                            procedure: call.procedure,
                            depth: MAX_EXPANSION_DEPTH,
                        });
                    }
                    let procedure = self
                        .state
                        .procedures
                        .get(&call.procedure)
                        .ok_or_else(|| StoreError::UnknownProcedure(call.procedure.clone()))?;
                    let expanded = procedure.expand(self, &call.args)?;
                    trace!(
                        procedure = %call.procedure,
                        statements = expanded.len(),
                        "Expanded invocation"
                    );
                    self.expand(expanded, depth + 1, out)?;
                }
                TxStatement::InstallAttribute(spec) => out.push(Write::Install(spec)),
                TxStatement::Add { entity, attribute, value } => {
                    out.push(Write::Add { entity, attribute, value })
                }
                TxStatement::Retract { entity, attribute, value } => {
                    out.push(Write::Retract { entity, attribute, value })
                }
            }
        }
        Ok(())
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::empty()
    }
}

impl std::fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Snapshot")
            .field("basis_t", &self.state.basis_t)
            .field("attributes", &self.state.attributes.len())
            .field("procedures", &self.state.procedures.keys().collect::<Vec<_>>())
            .field("datoms", &self.datom_count())
            .finish()
    }
}

impl SnapshotState {
    fn allocate(&mut self) -> EntityId {
        let id = self.next_entity;
        self.next_entity += 1;
        id
    }

    fn values(&self, entity: EntityId, attribute: &str) -> Option<&BTreeSet<Value>> {
        self.eav.get(&entity).and_then(|attrs| attrs.get(attribute))
    }

    fn resolve_entity(
        &mut self,
        entity: &EntityRef,
        tx_id: EntityId,
        tempids: &mut BTreeMap<String, EntityId>,
    ) -> Result<EntityId, StoreError> {
        match entity {
            EntityRef::Id(id) if *id < self.next_entity => Ok(*id),
            EntityRef::Id(id) => Err(StoreError::UnknownEntity(*id)),
            EntityRef::Temp(label) => {
                if let Some(id) = tempids.get(label) {
                    return Ok(*id);
                }
                let id = self.allocate();
                tempids.insert(label.clone(), id);
                Ok(id)
            }
            EntityRef::Tx => Ok(tx_id),
        }
    }

    fn install_attribute(
        &mut self,
        spec: AttributeSpec,
        tx_id: EntityId,
        datoms: &mut Vec<Datom>,
    ) -> Result<(), StoreError> {
        let spec = spec.effective();
        if let Some(existing) = self.attributes.get(&spec.ident) {
            if *existing == spec {
                return Ok(());
            }
            return Err(StoreError::SchemaConflict {
                attribute: spec.ident,
            });
        }

        let eid = self.allocate();
        let ident = Value::symbol(spec.ident.clone());
        if spec.has_index() {
            self.ave.entry(spec.ident.clone()).or_default();
        }
        self.attributes.insert(spec.ident.clone(), spec);
        self.assert_fact(eid, IDENT_ATTRIBUTE, ident.clone());
        datoms.push(Datom {
            entity: eid,
            attribute: IDENT_ATTRIBUTE.to_string(),
            value: ident,
            tx: tx_id,
            added: true,
        });
        Ok(())
    }

    fn add(
        &mut self,
        entity: EntityId,
        attribute: &str,
        value: Value,
        tx_id: EntityId,
        datoms: &mut Vec<Datom>,
    ) -> Result<(), StoreError> {
        let spec = self
            .attributes
            .get(attribute)
            .cloned()
            .ok_or_else(|| StoreError::UnknownAttribute(attribute.to_string()))?;

        if value.value_type() != spec.value_type {
            return Err(StoreError::TypeMismatch {
                attribute: attribute.to_string(),
                expected: spec.value_type,
                found: value.value_type(),
            });
        }
        if let Value::Ref(target) = &value {
            if *target >= self.next_entity {
                return Err(StoreError::UnknownEntity(*target));
            }
        }

        let current: Vec<Value> = self
            .values(entity, attribute)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default();
        if current.contains(&value) {
            return Ok(());
        }

        if spec.unique {
            let owner = self
                .ave
                .get(attribute)
                .and_then(|index| index.get(&value))
                .and_then(|owners| owners.iter().find(|owner| **owner != entity));
            if let Some(owner) = owner {
                return Err(StoreError::UniqueConflict {
                    attribute: attribute.to_string(),
                    value,
                    entity: *owner,
                });
            }
        }

        if spec.cardinality == Cardinality::One {
            for old in current {
                self.retract_fact(entity, attribute, &old);
                datoms.push(Datom {
                    entity,
                    attribute: attribute.to_string(),
                    value: old,
                    tx: tx_id,
                    added: false,
                });
            }
        }

        self.assert_fact(entity, attribute, value.clone());
        datoms.push(Datom {
            entity,
            attribute: attribute.to_string(),
            value,
            tx: tx_id,
            added: true,
        });
        Ok(())
    }

    fn retract(
        &mut self,
        entity: EntityId,
        attribute: &str,
        value: &Value,
        tx_id: EntityId,
        datoms: &mut Vec<Datom>,
    ) -> Result<(), StoreError> {
        if !self.attributes.contains_key(attribute) {
            return Err(StoreError::UnknownAttribute(attribute.to_string()));
        }
        if self.retract_fact(entity, attribute, value) {
            datoms.push(Datom {
                entity,
                attribute: attribute.to_string(),
                value: value.clone(),
                tx: tx_id,
                added: false,
            });
        }
        Ok(())
    }

    fn assert_fact(&mut self, entity: EntityId, attribute: &str, value: Value) {
        let indexed = self
            .attributes
            .get(attribute)
            .is_some_and(AttributeSpec::has_index);
        if indexed {
            self.ave
                .entry(attribute.to_string())
                .or_default()
                .entry(value.clone())
                .or_default()
                .insert(entity);
        }
        self.eav
            .entry(entity)
            .or_default()
            .entry(attribute.to_string())
            .or_default()
            .insert(value);
    }

    fn retract_fact(&mut self, entity: EntityId, attribute: &str, value: &Value) -> bool {
        let Some(attrs) = self.eav.get_mut(&entity) else {
            return false;
        };
        let Some(values) = attrs.get_mut(attribute) else {
            return false;
        };
        if !values.remove(value) {
            return false;
        }
        if values.is_empty() {
            attrs.remove(attribute);
        }
        if attrs.is_empty() {
            self.eav.remove(&entity);
        }

        if let Some(index) = self.ave.get_mut(attribute) {
            if let Some(owners) = index.get_mut(value) {
                owners.remove(&entity);
                if owners.is_empty() {
                    index.remove(value);
                }
            }
        }
        true
    }
}
