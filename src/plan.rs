//! Application order.
//!
//! Walks `requires` depth-first, left-to-right, placing every dependency
//! before the unit that requires it. A unit already placed is not placed
//! again, so diamonds are fine.
//!
//! Names that are not in the map are placed as leaves; the resolver reports
//! them as missing payloads when it reaches them, after applying everything
//! placed earlier.
//!
//! Cycles are rejected here, before anything is submitted. Maps are still
//! expected to be acyclic: the check turns unbounded recursion into an error,
//! it does not make cyclic maps meaningful.

use std::collections::BTreeSet;

use crate::error::ResolutionError;
use crate::types::ChangeUnitMap;

/// A `requires` cycle found while planning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyCycle {
    /// The unit whose visit closed the cycle.
    pub unit: String,
    /// Units on the cycle, starting and ending with `unit`.
    pub path: Vec<String>,
}

impl From<DependencyCycle> for ResolutionError {
    fn from(cycle: DependencyCycle) -> Self {
        ResolutionError::DependencyCycle { path: cycle.path }
    }
}

/// Compute the order in which `requested` units (and their dependencies)
/// are visited.
pub fn application_order<S: AsRef<str>>(
    map: &ChangeUnitMap,
    requested: &[S],
) -> Result<Vec<String>, DependencyCycle> {
    let mut walk = Walk {
        map,
        path: Vec::new(),
        placed: BTreeSet::new(),
        order: Vec::new(),
    };
    for name in requested {
        walk.visit(name.as_ref())?;
    }
    Ok(walk.order)
}

struct Walk<'a> {
    map: &'a ChangeUnitMap,
    path: Vec<String>,
    placed: BTreeSet<String>,
    order: Vec<String>,
}

impl Walk<'_> {
    fn visit(&mut self, name: &str) -> Result<(), DependencyCycle> {
        if self.placed.contains(name) {
            return Ok(());
        }
        if let Some(start) = self.path.iter().position(|p| p == name) {
            let mut cycle = self.path[start..].to_vec();
            cycle.push(name.to_string());
            return Err(DependencyCycle {
                unit: name.to_string(),
                path: cycle,
            });
        }

        self.path.push(name.to_string());
        if let Some(unit) = self.map.get(name) {
            for dependency in &unit.requires {
                self.visit(dependency)?;
            }
        }
        self.path.pop();

        self.placed.insert(name.to_string());
        self.order.push(name.to_string());
        Ok(())
    }
}
