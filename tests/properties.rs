//! Property-based tests for resolution over random acyclic change unit maps.

use proptest::prelude::*;

use conformity_kernel::{
    ensure_conforms, ledger, with_conforms, AttributeSpec, ChangeUnit, ChangeUnitMap,
    InMemoryStore, Snapshot, Store, TxStatement, ValueType, DEFAULT_MARKER_ATTRIBUTE,
};

const MAX_UNITS: usize = 8;

fn unit_name(i: usize) -> String {
    format!("unit/{:02}", i)
}

/// Unit `i` may only require units `j < i`, which keeps the map acyclic.
fn build_map(requires: &[Vec<bool>]) -> ChangeUnitMap {
    let mut map = ChangeUnitMap::new();
    for (i, row) in requires.iter().enumerate() {
        let deps: Vec<String> = row
            .iter()
            .take(i)
            .enumerate()
            .filter(|(_, required)| **required)
            .map(|(j, _)| unit_name(j))
            .collect();
        let unit = ChangeUnit::transaction(vec![TxStatement::InstallAttribute(AttributeSpec::new(
            format!("u{}/x", i),
            ValueType::Long,
        ))])
        .requires(deps);
        map = map.with_unit(unit_name(i), unit);
    }
    map
}

/// Strategy for an acyclic map plus a non-empty list of requested names.
fn map_and_request() -> impl Strategy<Value = (ChangeUnitMap, Vec<String>)> {
    (1usize..=MAX_UNITS)
        .prop_flat_map(|n| {
            (
                prop::collection::vec(prop::collection::vec(any::<bool>(), n), n),
                prop::collection::vec(0..n, 1..4),
            )
        })
        .prop_map(|(matrix, picks)| {
            let requested = picks.into_iter().map(unit_name).collect();
            (build_map(&matrix), requested)
        })
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    /// Property: a second resolution of the same request applies nothing.
    #[test]
    fn prop_resolution_is_idempotent((map, requested) in map_and_request()) {
        let rt = runtime();
        let store = InMemoryStore::new();

        let first = rt.block_on(ensure_conforms(&store, &map, requested.as_slice())).unwrap();
        let second = rt.block_on(ensure_conforms(&store, &map, requested.as_slice())).unwrap();

        prop_assert!(!first.is_empty());
        prop_assert!(second.is_empty());
    }

    /// Property: every applied unit comes after all of its requirements, and
    /// every requested unit ends up conformed.
    #[test]
    fn prop_requirements_applied_first((map, requested) in map_and_request()) {
        let rt = runtime();
        let store = InMemoryStore::new();

        let result = rt.block_on(ensure_conforms(&store, &map, requested.as_slice())).unwrap();
        let order = result.names();

        for (position, name) in order.iter().enumerate() {
            for dep in &map.get(name).unwrap().requires {
                let dep_position = order.iter().position(|n| *n == dep.as_str());
                prop_assert!(matches!(dep_position, Some(p) if p < position));
            }
        }

        let snapshot = rt.block_on(store.current_snapshot()).unwrap();
        for name in &requested {
            prop_assert!(ledger::conforms_to(&snapshot, DEFAULT_MARKER_ATTRIBUTE, name));
        }
    }

    /// Property: a dry run applies the same units in the same order as a
    /// durable run from the same starting point.
    #[test]
    fn prop_speculative_matches_durable((map, requested) in map_and_request()) {
        let rt = runtime();
        let store = InMemoryStore::new();

        let durable = rt.block_on(ensure_conforms(&store, &map, requested.as_slice())).unwrap();
        let speculative = rt
            .block_on(with_conforms(Snapshot::empty(), &map, requested.as_slice()))
            .unwrap();

        prop_assert_eq!(durable.names(), speculative.result.names());
        let committed = rt.block_on(store.current_snapshot()).unwrap();
        prop_assert_eq!(committed.datom_count(), speculative.snapshot.datom_count());
    }
}
