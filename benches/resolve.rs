//! Performance benchmarks for change unit resolution.
//!
//! Run with: `cargo bench --bench resolve`
//!
//! ## Performance Targets
//!
//! | Operation | Target | Notes |
//! |-----------|--------|-------|
//! | Dry run, 100-unit chain | <10ms | Snapshot copy per transaction |
//! | Re-resolve, all conformed | <1ms | Marker index lookups only |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use conformity_kernel::{
    ensure_all, with_all, AttributeSpec, ChangeUnit, ChangeUnitMap, EntityRef, InMemoryStore,
    Snapshot, TxStatement, Value, ValueType,
};

/// A chain of `len` units, each requiring the previous one and writing one fact.
fn make_chain(len: usize) -> ChangeUnitMap {
    let mut map = ChangeUnitMap::new().with_unit(
        "bench/schema",
        ChangeUnit::transaction(vec![TxStatement::InstallAttribute(
            AttributeSpec::new("bench/step", ValueType::Long).indexed(),
        )]),
    );
    let mut previous = "bench/schema".to_string();
    for i in 0..len {
        let name = format!("bench/step-{:04}", i);
        let unit = ChangeUnit::transaction(vec![TxStatement::add(
            EntityRef::temp("step"),
            "bench/step",
            Value::Long(i as i64),
        )])
        .requires([previous.clone()]);
        map = map.with_unit(name.clone(), unit);
        previous = name;
    }
    map
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

/// Benchmark a dry run against an empty snapshot.
fn bench_speculative(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("speculative");

    for len in [10, 50, 100] {
        let map = make_chain(len);

        group.throughput(Throughput::Elements(len as u64 + 1));
        group.bench_with_input(BenchmarkId::new("units", len), &map, |b, map| {
            b.iter(|| {
                let outcome = rt.block_on(with_all(Snapshot::empty(), black_box(map))).unwrap();
                assert_eq!(outcome.result.len(), len + 1);
                outcome
            })
        });
    }

    group.finish();
}

/// Benchmark re-resolving a map that is already fully applied.
fn bench_conformed(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("conformed");

    for len in [10, 50, 100] {
        let map = make_chain(len);
        let store = InMemoryStore::new();
        let warmup = rt.block_on(ensure_all(&store, &map)).unwrap();
        assert_eq!(warmup.len(), len + 1);

        group.bench_with_input(BenchmarkId::new("units", len), &map, |b, map| {
            b.iter(|| {
                let result = rt.block_on(ensure_all(&store, black_box(map))).unwrap();
                assert!(result.is_empty());
                result
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_speculative, bench_conformed);
criterion_main!(benches);
