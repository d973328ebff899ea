//! Sub-entity deduplication benchmarks.
//!
//! Measures canonical fingerprinting and state-tree upserts against a store
//! that already holds the rows.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use serde_json::{json, Value};

use catalog::canonical::{canonical_bytes, fingerprint};
use catalog::model::{ElectronicLevel, State, VibrationalLevel};
use catalog::store::DocKind;
use catalog::{Catalog, MemoryStore};

/// Generate a nested JSON body with `width` keys per level.
fn generate_body(width: usize) -> Value {
    let mut outer = serde_json::Map::new();
    for i in (0..width).rev() {
        let mut inner = serde_json::Map::new();
        for j in (0..width).rev() {
            inner.insert(format!("field_{:03}", j), json!(i * j));
        }
        outer.insert(format!("group_{:03}", i), Value::Object(inner));
    }
    Value::Object(outer)
}

/// Generate molecular states with `levels` vibrational levels each.
fn generate_states(count: usize, levels: usize) -> Vec<State> {
    (0..count)
        .map(|i| {
            let mut electronic = ElectronicLevel::new(format!("E{}", i % 4));
            for v in 0..levels {
                electronic = electronic.with_vibrational(VibrationalLevel::new(v.to_string()));
            }
            State::new(format!("M{}", i), (i % 3) as i32).with_electronic(electronic)
        })
        .collect()
}

fn bench_fingerprint(c: &mut Criterion) {
    let mut group = c.benchmark_group("fingerprint");

    for width in [4, 16, 64] {
        let body = generate_body(width);
        let bytes = canonical_bytes(&body).len();
        group.throughput(Throughput::Bytes(bytes as u64));
        group.bench_with_input(BenchmarkId::from_parameter(width), &body, |b, body| {
            b.iter(|| fingerprint(DocKind::Reference, black_box(body)))
        });
    }

    group.finish();
}

fn bench_state_upsert(c: &mut Criterion) {
    let mut group = c.benchmark_group("state_upsert");

    for count in [10, 100] {
        let states = generate_states(count, 3);
        group.throughput(Throughput::Elements(count as u64));

        group.bench_with_input(BenchmarkId::new("fresh", count), &states, |b, states| {
            b.iter(|| {
                let catalog = Catalog::new(Arc::new(MemoryStore::new()));
                for state in states {
                    black_box(catalog.upsert_state(state).unwrap());
                }
            })
        });

        let warm = Catalog::new(Arc::new(MemoryStore::new()));
        for state in &states {
            warm.upsert_state(state).unwrap();
        }
        group.bench_with_input(BenchmarkId::new("existing", count), &states, |b, states| {
            b.iter(|| {
                for state in states {
                    black_box(warm.upsert_state(state).unwrap());
                }
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_fingerprint, bench_state_upsert);
criterion_main!(benches);
