//! Benchmarks for store renumbering and field processing.
//!
//! Run with: cargo bench --package formstate

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use formstate::{
    converters, insert_index_and_renumber, path, remove_index_and_renumber, DocCell, Field, Form,
    Path, RepeatingForm,
};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

// ============================================================================
// Helper functions to generate test data
// ============================================================================

/// Store with `items` entries, each holding `fields` paths.
fn generate_store(items: usize, fields: usize) -> BTreeMap<Path, Value> {
    let mut store = BTreeMap::new();
    for i in 0..items {
        for f in 0..fields {
            store.insert(path!("items", i, format!("field_{}", f)), json!(i));
        }
    }
    // unrelated entries that must be copied untouched
    for f in 0..fields {
        store.insert(path!("other", format!("field_{}", f)), json!(f));
    }
    store
}

fn generate_doc(items: usize) -> Value {
    let items: Vec<Value> = (0..items).map(|i| json!({"a": i, "b": "x"})).collect();
    json!({ "items": items })
}

// ============================================================================
// Benchmark: renumbering a path-keyed store
// ============================================================================

fn bench_remove_renumber(c: &mut Criterion) {
    let mut group = c.benchmark_group("remove_index_and_renumber");

    for items in [10, 100, 1000] {
        let store = generate_store(items, 5);
        group.throughput(Throughput::Elements(store.len() as u64));

        let removed = path!("items", items / 2);
        group.bench_with_input(BenchmarkId::from_parameter(items), &items, |b, _| {
            b.iter(|| {
                let result = remove_index_and_renumber(black_box(&store), black_box(&removed));
                black_box(result)
            });
        });
    }

    group.finish();
}

fn bench_insert_renumber(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert_index_and_renumber");

    for items in [10, 100, 1000] {
        let store = generate_store(items, 5);
        group.throughput(Throughput::Elements(store.len() as u64));

        let inserted = path!("items", 0);
        group.bench_with_input(BenchmarkId::from_parameter(items), &items, |b, _| {
            b.iter(|| {
                let result = insert_index_and_renumber(black_box(&store), black_box(&inserted));
                black_box(result)
            });
        });
    }

    group.finish();
}

// ============================================================================
// Benchmark: set_raw and validity through a repeating form
// ============================================================================

fn bench_set_raw(c: &mut Criterion) {
    let mut group = c.benchmark_group("repeating_form_set_raw");

    for items in [10, 100] {
        let item = Form::new()
            .field("a", Field::new(converters::number()))
            .field("b", Field::new(converters::string()).required());
        let state = Form::new()
            .repeating_form("items", RepeatingForm::new(item))
            .state(Arc::new(DocCell::new(generate_doc(items))))
            .unwrap();
        let field = state.field_at(&path!("items", items - 1, "a")).unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(items), &items, |b, _| {
            b.iter(|| {
                futures::executor::block_on(field.set_raw(black_box("12.5"))).unwrap();
                black_box(state.is_valid())
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_remove_renumber,
    bench_insert_renumber,
    bench_set_raw,
);

criterion_main!(benches);
