//! Benchmark for optic traversals and store notification.
//!
//! Measures reads and writes through mapped and folded chains, and the cost
//! of a write on a store with many subscribers.

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use refract::{Derive, Optic, SubscribeOptions, Value, create_state, value};
use std::hint::black_box;

fn inventory(size: usize) -> Value {
    Value::object([(
        "items",
        (0..size)
            .map(|index| value!({ id: index, durability: (index % 20) }))
            .collect::<Value>(),
    )])
}

// =============================================================================
// Read Benchmarks
// =============================================================================

fn benchmark_mapped_get(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("mapped_get");
    let durabilities = Optic::new().field("items").map().field("durability");

    for size in [10, 100, 1000] {
        let source = inventory(size);
        group.bench_with_input(BenchmarkId::new("map_field", size), &source, |bencher, source| {
            bencher.iter(|| black_box(durabilities.get(black_box(source))));
        });
    }

    group.finish();
}

fn benchmark_folded_get(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("folded_get");
    let worn = Optic::new()
        .field("items")
        .map()
        .reduce_filter(|item| {
            item.get("durability")
                .and_then(Value::as_f64)
                .is_some_and(|durability| durability < 5.0)
        })
        .field("id");

    for size in [10, 100, 1000] {
        let source = inventory(size);
        group.bench_with_input(BenchmarkId::new("reduce_filter", size), &source, |bencher, source| {
            bencher.iter(|| black_box(worn.get(black_box(source))));
        });
    }

    group.finish();
}

// =============================================================================
// Write Benchmarks
// =============================================================================

fn benchmark_writes(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("writes");
    let first = Optic::new().field("items").index(0).field("durability");
    let every = Optic::new().field("items").map().field("durability");
    let last = Optic::new().field("items").map().last().field("durability");

    for size in [10, 100, 1000] {
        let source = inventory(size);

        group.bench_with_input(BenchmarkId::new("index", size), &source, |bencher, source| {
            bencher.iter(|| black_box(first.set(black_box(source), 0)));
        });

        group.bench_with_input(BenchmarkId::new("map", size), &source, |bencher, source| {
            bencher.iter(|| black_box(every.set(black_box(source), 0)));
        });

        // Only one element changes, the rest of the array is shared.
        group.bench_with_input(BenchmarkId::new("fold", size), &source, |bencher, source| {
            bencher.iter(|| black_box(last.set(black_box(source), 0)));
        });
    }

    group.finish();
}

// =============================================================================
// Store Benchmarks
// =============================================================================

fn benchmark_store_notify(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("store_notify");

    for listeners in [1, 10, 100] {
        let state = create_state(inventory(100));
        let subscriptions: Vec<_> = (0..listeners)
            .map(|index| {
                state
                    .field("items")
                    .index(index % 100)
                    .subscribe_with(|focus| { black_box(focus); }, SubscribeOptions::normalized())
            })
            .collect();
        let target = state.field("items").index(0).field("durability");
        let mut counter = 0;

        group.bench_function(BenchmarkId::new("listeners", listeners), |bencher| {
            bencher.iter(|| {
                counter += 1;
                target.set(counter);
            });
        });

        drop(subscriptions);
    }

    group.finish();
}

fn benchmark_denormalized_get(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("denormalized_get");

    let cities: Vec<_> = (0..50)
        .map(|index| create_state(value!({ name: "city", inhabitants: index })))
        .collect();
    let people = create_state(
        cities
            .iter()
            .map(|city| value!({ city: (city.clone()) }))
            .collect::<Value>(),
    );

    group.bench_function("cached", |bencher| {
        bencher.iter(|| black_box(people.get()));
    });

    group.bench_function("after_write", |bencher| {
        let mut counter = 0;
        bencher.iter(|| {
            counter += 1;
            cities[0].field("inhabitants").set(counter);
            black_box(people.get())
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_mapped_get,
    benchmark_folded_get,
    benchmark_writes,
    benchmark_store_notify,
    benchmark_denormalized_get
);

criterion_main!(benches);
