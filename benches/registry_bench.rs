//! Benchmarks for registry generation and redemption

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use discountd::store::MemoryStore;
use discountd::{CodeGenerator, Registry};

fn fresh_registry() -> Registry {
    Registry::new(Arc::new(MemoryStore::new()), CodeGenerator::with_seed(1))
        .expect("registry over empty store")
}

fn generate_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("generate_batch");

    for count in [1u16, 100, 2000] {
        group.bench_function(format!("count_{}", count), |b| {
            let registry = fresh_registry();
            b.iter(|| black_box(registry.generate_batch(count, 8).expect("generate")));
        });
    }

    group.finish();
}

fn redeem_benchmarks(c: &mut Criterion) {
    c.bench_function("redeem_fresh_code", |b| {
        b.iter_batched(
            || {
                let registry = fresh_registry();
                let code = registry.generate_batch(1, 8).expect("generate").codes.remove(0).code;
                (registry, code)
            },
            |(registry, code)| black_box(registry.redeem(&code)),
            BatchSize::SmallInput,
        );
    });

    c.bench_function("redeem_unknown_code", |b| {
        let registry = fresh_registry();
        b.iter(|| black_box(registry.redeem("ABCDEFGH")));
    });
}

criterion_group!(benches, generate_benchmarks, redeem_benchmarks);
criterion_main!(benches);
