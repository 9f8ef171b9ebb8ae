//! Throughput benchmarks for the keyspace hot paths.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use flintkv::storage::Keyspace;

fn bench_set(c: &mut Criterion) {
    let store = Keyspace::new();

    let mut group = c.benchmark_group("set");
    group.throughput(Throughput::Elements(1));

    group.bench_function("set_small", |b| {
        let mut i = 0u64;
        b.iter(|| {
            store.set(format!("key:{}", i), "small_value".to_string());
            i += 1;
        });
    });

    group.bench_function("set_large", |b| {
        let mut i = 0u64;
        let value = "x".repeat(4 * 1024);
        b.iter(|| {
            store.set(format!("key:{}", i), value.clone());
            i += 1;
        });
    });

    group.finish();
}

fn bench_get(c: &mut Criterion) {
    let store = Keyspace::new();
    for i in 0..100_000 {
        store.set(format!("key:{}", i), format!("value:{}", i));
    }

    let mut group = c.benchmark_group("get");
    group.throughput(Throughput::Elements(1));

    group.bench_function("get_existing", |b| {
        let mut i = 0u64;
        b.iter(|| {
            black_box(store.get(&format!("key:{}", i % 100_000)).unwrap());
            i += 1;
        });
    });

    group.bench_function("get_missing", |b| {
        let mut i = 0u64;
        b.iter(|| {
            black_box(store.get(&format!("missing:{}", i)).unwrap());
            i += 1;
        });
    });

    group.finish();
}

fn bench_incr(c: &mut Criterion) {
    let store = Keyspace::new();
    store.set("counter".to_string(), "0".to_string());

    let mut group = c.benchmark_group("incr");
    group.throughput(Throughput::Elements(1));

    group.bench_function("incr", |b| {
        b.iter(|| {
            black_box(store.incr_by("counter", 1).unwrap());
        });
    });

    group.finish();
}

fn bench_lists(c: &mut Criterion) {
    let store = Keyspace::new();

    let mut group = c.benchmark_group("lists");
    group.throughput(Throughput::Elements(1));

    group.bench_function("rpush_then_lpop", |b| {
        let element = vec!["element".to_string()];
        b.iter(|| {
            store.rpush("queue", &element).unwrap();
            black_box(store.lpop("queue").unwrap());
        });
    });

    group.finish();
}

fn bench_keys_glob(c: &mut Criterion) {
    let store = Keyspace::new();
    for i in 0..10_000 {
        store.set(format!("user:{}", i), "x".to_string());
    }

    let mut group = c.benchmark_group("keys");

    group.bench_function("keys_prefix_glob", |b| {
        b.iter(|| {
            black_box(store.keys_matching("user:1*"));
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_set,
    bench_get,
    bench_incr,
    bench_lists,
    bench_keys_glob
);
criterion_main!(benches);
