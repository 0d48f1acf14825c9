use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use fieldsync_core::{Encodable, FieldOperation, ObjectRef, OperationQueue, Value, WireEncoder};

/// Benchmark merging a stream of increments into one queued operation
fn bench_increment_merge(c: &mut Criterion) {
    c.bench_function("increment_merge_1000", |b| {
        b.iter(|| {
            let mut queue = OperationQueue::new();
            for _ in 0..1000 {
                queue.push("score", FieldOperation::increment(1)).unwrap();
            }
            black_box(queue);
        });
    });
}

/// Benchmark Remove.apply over arrays of growing size (quadratic scan)
fn bench_remove_apply(c: &mut Criterion) {
    let mut group = c.benchmark_group("remove_apply");

    for size in [10, 100, 1000].iter() {
        let prior = Value::from((0..*size as i64).collect::<Vec<_>>());
        let op = FieldOperation::remove((0..*size as i64).step_by(2).collect::<Vec<_>>()).unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| black_box(op.apply(Some(&prior), "field").unwrap()));
        });
    }

    group.finish();
}

/// Benchmark identity-aware removal of object references
fn bench_remove_references(c: &mut Criterion) {
    let prior = Value::from(
        (0..100)
            .map(|i| ObjectRef::pointer("Post", format!("p{}", i)))
            .collect::<Vec<_>>(),
    );
    let op = FieldOperation::remove(vec![ObjectRef::pointer("Post", "p50")]).unwrap();

    c.bench_function("remove_references_100", |b| {
        b.iter(|| black_box(op.apply(Some(&prior), "field").unwrap()));
    });
}

/// Benchmark encoding a save payload
fn bench_encode_payload(c: &mut Criterion) {
    let mut queue = OperationQueue::new();
    for i in 0..50 {
        let key = format!("field{}", i);
        queue.push(&key, FieldOperation::add_unique(vec![i, i + 1]).unwrap()).unwrap();
    }
    queue.push("title", FieldOperation::set("hello")).unwrap();

    c.bench_function("encode_payload_51_fields", |b| {
        b.iter(|| black_box(queue.encode(&WireEncoder).unwrap()));
    });

    let op = FieldOperation::add(vec![ObjectRef::pointer("Post", "p1")]).unwrap();
    c.bench_function("encode_single_add", |b| {
        b.iter(|| black_box(op.encode().unwrap()));
    });
}

criterion_group!(
    benches,
    bench_increment_merge,
    bench_remove_apply,
    bench_remove_references,
    bench_encode_payload
);
criterion_main!(benches);
