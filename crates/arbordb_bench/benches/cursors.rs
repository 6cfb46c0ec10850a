//! Index and group cursor benchmarks.

use arbordb_bench::shuffled_values;
use arbordb_core::{
    open_index_cursor, Direction, GroupCursor, IndexBound, IndexCursor, IndexOrdering,
    IndexScanSelector, IterationHelper,
};
use arbordb_codec::Value;
use arbordb_testkit::{IntIndexFixture, OrdersFixture};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::sync::Arc;

/// Full ascending scans through the cursor factory.
fn bench_index_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("index_scan");
    for size in [100usize, 1_000, 10_000] {
        let fixture = IntIndexFixture::new(&shuffled_values(size));
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("full", size), &fixture, |b, fixture| {
            b.iter(|| {
                let mut cursor = open_index_cursor(
                    fixture.adapter.clone(),
                    Arc::clone(&fixture.group),
                    fixture.range(),
                    &IndexOrdering::ascending(1),
                    IndexScanSelector::All,
                )
                .unwrap();
                cursor.open().unwrap();
                let mut count = 0;
                while let Some(row) = cursor.next().unwrap() {
                    black_box(row);
                    count += 1;
                }
                cursor.close().unwrap();
                count
            });
        });
    }
    group.finish();
}

/// Short bounded scans, the common lookup shape.
fn bench_bounded_scan(c: &mut Criterion) {
    let fixture = IntIndexFixture::new(&shuffled_values(10_000));
    c.bench_function("index_scan/bounded_10", |b| {
        let mut lo = 0i64;
        b.iter(|| {
            lo = (lo + 97) % 9_990;
            let range = fixture
                .range()
                .lo(IndexBound::inclusive([Value::Int(lo)]))
                .hi(IndexBound::exclusive([Value::Int(lo + 10)]));
            let mut cursor = open_index_cursor(
                fixture.adapter.clone(),
                Arc::clone(&fixture.group),
                range,
                &IndexOrdering::ascending(1),
                IndexScanSelector::All,
            )
            .unwrap();
            cursor.open().unwrap();
            while let Some(row) = cursor.next().unwrap() {
                black_box(row);
            }
        });
    });
}

/// Sequential traversal with a cached iterator against reseeding every step.
fn bench_iterator_reuse(c: &mut Criterion) {
    let fixture = IntIndexFixture::new(&shuffled_values(1_000));
    let mut group = c.benchmark_group("traverse");

    group.bench_function("cached", |b| {
        b.iter(|| {
            let mut helper = IterationHelper::new(
                fixture.adapter.clone(),
                Arc::clone(&fixture.group),
                Arc::clone(&fixture.index),
            );
            let mut direction = Direction::GtEq;
            while helper.traverse(direction, true).unwrap() {
                direction = Direction::Gt;
            }
        });
    });

    group.bench_function("reseeded", |b| {
        b.iter(|| {
            let mut helper = IterationHelper::new(
                fixture.adapter.clone(),
                Arc::clone(&fixture.group),
                Arc::clone(&fixture.index),
            );
            let mut direction = Direction::GtEq;
            while helper.traverse(direction, true).unwrap() {
                let key = helper.key().to_vec();
                helper.clear();
                helper.set_key(&key);
                direction = Direction::Gt;
            }
        });
    });

    group.finish();
}

/// Group scans over the orders fixture.
fn bench_group_scan(c: &mut Criterion) {
    let fixture = OrdersFixture::populated();
    let anchor = fixture.customer_key(1);
    c.bench_function("group_scan/subtree", |b| {
        b.iter(|| {
            let mut cursor = GroupCursor::new(fixture.adapter.clone(), Arc::clone(&fixture.group));
            cursor.rebind(Some(anchor.clone()), true).unwrap();
            cursor.open().unwrap();
            while let Some(row) = cursor.next().unwrap() {
                black_box(row);
            }
        });
    });
}

criterion_group!(
    benches,
    bench_index_scan,
    bench_bounded_scan,
    bench_iterator_reuse,
    bench_group_scan
);
criterion_main!(benches);
