use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use shelf_catalog::{Category, reorder_by_ids};
use shelf_core::CategoryId;

/// Batch arrives reversed, the worst case for a naive positional scan.
fn reversed_batch(n: i64) -> (Vec<CategoryId>, Vec<Category>) {
    let order: Vec<CategoryId> = (0..n).map(CategoryId::new).collect();
    let batch = (0..n)
        .rev()
        .map(|i| Category::new(CategoryId::new(i), format!("category {i}")))
        .collect();
    (order, batch)
}

fn bench_reorder_by_ids(c: &mut Criterion) {
    let mut group = c.benchmark_group("reorder_by_ids");

    for page_size in [12i64, 100, 1_000].iter() {
        group.throughput(Throughput::Elements(*page_size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(page_size), page_size, |b, &n| {
            let (order, batch) = reversed_batch(n);
            b.iter(|| {
                let merged = reorder_by_ids(black_box(&order), black_box(batch.clone()));
                black_box(merged.items.len())
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_reorder_by_ids);
criterion_main!(benches);
