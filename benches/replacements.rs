//! Benchmarks for the replacement table algebra.

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use sc_inference::element::ElementId;
use sc_inference::replacements::Replacements;
use sc_inference::template::TemplateParams;

fn id(raw: u64) -> ElementId {
    ElementId::new(raw).expect("non-zero id")
}

/// `rows` rows over `x` and `key`, with `x` cycling through `spread` values.
fn table(key: u64, rows: u64, spread: u64) -> Replacements {
    let x = id(1);
    let k = id(key);
    let params: Vec<TemplateParams> = (0..rows)
        .map(|i| TemplateParams::from([(x, id(100 + i % spread)), (k, id(10_000 + i))]))
        .collect();
    Replacements::from_params([x, k], params.iter())
}

fn bench_intersect(c: &mut Criterion) {
    let left = table(2, 200, 50);
    let right = table(3, 200, 50);

    c.bench_function("intersect_200x200", |bench| {
        bench.iter(|| black_box(left.intersect(&right)))
    });
}

fn bench_unite(c: &mut Criterion) {
    let left = table(2, 50, 50);
    let right = table(3, 50, 50);

    c.bench_function("unite_50x50", |bench| {
        bench.iter(|| black_box(left.unite(&right)))
    });
}

fn bench_dedup(c: &mut Criterion) {
    let left = table(2, 100, 10);
    let doubled = left.unite(&left);

    c.bench_function("dedup_rows_double_union", |bench| {
        bench.iter(|| black_box(doubled.dedup_rows()))
    });
}

criterion_group!(benches, bench_intersect, bench_unite, bench_dedup);
criterion_main!(benches);
