//! Keyset pagination benchmarks

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::Value;
use telemetra::common::{Field, SortOrder};
use telemetra::cursor::{KeysetCursor, OrderBy};
use telemetra::evaluator::Evaluator;
use telemetra::filter::all;
use telemetra_bench::data_gen::generate_records;

fn order_by() -> OrderBy {
    OrderBy::new(vec![
        (Field::parse("bucket").unwrap(), SortOrder::Ascending),
        (Field::parse("value").unwrap(), SortOrder::Descending),
        (Field::parse("id").unwrap(), SortOrder::Ascending),
    ])
    .unwrap()
}

fn bench_sort(c: &mut Criterion) {
    let mut group = c.benchmark_group("Cursor/Sort");
    let order = order_by();

    for size in [100, 1_000, 10_000].iter() {
        let records = generate_records(*size);
        group.bench_with_input(BenchmarkId::new("three_fields", size), &records, |b, records| {
            b.iter_with_setup(
                || records.clone(),
                |mut records| {
                    order.sort(&mut records).unwrap();
                    black_box(records)
                },
            );
        });
    }

    group.finish();
}

fn bench_token(c: &mut Criterion) {
    let mut group = c.benchmark_group("Cursor/Token");
    let order = order_by();
    let mut records = generate_records(100);
    order.sort(&mut records).unwrap();
    let cursor = KeysetCursor::generate(&order, &records[..20]).unwrap().unwrap();
    let token = cursor.encode().unwrap();

    group.bench_function("encode", |b| b.iter(|| black_box(cursor.encode().unwrap())));
    group.bench_function("decode", |b| b.iter(|| black_box(KeysetCursor::decode(&token).unwrap())));

    group.finish();
}

fn bench_page_through(c: &mut Criterion) {
    let mut group = c.benchmark_group("Cursor/Page Through");
    let evaluator = Evaluator::new();
    let order = order_by();
    let records = generate_records(2_000);

    for page_size in [50, 200].iter() {
        group.bench_with_input(BenchmarkId::new("page_size", page_size), page_size, |b, &page_size| {
            b.iter(|| {
                let mut cursor: Option<KeysetCursor> = None;
                let mut delivered = 0;
                loop {
                    let filter = match &cursor {
                        None => all(),
                        Some(cursor) => cursor.resume(all(), &order).unwrap(),
                    };
                    let mut page: Vec<Value> = records
                        .iter()
                        .filter(|record| evaluator.matches(*record, &filter).unwrap())
                        .cloned()
                        .collect();
                    order.sort(&mut page).unwrap();
                    if let Some(cursor) = &cursor {
                        page = cursor.trim_tied(&order, page).unwrap();
                    }
                    page.truncate(page_size);
                    if page.is_empty() {
                        break;
                    }
                    delivered += page.len();
                    cursor = KeysetCursor::generate_after(cursor.as_ref(), &order, &page).unwrap();
                }
                black_box(delivered)
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_sort, bench_token, bench_page_through);
criterion_main!(benches);
