//! Status derivation and table interaction benchmarks.
//!
//! Measures deriving loan state from a loan log, and sorting and searching
//! the resulting catalog table.

use chrono::{NaiveDate, NaiveDateTime};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use bookshelf::status::derive_loan_state_at;
use bookshelf::{Sheet, TableId, TableState};

fn now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 6, 30)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap()
}

/// Generate a catalog of `books` books and a loan log with about three
/// entries per book, alternating loans and returns.
fn generate_library(books: usize) -> (Sheet, Sheet) {
    let titles = ["데미안", "어린 왕자", "노인과 바다", "Vol 2", "Vol 10", "1984"];
    let borrowers = ["김철수", "이영희", "박민수", "Kim", "Lee"];

    let mut catalog = vec![vec![
        "코드".to_string(),
        "제목".to_string(),
        "저자".to_string(),
        "등록일".to_string(),
    ]];
    let mut log = vec![vec![
        "대출일".to_string(),
        "코드".to_string(),
        "대출자".to_string(),
        "상태".to_string(),
    ]];

    for i in 0..books {
        let code = format!("B{:05}", i);
        catalog.push(vec![
            code.clone(),
            format!("{} {}", titles[i % titles.len()], i),
            format!("Author {}", i % 97),
            format!("2024-{:02}-{:02}", (i % 6) + 1, (i % 28) + 1),
        ]);

        for entry in 0..(i % 4) {
            let status = if entry % 2 == 0 { "대출" } else { "반납" };
            log.push(vec![
                format!("2024-{:02}-{:02} 10:00", (entry % 6) + 1, (i % 28) + 1),
                code.clone(),
                borrowers[(i + entry) % borrowers.len()].to_string(),
                status.to_string(),
            ]);
        }
    }

    (
        Sheet::from_rows(log).unwrap(),
        Sheet::from_rows(catalog).unwrap(),
    )
}

fn catalog_table(books: usize) -> TableState {
    let (log, catalog) = generate_library(books);
    let derived = derive_loan_state_at(&log, catalog, now()).unwrap();
    let mut table = TableState::new(TableId::Catalog).with_status_column(Some(derived.schema.status));
    table.render(derived.header, derived.entries, true);
    table
}

/// Benchmark deriving loan state for catalogs of various sizes.
fn bench_derive_loan_state(c: &mut Criterion) {
    let mut group = c.benchmark_group("derive_loan_state");

    for books in [100, 1_000, 10_000].iter() {
        let (log, catalog) = generate_library(*books);

        group.throughput(Throughput::Elements(log.row_count() as u64));
        group.bench_with_input(BenchmarkId::new("books", books), &(log, catalog), |b, (log, catalog)| {
            b.iter_with_setup(
                || catalog.clone(),
                |catalog| black_box(derive_loan_state_at(log, catalog, now()).unwrap()),
            )
        });
    }

    group.finish();
}

/// Benchmark sorting by a text column and by a numeric-looking column.
fn bench_sort(c: &mut Criterion) {
    let mut group = c.benchmark_group("sort");

    for books in [1_000, 10_000].iter() {
        let table = catalog_table(*books);
        group.throughput(Throughput::Elements(*books as u64));

        for (name, column) in [("title", 1), ("code", 0)] {
            group.bench_with_input(BenchmarkId::new(name, books), &table, |b, table| {
                b.iter_with_setup(
                    || table.clone(),
                    |mut table| black_box(table.sort_at(column, now())),
                )
            });
        }
    }

    group.finish();
}

/// Benchmark case-insensitive search.
fn bench_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("search");

    let books = 10_000;
    let table = catalog_table(books);
    group.throughput(Throughput::Elements(books as u64));

    for query in ["데미안", "author 42", "overdue"] {
        group.bench_with_input(BenchmarkId::new("query", query), &table, |b, table| {
            b.iter_with_setup(|| table.clone(), |mut table| black_box(table.search(query)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_derive_loan_state, bench_sort, bench_search);
criterion_main!(benches);
