use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use roster_dedup::dedup::resolve_duplicates;
use roster_dedup::sheet::Sheet;

fn generate_roster(rows: usize, identities: usize, with_dates: bool) -> Sheet {
    let date_header = if with_dates { "FECHA" } else { "NOTA" };
    let headers = vec![
        "EMPLEADO".to_string(),
        "DOCUMENTO".to_string(),
        date_header.to_string(),
    ];
    let data = (0..rows)
        .map(|i| {
            let doc = format!("{:08}", i % identities);
            let month = (i % 12) + 1;
            let day = (i % 28) + 1;
            let cell = if with_dates {
                format!("2023-{month:02}-{day:02}")
            } else {
                format!("note {i}")
            };
            vec![format!("employee {i}"), doc, cell]
        })
        .collect();
    Sheet::new(headers, data)
}

fn bench_dedup(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve_duplicates");

    let dated = generate_roster(50_000, 10_000, true);
    group.bench_function("date_aware_50k", |b| {
        b.iter_batched(
            || dated.clone(),
            |sheet| resolve_duplicates(sheet).expect("dedup dated roster"),
            BatchSize::SmallInput,
        );
    });

    let dateless = generate_roster(50_000, 10_000, false);
    group.bench_function("insertion_order_50k", |b| {
        b.iter_batched(
            || dateless.clone(),
            |sheet| resolve_duplicates(sheet).expect("dedup dateless roster"),
            BatchSize::SmallInput,
        );
    });

    group.finish();
}

criterion_group!(benches, bench_dedup);
criterion_main!(benches);
