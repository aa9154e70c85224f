use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use conversion_pulse::query::executor::{RawCount, RawRow};
use conversion_pulse::query::metrics::compute_records;
use conversion_pulse::query::reshape::reshape;
use conversion_pulse::query::summary::summarize;
use std::hint::black_box;

const CHANNELS: [&str; 5] = ["email", "wpp", "sms", "push", "voice"];

/// Daily rows over `days` days; every third channel skips odd days so the
/// reshaper has gaps to fill.
fn make_rows(days: u32) -> Vec<RawRow> {
    let start = chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let mut rows = Vec::new();
    for d in 0..days {
        let date = start + chrono::Days::new(u64::from(d));
        for (i, channel) in CHANNELS.iter().enumerate() {
            if i % 3 == 2 && d % 2 == 1 {
                continue;
            }
            rows.push(RawRow {
                period: format!("{date}T00:00:00.000Z"),
                channel: Some((*channel).to_string()),
                total_sent: Some(RawCount::Text((100 + d).to_string())),
                converted: Some(RawCount::Int(i64::from(d % 37))),
            });
        }
    }
    rows
}

fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("conversion_pipeline");

    for days in [30, 365, 3_650] {
        let rows = make_rows(days);
        group.bench_with_input(BenchmarkId::new("compute_records", days), &rows, |b, rows| {
            b.iter(|| compute_records(black_box(rows.clone())));
        });

        let records = compute_records(rows);
        group.bench_with_input(BenchmarkId::new("reshape", days), &records, |b, records| {
            b.iter(|| reshape(black_box(records)));
        });
        group.bench_with_input(BenchmarkId::new("summarize", days), &records, |b, records| {
            b.iter(|| summarize(black_box(records)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_pipeline);
criterion_main!(benches);
