//! Benchmark for hashing fixture record sets.
//!
//! Every insert on a modified table hashes the fixture's records, so this is
//! the cost a suite pays per reload on top of the fingerprint queries.

use checksum_fixture::{Record, Value, compute_record_hash, record};
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;

/// Build `count` user-like records.
fn users(count: usize) -> Vec<Record> {
    (0..count)
        .map(|i| {
            let id = i64::try_from(i).unwrap();
            record! {
                "id" => id,
                "name" => format!("user-{i}"),
                "email" => format!("user-{i}@example.com"),
                "score" => 0.5,
                "avatar" => vec![0u8; 64],
                "deleted_at" => Value::Null,
            }
        })
        .collect()
}

fn bench_record_hash(c: &mut Criterion) {
    let mut group = c.benchmark_group("compute_record_hash");
    for count in [1usize, 100, 10_000] {
        let records = users(count);
        group.throughput(Throughput::Elements(u64::try_from(count).unwrap()));
        group.bench_with_input(BenchmarkId::from_parameter(count), &records, |b, records| {
            b.iter(|| compute_record_hash(black_box(records)));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_record_hash);
criterion_main!(benches);
