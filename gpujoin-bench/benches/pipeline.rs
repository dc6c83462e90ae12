//! Host-side pipeline benchmarks: text table parsing, binary cache load,
//! and the reference join used for `--no-gpu` runs.

use std::io::Cursor;
use std::path::Path;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use gpujoin_bench::loader::{cache, text};
use gpujoin_runtime::host::host_join;
use gpujoin_runtime::TableRow;

// ============================================================
// Data generation
// ============================================================

/// Lookup table of `n` rows with random titles, plus a left table that
/// references a random lookup row per row.
fn generate_tables(n: usize, seed: u64) -> (Vec<TableRow>, Vec<TableRow>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let lookup: Vec<TableRow> = (0..n)
        .map(|i| {
            let len = rng.gen_range(4..48);
            let title: String = (0..len)
                .map(|_| rng.gen_range(b'a'..=b'z') as char)
                .collect();
            TableRow::new(i as u32 + 1, format!("{title}_{i}").as_bytes())
        })
        .collect();
    let left = (0..n)
        .map(|_| TableRow::new(0, lookup[rng.gen_range(0..n)].text_bytes()))
        .collect();
    (left, lookup)
}

fn to_text(rows: &[TableRow]) -> String {
    let mut s = String::with_capacity(rows.len() * 40);
    for row in rows {
        s.push_str(&text::format_row(row));
        s.push('\n');
    }
    s
}

// ============================================================
// Benchmarks
// ============================================================

fn bench_parse_text(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_text");
    for n in [10_000usize, 100_000] {
        let (_, lookup) = generate_tables(n, 7);
        let input = to_text(&lookup);
        group.throughput(Throughput::Bytes(input.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &input, |b, input| {
            b.iter(|| text::parse_rows(Cursor::new(input.as_bytes()), Path::new("bench.csv")))
        });
    }
    group.finish();
}

fn bench_cache_load(c: &mut Criterion) {
    let mut group = c.benchmark_group("cache_load");
    let dir = tempfile::tempdir().expect("tempdir");
    for n in [10_000usize, 100_000] {
        let (_, lookup) = generate_tables(n, 11);
        let path = dir.path().join(format!("pt{n}.bin"));
        cache::save(&path, &lookup).expect("save cache");
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &path, |b, path| {
            b.iter(|| cache::load(path).expect("load cache"))
        });
    }
    group.finish();
}

fn bench_host_join(c: &mut Criterion) {
    let mut group = c.benchmark_group("host_join");
    group.sample_size(20);
    for n in [10_000usize, 100_000] {
        let (left, lookup) = generate_tables(n, 3);
        let mut out = vec![0u32; left.len()];
        group.throughput(Throughput::Elements(n as u64));
        group.bench_function(BenchmarkId::from_parameter(n), |b| {
            b.iter(|| host_join(&left, &lookup, &mut out))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_parse_text, bench_cache_load, bench_host_join);
criterion_main!(benches);
