//! Benchmarks for dump parsing.
//!
//! Run with `cargo bench -p hm-dump`.

use std::fmt::Write;
use std::hint::black_box;

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use hm_dump::DumpParser;

/// Builds a dump with `statements` extended inserts of `tuples` rows each.
fn synthetic_dump(statements: usize, tuples: usize) -> String {
    let mut dump = String::from("-- synthetic dump\nSET NAMES utf8mb4;\n");
    for s in 0..statements {
        dump.push_str(
            "INSERT INTO `legacy_patients` (`fname`, `lname`, `icn`, `dob`, `notes`) VALUES\n",
        );
        for t in 0..tuples {
            let n = s * tuples + t;
            let sep = if t + 1 == tuples { ';' } else { ',' };
            let _ = writeln!(
                dump,
                "('Name{n}', 'O\\'Surname', '{n:016}', '1990-04-02', NULL){sep}"
            );
        }
    }
    dump
}

fn bench_parse(c: &mut Criterion) {
    let dump = synthetic_dump(100, 500);

    let mut group = c.benchmark_group("parse");
    group.throughput(Throughput::Bytes(dump.len() as u64));
    group.bench_function("extended_inserts", |b| {
        b.iter(|| DumpParser::new(black_box(&dump)).filter(Result::is_ok).count());
    });
    group.finish();
}

criterion_group!(benches, bench_parse);
criterion_main!(benches);
