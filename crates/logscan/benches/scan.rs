//! Benchmark – delimiter search and record tokenization
#![allow(missing_docs)]

use std::time::Duration;

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use logscan::{
    ByteClass, ParserOptions, ParserTables, ReaderOptions, RecordTokenizer, ScanBuffer,
    TableParser, TokenizeError,
};

const TABLES: &str = ".metadata 1 10001000
.type 1 1001110000000000 8
1100000000000000 0100000000000000 0100000000000001 1100000000000000
1100000000000000 0100000000000010 1100000000000000 1100000000000000
.variables 3
1 1010000000000000
5 0100000000000100 0000000000000001 1001000000000000 0000000000000001 1010000000000000
5 0100000000000100 0000000000000001 1000000000000000 0000000000000001 1010000000000000
";

/// A deterministic log of `lines` records cycling through the three record
/// types the tables know.
fn make_log(lines: usize) -> Vec<u8> {
    let mut out = Vec::new();
    for i in 0..lines {
        let (h, m, s) = (i / 3600 % 24, i / 60 % 60, i % 60);
        let line = match i % 3 {
            0 => format!("{h:02}:{m:02}:{s:02} INFO login user=u{i} from 10.0.{}.{}\n", i % 256, i / 256 % 256),
            1 => format!("{h:02}:{m:02}:{s:02} WARN disk /var/{i} at {}%\n", i % 100),
            _ => format!("{h:02}:{m:02}:{s:02} ERROR timeout after {}ms on request {i}\n", i * 7 % 5000),
        };
        out.extend_from_slice(line.as_bytes());
    }
    out
}

fn bench_find(c: &mut Criterion) {
    let mut group = c.benchmark_group("scan_buffer_find");

    for &len in &[64usize, 4_096, 60_000] {
        let mut buf = ScanBuffer::with_inline_capacity(len);
        let mut data = vec![b'x'; len];
        data[len - 1] = b'\n';
        buf.append_range(&data).unwrap();

        group.throughput(Throughput::Bytes(len as u64));
        group.bench_with_input(BenchmarkId::new("newline", len), &buf, |b, buf| {
            b.iter(|| black_box(buf.find(black_box(ByteClass::NEWLINE))));
        });
        group.bench_with_input(BenchmarkId::new("whitespace", len), &buf, |b, buf| {
            b.iter(|| black_box(buf.find(black_box(ByteClass::WHITESPACE))));
        });
    }
    group.finish();
}

fn run_tokenizer(log: &[u8], parser: &TableParser, capacity: usize) -> usize {
    let mut records = RecordTokenizer::new(log, parser.clone(), ReaderOptions {
        inline_capacity: capacity,
    });
    let mut fields = 0usize;
    records
        .for_each_record(|record| {
            fields += record.tokens().len();
            Ok::<_, TokenizeError>(())
        })
        .unwrap();
    fields
}

fn bench_tokenizer(c: &mut Criterion) {
    let log = make_log(10_000);
    let parser = TableParser::new(ParserTables::parse(TABLES).unwrap(), ParserOptions::default());

    let mut group = c.benchmark_group("record_tokenizer");
    group.throughput(Throughput::Bytes(log.len() as u64));
    for &capacity in &[256usize, 4_096, 60_000] {
        group.bench_with_input(BenchmarkId::from_parameter(capacity), &capacity, |b, &cap| {
            b.iter(|| black_box(run_tokenizer(black_box(&log), &parser, cap)));
        });
    }
    group.finish();
}

fn criterion() -> Criterion {
    let mut c = Criterion::default();
    if cfg!(feature = "bench-fast") {
        c = c
            .warm_up_time(Duration::from_millis(10))
            .measurement_time(Duration::from_millis(100))
            .sample_size(10);
    } else {
        c = c
            .warm_up_time(Duration::from_secs(3))
            .measurement_time(Duration::from_secs(8));
    }
    c
}

criterion_group! { name = benches; config = criterion(); targets = bench_find, bench_tokenizer }
criterion_main!(benches);
