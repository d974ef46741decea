#![no_main]
use std::{cell::RefCell, io::Read};

use arbitrary::{Arbitrary, Unstructured};
use libfuzzer_sys::{fuzz_mutator, fuzz_target, fuzzer_mutate};
use logscan::{
    ParseError, ParserOptions, ParserTables, ReaderOptions, RecordTokenizer, TableParser,
    TokenizeError,
};
use rand::rngs::SmallRng;
use rand::{Rng, RngCore, SeedableRng};

const HEADER: usize = 5; // 1 capacity byte + 4-byte split seed

const TABLES: &str = ".metadata 1 10001000
.type 1 1001110000000000 8
1100000000000000 0100000000000000 0100000000000001 1100000000000000
1100000000000000 0100000000000010 1100000000000000 1100000000000000
.variables 3
1 1010000000000000
5 0100000000000100 0000000000000001 1001000000000000 0000000000000001 1010000000000000
5 0100000000000100 0000000000000001 1000000000000000 0000000000000001 1010000000000000
";

static LEVELS: &[&[u8]] = &[b"INFO", b"WARN", b"ERROR", b"DEBUG", b"E", b"", b"IN"];
static WORDS: &[&[u8]] = &[
    b"login", b"user=bob", b"(a b)", b"[x y", b"{}", b"10.0.0.1", b"retry", b"  ", b"\n",
];

thread_local! {
    static RNG: RefCell<SmallRng> = RefCell::new(SmallRng::from_os_rng());
}

fn with_rng<F, R>(f: F) -> R
where
    F: FnOnce(&mut SmallRng) -> R,
{
    RNG.with(|cell| f(&mut cell.borrow_mut()))
}

/// Writes one log-shaped line into `buf`, truncated to `limit`.
fn append_line(buf: &mut [u8], limit: usize) -> usize {
    let mut line = with_rng(|rng| {
        let mut line = format!(
            "{:02}:{:02}:{:02} ",
            rng.random_range(0..24),
            rng.random_range(0..60),
            rng.random_range(0..60)
        )
        .into_bytes();
        line.extend_from_slice(LEVELS[rng.random_range(0..LEVELS.len())]);
        for _ in 0..rng.random_range(0..6) {
            line.push(b' ');
            line.extend_from_slice(WORDS[rng.random_range(0..WORDS.len())]);
        }
        line
    });
    line.push(b'\n');

    let len = line.len().min(limit);
    buf[..len].copy_from_slice(&line[..len]);
    len
}

fn mutator(data: &mut [u8], size: usize, max_size: usize, seed: u32) -> usize {
    if size < HEADER || seed.is_multiple_of(10) {
        data[0] = with_rng(|rng| rng.next_u32() as u8);
        data[1..5].copy_from_slice(&with_rng(|rng| rng.next_u32().to_le_bytes()));

        let target = size.clamp(HEADER + 1, max_size);
        let mut prefix = HEADER;
        while prefix < target {
            let written = append_line(&mut data[prefix..], max_size - prefix);
            if written == 0 {
                break;
            }
            prefix += written;
        }
        prefix
    } else {
        fuzzer_mutate(data, size, max_size)
    }
}

fuzz_mutator!(|data: &mut [u8], size: usize, max_size: usize, seed: u32| {
    mutator(data, size, max_size, seed)
});

/// Serves `data` in seed-derived reads of at least one byte.
#[derive(Debug)]
struct SplitReader<'a> {
    data: &'a [u8],
    seed: u32,
}

impl Read for SplitReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if self.data.is_empty() || buf.is_empty() {
            return Ok(0);
        }
        self.seed = self.seed.rotate_left(7) ^ 0x9e37_79b9;
        let len = (self.seed as usize % self.data.len() + 1).min(buf.len());
        buf[..len].copy_from_slice(&self.data[..len]);
        self.data = &self.data[len..];
        Ok(len)
    }
}

/// Debug renderings of every record, with rejected lines skipped, up to the
/// first table corruption.
fn tokenize<R: Read>(source: R, capacity: usize) -> Vec<String> {
    let tables = ParserTables::parse(TABLES).unwrap();
    let parser = TableParser::new(tables, ParserOptions::default());
    let mut records = RecordTokenizer::new(source, parser, ReaderOptions {
        inline_capacity: capacity,
    });

    let mut out = Vec::new();
    loop {
        match records.next_record(|record| record.to_owned_fields()) {
            Ok(Some(fields)) => out.push(format!("{:?}", fields.unwrap())),
            Ok(None) => break,
            // Unused slots (`11...`) are fatal for the whole table set.
            Err(err @ TokenizeError::Parse(ParseError::TableCorrupt { .. })) => {
                out.push(format!("corrupt: {err}"));
                break;
            }
            Err(err) => {
                out.push(format!("rejected: {err}"));
                match records.skip_line() {
                    Ok(Some(_)) => {}
                    Ok(None) => break,
                    Err(err) => {
                        out.push(format!("skip failed: {err}"));
                        break;
                    }
                }
            }
        }
    }
    out
}

fn tokenizer(data: &[u8]) {
    if data.len() < HEADER {
        return;
    }
    let capacity = 2 + usize::from(data[0] & 0x3f);
    let seed = u32::from_le_bytes(data[1..5].try_into().unwrap());
    let input = &data[HEADER..];

    let expected = tokenize(input, 1 << 16);
    let actual = tokenize(SplitReader { data: input, seed }, capacity);
    assert_eq!(actual, expected, "capacity {capacity}");

    // Arbitrary tables must fail cleanly, never panic.
    let mut u = Unstructured::new(input);
    if let Ok(text) = <&str>::arbitrary(&mut u) {
        let _ = ParserTables::parse(text);
    }
}

fuzz_target!(|data: &[u8]| tokenizer(data));
