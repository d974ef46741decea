#![expect(missing_docs)]
#![expect(clippy::needless_raw_string_hashes)]

use core::fmt::Write;

use bstr::ByteSlice;
use logscan::{
    ParserOptions, ParserTables, ReaderOptions, RecordTokenizer, SplitMessage, TableParser,
    TokenizeError,
};

/// `HH:MM:SS` timestamp, then the level picked by bits 2..=4 of its first
/// letter: `E` error, `I` info, `W` warning.
const TABLES: &str = r#"
.metadata 1
10001000
.type 1
1001110000000000 8
1100000000000000
0100000000000000
0100000000000001
1100000000000000
1100000000000000
0100000000000010
1100000000000000
1100000000000000
.variables 3
1
1010000000000000
5
0100000000000100
0000000000000001
1001000000000000
0000000000000001
1010000000000000
5
0100000000000100
0000000000000001
1000000000000000
0000000000000001
1010000000000000
"#;

const LOG: &str = "\
12:00:01 INFO login user=alice from 10.0.0.7
12:00:02 WARN disk /var at 91%

12:00:03 ERROR timeout after 30s
";

fn render(input: &[u8], capacity: usize) -> String {
    let parser = TableParser::new(ParserTables::parse(TABLES).unwrap(), ParserOptions::default());
    let mut records = RecordTokenizer::new(
        input,
        parser,
        ReaderOptions {
            inline_capacity: capacity,
        },
    );
    let mut out = String::new();
    records
        .for_each_record(|record| {
            write!(out, "type {} @{}:", record.type_id(), record.start()).unwrap();
            for (i, (tag, text)) in record.to_owned_fields()?.into_iter().enumerate() {
                let sep = if i == 0 { " " } else { " | " };
                write!(out, "{sep}{tag:?} {:?}", text.to_str_lossy()).unwrap();
            }
            out.push('\n');
            Ok::<_, TokenizeError>(())
        })
        .unwrap();
    out
}

#[test]
fn snapshot_records() {
    insta::assert_snapshot!(render(LOG.as_bytes(), 60_000), @r#"
    type 1 @0: Metadata "12:00:01" | Variable "INFO" | Variable "login" | Variable "user=alice from 10.0.0.7"
    type 2 @45: Metadata "12:00:02" | Variable "WARN" | Variable "disk" | Variable "/var at 91%"
    type 0 @77: Metadata "12:00:03" | Variable "ERROR timeout after 30s"
    "#);
}

#[test]
fn small_buffer_matches_large_buffer() {
    let large = render(LOG.as_bytes(), 60_000);
    for capacity in [2, 6, 10, 32] {
        assert_eq!(render(LOG.as_bytes(), capacity), large, "capacity {capacity}");
    }
}

#[test]
fn snapshot_templates() {
    let mut out = String::new();
    for line in LOG.lines().filter(|line| !line.is_empty()) {
        let mut msg = SplitMessage::new(line.as_bytes());
        assert!(msg.mark_metadata(0) && msg.mark_metadata(1));
        writeln!(out, "{}", msg.template()).unwrap();
    }
    insta::assert_snapshot!(out, @r#"
    INFO login <*> from <*>
    WARN disk <*> at <*>
    ERROR timeout after <*>
    "#);
}

#[test]
fn tables_survive_a_serialization_round_trip() {
    let tables = ParserTables::parse(TABLES).unwrap();
    let text = tables.to_string();
    assert_eq!(text.trim(), TABLES.trim());
    assert_eq!(ParserTables::parse(&text).unwrap(), tables);
}
