//! Streaming, table-driven tokenizer for log compression front-ends.
//!
//! Raw log bytes flow through a [`StreamReader`], which buffers them in a
//! growable ring ([`ScanBuffer`]) and refills it half a block at a time
//! without ever overwriting uncommitted data. A [`TableParser`] classifies
//! each record with precompiled instruction tables ([`ParserTables`]) and
//! cuts it into zero-copy [`Token`] spans: leading metadata, static text and
//! variable fields. [`RecordTokenizer`] ties both to a byte source, and
//! [`ir`] frames tokens for the downstream encoder.
//!
//! ```rust
//! use logscan::{ParserOptions, ParserTables, ReaderOptions, RecordTokenizer, TableParser};
//!
//! let tables = ParserTables::parse(
//!     ".metadata 1 10000111 \
//!      .type 1 0100010100000000 1 0100000000000000 \
//!      .variables 1 1 1010000000000000",
//! )
//! .unwrap();
//! let parser = TableParser::new(tables, ParserOptions::default());
//! let input: &[u8] = b"1234567 ERROR disk full\n1234568 ERROR disk fuller\n";
//!
//! let mut records = RecordTokenizer::new(input, parser, ReaderOptions::default());
//! let mut lines = Vec::new();
//! records
//!     .for_each_record(|record| {
//!         let fields = record.to_owned_fields()?;
//!         lines.push(fields[1].1.to_string());
//!         Ok::<_, logscan::TokenizeError>(())
//!     })
//!     .unwrap();
//! assert_eq!(lines, ["ERROR disk full", "ERROR disk fuller"]);
//! ```

#![allow(missing_docs)]
extern crate alloc;

mod error;
mod options;
mod parser;
mod pipeline;
mod reader;
mod scan;
mod scan_buffer;
mod split;
mod token;

pub mod ir;


pub use error::{EncodeError, ReaderError, ScanError, TokenizeError};
pub use options::ReaderOptions;
pub use parser::{
    ControlWord, Decision, DecisionNode, EntryAction, EntryWord, LEARNER_STATE_FILE,
    MetadataInstruction, MetadataWord, PARSER_STATE_FILE, ParseError, ParsedRecord, ParserOptions,
    ParserTables, Phase, RecordError, ScanMode, SubFieldInstruction, TableCorruption,
    TableLoadError, TableParser, VariableInstruction, VariableWord,
};
pub use pipeline::{RecordTokenizer, RecordView};
pub use reader::{Half, NextByte, SkipObserver, StreamReader};
pub use scan::{BracketScan, ByteClass, SCAN_CHUNK, is_readable, scan_bracket_aware, scan_whitespace};
pub use scan_buffer::{DEFAULT_INLINE_CAPACITY, ScanBuffer};
pub use split::{MessagePart, PLACEHOLDER, PartKind, SplitMessage};
pub use token::{FieldTag, Token, TokenView};
