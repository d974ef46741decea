//! Table-driven record parser.
//!
//! Overview
//! - A [`TableParser`] turns one record of a [`StreamReader`] into an ordered
//!   list of [`Token`]s. It runs four phases in order: metadata, type
//!   detection, variable extraction and validation. Nothing within a record
//!   is backtracked; retrying a record is the caller's business.
//! - The parser never commits. It only moves the reader's working position,
//!   so a failure at any point leaves the commit point where the caller put
//!   it. After a successful parse the caller consumes the tokens, then calls
//!   [`StreamReader::commit`].
//! - All behaviour comes from the three [`ParserTables`], which are compiled
//!   elsewhere and treated as trusted: contradictions inside them surface as
//!   [`ParseError::TableCorrupt`], which is never recoverable.
//!
//! Type detection
//! - The walk starts at decision node 0. Each node computes an index from a
//!   byte ahead of the working position (compare or bit-extract), and the
//!   indexed entry jumps to another node, reports the record type, or skips
//!   a few bytes and reads the next token before looking again. Reaching an
//!   unused slot means the tables are corrupt.
//! - A node whose extract mask is zero runs its entries as sub-field
//!   instructions instead, then continues at the node named in its control
//!   word after reading the next token.
//! - A walk that revisits as many nodes as the table has without consuming a
//!   byte cannot terminate and is reported as [`TableCorruption::Cycle`].

mod error;
mod instruction;
mod options;
mod tables;

use alloc::vec::Vec;
use std::path::{Path, PathBuf};

pub use error::{ParseError, Phase, RecordError, TableCorruption, TableLoadError};
use instruction::extract_bits;
pub use instruction::{
    ControlWord, Decision, EntryAction, EntryWord, MetadataInstruction, MetadataWord, ScanMode,
    SubFieldInstruction, VariableInstruction, VariableWord,
};
pub use options::ParserOptions;
pub use tables::{DecisionNode, ParserTables};

use crate::{
    error::ReaderError,
    reader::StreamReader,
    token::{FieldTag, Token},
};

/// File holding the parser tables inside a state directory.
pub const PARSER_STATE_FILE: &str = "parser_state.txt";
/// File reserved for the fallback parser inside a state directory.
pub const LEARNER_STATE_FILE: &str = "learner_state.txt";

/// The tokens of one successfully parsed record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRecord {
    /// Detected record type, an index into the variable tables.
    pub type_id: u16,
    /// Stream offset of the first byte of the record.
    pub start: u64,
    /// Metadata, static and variable fields in input order.
    pub tokens: Vec<Token>,
}

impl ParsedRecord {
    pub fn fields(&self, tag: FieldTag) -> impl Iterator<Item = &Token> {
        self.tokens.iter().filter(move |token| token.tag() == tag)
    }
}

enum Failure {
    Corrupt(TableCorruption),
    Record(RecordError),
}

impl From<TableCorruption> for Failure {
    fn from(err: TableCorruption) -> Self {
        Self::Corrupt(err)
    }
}

impl From<ReaderError> for Failure {
    fn from(err: ReaderError) -> Self {
        Self::Record(RecordError::Reader(err))
    }
}

#[derive(Debug, Clone)]
pub struct TableParser {
    tables: ParserTables,
    options: ParserOptions,
    learner_state: Option<PathBuf>,
}

impl TableParser {
    #[must_use]
    pub fn new(tables: ParserTables, options: ParserOptions) -> Self {
        Self {
            tables,
            options,
            learner_state: None,
        }
    }

    /// Loads the tables from `dir/parser_state.txt`. A `learner_state.txt`
    /// next to it is remembered but not read.
    ///
    /// # Errors
    ///
    /// [`TableLoadError::MissingStateFile`] when the parser state is absent,
    /// and every error of [`ParserTables::load`].
    pub fn from_state_dir(dir: impl AsRef<Path>) -> Result<Self, TableLoadError> {
        let dir = dir.as_ref();
        let parser_state = dir.join(PARSER_STATE_FILE);
        if !parser_state.is_file() {
            return Err(TableLoadError::MissingStateFile(parser_state));
        }
        let tables = ParserTables::load(&parser_state)?;

        let learner_state = Some(dir.join(LEARNER_STATE_FILE)).filter(|path| path.is_file());
        if let Some(path) = &learner_state {
            tracing::debug!(path = %path.display(), "found learner state");
        }

        Ok(Self {
            tables,
            options: ParserOptions::default(),
            learner_state,
        })
    }

    #[must_use]
    pub fn with_options(mut self, options: ParserOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn tables(&self) -> &ParserTables {
        &self.tables
    }

    #[must_use]
    pub fn options(&self) -> ParserOptions {
        self.options
    }

    /// Location of the fallback parser's state, if the state directory had
    /// one.
    #[must_use]
    pub fn learner_state(&self) -> Option<&Path> {
        self.learner_state.as_deref()
    }

    /// Parses one record starting at the reader's working position.
    ///
    /// On success the reader is positioned right after the last field read;
    /// on failure it is left wherever the failing phase stopped. The commit
    /// point is never moved.
    ///
    /// # Errors
    ///
    /// - [`ParseError::TableCorrupt`] when the tables contradict themselves.
    /// - [`ParseError::SpeculativeParseFailed`] (speculative mode) or
    ///   [`ParseError::Record`] when the record does not fit the tables or
    ///   runs past the buffered input. [`ParseError::is_starved`] tells the
    ///   two apart.
    pub fn parse_record(&self, reader: &mut StreamReader) -> Result<ParsedRecord, ParseError> {
        let start = reader.position();
        let mut tokens = Vec::new();

        self.parse_metadata(reader, &mut tokens)
            .map_err(|failure| self.fail(Phase::Metadata, failure))?;
        tracing::trace!(start, fields = tokens.len(), "metadata parsed");

        let type_id = self
            .detect_type(reader, &mut tokens)
            .map_err(|failure| self.fail(Phase::TypeDetection, failure))?;
        tracing::trace!(start, type_id, "record type detected");

        self.parse_variables(reader, type_id, &mut tokens)
            .map_err(|failure| self.fail(Phase::VariableExtraction, failure))?;
        tracing::trace!(start, fields = tokens.len(), "variables parsed");

        let record = ParsedRecord {
            type_id,
            start,
            tokens,
        };
        Self::validate(&record);
        Ok(record)
    }

    fn fail(&self, phase: Phase, failure: Failure) -> ParseError {
        match failure {
            Failure::Corrupt(source) => {
                tracing::error!(%phase, error = %source, "parser tables are corrupt");
                ParseError::TableCorrupt { phase, source }
            }
            Failure::Record(source) => {
                tracing::trace!(%phase, error = %source, speculative = self.options.speculative, "record parse failed");
                if self.options.speculative {
                    ParseError::SpeculativeParseFailed { phase, source }
                } else {
                    ParseError::Record { phase, source }
                }
            }
        }
    }

    fn parse_metadata(&self, reader: &mut StreamReader, tokens: &mut Vec<Token>) -> Result<(), Failure> {
        for word in &self.tables.metadata {
            let token = match word.decode() {
                MetadataInstruction::FixedWidth(width) => reader.read_fixed(usize::from(width))?,
                MetadataInstruction::Token => reader.read_token()?,
            };
            tokens.push(token.with_tag(FieldTag::Metadata));
            reader.skip(1)?;
        }
        Ok(())
    }

    fn detect_type(&self, reader: &mut StreamReader, tokens: &mut Vec<Token>) -> Result<u16, Failure> {
        let mut table = 0usize;
        let mut hops = 0usize;
        let mut progress = reader.position();

        loop {
            let node = self
                .tables
                .types
                .get(table)
                .ok_or(TableCorruption::MissingTable(table))?;

            if reader.position() != progress {
                progress = reader.position();
                hops = 0;
            }
            hops += 1;
            if hops > self.tables.types.len() {
                return Err(TableCorruption::Cycle(table).into());
            }

            let index = match node.control.decode() {
                Decision::Compare { offset, value } => {
                    i32::from(peek(reader, offset)?) - i32::from(value)
                }
                Decision::Extract { offset, mask } => {
                    i32::from(extract_bits(peek(reader, offset)?, mask))
                }
                Decision::SubFields { next_table } => {
                    Self::parse_sub_fields(reader, node, tokens)?;
                    table = usize::from(next_table);
                    tokens.push(reader.read_token()?.with_tag(FieldTag::Static));
                    continue;
                }
            };

            let slot = usize::try_from(index)
                .ok()
                .filter(|&slot| slot < node.entries.len())
                .ok_or(TableCorruption::EntryOutOfRange {
                    table,
                    index,
                    len: node.entries.len(),
                })?;

            match node.entries[slot].decode()? {
                EntryAction::GotoTable(next) => table = usize::from(next),
                EntryAction::FoundType(type_id) => return Ok(type_id),
                EntryAction::NextToken(skip) => {
                    reader.skip(usize::from(skip))?;
                    tokens.push(reader.read_token()?.with_tag(FieldTag::Static));
                }
            }
        }
    }

    fn parse_sub_fields(
        reader: &mut StreamReader,
        node: &DecisionNode,
        tokens: &mut Vec<Token>,
    ) -> Result<(), Failure> {
        for entry in &node.entries {
            match entry.sub_field() {
                SubFieldInstruction::Skip(n) => reader.skip(usize::from(n))?,
                SubFieldInstruction::Read(n) => {
                    tokens.push(reader.read_fixed(usize::from(n))?.with_tag(FieldTag::Variable));
                }
            }
        }
        Ok(())
    }

    fn parse_variables(
        &self,
        reader: &mut StreamReader,
        type_id: u16,
        tokens: &mut Vec<Token>,
    ) -> Result<(), Failure> {
        let program = self
            .tables
            .variables
            .get(usize::from(type_id))
            .ok_or(TableCorruption::UnknownType(type_id))?;

        for word in program {
            let token = match word.decode()? {
                VariableInstruction::Skip(n) => {
                    reader.skip(usize::from(n))?;
                    continue;
                }
                VariableInstruction::Read(n) => reader.read_fixed(usize::from(n))?,
                VariableInstruction::Scan(ScanMode::Alphabetic) => reader.read_alphabetic()?,
                VariableInstruction::Scan(ScanMode::UntilSpace) => reader.read_until_space()?,
                VariableInstruction::Scan(ScanMode::UntilNewline) => reader.read_until_newline()?,
            };
            tokens.push(token.with_tag(FieldTag::Variable));
        }
        Ok(())
    }

    /// Extension point run after a successful parse. It checks nothing.
    fn validate(record: &ParsedRecord) {
        tracing::trace!(start = record.start, phase = %Phase::Validation, "record accepted");
    }
}

fn peek(reader: &StreamReader, offset: u8) -> Result<u8, ReaderError> {
    let offset = usize::from(offset);
    reader.peek(offset).ok_or_else(|| ReaderError::Starved {
        requested: offset + 1,
        available: reader.available(),
    })
}
