use core::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::error::ReaderError;

/// The phase of [`TableParser::parse_record`](crate::TableParser::parse_record)
/// a failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Metadata,
    TypeDetection,
    VariableExtraction,
    Validation,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::Metadata => "metadata",
            Phase::TypeDetection => "type detection",
            Phase::VariableExtraction => "variable extraction",
            Phase::Validation => "validation",
        })
    }
}

/// Ways a loaded table set can contradict itself.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TableCorruption {
    #[error("decision node {0} does not exist")]
    MissingTable(usize),
    #[error("index {index} is outside the {len} entries of decision node {table}")]
    EntryOutOfRange { table: usize, index: i32, len: usize },
    #[error("invalid decision entry {0:#018b}")]
    InvalidEntry(u16),
    #[error("record type {0} has no variable table")]
    UnknownType(u16),
    #[error("invalid scan mode in variable word {0:#018b}")]
    InvalidScanMode(u16),
    #[error("invalid variable instruction {0:#018b}")]
    InvalidVariableInstruction(u16),
    #[error("decision node {0} was revisited without consuming input")]
    Cycle(usize),
}

/// Failures caused by the record itself rather than by the tables.
#[derive(Error, Debug)]
pub enum RecordError {
    #[error(transparent)]
    Reader(#[from] ReaderError),
}

/// Errors returned by [`TableParser::parse_record`](crate::TableParser::parse_record).
#[derive(Error, Debug)]
pub enum ParseError {
    /// The tables are internally inconsistent; parsing cannot continue with
    /// this table set.
    #[error("parser tables are corrupt ({phase} phase): {source}")]
    TableCorrupt {
        phase: Phase,
        source: TableCorruption,
    },
    /// A speculative attempt failed. The commit point is untouched; rewind
    /// the reader and retry or fall back.
    #[error("speculative parse failed in {phase} phase: {source}")]
    SpeculativeParseFailed { phase: Phase, source: RecordError },
    #[error("record rejected in {phase} phase: {source}")]
    Record { phase: Phase, source: RecordError },
}

impl ParseError {
    /// Whether the caller may rewind and retry the record.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::SpeculativeParseFailed { .. })
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        match self {
            Self::TableCorrupt { phase, .. }
            | Self::SpeculativeParseFailed { phase, .. }
            | Self::Record { phase, .. } => *phase,
        }
    }

    /// Whether the record ran into the end of the buffered input, so that a
    /// retry after a refill may succeed.
    #[must_use]
    pub fn is_starved(&self) -> bool {
        match self {
            Self::SpeculativeParseFailed { source, .. } | Self::Record { source, .. } => {
                matches!(source, RecordError::Reader(err) if err.is_starved())
            }
            Self::TableCorrupt { .. } => false,
        }
    }
}

/// Errors raised while reading table resources.
#[derive(Error, Debug)]
pub enum TableLoadError {
    #[error("expected section marker `{expected}`, found `{found}`")]
    UnexpectedMarker {
        expected: &'static str,
        found: String,
    },
    #[error("unexpected end of table text while reading {context}")]
    MissingToken { context: &'static str },
    #[error("invalid count `{found}` for {context}")]
    InvalidCount {
        context: &'static str,
        found: String,
    },
    #[error("invalid {bits}-bit binary word `{found}`")]
    InvalidWord { bits: u32, found: String },
    #[error("trailing content after the last section: `{0}`")]
    TrailingContent(String),
    #[error("parser state file {} not found", .0.display())]
    MissingStateFile(PathBuf),
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}
