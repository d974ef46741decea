//! Instruction tables and their text resource format.
//!
//! ```text
//! .metadata <count>
//! <8-bit word>...
//! .type <count>
//! <16-bit control word> <entry count> <16-bit entry>...   (per node)
//! .variables <count>
//! <word count> <16-bit word>...                           (per record type)
//! ```
//!
//! Words are written in binary, counts in decimal, and any whitespace
//! separates tokens.

use alloc::{string::ToString, vec::Vec};
use core::{fmt, str::SplitAsciiWhitespace};
use std::{fs, path::Path};

use super::{
    error::TableLoadError,
    instruction::{ControlWord, EntryWord, MetadataWord, VariableWord},
};

const METADATA_MARKER: &str = ".metadata";
const TYPE_MARKER: &str = ".type";
const VARIABLES_MARKER: &str = ".variables";

/// One node of the type-decision table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecisionNode {
    pub control: ControlWord,
    pub entries: Vec<EntryWord>,
}

impl DecisionNode {
    pub fn new(control: impl Into<ControlWord>, entries: impl IntoIterator<Item = EntryWord>) -> Self {
        Self {
            control: control.into(),
            entries: entries.into_iter().collect(),
        }
    }
}

/// The three immutable tables driving a [`TableParser`](crate::TableParser).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParserTables {
    pub metadata: Vec<MetadataWord>,
    pub types: Vec<DecisionNode>,
    /// Variable programs indexed by record type id.
    pub variables: Vec<Vec<VariableWord>>,
}

struct Words<'a> {
    inner: SplitAsciiWhitespace<'a>,
}

impl<'a> Words<'a> {
    fn next(&mut self, context: &'static str) -> Result<&'a str, TableLoadError> {
        self.inner.next().ok_or(TableLoadError::MissingToken { context })
    }

    fn marker(&mut self, expected: &'static str) -> Result<usize, TableLoadError> {
        let found = self.next(expected)?;
        if found != expected {
            return Err(TableLoadError::UnexpectedMarker {
                expected,
                found: found.to_string(),
            });
        }
        self.count(expected)
    }

    fn count(&mut self, context: &'static str) -> Result<usize, TableLoadError> {
        let found = self.next(context)?;
        found.parse().map_err(|_| TableLoadError::InvalidCount {
            context,
            found: found.to_string(),
        })
    }

    fn word8(&mut self, context: &'static str) -> Result<u8, TableLoadError> {
        let found = self.next(context)?;
        u8::from_str_radix(found, 2).map_err(|_| TableLoadError::InvalidWord {
            bits: u8::BITS,
            found: found.to_string(),
        })
    }

    fn word16(&mut self, context: &'static str) -> Result<u16, TableLoadError> {
        let found = self.next(context)?;
        u16::from_str_radix(found, 2).map_err(|_| TableLoadError::InvalidWord {
            bits: u16::BITS,
            found: found.to_string(),
        })
    }
}

impl ParserTables {
    /// Parses the text resource format.
    ///
    /// # Errors
    ///
    /// Fails on a wrong section marker, a malformed count or word, missing
    /// tokens, or content after the variables section.
    pub fn parse(text: &str) -> Result<Self, TableLoadError> {
        let mut words = Words {
            inner: text.split_ascii_whitespace(),
        };

        let count = words.marker(METADATA_MARKER)?;
        let metadata = (0..count)
            .map(|_| words.word8("metadata word").map(MetadataWord))
            .collect::<Result<Vec<_>, _>>()?;

        let count = words.marker(TYPE_MARKER)?;
        let mut types = Vec::new();
        for _ in 0..count {
            let control = ControlWord(words.word16("control word")?);
            let len = words.count("decision entries")?;
            let entries = (0..len)
                .map(|_| words.word16("decision entry").map(EntryWord))
                .collect::<Result<Vec<_>, _>>()?;
            types.push(DecisionNode { control, entries });
        }

        let count = words.marker(VARIABLES_MARKER)?;
        let mut variables = Vec::new();
        for _ in 0..count {
            let len = words.count("variable program")?;
            let program = (0..len)
                .map(|_| words.word16("variable word").map(VariableWord))
                .collect::<Result<Vec<_>, _>>()?;
            variables.push(program);
        }

        if let Some(extra) = words.inner.next() {
            return Err(TableLoadError::TrailingContent(extra.to_string()));
        }

        Ok(Self {
            metadata,
            types,
            variables,
        })
    }

    /// Reads and parses a table file.
    ///
    /// # Errors
    ///
    /// I/O failures and everything [`parse`](Self::parse) rejects.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TableLoadError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| TableLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let tables = Self::parse(&text)?;
        tracing::debug!(
            path = %path.display(),
            metadata = tables.metadata.len(),
            types = tables.types.len(),
            variables = tables.variables.len(),
            "loaded parser tables"
        );
        Ok(tables)
    }
}

/// Writes the text resource format. Parsing the output yields the same
/// words.
impl fmt::Display for ParserTables {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{METADATA_MARKER} {}", self.metadata.len())?;
        for word in &self.metadata {
            writeln!(f, "{:08b}", word.0)?;
        }

        writeln!(f, "{TYPE_MARKER} {}", self.types.len())?;
        for node in &self.types {
            writeln!(f, "{:016b} {}", node.control.0, node.entries.len())?;
            for entry in &node.entries {
                writeln!(f, "{:016b}", entry.0)?;
            }
        }

        writeln!(f, "{VARIABLES_MARKER} {}", self.variables.len())?;
        for program in &self.variables {
            writeln!(f, "{}", program.len())?;
            for word in program {
                writeln!(f, "{:016b}", word.0)?;
            }
        }
        Ok(())
    }
}
