//! Driving a [`StreamReader`] and a [`TableParser`] over a byte source.
//!
//! Each record is parsed speculatively from the commit point. When the parse
//! runs out of buffered input the reader is rewound, refilled (growing first
//! if the refill would overwrite the record being parsed) and the record is
//! tried again. A parsed record is handed to the caller as a [`RecordView`]
//! and committed afterwards, which frees its bytes for later refills.

use alloc::vec::Vec;
use core::{fmt, mem};
use std::io::Read;

use bstr::BString;

use crate::{
    error::{ReaderError, TokenizeError},
    ir,
    options::ReaderOptions,
    parser::{ParsedRecord, TableParser},
    reader::StreamReader,
    token::{FieldTag, Token, TokenView},
};

/// A parsed record, valid while the callback receiving it runs.
#[derive(Clone, Copy)]
pub struct RecordView<'r> {
    reader: &'r StreamReader,
    record: &'r ParsedRecord,
}

impl<'r> RecordView<'r> {
    #[must_use]
    pub fn type_id(&self) -> u16 {
        self.record.type_id
    }

    /// Stream offset of the first byte of the record.
    #[must_use]
    pub fn start(&self) -> u64 {
        self.record.start
    }

    #[must_use]
    pub fn tokens(&self) -> &'r [Token] {
        &self.record.tokens
    }

    /// Resolves every token of the record, in input order.
    pub fn fields(&self) -> impl Iterator<Item = Result<TokenView<'r>, ReaderError>> + 'r {
        let reader = self.reader;
        self.record.tokens.iter().map(move |token| reader.view(token))
    }

    /// Copies every field out of the buffer.
    ///
    /// # Errors
    ///
    /// Fails if a token can no longer be resolved.
    pub fn to_owned_fields(&self) -> Result<Vec<(FieldTag, BString)>, ReaderError> {
        self.fields()
            .map(|view| view.map(|view| (view.token().tag(), view.materialize())))
            .collect()
    }

    /// Appends one IR string frame per field. On failure `out` is left as it
    /// was.
    ///
    /// # Errors
    ///
    /// Token resolution and framing errors.
    pub fn encode(&self, out: &mut Vec<u8>) -> Result<(), TokenizeError> {
        let mark = out.len();
        let result = self.fields().try_for_each(|view| {
            ir::encode_token(&view?, out)?;
            Ok::<_, TokenizeError>(())
        });
        if result.is_err() {
            out.truncate(mark);
        }
        result
    }
}

impl fmt::Debug for RecordView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordView")
            .field("type_id", &self.record.type_id)
            .field("start", &self.record.start)
            .field("fields", &self.to_owned_fields())
            .finish()
    }
}

/// Splits a byte source into parsed records.
///
/// Records are separated by newlines; runs of empty lines are skipped.
///
/// # Examples
///
/// ```rust
/// use logscan::{ParserOptions, ParserTables, ReaderOptions, RecordTokenizer, TableParser};
///
/// let tables = ParserTables::parse(
///     ".metadata 1 10000111 \
///      .type 1 0100010100000000 1 0100000000000000 \
///      .variables 1 1 1010000000000000",
/// )
/// .unwrap();
/// let parser = TableParser::new(tables, ParserOptions::default());
/// let input: &[u8] = b"1234567 ERROR connection failed\n";
/// let mut records = RecordTokenizer::new(input, parser, ReaderOptions::default());
///
/// let fields = records
///     .next_record(|record| record.to_owned_fields().unwrap())
///     .unwrap()
///     .unwrap();
/// assert_eq!(fields[0].1, "1234567");
/// assert_eq!(fields[1].1, "ERROR connection failed");
/// assert!(records.next_record(|_| ()).unwrap().is_none());
/// ```
pub struct RecordTokenizer<R> {
    source: R,
    reader: StreamReader,
    parser: TableParser,
    records: u64,
}

impl<R: fmt::Debug> fmt::Debug for RecordTokenizer<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordTokenizer")
            .field("source", &self.source)
            .field("reader", &self.reader)
            .field("records", &self.records)
            .finish_non_exhaustive()
    }
}

impl<R: Read> RecordTokenizer<R> {
    pub fn new(source: R, parser: TableParser, options: ReaderOptions) -> Self {
        Self {
            source,
            reader: StreamReader::new(options),
            parser,
            records: 0,
        }
    }

    #[must_use]
    pub fn reader(&self) -> &StreamReader {
        &self.reader
    }

    #[must_use]
    pub fn parser(&self) -> &TableParser {
        &self.parser
    }

    /// Records delivered since construction or the last reset.
    #[must_use]
    pub fn records(&self) -> u64 {
        self.records
    }

    /// Switches to an unrelated source, returning the previous one. The
    /// reader is reset, releasing any grown buffer blocks.
    pub fn reset(&mut self, source: R) -> R {
        self.reader.reset();
        self.records = 0;
        mem::replace(&mut self.source, source)
    }

    pub fn into_inner(self) -> R {
        self.source
    }

    /// Brings more input into the reader, growing the buffer when the
    /// uncommitted record occupies the half that would be refilled.
    fn fill(&mut self) -> Result<(), TokenizeError> {
        if !self.reader.read_is_safe() {
            let capacity = self.reader.grow()?;
            tracing::debug!(
                capacity,
                commit_point = self.reader.commit_point(),
                "record outgrew the reader buffer"
            );
        }
        self.reader.refill(&mut self.source)?;
        Ok(())
    }

    /// Skips record separators. Returns `false` once the input is exhausted.
    fn skip_separators(&mut self) -> Result<bool, TokenizeError> {
        loop {
            match self.reader.peek(0) {
                Some(b'\n') => {
                    self.reader.skip(1)?;
                    self.reader.commit();
                }
                Some(_) => return Ok(true),
                None if self.reader.end_of_input() => return Ok(false),
                None => self.fill()?,
            }
        }
    }

    /// Parses the next record and hands it to `f`. Returns `None` at end of
    /// input.
    ///
    /// # Errors
    ///
    /// Parse failures that more input cannot cure, and I/O errors. The
    /// reader is rewound to the start of the failing record, so the caller
    /// may hand it to another parser or drop it with
    /// [`skip_line`](Self::skip_line).
    pub fn next_record<T>(
        &mut self,
        f: impl FnOnce(RecordView<'_>) -> T,
    ) -> Result<Option<T>, TokenizeError> {
        loop {
            if !self.skip_separators()? {
                return Ok(None);
            }
            match self.parser.parse_record(&mut self.reader) {
                Ok(record) => {
                    let out = f(RecordView {
                        reader: &self.reader,
                        record: &record,
                    });
                    self.reader.commit();
                    self.records += 1;
                    return Ok(Some(out));
                }
                Err(err) if err.is_starved() && !self.reader.end_of_input() => {
                    tracing::trace!(
                        commit_point = self.reader.commit_point(),
                        phase = %err.phase(),
                        "record needs more input"
                    );
                    self.reader.rewind();
                    self.fill()?;
                }
                Err(err) => {
                    self.reader.rewind();
                    return Err(err.into());
                }
            }
        }
    }

    /// Calls `f` for every remaining record and returns how many were
    /// delivered. Stops at the first error, from parsing or from `f`.
    ///
    /// # Errors
    ///
    /// Everything [`next_record`](Self::next_record) returns, and whatever
    /// `f` returns.
    pub fn for_each_record<F, E>(&mut self, mut f: F) -> Result<u64, E>
    where
        F: FnMut(RecordView<'_>) -> Result<(), E>,
        E: From<TokenizeError>,
    {
        let mut delivered = 0;
        while let Some(result) = self.next_record(&mut f)? {
            result?;
            delivered += 1;
        }
        Ok(delivered)
    }

    /// Drops everything up to and including the next newline, for records
    /// the table parser rejected. Returns the dropped line without its
    /// newline, or `None` at end of input.
    ///
    /// # Errors
    ///
    /// I/O and buffer errors.
    pub fn skip_line(&mut self) -> Result<Option<BString>, TokenizeError> {
        loop {
            if self.reader.is_drained() && self.reader.end_of_input() {
                return Ok(None);
            }
            match self.reader.read_until_newline() {
                Ok(token) => {
                    let line = self.reader.view(&token)?.materialize();
                    if self.reader.peek(0).is_some() {
                        self.reader.skip(1)?;
                    }
                    self.reader.commit();
                    tracing::debug!(len = line.len(), "skipped unparsed line");
                    return Ok(Some(line));
                }
                Err(err) if err.is_starved() => {
                    self.reader.rewind();
                    self.fill()?;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
}
