//! Bit-packed table words and their decoded forms.
//!
//! Tables keep the raw words they were loaded from so that serialisation is
//! bit-exact; the parser decodes each word into a tagged instruction as it
//! executes it.
//!
//! Layouts
//! ```text
//! metadata (8 bit)      1www_wwww  read fixed width w, skip one delimiter
//!                       0xxx_xxxx  read bracket-aware token, skip one delimiter
//! control  (16 bit)     0vvv_vvvv oooo_oooo  index = byte[o] - v
//!                       1mmm_mmmm oooo_oooo  index = pext(byte[o], m)
//!                       1000_0000 tttt_tttt  extract sub-fields, go to table t
//! entry    (16 bit)     00vv_vvvv vvvv_vvvv  go to table v
//!                       01vv_vvvv vvvv_vvvv  found type v
//!                       10vv_vvvv vvvv_vvvv  skip v bytes, read next token
//!                       11xx_xxxx xxxx_xxxx  unused slot, corrupt if reached
//! sub-field (16 bit)    1vvv_vvvv vvvv_vvvv  skip v bytes
//!                       0vvv_vvvv vvvv_vvvv  read v bytes
//! variable (16 bit)     00vv_vvvv vvvv_vvvv  skip v bytes
//!                       01vv_vvvv vvvv_vvvv  read v bytes
//!                       10ss_xxxx xxxx_xxxx  scan with mode s
//! ```

use super::error::TableCorruption;

/// How the metadata phase reads one leading field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataInstruction {
    /// Read a field of the given width.
    FixedWidth(u8),
    /// Read a bracket-aware token.
    Token,
}

/// A metadata table word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MetadataWord(pub u8);

impl MetadataWord {
    const FIXED_WIDTH: u8 = 1 << 7;

    #[must_use]
    pub fn decode(self) -> MetadataInstruction {
        if self.0 & Self::FIXED_WIDTH == 0 {
            MetadataInstruction::Token
        } else {
            MetadataInstruction::FixedWidth(self.0 & !Self::FIXED_WIDTH)
        }
    }
}

impl From<MetadataInstruction> for MetadataWord {
    fn from(instruction: MetadataInstruction) -> Self {
        match instruction {
            MetadataInstruction::FixedWidth(width) => {
                debug_assert!(width < 0x80, "fixed width {width} does not fit seven bits");
                MetadataWord(MetadataWord::FIXED_WIDTH | (width & 0x7f))
            }
            MetadataInstruction::Token => MetadataWord(0),
        }
    }
}

/// How a decision node derives the index into its entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// `byte[offset] - value`.
    Compare { offset: u8, value: u8 },
    /// The bits of `byte[offset]` selected by `mask`, packed towards bit 0.
    Extract { offset: u8, mask: u8 },
    /// Run the node's entries as sub-field instructions, continue at
    /// `next_table` and read the next token.
    SubFields { next_table: u8 },
}

/// A decision node's control word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ControlWord(pub u16);

impl ControlWord {
    const EXTRACT: u16 = 1 << 15;
    const OFFSET_MASK: u16 = 0x00ff;
    const VALUE_MASK: u16 = 0x7f00;

    #[must_use]
    #[expect(clippy::cast_possible_truncation)]
    pub fn decode(self) -> Decision {
        let offset = (self.0 & Self::OFFSET_MASK) as u8;
        let value = ((self.0 & Self::VALUE_MASK) >> 8) as u8;
        match (self.0 & Self::EXTRACT != 0, value) {
            (false, value) => Decision::Compare { offset, value },
            (true, 0) => Decision::SubFields { next_table: offset },
            (true, mask) => Decision::Extract { offset, mask },
        }
    }
}

impl From<Decision> for ControlWord {
    fn from(decision: Decision) -> Self {
        let (extract, value, offset) = match decision {
            Decision::Compare { offset, value } => (0, value, offset),
            Decision::Extract { offset, mask } => (ControlWord::EXTRACT, mask, offset),
            Decision::SubFields { next_table } => (ControlWord::EXTRACT, 0, next_table),
        };
        ControlWord(extract | ((u16::from(value) << 8) & ControlWord::VALUE_MASK) | u16::from(offset))
    }
}

/// What a decision entry tells the type-detection walk to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryAction {
    GotoTable(u16),
    FoundType(u16),
    /// Skip this many bytes, read the next token and stay at the same table.
    NextToken(u16),
}

/// A decision entry word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryWord(pub u16);

const TAG_SHIFT: u16 = 14;
const VALUE_14: u16 = 0x3fff;

impl EntryWord {
    /// Filler for slots no record can reach.
    pub const UNUSED: EntryWord = EntryWord(0b11 << TAG_SHIFT);

    /// # Errors
    ///
    /// Fails for the unused tag.
    pub fn decode(self) -> Result<EntryAction, TableCorruption> {
        let value = self.0 & VALUE_14;
        match self.0 >> TAG_SHIFT {
            0b00 => Ok(EntryAction::GotoTable(value)),
            0b01 => Ok(EntryAction::FoundType(value)),
            0b10 => Ok(EntryAction::NextToken(value)),
            _ => Err(TableCorruption::InvalidEntry(self.0)),
        }
    }

    /// The same word read as a sub-field instruction.
    #[must_use]
    pub fn sub_field(self) -> SubFieldInstruction {
        let value = self.0 & 0x7fff;
        if self.0 & (1 << 15) == 0 {
            SubFieldInstruction::Read(value)
        } else {
            SubFieldInstruction::Skip(value)
        }
    }
}

impl From<EntryAction> for EntryWord {
    fn from(action: EntryAction) -> Self {
        let (tag, value) = match action {
            EntryAction::GotoTable(v) => (0b00, v),
            EntryAction::FoundType(v) => (0b01, v),
            EntryAction::NextToken(v) => (0b10, v),
        };
        EntryWord((tag << TAG_SHIFT) | (value & VALUE_14))
    }
}

/// Entries of a sub-field node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubFieldInstruction {
    Skip(u16),
    Read(u16),
}

impl From<SubFieldInstruction> for EntryWord {
    fn from(instruction: SubFieldInstruction) -> Self {
        match instruction {
            SubFieldInstruction::Skip(v) => EntryWord((1 << 15) | (v & 0x7fff)),
            SubFieldInstruction::Read(v) => EntryWord(v & 0x7fff),
        }
    }
}

/// Scan strategies for variable fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    /// A run of ASCII letters.
    Alphabetic,
    UntilSpace,
    UntilNewline,
}

/// One step of a record type's variable table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableInstruction {
    Skip(u16),
    Read(u16),
    Scan(ScanMode),
}

/// A variable table word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VariableWord(pub u16);

impl VariableWord {
    const SCAN_SHIFT: u16 = 12;

    /// # Errors
    ///
    /// Fails for the unused top tag and the unused scan mode.
    pub fn decode(self) -> Result<VariableInstruction, TableCorruption> {
        let value = self.0 & VALUE_14;
        match self.0 >> TAG_SHIFT {
            0b00 => Ok(VariableInstruction::Skip(value)),
            0b01 => Ok(VariableInstruction::Read(value)),
            0b10 => match (self.0 >> Self::SCAN_SHIFT) & 0b11 {
                0b00 => Ok(VariableInstruction::Scan(ScanMode::Alphabetic)),
                0b01 => Ok(VariableInstruction::Scan(ScanMode::UntilSpace)),
                0b10 => Ok(VariableInstruction::Scan(ScanMode::UntilNewline)),
                _ => Err(TableCorruption::InvalidScanMode(self.0)),
            },
            _ => Err(TableCorruption::InvalidVariableInstruction(self.0)),
        }
    }
}

impl From<VariableInstruction> for VariableWord {
    fn from(instruction: VariableInstruction) -> Self {
        match instruction {
            VariableInstruction::Skip(v) => VariableWord(v & VALUE_14),
            VariableInstruction::Read(v) => VariableWord((0b01 << TAG_SHIFT) | (v & VALUE_14)),
            VariableInstruction::Scan(mode) => {
                let mode = match mode {
                    ScanMode::Alphabetic => 0b00,
                    ScanMode::UntilSpace => 0b01,
                    ScanMode::UntilNewline => 0b10,
                };
                VariableWord((0b10 << TAG_SHIFT) | (mode << Self::SCAN_SHIFT))
            }
        }
    }
}

/// Parallel bit extract of `value` under `mask`: the selected bits, in order,
/// packed into the low bits of the result.
#[must_use]
pub fn extract_bits(value: u8, mask: u8) -> u8 {
    let mut out = 0u8;
    let mut bit = 0;
    let mut mask = mask;
    while mask != 0 {
        let lowest = mask & mask.wrapping_neg();
        if value & lowest != 0 {
            out |= 1 << bit;
        }
        bit += 1;
        mask &= mask - 1;
    }
    out
}
