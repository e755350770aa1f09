//! Reference implementation for the LRLE mipmap container.
//!
//! LRLE stores a pyramid of 32-bit ARGB bitmaps as a sequence of run-length encoded command
//! streams, one per mip level. Pixels are visited in *block scan order* (4x4 tiles, see
//! [`utils::block_to_scanline`]) so that runs tend to stay inside small, similarly-colored areas.
//!
//! # Header
//!
//! - u32le magic: `LRLE` ([`LRLE_MAGIC`](consts::LRLE_MAGIC))
//! - u32le format tag: [`Format::Legacy`] (`0`) or [`Format::Paletted`] (`842018902`)
//! - u16le width of mip 0
//! - u16le height of mip 0
//! - u32le mip count
//! - u32le offset for every mip, relative to the start of the mip data block
//!
//! Paletted files follow the offset table with a u32le palette length and that many u32le ARGB
//! colors. The mip data block starts right after. Mip `n` is `width >> n` by `height >> n` pixels,
//! and the last mip extends to the end of the stream.
//!
//! # Packed integers
//!
//! Almost every command starts with a [packed integer](packed): little-endian groups of 7 bits,
//! where the high bit of each byte flags a continuation. The lowest bits of the value carry the
//! command tag, so a short run costs a single byte.
//!
//! # Stream format
//!
//! See [consts] for the command types of both formats.

pub mod decode;
pub mod encode;
pub mod packed;
pub mod palette;
pub mod runs;
pub mod utils;

pub use decode::{DecodeError, DecodeOutput, LrleReader, Mip};
pub use encode::{EncodeError, FormatSelection, LrleWriter, WriterConfig};
pub use palette::PaletteBuilder;
pub use runs::{PixelRun, RunGroup};

/// Command stream flavor of an LRLE file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    /// No palette. Colors are inline, implicit zero, or stored as a channel-planar embedded RLE.
    Legacy,
    /// Colors are referenced through a file-wide palette of up to 65535 entries where possible.
    Paletted,
}

impl Format {
    pub const fn tag(self) -> u32 {
        match self {
            Format::Legacy => consts::LRLE_FORMAT_LEGACY,
            Format::Paletted => consts::LRLE_FORMAT_PALETTED,
        }
    }

    pub const fn from_tag(tag: u32) -> Option<Self> {
        match tag {
            consts::LRLE_FORMAT_LEGACY => Some(Format::Legacy),
            consts::LRLE_FORMAT_PALETTED => Some(Format::Paletted),
            _ => None,
        }
    }

    #[inline]
    pub const fn has_palette(self) -> bool {
        matches!(self, Format::Paletted)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderInfo {
    pub format: Format,
    pub width: u16,
    pub height: u16,
    pub mip_count: u32,
}

pub mod consts {
    /// `LRLE` in little-endian ASCII.
    pub const LRLE_MAGIC: u32 = 0x454C_524C;

    pub const LRLE_FORMAT_LEGACY: u32 = 0;
    /// `V002` in little-endian ASCII.
    pub const LRLE_FORMAT_PALETTED: u32 = 842_018_902;

    /// Maximum number of palette entries. Indices must fit a u16.
    pub const MAX_PALETTE_LEN: usize = u16::MAX as usize;

    /// Repeat a single color.
    ///
    /// ```plain
    /// .- PALETTED_OP_REPEAT ------------------------------.
    /// |         Byte[0]         |  Byte[1..n]  | Payload  |
    /// |  7  6  5  4  3  2  1  0 |              |          |
    /// |----+----------+-----+---+--------------+----------|
    /// |  c |  length  | src | 0 |  length cont |  color   |
    /// `---------------------------------------------------`
    /// ```
    ///
    /// - packed integer, start bit 3
    /// - 1-bit tag b0
    /// - 2-bit color source, see [`PALETTED_SRC_BYTE_INDEX`], [`PALETTED_SRC_SHORT_INDEX`] and
    ///   [`PALETTED_SRC_INLINE`]
    /// - run length in the remaining bits
    /// - the color payload follows the packed integer: a u8 or u16le palette index, or a u32le
    ///   ARGB color
    pub const PALETTED_OP_REPEAT: u8 = 0b0;

    /// Emit a number of single pixels.
    ///
    /// ```plain
    /// .- PALETTED_OP_SEQUENCE ----------------------------.
    /// |         Byte[0]         |  Byte[1..n]  | Payload  |
    /// |  7  6  5  4  3  2  1  0 |              |          |
    /// |----+-------------+--+---+--------------+----------|
    /// |  c |    count    |s | 1 |  count cont  | colors   |
    /// `---------------------------------------------------`
    /// ```
    ///
    /// - packed integer, start bit 2
    /// - 1-bit tag b1
    /// - 1-bit color source: [`PALETTED_SEQ_INDEXED`] or [`PALETTED_SEQ_INLINE`]
    /// - pixel count in the remaining bits
    /// - `count` colors follow, each either a packed palette index (start bit 0) or a u32le ARGB
    ///   color
    pub const PALETTED_OP_SEQUENCE: u8 = 0b1;

    pub const PALETTED_REPEAT_START_BIT: u8 = 3;
    pub const PALETTED_SEQUENCE_START_BIT: u8 = 2;

    pub const PALETTED_SRC_BYTE_INDEX: u8 = 1;
    pub const PALETTED_SRC_SHORT_INDEX: u8 = 2;
    pub const PALETTED_SRC_INLINE: u8 = 3;

    pub const PALETTED_SEQ_INDEXED: u8 = 0;
    pub const PALETTED_SEQ_INLINE: u8 = 1;

    /// Repeat fully transparent black (`0x00000000`).
    ///
    /// ```plain
    /// .- LEGACY_OP_BLANK_REPEAT ------------.
    /// |         Byte[0]         | Byte[1..n] |
    /// |  7  6  5  4  3  2  1  0 |            |
    /// |----+--------------+-----+------------|
    /// |  c |    length    | 0 0 | len cont   |
    /// `--------------------------------------`
    /// ```
    pub const LEGACY_OP_BLANK_REPEAT: u8 = 0b00;

    /// Emit up to 63 inline colors.
    ///
    /// ```plain
    /// .- LEGACY_OP_INLINE_SEQUENCE ------------.
    /// |         Byte[0]         | Byte[1..4n]  |
    /// |  7  6  5  4  3  2  1  0 |              |
    /// |-------------------+-----+--------------|
    /// |       count       | 0 1 | u32le colors |
    /// `----------------------------------------`
    /// ```
    ///
    /// The count is *not* a packed integer, bit 7 is part of the count.
    pub const LEGACY_OP_INLINE_SEQUENCE: u8 = 0b01;

    /// Repeat an inline color.
    ///
    /// ```plain
    /// .- LEGACY_OP_INLINE_REPEAT -------------------------.
    /// |         Byte[0]         | Byte[1..n] |  Payload   |
    /// |  7  6  5  4  3  2  1  0 |            |            |
    /// |----+--------------+-----+------------+------------|
    /// |  c |    length    | 1 0 | len cont   | u32le ARGB |
    /// `---------------------------------------------------`
    /// ```
    pub const LEGACY_OP_INLINE_REPEAT: u8 = 0b10;

    /// Emit up to 63 single pixels, stored as four byte planes that are run-length encoded.
    ///
    /// ```plain
    /// .- LEGACY_OP_EMBEDDED_RLE ---------------------.
    /// |         Byte[0]         |     Byte[1..]      |
    /// |  7  6  5  4  3  2  1  0 |                    |
    /// |-------------------+-----+--------------------|
    /// |       count       | 1 1 | plane commands ... |
    /// `----------------------------------------------`
    /// ```
    ///
    /// The `4 * count` plane bytes hold byte 0 of every color (in u32le order), then byte 1, and
    /// so on. They are covered by packed plane commands, see [`EMBEDDED_OP_LITERAL`],
    /// [`EMBEDDED_OP_REPEAT`] and [`EMBEDDED_OP_SKIP`].
    pub const LEGACY_OP_EMBEDDED_RLE: u8 = 0b11;

    pub const LEGACY_LENGTH_START_BIT: u8 = 2;
    /// Largest count of [`LEGACY_OP_INLINE_SEQUENCE`] and [`LEGACY_OP_EMBEDDED_RLE`].
    pub const LEGACY_MAX_SEQUENCE: usize = 0b11_1111;

    /// Copy the next `value >> 1` bytes into the planes. Packed integer, start bit 1.
    pub const EMBEDDED_OP_LITERAL: u8 = 0b1;
    /// Repeat the next byte `value >> 2` times. Packed integer, start bit 2.
    pub const EMBEDDED_OP_REPEAT: u8 = 0b10;
    /// Leave `value >> 2` zero bytes. Packed integer, start bit 2.
    pub const EMBEDDED_OP_SKIP: u8 = 0b00;

    pub const EMBEDDED_LITERAL_START_BIT: u8 = 1;
    pub const EMBEDDED_RUN_START_BIT: u8 = 2;
}
