use crate::{
    consts::LRLE_MAGIC,
    runs::PixelRun,
    utils::{block_to_scanline, is_block_aligned, write_color},
    Format, HeaderInfo,
};
use byteorder::{LittleEndian, ReadBytesExt};
use snafu::{ensure, OptionExt, ResultExt, Snafu};
use std::io::Read;

mod legacy;
mod paletted;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum DecodeError {
    #[snafu(display("Invalid magic 0x{magic:08X}, not an LRLE file"))]
    InvalidMagic { magic: u32 },
    #[snafu(display("Unsupported format tag {tag}"))]
    UnsupportedFormat { tag: u32 },
    #[snafu(display("Unsupported command byte 0b{command:08b}"))]
    UnsupportedCommand { command: u8 },
    #[snafu(display("Output buffer is {actual} bytes, but the mip needs exactly {expected}"))]
    BufferSizeMismatch { expected: usize, actual: usize },
    #[snafu(display("Unexpected end of stream"))]
    UnexpectedEof { source: std::io::Error },
    ReadIo { source: std::io::Error },
    #[snafu(display("Mip {index} has an invalid byte range {start}..{end}"))]
    InvalidMipOffset { index: usize, start: u64, end: u64 },
    #[snafu(display("Palette index {index} out of range for a palette of {len} colors"))]
    PaletteIndexOutOfRange { index: u64, len: usize },
    PackedIntOverflow,
    EmbeddedRleOverflow,
    #[snafu(display("Command stream describes more than {capacity} pixels"))]
    PixelOverflow { capacity: usize },
    #[snafu(display("Command stream describes {actual} pixels, but the mip has {expected}"))]
    PixelCountMismatch { expected: usize, actual: usize },
    #[snafu(display("Mip {index} is {width}x{height}, which does not split into 4x4 blocks"))]
    UnalignedMip { index: usize, width: u16, height: u16 },
}

/// Receives the decoded runs of a mip, in block scan order.
pub trait DecodeOutput {
    fn write_run(&mut self, run: PixelRun) -> Result<(), DecodeError>;
}

impl DecodeOutput for Vec<PixelRun> {
    #[inline]
    fn write_run(&mut self, run: PixelRun) -> Result<(), DecodeError> {
        self.push(run);
        Ok(())
    }
}

/// Places decoded pixels into an ARGB buffer in scanline order.
pub struct ScanlineOutput<'a> {
    pixels: &'a mut [u8],
    width: usize,
    position: usize,
}

impl<'a> ScanlineOutput<'a> {
    /// `pixels` holds 4 bytes per pixel, `width` must be a multiple of 4.
    pub fn new(pixels: &'a mut [u8], width: usize) -> Self {
        Self {
            pixels,
            width,
            position: 0,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.pixels.len() / 4
    }

    /// Number of pixels written so far.
    #[inline]
    pub fn position(&self) -> usize {
        self.position
    }

    /// Checks that every pixel of the buffer was written.
    pub fn finish(self) -> Result<(), DecodeError> {
        let expected = self.capacity();
        ensure!(
            self.position == expected,
            PixelCountMismatchSnafu {
                expected,
                actual: self.position
            }
        );
        Ok(())
    }
}

impl DecodeOutput for ScanlineOutput<'_> {
    fn write_run(&mut self, run: PixelRun) -> Result<(), DecodeError> {
        let capacity = self.capacity();
        let length = run.length as usize;
        ensure!(
            length <= capacity - self.position,
            PixelOverflowSnafu { capacity }
        );

        for index in self.position..self.position + length {
            write_color(self.pixels, block_to_scanline(index, self.width), run.color);
        }
        self.position += length;

        Ok(())
    }
}

/// Collects runs while checking that they cover exactly `capacity` pixels.
struct RunCollector {
    runs: Vec<PixelRun>,
    capacity: usize,
    position: usize,
}

impl DecodeOutput for RunCollector {
    fn write_run(&mut self, run: PixelRun) -> Result<(), DecodeError> {
        let capacity = self.capacity;
        let length = run.length as usize;
        ensure!(
            length <= capacity - self.position,
            PixelOverflowSnafu { capacity }
        );

        self.position += length;
        self.runs.push(run);
        Ok(())
    }
}

/// Decoded run lengths larger than any mip are clamped, the output rejects them anyway.
#[inline]
fn run_length(length: u64) -> u32 {
    u32::try_from(length).unwrap_or(u32::MAX)
}

/// A parsed LRLE file.
///
/// Parsing only touches the header, offset table and palette. Mips are decoded on request.
#[derive(Debug, Clone)]
pub struct LrleReader<B> {
    data: B,
    header: HeaderInfo,
    offsets: Vec<u32>,
    palette: Vec<u32>,
    mip_data_start: usize,
}

impl LrleReader<Vec<u8>> {
    /// Reads the whole stream into memory and parses it.
    pub fn from_reader<R: Read>(mut r: R) -> Result<Self, DecodeError> {
        let mut data = Vec::new();
        r.read_to_end(&mut data).context(ReadIoSnafu)?;
        Self::new(data)
    }
}

impl<B: AsRef<[u8]>> LrleReader<B> {
    pub fn new(data: B) -> Result<Self, DecodeError> {
        let bytes = data.as_ref();
        let mut input = bytes;

        let magic = input
            .read_u32::<LittleEndian>()
            .context(UnexpectedEofSnafu)?;
        ensure!(magic == LRLE_MAGIC, InvalidMagicSnafu { magic });

        let tag = input
            .read_u32::<LittleEndian>()
            .context(UnexpectedEofSnafu)?;
        let format = Format::from_tag(tag).context(UnsupportedFormatSnafu { tag })?;

        let width = input
            .read_u16::<LittleEndian>()
            .context(UnexpectedEofSnafu)?;
        let height = input
            .read_u16::<LittleEndian>()
            .context(UnexpectedEofSnafu)?;
        let mip_count = input
            .read_u32::<LittleEndian>()
            .context(UnexpectedEofSnafu)?;

        let offsets = (0..mip_count)
            .map(|_| input.read_u32::<LittleEndian>())
            .collect::<Result<Vec<_>, _>>()
            .context(UnexpectedEofSnafu)?;

        let palette = if format.has_palette() {
            let len = input
                .read_u32::<LittleEndian>()
                .context(UnexpectedEofSnafu)?;
            (0..len)
                .map(|_| input.read_u32::<LittleEndian>())
                .collect::<Result<Vec<_>, _>>()
                .context(UnexpectedEofSnafu)?
        } else {
            Vec::new()
        };

        let mip_data_start = bytes.len() - input.len();
        let mip_data_len = input.len() as u64;
        for (index, &start) in offsets.iter().enumerate() {
            let start = u64::from(start);
            let end = offsets
                .get(index + 1)
                .map_or(mip_data_len, |&end| u64::from(end));
            ensure!(
                start <= end && end <= mip_data_len,
                InvalidMipOffsetSnafu { index, start, end }
            );
        }

        let header = HeaderInfo {
            format,
            width,
            height,
            mip_count,
        };

        log::debug!(
            "parsed {format:?} header: {width}x{height}, {mip_count} mips, {} palette colors, {mip_data_len} bytes of mip data",
            palette.len()
        );

        Ok(Self {
            data,
            header,
            offsets,
            palette,
            mip_data_start,
        })
    }

    #[inline]
    pub fn header(&self) -> &HeaderInfo {
        &self.header
    }

    #[inline]
    pub fn format(&self) -> Format {
        self.header.format
    }

    /// The file's palette, empty for [`Format::Legacy`].
    #[inline]
    pub fn palette(&self) -> &[u32] {
        &self.palette
    }

    #[inline]
    pub fn mip_count(&self) -> usize {
        self.offsets.len()
    }

    /// Byte offsets of every mip, relative to [`mip_data`](Self::mip_data).
    #[inline]
    pub fn offsets(&self) -> &[u32] {
        &self.offsets
    }

    #[inline]
    pub fn mip_data(&self) -> &[u8] {
        &self.data.as_ref()[self.mip_data_start..]
    }

    pub fn mip(&self, index: usize) -> Option<Mip<'_>> {
        (index < self.mip_count()).then(|| self.mip_at(index))
    }

    /// All mips, largest first. Call again (or clone the iterator) to start over.
    pub fn mips(&self) -> impl ExactSizeIterator<Item = Mip<'_>> + Clone + '_ {
        (0..self.mip_count()).map(move |index| self.mip_at(index))
    }

    fn mip_at(&self, index: usize) -> Mip<'_> {
        let mip_data = self.mip_data();
        let start = self.offsets[index] as usize;
        let end = self
            .offsets
            .get(index + 1)
            .map_or(mip_data.len(), |&end| end as usize);

        let codec = match self.header.format {
            Format::Legacy => MipCodec::Legacy,
            Format::Paletted => MipCodec::Paletted(&self.palette),
        };

        Mip {
            index,
            width: self.header.width.checked_shr(index as u32).unwrap_or(0),
            height: self.header.height.checked_shr(index as u32).unwrap_or(0),
            start,
            end,
            bytes: &mip_data[start..end],
            codec,
        }
    }

    pub fn into_inner(self) -> B {
        self.data
    }
}

#[derive(Debug, Clone, Copy)]
enum MipCodec<'a> {
    Legacy,
    Paletted(&'a [u32]),
}

/// One mip level of an [`LrleReader`], borrowing its command bytes from the file.
#[derive(Debug, Clone, Copy)]
pub struct Mip<'a> {
    pub index: usize,
    pub width: u16,
    pub height: u16,
    /// Byte range of the command stream inside the mip data block.
    pub start: usize,
    pub end: usize,
    bytes: &'a [u8],
    codec: MipCodec<'a>,
}

impl<'a> Mip<'a> {
    /// Size of the command stream in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    #[inline]
    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    #[inline]
    pub fn pixel_count(&self) -> usize {
        usize::from(self.width) * usize::from(self.height)
    }

    /// Feeds every run of the command stream to `output`.
    pub fn decode_with<O: DecodeOutput + ?Sized>(&self, output: &mut O) -> Result<(), DecodeError> {
        let mut input = self.bytes;

        while !input.is_empty() {
            match self.codec {
                MipCodec::Legacy => legacy::decode_chunk(&mut input, output)?,
                MipCodec::Paletted(palette) => {
                    paletted::decode_chunk(&mut input, palette, output)?
                }
            }
        }

        Ok(())
    }

    /// Decodes the mip into `pixels`, which must be exactly `width * height * 4` bytes.
    pub fn decode_into(&self, pixels: &mut [u8]) -> Result<(), DecodeError> {
        ensure!(
            is_block_aligned(usize::from(self.width), usize::from(self.height)),
            UnalignedMipSnafu {
                index: self.index,
                width: self.width,
                height: self.height
            }
        );

        let expected = self.pixel_count() * 4;
        ensure!(
            pixels.len() == expected,
            BufferSizeMismatchSnafu {
                expected,
                actual: pixels.len()
            }
        );

        let mut output = ScanlineOutput::new(pixels, usize::from(self.width));
        self.decode_with(&mut output)?;
        output.finish()
    }

    pub fn decode_to_vec(&self) -> Result<Vec<u8>, DecodeError> {
        let mut pixels = vec![0; self.pixel_count() * 4];
        self.decode_into(&mut pixels)?;
        Ok(pixels)
    }

    /// The runs of the command stream, in block scan order.
    ///
    /// Fails like [`decode_into`](Self::decode_into) if the runs do not cover the mip exactly.
    pub fn runs(&self) -> Result<Vec<PixelRun>, DecodeError> {
        let mut output = RunCollector {
            runs: Vec::new(),
            capacity: self.pixel_count(),
            position: 0,
        };
        self.decode_with(&mut output)?;

        let RunCollector {
            runs,
            capacity,
            position,
        } = output;
        ensure!(
            position == capacity,
            PixelCountMismatchSnafu {
                expected: capacity,
                actual: position
            }
        );
        Ok(runs)
    }
}
