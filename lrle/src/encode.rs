use crate::{
    consts::*,
    palette::{PaletteBuilder, DEFAULT_BUCKET_INTERVAL},
    runs::{extract_runs, RunGroup},
    utils::is_block_aligned,
    Format,
};
use byteorder::{LittleEndian, WriteBytesExt};
use snafu::{ensure, OptionExt, ResultExt, Snafu};
use std::io::Write;

mod legacy;
mod paletted;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum EncodeError {
    #[snafu(display(
        "Specified image dimensions don't match the pixel data: {width} * {height} * 4 == {} bytes, but {byte_count} bytes were given",
        width * height * 4
    ))]
    InvalidDimensions {
        width: usize,
        height: usize,
        byte_count: usize,
    },
    #[snafu(display("Image dimensions {width}x{height} are not non-zero multiples of 4"))]
    UnalignedDimensions { width: u16, height: u16 },
    #[snafu(display(
        "Mip {index} is {width}x{height}, but must be {expected_width}x{expected_height} to follow mip 0"
    ))]
    MipDimensionMismatch {
        index: usize,
        width: u16,
        height: u16,
        expected_width: u16,
        expected_height: u16,
    },
    #[snafu(display("No mips were added"))]
    NoMips,
    #[snafu(display("Encoded mip data exceeds the 32-bit offset range at {size} bytes"))]
    MipDataTooLarge { size: usize },
    WriteIo {
        source: std::io::Error,
    },
}

/// Which command format the writer may use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FormatSelection {
    /// Start paletted, and fall back to [`Format::Legacy`] for the whole file if the first mip
    /// alone fills the palette.
    #[default]
    Auto,
    Legacy,
    Paletted,
}

#[derive(Debug, Clone)]
pub struct WriterConfig {
    pub format: FormatSelection,
    /// Write colors that were aliased to a palette entry as that entry, instead of inline.
    ///
    /// Smaller output, but decoding no longer reproduces those pixels exactly.
    pub lossy_palette: bool,
    /// Maximum palette size, clamped to [`MAX_PALETTE_LEN`].
    pub palette_capacity: usize,
    /// Channel interval of the nearest-color search buckets.
    pub bucket_interval: u8,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            format: FormatSelection::Auto,
            lossy_palette: false,
            palette_capacity: MAX_PALETTE_LEN,
            bucket_interval: DEFAULT_BUCKET_INTERVAL,
        }
    }
}

/// Run groups of one mip, waiting to be encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MipRuns {
    pub width: u16,
    pub height: u16,
    pub groups: Vec<RunGroup>,
}

/// Collects a mip pyramid and writes it as an LRLE file.
///
/// Mips are split into runs as they are added, while the palette learns their colors. Commands
/// are only encoded in [`write`](Self::write), once the palette is final.
#[derive(Debug, Clone)]
pub struct LrleWriter {
    config: WriterConfig,
    format: Format,
    mips: Vec<MipRuns>,
    palette: PaletteBuilder,
}

impl Default for LrleWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl LrleWriter {
    pub fn new() -> Self {
        Self::with_config(WriterConfig::default())
    }

    pub fn with_config(config: WriterConfig) -> Self {
        let format = match config.format {
            FormatSelection::Legacy => Format::Legacy,
            FormatSelection::Auto | FormatSelection::Paletted => Format::Paletted,
        };
        let palette = PaletteBuilder::with_limits(config.palette_capacity, config.bucket_interval);

        Self {
            config,
            format,
            mips: Vec::new(),
            palette,
        }
    }

    #[inline]
    pub fn config(&self) -> &WriterConfig {
        &self.config
    }

    /// Format the file will be written in, given the mips added so far.
    #[inline]
    pub fn format(&self) -> Format {
        self.format
    }

    #[inline]
    pub fn palette(&self) -> &PaletteBuilder {
        &self.palette
    }

    #[inline]
    pub fn mips(&self) -> &[MipRuns] {
        &self.mips
    }

    /// Appends the next mip level. `pixels` holds `width * height` little-endian ARGB pixels.
    ///
    /// Mip 0 defines the file's dimensions, mip `n` must be exactly `width >> n` by
    /// `height >> n`.
    pub fn add_mip(&mut self, width: u16, height: u16, pixels: &[u8]) -> Result<(), EncodeError> {
        let (w, h) = (usize::from(width), usize::from(height));
        ensure!(
            w * h * 4 == pixels.len(),
            InvalidDimensionsSnafu {
                width: w,
                height: h,
                byte_count: pixels.len()
            }
        );
        ensure!(
            is_block_aligned(w, h),
            UnalignedDimensionsSnafu { width, height }
        );

        let index = self.mips.len();
        if let Some(first) = self.mips.first() {
            let expected_width = first.width.checked_shr(index as u32).unwrap_or(0);
            let expected_height = first.height.checked_shr(index as u32).unwrap_or(0);
            ensure!(
                (width, height) == (expected_width, expected_height),
                MipDimensionMismatchSnafu {
                    index,
                    width,
                    height,
                    expected_width,
                    expected_height
                }
            );
        }

        let registering = self.format == Format::Paletted;
        let groups = extract_runs(
            pixels,
            w,
            h,
            if registering {
                Some(&mut self.palette)
            } else {
                None
            },
        );

        if registering {
            self.palette.build();

            if index == 0 && self.config.format == FormatSelection::Auto && self.palette.is_full()
            {
                log::debug!(
                    "first mip filled the palette ({} colors), using the legacy format",
                    self.palette.len()
                );
                self.format = Format::Legacy;
            }
        }

        log::trace!(
            "mip {index}: {width}x{height}, {} run groups",
            groups.len()
        );

        self.mips.push(MipRuns {
            width,
            height,
            groups,
        });

        Ok(())
    }

    /// Encodes all mips and writes the file.
    pub fn write<W: Write>(self, mut w: W) -> Result<(), EncodeError> {
        ensure!(!self.mips.is_empty(), NoMipsSnafu);

        let mut data = Vec::new();
        let mut offsets = Vec::with_capacity(self.mips.len());
        for (index, mip) in self.mips.iter().enumerate() {
            let start = data.len();
            offsets.push(
                u32::try_from(start)
                    .ok()
                    .context(MipDataTooLargeSnafu { size: start })?,
            );

            self.encode_mip(mip, &mut data);

            log::trace!(
                "mip {index}: encoded {} pixels into {} bytes",
                usize::from(mip.width) * usize::from(mip.height),
                data.len() - start
            );
        }
        ensure!(
            u32::try_from(data.len()).is_ok(),
            MipDataTooLargeSnafu { size: data.len() }
        );

        macro_rules! w {
            ($method:ident($value:expr)) => {
                w.$method::<LittleEndian>($value).context(WriteIoSnafu)
            };
        }

        let first = &self.mips[0];
        w!(write_u32(LRLE_MAGIC))?;
        w!(write_u32(self.format.tag()))?;
        w!(write_u16(first.width))?;
        w!(write_u16(first.height))?;
        w!(write_u32(self.mips.len() as u32))?;
        for offset in offsets {
            w!(write_u32(offset))?;
        }

        if self.format.has_palette() {
            let colors = self.palette.colors();
            w!(write_u32(colors.len() as u32))?;
            for &color in colors {
                w!(write_u32(color))?;
            }
        }

        w.write_all(&data).context(WriteIoSnafu)?;

        log::debug!(
            "wrote {:?} file: {} mips, {} palette colors, {} bytes of mip data",
            self.format,
            self.mips.len(),
            if self.format.has_palette() {
                self.palette.len()
            } else {
                0
            },
            data.len()
        );

        Ok(())
    }

    pub fn write_to_vec(self) -> Result<Vec<u8>, EncodeError> {
        let mut out = Vec::new();
        self.write(&mut out)?;
        Ok(out)
    }

    fn encode_mip(&self, mip: &MipRuns, out: &mut Vec<u8>) {
        match self.format {
            Format::Legacy => {
                for group in &mip.groups {
                    legacy::encode_group(out, group);
                }
            }
            Format::Paletted => {
                let palette = &self.palette;
                let index_of = |color: u32| {
                    if self.config.lossy_palette {
                        palette.lookup(color)
                    } else {
                        palette.index_of(color)
                    }
                };

                for group in &mip.groups {
                    paletted::encode_group(out, group, &index_of);
                }
            }
        }
    }
}
