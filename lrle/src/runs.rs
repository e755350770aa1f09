use crate::{
    palette::PaletteBuilder,
    utils::{block_order, read_color},
};
use core::fmt;

/// `length` consecutive pixels (in block scan order) of the same color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PixelRun {
    pub color: u32,
    pub length: u32,
}

impl PixelRun {
    #[inline]
    pub const fn new(color: u32, length: u32) -> Self {
        Self { color, length }
    }

    #[inline]
    pub const fn single(color: u32) -> Self {
        Self { color, length: 1 }
    }
}

impl fmt::Display for PixelRun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08X} x {}", self.color, self.length)
    }
}

/// Unit of work for the chunk encoders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunGroup {
    /// A run longer than one pixel.
    Repeat(PixelRun),
    /// Colors of consecutive single-pixel runs.
    Literal(Vec<u32>),
}

impl RunGroup {
    /// Number of pixels covered by this group.
    pub fn pixel_count(&self) -> usize {
        match self {
            RunGroup::Repeat(run) => run.length as usize,
            RunGroup::Literal(colors) => colors.len(),
        }
    }
}

fn flush(groups: &mut Vec<RunGroup>, literals: &mut Vec<u32>, color: u32, length: u32) {
    if length > 1 {
        if !literals.is_empty() {
            groups.push(RunGroup::Literal(core::mem::take(literals)));
        }
        groups.push(RunGroup::Repeat(PixelRun::new(color, length)));
    } else {
        literals.push(color);
    }
}

/// Splits an ARGB image into run groups, walking it in block scan order.
///
/// Single pixels between two longer runs are batched into one [`RunGroup::Literal`]. If a
/// `palette` is given, every visited pixel is counted towards its color frequencies.
///
/// `pixels` must hold `width * height` little-endian ARGB pixels, and both dimensions must be
/// multiples of 4.
pub fn extract_runs(
    pixels: &[u8],
    width: usize,
    height: usize,
    mut palette: Option<&mut PaletteBuilder>,
) -> Vec<RunGroup> {
    let mut groups = Vec::new();
    let mut literals = Vec::new();

    let mut order = block_order(width, height);
    let Some(first) = order.next() else {
        return groups;
    };

    let mut last_color = read_color(pixels, first);
    let mut run_length = 1u32;
    if let Some(palette) = palette.as_deref_mut() {
        palette.register(last_color);
    }

    for index in order {
        let color = read_color(pixels, index);
        if let Some(palette) = palette.as_deref_mut() {
            palette.register(color);
        }

        if color == last_color {
            run_length += 1;
            continue;
        }

        flush(&mut groups, &mut literals, last_color, run_length);
        last_color = color;
        run_length = 1;
    }

    flush(&mut groups, &mut literals, last_color, run_length);
    if !literals.is_empty() {
        groups.push(RunGroup::Literal(literals));
    }

    groups
}
