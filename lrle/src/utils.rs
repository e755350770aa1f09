/// Maps an index in block scan order to the index of the same pixel in scanline order.
///
/// Block scan order walks 4x4 tiles left to right. The 16 pixels of a tile are visited row by
/// row, and a full band of tiles (`4 * width` pixels) is finished before the next band starts.
/// `width` must be a multiple of 4.
#[inline]
pub const fn block_to_scanline(index: usize, width: usize) -> usize {
    let block_row_size = width * 4;
    let block_total_index = index % block_row_size;

    let block_row = index / block_row_size;
    let block_column = block_total_index / 16;

    let index_row = (index / 4) % 4;
    let index_column = index % 4;

    let scanline_row = block_row * 4 + index_row;
    let scanline_column = block_column * 4 + index_column;

    scanline_row * width + scanline_column
}

/// Scanline indices of a `width` by `height` image, in block scan order.
pub fn block_order(width: usize, height: usize) -> impl Iterator<Item = usize> + Clone {
    (0..width * height).map(move |i| block_to_scanline(i, width))
}

/// Both dimensions are non-zero multiples of the 4x4 tile size.
#[inline]
pub const fn is_block_aligned(width: usize, height: usize) -> bool {
    width != 0 && height != 0 && width % 4 == 0 && height % 4 == 0
}

/// Reads the ARGB color of the pixel at scanline index `index`.
///
/// Pixels are stored as little-endian u32s, i.e. `B, G, R, A` in memory.
#[inline]
pub fn read_color(pixels: &[u8], index: usize) -> u32 {
    let offset = index * 4;
    let mut bytes = [0; 4];
    bytes.copy_from_slice(&pixels[offset..offset + 4]);
    u32::from_le_bytes(bytes)
}

/// Writes the ARGB color of the pixel at scanline index `index`.
#[inline]
pub fn write_color(pixels: &mut [u8], index: usize, color: u32) {
    let offset = index * 4;
    pixels[offset..offset + 4].copy_from_slice(&color.to_le_bytes());
}

/// Splits an ARGB pixel into its `[a, r, g, b]` components.
#[inline]
pub const fn split_argb(color: u32) -> [u8; 4] {
    let [b, g, r, a] = color.to_le_bytes();
    [a, r, g, b]
}

/// Sum of the absolute per-channel differences of two ARGB pixels.
#[inline]
pub fn channel_distance(x: u32, y: u32) -> u32 {
    split_argb(x)
        .iter()
        .zip(split_argb(y).iter())
        .map(|(&a, &b)| u32::from(a.abs_diff(b)))
        .sum()
}
