#![allow(dead_code)]

use image::{imageops::FilterType, Rgba, RgbaImage};

/// An encoder input level: width, height and little-endian ARGB bytes.
pub type Level = (u16, u16, Vec<u8>);

/// RGBA to the little-endian ARGB layout (`B, G, R, A` in memory).
pub fn argb_bytes(image: &RgbaImage) -> Vec<u8> {
    image
        .pixels()
        .flat_map(|&Rgba([r, g, b, a])| [b, g, r, a])
        .collect()
}

pub fn level(image: &RgbaImage) -> Level {
    (image.width() as u16, image.height() as u16, argb_bytes(image))
}

pub fn solid(width: u32, height: u32, color: [u8; 4]) -> RgbaImage {
    RgbaImage::from_pixel(width, height, Rgba(color))
}

/// Smooth diagonal gradient with a few flat areas, similar to UI artwork.
pub fn gradient(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        if x < width / 4 {
            Rgba([0, 0, 0, 0])
        } else if y < height / 4 {
            Rgba([200, 30, 30, 255])
        } else {
            let r = (x * 255 / width) as u8;
            let g = (y * 255 / height) as u8;
            Rgba([r, g, r / 2 + g / 2, 255])
        }
    })
}

/// Deterministic pseudo-random pixels, alpha included.
pub fn noise(width: u32, height: u32, seed: u32) -> RgbaImage {
    let mut state = seed.max(1);
    RgbaImage::from_fn(width, height, |_, _| {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        Rgba(state.to_le_bytes())
    })
}

/// Every pixel a different opaque color.
pub fn unique(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        let [b, g, r, _] = (y * width + x).to_le_bytes();
        Rgba([r, g, b, 255])
    })
}

/// Mip chain of `base`, resampled with Catmull-Rom while the halved size stays block aligned.
pub fn pyramid(base: &RgbaImage) -> Vec<Level> {
    let (width, height) = base.dimensions();
    let mut levels = vec![level(base)];

    for shift in 1.. {
        let (w, h) = (width >> shift, height >> shift);
        if w < 4 || h < 4 || w % 4 != 0 || h % 4 != 0 {
            break;
        }
        levels.push(level(&image::imageops::resize(
            base,
            w,
            h,
            FilterType::CatmullRom,
        )));
    }

    levels
}
