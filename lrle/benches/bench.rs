use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use image::{imageops::FilterType, Rgba, RgbaImage};
use lrle::{FormatSelection, LrleReader, LrleWriter, WriterConfig};

/// Synthetic inputs: flat UI-like artwork and incompressible noise.
fn test_images() -> Vec<(&'static str, RgbaImage)> {
    let artwork = RgbaImage::from_fn(512, 512, |x, y| {
        if (x / 64 + y / 64) % 3 == 0 {
            Rgba([0, 0, 0, 0])
        } else {
            Rgba([(x / 2) as u8, (y / 2) as u8, 96, 255])
        }
    });

    let mut state = 0x2545_F491u32;
    let noise = RgbaImage::from_fn(256, 256, |_, _| {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        Rgba(state.to_le_bytes())
    });

    vec![("artwork", artwork), ("noise", noise)]
}

/// Mip levels as little-endian ARGB bytes.
fn levels(image: &RgbaImage) -> Vec<(u16, u16, Vec<u8>)> {
    let (width, height) = image.dimensions();
    (0..)
        .map(|shift| (width >> shift, height >> shift))
        .take_while(|&(w, h)| w >= 8 && h >= 8)
        .map(|(w, h)| {
            let resized = image::imageops::resize(image, w, h, FilterType::CatmullRom);
            let pixels = resized
                .pixels()
                .flat_map(|&Rgba([r, g, b, a])| [b, g, r, a])
                .collect();
            (w as u16, h as u16, pixels)
        })
        .collect()
}

fn pixel_count(levels: &[(u16, u16, Vec<u8>)]) -> u64 {
    levels
        .iter()
        .map(|(w, h, _)| u64::from(*w) * u64::from(*h))
        .sum()
}

fn encode_levels(levels: &[(u16, u16, Vec<u8>)], format: FormatSelection) -> Vec<u8> {
    let mut writer = LrleWriter::with_config(WriterConfig {
        format,
        ..WriterConfig::default()
    });
    for (width, height, pixels) in levels {
        writer.add_mip(*width, *height, pixels).unwrap();
    }
    writer.write_to_vec().unwrap()
}

const FORMATS: [(&str, FormatSelection); 2] = [
    ("legacy", FormatSelection::Legacy),
    ("paletted", FormatSelection::Paletted),
];

fn decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("synthetic decode");

    for (image_name, image) in test_images() {
        let levels = levels(&image);
        group.throughput(Throughput::Elements(pixel_count(&levels)));

        for (format_name, format) in FORMATS {
            let encoded = encode_levels(&levels, format);

            group.bench_with_input(
                BenchmarkId::new(format_name, image_name),
                &encoded,
                |b, input| {
                    let reader = LrleReader::new(&input[..]).unwrap();
                    let mut outputs = reader
                        .mips()
                        .map(|mip| vec![0; mip.pixel_count() * 4])
                        .collect::<Vec<_>>();
                    b.iter(|| {
                        for (mip, output) in reader.mips().zip(&mut outputs) {
                            mip.decode_into(output).unwrap();
                        }
                    })
                },
            );
        }
    }
}

fn encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("synthetic encode");

    for (image_name, image) in test_images() {
        let levels = levels(&image);
        group.throughput(Throughput::Elements(pixel_count(&levels)));

        for (format_name, format) in FORMATS {
            group.bench_with_input(
                BenchmarkId::new(format_name, image_name),
                &levels,
                |b, input| b.iter(|| encode_levels(input, format)),
            );
        }
    }
}

criterion_group!(benches, decode, encode);
criterion_main!(benches);
