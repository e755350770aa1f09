mod common;

use common::{gradient, level, noise, pyramid, solid, unique, Level};
use lrle::{
    utils::block_order, Format, FormatSelection, LrleReader, LrleWriter, PixelRun, RunGroup,
    WriterConfig,
};

fn config(format: FormatSelection) -> WriterConfig {
    WriterConfig {
        format,
        ..WriterConfig::default()
    }
}

fn encode(levels: &[Level], config: WriterConfig) -> Vec<u8> {
    let mut writer = LrleWriter::with_config(config);
    for (width, height, pixels) in levels {
        writer.add_mip(*width, *height, pixels).unwrap();
    }
    writer.write_to_vec().unwrap()
}

/// Encodes `levels`, checks every mip decodes to its input and returns the file.
fn assert_roundtrip(levels: &[Level], config: WriterConfig) -> Vec<u8> {
    let encoded = encode(levels, config);
    let reader = LrleReader::new(&encoded[..]).unwrap();

    assert_eq!(reader.mip_count(), levels.len());
    for (mip, (width, height, pixels)) in reader.mips().zip(levels) {
        assert_eq!((mip.width, mip.height), (*width, *height));
        assert!(
            mip.decode_to_vec().unwrap() == *pixels,
            "mip {} of a {:?} file does not match its input",
            mip.index,
            reader.format()
        );
    }

    encoded
}

#[test]
fn gradient_roundtrips_in_every_format() {
    let levels = pyramid(&gradient(96, 64));

    for (selection, format) in [
        (FormatSelection::Auto, Format::Paletted),
        (FormatSelection::Legacy, Format::Legacy),
        (FormatSelection::Paletted, Format::Paletted),
    ] {
        let encoded = assert_roundtrip(&levels, config(selection));
        let reader = LrleReader::new(&encoded).unwrap();
        assert_eq!(reader.format(), format, "{selection:?}");
        assert_eq!(reader.header().width, 96);
        assert_eq!(reader.header().height, 64);
    }
}

#[test]
fn noise_roundtrips() {
    let levels = vec![level(&noise(64, 32, 0x5EED))];

    assert_roundtrip(&levels, config(FormatSelection::Legacy));
    assert_roundtrip(&levels, config(FormatSelection::Paletted));
}

#[test]
fn colors_missing_from_a_small_palette_are_stored_inline() {
    let levels = pyramid(&noise(32, 32, 7));
    let encoded = assert_roundtrip(
        &levels,
        WriterConfig {
            format: FormatSelection::Paletted,
            palette_capacity: 16,
            ..WriterConfig::default()
        },
    );

    let reader = LrleReader::new(&encoded).unwrap();
    assert_eq!(reader.format(), Format::Paletted);
    assert_eq!(reader.palette().len(), 16);
}

#[test]
fn single_color_mip_is_one_repeat() {
    let levels = vec![level(&solid(32, 32, [10, 20, 30, 255]))];

    let encoded = assert_roundtrip(&levels, config(FormatSelection::Auto));
    let reader = LrleReader::new(&encoded).unwrap();
    let mip = reader.mip(0).unwrap();
    assert_eq!(reader.palette(), [0xFF0A_141E]);
    assert_eq!(mip.runs().unwrap(), [PixelRun::new(0xFF0A_141E, 1024)]);
    // two bytes of packed length plus a one byte palette index
    assert_eq!(mip.len(), 3);

    let encoded = assert_roundtrip(&levels, config(FormatSelection::Legacy));
    let reader = LrleReader::new(&encoded).unwrap();
    let mip = reader.mip(0).unwrap();
    assert_eq!(mip.runs().unwrap(), [PixelRun::new(0xFF0A_141E, 1024)]);
    assert_eq!(mip.len(), 2 + 4);
}

#[test]
fn transparent_legacy_mip_has_no_color_payload() {
    let levels = vec![level(&solid(16, 16, [0, 0, 0, 0]))];
    let encoded = assert_roundtrip(&levels, config(FormatSelection::Legacy));

    let reader = LrleReader::new(&encoded).unwrap();
    assert_eq!(reader.mip(0).unwrap().len(), 2);
}

#[test]
fn unique_colors_only_produce_literals() {
    let levels = vec![level(&unique(16, 16))];

    let mut writer = LrleWriter::new();
    writer
        .add_mip(levels[0].0, levels[0].1, &levels[0].2)
        .unwrap();
    assert!(writer.mips()[0]
        .groups
        .iter()
        .all(|group| matches!(group, RunGroup::Literal(_))));

    for selection in [FormatSelection::Legacy, FormatSelection::Paletted] {
        let encoded = assert_roundtrip(&levels, config(selection));
        let reader = LrleReader::new(&encoded).unwrap();
        let runs = reader.mip(0).unwrap().runs().unwrap();
        assert_eq!(runs.len(), 256);
        assert!(runs.iter().all(|run| run.length == 1));
    }
}

#[test]
fn decoded_runs_follow_block_order() {
    let (width, height, pixels) = level(&gradient(32, 16));
    let encoded = assert_roundtrip(
        &[(width, height, pixels.clone())],
        config(FormatSelection::Legacy),
    );

    let reader = LrleReader::new(&encoded).unwrap();
    let decoded = reader
        .mip(0)
        .unwrap()
        .runs()
        .unwrap()
        .into_iter()
        .flat_map(|run| std::iter::repeat(run.color).take(run.length as usize))
        .collect::<Vec<_>>();

    let expected = block_order(usize::from(width), usize::from(height))
        .map(|index| lrle::utils::read_color(&pixels, index))
        .collect::<Vec<_>>();
    assert_eq!(decoded, expected);
}

#[test]
fn auto_falls_back_to_legacy_when_the_first_mip_fills_the_palette() {
    // 65536 distinct colors, one more than a palette can hold.
    let base = unique(256, 256);
    let levels = vec![
        level(&base),
        level(&image::imageops::resize(
            &base,
            128,
            128,
            image::imageops::FilterType::CatmullRom,
        )),
    ];

    let mut writer = LrleWriter::new();
    let (width, height, pixels) = &levels[0];
    writer.add_mip(*width, *height, pixels).unwrap();
    assert_eq!(writer.format(), Format::Legacy);
    assert!(writer.palette().is_full());

    let encoded = assert_roundtrip(&levels, WriterConfig::default());
    let reader = LrleReader::new(&encoded).unwrap();
    assert_eq!(reader.format(), Format::Legacy);
    assert!(reader.palette().is_empty());
}

#[test]
fn forced_paletted_never_falls_back() {
    let levels = vec![level(&unique(16, 16))];
    let encoded = assert_roundtrip(
        &levels,
        WriterConfig {
            format: FormatSelection::Paletted,
            palette_capacity: 8,
            ..WriterConfig::default()
        },
    );

    let reader = LrleReader::new(&encoded).unwrap();
    assert_eq!(reader.format(), Format::Paletted);
    assert_eq!(reader.palette().len(), 8);
}

#[test]
fn forced_legacy_does_not_collect_colors() {
    let (width, height, pixels) = level(&gradient(16, 16));
    let mut writer = LrleWriter::with_config(config(FormatSelection::Legacy));
    writer.add_mip(width, height, &pixels).unwrap();

    assert!(writer.palette().is_empty());
    assert_eq!(writer.palette().pending(), 0);
}

#[test]
fn reencoding_decoded_mips_is_stable() {
    let levels = pyramid(&gradient(128, 64));
    let encoded = assert_roundtrip(&levels, WriterConfig::default());

    let reader = LrleReader::new(&encoded).unwrap();
    let decoded = reader
        .mips()
        .map(|mip| (mip.width, mip.height, mip.decode_to_vec().unwrap()))
        .collect::<Vec<_>>();

    let reencoded = assert_roundtrip(&decoded, WriterConfig::default());
    assert_eq!(encoded, reencoded);
}

#[test]
fn lossy_palette_trades_exactness_for_size() {
    let levels = pyramid(&gradient(64, 64));
    let limited = |lossy_palette| WriterConfig {
        format: FormatSelection::Paletted,
        palette_capacity: 16,
        lossy_palette,
        ..WriterConfig::default()
    };

    let lossless = assert_roundtrip(&levels, limited(false));
    let lossy = encode(&levels, limited(true));
    assert!(lossy.len() < lossless.len());

    let reader = LrleReader::new(&lossy).unwrap();
    let palette = reader.palette();
    let mip = reader.mip(0).unwrap();
    let pixels = mip.decode_to_vec().unwrap();
    assert!(pixels
        .chunks_exact(4)
        .map(|p| u32::from_le_bytes([p[0], p[1], p[2], p[3]]))
        .all(|color| palette.contains(&color)));
}

#[test]
fn mips_iterator_restarts() {
    let levels = pyramid(&gradient(64, 32));
    let encoded = encode(&levels, WriterConfig::default());
    let reader = LrleReader::from_reader(&encoded[..]).unwrap();

    let sizes = reader
        .mips()
        .map(|mip| (mip.width, mip.height))
        .collect::<Vec<_>>();
    assert_eq!(sizes, [(64, 32), (32, 16), (16, 8), (8, 4)]);
    assert_eq!(reader.mips().len(), sizes.len());

    let mips = reader.mips();
    assert_eq!(mips.clone().count(), mips.count());

    let ends = reader.mips().map(|mip| mip.end).collect::<Vec<_>>();
    assert_eq!(ends.last().copied(), Some(reader.mip_data().len()));
    assert!(reader.mip(sizes.len()).is_none());
}
