use argh::FromArgs;
use image::{imageops::FilterType, DynamicImage, ImageFormat, Rgba, RgbaImage};
use lrle::{
    utils::split_argb, Format as LrleFormat, FormatSelection, LrleReader, LrleWriter,
    WriterConfig,
};
use std::{error::Error, fs::File, io::BufReader, path::Path, str::FromStr, time::Instant};

/// LRLE cli encoder, decoder and inspector.
#[derive(FromArgs)]
struct Cli {
    #[argh(subcommand)]
    command: Command,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum Command {
    Encode(Encode),
    Decode(Decode),
    Info(Info),
    Roundtrip(Roundtrip),
}

#[derive(Debug, Clone, Copy)]
enum Format {
    Png,
    Jpg,
    Bmp,
}

impl Format {
    fn image_format(self) -> ImageFormat {
        match self {
            Format::Png => ImageFormat::Png,
            Format::Jpg => ImageFormat::Jpeg,
            Format::Bmp => ImageFormat::Bmp,
        }
    }

    fn extension(self) -> &'static str {
        match self {
            Format::Png => "png",
            Format::Jpg => "jpg",
            Format::Bmp => "bmp",
        }
    }

    /// Guesses the format from a file extension.
    fn from_path(path: &str) -> Option<Self> {
        Path::new(path)
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| ext.parse().ok())
    }
}

impl FromStr for Format {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        #[rustfmt::skip]
        let Some(format) = s.eq_ignore_ascii_case("png").then_some(Format::Png)
               .or_else(|| s.eq_ignore_ascii_case("jpg").then_some(Format::Jpg))
               .or_else(|| s.eq_ignore_ascii_case("jpeg").then_some(Format::Jpg))
               .or_else(|| s.eq_ignore_ascii_case("bmp").then_some(Format::Bmp))
        else { return Err("invalid string"); };

        Ok(format)
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let Cli { command } = argh::from_env();

    match command {
        Command::Encode(options) => encode(options),
        Command::Decode(options) => decode(options),
        Command::Info(options) => info(options),
        Command::Roundtrip(options) => roundtrip(options),
    }
}

/// Encodes an image and its mip chain as LRLE.
#[derive(FromArgs)]
#[argh(subcommand, name = "encode")]
struct Encode {
    /// input format, optional (png, jpg, bmp)
    #[argh(option)]
    format: Option<Format>,

    /// maximum number of mip levels, including the full size image
    #[argh(option, default = "12")]
    max_mips: usize,

    /// always write the legacy format, without a palette
    #[argh(switch)]
    legacy: bool,

    /// always write the paletted format, even if the palette overflows
    #[argh(switch)]
    paletted: bool,

    /// store colors that did not fit the palette as their nearest palette entry
    #[argh(switch)]
    lossy_palette: bool,

    /// the input image, a PNG, JPG, or BMP
    #[argh(positional)]
    input: String,
    /// the output file
    #[argh(positional)]
    output: String,
}

/// ARGB levels of `image`: the image itself, then Catmull-Rom downscales of it.
///
/// Halving stops once a level is smaller than 8x8, the next size is not a multiple of 4, or
/// `max_mips` levels exist.
fn mip_chain(image: &RgbaImage, max_mips: usize) -> Vec<(u16, u16, Vec<u8>)> {
    let (width, height) = image.dimensions();
    let mut levels = vec![(width as u16, height as u16, rgba_to_argb(image))];

    let mut shift = 1;
    while levels.len() < max_mips {
        let (last_w, last_h) = (width >> (shift - 1), height >> (shift - 1));
        let (w, h) = (width >> shift, height >> shift);
        if last_w < 8 || last_h < 8 || w % 4 != 0 || h % 4 != 0 {
            break;
        }

        let level = image::imageops::resize(image, w, h, FilterType::CatmullRom);
        levels.push((w as u16, h as u16, rgba_to_argb(&level)));
        shift += 1;
    }

    levels
}

fn encode(options: Encode) -> Result<(), Box<dyn Error>> {
    let Encode {
        format,
        max_mips,
        legacy,
        paletted,
        lossy_palette,
        input,
        output,
    } = options;

    let selection = match (legacy, paletted) {
        (true, true) => return Err("--legacy and --paletted are mutually exclusive".into()),
        (true, false) => FormatSelection::Legacy,
        (false, true) => FormatSelection::Paletted,
        (false, false) => FormatSelection::Auto,
    };

    let start = Instant::now();
    let image = match format {
        Some(format) => image::io::Reader::with_format(
            BufReader::new(File::open(&input)?),
            format.image_format(),
        )
        .decode()?,
        None => image::io::Reader::open(&input)?
            .with_guessed_format()?
            .decode()?,
    }
    .into_rgba8();
    log::info!("loaded `{input}` in {:?}", start.elapsed());

    let (width, height) = image.dimensions();
    if width > u16::MAX as u32 || height > u16::MAX as u32 {
        return Err("image dimensions are too large".into());
    }
    if width % 4 != 0 || height % 4 != 0 {
        return Err(format!("image dimensions {width}x{height} are not multiples of 4").into());
    }

    let start = Instant::now();
    let levels = mip_chain(&image, max_mips.max(1));
    log::info!("built {} mip levels in {:?}", levels.len(), start.elapsed());

    println!("Encoding {width}x{height} image with {} mips", levels.len());

    let start = Instant::now();
    let mut writer = LrleWriter::with_config(WriterConfig {
        format: selection,
        lossy_palette,
        ..WriterConfig::default()
    });
    for (w, h, pixels) in &levels {
        writer.add_mip(*w, *h, pixels)?;
    }
    let format = writer.format();
    let palette_len = writer.palette().len();
    let encoded = writer.write_to_vec()?;
    log::info!("encoded in {:?}", start.elapsed());

    std::fs::write(&output, &encoded)?;
    match format {
        LrleFormat::Legacy => {
            println!("Written {} bytes ({format:?}) to `{output}`", encoded.len())
        }
        LrleFormat::Paletted => println!(
            "Written {} bytes ({format:?}, {palette_len} palette colors) to `{output}`",
            encoded.len()
        ),
    }

    Ok(())
}

/// Decodes an LRLE file to an image.
#[derive(FromArgs)]
#[argh(subcommand, name = "decode")]
struct Decode {
    /// output format (png, jpg, bmp), guessed from the output file name if missing
    #[argh(option)]
    format: Option<Format>,

    /// also write every smaller mip next to the output, as `<output>.mipN.<ext>`
    #[argh(switch)]
    all_mips: bool,

    /// with --all-mips, the maximum number of mips to write
    #[argh(option)]
    max_mips: Option<usize>,

    /// the input file
    #[argh(positional)]
    input: String,
    /// the output image
    #[argh(positional)]
    output: String,
}

fn decode(options: Decode) -> Result<(), Box<dyn Error>> {
    let Decode {
        format,
        all_mips,
        max_mips,
        input,
        output,
    } = options;

    let format = format
        .or_else(|| Format::from_path(&output))
        .unwrap_or(Format::Png);

    println!("Decoding `{input}`");

    let start = Instant::now();
    let reader = LrleReader::from_reader(BufReader::new(File::open(&input)?))?;
    log::info!("parsed header in {:?}", start.elapsed());

    let count = if all_mips {
        max_mips.unwrap_or(usize::MAX).min(reader.mip_count())
    } else {
        1
    };

    for mip in reader.mips().take(count) {
        let start = Instant::now();
        let pixels = mip.decode_to_vec()?;
        log::info!("decoded mip {} in {:?}", mip.index, start.elapsed());

        let path = mip_path(&output, mip.index, format);

        let image = argb_to_rgba(mip.width, mip.height, pixels).ok_or("failed to create image")?;
        save(image, &path, format)?;
        println!("Written {}x{} image to `{path}`", mip.width, mip.height);
    }

    Ok(())
}

/// `output` for mip 0, `<output>.mipN.<ext>` for the smaller mips.
fn mip_path(output: &str, index: usize, format: Format) -> String {
    if index == 0 {
        output.to_owned()
    } else {
        format!("{output}.mip{index}.{}", format.extension())
    }
}

/// Prints the structure of an LRLE file.
#[derive(FromArgs)]
#[argh(subcommand, name = "info")]
struct Info {
    /// dump the palette
    #[argh(switch)]
    palette: bool,

    /// dump the runs of every mip
    #[argh(switch)]
    runs: bool,

    /// the input file
    #[argh(positional)]
    input: String,
}

fn info(options: Info) -> Result<(), Box<dyn Error>> {
    let Info {
        palette,
        runs,
        input,
    } = options;

    let reader = LrleReader::from_reader(BufReader::new(File::open(&input)?))?;
    let header = reader.header();

    println!("`{input}`: {:?} format", header.format);
    println!("  {}x{}, {} mips", header.width, header.height, header.mip_count);
    if header.format.has_palette() {
        println!("  {} palette colors", reader.palette().len());
    }
    for mip in reader.mips() {
        println!(
            "  mip {:2}: {:5}x{:<5} bytes {}..{} ({} bytes)",
            mip.index,
            mip.width,
            mip.height,
            mip.start,
            mip.end,
            mip.len()
        );
    }

    if palette {
        println!("palette:");
        for (index, &color) in reader.palette().iter().enumerate() {
            println!("  {index:5}  0x{index:04X}  {}", rgba_hex(color));
        }
    }

    if runs {
        for mip in reader.mips() {
            let start = Instant::now();
            let runs = mip.runs()?;
            log::info!("decoded runs of mip {} in {:?}", mip.index, start.elapsed());

            println!("mip {} runs:", mip.index);
            for run in runs {
                println!("  {} * {}", rgba_hex(run.color), run.length);
            }
        }
    }

    Ok(())
}

/// Decodes an LRLE file, encodes the result again and checks that nothing changed.
#[derive(FromArgs)]
#[argh(subcommand, name = "roundtrip")]
struct Roundtrip {
    /// the input file
    #[argh(positional)]
    input: String,
}

fn roundtrip(options: Roundtrip) -> Result<(), Box<dyn Error>> {
    let Roundtrip { input } = options;

    let original = std::fs::read(&input)?;
    let reader = LrleReader::new(&original[..])?;

    let start = Instant::now();
    let levels = reader
        .mips()
        .map(|mip| Ok((mip.width, mip.height, mip.decode_to_vec()?)))
        .collect::<Result<Vec<_>, lrle::DecodeError>>()?;
    log::info!("decoded {} mips in {:?}", levels.len(), start.elapsed());

    let start = Instant::now();
    let mut writer = LrleWriter::with_config(WriterConfig {
        format: match reader.format() {
            LrleFormat::Legacy => FormatSelection::Legacy,
            LrleFormat::Paletted => FormatSelection::Paletted,
        },
        ..WriterConfig::default()
    });
    for (width, height, pixels) in &levels {
        writer.add_mip(*width, *height, pixels)?;
    }
    let reencoded = writer.write_to_vec()?;
    log::info!("re-encoded in {:?}", start.elapsed());

    let start = Instant::now();
    let reread = LrleReader::new(&reencoded[..])?;
    let mut identical = reread.mip_count() == levels.len();
    for (mip, (_, _, pixels)) in reread.mips().zip(&levels) {
        if mip.decode_to_vec()? != *pixels {
            println!("mip {} differs after re-encoding", mip.index);
            identical = false;
        }
    }
    log::info!("decoded re-encoded file in {:?}", start.elapsed());

    println!(
        "original: {} bytes, re-encoded: {} bytes",
        original.len(),
        reencoded.len()
    );

    if !identical {
        return Err("pixels changed after re-encoding".into());
    }
    println!("All {} mips are identical", levels.len());

    Ok(())
}

fn rgba_to_argb(image: &RgbaImage) -> Vec<u8> {
    image
        .pixels()
        .flat_map(|&Rgba([r, g, b, a])| [b, g, r, a])
        .collect()
}

fn argb_to_rgba(width: u16, height: u16, mut pixels: Vec<u8>) -> Option<RgbaImage> {
    for pixel in pixels.chunks_exact_mut(4) {
        pixel.swap(0, 2);
    }
    RgbaImage::from_vec(u32::from(width), u32::from(height), pixels)
}

fn rgba_hex(color: u32) -> String {
    let [a, r, g, b] = split_argb(color);
    format!("#{r:02X}{g:02X}{b:02X}{a:02X}")
}

fn save(image: RgbaImage, path: &str, format: Format) -> Result<(), Box<dyn Error>> {
    match format {
        // no alpha channel
        Format::Jpg => DynamicImage::ImageRgba8(image)
            .into_rgb8()
            .save_with_format(path, ImageFormat::Jpeg)?,
        Format::Png | Format::Bmp => image.save_with_format(path, format.image_format())?,
    }
    Ok(())
}
