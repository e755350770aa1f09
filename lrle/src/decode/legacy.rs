use super::{run_length, DecodeError, DecodeOutput, EmbeddedRleOverflowSnafu, UnexpectedEofSnafu};
use crate::{
    consts::*,
    packed::{read_packed, read_packed_from, unpack},
    runs::PixelRun,
};
use byteorder::{LittleEndian, ReadBytesExt};
use snafu::{OptionExt, ResultExt};
use std::io::Read;

pub(super) fn decode_chunk<O: DecodeOutput + ?Sized>(
    input: &mut &[u8],
    output: &mut O,
) -> Result<(), DecodeError> {
    let command = input.read_u8().context(UnexpectedEofSnafu)?;

    match command & 0b11 {
        LEGACY_OP_BLANK_REPEAT => {
            let (length, _) = unpack(read_packed_from(command, input)?, LEGACY_LENGTH_START_BIT);
            output.write_run(PixelRun::new(0, run_length(length)))
        }
        LEGACY_OP_INLINE_REPEAT => {
            let (length, _) = unpack(read_packed_from(command, input)?, LEGACY_LENGTH_START_BIT);
            let color = input
                .read_u32::<LittleEndian>()
                .context(UnexpectedEofSnafu)?;
            output.write_run(PixelRun::new(color, run_length(length)))
        }
        LEGACY_OP_INLINE_SEQUENCE => {
            for _ in 0..command >> 2 {
                let color = input
                    .read_u32::<LittleEndian>()
                    .context(UnexpectedEofSnafu)?;
                output.write_run(PixelRun::single(color))?;
            }
            Ok(())
        }
        LEGACY_OP_EMBEDDED_RLE => decode_embedded(usize::from(command >> 2), input, output),
        _ => unreachable!(),
    }
}

fn decode_embedded<O: DecodeOutput + ?Sized>(
    count: usize,
    input: &mut &[u8],
    output: &mut O,
) -> Result<(), DecodeError> {
    let mut buffer = [0u8; 4 * LEGACY_MAX_SEQUENCE];
    let planes = &mut buffer[..4 * count];
    let mut position = 0;

    while position < planes.len() {
        let value = read_packed(input)?;
        let remaining = planes.len() - position;

        if value & u64::from(EMBEDDED_OP_LITERAL) != 0 {
            let (len, _) = unpack(value, EMBEDDED_LITERAL_START_BIT);
            let len = plane_len(len, remaining)?;
            input
                .read_exact(&mut planes[position..position + len])
                .context(UnexpectedEofSnafu)?;
            position += len;
        } else if value & u64::from(EMBEDDED_OP_REPEAT) != 0 {
            let (len, _) = unpack(value, EMBEDDED_RUN_START_BIT);
            let len = plane_len(len, remaining)?;
            let byte = input.read_u8().context(UnexpectedEofSnafu)?;
            planes[position..position + len].fill(byte);
            position += len;
        } else {
            // skipped bytes stay zero
            let (len, _) = unpack(value, EMBEDDED_RUN_START_BIT);
            position += plane_len(len, remaining)?;
        }
    }

    for i in 0..count {
        let color = u32::from_le_bytes([
            planes[i],
            planes[i + count],
            planes[i + 2 * count],
            planes[i + 3 * count],
        ]);
        output.write_run(PixelRun::single(color))?;
    }

    Ok(())
}

#[inline]
fn plane_len(len: u64, remaining: usize) -> Result<usize, DecodeError> {
    usize::try_from(len)
        .ok()
        .filter(|&len| len <= remaining)
        .context(EmbeddedRleOverflowSnafu)
}
