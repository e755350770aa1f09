use super::{
    run_length, DecodeError, DecodeOutput, PaletteIndexOutOfRangeSnafu, UnexpectedEofSnafu,
    UnsupportedCommandSnafu,
};
use crate::{
    consts::*,
    packed::{read_packed, read_packed_from, unpack},
    runs::PixelRun,
};
use byteorder::{LittleEndian, ReadBytesExt};
use snafu::{OptionExt, ResultExt};

pub(super) fn decode_chunk<O: DecodeOutput + ?Sized>(
    input: &mut &[u8],
    palette: &[u32],
    output: &mut O,
) -> Result<(), DecodeError> {
    let command = input.read_u8().context(UnexpectedEofSnafu)?;
    let value = read_packed_from(command, input)?;

    if command & 1 == PALETTED_OP_REPEAT {
        let (length, flags) = unpack(value, PALETTED_REPEAT_START_BIT);
        let color = match flags >> 1 {
            PALETTED_SRC_BYTE_INDEX => {
                let index = input.read_u8().context(UnexpectedEofSnafu)?;
                palette_color(palette, u64::from(index))?
            }
            PALETTED_SRC_SHORT_INDEX => {
                let index = input
                    .read_u16::<LittleEndian>()
                    .context(UnexpectedEofSnafu)?;
                palette_color(palette, u64::from(index))?
            }
            PALETTED_SRC_INLINE => input
                .read_u32::<LittleEndian>()
                .context(UnexpectedEofSnafu)?,
            _ => return UnsupportedCommandSnafu { command }.fail(),
        };

        output.write_run(PixelRun::new(color, run_length(length)))
    } else {
        let (count, flags) = unpack(value, PALETTED_SEQUENCE_START_BIT);
        let inline = flags >> 1 == PALETTED_SEQ_INLINE;

        for _ in 0..count {
            let color = if inline {
                input
                    .read_u32::<LittleEndian>()
                    .context(UnexpectedEofSnafu)?
            } else {
                palette_color(palette, read_packed(input)?)?
            };
            output.write_run(PixelRun::single(color))?;
        }

        Ok(())
    }
}

#[inline]
fn palette_color(palette: &[u32], index: u64) -> Result<u32, DecodeError> {
    usize::try_from(index)
        .ok()
        .and_then(|i| palette.get(i))
        .copied()
        .context(PaletteIndexOutOfRangeSnafu {
            index,
            len: palette.len(),
        })
}
