use crate::{
    consts::*,
    packed::write_packed,
    runs::{PixelRun, RunGroup},
};

/// Encodes one run group. `index_of` yields the palette index to use for a color, if any.
pub(super) fn encode_group(
    out: &mut Vec<u8>,
    group: &RunGroup,
    index_of: &impl Fn(u32) -> Option<u16>,
) {
    match group {
        RunGroup::Repeat(run) => encode_repeat(out, *run, index_of(run.color)),
        RunGroup::Literal(colors) => encode_sequences(out, colors, index_of),
    }
}

fn encode_repeat(out: &mut Vec<u8>, run: PixelRun, index: Option<u16>) {
    let length = u64::from(run.length);
    let tag = |source: u8| PALETTED_OP_REPEAT | source << 1;

    match index {
        Some(index) if index <= u16::from(u8::MAX) => {
            write_packed(out, length, tag(PALETTED_SRC_BYTE_INDEX), PALETTED_REPEAT_START_BIT);
            out.push(index as u8);
        }
        Some(index) => {
            write_packed(out, length, tag(PALETTED_SRC_SHORT_INDEX), PALETTED_REPEAT_START_BIT);
            out.extend_from_slice(&index.to_le_bytes());
        }
        None => {
            write_packed(out, length, tag(PALETTED_SRC_INLINE), PALETTED_REPEAT_START_BIT);
            out.extend_from_slice(&run.color.to_le_bytes());
        }
    }
}

/// Splits the colors into stretches that are all indexed or all inline, one command each.
fn encode_sequences(out: &mut Vec<u8>, colors: &[u32], index_of: &impl Fn(u32) -> Option<u16>) {
    let indices = colors.iter().map(|&color| index_of(color)).collect::<Vec<_>>();

    let mut start = 0;
    while start < colors.len() {
        let indexed = indices[start].is_some();
        let count = indices[start..]
            .iter()
            .take_while(|index| index.is_some() == indexed)
            .count();
        let end = start + count;

        let source = if indexed {
            PALETTED_SEQ_INDEXED
        } else {
            PALETTED_SEQ_INLINE
        };
        write_packed(
            out,
            count as u64,
            PALETTED_OP_SEQUENCE | source << 1,
            PALETTED_SEQUENCE_START_BIT,
        );

        for (&color, &index) in colors[start..end].iter().zip(&indices[start..end]) {
            match index {
                Some(index) => write_packed(out, u64::from(index), 0, 0),
                None => out.extend_from_slice(&color.to_le_bytes()),
            }
        }

        start = end;
    }
}
