use crate::{
    consts::*,
    packed::write_packed,
    runs::{PixelRun, RunGroup},
};
use itertools::Itertools;

pub(super) fn encode_group(out: &mut Vec<u8>, group: &RunGroup) {
    match group {
        RunGroup::Repeat(run) => encode_repeat(out, *run),
        RunGroup::Literal(colors) => {
            for batch in colors.chunks(LEGACY_MAX_SEQUENCE) {
                encode_sequence(out, batch);
            }
        }
    }
}

fn encode_repeat(out: &mut Vec<u8>, run: PixelRun) {
    let length = u64::from(run.length);

    if run.color == 0 {
        write_packed(out, length, LEGACY_OP_BLANK_REPEAT, LEGACY_LENGTH_START_BIT);
    } else {
        write_packed(out, length, LEGACY_OP_INLINE_REPEAT, LEGACY_LENGTH_START_BIT);
        out.extend_from_slice(&run.color.to_le_bytes());
    }
}

/// Encodes up to 63 single pixels, as an embedded RLE if that is not larger than inline colors.
fn encode_sequence(out: &mut Vec<u8>, colors: &[u32]) {
    debug_assert!(!colors.is_empty() && colors.len() <= LEGACY_MAX_SEQUENCE);

    let count = colors.len() as u8;
    let inline_len = colors.len() * 4;

    let mut embedded = Vec::with_capacity(inline_len);
    encode_planes(&mut embedded, colors);

    if embedded.len() <= inline_len {
        out.push(count << 2 | LEGACY_OP_EMBEDDED_RLE);
        out.extend_from_slice(&embedded);
    } else {
        out.push(count << 2 | LEGACY_OP_INLINE_SEQUENCE);
        for color in colors {
            out.extend_from_slice(&color.to_le_bytes());
        }
    }
}

/// Splits the colors into four byte planes and run-length encodes them as one stream.
pub(crate) fn encode_planes(out: &mut Vec<u8>, colors: &[u32]) {
    let count = colors.len();
    let mut planes = [0u8; 4 * LEGACY_MAX_SEQUENCE];
    let planes = &mut planes[..4 * count];
    for (i, color) in colors.iter().enumerate() {
        for (plane, byte) in color.to_le_bytes().into_iter().enumerate() {
            planes[plane * count + i] = byte;
        }
    }

    let mut literal = Vec::new();
    for (len, byte) in planes.iter().copied().dedup_with_count() {
        // zeros inside a literal are cheaper to copy than to split the literal around
        let skip = byte == 0 && (len >= 2 || literal.is_empty());
        let repeat = byte != 0 && len >= 3;

        if skip {
            flush_literal(out, &mut literal);
            write_packed(out, len as u64, EMBEDDED_OP_SKIP, EMBEDDED_RUN_START_BIT);
        } else if repeat {
            flush_literal(out, &mut literal);
            write_packed(out, len as u64, EMBEDDED_OP_REPEAT, EMBEDDED_RUN_START_BIT);
            out.push(byte);
        } else {
            literal.extend(core::iter::repeat(byte).take(len));
        }
    }
    flush_literal(out, &mut literal);
}

fn flush_literal(out: &mut Vec<u8>, literal: &mut Vec<u8>) {
    if literal.is_empty() {
        return;
    }

    write_packed(
        out,
        literal.len() as u64,
        EMBEDDED_OP_LITERAL,
        EMBEDDED_LITERAL_START_BIT,
    );
    out.append(literal);
}
