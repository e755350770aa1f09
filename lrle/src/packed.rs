//! Self-delimiting integers with a few low bits reserved for a command tag.
//!
//! A packed value is `flag | (number << start_bit)`, written 7 bits at a time starting with the
//! least significant group. Every byte except the last has its high bit set.

use crate::decode::{DecodeError, PackedIntOverflowSnafu, UnexpectedEofSnafu};
use byteorder::ReadBytesExt;
use snafu::{ensure, ResultExt};

const CONTINUATION: u8 = 0b1000_0000;
const PAYLOAD: u8 = 0b0111_1111;

/// Appends `number` tagged with `flag` in its low `start_bit` bits.
///
/// At least one byte is always written, even for a zero value.
pub fn write_packed(out: &mut Vec<u8>, number: u64, flag: u8, start_bit: u8) {
    debug_assert!(u64::from(flag) < 1 << start_bit, "flag does not fit in start_bit");

    let mut value = u64::from(flag) | (number << start_bit);
    loop {
        let byte = (value as u8) & PAYLOAD;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | CONTINUATION);
    }
}

/// Number of bytes [`write_packed`] emits for the same arguments.
pub fn packed_len(number: u64, flag: u8, start_bit: u8) -> usize {
    let value = u64::from(flag) | (number << start_bit);
    let bits = (u64::BITS - value.leading_zeros()) as usize;
    ((bits + 6) / 7).max(1)
}

/// Reads a full packed value, including the tag bits.
pub fn read_packed(input: &mut &[u8]) -> Result<u64, DecodeError> {
    let first = input.read_u8().context(UnexpectedEofSnafu)?;
    read_packed_from(first, input)
}

/// Reads a packed value whose first byte was already taken from `input`.
pub fn read_packed_from(first: u8, input: &mut &[u8]) -> Result<u64, DecodeError> {
    let mut value = u64::from(first & PAYLOAD);
    let mut byte = first;
    let mut shift = 7;

    while byte & CONTINUATION != 0 {
        ensure!(shift < u64::BITS, PackedIntOverflowSnafu);

        byte = input.read_u8().context(UnexpectedEofSnafu)?;
        value |= u64::from(byte & PAYLOAD) << shift;
        shift += 7;
    }

    Ok(value)
}

/// Splits a raw packed value into `(number, flag)`.
#[inline]
pub const fn unpack(value: u64, start_bit: u8) -> (u64, u8) {
    let mask = (1u64 << start_bit) - 1;
    (value >> start_bit, (value & mask) as u8)
}
