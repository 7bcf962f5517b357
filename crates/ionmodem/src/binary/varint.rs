//! Variable-length integers of the binary encoding.
//!
//! Both forms are big-endian runs of 7-bit groups. The *last* byte of a run
//! has its high bit set; every earlier byte has it clear.
//!
//! ```text
//! VarUInt   0vvvvvvv 0vvvvvvv ... 1vvvvvvv
//! VarInt    0svvvvvv 0vvvvvvv ... 1vvvvvvv    (single byte: 1svvvvvv)
//! ```
//!
//! The sign bit `s` of a VarInt lives in the first byte, so a VarInt can
//! spell `-0`. Timestamp offsets use that to encode the unknown offset, see
//! [`decode_var_int_offset`].

use crate::ErrorKind;

const END_FLAG: u8 = 0x80;
const SIGN_FLAG: u8 = 0x40;

/// A source of bytes for the variable-length decoders.
pub trait ByteSource {
    /// Failure type of the source.
    type Error;

    /// Consumes the next byte, failing at the end of the source.
    fn next_byte(&mut self) -> Result<u8, Self::Error>;

    /// The error reported when a value does not fit in `bits` bits.
    fn overflow(&self, bits: u32) -> Self::Error;
}

impl ByteSource for &[u8] {
    type Error = ErrorKind;

    fn next_byte(&mut self) -> Result<u8, ErrorKind> {
        let (&first, rest) = self
            .split_first()
            .ok_or(ErrorKind::UnexpectedEndOfInput)?;
        *self = rest;
        Ok(first)
    }

    fn overflow(&self, bits: u32) -> ErrorKind {
        ErrorKind::IntegerOverflow { bits }
    }
}

/// Decodes a VarUInt that must fit in `bits` bits (at most 64).
///
/// # Errors
///
/// `IntegerOverflow` from [`ByteSource::overflow`] once the value exceeds the
/// width, and whatever the source reports when it runs dry.
pub fn decode_var_uint<S: ByteSource + ?Sized>(src: &mut S, bits: u32) -> Result<u64, S::Error> {
    debug_assert!((7..=64).contains(&bits));
    let mut value: u64 = 0;
    loop {
        let byte = src.next_byte()?;
        if value >> (bits - 7) != 0 {
            return Err(src.overflow(bits));
        }
        value = (value << 7) | u64::from(byte & 0x7F);
        if byte & END_FLAG != 0 {
            return Ok(value);
        }
    }
}

/// Decodes a VarInt into its sign and magnitude. The magnitude must fit a
/// signed `bits`-bit integer of that sign.
fn decode_var_int_parts<S: ByteSource + ?Sized>(
    src: &mut S,
    bits: u32,
) -> Result<(bool, u64), S::Error> {
    debug_assert!((8..=64).contains(&bits));
    let first = src.next_byte()?;
    let negative = first & SIGN_FLAG != 0;
    let mut magnitude = u64::from(first & 0x3F);
    let mut last = first;
    while last & END_FLAG == 0 {
        last = src.next_byte()?;
        if magnitude >> (bits - 7) != 0 {
            return Err(src.overflow(bits));
        }
        magnitude = (magnitude << 7) | u64::from(last & 0x7F);
    }
    let limit = 1u64 << (bits - 1);
    if magnitude > limit || (magnitude == limit && !negative) {
        return Err(src.overflow(bits));
    }
    Ok((negative, magnitude))
}

/// Decodes a VarInt that must fit in a signed `bits`-bit integer. `-0`
/// decodes as `0`.
pub fn decode_var_int<S: ByteSource + ?Sized>(src: &mut S, bits: u32) -> Result<i64, S::Error> {
    let (negative, magnitude) = decode_var_int_parts(src, bits)?;
    Ok(signed(negative, magnitude))
}

/// Decodes a VarInt, returning `None` for `-0`.
///
/// Used for timestamp offsets, where `-0` is the unknown offset and `0` is
/// UTC.
pub fn decode_var_int_offset<S: ByteSource + ?Sized>(
    src: &mut S,
    bits: u32,
) -> Result<Option<i64>, S::Error> {
    let (negative, magnitude) = decode_var_int_parts(src, bits)?;
    if negative && magnitude == 0 {
        return Ok(None);
    }
    Ok(Some(signed(negative, magnitude)))
}

#[expect(clippy::cast_possible_wrap)]
fn signed(negative: bool, magnitude: u64) -> i64 {
    // A magnitude of 2^63 only reaches here negative and wraps to i64::MIN.
    let value = magnitude as i64;
    if negative { value.wrapping_neg() } else { value }
}

/// Appends the VarUInt encoding of `value`.
pub fn encode_var_uint(value: u64, out: &mut Vec<u8>) {
    let groups = (64 - value.leading_zeros()).div_ceil(7).max(1);
    for i in (0..groups).rev() {
        #[expect(clippy::cast_possible_truncation)]
        let mut byte = ((value >> (7 * i)) & 0x7F) as u8;
        if i == 0 {
            byte |= END_FLAG;
        }
        out.push(byte);
    }
}

/// Appends the VarInt encoding of `value`.
pub fn encode_var_int(value: i64, out: &mut Vec<u8>) {
    encode_var_int_parts(value < 0, value.unsigned_abs(), out);
}

/// Appends the one-byte VarInt `-0`.
pub fn encode_negative_zero(out: &mut Vec<u8>) {
    encode_var_int_parts(true, 0, out);
}

fn encode_var_int_parts(negative: bool, magnitude: u64, out: &mut Vec<u8>) {
    let significant = 64 - magnitude.leading_zeros();
    // First byte carries 6 bits, every following byte 7.
    let extra = significant.saturating_sub(6).div_ceil(7);
    let sign = if negative { SIGN_FLAG } else { 0 };
    #[expect(clippy::cast_possible_truncation)]
    let mut first = ((magnitude >> (7 * extra)) & 0x3F) as u8 | sign;
    if extra == 0 {
        first |= END_FLAG;
    }
    out.push(first);
    for i in (0..extra).rev() {
        #[expect(clippy::cast_possible_truncation)]
        let mut byte = ((magnitude >> (7 * i)) & 0x7F) as u8;
        if i == 0 {
            byte |= END_FLAG;
        }
        out.push(byte);
    }
}
