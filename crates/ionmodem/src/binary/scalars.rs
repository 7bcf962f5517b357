//! Scalar body decoding.
//!
//! Each function receives exactly the body bytes of one value, so the slice
//! bounds act as the value's length limit: a field that would run past the
//! declared length fails with `UnexpectedEndOfInput`.

use num_bigint::{BigInt, BigUint, Sign};
use num_traits::Zero;

use super::varint::{ByteSource, decode_var_int, decode_var_int_offset, decode_var_uint};
use crate::value::days_in_month;
use crate::{Coefficient, Decimal, ErrorKind, Int, Precision, Timestamp};

/// Decodes the magnitude bytes of a positive or negative int.
pub(crate) fn decode_int(negative: bool, bytes: &[u8]) -> Result<Int, ErrorKind> {
    if bytes.len() <= 8 {
        let magnitude = bytes.iter().fold(0u64, |acc, &b| (acc << 8) | u64::from(b));
        if negative && magnitude == 0 {
            return Err(ErrorKind::InvalidValue("negative zero int"));
        }
        if let Ok(small) = i64::try_from(magnitude) {
            return Ok(Int::I64(if negative { -small } else { small }));
        }
        if negative && magnitude == 1 << 63 {
            return Ok(Int::I64(i64::MIN));
        }
    }
    let magnitude = BigUint::from_bytes_be(bytes);
    if negative && magnitude.is_zero() {
        return Err(ErrorKind::InvalidValue("negative zero int"));
    }
    let sign = if negative { Sign::Minus } else { Sign::Plus };
    Ok(Int::from_bigint(BigInt::from_biguint(sign, magnitude)))
}

/// Decodes a big-endian IEEE-754 float of 0, 4 or 8 bytes.
pub(crate) fn decode_float(bytes: &[u8]) -> Result<f64, ErrorKind> {
    match *bytes {
        [] => Ok(0.0),
        [a, b, c, d] => Ok(f64::from(f32::from_be_bytes([a, b, c, d]))),
        [a, b, c, d, e, f, g, h] => Ok(f64::from_be_bytes([a, b, c, d, e, f, g, h])),
        _ => Err(ErrorKind::InvalidValue("float must be 0, 4 or 8 bytes")),
    }
}

/// Decodes a symbol id, an unsigned big-endian integer.
pub(crate) fn decode_symbol_id(bytes: &[u8]) -> Result<u64, ErrorKind> {
    if bytes.len() > 8 {
        return Err(ErrorKind::IntegerOverflow { bits: 64 });
    }
    Ok(bytes.iter().fold(0u64, |acc, &b| (acc << 8) | u64::from(b)))
}

/// Decodes a sign-magnitude coefficient: the high bit of the first byte is
/// the sign, everything else the magnitude. A set sign bit over a zero
/// magnitude is `-0`.
pub(crate) fn decode_coefficient(bytes: &[u8]) -> Coefficient {
    let Some((&first, rest)) = bytes.split_first() else {
        return Coefficient::new(false, BigUint::zero());
    };
    let mut magnitude = Vec::with_capacity(bytes.len());
    magnitude.push(first & 0x7F);
    magnitude.extend_from_slice(rest);
    Coefficient::new(first & 0x80 != 0, BigUint::from_bytes_be(&magnitude))
}

/// Decodes a decimal: a VarInt exponent followed by a coefficient filling
/// the rest of the body. An empty body is `0d0`.
pub(crate) fn decode_decimal(mut bytes: &[u8]) -> Result<Decimal, ErrorKind> {
    if bytes.is_empty() {
        return Ok(Decimal::new(0, 0));
    }
    let exponent = decode_var_int(&mut bytes, 64)?;
    Ok(Decimal {
        coefficient: decode_coefficient(bytes),
        exponent,
    })
}

/// Decodes a timestamp and converts its UTC fields to local time.
///
/// Layout: offset (VarInt, `-0` for unknown), year, then optionally month,
/// day, hour and minute (together), second, and a fraction made of a VarInt
/// exponent and a coefficient. Precision is the last component present.
pub(crate) fn decode_timestamp(mut bytes: &[u8]) -> Result<Timestamp, ErrorKind> {
    let src = &mut bytes;
    let offset = decode_var_int_offset(src, 32)?;
    let mut ts = Timestamp::with_year(narrow(decode_var_uint(src, 32)?)?);
    if !src.is_empty() {
        ts.month = narrow(decode_var_uint(src, 32)?)?;
        ts.precision = Precision::Month;
    }
    if !src.is_empty() {
        ts.day = narrow(decode_var_uint(src, 32)?)?;
        ts.precision = Precision::Day;
    }
    if !src.is_empty() {
        ts.hour = narrow(decode_var_uint(src, 32)?)?;
        ts.minute = narrow(decode_var_uint(src, 32)?)?;
        ts.precision = Precision::Minute;
    }
    if !src.is_empty() {
        ts.second = narrow(decode_var_uint(src, 32)?)?;
        ts.precision = Precision::Second;
    }
    if !src.is_empty() {
        let exponent = decode_var_int(src, 64)?;
        ts.fraction = Some(Decimal {
            coefficient: decode_coefficient(src),
            exponent,
        });
        ts.precision = Precision::Fraction;
    }

    if ts.precision >= Precision::Minute {
        ts.offset_minutes = offset
            .map(|minutes| i32::try_from(minutes).map_err(|_| src.overflow(32)))
            .transpose()?;
    }
    ts.validate()?;
    if let Some(offset) = ts.offset_minutes {
        utc_to_local(&mut ts, offset);
    }
    Ok(ts)
}

fn narrow<T: TryFrom<u64>>(value: u64) -> Result<T, ErrorKind> {
    T::try_from(value).map_err(|_| ErrorKind::InvalidValue("timestamp field out of range"))
}

/// Shifts validated UTC fields by `offset` minutes. Offsets are below one
/// day, so the date moves by at most one day.
#[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn utc_to_local(ts: &mut Timestamp, offset: i32) {
    let minutes = i32::from(ts.hour) * 60 + i32::from(ts.minute) + offset;
    let day_shift = minutes.div_euclid(24 * 60);
    let minutes = minutes.rem_euclid(24 * 60);
    ts.hour = (minutes / 60) as u8;
    ts.minute = (minutes % 60) as u8;
    match day_shift {
        1 if ts.day == days_in_month(ts.year, ts.month) => {
            ts.day = 1;
            if ts.month == 12 {
                ts.month = 1;
                ts.year += 1;
            } else {
                ts.month += 1;
            }
        }
        1 => ts.day += 1,
        -1 if ts.day == 1 => {
            if ts.month == 1 {
                ts.month = 12;
                ts.year -= 1;
            } else {
                ts.month -= 1;
            }
            ts.day = days_in_month(ts.year, ts.month);
        }
        -1 => ts.day -= 1,
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(false, &[], 0)]
    #[case(false, &[0x01], 1)]
    #[case(true, &[0x01], -1)]
    #[case(false, &[0x01, 0x00], 256)]
    #[case(true, &[0x80, 0, 0, 0, 0, 0, 0, 0], i64::MIN)]
    #[case(false, &[0x7F, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF], i64::MAX)]
    fn small_ints(#[case] negative: bool, #[case] bytes: &[u8], #[case] expected: i64) {
        assert_eq!(decode_int(negative, bytes).unwrap(), Int::I64(expected));
    }

    #[test]
    fn big_ints() {
        let value = decode_int(false, &[0x80, 0, 0, 0, 0, 0, 0, 0]).unwrap();
        assert_eq!(value, Int::Big(BigInt::from(1u64 << 63)));
        let value = decode_int(true, &[0x01, 0, 0, 0, 0, 0, 0, 0, 0]).unwrap();
        assert_eq!(value, Int::Big(-BigInt::from(1u128 << 64)));
        // Leading zero padding narrows back down.
        let value = decode_int(false, &[0, 0, 0, 0, 0, 0, 0, 0, 0x05]).unwrap();
        assert_eq!(value, Int::I64(5));
    }

    #[test]
    fn negative_zero_int_is_invalid() {
        assert!(matches!(
            decode_int(true, &[]),
            Err(ErrorKind::InvalidValue(_))
        ));
        assert!(matches!(
            decode_int(true, &[0; 12]),
            Err(ErrorKind::InvalidValue(_))
        ));
    }

    #[test]
    fn floats() {
        assert_eq!(decode_float(&[]).unwrap(), 0.0);
        assert_eq!(decode_float(&1.5f32.to_be_bytes()).unwrap(), 1.5);
        assert_eq!(decode_float(&(-2.25f64).to_be_bytes()).unwrap(), -2.25);
    }

    #[test]
    fn decimal_negative_zero_coefficient() {
        // exponent 0, coefficient 0x80: sign set, magnitude zero
        let value = decode_decimal(&[0x80, 0x80]).unwrap();
        assert_eq!(value.exponent, 0);
        assert!(value.coefficient.is_negative_zero());
        // An absent coefficient is positive zero.
        let value = decode_decimal(&[0xC2]).unwrap();
        assert_eq!(value.exponent, -2);
        assert!(!value.coefficient.is_negative());
        assert!(value.is_zero());
    }

    #[test]
    fn decimal_with_coefficient() {
        // 1.23 = 123 * 10^-2
        let value = decode_decimal(&[0xC2, 0x7B]).unwrap();
        assert_eq!(value, Decimal::new(123, -2));
        let value = decode_decimal(&[0xC2, 0xFB]).unwrap();
        assert_eq!(value, Decimal::new(-123, -2));
    }

    #[test]
    fn decimal_exponent_past_body_is_end_of_input() {
        assert!(matches!(
            decode_decimal(&[0x01, 0x02]),
            Err(ErrorKind::UnexpectedEndOfInput)
        ));
    }

    #[test]
    fn timestamp_precisions() {
        // offset unknown, year 2000
        let ts = decode_timestamp(&[0xC0, 0x0F, 0xD0]).unwrap();
        assert_eq!(ts.precision, Precision::Year);
        assert_eq!(ts.year, 2000);
        assert_eq!(ts.offset_minutes, None);

        let ts = decode_timestamp(&[0xC0, 0x0F, 0xD0, 0x82, 0x83]).unwrap();
        assert_eq!(ts.precision, Precision::Day);
        assert_eq!((ts.month, ts.day), (2, 3));

        // UTC, 2000-01-01T12:30:45.25Z
        let ts = decode_timestamp(&[
            0x80, 0x0F, 0xD0, 0x81, 0x81, 0x8C, 0x9E, 0xAD, 0xC2, 0x19,
        ])
        .unwrap();
        assert_eq!(ts.precision, Precision::Fraction);
        assert_eq!((ts.hour, ts.minute, ts.second), (12, 30, 45));
        assert_eq!(ts.fraction, Some(Decimal::new(25, -2)));
        assert_eq!(ts.offset_minutes, Some(0));
    }

    #[test]
    fn timestamp_unknown_offset_differs_from_utc() {
        let unknown = decode_timestamp(&[0xC0, 0x0F, 0xD0, 0x81, 0x81, 0x80, 0x80]).unwrap();
        let utc = decode_timestamp(&[0x80, 0x0F, 0xD0, 0x81, 0x81, 0x80, 0x80]).unwrap();
        assert_eq!(unknown.offset_minutes, None);
        assert_eq!(utc.offset_minutes, Some(0));
        assert_ne!(unknown, utc);
    }

    #[test]
    fn timestamp_fields_are_shifted_to_local_time() {
        // 2000-01-01T00:30Z written with offset -01:00 is 1999-12-31T23:30-01:00
        let ts = decode_timestamp(&[0xFC, 0x0F, 0xD0, 0x81, 0x81, 0x80, 0x9E]).unwrap();
        assert_eq!(ts.offset_minutes, Some(-60));
        assert_eq!(
            (ts.year, ts.month, ts.day, ts.hour, ts.minute),
            (1999, 12, 31, 23, 30)
        );

        // 2024-02-28T23:00Z at +02:00 is 2024-02-29T01:00+02:00
        let ts = decode_timestamp(&[0x00, 0xF8, 0x0F, 0xE8, 0x82, 0x9C, 0x97, 0x80]).unwrap();
        assert_eq!(ts.offset_minutes, Some(120));
        assert_eq!((ts.month, ts.day, ts.hour), (2, 29, 1));
    }

    #[test]
    fn timestamp_hour_without_minute_is_truncated() {
        assert!(matches!(
            decode_timestamp(&[0x80, 0x0F, 0xD0, 0x81, 0x81, 0x8C]),
            Err(ErrorKind::UnexpectedEndOfInput)
        ));
    }

    #[test]
    fn timestamp_month_out_of_range() {
        assert!(matches!(
            decode_timestamp(&[0xC0, 0x0F, 0xD0, 0x8D]),
            Err(ErrorKind::InvalidValue(_))
        ));
    }
}
