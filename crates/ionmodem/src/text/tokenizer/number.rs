//! Numeric and timestamp literals.
//!
//! The tokenizer only collects the characters of a literal; everything here
//! works on that collected text.

use num_bigint::{BigInt, BigUint, Sign};

use crate::{Coefficient, Decimal, ErrorKind, Int, IonType, Precision, Timestamp};

fn invalid(what: &str, text: &str) -> ErrorKind {
    ErrorKind::InvalidToken(format!("invalid {what} {text:?}"))
}

fn split_sign(text: &str) -> (bool, &str) {
    match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    }
}

fn strip_radix(body: &str, radix: u32) -> Option<&str> {
    let (lower, upper) = match radix {
        16 => ("0x", "0X"),
        _ => ("0b", "0B"),
    };
    body.strip_prefix(lower).or_else(|| body.strip_prefix(upper))
}

/// Digits of `radix` with single underscores between them.
fn check_digits(digits: &str, radix: u32) -> bool {
    !digits.is_empty()
        && !digits.starts_with('_')
        && !digits.ends_with('_')
        && !digits.contains("__")
        && digits.chars().all(|c| c == '_' || c.is_digit(radix))
}

fn strip_underscores(digits: &str) -> String {
    digits.chars().filter(|&c| c != '_').collect()
}

/// Validates a numeric literal and tells which type it spells.
pub(crate) fn classify(text: &str) -> Result<IonType, ErrorKind> {
    let (_, body) = split_sign(text);
    for radix in [16, 2] {
        if let Some(digits) = strip_radix(body, radix) {
            return if check_digits(digits, radix) {
                Ok(IonType::Int)
            } else {
                Err(invalid("int", text))
            };
        }
    }

    let (mantissa, exponent) = match body.find(['e', 'E', 'd', 'D']) {
        Some(at) => (&body[..at], Some((&body[at..=at], &body[at + 1..]))),
        None => (body, None),
    };
    let (whole, fraction) = match mantissa.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (mantissa, None),
    };
    if !check_digits(whole, 10) || (whole.len() > 1 && whole.starts_with('0')) {
        return Err(invalid("number", text));
    }
    if fraction.is_some_and(|f| !f.is_empty() && !check_digits(f, 10)) {
        return Err(invalid("number", text));
    }
    match exponent {
        Some((marker, digits)) => {
            let digits = digits.strip_prefix(['+', '-']).unwrap_or(digits);
            if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid("exponent", text));
            }
            if marker.eq_ignore_ascii_case("e") {
                Ok(IonType::Float)
            } else {
                Ok(IonType::Decimal)
            }
        }
        None if fraction.is_some() => Ok(IonType::Decimal),
        None => Ok(IonType::Int),
    }
}

pub(crate) fn parse_int(text: &str) -> Result<Int, ErrorKind> {
    let (negative, body) = split_sign(text);
    let (radix, digits) = match (strip_radix(body, 16), strip_radix(body, 2)) {
        (Some(hex), _) => (16, hex),
        (_, Some(binary)) => (2, binary),
        _ => (10, body),
    };
    let digits = strip_underscores(digits);
    if let Ok(magnitude) = u64::from_str_radix(&digits, radix) {
        if let Ok(small) = i64::try_from(magnitude) {
            return Ok(Int::I64(if negative { -small } else { small }));
        }
    }
    let magnitude =
        BigUint::parse_bytes(digits.as_bytes(), radix).ok_or_else(|| invalid("int", text))?;
    let sign = if negative { Sign::Minus } else { Sign::Plus };
    Ok(Int::from_bigint(BigInt::from_biguint(sign, magnitude)))
}

/// Parses a decimal, keeping the sign of a zero coefficient.
pub(crate) fn parse_decimal(text: &str) -> Result<Decimal, ErrorKind> {
    let (negative, body) = split_sign(text);
    let (mantissa, exponent) = match body.find(['d', 'D']) {
        Some(at) => {
            let exponent = body[at + 1..]
                .parse::<i64>()
                .map_err(|_| invalid("decimal exponent", text))?;
            (&body[..at], exponent)
        }
        None => (body, 0),
    };
    let (whole, fraction) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    let fraction = strip_underscores(fraction);
    let mut digits = strip_underscores(whole);
    digits.push_str(&fraction);

    let magnitude =
        BigUint::parse_bytes(digits.as_bytes(), 10).ok_or_else(|| invalid("decimal", text))?;
    let scale = i64::try_from(fraction.len()).map_err(|_| invalid("decimal", text))?;
    let exponent = exponent
        .checked_sub(scale)
        .ok_or(ErrorKind::IntegerOverflow { bits: 64 })?;
    Ok(Decimal {
        coefficient: Coefficient::new(negative, magnitude),
        exponent,
    })
}

pub(crate) fn parse_float(text: &str) -> Result<f64, ErrorKind> {
    strip_underscores(text)
        .parse()
        .map_err(|_| invalid("float", text))
}

/// Cursor over the fixed-width fields of a timestamp.
struct Fields<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl Fields<'_> {
    fn eat(&mut self, byte: u8) -> bool {
        let matched = self.bytes.get(self.pos) == Some(&byte);
        if matched {
            self.pos += 1;
        }
        matched
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn done(&self) -> bool {
        self.pos == self.bytes.len()
    }

    /// Exactly `n` decimal digits.
    fn digits(&mut self, n: usize) -> Option<u32> {
        let field = self.bytes.get(self.pos..self.pos + n)?;
        let mut value = 0u32;
        for &b in field {
            if !b.is_ascii_digit() {
                return None;
            }
            value = value * 10 + u32::from(b - b'0');
        }
        self.pos += n;
        Some(value)
    }

    fn two_digits(&mut self) -> Option<u8> {
        self.digits(2).and_then(|v| u8::try_from(v).ok())
    }
}

/// Parses a timestamp literal. Fields stay in local time; the offset is
/// `None` for `-00:00` and for date-only precisions.
pub(crate) fn parse_timestamp(text: &str) -> Result<Timestamp, ErrorKind> {
    let bad = || invalid("timestamp", text);
    let mut fields = Fields {
        bytes: text.as_bytes(),
        pos: 0,
    };

    let mut ts = Timestamp::with_year(fields.digits(4).ok_or_else(bad)?);
    if fields.eat(b'T') {
        return if fields.done() { ts.validate().map(|()| ts) } else { Err(bad()) };
    }
    if !fields.eat(b'-') {
        return Err(bad());
    }
    ts.month = fields.two_digits().ok_or_else(bad)?;
    ts.precision = Precision::Month;
    if fields.eat(b'T') {
        return if fields.done() { ts.validate().map(|()| ts) } else { Err(bad()) };
    }
    if !fields.eat(b'-') {
        return Err(bad());
    }
    ts.day = fields.two_digits().ok_or_else(bad)?;
    ts.precision = Precision::Day;
    if fields.done() {
        return ts.validate().map(|()| ts);
    }
    if !fields.eat(b'T') {
        return Err(bad());
    }
    if fields.done() {
        return ts.validate().map(|()| ts);
    }

    ts.hour = fields.two_digits().ok_or_else(bad)?;
    if !fields.eat(b':') {
        return Err(bad());
    }
    ts.minute = fields.two_digits().ok_or_else(bad)?;
    ts.precision = Precision::Minute;
    if fields.eat(b':') {
        ts.second = fields.two_digits().ok_or_else(bad)?;
        ts.precision = Precision::Second;
        if fields.eat(b'.') {
            let start = fields.pos;
            while fields.peek().is_some_and(|b| b.is_ascii_digit()) {
                fields.pos += 1;
            }
            let digits = &fields.bytes[start..fields.pos];
            let magnitude = BigUint::parse_bytes(digits, 10).ok_or_else(bad)?;
            let scale = i64::try_from(digits.len()).map_err(|_| bad())?;
            ts.fraction = Some(Decimal {
                coefficient: Coefficient::new(false, magnitude),
                exponent: -scale,
            });
            ts.precision = Precision::Fraction;
        }
    }

    ts.offset_minutes = if fields.eat(b'Z') {
        Some(0)
    } else {
        let negative = match fields.peek() {
            Some(b'+') => false,
            Some(b'-') => true,
            _ => return Err(bad()),
        };
        fields.pos += 1;
        let hours = fields.digits(2).ok_or_else(bad)?;
        if !fields.eat(b':') {
            return Err(bad());
        }
        let minutes = fields.digits(2).ok_or_else(bad)?;
        let total = i32::try_from(hours * 60 + minutes).map_err(|_| bad())?;
        match (negative, total) {
            (true, 0) => None,
            (true, total) => Some(-total),
            (false, total) => Some(total),
        }
    };
    if !fields.done() {
        return Err(bad());
    }
    ts.validate()?;
    Ok(ts)
}
