//! Raw scalar content produced by the readers.
//!
//! These types carry exactly what the encodings carry. Nothing here converts
//! between domains (ints to decimals, symbols to text) because that belongs to
//! layers above the raw readers.

use core::fmt;

use num_bigint::{BigInt, BigUint, Sign};
use num_traits::{ToPrimitive, Zero};

use crate::ErrorKind;

/// The thirteen value kinds shared by both encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum IonType {
    /// The untyped `null`.
    Null,
    /// `true` or `false`.
    Bool,
    /// An integer of any width.
    Int,
    /// An IEEE-754 binary float.
    Float,
    /// An arbitrary-precision base-10 number.
    Decimal,
    /// A point in time with a precision.
    Timestamp,
    /// A symbol token.
    Symbol,
    /// Unicode text.
    String,
    /// Bytes meant to be read as text in an unknown encoding.
    Clob,
    /// Opaque binary data.
    Blob,
    /// An ordered collection of values.
    List,
    /// An ordered collection of values that may contain operators.
    Sexp,
    /// Named fields, possibly repeated.
    Struct,
}

impl IonType {
    /// Returns `true` for list, sexp and struct.
    #[must_use]
    pub fn is_container(self) -> bool {
        matches!(self, Self::List | Self::Sexp | Self::Struct)
    }

    /// The keyword used for this type in `null.<type>`.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::Decimal => "decimal",
            Self::Timestamp => "timestamp",
            Self::Symbol => "symbol",
            Self::String => "string",
            Self::Clob => "clob",
            Self::Blob => "blob",
            Self::List => "list",
            Self::Sexp => "sexp",
            Self::Struct => "struct",
        }
    }
}

impl fmt::Display for IonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An unresolved symbol as it appears in the input.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RawSymbol {
    /// A symbol id; binary input only ever produces these, text input
    /// produces them for `$<digits>` identifiers.
    Id(u64),
    /// Symbol text spelled out in text input.
    Text(String),
}

impl RawSymbol {
    /// The symbol id, if this symbol was written as one.
    #[must_use]
    pub fn id(&self) -> Option<u64> {
        match self {
            Self::Id(sid) => Some(*sid),
            Self::Text(_) => None,
        }
    }

    /// The literal text, if this symbol was spelled out.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Id(_) => None,
            Self::Text(text) => Some(text),
        }
    }
}

impl From<&str> for RawSymbol {
    fn from(text: &str) -> Self {
        Self::Text(text.into())
    }
}

impl From<u64> for RawSymbol {
    fn from(sid: u64) -> Self {
        Self::Id(sid)
    }
}

impl fmt::Display for RawSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(sid) => write!(f, "${sid}"),
            Self::Text(text) => f.write_str(text),
        }
    }
}

/// An integer of arbitrary width.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Int {
    /// A value that fits in an `i64`.
    I64(i64),
    /// Anything wider.
    Big(BigInt),
}

impl Int {
    /// Narrows a big integer to `I64` when it fits.
    #[must_use]
    pub fn from_bigint(value: BigInt) -> Self {
        match value.to_i64() {
            Some(small) => Self::I64(small),
            None => Self::Big(value),
        }
    }

    /// The value as an `i64`, if it fits.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::I64(value) => Some(*value),
            Self::Big(value) => value.to_i64(),
        }
    }

    /// The value as a `BigInt`.
    #[must_use]
    pub fn to_bigint(&self) -> BigInt {
        match self {
            Self::I64(value) => BigInt::from(*value),
            Self::Big(value) => value.clone(),
        }
    }
}

impl From<i64> for Int {
    fn from(value: i64) -> Self {
        Self::I64(value)
    }
}

/// A sign-magnitude decimal coefficient.
///
/// The sign is kept apart from the magnitude because the encodings
/// distinguish `-0` from `0`, and `-0d0` must survive decoding.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Coefficient {
    negative: bool,
    magnitude: BigUint,
}

impl Coefficient {
    /// Builds a coefficient from its sign and magnitude.
    #[must_use]
    pub fn new(negative: bool, magnitude: BigUint) -> Self {
        Self {
            negative,
            magnitude,
        }
    }

    /// Whether the sign is negative, including for a zero magnitude.
    #[must_use]
    pub fn is_negative(&self) -> bool {
        self.negative
    }

    /// The unsigned magnitude.
    #[must_use]
    pub fn magnitude(&self) -> &BigUint {
        &self.magnitude
    }

    /// `true` for `-0`.
    #[must_use]
    pub fn is_negative_zero(&self) -> bool {
        self.negative && self.magnitude.is_zero()
    }

    /// The signed value; `-0` collapses to `0`.
    #[must_use]
    pub fn to_bigint(&self) -> BigInt {
        let sign = if self.negative { Sign::Minus } else { Sign::Plus };
        BigInt::from_biguint(sign, self.magnitude.clone())
    }
}

impl From<i64> for Coefficient {
    fn from(value: i64) -> Self {
        Self::new(value < 0, BigUint::from(value.unsigned_abs()))
    }
}

/// `coefficient * 10^exponent`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Decimal {
    /// The signed digits.
    pub coefficient: Coefficient,
    /// Power of ten the coefficient is scaled by.
    pub exponent: i64,
}

impl Decimal {
    /// Builds a decimal from a signed coefficient and exponent.
    #[must_use]
    pub fn new(coefficient: impl Into<Coefficient>, exponent: i64) -> Self {
        Self {
            coefficient: coefficient.into(),
            exponent,
        }
    }

    /// `true` when the coefficient's magnitude is zero, whatever the sign.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.coefficient.magnitude().is_zero()
    }
}

/// The most precise timestamp component that is present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Precision {
    /// `2007T`
    Year,
    /// `2007-02T`
    Month,
    /// `2007-02-23` or `2007-02-23T`
    Day,
    /// `2007-02-23T12:14Z`
    Minute,
    /// `2007-02-23T12:14:33Z`
    Second,
    /// `2007-02-23T12:14:33.079Z`
    Fraction,
}

/// A point in time with explicit precision.
///
/// Components below `precision` hold their minimum value (`1` for month and
/// day, `0` otherwise).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Timestamp {
    /// The most precise component present.
    pub precision: Precision,
    /// Year in `1..=9999`.
    pub year: u32,
    /// Month in `1..=12`.
    pub month: u8,
    /// Day of the month, starting at `1`.
    pub day: u8,
    /// Local hour.
    pub hour: u8,
    /// Local minute.
    pub minute: u8,
    /// Whole seconds.
    pub second: u8,
    /// Fractional seconds, always `< 1`. Only set at [`Precision::Fraction`].
    pub fraction: Option<Decimal>,
    /// Offset from UTC in minutes; `None` is the unknown offset `-00:00`,
    /// which differs from `Some(0)`.
    pub offset_minutes: Option<i32>,
}

impl Timestamp {
    /// A year-precision timestamp with an unknown offset.
    #[must_use]
    pub fn with_year(year: u32) -> Self {
        Self {
            precision: Precision::Year,
            year,
            month: 1,
            day: 1,
            hour: 0,
            minute: 0,
            second: 0,
            fraction: None,
            offset_minutes: None,
        }
    }

    pub(crate) fn validate(&self) -> Result<(), ErrorKind> {
        if self.year == 0 || self.year > 9999 {
            return Err(ErrorKind::InvalidValue("timestamp year out of range"));
        }
        if !(1..=12).contains(&self.month) {
            return Err(ErrorKind::InvalidValue("timestamp month out of range"));
        }
        if self.day == 0 || self.day > days_in_month(self.year, self.month) {
            return Err(ErrorKind::InvalidValue("timestamp day out of range"));
        }
        if self.hour > 23 || self.minute > 59 || self.second > 59 {
            return Err(ErrorKind::InvalidValue("timestamp time out of range"));
        }
        if self.offset_minutes.is_some_and(|offset| offset.abs() >= 24 * 60) {
            return Err(ErrorKind::InvalidValue("timestamp offset out of range"));
        }
        if let Some(fraction) = &self.fraction {
            if fraction.coefficient.is_negative() && !fraction.is_zero() {
                return Err(ErrorKind::InvalidValue("negative timestamp fraction"));
            }
            if fraction.exponent >= 0 && !fraction.is_zero() {
                return Err(ErrorKind::InvalidValue("timestamp fraction is not below 1"));
            }
            if fraction.exponent < 0 {
                let digits = fraction.coefficient.magnitude().to_string().len();
                if u64::try_from(digits).unwrap_or(u64::MAX) > fraction.exponent.unsigned_abs() {
                    return Err(ErrorKind::InvalidValue("timestamp fraction is not below 1"));
                }
            }
        }
        Ok(())
    }
}

pub(crate) fn days_in_month(year: u32, month: u8) -> u8 {
    match month {
        2 if (year % 4 == 0 && year % 100 != 0) || year % 400 == 0 => 29,
        2 => 28,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}
