//! What an unquoted identifier stands for.

use crate::{ErrorKind, IonType, RawSymbol};

/// An identifier that spells a value rather than a symbol.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Keyword {
    Null(IonType),
    Bool(bool),
    Nan,
}

const NULL_TYPES: [IonType; 13] = [
    IonType::Null,
    IonType::Bool,
    IonType::Int,
    IonType::Float,
    IonType::Decimal,
    IonType::Timestamp,
    IonType::Symbol,
    IonType::String,
    IonType::Clob,
    IonType::Blob,
    IonType::List,
    IonType::Sexp,
    IonType::Struct,
];

const NAMES: [&str; 13] = [
    "null",
    "bool",
    "int",
    "float",
    "decimal",
    "timestamp",
    "symbol",
    "string",
    "clob",
    "blob",
    "list",
    "sexp",
    "struct",
];

const MAX_LEN: usize = 9;

/// `LETTERS[i][c]` has bit `t` set when `NAMES[t]` has letter `c` at `i`.
static LETTERS: [[u16; 26]; MAX_LEN] = build_letters();

/// `LENGTHS[n]` has bit `t` set when `NAMES[t]` is `n` letters long.
static LENGTHS: [u16; MAX_LEN + 1] = build_lengths();

const fn build_letters() -> [[u16; 26]; MAX_LEN] {
    let mut table = [[0u16; 26]; MAX_LEN];
    let mut t = 0;
    while t < NAMES.len() {
        let name = NAMES[t].as_bytes();
        let mut i = 0;
        while i < name.len() {
            table[i][(name[i] - b'a') as usize] |= 1 << t;
            i += 1;
        }
        t += 1;
    }
    table
}

const fn build_lengths() -> [u16; MAX_LEN + 1] {
    let mut table = [0u16; MAX_LEN + 1];
    let mut t = 0;
    while t < NAMES.len() {
        table[NAMES[t].len()] |= 1 << t;
        t += 1;
    }
    table
}

/// Resolves the `<type>` of `null.<type>`.
pub(crate) fn null_type(suffix: &str) -> Option<IonType> {
    let bytes = suffix.as_bytes();
    let mut candidates = *LENGTHS.get(bytes.len())?;
    for (i, &byte) in bytes.iter().enumerate() {
        if !byte.is_ascii_lowercase() {
            return None;
        }
        candidates &= LETTERS[i][usize::from(byte - b'a')];
    }
    if candidates == 0 {
        return None;
    }
    NULL_TYPES.get(candidates.trailing_zeros() as usize).copied()
}

pub(crate) fn keyword(identifier: &str) -> Result<Option<Keyword>, ErrorKind> {
    let keyword = match identifier {
        "null" => Keyword::Null(IonType::Null),
        "true" => Keyword::Bool(true),
        "false" => Keyword::Bool(false),
        "nan" => Keyword::Nan,
        _ => {
            let Some(suffix) = identifier.strip_prefix("null.") else {
                return Ok(None);
            };
            let ion_type = null_type(suffix).ok_or_else(|| {
                ErrorKind::InvalidToken(format!("unknown null type {identifier:?}"))
            })?;
            Keyword::Null(ion_type)
        }
    };
    Ok(Some(keyword))
}

/// `$<digits>` is a symbol id, anything else is symbol text.
pub(crate) fn symbol(identifier: &str) -> Result<RawSymbol, ErrorKind> {
    match identifier.strip_prefix('$') {
        Some(digits) if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) => digits
            .parse()
            .map(RawSymbol::Id)
            .map_err(|_| ErrorKind::IntegerOverflow { bits: 64 }),
        _ => Ok(RawSymbol::Text(identifier.to_owned())),
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn every_type_name_resolves() {
        for ion_type in NULL_TYPES {
            assert_eq!(null_type(ion_type.name()), Some(ion_type));
        }
    }

    #[rstest]
    #[case("")]
    #[case("ints")]
    #[case("Int")]
    #[case("nul")]
    #[case("timestamps")]
    #[case("strinG")]
    #[case("sexq")]
    fn unknown_type_names(#[case] suffix: &str) {
        assert_eq!(null_type(suffix), None);
    }

    #[rstest]
    #[case("null", Some(Keyword::Null(IonType::Null)))]
    #[case("null.blob", Some(Keyword::Null(IonType::Blob)))]
    #[case("true", Some(Keyword::Bool(true)))]
    #[case("false", Some(Keyword::Bool(false)))]
    #[case("nan", Some(Keyword::Nan))]
    #[case("nulls", None)]
    #[case("NaN", None)]
    fn keywords(#[case] identifier: &str, #[case] expected: Option<Keyword>) {
        assert_eq!(keyword(identifier).unwrap(), expected);
    }

    #[test]
    fn unknown_null_type_is_an_error() {
        assert!(matches!(keyword("null.foo"), Err(ErrorKind::InvalidToken(_))));
    }

    #[rstest]
    #[case("$10", RawSymbol::Id(10))]
    #[case("$0", RawSymbol::Id(0))]
    #[case("$", RawSymbol::Text("$".into()))]
    #[case("$ion_1_0", RawSymbol::Text("$ion_1_0".into()))]
    #[case("foo", RawSymbol::Text("foo".into()))]
    fn symbols(#[case] identifier: &str, #[case] expected: RawSymbol) {
        assert_eq!(symbol(identifier).unwrap(), expected);
    }

    #[test]
    fn symbol_id_overflow() {
        assert!(matches!(
            symbol("$99999999999999999999"),
            Err(ErrorKind::IntegerOverflow { bits: 64 })
        ));
    }
}
