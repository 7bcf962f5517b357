//! Type descriptor decoding.
//!
//! A type descriptor is one byte: the high nibble is the type code and the
//! low nibble is either the body length or one of two sentinels.

use crate::{ErrorKind, IonType};

/// Low nibble meaning "the length follows as a VarUInt".
pub(crate) const LENGTH_VAR_UINT: u8 = 14;
/// Low nibble meaning "null of this type".
pub(crate) const LENGTH_NULL: u8 = 15;

pub(crate) const TYPE_POS_INT: u8 = 2;
pub(crate) const TYPE_NEG_INT: u8 = 3;
const TYPE_STRUCT: u8 = 13;
const TYPE_ANNOTATION: u8 = 14;

/// The binary version marker, `E0 01 00 EA`.
pub(crate) const VERSION_MARKER: [u8; 4] = [0xE0, 0x01, 0x00, 0xEA];

/// How the body length of a value is given.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Length {
    /// Spelled in the low nibble.
    Nibble(u8),
    /// A VarUInt follows the descriptor.
    VarUInt,
    /// Struct with nibble 1: the fields are sorted and a non-zero VarUInt
    /// length follows.
    OrderedStruct,
}

/// What a type descriptor byte announces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Header {
    /// A typed null; no body.
    Null(IonType),
    /// A boolean; the payload is the nibble itself.
    Bool(bool),
    /// A value of `ion_type` whose body length is given by `length`.
    Value { ion_type: IonType, length: Length },
    /// An annotation wrapper around exactly one value.
    Annotation(Length),
    /// The first byte of the version marker.
    VersionMarker,
}

impl Header {
    /// Decodes a type descriptor byte.
    pub(crate) fn decode(descriptor: u8) -> Result<Self, ErrorKind> {
        let code = descriptor >> 4;
        let nibble = descriptor & 0x0F;
        let malformed = |reason| Err(ErrorKind::malformed(descriptor, reason));

        let ion_type = match code {
            0 => {
                return if nibble == LENGTH_NULL {
                    Ok(Self::Null(IonType::Null))
                } else {
                    malformed("null must use length nibble 15")
                };
            }
            1 => {
                return match nibble {
                    0 => Ok(Self::Bool(false)),
                    1 => Ok(Self::Bool(true)),
                    LENGTH_NULL => Ok(Self::Null(IonType::Bool)),
                    _ => malformed("bool payload must be 0, 1 or 15"),
                };
            }
            TYPE_POS_INT | TYPE_NEG_INT => IonType::Int,
            4 => IonType::Float,
            5 => IonType::Decimal,
            6 => IonType::Timestamp,
            7 => IonType::Symbol,
            8 => IonType::String,
            9 => IonType::Clob,
            10 => IonType::Blob,
            11 => IonType::List,
            12 => IonType::Sexp,
            TYPE_STRUCT => IonType::Struct,
            TYPE_ANNOTATION => {
                return match nibble {
                    0 => Ok(Self::VersionMarker),
                    1 | 2 => malformed("annotation wrapper shorter than 3 bytes"),
                    LENGTH_NULL => malformed("annotation wrapper cannot be null"),
                    LENGTH_VAR_UINT => Ok(Self::Annotation(Length::VarUInt)),
                    n => Ok(Self::Annotation(Length::Nibble(n))),
                };
            }
            _ => return malformed("reserved type code"),
        };

        if nibble == LENGTH_NULL {
            return Ok(Self::Null(ion_type));
        }
        let length = match (code, nibble) {
            (4, 0 | 4 | 8) => Length::Nibble(nibble),
            (4, _) => return malformed("float length must be 0, 4 or 8"),
            (TYPE_STRUCT, 1) => Length::OrderedStruct,
            (_, LENGTH_VAR_UINT) => Length::VarUInt,
            (_, n) => Length::Nibble(n),
        };
        Ok(Self::Value { ion_type, length })
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(0x0F, Header::Null(IonType::Null))]
    #[case(0x10, Header::Bool(false))]
    #[case(0x11, Header::Bool(true))]
    #[case(0x1F, Header::Null(IonType::Bool))]
    #[case(0x21, Header::Value { ion_type: IonType::Int, length: Length::Nibble(1) })]
    #[case(0x3E, Header::Value { ion_type: IonType::Int, length: Length::VarUInt })]
    #[case(0x48, Header::Value { ion_type: IonType::Float, length: Length::Nibble(8) })]
    #[case(0x8E, Header::Value { ion_type: IonType::String, length: Length::VarUInt })]
    #[case(0xDF, Header::Null(IonType::Struct))]
    #[case(0xD1, Header::Value { ion_type: IonType::Struct, length: Length::OrderedStruct })]
    #[case(0xB1, Header::Value { ion_type: IonType::List, length: Length::Nibble(1) })]
    #[case(0xE0, Header::VersionMarker)]
    #[case(0xE3, Header::Annotation(Length::Nibble(3)))]
    #[case(0xEE, Header::Annotation(Length::VarUInt))]
    fn decodes(#[case] byte: u8, #[case] expected: Header) {
        assert_eq!(Header::decode(byte).unwrap(), expected);
    }

    #[rstest]
    #[case(0x00)]
    #[case(0x0E)]
    #[case(0x12)]
    #[case(0x1E)]
    #[case(0x43)]
    #[case(0x4E)]
    #[case(0xE1)]
    #[case(0xE2)]
    #[case(0xEF)]
    #[case(0xF0)]
    #[case(0xFF)]
    fn rejects(#[case] byte: u8) {
        let err = Header::decode(byte).unwrap_err();
        assert!(
            matches!(err, ErrorKind::MalformedHeader { descriptor, .. } if descriptor == byte),
            "{byte:#04x}: {err}"
        );
    }
}
