use core::fmt;

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = core::result::Result<T, DecodeError>;

/// A fatal decoding error together with the input position it was raised at.
///
/// Every error ends the stream: the reader that produced it refuses further
/// cursor calls with [`ErrorKind::IllegalCursorState`].
#[derive(Error, Debug)]
#[error("{kind} at {position}")]
pub struct DecodeError {
    pub(crate) kind: ErrorKind,
    pub(crate) position: Position,
}

impl DecodeError {
    pub(crate) fn new(kind: ErrorKind, position: Position) -> Self {
        Self { kind, position }
    }

    /// The category of the failure.
    #[must_use]
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Where in the input the failure was detected.
    #[must_use]
    pub fn position(&self) -> Position {
        self.position
    }
}

/// Input location attached to a [`DecodeError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    /// Absolute byte offset into the input.
    pub offset: usize,
    /// 1-based line and column, only tracked for text input.
    pub line_column: Option<(usize, usize)>,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line_column {
            Some((line, column)) => write!(f, "{line}:{column} (offset {})", self.offset),
            None => write!(f, "offset {}", self.offset),
        }
    }
}

/// The taxonomy of decoding failures.
#[derive(Debug, Error)]
pub enum ErrorKind {
    /// A binary type descriptor that no value can start with.
    #[error("malformed type descriptor 0x{descriptor:02X}: {reason}")]
    MalformedHeader {
        /// The offending descriptor byte.
        descriptor: u8,
        /// Which rule it broke.
        reason: &'static str,
    },
    /// An annotation wrapper and its wrapped value end at different offsets.
    #[error(
        "annotation wrapper declares an end at {declared} but the wrapped value ends at {actual}"
    )]
    WrapperLengthMismatch {
        /// End offset the wrapper's length implies.
        declared: usize,
        /// End offset of the wrapped value.
        actual: usize,
    },
    /// The input ended inside a value, or a value ran past its container.
    #[error("unexpected end of input")]
    UnexpectedEndOfInput,
    /// A variable-length field wider than allowed.
    #[error("variable length integer does not fit in {bits} bits")]
    IntegerOverflow {
        /// The widest width accepted.
        bits: u32,
    },
    /// String or symbol bytes that are not UTF-8.
    #[error("invalid UTF-8 sequence")]
    InvalidUtf8,
    /// A backslash escape that is unknown, malformed or not allowed here.
    #[error("invalid escape sequence: {0}")]
    InvalidEscapeSequence(&'static str),
    /// A token the text grammar does not allow where it appears.
    #[error("syntax error: unexpected {token} in state {state}")]
    SyntaxError {
        /// Name of the grammar state.
        state: &'static str,
        /// Name of the token found there.
        token: &'static str,
    },
    /// A closing delimiter that does not match the open container.
    #[error("invalid container close: expected '{expected}' but found '{actual}'")]
    InvalidContainerClose {
        /// Closer of the innermost open container.
        expected: char,
        /// The closer that was found.
        actual: char,
    },
    /// A cursor call that is not valid where the reader is.
    #[error("illegal cursor state: {0}")]
    IllegalCursorState(&'static str),
    /// Text that does not form a token.
    #[error("invalid token: {0}")]
    InvalidToken(String),
    /// Blob content that is not valid base64.
    #[error("invalid base64 content")]
    InvalidBase64,
    /// Well-formed input whose value is out of range.
    #[error("invalid value: {0}")]
    InvalidValue(&'static str),
    /// The underlying source failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ErrorKind {
    pub(crate) fn malformed(descriptor: u8, reason: &'static str) -> Self {
        Self::MalformedHeader { descriptor, reason }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_line_and_column_for_text() {
        let err = DecodeError::new(
            ErrorKind::InvalidContainerClose {
                expected: ')',
                actual: ']',
            },
            Position {
                offset: 7,
                line_column: Some((2, 3)),
            },
        );
        assert_eq!(
            err.to_string(),
            "invalid container close: expected ')' but found ']' at 2:3 (offset 7)"
        );
    }

    #[test]
    fn display_binary_offset_only() {
        let err = DecodeError::new(
            ErrorKind::malformed(0x02, "null must use length nibble 15"),
            Position {
                offset: 0,
                line_column: None,
            },
        );
        assert_eq!(
            err.to_string(),
            "malformed type descriptor 0x02: null must use length nibble 15 at offset 0"
        );
    }
}
