//! Byte classes of the text encoding, looked up through one static table.

const WHITESPACE: u8 = 1 << 0;
const IDENT_START: u8 = 1 << 1;
const IDENT_PART: u8 = 1 << 2;
const OPERATOR: u8 = 1 << 3;
const NUMERIC_STOP: u8 = 1 << 4;

static CLASSES: [u8; 256] = build_classes();

const fn build_classes() -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut b = 0;
    while b < 256 {
        let byte = b as u8;
        let mut class = 0;
        if matches!(byte, b' ' | b'\t' | b'\n' | b'\r' | 0x0B | 0x0C) {
            class |= WHITESPACE | NUMERIC_STOP;
        }
        if byte.is_ascii_alphabetic() || byte == b'_' || byte == b'$' {
            class |= IDENT_START | IDENT_PART;
        }
        if byte.is_ascii_digit() {
            class |= IDENT_PART;
        }
        if matches!(
            byte,
            b'!' | b'#'
                | b'%'
                | b'&'
                | b'*'
                | b'+'
                | b'-'
                | b'.'
                | b'/'
                | b';'
                | b'<'
                | b'='
                | b'>'
                | b'?'
                | b'@'
                | b'^'
                | b'`'
                | b'|'
                | b'~'
        ) {
            class |= OPERATOR;
        }
        if matches!(
            byte,
            b'{' | b'}' | b'[' | b']' | b'(' | b')' | b',' | b'"' | b'\''
        ) {
            class |= NUMERIC_STOP;
        }
        table[b] = class;
        b += 1;
    }
    table
}

#[inline]
fn has(byte: u8, class: u8) -> bool {
    CLASSES[usize::from(byte)] & class != 0
}

#[inline]
pub(crate) fn is_whitespace(byte: u8) -> bool {
    has(byte, WHITESPACE)
}

#[inline]
pub(crate) fn is_ident_start(byte: u8) -> bool {
    has(byte, IDENT_START)
}

#[inline]
pub(crate) fn is_ident_part(byte: u8) -> bool {
    has(byte, IDENT_PART)
}

#[inline]
pub(crate) fn is_operator(byte: u8) -> bool {
    has(byte, OPERATOR)
}

/// Whether a numeric literal may end before `next`. The end of input counts
/// as a stop.
#[inline]
pub(crate) fn is_numeric_stop(next: Option<u8>) -> bool {
    next.is_none_or(|byte| has(byte, NUMERIC_STOP))
}
