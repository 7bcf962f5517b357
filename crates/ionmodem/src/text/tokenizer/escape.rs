//! Backslash escapes of quoted text.

/// What the byte after a backslash means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Escape {
    Invalid,
    /// Stands for one literal byte.
    Literal(u8),
    /// An escaped newline; contributes nothing.
    LineContinuation,
    /// A code point spelled with this many hex digits (`\x`, `\u`, `\U`).
    Hex(u8),
}

static ESCAPES: [Escape; 128] = build_escapes();

const fn build_escapes() -> [Escape; 128] {
    let mut table = [Escape::Invalid; 128];
    table[b'0' as usize] = Escape::Literal(0x00);
    table[b'a' as usize] = Escape::Literal(0x07);
    table[b'b' as usize] = Escape::Literal(0x08);
    table[b't' as usize] = Escape::Literal(b'\t');
    table[b'n' as usize] = Escape::Literal(b'\n');
    table[b'v' as usize] = Escape::Literal(0x0B);
    table[b'f' as usize] = Escape::Literal(0x0C);
    table[b'r' as usize] = Escape::Literal(b'\r');
    table[b'"' as usize] = Escape::Literal(b'"');
    table[b'\'' as usize] = Escape::Literal(b'\'');
    table[b'?' as usize] = Escape::Literal(b'?');
    table[b'/' as usize] = Escape::Literal(b'/');
    table[b'\\' as usize] = Escape::Literal(b'\\');
    table[b'\n' as usize] = Escape::LineContinuation;
    table[b'\r' as usize] = Escape::LineContinuation;
    table[b'x' as usize] = Escape::Hex(2);
    table[b'u' as usize] = Escape::Hex(4);
    table[b'U' as usize] = Escape::Hex(8);
    table
}

#[inline]
pub(crate) fn lookup(byte: u8) -> Escape {
    ESCAPES
        .get(usize::from(byte))
        .copied()
        .unwrap_or(Escape::Invalid)
}

#[inline]
pub(crate) fn hex_value(byte: u8) -> Option<u32> {
    char::from(byte).to_digit(16)
}
