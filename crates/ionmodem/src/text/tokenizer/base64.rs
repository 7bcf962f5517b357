//! Base64 decoding of blob content.
//!
//! Symbols are consumed four at a time. A group yields up to three bytes:
//! the first is returned immediately and the rest wait in a lookahead buffer
//! of at most two bytes. Padding (`=`) may appear as the third or fourth
//! symbol of the final group only.

use crate::{DecodeError, Result};

/// Where base64 symbols come from. Whitespace is the source's business.
pub(crate) trait SymbolSource {
    /// The next symbol, or `None` at the end of the content.
    fn next_symbol(&mut self) -> Result<Option<u8>>;

    fn invalid(&self) -> DecodeError;
}

const INVALID: u8 = 0xFF;

static VALUES: [u8; 256] = build_values();

const fn build_values() -> [u8; 256] {
    let alphabet = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";
    let mut table = [INVALID; 256];
    let mut i = 0;
    while i < alphabet.len() {
        table[alphabet[i] as usize] = i as u8;
        i += 1;
    }
    table
}

#[derive(Debug, Default)]
pub(crate) struct Base64Decoder {
    pending: [u8; 2],
    pending_len: usize,
    /// Set after a padded group; only the end of content may follow.
    padded: bool,
}

impl Base64Decoder {
    /// Decodes the next byte.
    pub(crate) fn next_byte<S: SymbolSource + ?Sized>(&mut self, src: &mut S) -> Result<Option<u8>> {
        if self.pending_len > 0 {
            let byte = self.pending[0];
            self.pending[0] = self.pending[1];
            self.pending_len -= 1;
            return Ok(Some(byte));
        }

        let Some(first) = src.next_symbol()? else {
            return Ok(None);
        };
        if self.padded {
            return Err(src.invalid());
        }
        let mut group = [first, 0, 0, 0];
        for slot in &mut group[1..] {
            *slot = src.next_symbol()?.ok_or_else(|| src.invalid())?;
        }

        let value = |symbol: u8| match VALUES[usize::from(symbol)] {
            INVALID => Err(src.invalid()),
            v => Ok(u32::from(v)),
        };
        let v0 = value(group[0])?;
        let v1 = value(group[1])?;
        let (v2, v3, len) = match (group[2], group[3]) {
            (b'=', b'=') => (0, 0, 1),
            (b'=', _) => return Err(src.invalid()),
            (c, b'=') => (value(c)?, 0, 2),
            (c, d) => (value(c)?, value(d)?, 3),
        };
        if len < 3 {
            self.padded = true;
        }

        let bits = (v0 << 18) | (v1 << 12) | (v2 << 6) | v3;
        let bytes = bits.to_be_bytes();
        // bytes[0] is always zero: 24 bits of payload in a u32.
        self.pending = [bytes[2], bytes[3]];
        self.pending_len = len - 1;
        Ok(Some(bytes[1]))
    }
}
