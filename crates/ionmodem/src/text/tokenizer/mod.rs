//! Tokenizer: bytes of text input to tokens.
//!
//! Overview
//! - [`Tokenizer::next_token`] skips whitespace and comments, then classifies
//!   the next token from its first byte, peeking a few bytes further where
//!   the first one is ambiguous (`{{`, `::`, `'''`, `+inf`, numbers versus
//!   timestamps).
//! - Short tokens (numbers, timestamps, identifiers, operators) are scanned
//!   eagerly into a scratch buffer, see [`Tokenizer::text`].
//! - Quoted text and containers are returned *unfinished*: only the opening
//!   delimiter is consumed. [`Tokenizer::finish_token`] runs the scan that
//!   finds the end, optionally recording the body as a [`SavePoint`] that
//!   [`Tokenizer::decode_quoted`] later replays to apply escapes.
//!
//! Invariants
//! - Finishing a token always ends at the same offset, whether or not its
//!   body is captured; capture and skip share one scanning routine per token
//!   kind.
//! - Lookahead never consumes: whatever was read to decide is unread.
//!
//! Comment policies
//! - `Ignore` between tokens.
//! - `Error` between the segments of a clob, where comments are not allowed.
//! - `Stop` inside blob content, where `/` is a base64 symbol.

mod base64;
mod chars;
mod escape;
pub(crate) mod number;


use std::io::Read;

use self::base64::{Base64Decoder, SymbolSource};
use self::escape::Escape;
use super::grammar::State;
use crate::input::{Input, InputOwner, Pinned, Replay, SavePoint};
use crate::{DecodeError, ErrorKind, ReaderOptions, Result};

/// What to do with a comment found where whitespace may appear.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CommentPolicy {
    Ignore,
    Error,
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TokenKind {
    Eof,
    Number,
    Timestamp,
    PlusInf,
    MinusInf,
    SymbolIdentifier,
    SymbolQuoted,
    SymbolOperator,
    String,
    LongString,
    Comma,
    Colon,
    DoubleColon,
    OpenParen,
    CloseParen,
    OpenBracket,
    CloseBracket,
    OpenBrace,
    CloseBrace,
    OpenLob,
    CloseLob,
}

impl TokenKind {
    pub(crate) const COUNT: usize = 21;

    pub(crate) fn name(self) -> &'static str {
        match self {
            Self::Eof => "end of input",
            Self::Number => "number",
            Self::Timestamp => "timestamp",
            Self::PlusInf => "+inf",
            Self::MinusInf => "-inf",
            Self::SymbolIdentifier => "identifier",
            Self::SymbolQuoted => "quoted symbol",
            Self::SymbolOperator => "operator",
            Self::String => "string",
            Self::LongString => "long string",
            Self::Comma => "','",
            Self::Colon => "':'",
            Self::DoubleColon => "'::'",
            Self::OpenParen => "'('",
            Self::CloseParen => "')'",
            Self::OpenBracket => "'['",
            Self::CloseBracket => "']'",
            Self::OpenBrace => "'{'",
            Self::CloseBrace => "'}'",
            Self::OpenLob => "'{{'",
            Self::CloseLob => "'}}'",
        }
    }

    /// The closing byte, for the three container closers.
    pub(crate) fn closer(self) -> Option<u8> {
        match self {
            Self::CloseParen => Some(b')'),
            Self::CloseBracket => Some(b']'),
            Self::CloseBrace => Some(b'}'),
            _ => None,
        }
    }
}

/// A token and the input range it covers.
///
/// `end` is only meaningful once the token is finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Token {
    pub(crate) kind: TokenKind,
    pub(crate) start: usize,
    pub(crate) end: usize,
    pub(crate) unfinished: bool,
}

/// How the content between `{{` and `}}` is spelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LobKind {
    Blob,
    ShortClob,
    LongClob,
}

/// Decoding rules for a captured quoted body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Quoted {
    /// Made of `'''` segments.
    pub(crate) long: bool,
    /// Clob text: ASCII only, byte escapes only.
    pub(crate) clob: bool,
}

pub(crate) struct Tokenizer<R> {
    input: Input<R>,
    /// Text of the last eagerly scanned token.
    text: String,
}

impl<R: Read> Tokenizer<R> {
    pub(crate) fn new(reader: R, options: &ReaderOptions) -> Self {
        Self {
            input: Input::new(reader, options, true),
            text: String::new(),
        }
    }

    pub(crate) fn position(&self) -> usize {
        self.input.position()
    }

    pub(crate) fn line(&self) -> usize {
        self.input.line()
    }

    pub(crate) fn column(&self) -> usize {
        self.input.column()
    }

    pub(crate) fn error(&self, kind: ErrorKind) -> DecodeError {
        self.input.error(kind)
    }

    fn invalid_token(&self, message: impl Into<String>) -> DecodeError {
        self.error(ErrorKind::InvalidToken(message.into()))
    }

    /// Text of the last number, timestamp, identifier or operator.
    pub(crate) fn text(&self) -> &str {
        &self.text
    }

    pub(crate) fn release(&mut self, save_point: SavePoint) {
        self.input.release(save_point);
    }

    fn take(&mut self, n: usize) -> Result<()> {
        for _ in 0..n {
            self.input.read_required()?;
        }
        Ok(())
    }

    /// Whether the bytes `offset..` ahead spell `expected`.
    fn peek_is(&mut self, offset: usize, expected: &[u8]) -> Result<bool> {
        for (i, &byte) in expected.iter().enumerate() {
            if self.input.peek_at(offset + i)? != Some(byte) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    pub(crate) fn skip_whitespace(&mut self, policy: CommentPolicy) -> Result<()> {
        loop {
            match self.input.peek()? {
                Some(byte) if chars::is_whitespace(byte) => {
                    self.input.read()?;
                }
                Some(b'/') if matches!(self.input.peek_at(1)?, Some(b'/' | b'*')) => match policy {
                    CommentPolicy::Ignore => self.skip_comment()?,
                    CommentPolicy::Stop => return Ok(()),
                    CommentPolicy::Error => {
                        return Err(self.invalid_token("comments are not allowed inside a lob"));
                    }
                },
                _ => return Ok(()),
            }
        }
    }

    fn skip_comment(&mut self) -> Result<()> {
        self.take(1)?;
        if self.input.read_required()? == b'/' {
            while let Some(byte) = self.input.read()? {
                if byte == b'\n' || byte == b'\r' {
                    break;
                }
            }
            return Ok(());
        }
        loop {
            if self.input.read_required()? == b'*' && self.input.peek()? == Some(b'/') {
                self.take(1)?;
                return Ok(());
            }
        }
    }

    pub(crate) fn next_token(&mut self) -> Result<Token> {
        debug_assert!(!self.input.is_replaying());
        self.skip_whitespace(CommentPolicy::Ignore)?;
        let start = self.input.position();
        let Some(byte) = self.input.peek()? else {
            return Ok(Token {
                kind: TokenKind::Eof,
                start,
                end: start,
                unfinished: false,
            });
        };

        let (kind, unfinished) = match byte {
            b'(' => (TokenKind::OpenParen, true),
            b'[' => (TokenKind::OpenBracket, true),
            b'{' if self.input.peek_at(1)? == Some(b'{') => {
                self.take(1)?;
                (TokenKind::OpenLob, true)
            }
            b'{' => (TokenKind::OpenBrace, true),
            b')' => (TokenKind::CloseParen, false),
            b']' => (TokenKind::CloseBracket, false),
            b'}' => (TokenKind::CloseBrace, false),
            b',' => (TokenKind::Comma, false),
            b':' if self.input.peek_at(1)? == Some(b':') => {
                self.take(1)?;
                (TokenKind::DoubleColon, false)
            }
            b':' => (TokenKind::Colon, false),
            b'"' => (TokenKind::String, true),
            b'\'' if self.peek_is(1, b"''")? => {
                self.take(2)?;
                (TokenKind::LongString, true)
            }
            b'\'' => (TokenKind::SymbolQuoted, true),
            b'0'..=b'9' => return self.scan_numeric(start),
            b'-' if self.input.peek_at(1)?.is_some_and(|b| b.is_ascii_digit()) => {
                return self.scan_numeric(start);
            }
            b'+' | b'-'
                if self.peek_is(1, b"inf")? && chars::is_numeric_stop(self.input.peek_at(4)?) =>
            {
                self.take(3)?;
                let kind = if byte == b'+' {
                    TokenKind::PlusInf
                } else {
                    TokenKind::MinusInf
                };
                (kind, false)
            }
            b if chars::is_ident_start(b) => {
                self.scan_identifier()?;
                return Ok(self.finished(TokenKind::SymbolIdentifier, start));
            }
            b if chars::is_operator(b) => {
                self.scan_operator()?;
                return Ok(self.finished(TokenKind::SymbolOperator, start));
            }
            b => return Err(self.unexpected_character(b)?),
        };
        self.take(1)?;
        Ok(Token {
            kind,
            start,
            end: if unfinished { start } else { self.input.position() },
            unfinished,
        })
    }

    /// Names the character starting with `first`, decoding it if it is
    /// valid UTF-8.
    fn unexpected_character(&mut self, first: u8) -> Result<DecodeError> {
        let mut head = [0u8; 4];
        let mut len = 0;
        while len < head.len() {
            let Some(byte) = self.input.peek_at(len)? else {
                break;
            };
            head[len] = byte;
            len += 1;
        }
        let message = match bstr::decode_utf8(&head[..len]) {
            (Some(ch), _) => format!("unexpected character {ch:?}"),
            (None, _) => format!("unexpected byte 0x{first:02X}"),
        };
        Ok(self.invalid_token(message))
    }

    fn finished(&self, kind: TokenKind, start: usize) -> Token {
        Token {
            kind,
            start,
            end: self.input.position(),
            unfinished: false,
        }
    }

    fn push_while(&mut self, accept: fn(u8) -> bool) -> Result<()> {
        while let Some(byte) = self.input.peek()? {
            if !accept(byte) {
                break;
            }
            self.input.read()?;
            self.text.push(char::from(byte));
        }
        Ok(())
    }

    fn scan_identifier(&mut self) -> Result<()> {
        self.text.clear();
        self.push_while(chars::is_ident_part)?;
        if self.text == "null"
            && self.input.peek()? == Some(b'.')
            && self.input.peek_at(1)?.is_some_and(chars::is_ident_start)
        {
            self.take(1)?;
            self.text.push('.');
            self.push_while(chars::is_ident_part)?;
        }
        Ok(())
    }

    fn scan_operator(&mut self) -> Result<()> {
        self.text.clear();
        while let Some(byte) = self.input.peek()? {
            if !chars::is_operator(byte)
                || (byte == b'/' && matches!(self.input.peek_at(1)?, Some(b'/' | b'*')))
            {
                break;
            }
            self.input.read()?;
            self.text.push(char::from(byte));
        }
        Ok(())
    }

    /// Four digits followed by `-` or `T` start a timestamp. The digits are
    /// read and then unread.
    fn timestamp_ahead(&mut self) -> Result<bool> {
        let mut digits = 0;
        while digits < 4 && self.input.peek()?.is_some_and(|b| b.is_ascii_digit()) {
            self.input.read()?;
            digits += 1;
        }
        let marker = self.input.peek()?;
        self.input.unread_n(digits);
        Ok(digits == 4 && matches!(marker, Some(b'-' | b'T')))
    }

    fn scan_numeric(&mut self, start: usize) -> Result<Token> {
        self.text.clear();
        if self.timestamp_ahead()? {
            self.push_while(|b| b.is_ascii_digit() || matches!(b, b'-' | b':' | b'T' | b'Z' | b'.' | b'+'))?;
            self.expect_numeric_stop()?;
            number::parse_timestamp(&self.text).map_err(|kind| self.error(kind))?;
            return Ok(self.finished(TokenKind::Timestamp, start));
        }

        let mut previous = 0u8;
        while let Some(byte) = self.input.peek()? {
            let sign = match byte {
                b'-' if self.text.is_empty() => true,
                b'+' | b'-' => matches!(previous, b'e' | b'E' | b'd' | b'D'),
                _ => false,
            };
            if !(sign || byte.is_ascii_alphanumeric() || matches!(byte, b'_' | b'.')) {
                break;
            }
            self.input.read()?;
            self.text.push(char::from(byte));
            previous = byte;
        }
        self.expect_numeric_stop()?;
        number::classify(&self.text).map_err(|kind| self.error(kind))?;
        Ok(self.finished(TokenKind::Number, start))
    }

    fn expect_numeric_stop(&mut self) -> Result<()> {
        if chars::is_numeric_stop(self.input.peek()?) {
            Ok(())
        } else {
            Err(self.invalid_token(format!("{:?} is not followed by a delimiter", self.text)))
        }
    }

    /// Consumes `::` if it is the next token.
    pub(crate) fn double_colon_follows(&mut self) -> Result<bool> {
        self.skip_whitespace(CommentPolicy::Ignore)?;
        if self.peek_is(0, b"::")? {
            self.take(2)?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Scans to the end of an unfinished token. With `capture`, quoted
    /// bodies are returned as a pinned save point the caller must release.
    pub(crate) fn finish_token(
        &mut self,
        token: &mut Token,
        capture: bool,
    ) -> Result<Option<SavePoint>> {
        if !token.unfinished {
            return Ok(None);
        }
        let (end, save_point) = match token.kind {
            TokenKind::String => self.scan_short(b'"', capture)?,
            TokenKind::SymbolQuoted => self.scan_short(b'\'', capture)?,
            TokenKind::LongString => self.scan_long(CommentPolicy::Ignore, capture)?,
            TokenKind::OpenParen => (self.skip_container(b')')?, None),
            TokenKind::OpenBracket => (self.skip_container(b']')?, None),
            TokenKind::OpenBrace => (self.skip_container(b'}')?, None),
            TokenKind::OpenLob => (self.skip_lob()?, None),
            _ => (self.input.position(), None),
        };
        token.end = end;
        token.unfinished = false;
        Ok(save_point)
    }

    /// Consumes the byte after a backslash, and the `\n` of an escaped
    /// `\r\n`.
    fn skip_escaped(&mut self) -> Result<()> {
        if self.input.read_required()? == b'\r' && self.input.peek()? == Some(b'\n') {
            self.take(1)?;
        }
        Ok(())
    }

    /// Scans `"…"` or `'…'` from just after the opening quote.
    fn scan_short(&mut self, quote: u8, capture: bool) -> Result<(usize, Option<SavePoint>)> {
        let mut scan = Pinned::new(self, capture);
        loop {
            match scan.input.read_required()? {
                b'\\' => scan.skip_escaped()?,
                b'\n' | b'\r' => {
                    return Err(scan.invalid_token("unescaped newline in quoted text"));
                }
                byte if byte == quote => break,
                _ => {}
            }
        }
        let save_point = scan.keep(1);
        Ok((self.input.position(), save_point))
    }

    /// Scans one `'''` segment from just after its opening quotes.
    fn scan_long_segment(&mut self) -> Result<()> {
        loop {
            match self.input.read_required()? {
                b'\\' => self.skip_escaped()?,
                b'\'' if self.peek_is(0, b"''")? => return self.take(2),
                _ => {}
            }
        }
    }

    /// Consumes the opening quotes of another segment if one follows.
    fn long_string_continues(&mut self, policy: CommentPolicy) -> Result<bool> {
        self.skip_whitespace(policy)?;
        if self.peek_is(0, b"'''")? {
            self.take(3)?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Scans every adjacent `'''` segment. The end is that of the last
    /// segment; the captured body runs from the first segment's content to
    /// the last segment's closing quotes.
    fn scan_long(&mut self, policy: CommentPolicy, capture: bool) -> Result<(usize, Option<SavePoint>)> {
        let mut scan = Pinned::new(self, capture);
        let end = loop {
            scan.scan_long_segment()?;
            let end = scan.input.position();
            if !scan.long_string_continues(policy)? {
                break end;
            }
        };
        let back = scan.input.position() - (end - 3);
        Ok((end, scan.keep(back)))
    }

    /// Skips the rest of a container whose opening delimiter was consumed,
    /// honoring quoted text, comments and lobs. A comma directly inside an
    /// s-expression is rejected as it would be when reading.
    pub(crate) fn skip_container(&mut self, closer: u8) -> Result<usize> {
        let mut expected = vec![closer];
        while let Some(&want) = expected.last() {
            self.skip_whitespace(CommentPolicy::Ignore)?;
            match self.input.read_required()? {
                b'"' => {
                    self.scan_short(b'"', false)?;
                }
                b'\'' if self.peek_is(0, b"''")? => {
                    self.take(2)?;
                    self.scan_long(CommentPolicy::Ignore, false)?;
                }
                b'\'' => {
                    self.scan_short(b'\'', false)?;
                }
                b'(' => expected.push(b')'),
                b'[' => expected.push(b']'),
                b'{' if self.input.peek()? == Some(b'{') => {
                    self.take(1)?;
                    self.skip_lob()?;
                }
                b'{' => expected.push(b'}'),
                b',' if want == b')' => {
                    return Err(self.error(ErrorKind::SyntaxError {
                        state: State::BeforeAnnotationSexp.name(),
                        token: TokenKind::Comma.name(),
                    }));
                }
                byte @ (b')' | b']' | b'}') => {
                    if byte != want {
                        return Err(self.error(ErrorKind::InvalidContainerClose {
                            expected: char::from(want),
                            actual: char::from(byte),
                        }));
                    }
                    expected.pop();
                }
                _ => {}
            }
        }
        Ok(self.input.position())
    }

    /// Skips a lob whose `{{` was consumed, through its `}}`.
    fn skip_lob(&mut self) -> Result<usize> {
        let kind = self.lob_kind()?;
        self.finish_lob(kind, false)?;
        let close = self.next_lob_close()?;
        if close.kind != TokenKind::CloseLob {
            return Err(self.invalid_token("expected '}}' to close a lob"));
        }
        Ok(close.end)
    }

    /// Tells a clob from a blob by the first byte of the content.
    pub(crate) fn lob_kind(&mut self) -> Result<LobKind> {
        self.skip_whitespace(CommentPolicy::Stop)?;
        if self.peek_is(0, b"'''")? {
            return Ok(LobKind::LongClob);
        }
        Ok(match self.input.peek()? {
            Some(b'"') => LobKind::ShortClob,
            _ => LobKind::Blob,
        })
    }

    /// Scans lob content up to, not including, the closing `}}`.
    pub(crate) fn finish_lob(&mut self, kind: LobKind, capture: bool) -> Result<Option<SavePoint>> {
        self.skip_whitespace(CommentPolicy::Stop)?;
        match kind {
            LobKind::Blob => {
                let mut scan = Pinned::new(self, capture);
                while scan.input.read_required()? != b'}' {}
                scan.input.unread();
                Ok(scan.keep(0))
            }
            LobKind::ShortClob => {
                self.take(1)?;
                Ok(self.scan_short(b'"', capture)?.1)
            }
            LobKind::LongClob => {
                self.take(3)?;
                Ok(self.scan_long(CommentPolicy::Error, capture)?.1)
            }
        }
    }

    /// The token after lob content: `}}`, or whatever else is there.
    pub(crate) fn next_lob_close(&mut self) -> Result<Token> {
        self.skip_whitespace(CommentPolicy::Error)?;
        let start = self.input.position();
        if self.peek_is(0, b"}}")? {
            self.take(2)?;
            return Ok(self.finished(TokenKind::CloseLob, start));
        }
        self.next_token()
    }

    /// Replays a captured quoted body, applying escapes and joining long
    /// string segments.
    pub(crate) fn decode_quoted(&mut self, save_point: &SavePoint, quoted: Quoted) -> Result<Vec<u8>> {
        let policy = if quoted.clob {
            CommentPolicy::Error
        } else {
            CommentPolicy::Ignore
        };
        let mut replay = Replay::enter(self, save_point);
        let mut out = Vec::with_capacity(save_point.len());
        while let Some(byte) = replay.input.read()? {
            match byte {
                b'\\' => replay.decode_escape(&mut out, quoted.clob)?,
                b'\'' if quoted.long && replay.peek_is(0, b"''")? => {
                    replay.take(2)?;
                    if !replay.long_string_continues(policy)? {
                        return Err(replay.invalid_token("expected another long string segment"));
                    }
                }
                byte if quoted.clob && !byte.is_ascii() => {
                    return Err(replay.invalid_token("clob text must be ASCII"));
                }
                byte => out.push(byte),
            }
        }
        Ok(out)
    }

    fn decode_escape(&mut self, out: &mut Vec<u8>, clob: bool) -> Result<()> {
        let byte = self.input.read_required()?;
        match escape::lookup(byte) {
            Escape::Invalid => Err(self.error(ErrorKind::InvalidEscapeSequence(
                "unknown escape character",
            ))),
            Escape::Literal(value) => {
                out.push(value);
                Ok(())
            }
            Escape::LineContinuation => {
                if byte == b'\r' && self.input.peek()? == Some(b'\n') {
                    self.take(1)?;
                }
                Ok(())
            }
            Escape::Hex(digits) if clob => {
                let value = self.read_hex(digits)?;
                let byte = u8::try_from(value).map_err(|_| {
                    self.error(ErrorKind::InvalidEscapeSequence(
                        "clob escapes must fit in one byte",
                    ))
                })?;
                out.push(byte);
                Ok(())
            }
            Escape::Hex(digits) => {
                let ch = self.read_code_point(digits)?;
                out.extend_from_slice(ch.encode_utf8(&mut [0; 4]).as_bytes());
                Ok(())
            }
        }
    }

    fn read_hex(&mut self, digits: u8) -> Result<u32> {
        let mut value = 0u32;
        for _ in 0..digits {
            let byte = self.input.read_required()?;
            let digit = escape::hex_value(byte).ok_or_else(|| {
                self.error(ErrorKind::InvalidEscapeSequence("expected a hex digit"))
            })?;
            value = (value << 4) | digit;
        }
        Ok(value)
    }

    /// A hex escape as a scalar value. A high surrogate must be followed by
    /// a `\u` low surrogate; the pair is combined.
    fn read_code_point(&mut self, digits: u8) -> Result<char> {
        let unpaired = |this: &Self| this.error(ErrorKind::InvalidEscapeSequence("unpaired surrogate"));
        let code = self.read_hex(digits)?;
        let scalar = match code {
            0xD800..=0xDBFF => {
                if !self.peek_is(0, b"\\u")? {
                    return Err(unpaired(self));
                }
                self.take(2)?;
                let low = self.read_hex(4)?;
                if !(0xDC00..=0xDFFF).contains(&low) {
                    return Err(unpaired(self));
                }
                0x10000 + ((code - 0xD800) << 10) + (low - 0xDC00)
            }
            0xDC00..=0xDFFF => return Err(unpaired(self)),
            code => code,
        };
        char::from_u32(scalar).ok_or_else(|| {
            self.error(ErrorKind::InvalidEscapeSequence("code point out of range"))
        })
    }

    /// Replays captured blob content through the base64 decoder.
    pub(crate) fn decode_blob(&mut self, save_point: &SavePoint) -> Result<Vec<u8>> {
        let mut replay = Replay::enter(self, save_point);
        let mut decoder = Base64Decoder::default();
        let mut out = Vec::with_capacity(save_point.len() / 4 * 3);
        while let Some(byte) = decoder.next_byte(&mut *replay)? {
            out.push(byte);
        }
        Ok(out)
    }
}

impl<R: Read> InputOwner for Tokenizer<R> {
    type Source = R;

    fn input_mut(&mut self) -> &mut Input<R> {
        &mut self.input
    }
}

impl<R: Read> SymbolSource for Tokenizer<R> {
    fn next_symbol(&mut self) -> Result<Option<u8>> {
        self.skip_whitespace(CommentPolicy::Stop)?;
        self.input.read()
    }

    fn invalid(&self) -> DecodeError {
        self.error(ErrorKind::InvalidBase64)
    }
}
