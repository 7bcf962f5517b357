//! Pull decoder for the text encoding.
//!
//! Overview
//! - The [`tokenizer`] turns bytes into tokens; the [`grammar`] table says
//!   what each token means in the current state. The reader runs that loop
//!   until a token starts a value, a container ends or the input ends.
//! - Quoted text, lobs and containers are lazy. A value's token is left
//!   unfinished, and the next advance scans past it without decoding it
//!   unless a `read_*` call or [`TextReader::step_in`] got there first.
//! - A bare symbol is only known to be an annotation once `::` follows it,
//!   so every symbol is loaded first and then moved to the annotation list
//!   when the lookahead finds the separator.
//! - With [`ReaderOptions::root`] set to a container kind the reader is
//!   *hoisted*: a synthetic frame of that kind sits below the datagram and
//!   the reader yields exactly one value out of it, at depth 0.
//!
//! Invariants
//! - `depth()` is the number of real frames: the stack length, minus the
//!   synthetic frame when hoisted.
//! - Annotations must be followed by a value.
//! - After any error the reader is poisoned and only reports
//!   [`ErrorKind::IllegalCursorState`].

mod grammar;
mod keywords;
pub(crate) mod tokenizer;


use std::io::Read;

use self::grammar::{Action, State};
use self::keywords::Keyword;
use self::tokenizer::{LobKind, Quoted, Token, TokenKind, Tokenizer, number};
use crate::descriptor::{Content, ValueDescriptor};
use crate::{
    DecodeError, Decimal, ErrorKind, Int, IonType, RawEvent, RawReader, RawSymbol, ReaderOptions,
    Result, RootKind, Timestamp, VERSION_MARKER_SID,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    BeforeValue,
    OnValue,
    ContainerEnd,
    StreamEnd,
    Failed,
}

#[derive(Debug, Clone, Copy)]
struct Frame {
    kind: IonType,
    /// The closing delimiter was consumed by an advance.
    closed: bool,
}

impl Frame {
    fn closer(self) -> u8 {
        match self.kind {
            IonType::Struct => b'}',
            IonType::List => b']',
            _ => b')',
        }
    }
}

/// What the current value's content is, as far as it was scanned.
#[derive(Debug)]
enum Payload {
    None,
    Bool(bool),
    /// `nan`, `+inf` and `-inf`.
    Float(f64),
    /// The text of a number or timestamp, parsed when read.
    Literal(String),
    Symbol(RawSymbol),
    /// A string whose body is still unscanned.
    Quoted(Token),
    Lob(LobKind),
    Container(Token),
}

/// Raw cursor over text input.
///
/// Field names and annotations are reported as the text they were written
/// with, or as ids for `$<digits>` identifiers.
pub struct TextReader<R> {
    tokenizer: Tokenizer<R>,
    state: State,
    stack: Vec<Frame>,
    hoisted: bool,
    /// The one value of a hoisted reader was loaded.
    root_done: bool,
    value: ValueDescriptor<Vec<RawSymbol>>,
    payload: Payload,
    phase: Phase,
}

impl<R: Read> TextReader<R> {
    /// Creates a reader with default options.
    pub fn new(reader: R) -> Self {
        Self::with_options(reader, ReaderOptions::default())
    }

    /// Creates a reader with the given options, hoisted when `root` names a
    /// container kind.
    pub fn with_options(reader: R, options: ReaderOptions) -> Self {
        let (stack, state) = match options.root {
            RootKind::Datagram => (Vec::new(), State::BeforeAnnotationDatagram),
            RootKind::Struct => (root_frame(IonType::Struct), State::BeforeFieldValue),
            RootKind::List => (root_frame(IonType::List), State::BeforeAnnotationContained),
            RootKind::Sexp => (root_frame(IonType::Sexp), State::BeforeAnnotationSexp),
        };
        Self {
            tokenizer: Tokenizer::new(reader, &options),
            state,
            hoisted: !stack.is_empty(),
            stack,
            root_done: false,
            value: ValueDescriptor::default(),
            payload: Payload::None,
            phase: Phase::BeforeValue,
        }
    }

    /// Absolute byte offset of the read position.
    pub fn position(&self) -> usize {
        self.tokenizer.position()
    }

    /// 1-based line of the read position.
    pub fn line(&self) -> usize {
        self.tokenizer.line()
    }

    /// 1-based column of the read position, in bytes.
    pub fn column(&self) -> usize {
        self.tokenizer.column()
    }

    /// Runs a cursor operation, poisoning the reader if it fails.
    fn guard<T>(&mut self, op: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        if self.phase == Phase::Failed {
            return Err(self.error(ErrorKind::IllegalCursorState(
                "reader failed on an earlier error",
            )));
        }
        let result = op(self);
        if let Err(err) = &result {
            log::debug!("text reader stopped: {err}");
            self.phase = Phase::Failed;
        }
        result
    }

    fn error(&self, kind: ErrorKind) -> DecodeError {
        self.tokenizer.error(kind)
    }

    /// The error for a token the grammar has no transition for.
    fn unexpected(&self, token: &Token) -> DecodeError {
        if token.kind == TokenKind::Eof {
            return self.error(ErrorKind::UnexpectedEndOfInput);
        }
        self.error(ErrorKind::SyntaxError {
            state: self.state.name(),
            token: token.kind.name(),
        })
    }

    fn at_hoisted_root(&self) -> bool {
        self.hoisted && self.stack.len() == 1
    }

    /// The state once a value at the current depth is complete.
    fn after_value_state(&self) -> State {
        match self.stack.last().map(|frame| frame.kind) {
            None => State::BeforeAnnotationDatagram,
            Some(IonType::Sexp) => State::BeforeAnnotationSexp,
            Some(_) => State::AfterValueContained,
        }
    }

    /// Scans past whatever is left of the current value and clears it.
    fn settle(&mut self) -> Result<()> {
        let unread = self.value.content == Content::Unread;
        match std::mem::replace(&mut self.payload, Payload::None) {
            Payload::Quoted(mut token) | Payload::Container(mut token) if unread => {
                self.tokenizer.finish_token(&mut token, false)?;
            }
            Payload::Lob(kind) => {
                debug_assert!(self.state.is_lob());
                if unread {
                    self.tokenizer.finish_lob(kind, false)?;
                }
                let close = self.tokenizer.next_lob_close()?;
                if grammar::action(self.state, close.kind) != Action::FinishLob {
                    return Err(self.unexpected(&close));
                }
                self.state = self.after_value_state();
            }
            _ => {}
        }
        self.value.reset();
        self.phase = Phase::BeforeValue;
        Ok(())
    }

    fn advance(&mut self) -> Result<RawEvent> {
        match self.phase {
            Phase::StreamEnd => return Ok(RawEvent::StreamEnd),
            Phase::ContainerEnd => return Ok(RawEvent::ContainerEnd),
            _ => {}
        }
        self.settle()?;
        if self.at_hoisted_root() && self.root_done {
            return Ok(self.end_stream());
        }

        loop {
            let token = self.tokenizer.next_token()?;
            if self.at_hoisted_root() && (token.kind == TokenKind::Eof || token.kind.closer().is_some()) {
                self.expect_no_annotations(&token)?;
                return Ok(self.end_stream());
            }
            let action = grammar::action(self.state, token.kind);
            log::trace!("{:?} + {} -> {action:?}", self.state, token.kind.name());
            match action {
                Action::Error | Action::FinishLob => return Err(self.unexpected(&token)),
                Action::FinishDatagram => {
                    self.expect_no_annotations(&token)?;
                    self.state = State::Eof;
                    return Ok(self.end_stream());
                }
                Action::FinishContainer => {
                    self.expect_no_annotations(&token)?;
                    self.close_container(&token)?;
                    self.phase = Phase::ContainerEnd;
                    return Ok(RawEvent::ContainerEnd);
                }
                Action::InterpretComma => {
                    self.state = if self.is_in_struct() {
                        State::BeforeFieldName
                    } else {
                        State::BeforeAnnotationContained
                    };
                }
                Action::LoadFieldName => self.load_field_name(token)?,
                Action::LoadAnnotation => {
                    if !self.load_symbol(token)? {
                        break;
                    }
                }
                Action::LoadScalar => {
                    self.load_scalar(token)?;
                    break;
                }
                Action::StartStruct => {
                    self.load_container(token, IonType::Struct);
                    break;
                }
                Action::StartList => {
                    self.load_container(token, IonType::List);
                    break;
                }
                Action::StartSexp => {
                    self.load_container(token, IonType::Sexp);
                    break;
                }
                Action::StartLob => {
                    self.load_lob()?;
                    break;
                }
            }
        }

        if self.at_hoisted_root() {
            self.root_done = true;
        }
        self.phase = Phase::OnValue;
        Ok(RawEvent::Value(self.value.ion_type.unwrap_or(IonType::Null)))
    }

    fn end_stream(&mut self) -> RawEvent {
        self.phase = Phase::StreamEnd;
        RawEvent::StreamEnd
    }

    fn expect_no_annotations(&self, token: &Token) -> Result<()> {
        if self.value.annotations.is_empty() {
            Ok(())
        } else {
            Err(self.unexpected(token))
        }
    }

    fn close_container(&mut self, token: &Token) -> Result<()> {
        let Some(frame) = self.stack.last_mut() else {
            return Err(self.unexpected(token));
        };
        let expected = frame.closer();
        match token.kind.closer() {
            Some(actual) if actual == expected => {
                frame.closed = true;
                Ok(())
            }
            actual => Err(self.error(ErrorKind::InvalidContainerClose {
                expected: char::from(expected),
                actual: actual.map_or('?', char::from),
            })),
        }
    }

    /// Decodes a quoted token's body as UTF-8 text.
    fn quoted_text(&mut self, mut token: Token) -> Result<String> {
        let save_point = self
            .tokenizer
            .finish_token(&mut token, true)?
            .ok_or_else(|| self.error(ErrorKind::IllegalCursorState("text was already scanned")))?;
        let quoted = Quoted {
            long: token.kind == TokenKind::LongString,
            clob: false,
        };
        let bytes = self.tokenizer.decode_quoted(&save_point, quoted);
        self.tokenizer.release(save_point);
        String::from_utf8(bytes?).map_err(|_| self.error(ErrorKind::InvalidUtf8))
    }

    fn load_field_name(&mut self, token: Token) -> Result<()> {
        let name = match token.kind {
            TokenKind::SymbolIdentifier => {
                keywords::symbol(self.tokenizer.text()).map_err(|kind| self.error(kind))?
            }
            _ => RawSymbol::Text(self.quoted_text(token)?),
        };
        let colon = self.tokenizer.next_token()?;
        if colon.kind != TokenKind::Colon {
            return Err(self.unexpected(&colon));
        }
        self.value.field = Some(name);
        self.state = State::BeforeFieldValue;
        Ok(())
    }

    /// Loads a symbol-looking token. Returns `true` when it turned out to be
    /// an annotation and scanning must go on.
    fn load_symbol(&mut self, token: Token) -> Result<bool> {
        let symbol = if token.kind == TokenKind::SymbolIdentifier {
            let text = self.tokenizer.text();
            if let Some(keyword) = keywords::keyword(text).map_err(|kind| self.error(kind))? {
                self.load_keyword(keyword);
                return Ok(false);
            }
            keywords::symbol(text).map_err(|kind| self.error(kind))?
        } else {
            RawSymbol::Text(self.quoted_text(token)?)
        };

        if self.tokenizer.double_colon_follows()? {
            self.value.annotations.push(symbol);
            return Ok(true);
        }
        let version_marker = self.stack.is_empty()
            && token.kind == TokenKind::SymbolIdentifier
            && self.value.annotations.is_empty()
            && symbol.text() == Some("$ion_1_0");
        if version_marker {
            log::trace!("version marker at {}", token.start);
            self.value.version_marker = true;
        }
        self.set_scalar(IonType::Symbol, Payload::Symbol(symbol));
        Ok(false)
    }

    fn load_keyword(&mut self, keyword: Keyword) {
        match keyword {
            Keyword::Null(ion_type) => {
                self.value.is_null = true;
                self.set_scalar(ion_type, Payload::None);
            }
            Keyword::Bool(value) => self.set_scalar(IonType::Bool, Payload::Bool(value)),
            Keyword::Nan => self.set_scalar(IonType::Float, Payload::Float(f64::NAN)),
        }
    }

    /// Records an eagerly scanned value.
    fn set_scalar(&mut self, ion_type: IonType, payload: Payload) {
        self.value.ion_type = Some(ion_type);
        self.value.content = Content::Consumed;
        self.payload = payload;
        self.state = self.after_value_state();
    }

    fn load_scalar(&mut self, token: Token) -> Result<()> {
        match token.kind {
            TokenKind::Number => {
                let text = self.tokenizer.text().to_owned();
                let ion_type = number::classify(&text).map_err(|kind| self.error(kind))?;
                self.set_scalar(ion_type, Payload::Literal(text));
            }
            TokenKind::Timestamp => {
                let text = self.tokenizer.text().to_owned();
                self.set_scalar(IonType::Timestamp, Payload::Literal(text));
            }
            TokenKind::PlusInf => self.set_scalar(IonType::Float, Payload::Float(f64::INFINITY)),
            TokenKind::MinusInf => {
                self.set_scalar(IonType::Float, Payload::Float(f64::NEG_INFINITY));
            }
            TokenKind::SymbolOperator => {
                let text = self.tokenizer.text().to_owned();
                self.set_scalar(IonType::Symbol, Payload::Symbol(RawSymbol::Text(text)));
            }
            TokenKind::String | TokenKind::LongString => {
                self.set_scalar(IonType::String, Payload::Quoted(token));
                self.value.content = Content::Unread;
            }
            _ => return Err(self.unexpected(&token)),
        }
        Ok(())
    }

    fn load_container(&mut self, token: Token, kind: IonType) {
        self.set_scalar(kind, Payload::Container(token));
        self.value.content = Content::Unread;
    }

    fn load_lob(&mut self) -> Result<()> {
        let kind = self.tokenizer.lob_kind()?;
        let (ion_type, state) = match kind {
            LobKind::Blob => (IonType::Blob, State::InBlob),
            LobKind::ShortClob => (IonType::Clob, State::InClobDoubleQuoted),
            LobKind::LongClob => (IonType::Clob, State::InClobTripleQuoted),
        };
        self.set_scalar(ion_type, Payload::Lob(kind));
        self.value.content = Content::Unread;
        self.state = state;
        Ok(())
    }

    /// Fails unless positioned on a non-null value of one of `types`.
    fn expect_type(&self, types: &[IonType], operation: &'static str) -> Result<()> {
        let matches = self.phase == Phase::OnValue
            && !self.value.is_null
            && self.value.ion_type.is_some_and(|t| types.contains(&t));
        if matches {
            Ok(())
        } else {
            Err(self.error(ErrorKind::IllegalCursorState(operation)))
        }
    }

    /// The text of a number or timestamp value.
    fn literal(&self, ion_type: IonType, operation: &'static str) -> Result<&str> {
        self.expect_type(&[ion_type], operation)?;
        match &self.payload {
            Payload::Literal(text) => Ok(text),
            _ => Err(self.error(ErrorKind::IllegalCursorState(operation))),
        }
    }

    fn int_value(&mut self) -> Result<Int> {
        let text = self.literal(IonType::Int, "read_int")?;
        number::parse_int(text).map_err(|kind| self.error(kind))
    }

    /// Takes the unread body of a string or lob, failing if it was read.
    fn take_unread(&mut self, types: &[IonType], operation: &'static str) -> Result<()> {
        self.expect_type(types, operation)?;
        if self.value.content != Content::Unread {
            return Err(self.error(ErrorKind::IllegalCursorState(
                "value content was already read",
            )));
        }
        self.value.content = Content::Consumed;
        Ok(())
    }

    fn enter(&mut self) -> Result<()> {
        if self.phase != Phase::OnValue || !self.value.is_steppable() {
            return Err(self.error(ErrorKind::IllegalCursorState(
                "step_in requires a container value",
            )));
        }
        if self.value.content != Content::Unread {
            return Err(self.error(ErrorKind::IllegalCursorState(
                "container was already stepped into",
            )));
        }
        let Some(kind) = self.value.ion_type else {
            return Err(self.error(ErrorKind::IllegalCursorState("no current value")));
        };
        self.stack.push(Frame {
            kind,
            closed: false,
        });
        self.state = match kind {
            IonType::Struct => State::BeforeFieldName,
            IonType::List => State::BeforeAnnotationContained,
            _ => State::BeforeAnnotationSexp,
        };
        self.payload = Payload::None;
        self.value.reset();
        self.phase = Phase::BeforeValue;
        log::trace!("step_in {kind}, depth {}", self.depth());
        Ok(())
    }

    fn leave(&mut self) -> Result<()> {
        if self.depth() == 0 {
            return Err(self.error(ErrorKind::IllegalCursorState("step_out at top level")));
        }
        self.settle()?;
        let Some(frame) = self.stack.pop() else {
            return Err(self.error(ErrorKind::IllegalCursorState("step_out at top level")));
        };
        if !frame.closed {
            self.tokenizer.skip_container(frame.closer())?;
        }
        self.state = self.after_value_state();
        log::trace!("step_out of {}, depth {}", frame.kind, self.depth());
        Ok(())
    }
}

fn root_frame(kind: IonType) -> Vec<Frame> {
    vec![Frame {
        kind,
        closed: false,
    }]
}

impl<'a> TextReader<&'a [u8]> {
    /// Creates a reader over a string.
    pub fn from_text(text: &'a str) -> Self {
        Self::new(text.as_bytes())
    }

    /// Creates a reader over an in-memory buffer of UTF-8 text.
    pub fn from_slice(bytes: &'a [u8]) -> Self {
        Self::new(bytes)
    }
}

impl<R: Read> RawReader for TextReader<R> {
    fn next(&mut self) -> Result<RawEvent> {
        self.guard(Self::advance)
    }

    fn step_in(&mut self) -> Result<()> {
        self.guard(Self::enter)
    }

    fn step_out(&mut self) -> Result<()> {
        self.guard(Self::leave)
    }

    fn depth(&self) -> usize {
        self.stack.len() - usize::from(self.hoisted)
    }

    fn is_in_struct(&self) -> bool {
        self.depth() > 0 && self.stack.last().is_some_and(|frame| frame.kind == IonType::Struct)
    }

    fn ion_type(&self) -> Option<IonType> {
        match self.phase {
            Phase::OnValue => self.value.ion_type,
            _ => None,
        }
    }

    fn is_null(&self) -> bool {
        self.phase == Phase::OnValue && self.value.is_null
    }

    fn is_version_marker(&self) -> bool {
        self.phase == Phase::OnValue && self.value.version_marker
    }

    fn field_name(&self) -> Option<&RawSymbol> {
        self.value.field.as_ref()
    }

    fn annotations(&mut self) -> Result<Vec<RawSymbol>> {
        self.guard(|reader| Ok(reader.value.annotations.clone()))
    }

    fn read_bool(&mut self) -> Result<bool> {
        self.guard(|reader| {
            reader.expect_type(&[IonType::Bool], "read_bool")?;
            match reader.payload {
                Payload::Bool(value) => Ok(value),
                _ => Err(reader.error(ErrorKind::IllegalCursorState("read_bool"))),
            }
        })
    }

    fn read_int(&mut self) -> Result<Int> {
        self.guard(Self::int_value)
    }

    fn read_i64(&mut self) -> Result<i64> {
        self.guard(|reader| {
            let value = reader.int_value()?;
            value
                .as_i64()
                .ok_or_else(|| reader.error(ErrorKind::IntegerOverflow { bits: 64 }))
        })
    }

    fn read_f64(&mut self) -> Result<f64> {
        self.guard(|reader| {
            if let Payload::Float(value) = reader.payload {
                reader.expect_type(&[IonType::Float], "read_f64")?;
                return Ok(value);
            }
            let text = reader.literal(IonType::Float, "read_f64")?;
            number::parse_float(text).map_err(|kind| reader.error(kind))
        })
    }

    fn read_decimal(&mut self) -> Result<Decimal> {
        self.guard(|reader| {
            let text = reader.literal(IonType::Decimal, "read_decimal")?;
            number::parse_decimal(text).map_err(|kind| reader.error(kind))
        })
    }

    fn read_timestamp(&mut self) -> Result<Timestamp> {
        self.guard(|reader| {
            let text = reader.literal(IonType::Timestamp, "read_timestamp")?;
            number::parse_timestamp(text).map_err(|kind| reader.error(kind))
        })
    }

    fn read_symbol(&mut self) -> Result<RawSymbol> {
        self.guard(|reader| {
            reader.expect_type(&[IonType::Symbol], "read_symbol")?;
            if reader.value.version_marker {
                return Ok(RawSymbol::Id(VERSION_MARKER_SID));
            }
            match &reader.payload {
                Payload::Symbol(symbol) => Ok(symbol.clone()),
                _ => Err(reader.error(ErrorKind::IllegalCursorState("read_symbol"))),
            }
        })
    }

    fn read_str(&mut self) -> Result<String> {
        self.guard(|reader| {
            reader.take_unread(&[IonType::String], "read_str")?;
            match std::mem::replace(&mut reader.payload, Payload::None) {
                Payload::Quoted(token) => reader.quoted_text(token),
                _ => Err(reader.error(ErrorKind::IllegalCursorState("read_str"))),
            }
        })
    }

    fn read_lob(&mut self) -> Result<Vec<u8>> {
        self.guard(|reader| {
            reader.take_unread(&[IonType::Blob, IonType::Clob], "read_lob")?;
            let Payload::Lob(kind) = reader.payload else {
                return Err(reader.error(ErrorKind::IllegalCursorState("read_lob")));
            };
            let save_point = reader
                .tokenizer
                .finish_lob(kind, true)?
                .ok_or_else(|| reader.error(ErrorKind::IllegalCursorState("read_lob")))?;
            let bytes = match kind {
                LobKind::Blob => reader.tokenizer.decode_blob(&save_point),
                LobKind::ShortClob | LobKind::LongClob => {
                    let quoted = Quoted {
                        long: kind == LobKind::LongClob,
                        clob: true,
                    };
                    reader.tokenizer.decode_quoted(&save_point, quoted)
                }
            };
            reader.tokenizer.release(save_point);
            bytes
        })
    }
}
