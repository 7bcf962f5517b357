//! Pull decoder for the binary encoding.
//!
//! Overview
//! - Every value starts with a one-byte type descriptor, optionally followed
//!   by a VarUInt length, see [`header`]. Inside a struct the descriptor is
//!   preceded by the field's symbol id.
//! - Containers are length-prefixed. Each [`BinaryReader::step_in`] pushes a
//!   frame remembering where the container ends and narrows the byte budget
//!   to the container's length; [`BinaryReader::step_out`] skips whatever is
//!   left and restores the parent's budget.
//! - Values are lazy: advancing past a value that was not read skips its body
//!   without decoding it.
//! - The annotation symbol ids of a wrapped value are not decoded on the way
//!   in. The reader keeps a save point over them so they can be replayed on
//!   demand while positioned on the value.
//!
//! Invariants
//! - Every byte consumed inside a container is charged against the budget of
//!   the innermost frame; a value can never read past its container.
//! - An annotation wrapper ends exactly where its wrapped value ends.
//! - After any error the reader is poisoned and only reports
//!   [`ErrorKind::IllegalCursorState`].

mod header;
mod scalars;
pub mod varint;


use std::io::Read;

use self::header::{Header, Length, TYPE_NEG_INT, VERSION_MARKER};
use self::varint::{ByteSource, decode_var_uint};
use crate::descriptor::{Content, ValueDescriptor};
use crate::input::{Input, Pinned, Replay, SavePoint};
use crate::{
    DecodeError, Decimal, ErrorKind, Int, IonType, Position, RawEvent, RawReader, RawSymbol,
    ReaderOptions, Result, Timestamp, VERSION_MARKER_SID,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    BeforeValue,
    OnValue,
    ContainerEnd,
    StreamEnd,
    Failed,
}

/// A container the cursor has stepped into.
#[derive(Debug, Clone, Copy)]
struct Frame {
    kind: IonType,
    /// Absolute offset just past the container's last byte.
    resume: usize,
    /// The parent's budget once this container has been consumed.
    parent_remaining: Option<usize>,
}

/// Raw cursor over binary input.
///
/// Field names and annotations are reported as symbol ids. A leading (or
/// interleaved top-level) version marker is reported as a symbol value with
/// id [`VERSION_MARKER_SID`] and [`RawReader::is_version_marker`] set.
pub struct BinaryReader<R> {
    input: Input<R>,
    stack: Vec<Frame>,
    /// Bytes left in the innermost container; `None` at top level.
    remaining: Option<usize>,
    value: ValueDescriptor<Option<SavePoint>>,
    /// Type descriptor of the current value, for the payloads it carries.
    descriptor: u8,
    state: State,
}

impl<R: Read> BinaryReader<R> {
    /// Creates a reader with default options.
    pub fn new(reader: R) -> Self {
        Self::with_options(reader, ReaderOptions::default())
    }

    /// Creates a reader with the given options. `root` is ignored: binary
    /// input always starts at the datagram.
    pub fn with_options(reader: R, options: ReaderOptions) -> Self {
        Self {
            input: Input::new(reader, &options, false),
            stack: Vec::new(),
            remaining: None,
            value: ValueDescriptor::default(),
            descriptor: 0,
            state: State::BeforeValue,
        }
    }

    /// Absolute byte offset of the read position.
    pub fn position(&self) -> usize {
        self.input.position()
    }

    /// Symbol id of the current field name.
    pub fn field_id(&self) -> Option<u64> {
        self.value.field.as_ref().and_then(RawSymbol::id)
    }

    /// Decodes the annotation symbol ids of the current value, in order.
    ///
    /// Can be called any number of times while positioned on the value.
    pub fn annotation_ids(&mut self) -> Result<Vec<u64>> {
        self.guard(|reader| {
            let Some(span) = reader.value.annotations.clone() else {
                return Ok(Vec::new());
            };
            let mut replay = Replay::enter(&mut reader.input, &span);
            let mut ids = Vec::new();
            while replay.peek()?.is_some() {
                ids.push(decode_var_uint(&mut *replay, 32)?);
            }
            Ok(ids)
        })
    }

    /// Reads the next part of the current blob or clob into `out`.
    ///
    /// Returns the number of bytes written, `0` once the body is exhausted or
    /// when `out` is empty.
    /// Advancing afterwards skips only the part that was not read.
    pub fn read_lob_chunk(&mut self, out: &mut [u8]) -> Result<usize> {
        self.guard(|reader| {
            reader.expect_type(&[IonType::Blob, IonType::Clob], "read_lob_chunk")?;
            if out.is_empty() {
                return Ok(0);
            }
            let consumed = match reader.value.content {
                Content::Unread => 0,
                Content::Partial { consumed } => consumed,
                Content::Consumed => return Ok(0),
            };
            let n = out.len().min(reader.value.raw_length - consumed);
            reader.charge(n)?;
            reader.input.read_exact(&mut out[..n])?;
            let consumed = consumed + n;
            reader.value.content = if consumed == reader.value.raw_length {
                Content::Consumed
            } else {
                Content::Partial { consumed }
            };
            Ok(n)
        })
    }

    /// Reads the current string as UTF-16 code units. Supplementary code
    /// points become surrogate pairs.
    pub fn read_utf16(&mut self) -> Result<Vec<u16>> {
        Ok(self.read_str()?.encode_utf16().collect())
    }

    /// Runs a cursor operation, poisoning the reader if it fails.
    fn guard<T>(&mut self, op: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        if self.state == State::Failed {
            return Err(self.error(ErrorKind::IllegalCursorState(
                "reader failed on an earlier error",
            )));
        }
        let result = op(self);
        if let Err(err) = &result {
            log::debug!("binary reader stopped: {err}");
            if let Some(span) = self.value.annotations.take() {
                self.input.release(span);
            }
            self.state = State::Failed;
        }
        result
    }

    fn error(&self, kind: ErrorKind) -> DecodeError {
        self.input.error(kind)
    }

    fn malformed(&self, descriptor: u8, reason: &'static str) -> DecodeError {
        self.error(ErrorKind::malformed(descriptor, reason))
    }

    /// Charges `n` bytes against the innermost container's budget.
    fn charge(&mut self, n: usize) -> Result<()> {
        if let Some(remaining) = &mut self.remaining {
            if n > *remaining {
                return Err(self.input.error(ErrorKind::UnexpectedEndOfInput));
            }
            *remaining -= n;
        }
        Ok(())
    }

    fn take_byte(&mut self) -> Result<u8> {
        self.charge(1)?;
        self.input.read_required()
    }

    fn read_length(&mut self) -> Result<usize> {
        let length = decode_var_uint(self, 32)?;
        usize::try_from(length).map_err(|_| self.error(ErrorKind::IntegerOverflow { bits: 32 }))
    }

    /// Skips what is left of the current value and clears the descriptor.
    fn skip_current(&mut self) -> Result<()> {
        if let Some(span) = self.value.annotations.take() {
            self.input.release(span);
        }
        let unread = self.value.unread_length();
        if unread > 0 {
            self.charge(unread)?;
            if self.input.skip(unread)? < unread {
                return Err(self.error(ErrorKind::UnexpectedEndOfInput));
            }
        }
        self.value.reset();
        self.state = State::BeforeValue;
        Ok(())
    }

    fn advance(&mut self) -> Result<RawEvent> {
        match self.state {
            State::StreamEnd => return Ok(RawEvent::StreamEnd),
            State::ContainerEnd => return Ok(RawEvent::ContainerEnd),
            _ => {}
        }
        self.skip_current()?;

        #[cfg(any(test, feature = "fuzzing"))]
        if let (Some(frame), Some(remaining)) = (self.stack.last(), self.remaining) {
            assert_eq!(
                self.input.position() + remaining,
                frame.resume,
                "container budget out of sync with its end offset"
            );
        }

        if self.remaining == Some(0) {
            self.state = State::ContainerEnd;
            return Ok(RawEvent::ContainerEnd);
        }
        if self.is_in_struct() {
            let sid = decode_var_uint(self, 32)?;
            self.value.field = Some(RawSymbol::Id(sid));
        }

        let descriptor = if self.stack.is_empty() {
            let Some(byte) = self.input.read()? else {
                self.state = State::StreamEnd;
                return Ok(RawEvent::StreamEnd);
            };
            byte
        } else {
            self.take_byte()?
        };

        match Header::decode(descriptor).map_err(|kind| self.error(kind))? {
            Header::VersionMarker => self.load_version_marker(descriptor)?,
            Header::Annotation(length) => self.load_annotated(descriptor, length)?,
            header => self.load_value(descriptor, header)?,
        }
        self.state = State::OnValue;
        let ion_type = self.value.ion_type.unwrap_or(IonType::Null);
        Ok(RawEvent::Value(ion_type))
    }

    fn load_version_marker(&mut self, descriptor: u8) -> Result<()> {
        if !self.stack.is_empty() {
            return Err(self.malformed(descriptor, "version marker inside a container"));
        }
        let mut rest = [0u8; 3];
        self.input.read_exact(&mut rest)?;
        if rest != VERSION_MARKER[1..] {
            return Err(self.malformed(descriptor, "unsupported version marker"));
        }
        log::trace!("version marker at {}", self.input.position() - 4);
        self.descriptor = descriptor;
        self.value.ion_type = Some(IonType::Symbol);
        self.value.version_marker = true;
        self.value.content = Content::Consumed;
        Ok(())
    }

    fn load_annotated(&mut self, descriptor: u8, length: Length) -> Result<()> {
        let wrapper_length = match length {
            Length::Nibble(n) => usize::from(n),
            _ => self.read_length()?,
        };
        let declared = self.input.position() + wrapper_length;

        let annotations_length = self.read_length()?;
        if annotations_length == 0 {
            return Err(self.malformed(descriptor, "annotation wrapper without annotations"));
        }
        self.charge(annotations_length)?;
        let mut scan = Pinned::new(&mut self.input, true);
        if scan.skip(annotations_length)? < annotations_length {
            return Err(scan.error(ErrorKind::UnexpectedEndOfInput));
        }
        self.value.annotations = scan.keep(0);

        let inner = self.take_byte()?;
        match Header::decode(inner).map_err(|kind| self.error(kind))? {
            Header::Annotation(_) => {
                return Err(self.malformed(inner, "annotation wrapper inside a wrapper"));
            }
            Header::VersionMarker => {
                return Err(self.malformed(inner, "annotated version marker"));
            }
            header => self.load_value(inner, header)?,
        }

        let actual = self.input.position() + self.value.raw_length;
        if actual != declared {
            return Err(self.error(ErrorKind::WrapperLengthMismatch { declared, actual }));
        }
        Ok(())
    }

    fn load_value(&mut self, descriptor: u8, header: Header) -> Result<()> {
        self.descriptor = descriptor;
        match header {
            Header::Null(ion_type) => {
                self.value.ion_type = Some(ion_type);
                self.value.is_null = true;
                self.value.content = Content::Consumed;
            }
            Header::Bool(_) => {
                self.value.ion_type = Some(IonType::Bool);
                self.value.content = Content::Consumed;
            }
            Header::Value { ion_type, length } => {
                let raw_length = match length {
                    Length::Nibble(n) => usize::from(n),
                    Length::VarUInt => self.read_length()?,
                    Length::OrderedStruct => match self.read_length()? {
                        0 => return Err(self.malformed(descriptor, "empty ordered struct")),
                        n => n,
                    },
                };
                if self.remaining.is_some_and(|remaining| raw_length > remaining) {
                    return Err(self.malformed(descriptor, "value is longer than its container"));
                }
                self.value.ion_type = Some(ion_type);
                self.value.raw_length = raw_length;
            }
            Header::Annotation(_) | Header::VersionMarker => {
                return Err(self.malformed(descriptor, "not a value header"));
            }
        }
        Ok(())
    }

    /// Fails unless positioned on a non-null value of one of `types`.
    fn expect_type(&self, types: &[IonType], operation: &'static str) -> Result<()> {
        let matches = self.state == State::OnValue
            && !self.value.is_null
            && self.value.ion_type.is_some_and(|t| types.contains(&t));
        if matches {
            Ok(())
        } else {
            Err(self.error(ErrorKind::IllegalCursorState(operation)))
        }
    }

    /// Reads the whole unread body of the current value.
    fn take_body(&mut self, types: &[IonType], operation: &'static str) -> Result<(usize, Vec<u8>)> {
        self.expect_type(types, operation)?;
        if self.value.content != Content::Unread {
            return Err(self.error(ErrorKind::IllegalCursorState(
                "value content was already read",
            )));
        }
        let start = self.input.position();
        let mut body = vec![0; self.value.raw_length];
        self.charge(body.len())?;
        self.input.read_exact(&mut body)?;
        self.value.content = Content::Consumed;
        Ok((start, body))
    }

    fn int_value(&mut self) -> Result<Int> {
        let (_, body) = self.take_body(&[IonType::Int], "read_int")?;
        let negative = self.descriptor >> 4 == TYPE_NEG_INT;
        scalars::decode_int(negative, &body).map_err(|kind| self.error(kind))
    }

    fn enter(&mut self) -> Result<()> {
        if self.state != State::OnValue || !self.value.is_steppable() {
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
        if let Some(span) = self.value.annotations.take() {
            self.input.release(span);
        }
        let length = self.value.raw_length;
        self.stack.push(Frame {
            kind,
            resume: self.input.position() + length,
            parent_remaining: self.remaining.map(|remaining| remaining.saturating_sub(length)),
        });
        self.remaining = Some(length);
        self.value.reset();
        self.state = State::BeforeValue;
        log::trace!("step_in {kind} of {length} bytes, depth {}", self.stack.len());
        Ok(())
    }

    fn leave(&mut self) -> Result<()> {
        let Some(frame) = self.stack.pop() else {
            return Err(self.error(ErrorKind::IllegalCursorState("step_out at top level")));
        };
        if let Some(span) = self.value.annotations.take() {
            self.input.release(span);
        }
        let position = self.input.position();
        if position > frame.resume {
            return Err(self.error(ErrorKind::IllegalCursorState(
                "read past the end of the container",
            )));
        }
        let rest = frame.resume - position;
        if self.input.skip(rest)? < rest {
            return Err(self.error(ErrorKind::UnexpectedEndOfInput));
        }
        self.remaining = frame.parent_remaining;
        self.value.reset();
        self.state = State::BeforeValue;
        log::trace!("step_out of {}, depth {}", frame.kind, self.stack.len());
        Ok(())
    }
}

impl<'a> BinaryReader<&'a [u8]> {
    /// Creates a reader over an in-memory buffer.
    pub fn from_slice(bytes: &'a [u8]) -> Self {
        Self::new(bytes)
    }
}

impl<R: Read> ByteSource for BinaryReader<R> {
    type Error = DecodeError;

    fn next_byte(&mut self) -> Result<u8> {
        self.take_byte()
    }

    fn overflow(&self, bits: u32) -> DecodeError {
        self.error(ErrorKind::IntegerOverflow { bits })
    }
}

/// Annotation replays read straight from the input; the wrapper was already
/// charged when it was skipped.
impl<R: Read> ByteSource for Input<R> {
    type Error = DecodeError;

    fn next_byte(&mut self) -> Result<u8> {
        self.read_required()
    }

    fn overflow(&self, bits: u32) -> DecodeError {
        self.error(ErrorKind::IntegerOverflow { bits })
    }
}

impl<R: Read> RawReader for BinaryReader<R> {
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
        self.stack.len()
    }

    fn is_in_struct(&self) -> bool {
        self.stack.last().is_some_and(|frame| frame.kind == IonType::Struct)
    }

    fn ion_type(&self) -> Option<IonType> {
        match self.state {
            State::OnValue => self.value.ion_type,
            _ => None,
        }
    }

    fn is_null(&self) -> bool {
        self.state == State::OnValue && self.value.is_null
    }

    fn is_version_marker(&self) -> bool {
        self.state == State::OnValue && self.value.version_marker
    }

    fn field_name(&self) -> Option<&RawSymbol> {
        self.value.field.as_ref()
    }

    fn annotations(&mut self) -> Result<Vec<RawSymbol>> {
        Ok(self
            .annotation_ids()?
            .into_iter()
            .map(RawSymbol::Id)
            .collect())
    }

    fn read_bool(&mut self) -> Result<bool> {
        self.guard(|reader| {
            reader.expect_type(&[IonType::Bool], "read_bool")?;
            Ok(reader.descriptor & 0x0F == 1)
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
            let (_, body) = reader.take_body(&[IonType::Float], "read_f64")?;
            scalars::decode_float(&body).map_err(|kind| reader.error(kind))
        })
    }

    fn read_decimal(&mut self) -> Result<Decimal> {
        self.guard(|reader| {
            let (_, body) = reader.take_body(&[IonType::Decimal], "read_decimal")?;
            scalars::decode_decimal(&body).map_err(|kind| reader.error(kind))
        })
    }

    fn read_timestamp(&mut self) -> Result<Timestamp> {
        self.guard(|reader| {
            let (_, body) = reader.take_body(&[IonType::Timestamp], "read_timestamp")?;
            scalars::decode_timestamp(&body).map_err(|kind| reader.error(kind))
        })
    }

    fn read_symbol(&mut self) -> Result<RawSymbol> {
        self.guard(|reader| {
            if reader.value.version_marker {
                reader.expect_type(&[IonType::Symbol], "read_symbol")?;
                return Ok(RawSymbol::Id(VERSION_MARKER_SID));
            }
            let (_, body) = reader.take_body(&[IonType::Symbol], "read_symbol")?;
            let sid = scalars::decode_symbol_id(&body).map_err(|kind| reader.error(kind))?;
            Ok(RawSymbol::Id(sid))
        })
    }

    fn read_str(&mut self) -> Result<String> {
        self.guard(|reader| {
            let (start, body) = reader.take_body(&[IonType::String], "read_str")?;
            String::from_utf8(body).map_err(|err| {
                let position = Position {
                    offset: start + err.utf8_error().valid_up_to(),
                    line_column: None,
                };
                DecodeError::new(ErrorKind::InvalidUtf8, position)
            })
        })
    }

    fn read_lob(&mut self) -> Result<Vec<u8>> {
        self.guard(|reader| {
            let (_, body) = reader.take_body(&[IonType::Blob, IonType::Clob], "read_lob")?;
            Ok(body)
        })
    }
}
