//! Buffered byte source with re-enterable save points.
//!
//! Overview
//! - `Input` pulls bytes from any [`Read`] in chunks of
//!   [`ReaderOptions::chunk_size`] and keeps them in a window that starts at
//!   absolute offset `base`. Consumed bytes are discarded on refill unless
//!   something still needs them.
//! - A [`SavePoint`] marks a half-open range `[start, end)` of the input. It
//!   pins the window so that every byte from `start` onwards survives
//!   compaction until the save point is released.
//! - A save point can be *entered*: the read position jumps to `start`, reads
//!   stop at `end`, and leaving restores the outer position, limit and line
//!   state. Entering nests, so a save point can be replayed while another one
//!   is being replayed.
//!
//! Invariants
//! - `base <= pos <= base + buf.len()`.
//! - Pins are released in reverse order of acquisition.
//! - At least `LOOKBEHIND` consumed bytes are retained so the tokenizer can
//!   unread its lookahead.
//! - Line tracking treats `\r`, `\n` and `\r\n` as one newline each; a single
//!   `unread` restores the previous line state exactly.

use std::io::{self, Read};
use std::ops::{Deref, DerefMut};

use crate::{DecodeError, ErrorKind, Position, ReaderOptions, Result};

/// How many consumed bytes survive compaction.
const LOOKBEHIND: usize = 16;

/// A pinned, re-enterable range of the input.
///
/// Created open by [`Input::begin_save_point`], closed by
/// [`Input::end_save_point_before`] and released by [`Input::release`].
/// Scans take one through [`Pinned`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SavePoint {
    start: usize,
    end: usize,
    line: usize,
    line_start: usize,
}

impl SavePoint {
    pub(crate) fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }
}

/// Outer state saved while a save point is being replayed.
#[derive(Debug, Clone, Copy)]
struct ActiveFrame {
    resume: usize,
    limit: usize,
    line: usize,
    line_start: usize,
    prev_line_start: usize,
}

pub(crate) struct Input<R> {
    reader: R,
    buf: Vec<u8>,
    base: usize,
    pos: usize,
    /// Reads stop here while a save point is active.
    limit: usize,
    eof: bool,

    chunk_size: usize,
    max_skip: usize,

    track_lines: bool,
    line: usize,
    line_start: usize,
    prev_line_start: usize,

    pins: Vec<usize>,
    active: Vec<ActiveFrame>,
}

impl<R: Read> Input<R> {
    pub(crate) fn new(reader: R, options: &ReaderOptions, track_lines: bool) -> Self {
        Self {
            reader,
            buf: Vec::with_capacity(options.chunk_size),
            base: 0,
            pos: 0,
            limit: usize::MAX,
            eof: false,
            chunk_size: options.chunk_size.max(1),
            max_skip: options.max_skip.max(1),
            track_lines,
            line: 1,
            line_start: 0,
            prev_line_start: 0,
            pins: Vec::new(),
            active: Vec::new(),
        }
    }

    #[inline]
    pub(crate) fn position(&self) -> usize {
        self.pos
    }

    pub(crate) fn line(&self) -> usize {
        self.line
    }

    pub(crate) fn column(&self) -> usize {
        self.pos - self.line_start + 1
    }

    pub(crate) fn location(&self) -> Position {
        Position {
            offset: self.pos,
            line_column: self.track_lines.then(|| (self.line, self.column())),
        }
    }

    pub(crate) fn error(&self, kind: ErrorKind) -> DecodeError {
        DecodeError::new(kind, self.location())
    }

    /// Whether a save point is currently being replayed.
    pub(crate) fn is_replaying(&self) -> bool {
        !self.active.is_empty()
    }

    /// Number of bytes buffered past the read position.
    #[inline]
    fn buffered(&self) -> usize {
        self.base + self.buf.len() - self.pos
    }

    fn compact(&mut self) {
        let mut keep_from = self.pos.saturating_sub(LOOKBEHIND);
        if let Some(&pin) = self.pins.iter().min() {
            keep_from = keep_from.min(pin);
        }
        for frame in &self.active {
            keep_from = keep_from.min(frame.resume.saturating_sub(LOOKBEHIND));
        }
        if keep_from > self.base {
            let drop = (keep_from - self.base).min(self.buf.len());
            self.buf.drain(..drop);
            self.base += drop;
        }
    }

    /// Reads one more chunk from the underlying reader. Returns `false` once
    /// the reader is exhausted.
    fn fill(&mut self) -> Result<bool> {
        if self.eof {
            return Ok(false);
        }
        self.compact();
        let old_len = self.buf.len();
        self.buf.resize(old_len + self.chunk_size, 0);
        let read = loop {
            match self.reader.read(&mut self.buf[old_len..]) {
                Ok(n) => break n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                Err(err) => {
                    self.buf.truncate(old_len);
                    return Err(self.error(ErrorKind::Io(err)));
                }
            }
        };
        self.buf.truncate(old_len + read);
        if read == 0 {
            self.eof = true;
        }
        Ok(read > 0)
    }

    /// Returns the next byte without consuming it, or `None` at the end of the
    /// input or of the active save point.
    #[inline]
    pub(crate) fn peek(&mut self) -> Result<Option<u8>> {
        if self.pos >= self.limit {
            return Ok(None);
        }
        loop {
            if self.buffered() > 0 {
                return Ok(Some(self.buf[self.pos - self.base]));
            }
            if !self.fill()? {
                return Ok(None);
            }
        }
    }

    /// Consumes the next byte.
    #[inline]
    pub(crate) fn read(&mut self) -> Result<Option<u8>> {
        let Some(byte) = self.peek()? else {
            return Ok(None);
        };
        self.pos += 1;
        if self.track_lines {
            self.observe(byte);
        }
        Ok(Some(byte))
    }

    /// Consumes the next byte, failing with `UnexpectedEndOfInput` at the end.
    pub(crate) fn read_required(&mut self) -> Result<u8> {
        self.read()?
            .ok_or_else(|| self.error(ErrorKind::UnexpectedEndOfInput))
    }

    /// Line bookkeeping for a byte that was just consumed.
    fn observe(&mut self, byte: u8) {
        match byte {
            b'\n' if self.previous_byte(self.pos - 1) == Some(b'\r') => {
                self.line_start = self.pos;
            }
            b'\n' | b'\r' => {
                self.line += 1;
                self.prev_line_start = self.line_start;
                self.line_start = self.pos;
            }
            _ => {}
        }
    }

    fn previous_byte(&self, offset: usize) -> Option<u8> {
        let offset = offset.checked_sub(1)?;
        if offset < self.base {
            return None;
        }
        self.buf.get(offset - self.base).copied()
    }

    /// Steps back over the most recently consumed byte.
    pub(crate) fn unread(&mut self) {
        debug_assert!(self.pos > self.base, "unread past the retained window");
        self.pos -= 1;
        if !self.track_lines {
            return;
        }
        match self.buf[self.pos - self.base] {
            b'\n' if self.previous_byte(self.pos) == Some(b'\r') => {
                self.line_start = self.pos;
            }
            b'\n' | b'\r' => {
                self.line -= 1;
                self.line_start = self.prev_line_start;
            }
            _ => {}
        }
    }

    /// Steps back over `n` bytes. Line state is exact for one newline only.
    pub(crate) fn unread_n(&mut self, n: usize) {
        for _ in 0..n {
            self.unread();
        }
    }

    /// Peeks `n` bytes ahead (0 is the next byte) without consuming.
    pub(crate) fn peek_at(&mut self, n: usize) -> Result<Option<u8>> {
        if self.pos + n >= self.limit {
            return Ok(None);
        }
        while self.buffered() <= n {
            if !self.fill()? {
                return Ok(None);
            }
        }
        Ok(Some(self.buf[self.pos - self.base + n]))
    }

    /// Fills `out` completely or fails with `UnexpectedEndOfInput`.
    pub(crate) fn read_exact(&mut self, out: &mut [u8]) -> Result<()> {
        let mut done = 0;
        while done < out.len() {
            if self.pos >= self.limit {
                return Err(self.error(ErrorKind::UnexpectedEndOfInput));
            }
            if self.buffered() == 0 && !self.fill()? {
                return Err(self.error(ErrorKind::UnexpectedEndOfInput));
            }
            let start = self.pos - self.base;
            let take = (out.len() - done)
                .min(self.buffered())
                .min(self.limit - self.pos);
            out[done..done + take].copy_from_slice(&self.buf[start..start + take]);
            done += take;
            self.pos += take;
        }
        Ok(())
    }

    /// Advances `n` bytes without line tracking, in chunks of at most
    /// `max_skip`. Returns how many bytes were actually skipped, which is
    /// less than `n` only at the end of the input.
    pub(crate) fn skip(&mut self, n: usize) -> Result<usize> {
        let mut skipped = 0;
        while skipped < n {
            let chunk = (n - skipped).min(self.max_skip);
            let moved = self.skip_chunk(chunk)?;
            skipped += moved;
            if moved < chunk {
                break;
            }
        }
        Ok(skipped)
    }

    fn skip_chunk(&mut self, n: usize) -> Result<usize> {
        let n = n.min(self.limit.saturating_sub(self.pos));
        let in_buffer = n.min(self.buffered());
        self.pos += in_buffer;
        let mut remaining = n - in_buffer;
        if remaining == 0 {
            return Ok(n);
        }

        if self.pins.is_empty() && self.active.is_empty() {
            // Nothing needs the skipped bytes: drop the window and stream
            // straight past them.
            self.buf.clear();
            self.base = self.pos;
            let mut rest = (&mut self.reader).take(remaining as u64);
            let copied = io::copy(&mut rest, &mut io::sink());
            let copied = copied.map_err(|err| self.error(ErrorKind::Io(err)))?;
            let copied = usize::try_from(copied).unwrap_or(remaining);
            self.pos += copied;
            self.base = self.pos;
            if copied < remaining {
                self.eof = true;
            }
            return Ok(n - (remaining - copied));
        }

        while remaining > 0 {
            if !self.fill()? {
                break;
            }
            let take = remaining.min(self.buffered());
            self.pos += take;
            remaining -= take;
        }
        Ok(n - remaining)
    }

    /// Opens a save point at the current position and pins it.
    pub(crate) fn begin_save_point(&mut self) -> SavePoint {
        self.pins.push(self.pos);
        SavePoint {
            start: self.pos,
            end: usize::MAX,
            line: self.line,
            line_start: self.line_start,
        }
    }

    /// Closes an open save point `back` bytes before the current position.
    pub(crate) fn end_save_point_before(&self, save_point: &mut SavePoint, back: usize) {
        save_point.end = self.pos - back;
    }

    /// Drops the pin held by `save_point`.
    pub(crate) fn release(&mut self, save_point: SavePoint) {
        debug_assert_eq!(
            self.pins.last(),
            Some(&save_point.start),
            "save points must be released in reverse order"
        );
        if let Some(index) = self.pins.iter().rposition(|&pin| pin == save_point.start) {
            self.pins.remove(index);
        }
        log::trace!("released save point {}..{}", save_point.start, save_point.end);
    }

    #[cfg(test)]
    pub(crate) fn pinned(&self) -> usize {
        self.pins.len()
    }

    fn push_active(&mut self, save_point: &SavePoint) {
        log::trace!("entering save point {}..{}", save_point.start, save_point.end);
        self.active.push(ActiveFrame {
            resume: self.pos,
            limit: self.limit,
            line: self.line,
            line_start: self.line_start,
            prev_line_start: self.prev_line_start,
        });
        self.pos = save_point.start;
        self.limit = save_point.end;
        self.line = save_point.line;
        self.line_start = save_point.line_start;
        self.prev_line_start = save_point.line_start;
    }

    fn pop_active(&mut self) {
        if let Some(frame) = self.active.pop() {
            self.pos = frame.resume;
            self.limit = frame.limit;
            self.line = frame.line;
            self.line_start = frame.line_start;
            self.prev_line_start = frame.prev_line_start;
        }
    }
}

/// Something that owns an [`Input`] and can therefore replay save points.
pub(crate) trait InputOwner {
    type Source: Read;

    fn input_mut(&mut self) -> &mut Input<Self::Source>;
}

impl<R: Read> InputOwner for Input<R> {
    type Source = R;

    fn input_mut(&mut self) -> &mut Input<R> {
        self
    }
}

/// Scoped replay of a save point.
///
/// While the guard lives, reads on the owner's input are confined to the save
/// point's range. Dropping the guard, on success or on an early `?` return,
/// restores the outer position.
pub(crate) struct Replay<'a, T: InputOwner> {
    owner: &'a mut T,
}

impl<'a, T: InputOwner> Replay<'a, T> {
    pub(crate) fn enter(owner: &'a mut T, save_point: &SavePoint) -> Self {
        owner.input_mut().push_active(save_point);
        Self { owner }
    }
}

impl<T: InputOwner> Drop for Replay<'_, T> {
    fn drop(&mut self) {
        self.owner.input_mut().pop_active();
    }
}

impl<T: InputOwner> Deref for Replay<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.owner
    }
}

impl<T: InputOwner> DerefMut for Replay<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.owner
    }
}

/// Scoped pin taken while a range is being scanned.
///
/// The pin is opened at the current position. [`Pinned::keep`] closes it and
/// hands the save point to the caller; dropping the guard without keeping it,
/// on an early `?` return for instance, releases the pin.
pub(crate) struct Pinned<'a, T: InputOwner> {
    owner: &'a mut T,
    save_point: Option<SavePoint>,
}

impl<'a, T: InputOwner> Pinned<'a, T> {
    /// Pins the current position when `pin` is set; otherwise the guard only
    /// lends out the owner.
    pub(crate) fn new(owner: &'a mut T, pin: bool) -> Self {
        let save_point = pin.then(|| owner.input_mut().begin_save_point());
        Self { owner, save_point }
    }

    /// Closes the save point `back` bytes before the current position.
    pub(crate) fn keep(mut self, back: usize) -> Option<SavePoint> {
        let mut save_point = self.save_point.take()?;
        self.owner.input_mut().end_save_point_before(&mut save_point, back);
        Some(save_point)
    }
}

impl<T: InputOwner> Drop for Pinned<'_, T> {
    fn drop(&mut self) {
        if let Some(save_point) = self.save_point.take() {
            self.owner.input_mut().release(save_point);
        }
    }
}

impl<T: InputOwner> Deref for Pinned<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.owner
    }
}

impl<T: InputOwner> DerefMut for Pinned<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.owner
    }
}
