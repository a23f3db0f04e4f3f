//! Bounded byte streams over caller-owned buffers.
//!
//! ```text
//!   0          read          write              capacity
//!   ├───────────┼──────────────┼──────────────────────┤
//!   │ consumed  │   unread     │       free space     │
//! ```
//!
//! A [`Stream`] never owns its buffer.  Every operation is bounds-checked:
//! writes that do not fit fail with [`Error::Overrun`] and leave the stream
//! untouched, reads past the write boundary fail with [`Error::Underrun`].
//! [`Reader`] is the read-only counterpart used by the JSON parser to walk
//! borrowed text without copying.

use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Stream
// ---------------------------------------------------------------------------

pub struct Stream<'a> {
    buf: &'a mut [u8],
    write: usize,
    read: usize,
}

impl<'a> Stream<'a> {
    /// Wrap an empty buffer for writing.
    pub fn output(buf: &'a mut [u8]) -> Self {
        Self { buf, write: 0, read: 0 }
    }

    /// Wrap a buffer whose first `len` bytes are already valid data.
    pub fn input(buf: &'a mut [u8], len: usize) -> Result<Self> {
        if len > buf.len() {
            return Err(Error::Overrun);
        }
        Ok(Self { buf, write: len, read: 0 })
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Unread bytes between the read cursor and the write boundary.
    pub fn data_len(&self) -> usize {
        self.write - self.read
    }

    /// Free bytes after the write boundary.
    pub fn space(&self) -> usize {
        self.buf.len() - self.write
    }

    pub fn is_empty(&self) -> bool {
        self.data_len() == 0
    }

    /// The unread bytes.
    pub fn data(&self) -> &[u8] {
        &self.buf[self.read..self.write]
    }

    /// Everything written so far, including bytes already read.
    pub fn written(&self) -> &[u8] {
        &self.buf[..self.write]
    }

    /// Last byte written, if any.
    pub fn last_written(&self) -> Option<u8> {
        self.write.checked_sub(1).map(|i| self.buf[i])
    }

    // ── Writing ───────────────────────────────────────────────

    pub fn write(&mut self, data: &[u8]) -> Result<()> {
        if data.len() > self.space() {
            return Err(Error::Overrun);
        }
        let end = self.write + data.len();
        self.buf[self.write..end].copy_from_slice(data);
        self.write = end;
        Ok(())
    }

    pub fn write_byte(&mut self, byte: u8) -> Result<()> {
        self.write(&[byte])
    }

    pub fn write_str(&mut self, s: &str) -> Result<()> {
        self.write(s.as_bytes())
    }

    /// Reserve `len` bytes and hand them to `fill`.  The write boundary only
    /// advances if `fill` succeeds.
    pub fn write_with<F>(&mut self, len: usize, fill: F) -> Result<()>
    where
        F: FnOnce(&mut [u8]) -> Result<()>,
    {
        if len > self.space() {
            return Err(Error::Overrun);
        }
        let end = self.write + len;
        fill(&mut self.buf[self.write..end])?;
        self.write = end;
        Ok(())
    }

    /// Current write boundary, for a later [`truncate_to`](Self::truncate_to).
    pub fn write_position(&self) -> usize {
        self.write
    }

    /// Discard everything written after `position`.
    pub fn truncate_to(&mut self, position: usize) {
        if position < self.write {
            self.write = position;
            self.read = self.read.min(position);
        }
    }

    // ── Reading ───────────────────────────────────────────────

    pub fn read(&mut self, len: usize) -> Result<&[u8]> {
        if len > self.data_len() {
            return Err(Error::Underrun);
        }
        let start = self.read;
        self.read += len;
        Ok(&self.buf[start..self.read])
    }

    pub fn read_byte(&mut self) -> Result<u8> {
        self.read(1).map(|b| b[0])
    }

    /// Consume `expected` or fail without moving the read cursor.
    pub fn read_expected(&mut self, expected: &[u8]) -> Result<()> {
        if expected.len() > self.data_len() {
            return Err(Error::Underrun);
        }
        if !self.data().starts_with(expected) {
            return Err(Error::Failed("unexpected stream content"));
        }
        self.read += expected.len();
        Ok(())
    }

    /// Read cursor back to the start; written data can be read again.
    pub fn rewind(&mut self) {
        self.read = 0;
    }

    /// Logical truncate: both cursors back to zero, capacity unchanged.
    pub fn flush(&mut self) {
        self.read = 0;
        self.write = 0;
    }

    pub fn matches_str(&self, literal: &str) -> bool {
        matches_str(self.data(), literal)
    }

    pub fn reader(&self) -> Reader<'_> {
        Reader::new(self.data())
    }
}

impl PartialEq for Stream<'_> {
    fn eq(&self, other: &Self) -> bool {
        streams_equal(self.data(), other.data())
    }
}

impl core::fmt::Debug for Stream<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Stream")
            .field("capacity", &self.buf.len())
            .field("write", &self.write)
            .field("read", &self.read)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Reader
// ---------------------------------------------------------------------------

/// Read-only cursor over borrowed bytes.  Slices handed out live as long as
/// the underlying buffer, not the reader.
#[derive(Debug, Clone, Copy)]
pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn remaining(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn peek(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    pub fn read(&mut self, len: usize) -> Result<&'a [u8]> {
        if len > self.data.len() - self.pos {
            return Err(Error::Underrun);
        }
        let start = self.pos;
        self.pos += len;
        Ok(&self.data[start..self.pos])
    }

    pub fn read_byte(&mut self) -> Result<u8> {
        let b = self.peek().ok_or(Error::Underrun)?;
        self.pos += 1;
        Ok(b)
    }

    pub fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\n' | b'\r')) {
            self.pos += 1;
        }
    }

    /// Bytes between `start` and the current position.
    pub fn since(&self, start: usize) -> &'a [u8] {
        &self.data[start..self.pos]
    }
}

// ---------------------------------------------------------------------------
// Pure comparisons
// ---------------------------------------------------------------------------

pub fn streams_equal(a: &[u8], b: &[u8]) -> bool {
    a == b
}

pub fn matches_str(data: &[u8], literal: &str) -> bool {
    data == literal.as_bytes()
}

/// Even length and nothing but `[0-9a-fA-F]`.
pub fn is_hex(data: &[u8]) -> bool {
    data.len() % 2 == 0 && data.iter().all(u8::is_ascii_hexdigit)
}
