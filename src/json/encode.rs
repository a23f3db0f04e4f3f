//! Encoder helpers.
//!
//! The encoders track only "first element written?" and take the output
//! stream per call, so callers can mark, truncate and retry around them.

use crate::error::Result;
use crate::stream::Stream;

const HEX: &[u8; 16] = b"0123456789abcdef";

fn escape_into(text: &[u8], out: &mut Stream<'_>) -> Result<()> {
    for &b in text {
        match b {
            b'"' => out.write(b"\\\"")?,
            b'\\' => out.write(b"\\\\")?,
            0x08 => out.write(b"\\b")?,
            0x0C => out.write(b"\\f")?,
            b'\n' => out.write(b"\\n")?,
            b'\r' => out.write(b"\\r")?,
            b'\t' => out.write(b"\\t")?,
            0x00..=0x1F => out.write(&[
                b'\\',
                b'u',
                b'0',
                b'0',
                HEX[usize::from(b >> 4)],
                HEX[usize::from(b & 0x0F)],
            ])?,
            _ => out.write_byte(b)?,
        }
    }
    Ok(())
}

/// `"text"` with JSON escaping.
pub fn encode_string(text: &[u8], out: &mut Stream<'_>) -> Result<()> {
    out.write_byte(b'"')?;
    escape_into(text, out)?;
    out.write_byte(b'"')
}

/// `"\"text\""`: a string whose content is itself quoted.  DSS carries SSIDs
/// this way.
pub fn encode_quoted_string(text: &[u8], out: &mut Stream<'_>) -> Result<()> {
    out.write(b"\"\\\"")?;
    escape_into(text, out)?;
    out.write(b"\\\"\"")
}

// ---------------------------------------------------------------------------
// Object / array encoders
// ---------------------------------------------------------------------------

/// Copyable so a caller can snapshot it next to a stream position and
/// restore both after an overrun.
#[derive(Debug, Clone, Copy)]
pub struct ObjectEncoder {
    first: bool,
}

impl ObjectEncoder {
    pub fn begin(out: &mut Stream<'_>) -> Result<Self> {
        out.write_byte(b'{')?;
        Ok(Self { first: true })
    }

    /// Writes the separator (if needed) and `"key":`.
    pub fn key(&mut self, key: &str, out: &mut Stream<'_>) -> Result<()> {
        if !self.first {
            out.write_byte(b',')?;
        }
        encode_string(key.as_bytes(), out)?;
        out.write_byte(b':')?;
        self.first = false;
        Ok(())
    }

    pub fn string(&mut self, key: &str, value: &[u8], out: &mut Stream<'_>) -> Result<()> {
        self.key(key, out)?;
        encode_string(value, out)
    }

    pub fn quoted_string(&mut self, key: &str, value: &[u8], out: &mut Stream<'_>) -> Result<()> {
        self.key(key, out)?;
        encode_quoted_string(value, out)
    }

    pub fn integer(&mut self, key: &str, value: i64, out: &mut Stream<'_>) -> Result<()> {
        self.key(key, out)?;
        let mut digits = [0u8; 20];
        out.write(format_i64(value, &mut digits))
    }

    pub fn boolean(&mut self, key: &str, value: bool, out: &mut Stream<'_>) -> Result<()> {
        self.key(key, out)?;
        out.write_str(if value { "true" } else { "false" })
    }

    pub fn is_empty(&self) -> bool {
        self.first
    }

    pub fn end(self, out: &mut Stream<'_>) -> Result<()> {
        out.write_byte(b'}')
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ArrayEncoder {
    first: bool,
}

impl ArrayEncoder {
    pub fn begin(out: &mut Stream<'_>) -> Result<Self> {
        out.write_byte(b'[')?;
        Ok(Self { first: true })
    }

    /// Writes the separator before the next element, if needed.
    pub fn element(&mut self, out: &mut Stream<'_>) -> Result<()> {
        if !self.first {
            out.write_byte(b',')?;
        }
        self.first = false;
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.first
    }

    pub fn end(self, out: &mut Stream<'_>) -> Result<()> {
        out.write_byte(b']')
    }
}

// ---------------------------------------------------------------------------
// Integer formatting without allocation
// ---------------------------------------------------------------------------

/// Render `value` into the tail of `buf` (20 bytes fits any `i64`).
fn format_i64(value: i64, buf: &mut [u8; 20]) -> &[u8] {
    let mut magnitude = value.unsigned_abs();
    let mut i = buf.len();
    loop {
        i -= 1;
        buf[i] = b'0' + (magnitude % 10) as u8;
        magnitude /= 10;
        if magnitude == 0 {
            break;
        }
    }
    if value < 0 {
        i -= 1;
        buf[i] = b'-';
    }
    &buf[i..]
}
