//! Scanner and member iterators.

use super::{JsonKind, JsonMember, JsonValue};
use crate::error::{Error, Result};
use crate::stream::{Reader, Stream};

// ---------------------------------------------------------------------------
// Single values
// ---------------------------------------------------------------------------

/// Parse one value starting at the next non-whitespace byte.
pub fn parse_value<'a>(reader: &mut Reader<'a>) -> Result<JsonValue<'a>> {
    reader.skip_whitespace();
    match reader.peek().ok_or(Error::Underrun)? {
        b'"' => scan_string(reader),
        b't' => scan_literal(reader, b"true", JsonKind::Boolean),
        b'f' => scan_literal(reader, b"false", JsonKind::Boolean),
        b'n' => scan_literal(reader, b"null", JsonKind::Null),
        b'{' => scan_container(reader, JsonKind::Object),
        b'[' => scan_container(reader, JsonKind::Array),
        _ => scan_number(reader),
    }
}

fn scan_string<'a>(reader: &mut Reader<'a>) -> Result<JsonValue<'a>> {
    reader.read_byte()?;
    let start = reader.position();
    loop {
        match reader.read_byte()? {
            b'\\' => {
                reader.read_byte()?;
            }
            b'"' => break,
            _ => {}
        }
    }
    let with_quote = reader.since(start);
    Ok(JsonValue {
        kind: JsonKind::String,
        raw: &with_quote[..with_quote.len() - 1],
    })
}

fn scan_literal<'a>(
    reader: &mut Reader<'a>,
    literal: &'static [u8],
    kind: JsonKind,
) -> Result<JsonValue<'a>> {
    let raw = reader.read(literal.len())?;
    if raw != literal {
        return Err(Error::Failed("json literal"));
    }
    Ok(JsonValue { kind, raw })
}

/// Capture a whole object or array.  Only depth is tracked; brackets inside
/// strings do not count.
fn scan_container<'a>(reader: &mut Reader<'a>, kind: JsonKind) -> Result<JsonValue<'a>> {
    let start = reader.position();
    let mut depth = 0usize;
    let mut in_string = false;
    loop {
        let b = reader.read_byte()?;
        if in_string {
            match b {
                b'\\' => {
                    reader.read_byte()?;
                }
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' | b'[' => depth += 1,
            b'}' | b']' => {
                depth -= 1;
                if depth == 0 {
                    break;
                }
            }
            _ => {}
        }
    }
    Ok(JsonValue { kind, raw: reader.since(start) })
}

fn scan_number<'a>(reader: &mut Reader<'a>) -> Result<JsonValue<'a>> {
    let start = reader.position();
    while matches!(reader.peek(), Some(b'-' | b'+' | b'.' | b'e' | b'E' | b'0'..=b'9')) {
        reader.read_byte()?;
    }
    let raw = reader.since(start);
    if raw.is_empty() {
        return Err(Error::Failed("json value"));
    }
    Ok(JsonValue { kind: JsonKind::Number, raw })
}

fn expect_byte(reader: &mut Reader<'_>, expected: u8) -> Result<()> {
    reader.skip_whitespace();
    match reader.read_byte()? {
        b if b == expected => Ok(()),
        _ => Err(Error::Failed("json syntax")),
    }
}

// ---------------------------------------------------------------------------
// Iterators
// ---------------------------------------------------------------------------

/// Members of an object in document order.  Stops after the first error.
pub struct ObjectIter<'a> {
    reader: Reader<'a>,
    first: bool,
    done: bool,
}

pub fn parse_object(text: &[u8]) -> Result<ObjectIter<'_>> {
    let mut reader = Reader::new(text);
    expect_byte(&mut reader, b'{')?;
    Ok(ObjectIter { reader, first: true, done: false })
}

impl<'a> ObjectIter<'a> {
    fn next_member(&mut self) -> Result<Option<JsonMember<'a>>> {
        self.reader.skip_whitespace();
        if self.reader.peek().ok_or(Error::Underrun)? == b'}' {
            self.reader.read_byte()?;
            return Ok(None);
        }
        if !self.first {
            expect_byte(&mut self.reader, b',')?;
        }
        self.first = false;

        let key = parse_value(&mut self.reader)?;
        if key.kind != JsonKind::String {
            return Err(Error::Failed("json key"));
        }
        expect_byte(&mut self.reader, b':')?;
        let value = parse_value(&mut self.reader)?;
        Ok(Some(JsonMember { key, value }))
    }
}

impl<'a> Iterator for ObjectIter<'a> {
    type Item = Result<JsonMember<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let item = self.next_member().transpose();
        if !matches!(item, Some(Ok(_))) {
            self.done = true;
        }
        item
    }
}

/// Elements of an array in document order.
pub struct ArrayIter<'a> {
    reader: Reader<'a>,
    first: bool,
    done: bool,
}

pub fn parse_array(text: &[u8]) -> Result<ArrayIter<'_>> {
    let mut reader = Reader::new(text);
    expect_byte(&mut reader, b'[')?;
    Ok(ArrayIter { reader, first: true, done: false })
}

impl<'a> ArrayIter<'a> {
    fn next_element(&mut self) -> Result<Option<JsonValue<'a>>> {
        self.reader.skip_whitespace();
        if self.reader.peek().ok_or(Error::Underrun)? == b']' {
            self.reader.read_byte()?;
            return Ok(None);
        }
        if !self.first {
            expect_byte(&mut self.reader, b',')?;
        }
        self.first = false;
        parse_value(&mut self.reader).map(Some)
    }
}

impl<'a> Iterator for ArrayIter<'a> {
    type Item = Result<JsonValue<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let item = self.next_element().transpose();
        if !matches!(item, Some(Ok(_))) {
            self.done = true;
        }
        item
    }
}

// ---------------------------------------------------------------------------
// String unescaping
// ---------------------------------------------------------------------------

fn read_hex4(reader: &mut Reader<'_>) -> Result<u32> {
    let digits = reader.read(4)?;
    let mut value = 0u32;
    for &d in digits {
        let nibble = (d as char).to_digit(16).ok_or(Error::Failed("json \\u escape"))?;
        value = (value << 4) | nibble;
    }
    Ok(value)
}

fn read_code_point(reader: &mut Reader<'_>) -> Result<char> {
    let high = read_hex4(reader)?;
    let code = if (0xD800..0xDC00).contains(&high) {
        if reader.read(2)? != b"\\u" {
            return Err(Error::Failed("json surrogate"));
        }
        let low = read_hex4(reader)?;
        if !(0xDC00..0xE000).contains(&low) {
            return Err(Error::Failed("json surrogate"));
        }
        0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00)
    } else {
        high
    };
    char::from_u32(code).ok_or(Error::Failed("json code point"))
}

/// Unescape string content (without its quotes) into `out`.  Raw multi-byte
/// UTF-8 passes through untouched.
pub fn decode_string(raw: &[u8], out: &mut Stream<'_>) -> Result<()> {
    let mut reader = Reader::new(raw);
    while let Some(b) = reader.peek() {
        reader.read_byte()?;
        if b != b'\\' {
            out.write_byte(b)?;
            continue;
        }
        let unescaped = match reader.read_byte()? {
            b'"' => b'"',
            b'\\' => b'\\',
            b'/' => b'/',
            b'b' => 0x08,
            b'f' => 0x0C,
            b'n' => b'\n',
            b'r' => b'\r',
            b't' => b'\t',
            b'u' => {
                let ch = read_code_point(&mut reader)?;
                let mut utf8 = [0u8; 4];
                out.write(ch.encode_utf8(&mut utf8).as_bytes())?;
                continue;
            }
            _ => return Err(Error::Failed("json escape")),
        };
        out.write_byte(unescaped)?;
    }
    Ok(())
}
