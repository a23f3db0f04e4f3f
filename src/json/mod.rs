//! Minimal non-allocating JSON codec.
//!
//! Values are views into the original text: a [`JsonValue`] is a kind tag
//! plus the slice it was parsed from.  Objects and arrays are captured
//! opaquely and only walked when the caller asks for their members.
//!
//! ```text
//!   {"nonce":"abc","canProceed":true,"configuration":{"k":"v"}}
//!             └─┬─┘              └─┬┘                └───┬───┘
//!         String("abc")     Boolean("true")      Object("{\"k\":\"v\"}")
//! ```
//!
//! Numbers are signed 64-bit integers only.

mod encode;
mod parse;

pub use encode::{ArrayEncoder, ObjectEncoder, encode_quoted_string, encode_string};
pub use parse::{ArrayIter, ObjectIter, decode_string, parse_array, parse_object, parse_value};

use crate::error::{Error, Result};
use crate::stream::Stream;

// ---------------------------------------------------------------------------
// Values
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonKind {
    String,
    Number,
    Boolean,
    Null,
    Object,
    Array,
    /// Wildcard for field binding; never produced by the parser.
    Any,
}

/// A parsed value.  For strings `raw` is the still-escaped text between the
/// quotes; for every other kind it is the full token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JsonValue<'a> {
    pub kind: JsonKind,
    pub raw: &'a [u8],
}

impl<'a> JsonValue<'a> {
    fn expect(&self, kind: JsonKind) -> Result<()> {
        if self.kind == kind {
            Ok(())
        } else {
            Err(Error::Failed("json type"))
        }
    }

    pub fn as_bool(&self) -> Result<bool> {
        self.expect(JsonKind::Boolean)?;
        Ok(self.raw == b"true")
    }

    /// Strict integer conversion: optional minus, no leading zero, no
    /// fraction or exponent, must fit in `i64`.
    pub fn as_i64(&self) -> Result<i64> {
        self.expect(JsonKind::Number)?;
        let (negative, digits) = match self.raw.split_first() {
            Some((b'-', rest)) => (true, rest),
            _ => (false, self.raw),
        };
        if digits.is_empty() || (digits.len() > 1 && digits[0] == b'0') {
            return Err(Error::Failed("json number"));
        }
        let mut value: i64 = 0;
        for &d in digits {
            if !d.is_ascii_digit() {
                return Err(Error::Failed("json number"));
            }
            let digit = i64::from(d - b'0');
            value = value
                .checked_mul(10)
                .and_then(|v| if negative { v.checked_sub(digit) } else { v.checked_add(digit) })
                .ok_or(Error::Failed("json number overflow"))?;
        }
        Ok(value)
    }

    /// Raw string content when it carries no escapes.
    pub fn as_plain_str(&self) -> Result<&'a str> {
        self.expect(JsonKind::String)?;
        if self.raw.contains(&b'\\') {
            return Err(Error::Failed("json escaped string"));
        }
        core::str::from_utf8(self.raw).map_err(|_| Error::Failed("json utf-8"))
    }

    /// Unescape a string value into `out`.
    pub fn decode_into(&self, out: &mut Stream<'_>) -> Result<()> {
        self.expect(JsonKind::String)?;
        decode_string(self.raw, out)
    }

    /// Unescape a string value into a fresh buffer.
    pub fn decode_to_vec(&self) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; self.raw.len()];
        let mut out = Stream::output(&mut buf);
        self.decode_into(&mut out)?;
        let len = out.data_len();
        buf.truncate(len);
        Ok(buf)
    }

    pub fn decode_to_string(&self) -> Result<String> {
        String::from_utf8(self.decode_to_vec()?).map_err(|_| Error::Failed("json utf-8"))
    }

    pub fn object(&self) -> Result<ObjectIter<'a>> {
        self.expect(JsonKind::Object)?;
        parse_object(self.raw)
    }

    pub fn array(&self) -> Result<ArrayIter<'a>> {
        self.expect(JsonKind::Array)?;
        parse_array(self.raw)
    }

    pub fn is_null(&self) -> bool {
        self.kind == JsonKind::Null
    }
}

/// One `"key": value` pair of an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JsonMember<'a> {
    pub key: JsonValue<'a>,
    pub value: JsonValue<'a>,
}

impl JsonMember<'_> {
    /// Keys are compared on their raw text.
    pub fn key_is(&self, key: &str) -> bool {
        self.key.raw == key.as_bytes()
    }
}

// ---------------------------------------------------------------------------
// Field binding
// ---------------------------------------------------------------------------

/// An expected object member.  `value` is filled by [`bind_fields`].
#[derive(Debug, Clone, Copy)]
pub struct JsonField<'a> {
    pub key: &'static str,
    pub kind: JsonKind,
    pub value: Option<JsonValue<'a>>,
}

impl<'a> JsonField<'a> {
    pub const fn new(key: &'static str, kind: JsonKind) -> Self {
        Self { key, kind, value: None }
    }
}

/// Walk `object` and bind each declared field.  Unknown keys are ignored, a
/// key seen twice is `Overrun`, a kind mismatch is `Failed`.
pub fn bind_fields<'a>(object: &'a [u8], fields: &mut [JsonField<'a>]) -> Result<()> {
    for member in parse_object(object)? {
        let member = member?;
        let Some(field) = fields.iter_mut().find(|f| member.key_is(f.key)) else {
            continue;
        };
        if field.value.is_some() {
            return Err(Error::Overrun);
        }
        if field.kind != JsonKind::Any && field.kind != member.value.kind {
            return Err(Error::Failed("json field type"));
        }
        field.value = Some(member.value);
    }
    Ok(())
}

/// Value bound to `key`, if present.
pub fn field<'a>(fields: &[JsonField<'a>], key: &str) -> Option<JsonValue<'a>> {
    fields.iter().find(|f| f.key == key).and_then(|f| f.value)
}
