//! Text encodings used on the wire: hex (WEP keys, BSSIDs), base64 (nonces,
//! signatures, hashed PIN, passphrases) and base85 (encoded setup SSID).

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

use crate::error::{Error, Result};
use crate::stream::{Stream, is_hex};

// ---------------------------------------------------------------------------
// Hex
// ---------------------------------------------------------------------------

const HEX_UPPER: &[u8; 16] = b"0123456789ABCDEF";

fn hex_nibble(c: u8) -> Result<u8> {
    match c {
        b'0'..=b'9' => Ok(c - b'0'),
        b'a'..=b'f' => Ok(c - b'a' + 10),
        b'A'..=b'F' => Ok(c - b'A' + 10),
        _ => Err(Error::Failed("hex digit")),
    }
}

/// Decode hex text into `out`.  Odd length or a non-hex digit is `Failed`.
pub fn hex_decode(text: &[u8], out: &mut Stream<'_>) -> Result<()> {
    if !is_hex(text) {
        return Err(Error::Failed("not hex"));
    }
    out.write_with(text.len() / 2, |dst| {
        for (byte, pair) in dst.iter_mut().zip(text.chunks_exact(2)) {
            *byte = (hex_nibble(pair[0])? << 4) | hex_nibble(pair[1])?;
        }
        Ok(())
    })
}

/// Upper-case hex, optionally with a separator between bytes.
pub fn hex_encode(data: &[u8], separator: Option<u8>, out: &mut Stream<'_>) -> Result<()> {
    let sep_len = usize::from(separator.is_some());
    let len = (data.len() * (2 + sep_len)).saturating_sub(sep_len);
    out.write_with(len, |dst| {
        let mut i = 0;
        for (n, byte) in data.iter().enumerate() {
            if let Some(s) = separator.filter(|_| n > 0) {
                dst[i] = s;
                i += 1;
            }
            dst[i] = HEX_UPPER[usize::from(byte >> 4)];
            dst[i + 1] = HEX_UPPER[usize::from(byte & 0x0F)];
            i += 2;
        }
        Ok(())
    })
}

// ---------------------------------------------------------------------------
// Base64 (standard alphabet, padded)
// ---------------------------------------------------------------------------

pub fn base64_encode(data: &[u8], out: &mut Stream<'_>) -> Result<()> {
    let len = base64::encoded_len(data.len(), true).ok_or(Error::Overrun)?;
    out.write_with(len, |dst| {
        STANDARD.encode_slice(data, dst)?;
        Ok(())
    })
}

/// Decode into `out`, returning the number of bytes produced.
pub fn base64_decode(text: &[u8], out: &mut [u8]) -> Result<usize> {
    Ok(STANDARD.decode_slice(text, out)?)
}

pub fn base64_encode_to_string(data: &[u8]) -> String {
    STANDARD.encode(data)
}

// ---------------------------------------------------------------------------
// Base85
// ---------------------------------------------------------------------------

const BASE85_ALPHABET: &[u8; 85] =
    b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz!#$%&()*+-;<=>?@^_`{|}~";

/// Each big-endian 4-byte group becomes 5 characters.  Input length must be a
/// multiple of 4.
pub fn base85_encode(data: &[u8], out: &mut Stream<'_>) -> Result<()> {
    if data.len() % 4 != 0 {
        return Err(Error::Failed("base85 input length"));
    }
    out.write_with(data.len() / 4 * 5, |dst| {
        for (group, chars) in data.chunks_exact(4).zip(dst.chunks_exact_mut(5)) {
            let mut value = u32::from_be_bytes([group[0], group[1], group[2], group[3]]);
            for c in chars.iter_mut().rev() {
                *c = BASE85_ALPHABET[(value % 85) as usize];
                value /= 85;
            }
        }
        Ok(())
    })
}
