//! Tagged primitive codec.
//!
//! Every primitive is a one-byte type tag followed by its value:
//!
//! ```text
//! +-----+----------------------------------+
//! | tag | value                            |
//! +-----+----------------------------------+
//! | 'b' | 1 byte, '1' = true               |
//! | 'i' | 4 bytes, little-endian i32       |
//! | 'd' | 8 bytes, little-endian f64       |
//! | 's' | encoded i32 length + raw bytes   |
//! +-----+----------------------------------+
//! ```
//!
//! String contents are raw bytes located purely by the length prefix; tag-like
//! bytes inside a string are embedded verbatim and never scanned for. Decoders
//! take a shared cursor which advances by exactly the encoded length on
//! success and is left untouched on failure.

use bytes::{BufMut, Bytes, BytesMut};

/// Tag byte for boolean values.
pub const TAG_BOOL: u8 = b'b';
/// Tag byte for 32-bit integers.
pub const TAG_INT: u8 = b'i';
/// Tag byte for 64-bit floats.
pub const TAG_DOUBLE: u8 = b'd';
/// Tag byte for length-prefixed strings.
pub const TAG_STR: u8 = b's';

/// Encodes a boolean as tag + `'1'`/`'0'`.
pub fn encode_bool(buf: &mut BytesMut, value: bool) {
    buf.put_u8(TAG_BOOL);
    buf.put_u8(if value { b'1' } else { b'0' });
}

/// Encodes an i32 as tag + 4 little-endian bytes.
pub fn encode_i32(buf: &mut BytesMut, value: i32) {
    buf.put_u8(TAG_INT);
    buf.put_slice(&value.to_le_bytes());
}

/// Encodes an f64 as tag + 8 little-endian bytes.
pub fn encode_f64(buf: &mut BytesMut, value: f64) {
    buf.put_u8(TAG_DOUBLE);
    buf.put_slice(&value.to_le_bytes());
}

/// Encodes raw bytes as tag + encoded i32 length + the bytes themselves.
pub fn encode_bytes(buf: &mut BytesMut, value: &[u8]) {
    buf.put_u8(TAG_STR);
    encode_i32(buf, value.len() as i32);
    buf.put_slice(value);
}

/// Encodes a textual string (same layout as [`encode_bytes`]).
pub fn encode_str(buf: &mut BytesMut, value: &str) {
    encode_bytes(buf, value.as_bytes());
}

/// Decodes a boolean; the cursor is unchanged on failure.
pub fn decode_bool(buf: &[u8], pos: &mut usize) -> Option<bool> {
    if buf.len() < *pos + 2 || buf[*pos] != TAG_BOOL {
        return None;
    }
    let value = buf[*pos + 1] == b'1';
    *pos += 2;
    Some(value)
}

/// Decodes an i32; the cursor is unchanged on failure.
pub fn decode_i32(buf: &[u8], pos: &mut usize) -> Option<i32> {
    if buf.len() < *pos + 1 + 4 || buf[*pos] != TAG_INT {
        return None;
    }
    let raw: [u8; 4] = buf[*pos + 1..*pos + 5].try_into().ok()?;
    *pos += 5;
    Some(i32::from_le_bytes(raw))
}

/// Decodes an f64; the cursor is unchanged on failure.
pub fn decode_f64(buf: &[u8], pos: &mut usize) -> Option<f64> {
    if buf.len() < *pos + 1 + 8 || buf[*pos] != TAG_DOUBLE {
        return None;
    }
    let raw: [u8; 8] = buf[*pos + 1..*pos + 9].try_into().ok()?;
    *pos += 9;
    Some(f64::from_le_bytes(raw))
}

/// Decodes a length-prefixed byte string; the cursor is unchanged on failure.
pub fn decode_bytes(buf: &[u8], pos: &mut usize) -> Option<Bytes> {
    if buf.len() <= *pos || buf[*pos] != TAG_STR {
        return None;
    }
    let mut idx = *pos + 1;
    let len = decode_i32(buf, &mut idx)?;
    if len < 0 {
        return None;
    }
    let len = len as usize;
    if buf.len() < idx + len {
        return None;
    }
    let value = Bytes::copy_from_slice(&buf[idx..idx + len]);
    *pos = idx + len;
    Some(value)
}

/// Decodes a UTF-8 string; the cursor is unchanged on failure (including
/// invalid UTF-8).
pub fn decode_str(buf: &[u8], pos: &mut usize) -> Option<String> {
    let mut idx = *pos;
    let raw = decode_bytes(buf, &mut idx)?;
    let value = String::from_utf8(raw.to_vec()).ok()?;
    *pos = idx;
    Some(value)
}

/// A decoded primitive value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i32),
    Double(f64),
    /// Raw string bytes; UTF-8 is validated only where text is required.
    Str(Bytes),
}

impl Value {
    /// Encodes this value with its type tag.
    pub fn encode(&self, buf: &mut BytesMut) {
        match self {
            Value::Bool(v) => encode_bool(buf, *v),
            Value::Int(v) => encode_i32(buf, *v),
            Value::Double(v) => encode_f64(buf, *v),
            Value::Str(v) => encode_bytes(buf, v),
        }
    }

    /// Decodes the next primitive, trying bool, int, double, then string.
    ///
    /// The cursor is unchanged when no primitive matches.
    pub fn decode(buf: &[u8], pos: &mut usize) -> Option<Value> {
        if let Some(v) = decode_bool(buf, pos) {
            return Some(Value::Bool(v));
        }
        if let Some(v) = decode_i32(buf, pos) {
            return Some(Value::Int(v));
        }
        if let Some(v) = decode_f64(buf, pos) {
            return Some(Value::Double(v));
        }
        decode_bytes(buf, pos).map(Value::Str)
    }

    /// Returns the integer value, if this is an `Int`.
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the boolean value, if this is a `Bool`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the string bytes, if this is a `Str`.
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Value::Str(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the string as UTF-8 text, if this is a valid textual `Str`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(v) => std::str::from_utf8(v).ok(),
            _ => None,
        }
    }
}
