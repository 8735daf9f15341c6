//! Length-prefixed datagram framing.
//!
//! The message grammar assumes the transport preserves message boundaries
//! per read/write call. A byte-stream transport does not, so every message
//! is wrapped in a datagram: a `u32` big-endian body length followed by the
//! body. The decoder buffers partial reads and yields one complete body at
//! a time.

use crate::error::ProtocolError;
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Size of the length prefix in bytes.
pub const LEN_PREFIX_SIZE: usize = 4;

/// Maximum datagram body size (1 MiB).
pub const MAX_DATAGRAM_SIZE: u32 = 1024 * 1024;

/// Wraps a message body in a length-prefixed datagram.
pub fn encode_datagram(body: &[u8]) -> Result<BytesMut, ProtocolError> {
    let len = body.len() as u32;
    if len > MAX_DATAGRAM_SIZE {
        return Err(ProtocolError::DatagramTooLarge {
            size: len,
            max: MAX_DATAGRAM_SIZE,
        });
    }

    let mut buf = BytesMut::with_capacity(LEN_PREFIX_SIZE + body.len());
    buf.put_u32(len);
    buf.put_slice(body);
    Ok(buf)
}

/// Buffered decoder restoring message boundaries from a byte stream.
pub struct DatagramDecoder {
    buffer: BytesMut,
}

impl DatagramDecoder {
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(8192),
        }
    }

    /// Appends raw stream data to the internal buffer.
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Attempts to decode the next complete datagram body.
    ///
    /// Returns `Ok(None)` if more data is needed.
    pub fn next(&mut self) -> Result<Option<Bytes>, ProtocolError> {
        if self.buffer.len() < LEN_PREFIX_SIZE {
            return Ok(None);
        }

        let b = &self.buffer;
        let len = u32::from_be_bytes([b[0], b[1], b[2], b[3]]);
        if len > MAX_DATAGRAM_SIZE {
            return Err(ProtocolError::DatagramTooLarge {
                size: len,
                max: MAX_DATAGRAM_SIZE,
            });
        }

        let total = LEN_PREFIX_SIZE + len as usize;
        if self.buffer.len() < total {
            return Ok(None);
        }

        self.buffer.advance(LEN_PREFIX_SIZE);
        Ok(Some(self.buffer.split_to(len as usize).freeze()))
    }

    /// Returns the number of bytes currently buffered.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Clears the internal buffer.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

impl Default for DatagramDecoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_datagram_roundtrip() {
        let encoded = encode_datagram(b"hello").unwrap();
        assert_eq!(encoded.len(), LEN_PREFIX_SIZE + 5);

        let mut decoder = DatagramDecoder::new();
        decoder.extend(&encoded);
        let body = decoder.next().unwrap().unwrap();
        assert_eq!(body.as_ref(), b"hello");
        assert_eq!(decoder.buffered(), 0);
    }

    #[test]
    fn test_partial_datagram() {
        let encoded = encode_datagram(b"split me").unwrap();

        let mut decoder = DatagramDecoder::new();
        decoder.extend(&encoded[..3]);
        assert!(decoder.next().unwrap().is_none());

        decoder.extend(&encoded[3..7]);
        assert!(decoder.next().unwrap().is_none());

        decoder.extend(&encoded[7..]);
        let body = decoder.next().unwrap().unwrap();
        assert_eq!(body.as_ref(), b"split me");
    }

    #[test]
    fn test_multiple_datagrams_in_one_read() {
        let mut stream = BytesMut::new();
        stream.extend_from_slice(&encode_datagram(b"one").unwrap());
        stream.extend_from_slice(&encode_datagram(b"two").unwrap());

        let mut decoder = DatagramDecoder::new();
        decoder.extend(&stream);
        assert_eq!(decoder.next().unwrap().unwrap().as_ref(), b"one");
        assert_eq!(decoder.next().unwrap().unwrap().as_ref(), b"two");
        assert!(decoder.next().unwrap().is_none());
    }

    #[test]
    fn test_empty_body() {
        let encoded = encode_datagram(b"").unwrap();
        let mut decoder = DatagramDecoder::new();
        decoder.extend(&encoded);
        assert_eq!(decoder.next().unwrap().unwrap().len(), 0);
    }

    #[test]
    fn test_oversized_datagram_rejected() {
        let huge = vec![0u8; MAX_DATAGRAM_SIZE as usize + 1];
        assert!(matches!(
            encode_datagram(&huge),
            Err(ProtocolError::DatagramTooLarge { .. })
        ));

        let mut decoder = DatagramDecoder::new();
        decoder.extend(&(MAX_DATAGRAM_SIZE + 1).to_be_bytes());
        assert!(matches!(
            decoder.next(),
            Err(ProtocolError::DatagramTooLarge { .. })
        ));
    }
}
