//! Protocol error types.

use thiserror::Error;

/// Protocol-level errors that can occur during framing or message parsing.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("datagram too large: {size} bytes (max {max})")]
    DatagramTooLarge { size: u32, max: u32 },

    #[error("payload is not an object command")]
    NotObjectCommand,

    #[error("unknown class id: {0:?}")]
    UnknownClass(String),

    #[error("malformed object command at byte {offset}: {reason}")]
    MalformedCommand { offset: usize, reason: &'static str },

    #[error("unparseable payload: no object command or primitive matched")]
    UnparseablePayload,
}
