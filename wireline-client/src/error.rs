//! Client error types.

use thiserror::Error;
use wireline_protocol::RequestId;

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(#[from] wireline_protocol::ProtocolError),

    #[error("instance state error: {0}")]
    Core(#[from] wireline_core::CoreError),

    #[error("connection failed after {attempts} attempts: {last}")]
    ConnectFailed {
        attempts: u32,
        last: std::io::Error,
    },

    #[error("connection closed")]
    ConnectionClosed,

    #[error("request id {0} is already pending")]
    DuplicateRequest(RequestId),

    #[error("reply carried a {got} where a {expected} was expected")]
    UnexpectedReply {
        expected: &'static str,
        got: &'static str,
    },
}
