//! Server error types.

use thiserror::Error;
use wireline_protocol::Handle;

/// Server errors.
///
/// Protocol and dispatch errors are local to one request on one connection:
/// the worker logs them, sends nothing, and keeps serving.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(#[from] wireline_protocol::ProtocolError),

    #[error("unknown instance handle: {0}")]
    UnknownHandle(Handle),

    #[error("server is shutting down")]
    ShuttingDown,
}
