//! Core error types.

use thiserror::Error;

/// Errors from the object model.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("malformed widget state: {0}")]
    MalformedState(&'static str),
}
