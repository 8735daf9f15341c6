//! # wireline-protocol
//!
//! Wire protocol implementation for wireline.
//!
//! This crate provides:
//! - Tagged primitive codec (bool, i32, f64, length-prefixed strings)
//! - Message grammar: request-id headers and object commands
//! - Length-prefixed datagram framing for stream transports
//! - Protocol error types and constants

pub mod codec;
pub mod error;
pub mod message;
pub mod wire;

pub use codec::{Value, TAG_BOOL, TAG_DOUBLE, TAG_INT, TAG_STR};
pub use error::ProtocolError;
pub use message::{
    CreateArgs, Message, MethodCall, ObjectCommand, Payload, COMMAND_MARKER, CREATE_MARKER,
    GET_INSTANCE_MARKER, METHOD_MARKER, REQUEST_ID_MARKER,
};
pub use wire::{DatagramDecoder, LEN_PREFIX_SIZE, MAX_DATAGRAM_SIZE};

/// Request identifier carried in the `#r` header.
///
/// Allocated by a strictly increasing per-connection counter starting at 1.
pub type RequestId = i32;

/// Opaque identifier of a live server-side object instance.
///
/// Allocated by a monotonically increasing per-registry counter starting at 0;
/// never reused for the life of the registry.
pub type Handle = i32;

/// Default port for the wireline demo server.
pub const DEFAULT_PORT: u16 = 7411;
