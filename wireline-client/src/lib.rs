//! # wireline-client
//!
//! Client for wireline servers. A [`Connection`] frames requests, numbers
//! them, and correlates replies through a [`ReplyRouter`]; [`Client`] layers
//! typed widget operations on top. Replies are consumed either inline
//! (blocking mode) or by a background reader task (callback mode).

pub mod client;
pub mod connection;
pub mod error;
pub mod handles;
pub mod pending;

pub use client::Client;
pub use connection::{Connection, ConnectionConfig, ExecutionMode};
pub use error::ClientError;
pub use handles::HandleSet;
pub use pending::{Completion, ReplyRouter};
