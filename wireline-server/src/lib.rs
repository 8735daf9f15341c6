//! # wireline-server
//!
//! TCP server for wireline: an accept loop spawning one worker per client,
//! each worker decoding datagrams and routing object commands through the
//! [`Dispatcher`] into the shared registry.

pub mod dispatch;
pub mod error;
pub mod server;

pub use dispatch::{Dispatcher, Reply};
pub use error::ServerError;
pub use server::{Server, ServerConfig, ServerStats};
