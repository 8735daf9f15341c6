//! # wireline-core
//!
//! Server-side object model for wireline:
//! - [`Registry`]: concurrent handle-to-instance store, one per object type
//! - [`Widget`]: the single object type wired into the demo protocol

pub mod error;
pub mod registry;
pub mod widget;

pub use error::CoreError;
pub use registry::Registry;
pub use widget::{Widget, WIDGET_CLASS};
