//! The demo object type served by the registry.

use crate::error::CoreError;
use bytes::{Bytes, BytesMut};
use wireline_protocol::codec;
use wireline_protocol::message::CreateArgs;

/// Wire-level class identifier for [`Widget`].
///
/// The decoder matches this byte-for-byte; it is part of the wire contract.
pub const WIDGET_CLASS: &str = "Widget";

/// A toy object whose methods clients invoke remotely.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Widget {
    pub number: i32,
    pub label: String,
}

impl Widget {
    pub fn new(number: i32, label: impl Into<String>) -> Self {
        Self {
            number,
            label: label.into(),
        }
    }

    /// Builds a widget from positional create arguments.
    pub fn from_args(args: CreateArgs) -> Self {
        match args {
            CreateArgs::Default => Self::default(),
            CreateArgs::Number(number) => Self {
                number,
                ..Self::default()
            },
            CreateArgs::NumberLabel(number, label) => Self::new(number, label),
        }
    }

    /// Logs the widget state. Void: callers get no reply on the wire.
    pub fn print(&self) {
        tracing::info!("Widget: number={} label={:?}", self.number, self.label);
    }

    /// Renders the widget state as human-readable text.
    pub fn render(&self) -> String {
        format!("Widget {{ number: {}, label: {:?} }}", self.number, self.label)
    }

    /// Sets the number; true iff the value changed.
    pub fn set_number(&mut self, number: i32) -> bool {
        if number == self.number {
            return false;
        }
        self.number = number;
        tracing::debug!("Widget: number changed to {}", number);
        true
    }

    /// Sets the label; true iff the value changed.
    pub fn set_label(&mut self, label: String) -> bool {
        if label == self.label {
            return false;
        }
        self.label = label;
        tracing::debug!("Widget: label changed to {:?}", self.label);
        true
    }

    /// Serializes the full state as codec-encoded number + label.
    ///
    /// This is the content of a GetInstance reply string.
    pub fn to_wire(&self) -> Bytes {
        let mut buf = BytesMut::new();
        codec::encode_i32(&mut buf, self.number);
        codec::encode_str(&mut buf, &self.label);
        buf.freeze()
    }

    /// Reconstructs a widget from its wire state.
    pub fn from_wire(data: &[u8]) -> Result<Self, CoreError> {
        let mut pos = 0;
        let number = codec::decode_i32(data, &mut pos)
            .ok_or(CoreError::MalformedState("missing number"))?;
        let label =
            codec::decode_str(data, &mut pos).ok_or(CoreError::MalformedState("missing label"))?;
        Ok(Self::new(number, label))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_args() {
        assert_eq!(Widget::from_args(CreateArgs::Default), Widget::default());
        assert_eq!(
            Widget::from_args(CreateArgs::Number(52)),
            Widget::new(52, "")
        );
        assert_eq!(
            Widget::from_args(CreateArgs::NumberLabel(52, "Hello".to_string())),
            Widget::new(52, "Hello")
        );
    }

    #[test]
    fn test_setters_report_change() {
        let mut widget = Widget::new(1, "a");

        assert!(!widget.set_number(1));
        assert!(widget.set_number(2));
        assert_eq!(widget.number, 2);

        assert!(!widget.set_label("a".to_string()));
        assert!(widget.set_label("b".to_string()));
        assert_eq!(widget.label, "b");
    }

    #[test]
    fn test_wire_state_roundtrip() {
        let widget = Widget::new(52, "Hello");
        let state = widget.to_wire();

        let restored = Widget::from_wire(&state).unwrap();
        assert_eq!(restored, widget);
    }

    #[test]
    fn test_wire_state_with_non_ascii_number() {
        // Numbers whose little-endian bytes are not valid UTF-8 must still
        // round-trip, because the state travels as raw string bytes.
        let widget = Widget::new(750, "x");
        let restored = Widget::from_wire(&widget.to_wire()).unwrap();
        assert_eq!(restored, widget);
    }

    #[test]
    fn test_malformed_wire_state() {
        assert!(Widget::from_wire(b"").is_err());

        let mut buf = BytesMut::new();
        codec::encode_i32(&mut buf, 7);
        assert!(Widget::from_wire(&buf).is_err());
    }

    #[test]
    fn test_render_mentions_state() {
        let widget = Widget::new(3, "tag");
        let text = widget.render();
        assert!(text.contains('3'));
        assert!(text.contains("tag"));
    }
}
