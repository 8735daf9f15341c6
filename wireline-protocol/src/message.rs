//! Message grammar: request-id headers and object commands.
//!
//! Every application message is an optional request-id header followed by a
//! payload:
//!
//! ```text
//! [ "#r" i32 ]  ( primitive | "#" s(class-id) command )
//!
//! command := "#c" [i32 [string]]           create (arity by exhaustion)
//!          | i32 "#m" s(method) args...    method call
//!          | i32 "#g"                      get instance
//! ```
//!
//! Method names are resolved here, at decode time, into the closed
//! [`MethodCall`] enum; nothing downstream dispatches on strings.

use crate::codec::{self, Value};
use crate::error::ProtocolError;
use crate::{Handle, RequestId};
use bytes::{BufMut, BytesMut};

/// Marker pair introducing a request-id header.
pub const REQUEST_ID_MARKER: [u8; 2] = *b"#r";
/// Marker byte introducing an object command.
pub const COMMAND_MARKER: u8 = b'#';
/// Marker pair selecting the create operation.
pub const CREATE_MARKER: [u8; 2] = *b"#c";
/// Marker pair selecting a method call.
pub const METHOD_MARKER: [u8; 2] = *b"#m";
/// Marker pair selecting instance retrieval.
pub const GET_INSTANCE_MARKER: [u8; 2] = *b"#g";

/// Wire name of the void no-argument method.
pub const METHOD_PRINT: &str = "Print";
/// Wire name of the string-returning no-argument method.
pub const METHOD_RENDER: &str = "Render";
/// Wire name of the bool-returning i32-argument method.
pub const METHOD_SET_NUMBER: &str = "SetNumber";
/// Wire name of the bool-returning string-argument method.
pub const METHOD_SET_LABEL: &str = "SetLabel";

/// Appends a request-id header to `buf`.
pub fn encode_request_header(buf: &mut BytesMut, request_id: RequestId) {
    buf.put_slice(&REQUEST_ID_MARKER);
    codec::encode_i32(buf, request_id);
}

/// Decodes a request-id header if one is present.
///
/// Absence of the exact marker pair is not an error: the cursor stays put and
/// the caller parses the remainder as an untagged payload.
pub fn decode_request_header(buf: &[u8], pos: &mut usize) -> Option<RequestId> {
    let mut idx = *pos;
    if buf.len() < idx + 2 || buf[idx..idx + 2] != REQUEST_ID_MARKER {
        return None;
    }
    idx += 2;
    let id = codec::decode_i32(buf, &mut idx)?;
    *pos = idx;
    Some(id)
}

/// Positional constructor arguments for a create command.
///
/// Arity is not self-describing on the wire: the decoder stops as soon as the
/// buffer is exhausted, so the permitted shapes are fixed in advance.
#[derive(Debug, Clone, PartialEq)]
pub enum CreateArgs {
    Default,
    Number(i32),
    NumberLabel(i32, String),
}

impl CreateArgs {
    fn encode(&self, buf: &mut BytesMut) {
        match self {
            CreateArgs::Default => {}
            CreateArgs::Number(n) => codec::encode_i32(buf, *n),
            CreateArgs::NumberLabel(n, label) => {
                codec::encode_i32(buf, *n);
                codec::encode_str(buf, label);
            }
        }
    }

    fn decode(buf: &[u8], pos: &mut usize) -> Result<Self, ProtocolError> {
        if *pos == buf.len() {
            return Ok(CreateArgs::Default);
        }
        let number = codec::decode_i32(buf, pos).ok_or(ProtocolError::MalformedCommand {
            offset: *pos,
            reason: "create argument is not an i32",
        })?;
        if *pos == buf.len() {
            return Ok(CreateArgs::Number(number));
        }
        let label = codec::decode_str(buf, pos).ok_or(ProtocolError::MalformedCommand {
            offset: *pos,
            reason: "second create argument is not a string",
        })?;
        if *pos == buf.len() {
            return Ok(CreateArgs::NumberLabel(number, label));
        }
        Err(ProtocolError::MalformedCommand {
            offset: *pos,
            reason: "trailing bytes after create arguments",
        })
    }
}

/// A method call resolved at decode time.
///
/// The method set is closed; an unrecognized name decodes to `Unknown`, which
/// the dispatcher answers with an empty reply rather than an error.
#[derive(Debug, Clone, PartialEq)]
pub enum MethodCall {
    /// Void, no arguments.
    Print,
    /// Returns a string, no arguments.
    Render,
    /// Returns a bool, one i32 argument.
    SetNumber(i32),
    /// Returns a bool, one string argument.
    SetLabel(String),
    /// Name not in the closed set; carries the name for logging.
    Unknown(String),
}

impl MethodCall {
    fn encode(&self, buf: &mut BytesMut) {
        match self {
            MethodCall::Print => codec::encode_str(buf, METHOD_PRINT),
            MethodCall::Render => codec::encode_str(buf, METHOD_RENDER),
            MethodCall::SetNumber(n) => {
                codec::encode_str(buf, METHOD_SET_NUMBER);
                codec::encode_i32(buf, *n);
            }
            MethodCall::SetLabel(label) => {
                codec::encode_str(buf, METHOD_SET_LABEL);
                codec::encode_str(buf, label);
            }
            MethodCall::Unknown(name) => codec::encode_str(buf, name),
        }
    }

    fn decode(buf: &[u8], pos: &mut usize) -> Result<Self, ProtocolError> {
        let name = codec::decode_str(buf, pos).ok_or(ProtocolError::MalformedCommand {
            offset: *pos,
            reason: "method name is not a string",
        })?;

        match name.as_str() {
            METHOD_PRINT => Ok(MethodCall::Print),
            METHOD_RENDER => Ok(MethodCall::Render),
            METHOD_SET_NUMBER => {
                let arg = codec::decode_i32(buf, pos).ok_or(ProtocolError::MalformedCommand {
                    offset: *pos,
                    reason: "SetNumber argument is not an i32",
                })?;
                Ok(MethodCall::SetNumber(arg))
            }
            METHOD_SET_LABEL => {
                let arg = codec::decode_str(buf, pos).ok_or(ProtocolError::MalformedCommand {
                    offset: *pos,
                    reason: "SetLabel argument is not a string",
                })?;
                Ok(MethodCall::SetLabel(arg))
            }
            _ => Ok(MethodCall::Unknown(name)),
        }
    }
}

/// A decoded object command.
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectCommand {
    Create(CreateArgs),
    CallMethod { handle: Handle, call: MethodCall },
    GetInstance { handle: Handle },
}

impl ObjectCommand {
    /// Encodes this command for the given class id.
    pub fn encode(&self, class_id: &str, buf: &mut BytesMut) {
        buf.put_u8(COMMAND_MARKER);
        codec::encode_str(buf, class_id);
        match self {
            ObjectCommand::Create(args) => {
                buf.put_slice(&CREATE_MARKER);
                args.encode(buf);
            }
            ObjectCommand::CallMethod { handle, call } => {
                codec::encode_i32(buf, *handle);
                buf.put_slice(&METHOD_MARKER);
                call.encode(buf);
            }
            ObjectCommand::GetInstance { handle } => {
                codec::encode_i32(buf, *handle);
                buf.put_slice(&GET_INSTANCE_MARKER);
            }
        }
    }

    /// Decodes an object command, validating the class id against the single
    /// registered class name (byte-sensitive).
    ///
    /// Returns [`ProtocolError::NotObjectCommand`] when the payload does not
    /// start with the command marker; any failure past the marker is a hard
    /// parse failure for the command.
    pub fn decode(
        buf: &[u8],
        pos: &mut usize,
        expected_class: &str,
    ) -> Result<Self, ProtocolError> {
        let mut idx = *pos;
        if buf.len() <= idx || buf[idx] != COMMAND_MARKER {
            return Err(ProtocolError::NotObjectCommand);
        }
        idx += 1;

        let class = codec::decode_str(buf, &mut idx).ok_or(ProtocolError::MalformedCommand {
            offset: idx,
            reason: "class id is not a string",
        })?;
        if class != expected_class {
            return Err(ProtocolError::UnknownClass(class));
        }

        if buf.len() >= idx + 2 && buf[idx..idx + 2] == CREATE_MARKER {
            idx += 2;
            let args = CreateArgs::decode(buf, &mut idx)?;
            *pos = idx;
            return Ok(ObjectCommand::Create(args));
        }

        // All remaining commands address an existing instance by handle.
        let handle = codec::decode_i32(buf, &mut idx).ok_or(ProtocolError::MalformedCommand {
            offset: idx,
            reason: "instance handle is not an i32",
        })?;

        if buf.len() >= idx + 2 && buf[idx..idx + 2] == METHOD_MARKER {
            idx += 2;
            let call = MethodCall::decode(buf, &mut idx)?;
            *pos = idx;
            return Ok(ObjectCommand::CallMethod { handle, call });
        }

        if buf.len() >= idx + 2 && buf[idx..idx + 2] == GET_INSTANCE_MARKER {
            idx += 2;
            *pos = idx;
            return Ok(ObjectCommand::GetInstance { handle });
        }

        Err(ProtocolError::MalformedCommand {
            offset: idx,
            reason: "expected #c, #m or #g",
        })
    }
}

/// A decoded message payload: either an object command or a bare primitive.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Command(ObjectCommand),
    Value(Value),
}

impl Payload {
    /// Decodes a payload with the mandated precedence: object command first,
    /// then bool, int, double, string. First success wins; if everything
    /// fails the whole frame is unparseable.
    pub fn decode(
        buf: &[u8],
        pos: &mut usize,
        expected_class: &str,
    ) -> Result<Self, ProtocolError> {
        match ObjectCommand::decode(buf, pos, expected_class) {
            Ok(command) => Ok(Payload::Command(command)),
            Err(command_err) => match Value::decode(buf, pos) {
                Some(value) => Ok(Payload::Value(value)),
                None => match command_err {
                    ProtocolError::NotObjectCommand => Err(ProtocolError::UnparseablePayload),
                    other => Err(other),
                },
            },
        }
    }
}

/// A fully decoded inbound message.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// `None` when the sender attached no request-id header.
    pub request_id: Option<RequestId>,
    pub payload: Payload,
}

impl Message {
    /// Decodes one complete message (header + payload) from a datagram body.
    pub fn decode(buf: &[u8], expected_class: &str) -> Result<Self, ProtocolError> {
        let mut pos = 0;
        let request_id = decode_request_header(buf, &mut pos);
        let payload = Payload::decode(buf, &mut pos, expected_class)?;
        Ok(Message {
            request_id,
            payload,
        })
    }
}

/// Decodes a reply frame: optional request-id header plus one primitive.
///
/// Replies never carry object commands; the create reply is a bare i32.
pub fn decode_reply(buf: &[u8]) -> Result<(Option<RequestId>, Value), ProtocolError> {
    let mut pos = 0;
    let request_id = decode_request_header(buf, &mut pos);
    let value = Value::decode(buf, &mut pos).ok_or(ProtocolError::UnparseablePayload)?;
    Ok((request_id, value))
}
