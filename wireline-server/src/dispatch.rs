//! Command dispatch: decoded messages in, reply payloads out.

use crate::error::ServerError;
use bytes::{Bytes, BytesMut};
use std::sync::Arc;
use wireline_core::{Registry, Widget, WIDGET_CLASS};
use wireline_protocol::message::{self, MethodCall, ObjectCommand, Payload};
use wireline_protocol::{codec, RequestId};

/// A reply produced by the dispatcher.
///
/// An empty body means "nothing to send": fire-and-forget calls and bare
/// primitives produce no network traffic at all.
#[derive(Debug, Clone)]
pub struct Reply {
    /// Request id of the originating message, echoed back in the `#r` header.
    pub request_id: Option<RequestId>,
    pub body: Bytes,
}

impl Reply {
    fn empty(request_id: Option<RequestId>) -> Self {
        Self {
            request_id,
            body: Bytes::new(),
        }
    }

    /// True when there is nothing to transmit.
    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }
}

/// Routes decoded commands to the object registry.
pub struct Dispatcher {
    registry: Arc<Registry<Widget>>,
}

impl Dispatcher {
    pub fn new(registry: Arc<Registry<Widget>>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<Registry<Widget>> {
        &self.registry
    }

    /// Parses and executes one datagram body.
    ///
    /// Errors mean the request failed as a whole: the caller logs, sends no
    /// reply, and continues with the next datagram.
    pub fn dispatch(&self, client_id: u64, datagram: &[u8]) -> Result<Reply, ServerError> {
        let mut pos = 0;
        let request_id = message::decode_request_header(datagram, &mut pos);
        let payload = Payload::decode(datagram, &mut pos, WIDGET_CLASS).map_err(|e| {
            tracing::error!(client_id, ?request_id, "cannot parse request: {}", e);
            e
        })?;

        match payload {
            Payload::Value(value) => {
                tracing::info!(client_id, ?request_id, "received primitive: {:?}", value);
                Ok(Reply::empty(request_id))
            }
            Payload::Command(command) => self.execute(client_id, request_id, command),
        }
    }

    fn execute(
        &self,
        client_id: u64,
        request_id: Option<RequestId>,
        command: ObjectCommand,
    ) -> Result<Reply, ServerError> {
        match command {
            ObjectCommand::Create(args) => {
                let handle = self.registry.insert(Widget::from_args(args));
                tracing::debug!(client_id, ?request_id, handle, "created widget");

                // The reply is a bare primitive handle, not wrapped in the
                // object-command envelope.
                let mut body = BytesMut::new();
                codec::encode_i32(&mut body, handle);
                Ok(Reply {
                    request_id,
                    body: body.freeze(),
                })
            }

            ObjectCommand::CallMethod { handle, call } => {
                let instance = self.registry.get(handle).ok_or_else(|| {
                    tracing::error!(client_id, ?request_id, handle, "invalid widget handle");
                    ServerError::UnknownHandle(handle)
                })?;

                let mut body = BytesMut::new();
                match call {
                    MethodCall::Print => {
                        instance.lock().print();
                    }
                    MethodCall::Render => {
                        let text = instance.lock().render();
                        codec::encode_str(&mut body, &text);
                    }
                    MethodCall::SetNumber(number) => {
                        let changed = instance.lock().set_number(number);
                        codec::encode_bool(&mut body, changed);
                    }
                    MethodCall::SetLabel(label) => {
                        let changed = instance.lock().set_label(label);
                        codec::encode_bool(&mut body, changed);
                    }
                    MethodCall::Unknown(name) => {
                        // Not a success: the caller gets an empty reply and
                        // the event is only visible in the log.
                        tracing::warn!(client_id, ?request_id, handle, method = %name,
                            "unrecognized method name");
                    }
                }

                Ok(Reply {
                    request_id,
                    body: body.freeze(),
                })
            }

            ObjectCommand::GetInstance { handle } => {
                let instance = self.registry.get(handle).ok_or_else(|| {
                    tracing::error!(client_id, ?request_id, handle, "invalid widget handle");
                    ServerError::UnknownHandle(handle)
                })?;

                let state = instance.lock().to_wire();
                let mut body = BytesMut::new();
                codec::encode_bytes(&mut body, &state);
                Ok(Reply {
                    request_id,
                    body: body.freeze(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wireline_protocol::message::{encode_request_header, CreateArgs};
    use wireline_protocol::Value;

    fn dispatcher() -> Dispatcher {
        Dispatcher::new(Arc::new(Registry::new()))
    }

    fn request(id: RequestId, command: &ObjectCommand) -> BytesMut {
        let mut buf = BytesMut::new();
        encode_request_header(&mut buf, id);
        command.encode(WIDGET_CLASS, &mut buf);
        buf
    }

    fn reply_value(reply: &Reply) -> Value {
        let mut pos = 0;
        Value::decode(&reply.body, &mut pos).unwrap()
    }

    #[test]
    fn test_create_replies_bare_handle() {
        let dispatcher = dispatcher();
        let buf = request(1, &ObjectCommand::Create(CreateArgs::Default));

        let reply = dispatcher.dispatch(0, &buf).unwrap();
        assert_eq!(reply.request_id, Some(1));
        assert_eq!(reply_value(&reply), Value::Int(0));
        // Bare primitive: no object-command marker in the body.
        assert_ne!(reply.body[0], message::COMMAND_MARKER);
    }

    #[test]
    fn test_sequential_creates_increase_handles() {
        let dispatcher = dispatcher();
        let commands = [
            ObjectCommand::Create(CreateArgs::Default),
            ObjectCommand::Create(CreateArgs::Number(5)),
            ObjectCommand::Create(CreateArgs::NumberLabel(5, "x".to_string())),
        ];

        let handles: Vec<_> = commands
            .iter()
            .enumerate()
            .map(|(i, c)| {
                let reply = dispatcher.dispatch(0, &request(i as RequestId, c)).unwrap();
                reply_value(&reply).as_i32().unwrap()
            })
            .collect();

        assert_eq!(handles, vec![0, 1, 2]);
    }

    #[test]
    fn test_void_method_and_unknown_method_reply_empty() {
        let dispatcher = dispatcher();
        dispatcher
            .dispatch(0, &request(1, &ObjectCommand::Create(CreateArgs::Default)))
            .unwrap();

        let print = dispatcher
            .dispatch(
                0,
                &request(
                    2,
                    &ObjectCommand::CallMethod {
                        handle: 0,
                        call: MethodCall::Print,
                    },
                ),
            )
            .unwrap();
        assert!(print.is_empty());

        let unknown = dispatcher
            .dispatch(
                0,
                &request(
                    3,
                    &ObjectCommand::CallMethod {
                        handle: 0,
                        call: MethodCall::Unknown("Nope".to_string()),
                    },
                ),
            )
            .unwrap();
        assert!(unknown.is_empty());
    }

    #[test]
    fn test_set_number_reports_change_through_reply() {
        let dispatcher = dispatcher();
        dispatcher
            .dispatch(0, &request(1, &ObjectCommand::Create(CreateArgs::Number(7))))
            .unwrap();

        let set_same = dispatcher
            .dispatch(
                0,
                &request(
                    2,
                    &ObjectCommand::CallMethod {
                        handle: 0,
                        call: MethodCall::SetNumber(7),
                    },
                ),
            )
            .unwrap();
        assert_eq!(reply_value(&set_same), Value::Bool(false));

        let set_new = dispatcher
            .dispatch(
                0,
                &request(
                    3,
                    &ObjectCommand::CallMethod {
                        handle: 0,
                        call: MethodCall::SetNumber(750),
                    },
                ),
            )
            .unwrap();
        assert_eq!(reply_value(&set_new), Value::Bool(true));
    }

    #[test]
    fn test_get_instance_roundtrips_state() {
        let dispatcher = dispatcher();
        dispatcher
            .dispatch(
                0,
                &request(
                    1,
                    &ObjectCommand::Create(CreateArgs::NumberLabel(52, "Hello".to_string())),
                ),
            )
            .unwrap();

        let reply = dispatcher
            .dispatch(0, &request(2, &ObjectCommand::GetInstance { handle: 0 }))
            .unwrap();

        let state = reply_value(&reply);
        let widget = Widget::from_wire(state.as_bytes().unwrap()).unwrap();
        assert_eq!(widget, Widget::new(52, "Hello"));
    }

    #[test]
    fn test_unknown_handle_fails_whole_request() {
        let dispatcher = dispatcher();
        let buf = request(
            1,
            &ObjectCommand::CallMethod {
                handle: 42,
                call: MethodCall::Print,
            },
        );

        let err = dispatcher.dispatch(0, &buf).unwrap_err();
        assert!(matches!(err, ServerError::UnknownHandle(42)));
    }

    #[test]
    fn test_bare_primitive_is_logged_not_answered() {
        let dispatcher = dispatcher();
        let mut buf = BytesMut::new();
        encode_request_header(&mut buf, 1);
        codec::encode_i32(&mut buf, 42);

        let reply = dispatcher.dispatch(0, &buf).unwrap();
        assert!(reply.is_empty());
    }

    #[test]
    fn test_malformed_request_fails() {
        let dispatcher = dispatcher();
        assert!(dispatcher.dispatch(0, &[0xFF, 0x00]).is_err());
    }
}
