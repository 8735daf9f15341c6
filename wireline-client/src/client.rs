//! High-level client: remote widget creation and method calls.

use crate::connection::{Connection, ConnectionConfig};
use crate::error::ClientError;
use crate::handles::HandleSet;
use bytes::BytesMut;
use std::sync::Arc;
use wireline_core::{Widget, WIDGET_CLASS};
use wireline_protocol::message::{CreateArgs, MethodCall, ObjectCommand};
use wireline_protocol::{codec, Handle, RequestId, Value};

/// Client for a wireline server.
///
/// Wraps a [`Connection`] with typed operations on remote widgets. Handles
/// returned by successful creates are recorded in a [`HandleSet`] for later
/// enumeration.
pub struct Client {
    connection: Connection,
    handles: Arc<HandleSet>,
}

impl Client {
    /// Connects to the server described by `config`.
    pub async fn connect(config: ConnectionConfig) -> Result<Self, ClientError> {
        Ok(Self {
            connection: Connection::connect(config).await?,
            handles: Arc::new(HandleSet::new()),
        })
    }

    /// Handles of every widget this client has created.
    pub fn handles(&self) -> &HandleSet {
        &self.handles
    }

    pub fn pending_count(&self) -> usize {
        self.connection.pending_count()
    }

    /// Sends a bare boolean; the server logs it and answers nothing.
    pub async fn send_bool(&self, value: bool) -> Result<(), ClientError> {
        self.send_value(Value::Bool(value)).await
    }

    /// Sends a bare integer; the server logs it and answers nothing.
    pub async fn send_int(&self, value: i32) -> Result<(), ClientError> {
        self.send_value(Value::Int(value)).await
    }

    /// Sends a bare double; the server logs it and answers nothing.
    pub async fn send_double(&self, value: f64) -> Result<(), ClientError> {
        self.send_value(Value::Double(value)).await
    }

    /// Sends a bare string; the server logs it and answers nothing.
    pub async fn send_str(&self, value: &str) -> Result<(), ClientError> {
        let mut body = BytesMut::new();
        codec::encode_str(&mut body, value);
        self.connection.send(&body).await
    }

    async fn send_value(&self, value: Value) -> Result<(), ClientError> {
        let mut body = BytesMut::new();
        value.encode(&mut body);
        self.connection.send(&body).await
    }

    /// Creates a widget on the server and waits for its handle.
    pub async fn create(&self, args: CreateArgs) -> Result<Handle, ClientError> {
        let body = encode_command(&ObjectCommand::Create(args));
        let handle = expect_i32(self.connection.request(&body).await?)?;
        self.handles.register(handle);
        Ok(handle)
    }

    /// Creates a widget, delivering the handle to `on_created` when the
    /// reply arrives instead of waiting for it here.
    pub async fn create_with(
        &self,
        args: CreateArgs,
        on_created: impl FnOnce(Result<Handle, ClientError>) + Send + 'static,
    ) -> Result<RequestId, ClientError> {
        let body = encode_command(&ObjectCommand::Create(args));
        let handles = self.handles.clone();
        self.connection
            .call(
                &body,
                Box::new(move |result| {
                    let handle = result.and_then(expect_i32);
                    if let Ok(handle) = &handle {
                        handles.register(*handle);
                    }
                    on_created(handle);
                }),
            )
            .await
    }

    /// Invokes the void `Print` method; no reply crosses the wire.
    pub async fn print(&self, handle: Handle) -> Result<(), ClientError> {
        let body = encode_command(&ObjectCommand::CallMethod {
            handle,
            call: MethodCall::Print,
        });
        self.connection.send(&body).await
    }

    /// Renders the widget into its display string.
    pub async fn render(&self, handle: Handle) -> Result<String, ClientError> {
        let body = encode_command(&ObjectCommand::CallMethod {
            handle,
            call: MethodCall::Render,
        });
        expect_string(self.connection.request(&body).await?)
    }

    /// Sets the widget number; true when the stored value actually changed.
    pub async fn set_number(&self, handle: Handle, number: i32) -> Result<bool, ClientError> {
        let body = encode_command(&ObjectCommand::CallMethod {
            handle,
            call: MethodCall::SetNumber(number),
        });
        expect_bool(self.connection.request(&body).await?)
    }

    /// Sets the widget label; true when the stored value actually changed.
    pub async fn set_label(&self, handle: Handle, label: &str) -> Result<bool, ClientError> {
        let body = encode_command(&ObjectCommand::CallMethod {
            handle,
            call: MethodCall::SetLabel(label.to_string()),
        });
        expect_bool(self.connection.request(&body).await?)
    }

    /// Fetches a local copy of the widget's current state.
    pub async fn get_instance(&self, handle: Handle) -> Result<Widget, ClientError> {
        let body = encode_command(&ObjectCommand::GetInstance { handle });
        let value = self.connection.request(&body).await?;
        let bytes = value.as_bytes().ok_or(ClientError::UnexpectedReply {
            expected: "string",
            got: value_kind(&value),
        })?;
        Ok(Widget::from_wire(bytes)?)
    }
}

fn encode_command(command: &ObjectCommand) -> BytesMut {
    let mut body = BytesMut::new();
    command.encode(WIDGET_CLASS, &mut body);
    body
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Bool(_) => "bool",
        Value::Int(_) => "int",
        Value::Double(_) => "double",
        Value::Str(_) => "string",
    }
}

fn expect_i32(value: Value) -> Result<i32, ClientError> {
    value.as_i32().ok_or(ClientError::UnexpectedReply {
        expected: "int",
        got: value_kind(&value),
    })
}

fn expect_bool(value: Value) -> Result<bool, ClientError> {
    value.as_bool().ok_or(ClientError::UnexpectedReply {
        expected: "bool",
        got: value_kind(&value),
    })
}

fn expect_string(value: Value) -> Result<String, ClientError> {
    match value.as_str() {
        Some(text) => Ok(text.to_string()),
        None => Err(ClientError::UnexpectedReply {
            expected: "string",
            got: value_kind(&value),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::ExecutionMode;
    use std::net::SocketAddr;
    use tokio::sync::oneshot;
    use wireline_core::Registry;
    use wireline_server::{Server, ServerConfig};

    async fn start_server() -> SocketAddr {
        let config = ServerConfig::new("127.0.0.1:0".parse().unwrap());
        let server = Arc::new(
            Server::bind(config, Arc::new(Registry::new()))
                .await
                .unwrap(),
        );
        let addr = server.local_addr().unwrap();
        tokio::spawn(async move { server.run().await });
        addr
    }

    async fn connect(addr: SocketAddr, mode: ExecutionMode) -> Client {
        Client::connect(ConnectionConfig::new(addr).with_mode(mode))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_and_mutate_blocking() {
        let addr = start_server().await;
        let client = connect(addr, ExecutionMode::Blocking).await;

        let handle = client
            .create(CreateArgs::NumberLabel(52, "Hello".to_string()))
            .await
            .unwrap();
        assert_eq!(handle, 0);
        assert!(client.handles().contains(handle));

        // Same value back: no change reported.
        assert!(!client.set_number(handle, 52).await.unwrap());
        assert!(client.set_number(handle, 750).await.unwrap());
        assert!(client.set_label(handle, "updated").await.unwrap());

        let widget = client.get_instance(handle).await.unwrap();
        assert_eq!(widget, Widget::new(750, "updated"));
    }

    #[tokio::test]
    async fn test_render_roundtrip() {
        let addr = start_server().await;
        let client = connect(addr, ExecutionMode::Blocking).await;

        let handle = client
            .create(CreateArgs::NumberLabel(7, "seven".to_string()))
            .await
            .unwrap();
        let rendered = client.render(handle).await.unwrap();
        assert!(rendered.contains('7'));
        assert!(rendered.contains("seven"));
    }

    #[tokio::test]
    async fn test_fire_and_forget_sends_keep_connection_usable() {
        let addr = start_server().await;
        let client = connect(addr, ExecutionMode::Blocking).await;

        client.send_bool(true).await.unwrap();
        client.send_int(42).await.unwrap();
        client.send_double(2.5).await.unwrap();
        client.send_str("hello").await.unwrap();

        // The next reply-bearing call still correlates correctly.
        let handle = client.create(CreateArgs::Default).await.unwrap();
        assert_eq!(handle, 0);
        assert_eq!(client.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_print_expects_no_reply() {
        let addr = start_server().await;
        let client = connect(addr, ExecutionMode::Blocking).await;

        let handle = client.create(CreateArgs::Number(1)).await.unwrap();
        client.print(handle).await.unwrap();
        assert_eq!(client.pending_count(), 0);

        // The connection is still in sync afterwards.
        assert!(client.set_number(handle, 2).await.unwrap());
    }

    #[tokio::test]
    async fn test_callback_mode_create_with() {
        let addr = start_server().await;
        let client = connect(addr, ExecutionMode::Callback).await;

        let (tx, rx) = oneshot::channel();
        client
            .create_with(CreateArgs::Number(5), move |result| {
                let _ = tx.send(result);
            })
            .await
            .unwrap();

        let handle = rx.await.unwrap().unwrap();
        assert_eq!(handle, 0);
        assert!(client.handles().contains(handle));
    }

    #[tokio::test]
    async fn test_callback_mode_blocking_style_calls_still_work() {
        let addr = start_server().await;
        let client = connect(addr, ExecutionMode::Callback).await;

        let handle = client
            .create(CreateArgs::NumberLabel(1, "x".to_string()))
            .await
            .unwrap();
        assert!(client.set_label(handle, "y").await.unwrap());
        let widget = client.get_instance(handle).await.unwrap();
        assert_eq!(widget, Widget::new(1, "y"));
    }

    #[tokio::test]
    async fn test_callback_mode_interleaved_requests() {
        let addr = start_server().await;
        let client = Arc::new(connect(addr, ExecutionMode::Callback).await);

        let mut receivers = Vec::new();
        for n in 0..8 {
            let (tx, rx) = oneshot::channel();
            client
                .create_with(CreateArgs::Number(n), move |result| {
                    let _ = tx.send(result);
                })
                .await
                .unwrap();
            receivers.push(rx);
        }

        let mut handles = Vec::new();
        for rx in receivers {
            handles.push(rx.await.unwrap().unwrap());
        }
        handles.sort_unstable();
        assert_eq!(handles, (0..8).collect::<Vec<_>>());
        assert_eq!(client.handles().len(), 8);
    }

    #[tokio::test]
    async fn test_two_clients_share_one_registry() {
        let addr = start_server().await;
        let first = connect(addr, ExecutionMode::Blocking).await;
        let second = connect(addr, ExecutionMode::Blocking).await;

        let a = first.create(CreateArgs::Number(1)).await.unwrap();
        let b = second.create(CreateArgs::Number(2)).await.unwrap();
        assert_ne!(a, b);

        // A handle created by one client is addressable by the other.
        let widget = second.get_instance(a).await.unwrap();
        assert_eq!(widget.number, 1);
    }
}
