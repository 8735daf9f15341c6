//! Connection handling: dialing, request framing and reply delivery.

use crate::error::ClientError;
use crate::pending::{Completion, ReplyRouter};
use bytes::BytesMut;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{oneshot, Mutex};
use wireline_protocol::message::{decode_reply, encode_request_header};
use wireline_protocol::{wire, DatagramDecoder, RequestId, Value};

/// Smallest accepted read buffer.
pub const MIN_READ_BUFFER_SIZE: usize = 1024;
/// Largest accepted read buffer, one full datagram.
pub const MAX_READ_BUFFER_SIZE: usize = wire::MAX_DATAGRAM_SIZE as usize;

/// How replies are consumed from the socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    /// The sending call reads the socket until its own reply has arrived.
    #[default]
    Blocking,
    /// A background task reads the socket and fires completions as replies
    /// arrive; sends return as soon as the request is written.
    Callback,
}

/// Connection configuration.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Server address to dial.
    pub addr: SocketAddr,
    /// Total connect attempts before giving up.
    pub connect_attempts: u32,
    /// Fixed delay between connect attempts.
    pub retry_backoff: Duration,
    /// Read buffer size, clamped to the accepted range.
    pub read_buffer_size: usize,
    /// Reply consumption mode.
    pub mode: ExecutionMode,
}

impl ConnectionConfig {
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            connect_attempts: 3,
            retry_backoff: Duration::from_millis(200),
            read_buffer_size: 8192,
            mode: ExecutionMode::default(),
        }
    }

    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_connect_attempts(mut self, attempts: u32) -> Self {
        self.connect_attempts = attempts;
        self
    }

    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    pub fn with_read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size.clamp(MIN_READ_BUFFER_SIZE, MAX_READ_BUFFER_SIZE);
        self
    }
}

/// Inline reply reader used in blocking mode.
struct BlockingReader {
    half: OwnedReadHalf,
    decoder: DatagramDecoder,
    buf: Vec<u8>,
}

impl BlockingReader {
    fn new(half: OwnedReadHalf, buffer_size: usize) -> Self {
        Self {
            half,
            decoder: DatagramDecoder::new(),
            buf: vec![0u8; buffer_size],
        }
    }

    /// Reads once from the socket into the datagram decoder.
    async fn fill(&mut self) -> Result<(), ClientError> {
        let n = self.half.read(&mut self.buf).await?;
        if n == 0 {
            return Err(ClientError::ConnectionClosed);
        }
        self.decoder.extend(&self.buf[..n]);
        Ok(())
    }
}

/// One established connection to a server.
///
/// Requests are numbered from 1 by an atomic counter; each reply-bearing send
/// registers its completion in the [`ReplyRouter`] before the bytes hit the
/// socket, so a reply can never race past its own registration.
pub struct Connection {
    writer: Mutex<OwnedWriteHalf>,
    reader: Mutex<Option<BlockingReader>>,
    router: Arc<ReplyRouter>,
    next_id: AtomicI32,
    mode: ExecutionMode,
}

impl Connection {
    /// Dials the server, retrying with a fixed backoff.
    pub async fn connect(config: ConnectionConfig) -> Result<Self, ClientError> {
        let stream = Self::dial(&config).await?;
        stream.set_nodelay(true)?;
        let (read_half, write_half) = stream.into_split();

        let router = Arc::new(ReplyRouter::new());
        let reader = match config.mode {
            ExecutionMode::Blocking => {
                Some(BlockingReader::new(read_half, config.read_buffer_size))
            }
            ExecutionMode::Callback => {
                // The task holds only a weak router reference: dropping the
                // connection lets the table go away and the task unwind.
                let weak = Arc::downgrade(&router);
                tokio::spawn(read_loop(read_half, weak, config.read_buffer_size));
                None
            }
        };

        tracing::info!("connected to {} ({:?} mode)", config.addr, config.mode);
        Ok(Self {
            writer: Mutex::new(write_half),
            reader: Mutex::new(reader),
            router,
            next_id: AtomicI32::new(1),
            mode: config.mode,
        })
    }

    async fn dial(config: &ConnectionConfig) -> Result<TcpStream, ClientError> {
        let attempts = config.connect_attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match TcpStream::connect(config.addr).await {
                Ok(stream) => return Ok(stream),
                Err(e) if attempt < attempts => {
                    tracing::debug!(attempt, "connect to {} failed: {}", config.addr, e);
                    tokio::time::sleep(config.retry_backoff).await;
                }
                Err(e) => {
                    return Err(ClientError::ConnectFailed { attempts, last: e });
                }
            }
        }
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    /// Number of requests currently awaiting replies.
    pub fn pending_count(&self) -> usize {
        self.router.pending_count()
    }

    /// Sends a request that expects no reply.
    ///
    /// The message still carries a fresh request id; it just never enters
    /// the correlation table, so a reply to it would be dropped.
    pub async fn send(&self, body: &[u8]) -> Result<(), ClientError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let datagram = wire::encode_datagram(&frame_request(id, body))?;
        self.writer.lock().await.write_all(&datagram).await?;
        Ok(())
    }

    /// Sends a request and arranges for `completion` to receive the reply.
    ///
    /// In blocking mode the call also drains the socket until its own reply
    /// has resolved, so the completion has fired by the time this returns.
    pub async fn call(&self, body: &[u8], completion: Completion) -> Result<RequestId, ClientError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let datagram = wire::encode_datagram(&frame_request(id, body))?;

        if !self.router.register(id, completion) {
            return Err(ClientError::DuplicateRequest(id));
        }

        {
            let mut writer = self.writer.lock().await;
            if let Err(e) = writer.write_all(&datagram).await {
                // The completion never runs; the caller owns this error.
                self.router.discard(id);
                return Err(ClientError::Io(e));
            }
        }

        if self.mode == ExecutionMode::Blocking {
            self.pump_until_resolved(id).await?;
        }
        Ok(id)
    }

    /// Sends a request and awaits its reply value.
    ///
    /// Works in both modes: blocking mode resolves the channel inline,
    /// callback mode resolves it from the reader task.
    pub async fn request(&self, body: &[u8]) -> Result<Value, ClientError> {
        let (tx, rx) = oneshot::channel();
        self.call(
            body,
            Box::new(move |result| {
                let _ = tx.send(result);
            }),
        )
        .await?;
        rx.await.map_err(|_| ClientError::ConnectionClosed)?
    }

    /// Reads replies until `id` is no longer pending.
    ///
    /// Other requests' replies encountered on the way resolve normally, so
    /// out-of-order arrival costs nothing.
    async fn pump_until_resolved(&self, id: RequestId) -> Result<(), ClientError> {
        let mut guard = self.reader.lock().await;
        let reader = guard.as_mut().ok_or(ClientError::ConnectionClosed)?;

        while self.router.is_pending(id) {
            if let Err(e) = reader.fill().await {
                self.router.fail_all(|| ClientError::ConnectionClosed);
                return Err(e);
            }

            loop {
                let body = match reader.decoder.next() {
                    Ok(Some(body)) => body,
                    Ok(None) => break,
                    Err(e) => {
                        // Framing is lost; nothing pending can complete.
                        self.router.fail_all(|| ClientError::ConnectionClosed);
                        return Err(e.into());
                    }
                };
                deliver_reply(&self.router, &body);
            }
        }
        Ok(())
    }
}

/// Prefixes a request body with its `#r` id header.
fn frame_request(id: RequestId, body: &[u8]) -> BytesMut {
    let mut frame = BytesMut::with_capacity(body.len() + 7);
    encode_request_header(&mut frame, id);
    frame.extend_from_slice(body);
    frame
}

/// Decodes one reply body and routes it to its completion.
fn deliver_reply(router: &ReplyRouter, body: &[u8]) {
    match decode_reply(body) {
        Ok((Some(id), value)) => {
            if !router.resolve(id, value) {
                tracing::warn!(id, "reply matched no pending request");
            }
        }
        Ok((None, value)) => {
            tracing::warn!("reply without request id dropped: {:?}", value);
        }
        Err(e) => {
            tracing::error!("undecodable reply: {}", e);
        }
    }
}

/// Background reply reader for callback mode.
async fn read_loop(mut half: OwnedReadHalf, router: Weak<ReplyRouter>, buffer_size: usize) {
    let mut decoder = DatagramDecoder::new();
    let mut buf = vec![0u8; buffer_size];

    loop {
        let n = match half.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                tracing::debug!("reply reader stopped: {}", e);
                break;
            }
        };
        decoder.extend(&buf[..n]);

        loop {
            let body = match decoder.next() {
                Ok(Some(body)) => body,
                Ok(None) => break,
                Err(e) => {
                    tracing::error!("reply stream framing lost: {}", e);
                    if let Some(router) = router.upgrade() {
                        router.fail_all(|| ClientError::ConnectionClosed);
                    }
                    return;
                }
            };

            // Connection dropped: no one is waiting anymore.
            let Some(router) = router.upgrade() else {
                return;
            };
            deliver_reply(&router, &body);
        }
    }

    if let Some(router) = router.upgrade() {
        router.fail_all(|| ClientError::ConnectionClosed);
    }
}
