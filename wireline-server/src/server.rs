//! TCP server: accept loop and per-connection workers.

use crate::dispatch::Dispatcher;
use crate::error::ServerError;
use bytes::BytesMut;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio::task::JoinSet;
use wireline_core::{Registry, Widget};
use wireline_protocol::message::encode_request_header;
use wireline_protocol::{wire, DatagramDecoder};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to.
    pub bind_addr: SocketAddr,
    /// Maximum concurrent connections.
    pub max_connections: usize,
    /// Read buffer size for socket reads.
    pub read_buffer_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], wireline_protocol::DEFAULT_PORT)),
            max_connections: 1000,
            read_buffer_size: 8192,
        }
    }
}

impl ServerConfig {
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            ..Default::default()
        }
    }

    pub fn with_max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    pub fn with_read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size;
        self
    }
}

/// Server statistics.
#[derive(Debug, Default)]
pub struct ServerStats {
    pub connections_total: AtomicU64,
    pub connections_active: AtomicU64,
    pub requests_total: AtomicU64,
    pub errors_total: AtomicU64,
}

/// TCP server for wireline.
///
/// One worker task per connection: blocking read, dispatch, conditional
/// write-back. Workers terminate on end-of-stream or read failure; shutdown
/// broadcasts a closing signal that every worker observes.
pub struct Server {
    config: ServerConfig,
    dispatcher: Arc<Dispatcher>,
    listener: TcpListener,
    stats: Arc<ServerStats>,
    shutdown: broadcast::Sender<()>,
    running: AtomicBool,
    client_ids: AtomicU64,
}

impl Server {
    /// Binds the listener and prepares the server to run.
    pub async fn bind(
        config: ServerConfig,
        registry: Arc<Registry<Widget>>,
    ) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(config.bind_addr).await?;
        let (shutdown_tx, _) = broadcast::channel(1);
        Ok(Self {
            config,
            dispatcher: Arc::new(Dispatcher::new(registry)),
            listener,
            stats: Arc::new(ServerStats::default()),
            shutdown: shutdown_tx,
            running: AtomicBool::new(false),
            client_ids: AtomicU64::new(0),
        })
    }

    /// Returns the bound address (useful when binding port 0).
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Runs the accept loop until shutdown.
    pub async fn run(&self) -> Result<(), ServerError> {
        self.running.store(true, Ordering::SeqCst);
        tracing::info!("server listening on {}", self.local_addr()?);

        let mut shutdown_rx = self.shutdown.subscribe();
        let mut workers: JoinSet<()> = JoinSet::new();

        loop {
            tokio::select! {
                // Reap workers as they finish so the set stays small.
                Some(_) = workers.join_next(), if !workers.is_empty() => {}
                result = self.listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            if self.stats.connections_active.load(Ordering::Relaxed)
                                >= self.config.max_connections as u64
                            {
                                tracing::warn!("connection limit reached, rejecting {}", addr);
                                continue;
                            }

                            let client_id = self.client_ids.fetch_add(1, Ordering::SeqCst);
                            self.stats.connections_total.fetch_add(1, Ordering::Relaxed);
                            self.stats.connections_active.fetch_add(1, Ordering::Relaxed);

                            let dispatcher = self.dispatcher.clone();
                            let stats = self.stats.clone();
                            let config = self.config.clone();
                            let mut conn_shutdown = self.shutdown.subscribe();

                            workers.spawn(async move {
                                tracing::info!(client_id, "client connected: {}", addr);
                                let result = Self::handle_connection(
                                    stream,
                                    client_id,
                                    dispatcher,
                                    &stats,
                                    &config,
                                    &mut conn_shutdown,
                                )
                                .await;

                                if let Err(e) = result {
                                    tracing::debug!(client_id, "connection ended: {}", e);
                                }
                                stats.connections_active.fetch_sub(1, Ordering::Relaxed);
                                tracing::info!(client_id, "client disconnected: {}", addr);
                            });
                        }
                        Err(e) => {
                            tracing::error!("accept error: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    tracing::info!("server shutting down");
                    break;
                }
            }
        }

        // Workers observe the same shutdown signal; wait for all of them.
        while workers.join_next().await.is_some() {}

        self.running.store(false, Ordering::SeqCst);
        Ok(())
    }

    /// Serves one client until end-of-stream, error, or shutdown.
    async fn handle_connection(
        mut stream: TcpStream,
        client_id: u64,
        dispatcher: Arc<Dispatcher>,
        stats: &ServerStats,
        config: &ServerConfig,
        shutdown: &mut broadcast::Receiver<()>,
    ) -> Result<(), ServerError> {
        let mut decoder = DatagramDecoder::new();
        let mut buf = vec![0u8; config.read_buffer_size];

        loop {
            tokio::select! {
                result = stream.read(&mut buf) => {
                    match result {
                        Ok(0) => {
                            tracing::debug!(client_id, "connection closed by client");
                            return Ok(());
                        }
                        Ok(n) => decoder.extend(&buf[..n]),
                        Err(e) => return Err(ServerError::Io(e)),
                    }
                }
                _ = shutdown.recv() => {
                    return Err(ServerError::ShuttingDown);
                }
            }

            while let Some(body) = decoder.next()? {
                stats.requests_total.fetch_add(1, Ordering::Relaxed);

                match dispatcher.dispatch(client_id, &body) {
                    Ok(reply) if !reply.is_empty() => {
                        let mut out = BytesMut::new();
                        if let Some(id) = reply.request_id {
                            encode_request_header(&mut out, id);
                        }
                        out.extend_from_slice(&reply.body);

                        let datagram = wire::encode_datagram(&out)?;
                        stream.write_all(&datagram).await?;
                    }
                    Ok(_) => {
                        // Empty reply payload: nothing to send.
                    }
                    Err(e) => {
                        // The request fails silently on the wire; the worker
                        // keeps serving this connection.
                        stats.errors_total.fetch_add(1, Ordering::Relaxed);
                        tracing::error!(client_id, "request failed: {}", e);
                    }
                }
            }
        }
    }

    /// Initiates server shutdown.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(());
    }

    /// Returns whether the accept loop is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Returns server statistics.
    pub fn stats(&self) -> &ServerStats {
        &self.stats
    }
}
