//! wireline - object RPC over message-framed byte channels
//!
//! Runs the TCP server. With the `demo` argument it also drives a scripted
//! client session against the freshly started server and exits.

use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use wireline_client::{Client, ConnectionConfig, ExecutionMode};
use wireline_core::Registry;
use wireline_protocol::message::CreateArgs;
use wireline_server::{Server, ServerConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let bind_addr = match std::env::var("WIRELINE_ADDR") {
        Ok(addr) => addr.parse()?,
        Err(_) => ServerConfig::default().bind_addr,
    };
    let demo = std::env::args().nth(1).as_deref() == Some("demo");

    tracing::info!("Starting wireline server");
    tracing::info!("  Bind address: {}", bind_addr);

    let registry = Arc::new(Registry::new());
    let server = Arc::new(Server::bind(ServerConfig::new(bind_addr), registry).await?);
    let addr = server.local_addr()?;

    if demo {
        let run_server = server.clone();
        let server_handle = tokio::spawn(async move { run_server.run().await });

        run_demo(addr).await?;

        server.shutdown();
        let _ = server_handle.await;
        tracing::info!("Server stopped");
        return Ok(());
    }

    // Spawn shutdown signal handler
    let shutdown_server = server.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        tracing::info!("Received shutdown signal, stopping server...");
        shutdown_server.shutdown();
    });

    // Run server (blocks until shutdown)
    server.run().await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Scripted client session exercising every operation once.
async fn run_demo(addr: std::net::SocketAddr) -> Result<(), Box<dyn std::error::Error>> {
    let client = Client::connect(
        ConnectionConfig::new(addr).with_mode(ExecutionMode::Blocking),
    )
    .await?;

    client.send_int(42).await?;
    client.send_str("hello from the demo client").await?;

    let handle = client
        .create(CreateArgs::NumberLabel(52, "Hello".to_string()))
        .await?;
    tracing::info!("created widget with handle {}", handle);

    let changed = client.set_number(handle, 750).await?;
    tracing::info!("set_number(750) changed: {}", changed);

    let rendered = client.render(handle).await?;
    tracing::info!("rendered: {}", rendered);

    let widget = client.get_instance(handle).await?;
    tracing::info!("fetched state: number={} label={:?}", widget.number, widget.label);

    client.print(handle).await?;

    tracing::info!("demo finished, created handles: {:?}", client.handles().all());
    Ok(())
}
