//! MCP Capability Server
//!
//! Serves the built-in tools and resources over stdio or streamable HTTP.

use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use mcp_capability_server::config::{Args, Config, Transport};
use mcp_capability_server::error::Result;
use mcp_capability_server::http::HttpTransport;
use mcp_capability_server::mcp::handler::McpHandler;
use mcp_capability_server::mcp::server::McpServer;
use mcp_capability_server::mcp::transport::{StdioTransport, Transport as McpTransport};
use mcp_capability_server::metrics::Metrics;
use mcp_capability_server::tools;
use mcp_capability_server::{SERVER_NAME, VERSION};

/// How long shutdown waits on runtime threads. The stdin reader sits on a
/// blocking thread that cannot be interrupted.
const SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    // Initialize logging. stdout is reserved for the protocol.
    let default_level = if args.debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    // Build configuration from args
    let config: Config = args.into();
    config.validate()?;

    info!("{} v{}", SERVER_NAME, VERSION);
    info!("Transport: {:?}", config.transport);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(run(config));
    runtime.shutdown_timeout(SHUTDOWN_GRACE);

    info!("Server stopped");
    result
}

async fn run(config: Config) -> Result<()> {
    // Create MCP handler and register capabilities
    let mut handler = McpHandler::new();
    tools::register_all_tools(&mut handler);
    info!(
        "Registered {} tools and {} resources",
        handler.tool_count(),
        handler.resource_count()
    );

    let metrics = Metrics::new();
    let server = Arc::new(McpServer::new(handler, SERVER_NAME).with_metrics(metrics.clone()));

    let transport: Arc<dyn McpTransport> = match config.transport {
        Transport::Stdio => Arc::new(StdioTransport::new()),
        Transport::Http => Arc::new(HttpTransport::new(&config, metrics)),
    };

    let on_signal = transport.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutdown signal received");
                on_signal.stop();
            }
            Err(e) => error!("Failed to listen for shutdown signal: {}", e),
        }
    });

    transport.serve(server).await
}
