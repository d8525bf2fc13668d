//! MCP transport layer: the shared `Transport` contract and the stdio loop.
//!
//! The HTTP/SSE transport lives in [`crate::http`].

use async_trait::async_trait;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::io::{
    AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, Stdin, Stdout,
};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::error::{Error, Result};
use crate::mcp::protocol::{encode, is_request, JsonRpcError, JsonRpcResponse, RequestId};
use crate::mcp::server::McpServer;

/// Transport trait for MCP communication.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Serve messages until the input ends or [`Transport::stop`] is called.
    async fn serve(&self, server: Arc<McpServer>) -> Result<()>;

    /// Ask the transport to shut down. Safe to call more than once.
    fn stop(&self);
}

/// Stdio transport for MCP.
///
/// One message per line in both directions, processed strictly in order.
/// Diagnostics never touch the writer; they go through `tracing`.
pub struct StdioTransport<R = Stdin, W = Stdout> {
    reader: Mutex<BufReader<R>>,
    writer: Mutex<W>,
    shutdown: CancellationToken,
}

impl StdioTransport {
    /// Create a transport over the process's stdin/stdout.
    pub fn new() -> Self {
        Self::with_io(tokio::io::stdin(), tokio::io::stdout())
    }
}

impl Default for StdioTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl<R, W> StdioTransport<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    /// Create a transport over arbitrary byte streams.
    pub fn with_io(reader: R, writer: W) -> Self {
        Self {
            reader: Mutex::new(BufReader::new(reader)),
            writer: Mutex::new(writer),
            shutdown: CancellationToken::new(),
        }
    }

    /// Consume the transport and hand back its writer.
    pub fn into_writer(self) -> W {
        self.writer.into_inner()
    }

    async fn process_line(server: &McpServer, raw: &[u8]) -> Option<String> {
        let Ok(text) = std::str::from_utf8(raw) else {
            warn!("Discarding line that is not valid UTF-8");
            let response =
                JsonRpcResponse::failure(RequestId::Null, JsonRpcError::from(&Error::Parse));
            return Some(encode(&response));
        };

        let line = text.trim_start_matches('\u{feff}').trim();
        if line.is_empty() {
            return None;
        }

        trace!("Received: {}", line);

        match AssertUnwindSafe(server.handle_message(line))
            .catch_unwind()
            .await
        {
            Ok(reply) => reply,
            Err(_) => {
                error!("Dispatcher panicked while handling a message");
                if is_request(line) {
                    let err = Error::Internal("unexpected failure while dispatching".to_string());
                    Some(encode(&JsonRpcResponse::failure(
                        RequestId::Null,
                        JsonRpcError::from(&err),
                    )))
                } else {
                    None
                }
            }
        }
    }

    async fn write_line(writer: &mut W, line: &str) -> std::io::Result<()> {
        writer.write_all(line.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await
    }
}

#[async_trait]
impl<R, W> Transport for StdioTransport<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn serve(&self, server: Arc<McpServer>) -> Result<()> {
        info!("Stdio transport ready");

        let mut reader = self.reader.lock().await;
        let mut writer = self.writer.lock().await;
        let mut buf = Vec::new();

        loop {
            buf.clear();

            let read = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => {
                    info!("Stdio transport cancelled");
                    break;
                }
                read = reader.read_until(b'\n', &mut buf) => read,
            };

            match read {
                Ok(0) => {
                    debug!("EOF on stdin, stopping transport");
                    break;
                }
                Ok(_) => {}
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    let e = Error::from(e);
                    if e.is_disconnect() {
                        warn!("Input stream closed, stopping transport: {}", e);
                        break;
                    }
                    error!("Error reading stdin: {}", e);
                    continue;
                }
            }

            let Some(reply) = Self::process_line(&server, &buf).await else {
                continue;
            };

            trace!("Sending: {}", reply);
            if let Err(e) = Self::write_line(&mut writer, &reply).await {
                let e = Error::from(e);
                if e.is_disconnect() {
                    warn!("Output stream closed, stopping transport: {}", e);
                    break;
                }
                error!("Error writing to stdout: {}", e);
            }
        }

        info!("Stdio transport stopped");
        Ok(())
    }

    fn stop(&self) {
        self.shutdown.cancel();
    }
}
