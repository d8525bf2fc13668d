//! Server-Sent-Events framing and per-session connections.

use axum::body::Bytes;
use futures::{Stream, StreamExt};
use std::convert::Infallible;
use std::fmt::Write as _;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::metrics::Metrics;

/// Event type carrying JSON-RPC messages.
pub const MESSAGE_EVENT: &str = "message";

/// Event type of keep-alive frames.
pub const PING_EVENT: &str = "ping";

/// Payload of keep-alive frames.
pub const KEEP_ALIVE_DATA: &str = "keep-alive";

/// Default interval between keep-alive frames.
pub const DEFAULT_KEEP_ALIVE: Duration = Duration::from_secs(30);

/// Frames buffered per connection before a send waits on the client.
const CHANNEL_CAPACITY: usize = 32;

/// Body stream handed to the HTTP response.
pub type SseStream = Pin<Box<dyn Stream<Item = Result<Bytes, Infallible>> + Send>>;

/// Render one SSE event.
///
/// Every line of `data` becomes its own `data:` line (CRLF, LF and lone CR
/// all count as breaks) and the event ends with a single blank line.
pub fn format_event(id: Option<u64>, event: &str, data: &str) -> String {
    let mut frame = String::with_capacity(data.len() + event.len() + 32);

    if let Some(id) = id {
        let _ = writeln!(frame, "id: {}", id);
    }
    let _ = writeln!(frame, "event: {}", event);

    let normalized = data.replace("\r\n", "\n").replace('\r', "\n");
    for segment in normalized.split('\n') {
        let _ = writeln!(frame, "data: {}", segment);
    }

    frame.push('\n');
    frame
}

/// One open SSE stream bound to a session.
///
/// Frames are pushed through a bounded channel that feeds the HTTP response
/// body. Once the connection is closed, either explicitly or because the
/// client went away, every further send is a no-op.
pub struct SseConnection {
    session_id: String,
    sender: mpsc::Sender<Bytes>,
    open: AtomicBool,
    numbered: Mutex<()>,
    cancel: CancellationToken,
    metrics: Arc<Metrics>,
}

impl SseConnection {
    /// Create a connection and the body stream that drains it.
    ///
    /// The stream ends as soon as `cancel` fires.
    pub fn new(
        session_id: impl Into<String>,
        cancel: CancellationToken,
        metrics: Arc<Metrics>,
    ) -> (Arc<Self>, SseStream) {
        let (sender, receiver) = mpsc::channel(CHANNEL_CAPACITY);

        let stream = ReceiverStream::new(receiver)
            .map(Ok::<_, Infallible>)
            .take_until(cancel.clone().cancelled_owned())
            .boxed();

        let connection = Arc::new(Self {
            session_id: session_id.into(),
            sender,
            open: AtomicBool::new(true),
            numbered: Mutex::new(()),
            cancel,
            metrics,
        });

        (connection, stream)
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Send one event. Returns `false` if the connection is (now) closed.
    pub async fn send_event(&self, event: &str, data: &str, id: Option<u64>) -> bool {
        if !self.is_open() {
            return false;
        }

        let frame = Bytes::from(format_event(id, event, data));
        let sent = tokio::select! {
            _ = self.cancel.cancelled() => false,
            result = self.sender.send(frame) => result.is_ok(),
        };
        self.record_send(sent, event, id)
    }

    /// Send an event whose id is drawn from `next_id` only once this
    /// connection is free to enqueue it. Ids on one stream never go backwards.
    pub async fn send_numbered(
        &self,
        event: &str,
        data: &str,
        next_id: impl FnOnce() -> u64,
    ) -> bool {
        let _turn = self.numbered.lock().await;
        self.send_event(event, data, Some(next_id())).await
    }

    /// Enqueue an event without waiting. Fails if the buffer is full or the
    /// connection is closed.
    pub fn try_send_event(&self, event: &str, data: &str, id: Option<u64>) -> bool {
        if !self.is_open() {
            return false;
        }

        let frame = Bytes::from(format_event(id, event, data));
        let sent = self.sender.try_send(frame).is_ok();
        self.record_send(sent, event, id)
    }

    fn record_send(&self, sent: bool, event: &str, id: Option<u64>) -> bool {
        if sent {
            trace!("SSE {} -> {} event (id {:?})", self.session_id, event, id);
            self.metrics.inc_sse_events();
        } else {
            debug!("SSE write failed for session {}, closing", self.session_id);
            self.close();
        }
        sent
    }

    /// Emit keep-alive pings every `interval` until the connection is
    /// cancelled, the client disconnects, or a write fails.
    pub async fn keep_alive(&self, interval: Duration) {
        while self.is_open() {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = self.sender.closed() => {
                    debug!("Client disconnected from session {}", self.session_id);
                    break;
                }
                _ = tokio::time::sleep(interval) => {
                    if !self.send_event(PING_EVENT, KEEP_ALIVE_DATA, None).await {
                        break;
                    }
                }
            }
        }
        self.close();
    }

    /// Close the connection and end its body stream. Idempotent.
    pub fn close(&self) {
        if self.open.swap(false, Ordering::AcqRel) {
            debug!("SSE connection {} closed", self.session_id);
        }
        self.cancel.cancel();
    }
}
