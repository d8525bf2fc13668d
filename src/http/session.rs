//! Session table for open SSE streams.
//!
//! Each session id maps to at most one live [`SseConnection`]. Event ids are
//! drawn from a single counter shared by every session.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use crate::http::sse::{SseConnection, SseStream, DEFAULT_KEEP_ALIVE, MESSAGE_EVENT};
use crate::metrics::Metrics;

/// Tracks open SSE connections by session id.
pub struct SessionManager {
    connections: DashMap<String, Arc<SseConnection>>,
    event_ids: AtomicU64,
    keep_alive: Duration,
    shutdown: CancellationToken,
    metrics: Arc<Metrics>,
}

impl SessionManager {
    pub fn new(keep_alive: Duration, metrics: Arc<Metrics>) -> Self {
        Self {
            connections: DashMap::new(),
            event_ids: AtomicU64::new(0),
            keep_alive,
            shutdown: CancellationToken::new(),
            metrics,
        }
    }

    /// Next event id. Strictly increasing across all sessions.
    pub fn next_event_id(&self) -> u64 {
        self.event_ids.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Open an SSE stream for `session_id`, generating a fresh id when none
    /// is given.
    ///
    /// When `initial` is set it is delivered as the first `message` event.
    /// Keep-alive pings follow until the client goes away or the manager is
    /// shut down, after which the session entry is dropped. Returns the
    /// session id together with the response body stream.
    pub fn open_stream(
        self: &Arc<Self>,
        session_id: Option<String>,
        initial: Option<String>,
    ) -> (String, SseStream) {
        let session_id = session_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let (connection, stream) = SseConnection::new(
            session_id.clone(),
            self.shutdown.child_token(),
            self.metrics.clone(),
        );

        // Queued before the session is visible to pushes.
        if let Some(message) = initial {
            if !connection.try_send_event(MESSAGE_EVENT, &message, Some(self.next_event_id())) {
                debug!("Could not queue initial event for session {}", session_id);
            }
        }

        if let Some(previous) = self.connections.insert(session_id.clone(), connection.clone()) {
            debug!("Replacing existing SSE connection for session {}", session_id);
            previous.close();
        }
        self.update_gauge();
        info!("SSE session {} opened", session_id);

        let manager = Arc::clone(self);
        tokio::spawn(async move { manager.run_stream(connection).await });

        (session_id, stream)
    }

    async fn run_stream(self: Arc<Self>, connection: Arc<SseConnection>) {
        connection.keep_alive(self.keep_alive).await;

        let session_id = connection.session_id().to_string();
        if self
            .connections
            .remove_if(&session_id, |_, current| Arc::ptr_eq(current, &connection))
            .is_some()
        {
            info!("SSE session {} closed", session_id);
        }
        connection.close();
        self.update_gauge();
    }

    /// Push a server-initiated message to a live session.
    ///
    /// Returns `false` if the session is unknown or the write failed.
    pub async fn send_to_session(&self, session_id: &str, message: &str) -> bool {
        let Some(connection) = self.connections.get(session_id).map(|c| Arc::clone(c.value()))
        else {
            debug!("No SSE session {} to deliver to", session_id);
            return false;
        };

        connection
            .send_numbered(MESSAGE_EVENT, message, || self.next_event_id())
            .await
    }

    /// Close every tracked connection and forget them.
    pub fn close_all(&self) {
        self.shutdown.cancel();

        let sessions: Vec<Arc<SseConnection>> = self
            .connections
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        self.connections.clear();

        for connection in &sessions {
            connection.close();
        }
        self.update_gauge();

        if !sessions.is_empty() {
            info!("Closed {} SSE session(s)", sessions.len());
        }
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.connections.contains_key(session_id)
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    fn update_gauge(&self) {
        self.metrics.set_active_sessions(self.connections.len() as u64);
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new(DEFAULT_KEEP_ALIVE, Metrics::new())
    }
}
