//! Streamable HTTP transport for MCP.
//!
//! A single endpoint accepts JSON-RPC messages over `POST` and opens
//! Server-Sent-Events streams over `GET` (or over `POST` when the client
//! accepts `text/event-stream`). Open streams are tracked by
//! [`session::SessionManager`].

pub mod session;
pub mod sse;

use async_trait::async_trait;
use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, get},
    Json, Router,
};
use std::any::Any;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

use crate::config::{is_loopback_host, Config};
use crate::error::{Error, Result};
use crate::mcp::protocol::is_request;
use crate::mcp::server::{panic_message, McpServer};
use crate::mcp::transport::Transport;
use crate::metrics::Metrics;

use self::session::SessionManager;

/// Header carrying the session id.
pub const SESSION_HEADER: &str = "mcp-session-id";

/// Header a reconnecting client uses to name the last event it saw.
pub const LAST_EVENT_ID_HEADER: &str = "last-event-id";

const ALLOWED_METHODS: &str = "GET, POST, OPTIONS";
const ALLOWED_HEADERS: &str = "Content-Type, Accept, Origin, Mcp-Session-Id, Last-Event-ID";
const EVENT_STREAM: &str = "text/event-stream";

/// Which `Origin` values are accepted.
///
/// This is a coarse DNS-rebinding guard, not an access-control mechanism.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OriginPolicy {
    /// Only browser origins on localhost / 127.0.0.1.
    LoopbackOnly,
    /// Any origin.
    AllowAll,
}

impl OriginPolicy {
    /// Policy for a server bound to `host`.
    pub fn for_host(host: &str) -> Self {
        if is_loopback_host(host) {
            Self::LoopbackOnly
        } else {
            Self::AllowAll
        }
    }

    pub fn allows(&self, origin: &str) -> bool {
        match self {
            Self::AllowAll => true,
            Self::LoopbackOnly => [
                "http://localhost",
                "https://localhost",
                "http://127.0.0.1",
                "https://127.0.0.1",
            ]
            .iter()
            .any(|prefix| origin.starts_with(prefix)),
        }
    }
}

/// Shared state of the HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    server: Arc<McpServer>,
    sessions: Arc<SessionManager>,
    origin_policy: OriginPolicy,
    metrics: Arc<Metrics>,
}

/// HTTP/SSE transport.
pub struct HttpTransport {
    config: Config,
    sessions: Arc<SessionManager>,
    shutdown: CancellationToken,
    metrics: Arc<Metrics>,
}

impl HttpTransport {
    pub fn new(config: &Config, metrics: Arc<Metrics>) -> Self {
        Self {
            config: config.clone(),
            sessions: Arc::new(SessionManager::new(config.keep_alive(), metrics.clone())),
            shutdown: CancellationToken::new(),
            metrics,
        }
    }

    /// The session table backing this transport.
    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    /// Build the axum router serving `server`.
    pub fn router(&self, server: Arc<McpServer>) -> Router {
        let state = HttpState {
            server,
            sessions: self.sessions.clone(),
            origin_policy: OriginPolicy::for_host(&self.config.host),
            metrics: self.metrics.clone(),
        };

        let path = self.config.path.as_str();
        let mut router = Router::new().route(path, any(handle_mcp));
        if path != "/health" {
            router = router.route("/health", get(health_check));
        }
        if path != "/metrics" {
            router = router.route("/metrics", get(metrics_handler));
        }

        router
            .layer(
                ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    .layer(CatchPanicLayer::custom(panic_response)),
            )
            .with_state(state)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn serve(&self, server: Arc<McpServer>) -> Result<()> {
        let addr = self.config.bind_address();
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| Error::HttpServer(format!("failed to bind {}: {}", addr, e)))?;

        info!(
            "Streamable HTTP transport listening on http://{}{}",
            addr, self.config.path
        );

        let app = self.router(server);
        axum::serve(listener, app)
            .with_graceful_shutdown(self.shutdown.clone().cancelled_owned())
            .await?;

        self.sessions.close_all();
        info!("HTTP transport stopped");
        Ok(())
    }

    fn stop(&self) {
        self.shutdown.cancel();
        self.sessions.close_all();
    }
}

// ===== Handlers =====

/// Single MCP endpoint.
async fn handle_mcp(
    State(state): State<HttpState>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Some(origin) = headers.get(header::ORIGIN) {
        let allowed = match origin.to_str() {
            Ok(origin) => origin.is_empty() || state.origin_policy.allows(origin),
            Err(_) => false,
        };
        if !allowed {
            warn!("Rejected request from origin {:?}", origin);
            return StatusCode::FORBIDDEN.into_response();
        }
    }

    let response = match method {
        Method::OPTIONS => preflight(),
        Method::POST => handle_post(&state, &headers, body).await,
        Method::GET => handle_get(&state, &headers),
        _ => (
            StatusCode::METHOD_NOT_ALLOWED,
            [(header::ALLOW, ALLOWED_METHODS)],
        )
            .into_response(),
    };

    with_cors(response)
}

fn preflight() -> Response {
    (
        StatusCode::OK,
        [
            (header::ACCESS_CONTROL_ALLOW_METHODS, ALLOWED_METHODS),
            (header::ACCESS_CONTROL_ALLOW_HEADERS, ALLOWED_HEADERS),
        ],
    )
        .into_response()
}

async fn handle_post(state: &HttpState, headers: &HeaderMap, body: Bytes) -> Response {
    let Ok(text) = std::str::from_utf8(&body) else {
        debug!("Rejected POST body that is not valid UTF-8");
        return (StatusCode::BAD_REQUEST, "Request body must be UTF-8").into_response();
    };
    if text.trim().is_empty() {
        return (StatusCode::BAD_REQUEST, "Request body is empty").into_response();
    }

    let session_id = header_str(headers, SESSION_HEADER).map(String::from);
    let reply = state.server.handle_message(text).await;

    if accepts_event_stream(headers) && is_request(text) {
        return sse_response(state, session_id, reply);
    }

    (
        StatusCode::ACCEPTED,
        [(header::CONTENT_TYPE, "application/json")],
        reply.unwrap_or_default(),
    )
        .into_response()
}

fn handle_get(state: &HttpState, headers: &HeaderMap) -> Response {
    let session_id = header_str(headers, SESSION_HEADER).map(String::from);
    if let Some(last_event_id) = header_str(headers, LAST_EVENT_ID_HEADER) {
        // Replay is not supported; the stream starts fresh.
        debug!("Client resumed after event {}", last_event_id);
    }
    sse_response(state, session_id, None)
}

fn sse_response(state: &HttpState, session_id: Option<String>, initial: Option<String>) -> Response {
    let (session_id, stream) = state.sessions.open_stream(session_id, initial);

    let mut response = Response::new(Body::from_stream(stream));
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(EVENT_STREAM));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    if let Ok(value) = HeaderValue::from_str(&session_id) {
        headers.insert(SESSION_HEADER, value);
    }
    response
}

/// Health check endpoint.
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": crate::VERSION
    }))
}

/// Prometheus metrics endpoint.
async fn metrics_handler(State(state): State<HttpState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.to_prometheus(),
    )
}

// ===== Helpers =====

fn with_cors(mut response: Response) -> Response {
    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
        HeaderValue::from_static("false"),
    );
    headers.insert(
        header::ACCESS_CONTROL_EXPOSE_HEADERS,
        HeaderValue::from_static("Mcp-Session-Id"),
    );
    response
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn accepts_event_stream(headers: &HeaderMap) -> bool {
    headers
        .get_all(header::ACCEPT)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| v.contains(EVENT_STREAM))
}

fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let message = panic_message(err.as_ref());
    error!("HTTP handler panicked: {}", message);
    Error::Internal(message).into_response()
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": self.to_string() })),
        )
            .into_response()
    }
}
