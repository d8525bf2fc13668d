//! Built-in resources.

use async_trait::async_trait;
use chrono::{DateTime, Local, Utc};
use std::time::Instant;

use crate::error::Result;
use crate::mcp::handler::ResourceHandler;
use crate::mcp::protocol::Resource;
use crate::{SERVER_NAME, VERSION};

/// Format of `time://current`.
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Current local date and time.
pub struct CurrentTimeResource;

impl CurrentTimeResource {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CurrentTimeResource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResourceHandler for CurrentTimeResource {
    fn definition(&self) -> Resource {
        Resource {
            uri: "time://current".to_string(),
            name: "Current Time".to_string(),
            description: "Current date and time".to_string(),
            mime_type: "text/plain".to_string(),
        }
    }

    async fn read(&self) -> Result<String> {
        Ok(Local::now().format(TIME_FORMAT).to_string())
    }
}

/// Server identity and uptime.
pub struct ServerStatusResource {
    started: Instant,
    started_at: DateTime<Utc>,
}

impl ServerStatusResource {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            started_at: Utc::now(),
        }
    }
}

impl Default for ServerStatusResource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResourceHandler for ServerStatusResource {
    fn definition(&self) -> Resource {
        Resource {
            uri: "server://status".to_string(),
            name: "Server Status".to_string(),
            description: "Server name, version and uptime".to_string(),
            mime_type: "application/json".to_string(),
        }
    }

    async fn read(&self) -> Result<String> {
        let status = serde_json::json!({
            "name": SERVER_NAME,
            "version": VERSION,
            "started_at": self.started_at.to_rfc3339(),
            "uptime_seconds": self.started.elapsed().as_secs(),
        });
        Ok(serde_json::to_string_pretty(&status)?)
    }
}
