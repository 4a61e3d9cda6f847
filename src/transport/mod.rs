// ABOUTME: Transport abstraction for MCP communication.
// ABOUTME: Line-oriented send/receive over a subprocess or HTTP endpoint.

mod http;
mod stdio;

pub use http::HttpTransport;
pub use stdio::StdioTransport;

use async_trait::async_trait;

use crate::config::{SessionConfig, TransportConfig};
use crate::error::McpResult;

/// A channel carrying one JSON-RPC message per line.
///
/// Sessions drive exactly one request at a time, so implementations need no
/// internal locking: every method takes `&mut self`.
#[async_trait]
pub trait Transport: Send {
    /// Send one encoded message.
    async fn send(&mut self, line: &str) -> McpResult<()>;

    /// Receive the next message from the server. Waits until one arrives.
    async fn receive(&mut self) -> McpResult<String>;

    /// Release the channel. Must be safe to call more than once.
    async fn close(&mut self) -> McpResult<()>;

    /// Short human-readable description for logs.
    fn describe(&self) -> String;
}

/// Open the transport described by a (validated) session config.
pub async fn connect(config: &SessionConfig) -> McpResult<Box<dyn Transport>> {
    let transport: Box<dyn Transport> = match &config.transport {
        TransportConfig::Stdio { command, args, env } => {
            Box::new(StdioTransport::connect(command, args, env).await?)
        }
        TransportConfig::Http {
            url,
            bearer_token,
            headers,
        } => Box::new(
            HttpTransport::connect(url, bearer_token.as_deref(), headers, config.request_timeout)
                .await?,
        ),
    };
    Ok(transport)
}
