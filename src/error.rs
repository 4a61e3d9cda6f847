// ABOUTME: Defines the error taxonomy for MCP sessions using thiserror.
// ABOUTME: Every failure a caller can see is a variant of McpError.

use std::time::Duration;

/// Errors from MCP session operations.
#[derive(Debug, thiserror::Error)]
pub enum McpError {
    /// Bad or missing setup, detected before any I/O.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The server subprocess could not be started.
    #[error("Failed to launch server: {0}")]
    Launch(String),

    /// The HTTP endpoint could not be reached.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Malformed or out-of-sequence JSON-RPC traffic.
    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Incompatible protocol version: requested {requested}, server offered {offered}")]
    ProtocolVersion { requested: String, offered: String },

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Tool '{tool}' failed: {message}")]
    ToolExecution { tool: String, message: String },

    #[error("No response within {0:?}")]
    Timeout(Duration),

    /// The channel died mid-session.
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("RPC error ({code}): {message}")]
    Rpc { code: i64, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for MCP operations.
pub type McpResult<T> = Result<T, McpError>;
