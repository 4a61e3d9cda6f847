// ABOUTME: Root module for mcp-skills - a small MCP client with skill facades.
// ABOUTME: Re-exports the session, configuration, and error types.

pub mod config;
pub mod error;
pub mod prelude;
pub mod protocol;
pub mod session;
pub mod skills;
pub mod transport;

pub use config::{EnvSource, SessionConfig, Settings, TransportConfig};
pub use error::{McpError, McpResult};
pub use session::{Session, SessionState, ToolCatalog, with_session};
