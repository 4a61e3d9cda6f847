// ABOUTME: Prelude module - convenient imports for common use cases.
// ABOUTME: Use `use mcp_skills::prelude::*;` to get started quickly.

pub use crate::config::{
    DEFAULT_REQUEST_TIMEOUT, EnvSource, SessionConfig, Settings, TransportConfig,
};
pub use crate::error::{McpError, McpResult};
pub use crate::protocol::{
    ContentBlock, Implementation, InitializeResult, ServerCapabilities, ToolCallResult,
    ToolDescriptor,
};
pub use crate::session::{Session, SessionState, ToolCatalog, with_session};
pub use crate::skills::{
    BrowserSkill, GithubSkill, PostgresSkill, Screenshot, SentrySkill, SkillKind,
};
pub use crate::transport::Transport;
