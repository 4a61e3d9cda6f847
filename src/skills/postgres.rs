// ABOUTME: Postgres skill - read-only SQL through the reference Postgres MCP server.
// ABOUTME: Spawns the server over stdio with the connection string as its argument.

use serde_json::json;

use super::json_or_text;
use crate::config::{SessionConfig, Settings};
use crate::error::{McpError, McpResult};
use crate::session::Session;

const DATABASE_URL: &str = "DATABASE_URL";

/// Queries a Postgres database through an MCP server.
pub struct PostgresSkill {
    session: Session,
}

impl PostgresSkill {
    pub fn config(settings: &Settings) -> McpResult<SessionConfig> {
        let url = settings.require(DATABASE_URL)?;
        Ok(SessionConfig::stdio(
            "postgres",
            "npx",
            ["-y", "@modelcontextprotocol/server-postgres", url],
        ))
    }

    pub async fn open(settings: &Settings) -> McpResult<Self> {
        let session = Session::open(Self::config(settings)?).await?;
        Ok(Self::from_session(session))
    }

    pub fn from_session(session: Session) -> Self {
        Self { session }
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    pub async fn close(&mut self) -> McpResult<()> {
        self.session.close().await
    }

    /// Run a query and return its rows as JSON objects.
    pub async fn query(&mut self, sql: &str) -> McpResult<Vec<serde_json::Value>> {
        let result = self.session.call_tool("query", json!({ "sql": sql })).await?;
        match json_or_text(&result) {
            serde_json::Value::Array(rows) => Ok(rows),
            other => Err(McpError::Protocol(format!(
                "query returned something other than rows: {}",
                other
            ))),
        }
    }
}
