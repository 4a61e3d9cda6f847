// ABOUTME: Sentry skill - error investigation through Sentry's hosted MCP server.
// ABOUTME: Tools answer in markdown, so results are returned as text.

use serde_json::json;

use crate::config::{SessionConfig, Settings};
use crate::error::McpResult;
use crate::session::Session;

const DEFAULT_URL: &str = "https://mcp.sentry.dev/mcp";

pub struct SentrySkill {
    session: Session,
}

impl SentrySkill {
    pub fn config(settings: &Settings) -> McpResult<SessionConfig> {
        let token = settings.require("SENTRY_ACCESS_TOKEN")?;
        let url = settings.get("SENTRY_MCP_URL").unwrap_or(DEFAULT_URL);
        Ok(SessionConfig::http("sentry", url).bearer_token(token))
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

    pub async fn find_organizations(&mut self) -> McpResult<String> {
        let result = self
            .session
            .call_tool("find_organizations", json!({}))
            .await?;
        Ok(result.text())
    }

    /// Search issues in plain language, e.g. "unresolved errors in checkout from today".
    pub async fn search_issues(&mut self, organization: &str, query: &str) -> McpResult<String> {
        let result = self
            .session
            .call_tool(
                "search_issues",
                json!({ "organizationSlug": organization, "naturalLanguageQuery": query }),
            )
            .await?;
        Ok(result.text())
    }

    pub async fn get_issue_details(
        &mut self,
        organization: &str,
        issue_id: &str,
    ) -> McpResult<String> {
        let result = self
            .session
            .call_tool(
                "get_issue_details",
                json!({ "organizationSlug": organization, "issueId": issue_id }),
            )
            .await?;
        Ok(result.text())
    }
}
