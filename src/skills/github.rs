// ABOUTME: GitHub skill - issue tracking through GitHub's hosted MCP server.
// ABOUTME: Authenticates with a personal access token over HTTP.

use serde_json::json;

use super::json_or_text;
use crate::config::{SessionConfig, Settings};
use crate::error::McpResult;
use crate::session::Session;

const DEFAULT_URL: &str = "https://api.githubcopilot.com/mcp/";
const TOKEN: &str = "GITHUB_PERSONAL_ACCESS_TOKEN";

/// Issue operations against GitHub over MCP.
pub struct GithubSkill {
    session: Session,
}

impl GithubSkill {
    /// Uses `GITHUB_PERSONAL_ACCESS_TOKEN`, falling back to `GITHUB_TOKEN`.
    /// `GITHUB_MCP_URL` overrides the endpoint.
    pub fn config(settings: &Settings) -> McpResult<SessionConfig> {
        let token = match settings.get("GITHUB_TOKEN") {
            Some(fallback) if settings.get(TOKEN).is_none() => fallback,
            _ => settings.require(TOKEN)?,
        };
        let url = settings.get("GITHUB_MCP_URL").unwrap_or(DEFAULT_URL);
        Ok(SessionConfig::http("github", url).bearer_token(token))
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

    pub async fn get_issue(
        &mut self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> McpResult<serde_json::Value> {
        let result = self
            .session
            .call_tool(
                "get_issue",
                json!({ "owner": owner, "repo": repo, "issue_number": number }),
            )
            .await?;
        Ok(json_or_text(&result))
    }

    /// List issues, optionally filtered by state (`OPEN`, `CLOSED`).
    pub async fn list_issues(
        &mut self,
        owner: &str,
        repo: &str,
        state: Option<&str>,
    ) -> McpResult<serde_json::Value> {
        let mut arguments = json!({ "owner": owner, "repo": repo });
        if let Some(state) = state {
            arguments["state"] = json!(state.to_uppercase());
        }
        let result = self.session.call_tool("list_issues", arguments).await?;
        Ok(json_or_text(&result))
    }

    pub async fn create_issue(
        &mut self,
        owner: &str,
        repo: &str,
        title: &str,
        body: &str,
    ) -> McpResult<serde_json::Value> {
        let result = self
            .session
            .call_tool(
                "create_issue",
                json!({ "owner": owner, "repo": repo, "title": title, "body": body }),
            )
            .await?;
        Ok(json_or_text(&result))
    }

    /// Search with GitHub issue search syntax, e.g. `repo:o/r is:open label:bug`.
    pub async fn search_issues(&mut self, query: &str) -> McpResult<serde_json::Value> {
        let result = self
            .session
            .call_tool("search_issues", json!({ "query": query }))
            .await?;
        Ok(json_or_text(&result))
    }
}
