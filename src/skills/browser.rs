// ABOUTME: Browser skill - drives Chrome through the Chrome DevTools MCP server.
// ABOUTME: Navigation, screenshots, snapshots, script evaluation and console access.

use serde_json::json;

use super::json_or_text;
use crate::config::{SessionConfig, Settings};
use crate::error::{McpError, McpResult};
use crate::session::Session;

/// A captured screenshot.
#[derive(Debug, Clone, PartialEq)]
pub struct Screenshot {
    /// Base64-encoded image bytes.
    pub data: String,
    pub mime_type: String,
}

/// Browser automation over MCP.
pub struct BrowserSkill {
    session: Session,
}

impl BrowserSkill {
    /// `CHROME_DEVTOOLS_HEADLESS=true` runs headless; `CHROME_DEVTOOLS_BROWSER_URL`
    /// attaches to an already running Chrome instead of launching one.
    pub fn config(settings: &Settings) -> McpResult<SessionConfig> {
        let mut args = vec!["-y".to_string(), "chrome-devtools-mcp@latest".to_string()];
        if settings
            .get("CHROME_DEVTOOLS_HEADLESS")
            .is_some_and(|v| matches!(v, "1" | "true" | "yes"))
        {
            args.push("--headless".to_string());
        }
        if let Some(url) = settings.get("CHROME_DEVTOOLS_BROWSER_URL") {
            args.push("--browserUrl".to_string());
            args.push(url.to_string());
        }
        Ok(SessionConfig::stdio("browser", "npx", args))
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

    pub async fn navigate(&mut self, url: &str) -> McpResult<String> {
        let result = self
            .session
            .call_tool("navigate_page", json!({ "url": url }))
            .await?;
        Ok(result.text())
    }

    pub async fn screenshot(&mut self, full_page: bool) -> McpResult<Screenshot> {
        let result = self
            .session
            .call_tool(
                "take_screenshot",
                json!({ "fullPage": full_page, "format": "png" }),
            )
            .await?;
        let (data, mime_type) = result.first_image().ok_or_else(|| {
            McpError::Protocol("take_screenshot returned no image content".into())
        })?;
        Ok(Screenshot {
            data: data.to_string(),
            mime_type: mime_type.to_string(),
        })
    }

    /// Text snapshot of the page's accessibility tree, with element uids.
    pub async fn snapshot(&mut self) -> McpResult<String> {
        let result = self.session.call_tool("take_snapshot", json!({})).await?;
        Ok(result.text())
    }

    /// Evaluate a JavaScript function declaration in the page, e.g. `() => document.title`.
    pub async fn evaluate(&mut self, function: &str) -> McpResult<serde_json::Value> {
        let result = self
            .session
            .call_tool("evaluate_script", json!({ "function": function }))
            .await?;
        Ok(json_or_text(&result))
    }

    pub async fn console_messages(&mut self) -> McpResult<String> {
        let result = self
            .session
            .call_tool("list_console_messages", json!({}))
            .await?;
        Ok(result.text())
    }

    /// Click the element with `uid` from the latest snapshot.
    pub async fn click(&mut self, uid: &str) -> McpResult<String> {
        let result = self.session.call_tool("click", json!({ "uid": uid })).await?;
        Ok(result.text())
    }
}
