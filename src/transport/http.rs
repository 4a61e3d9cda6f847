// ABOUTME: HTTP transport for MCP communication (Streamable HTTP).
// ABOUTME: POSTs each message and queues the JSON or SSE reply for receive().

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};

use super::Transport;
use crate::error::{McpError, McpResult};

const SESSION_HEADER: &str = "Mcp-Session-Id";

/// HTTP transport - one POST per message.
///
/// MCP Streamable HTTP transport uses:
/// - POST with JSON-RPC message body
/// - Either a JSON body or an SSE stream of JSON messages in reply
/// - `202 Accepted` with no body for notifications
pub struct HttpTransport {
    endpoint_url: String,
    http_client: reqwest::Client,
    headers: HeaderMap,
    timeout: Duration,
    session_id: Option<String>,
    inbox: VecDeque<String>,
    closed: bool,
}

impl HttpTransport {
    /// Prepare a client for an HTTP MCP server. No request is made yet.
    pub async fn connect(
        url: &str,
        bearer_token: Option<&str>,
        extra_headers: &HashMap<String, String>,
        timeout: Duration,
    ) -> McpResult<Self> {
        let _parsed = reqwest::Url::parse(url)
            .map_err(|e| McpError::Configuration(format!("Invalid URL: {}", e)))?;

        let mut headers = HeaderMap::new();
        if let Some(token) = bearer_token {
            let value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| McpError::Configuration("bearer token is not a valid header".into()))?;
            headers.insert(AUTHORIZATION, value);
        }
        for (key, value) in extra_headers {
            let name = HeaderName::from_bytes(key.as_bytes())
                .map_err(|_| McpError::Configuration(format!("invalid header name '{}'", key)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|_| McpError::Configuration(format!("invalid value for header '{}'", key)))?;
            headers.insert(name, value);
        }

        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(format!("mcp-skills/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| McpError::Connection(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            endpoint_url: url.to_string(),
            http_client,
            headers,
            timeout,
            session_id: None,
            inbox: VecDeque::new(),
            closed: false,
        })
    }

    /// Get the endpoint URL.
    pub fn endpoint_url(&self) -> &str {
        &self.endpoint_url
    }

    /// Session id issued by the server, once it has issued one.
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    fn map_send_error(&self, e: reqwest::Error) -> McpError {
        if e.is_timeout() {
            McpError::Timeout(self.timeout)
        } else if e.is_connect() {
            McpError::Connection(format!("{}: {}", self.endpoint_url, e))
        } else {
            McpError::Transport(format!("HTTP request failed: {}", e))
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&mut self, line: &str) -> McpResult<()> {
        if self.closed {
            return Err(McpError::Transport("HTTP transport closed".into()));
        }

        let mut req_builder = self
            .http_client
            .post(&self.endpoint_url)
            .headers(self.headers.clone())
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json, text/event-stream");

        // Add session ID header if present (for stateful servers)
        if let Some(session_id) = &self.session_id {
            req_builder = req_builder.header(SESSION_HEADER, session_id.clone());
        }

        let response = req_builder
            .body(line.to_string())
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        // Check for session ID in response (server may establish one)
        if let Some(session_id) = response.headers().get(SESSION_HEADER) {
            if let Ok(id) = session_id.to_str() {
                self.session_id = Some(id.to_string());
            }
        }

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(McpError::Transport(format!(
                "HTTP {} - {}",
                status.as_u16(),
                body.trim()
            )));
        }

        let is_sse = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("text/event-stream"));

        let body = response
            .text()
            .await
            .map_err(|e| self.map_send_error(e))?;

        // Only requests get answers. Anything sent back for a notification or
        // a reply would later be mistaken for the next request's response.
        if !expects_reply(line) {
            if !body.trim().is_empty() {
                tracing::debug!(url = %self.endpoint_url, "dropping body sent for a notification");
            }
            return Ok(());
        }

        if is_sse {
            self.inbox.extend(parse_sse_events(&body));
        } else if !body.trim().is_empty() {
            self.inbox.push_back(body.trim().to_string());
        }

        Ok(())
    }

    async fn receive(&mut self) -> McpResult<String> {
        self.inbox
            .pop_front()
            .ok_or_else(|| McpError::Transport("server sent no message in reply".into()))
    }

    async fn close(&mut self) -> McpResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.inbox.clear();

        // Tell a stateful server we are done. Failure here changes nothing for us.
        if let Some(session_id) = self.session_id.take() {
            let result = self
                .http_client
                .delete(&self.endpoint_url)
                .headers(self.headers.clone())
                .header(SESSION_HEADER, session_id)
                .send()
                .await;
            if let Err(e) = result {
                tracing::debug!(url = %self.endpoint_url, error = %e, "session delete failed");
            }
        }

        Ok(())
    }

    fn describe(&self) -> String {
        format!("http:{}", self.endpoint_url)
    }
}

/// True for a JSON-RPC request, the only message that gets a response.
fn expects_reply(line: &str) -> bool {
    serde_json::from_str::<serde_json::Value>(line)
        .is_ok_and(|v| v.get("method").is_some() && v.get("id").is_some_and(|id| !id.is_null()))
}

/// Extract the `data:` payload of each event in an SSE body.
fn parse_sse_events(body: &str) -> Vec<String> {
    let mut events = Vec::new();
    let mut data: Vec<&str> = Vec::new();

    for line in body.lines() {
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            if !data.is_empty() {
                events.push(data.join("\n"));
                data.clear();
            }
        } else if let Some(rest) = line.strip_prefix("data:") {
            data.push(rest.strip_prefix(' ').unwrap_or(rest));
        }
    }
    if !data.is_empty() {
        events.push(data.join("\n"));
    }

    events
}
