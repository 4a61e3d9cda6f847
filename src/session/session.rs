// ABOUTME: Session - one live connection to an MCP server, from handshake to close.
// ABOUTME: Drives strictly sequential request/response exchanges with a bounded wait.

use std::fmt;

use futures::future::BoxFuture;
use serde_json::json;

use super::ToolCatalog;
use crate::config::SessionConfig;
use crate::error::{McpError, McpResult};
use crate::protocol::{
    Codec, INVALID_PARAMS, Implementation, Incoming, InitializeParams, InitializeResult,
    JsonRpcError, JsonRpcNotification, JsonRpcResponse, METHOD_NOT_FOUND, ServerCapabilities,
    ServerRequest, ToolCallParams, ToolCallResult, ToolsListResult, is_supported_version,
};
use crate::transport::{self, Transport};

/// Lifecycle of a session. A session that was never opened is just a
/// [`SessionConfig`]; any state may move to `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Transport is up, handshake not done yet.
    Opening,
    /// Handshake done, tools not yet discovered or used.
    Initialized,
    /// Tools discovered or already in use. Stays here across calls.
    Ready,
    Closed,
}

/// One live connection to an MCP server.
///
/// Methods take `&mut self`, so a session can only ever have one request in
/// flight. Open several sessions for concurrent calls.
pub struct Session {
    config: SessionConfig,
    transport: Box<dyn Transport>,
    codec: Codec,
    state: SessionState,
    unusable: Option<String>,
    init: Option<InitializeResult>,
    catalog: Option<ToolCatalog>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("name", &self.config.name)
            .field("state", &self.state)
            .field("transport", &self.transport.describe())
            .field("unusable", &self.unusable)
            .finish()
    }
}

impl Session {
    /// Validate the config and open its transport. No handshake yet.
    pub async fn connect(config: SessionConfig) -> McpResult<Self> {
        config.validate()?;
        let transport = transport::connect(&config).await?;
        Self::with_transport(config, transport)
    }

    /// Wrap an already-open transport.
    pub fn with_transport(config: SessionConfig, transport: Box<dyn Transport>) -> McpResult<Self> {
        config.validate()?;
        tracing::info!(server = %config.name, transport = %transport.describe(), "session opened");
        Ok(Self {
            config,
            transport,
            codec: Codec::new(),
            state: SessionState::Opening,
            unusable: None,
            init: None,
            catalog: None,
        })
    }

    /// Connect and run the handshake. The transport is released if the
    /// handshake fails.
    pub async fn open(config: SessionConfig) -> McpResult<Self> {
        let mut session = Self::connect(config).await?;
        let handshake = session.initialize().await.map(|_| ());
        match handshake {
            Ok(()) => Ok(session),
            Err(e) => {
                if let Err(close_err) = session.close().await {
                    tracing::warn!(server = %session.name(), error = %close_err, "close after failed handshake");
                }
                Err(e)
            }
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Protocol version agreed during the handshake.
    pub fn protocol_version(&self) -> Option<&str> {
        self.init.as_ref().map(|i| i.protocol_version.as_str())
    }

    pub fn server_info(&self) -> Option<&Implementation> {
        self.init.as_ref().and_then(|i| i.server_info.as_ref())
    }

    pub fn capabilities(&self) -> Option<&ServerCapabilities> {
        self.init.as_ref().map(|i| &i.capabilities)
    }

    /// Usage instructions the server sent with its handshake, if any.
    pub fn instructions(&self) -> Option<&str> {
        self.init.as_ref().and_then(|i| i.instructions.as_deref())
    }

    /// The discovered tools, once `discover_tools` has run.
    pub fn catalog(&self) -> Option<&ToolCatalog> {
        self.catalog.as_ref()
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Run the `initialize` handshake. Calling it again returns the cached result.
    pub async fn initialize(&mut self) -> McpResult<&InitializeResult> {
        if self.init.is_none() {
            let init = self.handshake().await?;
            self.init = Some(init);
            self.state = SessionState::Initialized;
        }
        self.init
            .as_ref()
            .ok_or_else(|| McpError::Protocol("handshake produced no result".into()))
    }

    async fn handshake(&mut self) -> McpResult<InitializeResult> {
        let params = InitializeParams {
            protocol_version: self.config.protocol_version.clone(),
            capabilities: json!({}),
            client_info: Implementation {
                name: self.config.client_name.clone(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        };

        let result = self
            .request("initialize", Some(serde_json::to_value(params)?))
            .await?
            .map_err(rpc_error)?;
        let init: InitializeResult = serde_json::from_value(result)
            .map_err(|e| McpError::Protocol(format!("malformed initialize result: {}", e)))?;

        if !is_supported_version(&init.protocol_version) {
            return Err(McpError::ProtocolVersion {
                requested: self.config.protocol_version.clone(),
                offered: init.protocol_version,
            });
        }

        self.notify("notifications/initialized", None).await?;

        tracing::info!(
            server = %self.config.name,
            protocol = %init.protocol_version,
            server_name = init.server_info.as_ref().map(|s| s.name.as_str()).unwrap_or("unknown"),
            "session initialized"
        );
        Ok(init)
    }

    /// Close the session. Safe to call any number of times, on any path.
    pub async fn close(&mut self) -> McpResult<()> {
        if self.state == SessionState::Closed {
            return Ok(());
        }
        self.state = SessionState::Closed;
        let result = self.transport.close().await;
        tracing::info!(server = %self.config.name, "session closed");
        result
    }

    /// Run `f` against this session, then close it whatever `f` returned.
    ///
    /// The closure's error wins over a close error.
    pub async fn run<T, F>(mut self, f: F) -> McpResult<T>
    where
        F: for<'s> FnOnce(&'s mut Session) -> BoxFuture<'s, McpResult<T>>,
    {
        let outcome = f(&mut self).await;
        let closed = self.close().await;
        match (outcome, closed) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(e)) => Err(e),
            (Err(e), closed) => {
                if let Err(close_err) = closed {
                    tracing::warn!(server = %self.config.name, error = %close_err, "close failed");
                }
                Err(e)
            }
        }
    }

    // ========================================================================
    // Tools
    // ========================================================================

    /// Fetch the server's tool catalog once and cache it.
    ///
    /// A server without tool support yields an empty catalog rather than an
    /// error; calls by name still go through and the server judges them.
    pub async fn discover_tools(&mut self) -> McpResult<&ToolCatalog> {
        self.ensure_initialized()?;

        if self.catalog.is_none() {
            let catalog = self.fetch_catalog().await?;
            tracing::debug!(server = %self.config.name, tools = catalog.len(), "tools discovered");
            self.catalog = Some(catalog);
            self.state = SessionState::Ready;
        }

        self.catalog
            .as_ref()
            .ok_or_else(|| McpError::Protocol("tool discovery produced no catalog".into()))
    }

    async fn fetch_catalog(&mut self) -> McpResult<ToolCatalog> {
        let advertised = self
            .capabilities()
            .is_some_and(|caps| caps.tools.is_some());
        if !advertised {
            tracing::warn!(server = %self.config.name, "server does not advertise tools; catalog left empty");
            return Ok(ToolCatalog::default());
        }

        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let params = cursor.take().map(|c| json!({ "cursor": c }));
            let page = match self.request("tools/list", params).await? {
                Ok(value) => value,
                Err(e) if e.code == METHOD_NOT_FOUND => {
                    tracing::warn!(server = %self.config.name, "tools/list unsupported; catalog left empty");
                    return Ok(ToolCatalog::default());
                }
                Err(e) => return Err(rpc_error(e)),
            };
            let page: ToolsListResult = serde_json::from_value(page)
                .map_err(|e| McpError::Protocol(format!("malformed tools/list result: {}", e)))?;
            tools.extend(page.tools);
            match page.next_cursor {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => break,
            }
        }

        Ok(ToolCatalog::from_descriptors(tools))
    }

    /// Invoke a tool and wait for its result.
    ///
    /// Arguments are not checked against the tool's schema; the server is the
    /// judge of those. A name missing from a non-empty catalog fails locally.
    pub async fn call_tool(
        &mut self,
        name: &str,
        arguments: serde_json::Value,
    ) -> McpResult<ToolCallResult> {
        self.ensure_initialized()?;

        if let Some(catalog) = &self.catalog {
            if !catalog.is_empty() && !catalog.contains(name) {
                return Err(McpError::ToolNotFound(format!(
                    "'{}' is not offered by {}",
                    name, self.config.name
                )));
            }
        }

        let params = ToolCallParams {
            name: name.to_string(),
            arguments,
        };
        let value = self
            .request("tools/call", Some(serde_json::to_value(params)?))
            .await?
            .map_err(|e| tool_error(name, e))?;
        self.state = SessionState::Ready;

        let result: ToolCallResult = serde_json::from_value(value)
            .map_err(|e| McpError::Protocol(format!("malformed tools/call result: {}", e)))?;

        if result.is_error {
            let text = result.text();
            return Err(McpError::ToolExecution {
                tool: name.to_string(),
                message: if text.is_empty() {
                    "tool reported an error".to_string()
                } else {
                    text
                },
            });
        }

        Ok(result)
    }

    /// Check the server is responsive.
    pub async fn ping(&mut self) -> McpResult<()> {
        self.ensure_initialized()?;
        self.request("ping", None).await?.map_err(rpc_error)?;
        Ok(())
    }

    // ========================================================================
    // Exchange
    // ========================================================================

    fn ensure_usable(&self) -> McpResult<()> {
        if self.state == SessionState::Closed {
            return Err(McpError::Transport(format!(
                "session {} is closed",
                self.config.name
            )));
        }
        if let Some(reason) = &self.unusable {
            return Err(McpError::Transport(format!(
                "session {} is unusable after an earlier failure ({}); close and reopen it",
                self.config.name, reason
            )));
        }
        Ok(())
    }

    fn ensure_initialized(&self) -> McpResult<()> {
        self.ensure_usable()?;
        if self.state == SessionState::Opening {
            return Err(McpError::Protocol(format!(
                "session {} has not completed its handshake",
                self.config.name
            )));
        }
        Ok(())
    }

    /// Send one request and wait, within the configured bound, for its answer.
    ///
    /// Any failure of the exchange itself marks the session unusable, since the
    /// stream may now hold a stray reply.
    async fn request(
        &mut self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> McpResult<Result<serde_json::Value, JsonRpcError>> {
        self.ensure_usable()?;

        let limit = self.config.request_timeout;
        let outcome = match tokio::time::timeout(limit, self.exchange(method, params)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(McpError::Timeout(limit)),
        };

        if let Err(e) = &outcome {
            tracing::warn!(server = %self.config.name, method, error = %e, "exchange failed");
            self.unusable = Some(e.to_string());
        }
        outcome
    }

    async fn exchange(
        &mut self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> McpResult<Result<serde_json::Value, JsonRpcError>> {
        let (id, line) = self.codec.encode(method, params)?;
        tracing::debug!(server = %self.config.name, id, method, "request");
        tracing::trace!(server = %self.config.name, %line, "send");
        self.transport.send(&line).await?;

        loop {
            let raw = self.transport.receive().await?;
            if raw.trim().is_empty() {
                continue;
            }
            tracing::trace!(server = %self.config.name, line = %raw, "receive");

            match self.codec.decode(&raw)? {
                Incoming::Response(response) => return self.codec.correlate(response),
                Incoming::Notification(notification) => self.log_notification(&notification),
                Incoming::Request(request) => self.answer(request).await?,
            }
        }
    }

    async fn notify(&mut self, method: &str, params: Option<serde_json::Value>) -> McpResult<()> {
        self.ensure_usable()?;
        let line = self.codec.encode_notification(method, params)?;
        self.transport.send(&line).await
    }

    /// Reply to a request the server sent us while we wait for our own answer.
    async fn answer(&mut self, request: ServerRequest) -> McpResult<()> {
        let reply = match request.method.as_str() {
            "ping" => JsonRpcResponse::success(request.id, json!({})),
            other => {
                tracing::debug!(server = %self.config.name, method = other, "declining server request");
                JsonRpcResponse::failure(request.id, METHOD_NOT_FOUND, format!("method not supported: {}", other))
            }
        };
        let line = self.codec.encode_reply(&reply)?;
        self.transport.send(&line).await
    }

    fn log_notification(&self, notification: &JsonRpcNotification) {
        if notification.method != "notifications/message" {
            tracing::trace!(server = %self.config.name, method = %notification.method, "notification");
            return;
        }

        let params = notification.params.as_ref();
        let level = params
            .and_then(|p| p.get("level"))
            .and_then(|l| l.as_str())
            .unwrap_or("info");
        let data = params
            .and_then(|p| p.get("data"))
            .map(|d| d.to_string())
            .unwrap_or_default();

        match level {
            "error" | "critical" | "alert" | "emergency" => {
                tracing::warn!(server = %self.config.name, server_level = level, %data, "server log");
            }
            _ => tracing::debug!(server = %self.config.name, server_level = level, %data, "server log"),
        }
    }
}

/// Open a session, run `f`, and close the session on every exit path.
pub async fn with_session<T, F>(config: SessionConfig, f: F) -> McpResult<T>
where
    F: for<'s> FnOnce(&'s mut Session) -> BoxFuture<'s, McpResult<T>>,
{
    Session::open(config).await?.run(f).await
}

fn rpc_error(error: JsonRpcError) -> McpError {
    McpError::Rpc {
        code: error.code,
        message: error.message,
    }
}

/// Map a JSON-RPC error returned for `tools/call`.
fn tool_error(tool: &str, error: JsonRpcError) -> McpError {
    let unknown = error.code == METHOD_NOT_FOUND
        || (error.code == INVALID_PARAMS && mentions_unknown_tool(&error.message));
    if unknown {
        McpError::ToolNotFound(error.message)
    } else {
        McpError::ToolExecution {
            tool: tool.to_string(),
            message: format!("{} (code {})", error.message, error.code),
        }
    }
}

fn mentions_unknown_tool(message: &str) -> bool {
    let message = message.to_lowercase();
    message.contains("unknown tool") || (message.contains("tool") && message.contains("not found"))
}
