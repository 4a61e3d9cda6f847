// ABOUTME: In-memory transport and scripted MCP server for unit tests.
// ABOUTME: Records every line the client sends so tests can count requests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use super::Session;
use crate::config::SessionConfig;
use crate::error::McpResult;
use crate::transport::Transport;

type Responder = Box<dyn FnMut(&Value) -> Vec<String> + Send>;
type CallHandler = Box<dyn FnMut(&str, &Value) -> Result<Value, (i64, String)> + Send>;

/// What the client did to a mock transport.
#[derive(Clone, Default)]
pub(crate) struct MockLog {
    sent: Arc<Mutex<Vec<Value>>>,
    closes: Arc<AtomicUsize>,
}

impl MockLog {
    pub fn sent(&self) -> Vec<Value> {
        self.sent.lock().unwrap().clone()
    }

    /// Requests and notifications sent with this method.
    pub fn count(&self, method: &str) -> usize {
        self.sent()
            .iter()
            .filter(|m| m["method"] == method)
            .count()
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

/// Transport whose replies come from a closure. With nothing queued,
/// `receive` waits forever, like a hung server.
pub(crate) struct MockTransport {
    responder: Responder,
    queue: VecDeque<String>,
    log: MockLog,
}

impl MockTransport {
    pub fn new(responder: impl FnMut(&Value) -> Vec<String> + Send + 'static) -> (Self, MockLog) {
        let log = MockLog::default();
        let transport = Self {
            responder: Box::new(responder),
            queue: VecDeque::new(),
            log: log.clone(),
        };
        (transport, log)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&mut self, line: &str) -> McpResult<()> {
        let message: Value = serde_json::from_str(line)?;
        self.log.sent.lock().unwrap().push(message.clone());
        self.queue.extend((self.responder)(&message));
        Ok(())
    }

    async fn receive(&mut self) -> McpResult<String> {
        match self.queue.pop_front() {
            Some(line) => Ok(line),
            None => std::future::pending().await,
        }
    }

    async fn close(&mut self) -> McpResult<()> {
        self.log.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn describe(&self) -> String {
        "mock".to_string()
    }
}

pub(crate) fn reply(id: &Value, result: Value) -> String {
    json!({"jsonrpc": "2.0", "id": id, "result": result}).to_string()
}

pub(crate) fn error_reply(id: &Value, code: i64, message: &str) -> String {
    json!({"jsonrpc": "2.0", "id": id, "error": {"code": code, "message": message}}).to_string()
}

/// A well-behaved scripted MCP server.
pub(crate) struct MockServer {
    pub protocol_version: String,
    pub advertise_tools: bool,
    pub tools: Vec<Value>,
    pub page_size: Option<usize>,
    pub on_call: CallHandler,
}

impl MockServer {
    pub fn new() -> Self {
        Self {
            protocol_version: "2025-06-18".to_string(),
            advertise_tools: true,
            tools: vec![json!({"name": "ping", "description": "", "inputSchema": {}})],
            page_size: None,
            on_call: Box::new(|name, _| Ok(json!({"content": [{"type": "text", "text": name}]}))),
        }
    }

    pub fn tools(mut self, tools: Vec<Value>) -> Self {
        self.tools = tools;
        self
    }

    pub fn on_call(
        mut self,
        handler: impl FnMut(&str, &Value) -> Result<Value, (i64, String)> + Send + 'static,
    ) -> Self {
        self.on_call = Box::new(handler);
        self
    }

    pub fn transport(mut self) -> (MockTransport, MockLog) {
        MockTransport::new(move |message| {
            let Some(id) = message.get("id") else {
                return Vec::new();
            };
            let params = &message["params"];
            match message["method"].as_str().unwrap_or_default() {
                "initialize" => {
                    let capabilities = if self.advertise_tools {
                        json!({"tools": {}})
                    } else {
                        json!({})
                    };
                    vec![reply(
                        id,
                        json!({
                            "protocolVersion": self.protocol_version,
                            "capabilities": capabilities,
                            "serverInfo": {"name": "mock-server", "version": "1.0.0"}
                        }),
                    )]
                }
                "tools/list" => {
                    let start = params["cursor"]
                        .as_str()
                        .and_then(|c| c.parse::<usize>().ok())
                        .unwrap_or(0);
                    let size = self.page_size.unwrap_or(self.tools.len().max(1));
                    let end = (start + size).min(self.tools.len());
                    let mut result = json!({"tools": self.tools[start..end]});
                    if end < self.tools.len() {
                        result["nextCursor"] = json!(end.to_string());
                    }
                    vec![reply(id, result)]
                }
                "tools/call" => {
                    let name = params["name"].as_str().unwrap_or_default();
                    match (self.on_call)(name, &params["arguments"]) {
                        Ok(result) => vec![reply(id, result)],
                        Err((code, message)) => vec![error_reply(id, code, &message)],
                    }
                }
                "ping" => vec![reply(id, json!({}))],
                _ => vec![error_reply(id, -32601, "method not found")],
            }
        })
    }
}

pub(crate) fn test_config() -> SessionConfig {
    SessionConfig::stdio("mock", "mock-server", Vec::<String>::new())
        .timeout(Duration::from_millis(300))
}

/// A session over `transport` that has completed its handshake.
pub(crate) async fn initialized(transport: MockTransport) -> Session {
    let mut session = Session::with_transport(test_config(), Box::new(transport)).unwrap();
    session.initialize().await.unwrap();
    session
}
