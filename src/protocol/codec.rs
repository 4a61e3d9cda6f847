// ABOUTME: JSON-RPC envelope codec - encodes requests with per-session ids
// ABOUTME: and classifies incoming lines as responses, notifications, or requests.

use super::types::{
    JSONRPC_VERSION, JsonRpcError, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse,
    ServerRequest,
};
use crate::error::{McpError, McpResult};

/// A decoded inbound message.
#[derive(Debug, Clone)]
pub enum Incoming {
    Response(JsonRpcResponse),
    Notification(JsonRpcNotification),
    Request(ServerRequest),
}

/// Encodes outgoing envelopes and checks incoming ones.
///
/// Ids start at 1 and are never reused for the codec's lifetime. The codec
/// remembers the id of the last request so responses can be correlated.
#[derive(Debug)]
pub struct Codec {
    next_id: u64,
    last_sent: Option<u64>,
}

impl Default for Codec {
    fn default() -> Self {
        Self::new()
    }
}

impl Codec {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            last_sent: None,
        }
    }

    /// The id of the most recently encoded request.
    pub fn last_sent(&self) -> Option<u64> {
        self.last_sent
    }

    /// Encode a request, drawing the next id. Returns the id and the wire line.
    pub fn encode(
        &mut self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> McpResult<(u64, String)> {
        let id = self.next_id;
        self.next_id += 1;
        let line = serde_json::to_string(&JsonRpcRequest::new(id, method, params))?;
        self.last_sent = Some(id);
        Ok((id, line))
    }

    /// Encode a notification. Notifications do not consume ids.
    pub fn encode_notification(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> McpResult<String> {
        Ok(serde_json::to_string(&JsonRpcNotification::new(
            method, params,
        ))?)
    }

    /// Encode a reply to a server-initiated request.
    pub fn encode_reply(&self, reply: &JsonRpcResponse) -> McpResult<String> {
        Ok(serde_json::to_string(reply)?)
    }

    /// Parse one raw line into an inbound message.
    pub fn decode(&self, raw_line: &str) -> McpResult<Incoming> {
        let value: serde_json::Value = serde_json::from_str(raw_line.trim())
            .map_err(|e| McpError::Protocol(format!("invalid JSON from server: {}", e)))?;

        let object = value
            .as_object()
            .ok_or_else(|| McpError::Protocol("envelope is not a JSON object".into()))?;

        match object.get("jsonrpc").and_then(|v| v.as_str()) {
            Some(JSONRPC_VERSION) => {}
            Some(other) => {
                return Err(McpError::Protocol(format!(
                    "unsupported jsonrpc version '{}'",
                    other
                )));
            }
            None => return Err(McpError::Protocol("envelope missing 'jsonrpc'".into())),
        }

        let has_id = object.get("id").is_some_and(|id| !id.is_null());
        let has_method = object.contains_key("method");

        let incoming = match (has_method, has_id) {
            (true, true) => Incoming::Request(serde_json::from_value(value).map_err(|e| {
                McpError::Protocol(format!("malformed server request: {}", e))
            })?),
            (true, false) => {
                Incoming::Notification(serde_json::from_value(value).map_err(|e| {
                    McpError::Protocol(format!("malformed notification: {}", e))
                })?)
            }
            (false, _) => {
                if !object.contains_key("id") {
                    return Err(McpError::Protocol("response missing 'id'".into()));
                }
                if !object.contains_key("result") && !object.contains_key("error") {
                    return Err(McpError::Protocol(
                        "response has neither 'result' nor 'error'".into(),
                    ));
                }
                Incoming::Response(serde_json::from_value(value).map_err(|e| {
                    McpError::Protocol(format!("malformed response: {}", e))
                })?)
            }
        };

        Ok(incoming)
    }

    /// Check that a response answers the most recent request and unwrap it.
    ///
    /// The outer error is a protocol failure. The inner `Err` is the server's
    /// JSON-RPC error object, left for the caller to map per method.
    pub fn correlate(
        &self,
        response: JsonRpcResponse,
    ) -> McpResult<Result<serde_json::Value, JsonRpcError>> {
        let expected = self
            .last_sent
            .ok_or_else(|| McpError::Protocol("response received before any request".into()))?;

        if response.id.as_u64() != Some(expected) {
            if let Some(error) = &response.error {
                return Err(McpError::Protocol(format!(
                    "response/request id mismatch: expected {}, got {} (server error {}: {})",
                    expected, response.id, error.code, error.message
                )));
            }
            return Err(McpError::Protocol(format!(
                "response/request id mismatch: expected {}, got {}",
                expected, response.id
            )));
        }

        match (response.result, response.error) {
            (_, Some(error)) => Ok(Err(error)),
            (Some(result), None) => Ok(Ok(result)),
            (None, None) => Err(McpError::Protocol(
                "response has neither 'result' nor 'error'".into(),
            )),
        }
    }
}
