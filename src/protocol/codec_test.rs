// ABOUTME: Tests for the JSON-RPC codec - id allocation, line classification,
// ABOUTME: and request/response correlation.

use super::*;
use crate::error::McpError;

#[test]
fn test_ids_are_monotonic_and_start_at_one() {
    let mut codec = Codec::new();
    let (first, _) = codec.encode("initialize", None).unwrap();
    let (second, _) = codec.encode("tools/list", None).unwrap();
    let (third, _) = codec.encode("tools/call", None).unwrap();

    assert_eq!(first, 1);
    assert!(second > first);
    assert!(third > second);
    assert_eq!(codec.last_sent(), Some(third));
}

#[test]
fn test_notifications_do_not_consume_ids() {
    let mut codec = Codec::new();
    codec
        .encode_notification("notifications/initialized", None)
        .unwrap();
    let (id, _) = codec.encode("tools/list", None).unwrap();
    assert_eq!(id, 1);
}

#[test]
fn test_encode_produces_single_line() {
    let mut codec = Codec::new();
    let params = serde_json::json!({"name": "query", "arguments": {"sql": "select 1;\nselect 2;"}});
    let (_, line) = codec.encode("tools/call", Some(params.clone())).unwrap();

    assert!(!line.contains('\n'));
    let parsed: serde_json::Value = serde_json::from_str(&line).unwrap();
    assert_eq!(parsed["params"], params);
}

#[test]
fn test_decode_response() {
    let codec = Codec::new();
    let incoming = codec
        .decode(r#"{"jsonrpc":"2.0","id":1,"result":{"tools":[]}}"#)
        .unwrap();
    assert!(matches!(incoming, Incoming::Response(_)));
}

#[test]
fn test_decode_notification_and_server_request() {
    let codec = Codec::new();

    let note = codec
        .decode(r#"{"jsonrpc":"2.0","method":"notifications/message","params":{"level":"info"}}"#)
        .unwrap();
    assert!(matches!(note, Incoming::Notification(n) if n.method == "notifications/message"));

    let req = codec
        .decode(r#"{"jsonrpc":"2.0","id":"srv-1","method":"ping"}"#)
        .unwrap();
    match req {
        Incoming::Request(r) => {
            assert_eq!(r.method, "ping");
            assert_eq!(r.id, "srv-1");
        }
        other => panic!("Expected server request, got {:?}", other),
    }
}

#[test]
fn test_decode_rejects_bad_input() {
    let codec = Codec::new();

    for line in [
        "not json",
        "[1, 2, 3]",
        r#"{"id":1,"result":{}}"#,
        r#"{"jsonrpc":"1.0","id":1,"result":{}}"#,
        r#"{"jsonrpc":"2.0","result":{}}"#,
        r#"{"jsonrpc":"2.0","id":1}"#,
    ] {
        match codec.decode(line) {
            Err(McpError::Protocol(_)) => {}
            other => panic!("Expected protocol error for {}, got {:?}", line, other),
        }
    }
}

#[test]
fn test_correlate_matching_id() {
    let mut codec = Codec::new();
    codec.encode("tools/list", None).unwrap();

    let response = JsonRpcResponse::success(serde_json::json!(1), serde_json::json!({"ok": true}));
    let result = codec.correlate(response).unwrap().unwrap();
    assert_eq!(result["ok"], true);
}

#[test]
fn test_correlate_surfaces_server_error() {
    let mut codec = Codec::new();
    codec.encode("tools/call", None).unwrap();

    let response = JsonRpcResponse::failure(serde_json::json!(1), -32601, "method not found");
    let error = codec.correlate(response).unwrap().unwrap_err();
    assert_eq!(error.code, -32601);
    assert_eq!(error.message, "method not found");
}

#[test]
fn test_correlate_id_mismatch_is_protocol_error() {
    let mut codec = Codec::new();
    codec.encode("initialize", None).unwrap();
    codec.encode("tools/list", None).unwrap();

    // Answer to the earlier request arriving late.
    let stale = JsonRpcResponse::success(serde_json::json!(1), serde_json::json!({}));
    match codec.correlate(stale) {
        Err(McpError::Protocol(msg)) => assert!(msg.contains("id mismatch"), "{}", msg),
        other => panic!("Expected protocol error, got {:?}", other),
    }

    let string_id = JsonRpcResponse::success(serde_json::json!("2"), serde_json::json!({}));
    assert!(matches!(
        codec.correlate(string_id),
        Err(McpError::Protocol(_))
    ));
}

#[test]
fn test_correlate_before_any_request() {
    let codec = Codec::new();
    let response = JsonRpcResponse::success(serde_json::json!(1), serde_json::json!({}));
    assert!(matches!(
        codec.correlate(response),
        Err(McpError::Protocol(_))
    ));
}

#[test]
fn test_round_trip_arbitrary_arguments() {
    let payloads = [
        serde_json::json!({}),
        serde_json::json!({"nested": {"list": [1, "two", null, 3.5]}}),
        serde_json::json!({"unicode": "héllo ✓", "quote": "\"q\""}),
    ];

    let mut codec = Codec::new();
    for payload in payloads {
        let (id, line) = codec
            .encode("tools/call", Some(serde_json::json!({"name": "echo", "arguments": payload})))
            .unwrap();
        let sent: serde_json::Value = serde_json::from_str(&line).unwrap();

        // Server echoes the arguments back as its result.
        let reply = serde_json::json!({
            "jsonrpc": "2.0",
            "id": id,
            "result": sent["params"]["arguments"],
        });
        let incoming = codec.decode(&reply.to_string()).unwrap();
        let Incoming::Response(response) = incoming else {
            panic!("Expected response");
        };
        assert_eq!(codec.correlate(response).unwrap().unwrap(), payload);
    }
}
