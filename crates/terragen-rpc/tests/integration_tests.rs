//! Integration tests for the RPC client against an in-process TCP server.
//!
//! The mock server reads one length-prefixed frame per connection, records
//! it, writes a reply and closes the connection, like the Terragen server.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use bytes::Bytes;
use futures_util::StreamExt;
use serde_json::{Value, json};
use terragen_rpc::{
    ApiErrorKind, ClientConfig, Error, ErrorCategory, LengthPrefixCodec, LowLevelErrorKind,
    RpcClient,
};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::codec::FramedRead;

type Handler = Arc<dyn Fn(&Bytes) -> Vec<u8> + Send + Sync>;

struct MockServer {
    port: u16,
    frames: Arc<Mutex<Vec<Bytes>>>,
    task: JoinHandle<()>,
}

impl MockServer {
    async fn start<F>(handler: F) -> Self
    where
        F: Fn(&Bytes) -> Vec<u8> + Send + Sync + 'static,
    {
        let handler: Handler = Arc::new(handler);
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let frames = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&frames);

        let task = tokio::spawn(async move {
            loop {
                let Ok((socket, _)) = listener.accept().await else {
                    break;
                };
                let handler = Arc::clone(&handler);
                let recorded = Arc::clone(&recorded);
                tokio::spawn(async move {
                    let mut framed = FramedRead::new(socket, LengthPrefixCodec::new());
                    let Some(Ok(frame)) = framed.next().await else {
                        return;
                    };
                    recorded.lock().unwrap().push(frame.clone());
                    let reply = handler(&frame);
                    let mut socket = framed.into_inner();
                    let _ = socket.write_all(&reply).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        Self { port, frames, task }
    }

    /// A server that dispatches parsed requests to `dispatch` and wraps the
    /// outcome in a JSON-RPC envelope.
    async fn jsonrpc<F>(dispatch: F) -> Self
    where
        F: Fn(&str, &[Value]) -> Result<Value, (i64, &'static str)> + Send + Sync + 'static,
    {
        Self::start(move |frame| {
            let reply = match serde_json::from_slice::<Value>(frame) {
                Err(_) => error_envelope(&Value::Null, -32700, "Parse error"),
                Ok(request) => match request.get("method").and_then(Value::as_str) {
                    None => error_envelope(&Value::Null, -32600, "Invalid Request"),
                    Some(method) => {
                        let id = request.get("id").cloned().unwrap_or(Value::Null);
                        let params = request
                            .get("params")
                            .and_then(Value::as_array)
                            .cloned()
                            .unwrap_or_default();
                        match dispatch(method, &params) {
                            Ok(result) => json!({"jsonrpc": "2.0", "result": result, "id": id}),
                            Err((code, message)) => error_envelope(&id, code, message),
                        }
                    }
                },
            };
            serde_json::to_vec(&reply).unwrap()
        })
        .await
    }

    fn client(&self) -> RpcClient {
        RpcClient::with_config(ClientConfig {
            host: "127.0.0.1".to_string(),
            port: self.port,
            timeout_secs: 5.0,
        })
    }

    fn requests(&self) -> Vec<Value> {
        self.frames
            .lock()
            .unwrap()
            .iter()
            .map(|frame| serde_json::from_slice(frame).unwrap())
            .collect()
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn error_envelope(id: &Value, code: i64, message: &str) -> Value {
    json!({"jsonrpc": "2.0", "error": {"code": code, "message": message}, "id": id})
}

fn scene_dispatch(method: &str, params: &[Value]) -> Result<Value, (i64, &'static str)> {
    match method {
        "root" => Ok(json!("1")),
        "node_by_path" => match params {
            [Value::String(path)] if path == "/Render Camera" => Ok(json!("12")),
            [Value::String(_)] => Ok(json!("")),
            _ => Err((-32602, "Invalid params")),
        },
        "get_param_as_string" => match params {
            [Value::String(_), Value::String(_)] => Ok(json!("0 1.5 0")),
            _ => Err((-32602, "Invalid params")),
        },
        "echo" => Ok(Value::Array(params.to_vec())),
        _ => Err((-32601, "Method not found")),
    }
}

#[tokio::test]
async fn test_call_returns_result_value() {
    let server = MockServer::jsonrpc(scene_dispatch).await;
    let client = server.client();

    let reply = client
        .call("node_by_path", vec![json!("/Render Camera")])
        .await
        .unwrap();

    assert!(reply.ok);
    assert_eq!(reply.value, Some(json!("12")));
    assert!(reply.error_code.is_none());
}

#[tokio::test]
async fn test_missing_node_returns_empty_string() {
    let server = MockServer::jsonrpc(scene_dispatch).await;
    let client = server.client();

    let reply = client
        .call("node_by_path", vec![json!("/No Such Node")])
        .await
        .unwrap();

    assert!(reply.ok);
    assert_eq!(reply.value, Some(json!("")));
}

#[tokio::test]
async fn test_request_envelope_on_the_wire() {
    let server = MockServer::jsonrpc(scene_dispatch).await;
    let client = server.client();

    let params = vec![json!("a"), json!(2), json!([1.5, 2.5]), json!({"k": null})];
    let reply = client.call("echo", params.clone()).await.unwrap();
    assert_eq!(reply.value, Some(Value::Array(params.clone())));

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(
        requests[0],
        json!({"jsonrpc": "2.0", "method": "echo", "params": params, "id": 1})
    );
}

#[tokio::test]
async fn test_ids_increase_by_one_from_one() {
    let server = MockServer::jsonrpc(scene_dispatch).await;
    let client = server.client();

    for _ in 0..5 {
        client.call("root", Vec::new()).await.unwrap();
    }

    let ids: Vec<u64> = server
        .requests()
        .iter()
        .map(|request| request["id"].as_u64().unwrap())
        .collect();
    assert_eq!(ids, vec![1, 2, 3, 4, 5]);
}

#[tokio::test]
async fn test_failed_calls_still_consume_ids() {
    let server = MockServer::jsonrpc(scene_dispatch).await;
    let client = server.client();

    client.call("root", Vec::new()).await.unwrap();
    client.call("no_such_method", Vec::new()).await.unwrap_err();
    client.call("root", Vec::new()).await.unwrap();

    let ids: Vec<u64> = server
        .requests()
        .iter()
        .map(|request| request["id"].as_u64().unwrap())
        .collect();
    assert_eq!(ids, vec![1, 2, 3]);
}

#[tokio::test]
async fn test_root_is_idempotent() {
    let server = MockServer::jsonrpc(scene_dispatch).await;
    let client = server.client();

    let first = client.call("root", Vec::new()).await.unwrap();
    let second = client.call("root", Vec::new()).await.unwrap();

    assert_eq!(first.value, second.value);
}

#[tokio::test]
async fn test_unknown_method_is_method_not_found() {
    let server = MockServer::jsonrpc(scene_dispatch).await;
    let client = server.client();

    let err = client.call("frobnicate", Vec::new()).await.unwrap_err();

    assert!(matches!(
        err,
        Error::Api {
            kind: ApiErrorKind::MethodNotFound,
            ..
        }
    ));
    assert_eq!(err.code(), Some(-32601));
    let reply = err.server_reply().unwrap();
    assert!(!reply.ok);
    assert_eq!(reply.error_message.as_deref(), Some("Method not found"));
}

#[tokio::test]
async fn test_missing_param_is_invalid_params() {
    let server = MockServer::jsonrpc(scene_dispatch).await;
    let client = server.client();

    let err = client
        .call("get_param_as_string", vec![json!("12")])
        .await
        .unwrap_err();

    assert_eq!(
        err.category(),
        ErrorCategory::Api(ApiErrorKind::InvalidParams)
    );
    assert_eq!(err.code(), Some(-32602));
}

#[tokio::test]
async fn test_error_codes_are_classified() {
    let cases = [
        (-32700, ErrorCategory::LowLevel(LowLevelErrorKind::ParseError)),
        (-32600, ErrorCategory::LowLevel(LowLevelErrorKind::InvalidRequest)),
        (-32603, ErrorCategory::LowLevel(LowLevelErrorKind::InternalError)),
        (-32099, ErrorCategory::LowLevel(LowLevelErrorKind::ServerError)),
        (-32042, ErrorCategory::LowLevel(LowLevelErrorKind::ServerError)),
        (-32000, ErrorCategory::LowLevel(LowLevelErrorKind::ServerError)),
        (-32100, ErrorCategory::Rpc),
        (7, ErrorCategory::Rpc),
    ];

    for (code, expected) in cases {
        let server = MockServer::start(move |_| {
            format!(
                r#"{{"jsonrpc":"2.0","error":{{"code":{code},"message":"m","more_info":"detail"}},"id":1}}"#
            )
            .into_bytes()
        })
        .await;

        let err = server.client().call("root", Vec::new()).await.unwrap_err();

        assert_eq!(err.category(), expected, "code {code}");
        assert_eq!(err.code(), Some(code));
        assert_eq!(err.more_info(), Some("detail"));
    }
}

#[tokio::test]
async fn test_garbage_reply_is_reply_error() {
    let server = MockServer::start(|_| b"<html>not json</html>".to_vec()).await;

    let err = server.client().call("root", Vec::new()).await.unwrap_err();

    assert_eq!(err.category(), ErrorCategory::Reply);
    assert_eq!(
        &err.server_reply().unwrap().raw_bytes[..],
        b"<html>not json</html>"
    );
}

#[tokio::test]
async fn test_reply_without_result_or_error_is_reply_error() {
    let server = MockServer::start(|_| br#"{"jsonrpc":"2.0","id":1}"#.to_vec()).await;

    let err = server.client().call("root", Vec::new()).await.unwrap_err();

    assert!(matches!(err, Error::Reply { .. }));
    assert!(err.server_reply().unwrap().raw_parsed.is_some());
}

#[tokio::test]
async fn test_empty_reply_is_reply_error() {
    let server = MockServer::start(|_| Vec::new()).await;

    let err = server.client().call("root", Vec::new()).await.unwrap_err();

    assert_eq!(err.category(), ErrorCategory::Reply);
}

#[tokio::test]
async fn test_silent_server_times_out() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let server = tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    let client = RpcClient::with_config(ClientConfig {
        host: "127.0.0.1".to_string(),
        port,
        timeout_secs: 0.3,
    });

    let started = Instant::now();
    let err = client.call("root", Vec::new()).await.unwrap_err();
    let elapsed = started.elapsed();

    assert!(err.is_timeout(), "got {err:?}");
    assert!(elapsed >= Duration::from_millis(300), "timed out early: {elapsed:?}");
    assert!(elapsed < Duration::from_secs(3), "timed out late: {elapsed:?}");
    server.abort();
}

#[tokio::test]
async fn test_timeout_change_applies_to_next_call() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let server = tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    let client = RpcClient::with_config(ClientConfig {
        host: "127.0.0.1".to_string(),
        port,
        timeout_secs: 5.0,
    });
    client.set_timeout(Duration::from_millis(125)).unwrap();

    let err = client.call("root", Vec::new()).await.unwrap_err();

    assert!(matches!(err, Error::Timeout(t) if t == Duration::from_millis(125)));
    server.abort();
}

#[tokio::test]
async fn test_connection_refused() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let client = RpcClient::with_config(ClientConfig {
        host: "127.0.0.1".to_string(),
        port,
        timeout_secs: 5.0,
    });

    let err = client.call("root", Vec::new()).await.unwrap_err();

    assert_eq!(err.category(), ErrorCategory::Connection);
    assert!(err.is_transport());
}

#[tokio::test]
async fn test_notification_has_no_id_and_keeps_counter() {
    let server = MockServer::jsonrpc(scene_dispatch).await;
    let client = server.client();

    client.notify("select_none", Vec::new()).await.unwrap();
    client.call("root", Vec::new()).await.unwrap();

    let requests = server.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests[0].get("id").is_none());
    assert_eq!(requests[0]["method"], "select_none");
    assert_eq!(requests[0]["params"], json!([]));
    assert_eq!(requests[1]["method"], "root");
    assert_eq!(requests[1]["id"], 1);
}

#[tokio::test]
async fn test_invalid_json_gets_parse_error() {
    let server = MockServer::jsonrpc(scene_dispatch).await;
    let client = server.client();

    let err = client.call_with_invalid_json().await.unwrap_err();

    assert_eq!(
        err.category(),
        ErrorCategory::LowLevel(LowLevelErrorKind::ParseError)
    );
    assert_eq!(err.code(), Some(-32700));
}

#[tokio::test]
async fn test_invalid_request_consumes_an_id() {
    let server = MockServer::jsonrpc(scene_dispatch).await;
    let client = server.client();

    let err = client.call_with_invalid_request().await.unwrap_err();
    assert_eq!(
        err.category(),
        ErrorCategory::LowLevel(LowLevelErrorKind::InvalidRequest)
    );

    client.call("root", Vec::new()).await.unwrap();
    let requests = server.requests();
    assert!(requests[0].get("method").is_none());
    assert_eq!(requests[1]["id"], json!(2));
}

#[tokio::test]
async fn test_concurrent_calls_get_unique_ids() {
    let server = MockServer::jsonrpc(scene_dispatch).await;
    let client = Arc::new(server.client());

    let calls: Vec<_> = (0..16)
        .map(|_| {
            let client = Arc::clone(&client);
            tokio::spawn(async move { client.call("root", Vec::new()).await })
        })
        .collect();
    for call in calls {
        assert!(call.await.unwrap().unwrap().ok);
    }

    let mut ids: Vec<u64> = server
        .requests()
        .iter()
        .map(|request| request["id"].as_u64().unwrap())
        .collect();
    ids.sort_unstable();
    assert_eq!(ids, (1..=16).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_call_value_returns_result() {
    let server = MockServer::jsonrpc(scene_dispatch).await;

    let value = server.client().call_value("root", Vec::new()).await.unwrap();

    assert_eq!(value, json!("1"));
}
