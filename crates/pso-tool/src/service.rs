//! Line-delimited JSON request/response loop over any async byte stream.
//!
//! Each request line is handled on its own task, so a long optimization does
//! not hold up `tools/list` or other calls. Responses are written in
//! completion order and matched by `id`.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::tool::ToolRegistry;

pub const PARSE_ERROR: i64 = -32700;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;

#[derive(Debug, Clone, Deserialize)]
pub struct Request {
    #[serde(default)]
    pub id: Value,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl Response {
    fn ok(id: Value, result: Value) -> Self {
        Self {
            id,
            result: Some(result),
            error: None,
        }
    }

    fn err(id: Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            id,
            result: None,
            error: Some(RpcError {
                code,
                message: message.into(),
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CallParams {
    name: String,
    #[serde(default)]
    arguments: Value,
}

/// Handle one raw request line.
pub async fn handle_line(registry: &ToolRegistry, line: &str) -> Response {
    let request: Request = match serde_json::from_str(line) {
        Ok(request) => request,
        Err(e) => return Response::err(Value::Null, PARSE_ERROR, format!("invalid request: {e}")),
    };
    debug!(method = %request.method, "Handling request");

    match request.method.as_str() {
        "tools/list" => Response::ok(request.id, json!({ "tools": registry.list() })),
        "tools/call" => {
            let params: CallParams = match serde_json::from_value(request.params) {
                Ok(params) => params,
                Err(e) => {
                    return Response::err(request.id, INVALID_PARAMS, format!("invalid params: {e}"))
                }
            };
            let output = registry.call(&params.name, params.arguments).await;
            Response::ok(
                request.id,
                json!({
                    "content": [{ "type": "text", "text": output.text }],
                    "structuredContent": output.structured,
                    "isError": output.is_error,
                }),
            )
        }
        other => Response::err(request.id, METHOD_NOT_FOUND, format!("unknown method: {other}")),
    }
}

/// Serve requests from `reader` until EOF, writing one response line per
/// request to `writer`. Returns once every in-flight request has answered.
pub async fn serve<R, W>(registry: Arc<ToolRegistry>, reader: R, mut writer: W) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    let writer_task = tokio::spawn(async move {
        while let Some(line) = rx.recv().await {
            writer.write_all(line.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await?;
        }
        writer.shutdown().await
    });

    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let registry = Arc::clone(&registry);
        let tx = tx.clone();
        tokio::spawn(async move {
            let response = handle_line(&registry, &line).await;
            match serde_json::to_string(&response) {
                Ok(encoded) => {
                    let _ = tx.send(encoded);
                }
                Err(e) => warn!("Failed to encode response: {}", e),
            }
        });
    }
    info!("Request stream closed, waiting for in-flight calls");
    drop(tx);

    writer_task
        .await
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?
}
