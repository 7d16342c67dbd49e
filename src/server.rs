//! JSON-lines request loop.
//!
//! Each input line is one request; each is resolved on its own task and
//! answered with one output line as soon as it completes.

use std::sync::Arc;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::task::JoinSet;

use crate::error::ResolveError;
use crate::pipeline::Pipeline;
use crate::types::{AnalysisOutcome, AnalysisRequest};

#[derive(Debug, Deserialize)]
struct WireRequest {
    /// Echoed back so callers can match out-of-order replies
    #[serde(default)]
    id: Option<serde_json::Value>,
    #[serde(flatten)]
    request: AnalysisRequest,
}

#[derive(Debug, Serialize)]
struct WireResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ok: Option<AnalysisOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    server_error: Option<bool>,
}

impl WireResponse {
    fn from_result(id: Option<serde_json::Value>, result: Result<AnalysisOutcome, ResolveError>) -> Self {
        match result {
            Ok(outcome) => Self {
                id,
                ok: Some(outcome),
                error: None,
                server_error: None,
            },
            Err(e) => Self::error(id, e.to_string(), e.is_server_error()),
        }
    }

    fn error(id: Option<serde_json::Value>, message: String, server_error: bool) -> Self {
        Self {
            id,
            ok: None,
            error: Some(message),
            server_error: Some(server_error),
        }
    }
}

/// Serve requests from `input` until it is exhausted and every in-flight
/// request has been answered.
///
/// A line that is not valid UTF-8 gets an error reply like any other
/// malformed request. A read failure stops intake, but requests already in
/// flight are still answered before the error is returned.
pub async fn serve<R, W>(pipeline: Arc<Pipeline>, input: R, mut output: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut segments = input.split(b'\n');
    let mut tasks = JoinSet::new();
    let mut reading = true;
    let mut failure = None;

    loop {
        tokio::select! {
            segment = segments.next_segment(), if reading => {
                match segment {
                    Ok(Some(bytes)) => match String::from_utf8(bytes) {
                        Ok(line) if line.trim().is_empty() => {}
                        Ok(line) => {
                            let pipeline = pipeline.clone();
                            tasks.spawn(async move { handle_line(&pipeline, &line).await });
                        }
                        Err(e) => {
                            tracing::warn!("Rejecting request line: {}", e);
                            let reply = encode(&WireResponse::error(None, format!("invalid request: {}", e), false));
                            write_line(&mut output, &reply).await?;
                        }
                    },
                    Ok(None) => {
                        tracing::debug!("Input closed, {} requests in flight", tasks.len());
                        reading = false;
                    }
                    Err(e) => {
                        tracing::error!("Reading requests failed, {} still in flight: {}", tasks.len(), e);
                        failure = Some(e);
                        reading = false;
                    }
                }
            }
            Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                write_line(&mut output, &joined?).await?;
            }
            else => break,
        }
    }

    match failure {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}

async fn write_line<W: AsyncWrite + Unpin>(output: &mut W, line: &str) -> std::io::Result<()> {
    output.write_all(line.as_bytes()).await?;
    output.write_all(b"\n").await?;
    output.flush().await
}

async fn handle_line(pipeline: &Pipeline, line: &str) -> String {
    let response = match serde_json::from_str::<WireRequest>(line) {
        Ok(wire) => {
            let result = pipeline.resolve(&wire.request).await;
            if let Err(e) = &result {
                tracing::warn!("Request for {:?} failed: {}", wire.request.word, e);
            }
            WireResponse::from_result(wire.id, result)
        }
        Err(e) => WireResponse::error(None, format!("invalid request: {}", e), false),
    };

    encode(&response)
}

fn encode(response: &WireResponse) -> String {
    serde_json::to_string(response)
        .unwrap_or_else(|e| format!(r#"{{"error":"response encoding failed: {}","server_error":true}}"#, e))
}
