// Delegation gateway - JSON-RPC over HTTP with SSE streaming to expert agents

use crate::catalog::ExpertRecord;
use crate::events::{Artifact, Part, RawEvent, TaskStatus};
use async_trait::async_trait;
use futures_util::stream::{self, BoxStream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Ordered raw events from one delegated execution
pub type EventStream = BoxStream<'static, Result<RawEvent, GatewayError>>;

/// Narrow contract the core depends on to reach an expert. Connectivity and
/// unknown-target failures surface as typed errors, never as a silent empty
/// stream.
#[async_trait]
pub trait DelegationGateway: Send + Sync {
    /// Open a streaming session with an expert and yield its raw events.
    /// An explicit routing override travels with the message so downstream
    /// orchestrators honor it too.
    async fn streaming_call(
        &self,
        expert: &ExpertRecord,
        message: &str,
        context_id: &str,
        task_id: &str,
        target: Option<&str>,
    ) -> Result<EventStream, GatewayError>;

    /// Single-shot non-streaming call, returning the final answer text
    async fn direct_call(&self, expert: &ExpertRecord, message: &str)
    -> Result<String, GatewayError>;
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Expert '{name}' unreachable: {source}")]
    Unreachable {
        name: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Agent-to-agent gateway speaking JSON-RPC 2.0 over HTTP, with SSE for
/// streaming responses. A server that answers a streaming request with plain
/// JSON is adapted into a single-shot event stream rather than an error.
pub struct A2aGateway {
    client: reqwest::Client,
}

impl A2aGateway {
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(120))
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");
        Self { client }
    }

    fn rpc_request(
        method: &str,
        message: &str,
        context_id: &str,
        target: Option<&str>,
    ) -> RpcRequest {
        RpcRequest {
            jsonrpc: "2.0".to_string(),
            id: uuid::Uuid::new_v4().to_string(),
            method: method.to_string(),
            params: RpcParams {
                message: RpcMessage {
                    role: "user".to_string(),
                    parts: vec![Part::text(message)],
                    message_id: uuid::Uuid::new_v4().to_string(),
                    context_id: context_id.to_string(),
                    metadata: target.map(|t| MessageMetadata {
                        handoff_context: HandoffContext {
                            context_data: HandoffContextData {
                                target_agent: t.to_string(),
                            },
                        },
                    }),
                },
            },
        }
    }
}

impl Default for A2aGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DelegationGateway for A2aGateway {
    async fn streaming_call(
        &self,
        expert: &ExpertRecord,
        message: &str,
        context_id: &str,
        task_id: &str,
        target: Option<&str>,
    ) -> Result<EventStream, GatewayError> {
        let request = Self::rpc_request("message/stream", message, context_id, target);
        tracing::debug!(expert = %expert.name, %task_id, "opening streaming session");

        let response = self
            .client
            .post(&expert.url)
            .json(&request)
            .header("Accept", "text/event-stream")
            .send()
            .await
            .map_err(|source| GatewayError::Unreachable {
                name: expert.name.clone(),
                source,
            })?
            .error_for_status()?;

        let is_sse = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.contains("text/event-stream"))
            .unwrap_or(false);

        if !is_sse {
            // Non-streaming degradation mode: one JSON body, one shot of events
            let body: Value = response.json().await?;
            let events = envelope_to_events(body);
            return Ok(stream::iter(events).boxed());
        }

        let events = response
            .bytes_stream()
            .scan(SseDecoder::default(), |decoder, chunk| {
                let items = match chunk {
                    Ok(bytes) => decoder.feed(&bytes),
                    Err(err) => vec![Err(GatewayError::Http(err))],
                };
                futures_util::future::ready(Some(stream::iter(items)))
            })
            .flatten()
            .boxed();

        Ok(events)
    }

    async fn direct_call(
        &self,
        expert: &ExpertRecord,
        message: &str,
    ) -> Result<String, GatewayError> {
        let request = Self::rpc_request("message/send", message, "", None);
        tracing::debug!(expert = %expert.name, "direct call");

        let response = self
            .client
            .post(&expert.url)
            .json(&request)
            .send()
            .await
            .map_err(|source| GatewayError::Unreachable {
                name: expert.name.clone(),
                source,
            })?
            .error_for_status()?;

        let envelope: RpcEnvelope = response.json().await?;
        if let Some(error) = envelope.error {
            return Err(GatewayError::Rpc {
                code: error.code,
                message: error.message,
            });
        }

        let result = envelope
            .result
            .ok_or_else(|| GatewayError::UnexpectedResponse("missing result".to_string()))?;
        let parsed: DirectResult = serde_json::from_value(result)?;
        Ok(extract_text(parsed))
    }
}

// --- wire shapes ---

#[derive(Serialize)]
struct RpcRequest {
    jsonrpc: String,
    id: String,
    method: String,
    params: RpcParams,
}

#[derive(Serialize)]
struct RpcParams {
    message: RpcMessage,
}

#[derive(Serialize)]
struct RpcMessage {
    role: String,
    parts: Vec<Part>,
    #[serde(rename = "messageId")]
    message_id: String,
    #[serde(rename = "contextId")]
    context_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<MessageMetadata>,
}

/// Routing context forwarded alongside the message itself
#[derive(Serialize)]
struct MessageMetadata {
    handoff_context: HandoffContext,
}

#[derive(Serialize)]
struct HandoffContext {
    context_data: HandoffContextData,
}

#[derive(Serialize)]
struct HandoffContextData {
    target_agent: String,
}

#[derive(Deserialize)]
struct RpcEnvelope {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Deserialize)]
struct RpcErrorBody {
    #[serde(default)]
    code: i64,
    message: String,
}

/// Result of a non-streaming call: either a direct message or a task with
/// artifacts.
#[derive(Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum DirectResult {
    Message {
        #[serde(default)]
        parts: Vec<Part>,
    },
    Task {
        #[serde(default)]
        artifacts: Vec<Artifact>,
        #[serde(default)]
        status: TaskStatus,
    },
}

fn extract_text(result: DirectResult) -> String {
    let parts = direct_result_parts(result);
    parts
        .iter()
        .filter_map(|p| p.display_text())
        .collect::<Vec<_>>()
        .concat()
}

fn direct_result_parts(result: DirectResult) -> Vec<Part> {
    match result {
        DirectResult::Message { parts } => parts,
        DirectResult::Task { artifacts, status } => {
            if artifacts.is_empty() {
                // Fall back to the status message when there is no artifact
                status.message.map(|m| m.parts).unwrap_or_default()
            } else {
                artifacts.into_iter().flat_map(|a| a.parts).collect()
            }
        }
    }
}

// --- SSE decoding ---

/// Incremental decoder for `data:` framed SSE lines. Frames arrive split
/// across arbitrary chunk boundaries, including mid-codepoint, so the
/// buffer holds raw bytes and only complete lines are decoded as UTF-8.
#[derive(Default)]
struct SseDecoder {
    buf: Vec<u8>,
}

impl SseDecoder {
    fn feed(&mut self, chunk: &[u8]) -> Vec<Result<RawEvent, GatewayError>> {
        self.buf.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line);
            if let Some(event) = decode_line(line.trim_end_matches(['\n', '\r'])) {
                events.push(event);
            }
        }
        events
    }
}

fn decode_line(line: &str) -> Option<Result<RawEvent, GatewayError>> {
    let data = line.strip_prefix("data:")?.trim();
    if data.is_empty() {
        return None;
    }

    match serde_json::from_str::<Value>(data) {
        Ok(value) => frame_to_event(value),
        Err(err) => {
            // One bad frame never aborts the request
            tracing::warn!(%err, "skipping unparseable event frame");
            None
        }
    }
}

/// Unwrap a JSON-RPC envelope (if present) and convert the payload into a
/// raw event. Unclassifiable payloads are skipped with a warning.
fn frame_to_event(mut value: Value) -> Option<Result<RawEvent, GatewayError>> {
    if let Some(error) = value.get("error") {
        let message = error
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("Unknown error")
            .to_string();
        return Some(Ok(RawEvent::Error { message }));
    }

    let payload = match value.get_mut("result") {
        Some(result) => result.take(),
        None => value,
    };

    if payload.get("kind").and_then(|k| k.as_str()) == Some("task") {
        return match serde_json::from_value::<DirectResult>(payload) {
            Ok(task) => Some(Ok(RawEvent::Message {
                parts: direct_result_parts(task),
            })),
            Err(err) => {
                tracing::warn!(%err, "skipping malformed task frame");
                None
            }
        };
    }

    match serde_json::from_value::<RawEvent>(payload) {
        Ok(event) => Some(Ok(event)),
        Err(err) => {
            tracing::warn!(%err, "skipping malformed event frame");
            None
        }
    }
}

fn envelope_to_events(body: Value) -> Vec<Result<RawEvent, GatewayError>> {
    frame_to_event(body).into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decoder_handles_split_frames() {
        let mut decoder = SseDecoder::default();

        let first = decoder.feed(b"data: {\"kind\": \"artifact-update\", \"artifact\"");
        assert!(first.is_empty());

        let second = decoder.feed(b": {\"parts\": [{\"kind\": \"text\", \"text\": \"hi\"}]}}\n");
        assert_eq!(second.len(), 1);
        assert!(matches!(
            second[0].as_ref().unwrap(),
            RawEvent::ArtifactUpdate { .. }
        ));
    }

    #[test]
    fn test_decoder_preserves_multibyte_text_split_across_chunks() {
        let mut decoder = SseDecoder::default();
        let frame =
            "data: {\"kind\": \"message\", \"parts\": [{\"kind\": \"text\", \"text\": \"請假\"}]}\n"
                .as_bytes();
        // Split inside the three UTF-8 bytes of 請
        let split = frame
            .windows(3)
            .position(|w| w == "請".as_bytes())
            .unwrap()
            + 1;

        assert!(decoder.feed(&frame[..split]).is_empty());
        let events = decoder.feed(&frame[split..]);

        assert_eq!(events.len(), 1);
        let RawEvent::Message { parts } = events[0].as_ref().unwrap() else {
            panic!("expected message");
        };
        assert_eq!(parts[0].display_text(), Some("請假"));
    }

    #[test]
    fn test_decoder_skips_blank_and_comment_lines() {
        let mut decoder = SseDecoder::default();
        let events = decoder.feed(b"\n: keep-alive\ndata:\n");
        assert!(events.is_empty());
    }

    #[test]
    fn test_malformed_frame_skipped() {
        let mut decoder = SseDecoder::default();
        let events = decoder.feed(
            b"data: {not json}\ndata: {\"kind\": \"message\", \"parts\": [{\"text\": \"ok\"}]}\n",
        );
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0].as_ref().unwrap(), RawEvent::Message { .. }));
    }

    #[test]
    fn test_override_target_travels_in_message_metadata() {
        let request = A2aGateway::rpc_request("message/stream", "hi", "ctx-1", Some("jira-agent"));
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value.pointer("/params/message/metadata/handoff_context/context_data/target_agent"),
            Some(&serde_json::json!("jira-agent"))
        );
    }

    #[test]
    fn test_no_override_omits_message_metadata() {
        let request = A2aGateway::rpc_request("message/send", "hi", "", None);
        let value = serde_json::to_value(&request).unwrap();
        assert!(value.pointer("/params/message/metadata").is_none());
    }

    #[test]
    fn test_rpc_error_becomes_error_event() {
        let frame = serde_json::json!({
            "jsonrpc": "2.0",
            "error": {"code": -32001, "message": "unknown agent"}
        });
        let event = frame_to_event(frame).unwrap().unwrap();
        assert!(matches!(event, RawEvent::Error { ref message } if message == "unknown agent"));
    }

    #[test]
    fn test_rpc_result_unwrapped() {
        let frame = serde_json::json!({
            "jsonrpc": "2.0",
            "result": {
                "kind": "status-update",
                "status": {"state": "working"}
            }
        });
        let event = frame_to_event(frame).unwrap().unwrap();
        assert!(matches!(event, RawEvent::StatusUpdate { .. }));
    }

    #[test]
    fn test_task_result_flattened_to_message() {
        let frame = serde_json::json!({
            "kind": "task",
            "id": "task-1",
            "status": {"state": "completed"},
            "artifacts": [
                {"parts": [{"kind": "text", "text": "part one. "}]},
                {"parts": [{"kind": "text", "text": "part two."}]}
            ]
        });
        let event = frame_to_event(frame).unwrap().unwrap();
        let RawEvent::Message { parts } = event else {
            panic!("expected message");
        };
        assert_eq!(parts.len(), 2);
    }

    #[test]
    fn test_extract_text_from_task_status_fallback() {
        let result: DirectResult = serde_json::from_value(serde_json::json!({
            "kind": "task",
            "status": {
                "state": "completed",
                "message": {"parts": [{"kind": "text", "text": "from status"}]}
            },
            "artifacts": []
        }))
        .unwrap();
        assert_eq!(extract_text(result), "from status");
    }

    #[test]
    fn test_extract_text_concatenates_message_parts() {
        let result: DirectResult = serde_json::from_value(serde_json::json!({
            "kind": "message",
            "parts": [
                {"kind": "text", "text": "Hello, "},
                {"kind": "text", "text": "world"}
            ]
        }))
        .unwrap();
        assert_eq!(extract_text(result), "Hello, world");
    }
}
