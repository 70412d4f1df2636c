//! Streaming chat-completions client for xAI's OpenAI-compatible API.

use std::collections::BTreeMap;

use async_trait::async_trait;
use futures::{Stream, StreamExt, future, stream};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use storyteller_core::message::{Message, Role, ToolInvocationState};
use storyteller_core::model::{
    FinishReason, LanguageModel, ModelError, ModelEvent, ModelRequest, ModelStream, ToolCall,
    ToolDefinition,
};
use tracing::{debug, instrument, warn};

use crate::sse::SseLineBuffer;

pub const DEFAULT_XAI_BASE_URL: &str = "https://api.x.ai/v1";
pub const DEFAULT_XAI_MODEL: &str = "grok-3-mini-beta";

const DONE_SENTINEL: &str = "[DONE]";

/// Connection settings for the completions endpoint.
#[derive(Debug, Clone)]
pub struct XaiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
}

/// `LanguageModel` backed by `POST {base_url}/chat/completions`.
#[derive(Debug, Clone)]
pub struct XaiChatModel {
    client: Client,
    config: XaiConfig,
}

impl XaiChatModel {
    #[must_use]
    pub fn new(client: Client, config: XaiConfig) -> Self {
        Self { client, config }
    }
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage>,
    tools: Vec<WireTool<'a>>,
    stream: bool,
}

#[derive(Debug, PartialEq, Serialize)]
struct WireMessage {
    role: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<WireToolCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

impl WireMessage {
    fn text(role: &'static str, content: String) -> Self {
        Self {
            role,
            content: Some(content),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }
}

#[derive(Debug, PartialEq, Serialize)]
struct WireToolCall {
    id: String,
    #[serde(rename = "type")]
    kind: &'static str,
    function: WireFunctionCall,
}

#[derive(Debug, PartialEq, Serialize)]
struct WireFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Serialize)]
struct WireTool<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    function: &'a ToolDefinition,
}

/// Converts the transcript into chat-completions messages.
///
/// A completed tool invocation becomes an assistant `tool_calls` entry
/// followed by a `tool` message carrying the result. Invocations without a
/// result are dropped since the API rejects unanswered tool calls.
fn wire_messages(system: &str, messages: &[Message]) -> Vec<WireMessage> {
    let mut wire = vec![WireMessage::text("system", system.to_owned())];
    for message in messages {
        match message.role {
            Role::User => wire.push(WireMessage::text("user", message.text())),
            Role::Assistant => push_assistant(&mut wire, message),
        }
    }
    wire
}

fn push_assistant(wire: &mut Vec<WireMessage>, message: &Message) {
    let text = message.text();
    let mut calls = Vec::new();
    let mut results = Vec::new();
    for invocation in message.tool_invocations() {
        if let ToolInvocationState::Result { args, result } = &invocation.state {
            calls.push(WireToolCall {
                id: invocation.tool_call_id.clone(),
                kind: "function",
                function: WireFunctionCall {
                    name: invocation.tool_name.clone(),
                    arguments: args.to_string(),
                },
            });
            results.push(WireMessage {
                role: "tool",
                content: Some(result.to_string()),
                tool_calls: Vec::new(),
                tool_call_id: Some(invocation.tool_call_id.clone()),
            });
        }
    }
    if text.is_empty() && calls.is_empty() {
        return;
    }
    wire.push(WireMessage {
        role: "assistant",
        content: (!text.is_empty()).then_some(text),
        tool_calls: calls,
        tool_call_id: None,
    });
    wire.extend(results);
}

#[derive(Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
    finish_reason: Option<String>,
}

#[derive(Default, Deserialize)]
struct StreamDelta {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<ToolCallDelta>,
}

#[derive(Deserialize)]
struct ToolCallDelta {
    #[serde(default)]
    index: u32,
    id: Option<String>,
    function: Option<FunctionDelta>,
}

#[derive(Deserialize)]
struct FunctionDelta {
    name: Option<String>,
    arguments: Option<String>,
}

#[derive(Debug, Default)]
struct PendingToolCall {
    id: String,
    name: String,
    arguments: String,
}

fn finish_reason(raw: &str) -> FinishReason {
    match raw {
        "stop" => FinishReason::Stop,
        "tool_calls" | "function_call" => FinishReason::ToolCalls,
        "length" => FinishReason::Length,
        _ => FinishReason::Other,
    }
}

/// Turns a completions event stream into model events.
///
/// Tool-call fragments are accumulated by index and released as whole
/// calls when the choice finishes.
#[derive(Debug, Default)]
struct CompletionDecoder {
    lines: SseLineBuffer,
    pending: BTreeMap<u32, PendingToolCall>,
    finished: bool,
}

impl CompletionDecoder {
    fn feed(&mut self, bytes: &[u8]) -> Vec<Result<ModelEvent, ModelError>> {
        let mut events = Vec::new();
        for data in self.lines.push(bytes) {
            if self.finished {
                break;
            }
            if data == DONE_SENTINEL {
                events.extend(self.release_tool_calls());
                self.finished = true;
                break;
            }
            match serde_json::from_str::<StreamChunk>(&data) {
                Ok(chunk) => self.apply(chunk, &mut events),
                Err(error) => {
                    warn!(%error, "unreadable completion chunk");
                    events.push(Err(ModelError::Protocol(format!(
                        "malformed completion chunk: {error}"
                    ))));
                }
            }
        }
        events
    }

    fn apply(&mut self, chunk: StreamChunk, events: &mut Vec<Result<ModelEvent, ModelError>>) {
        for choice in chunk.choices {
            if let Some(content) = choice.delta.content.filter(|content| !content.is_empty()) {
                events.push(Ok(ModelEvent::TextDelta(content)));
            }
            for delta in choice.delta.tool_calls {
                let pending = self.pending.entry(delta.index).or_default();
                if let Some(id) = delta.id {
                    pending.id = id;
                }
                if let Some(function) = delta.function {
                    if let Some(name) = function.name {
                        pending.name.push_str(&name);
                    }
                    if let Some(arguments) = function.arguments {
                        pending.arguments.push_str(&arguments);
                    }
                }
            }
            if let Some(reason) = choice.finish_reason {
                events.extend(self.release_tool_calls());
                events.push(Ok(ModelEvent::Finish(finish_reason(&reason))));
                self.finished = true;
            }
        }
    }

    /// Called when the body ends. Calls still pending are released if the
    /// provider closed without a finish reason or `[DONE]`.
    fn finish(&mut self) -> Vec<Result<ModelEvent, ModelError>> {
        if self.finished {
            return Vec::new();
        }
        self.finished = true;
        if !self.pending.is_empty() {
            warn!(calls = self.pending.len(), "completion stream ended without a finish reason");
        }
        self.release_tool_calls()
    }

    fn release_tool_calls(&mut self) -> Vec<Result<ModelEvent, ModelError>> {
        std::mem::take(&mut self.pending)
            .into_values()
            .map(|call| {
                let args = if call.arguments.trim().is_empty() {
                    Value::Object(serde_json::Map::new())
                } else {
                    serde_json::from_str(&call.arguments).map_err(|error| {
                        ModelError::Protocol(format!(
                            "arguments for tool {} are not JSON: {error}",
                            call.name
                        ))
                    })?
                };
                Ok(ModelEvent::ToolCall(ToolCall {
                    call_id: call.id,
                    tool_name: call.name,
                    args,
                }))
            })
            .collect()
    }
}

/// Decodes a completions response body into model events, flushing the
/// decoder once the body ends.
fn decode_stream<S, B, E>(body: S) -> impl Stream<Item = Result<ModelEvent, ModelError>>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: std::fmt::Display,
{
    body.map(Some)
        .chain(stream::once(future::ready(None)))
        .scan(CompletionDecoder::default(), |decoder, chunk| {
            let batch = match chunk {
                Some(Ok(bytes)) => decoder.feed(bytes.as_ref()),
                Some(Err(error)) => vec![Err(ModelError::Transport(error.to_string()))],
                None => decoder.finish(),
            };
            future::ready(Some(stream::iter(batch)))
        })
        .flatten()
}

#[async_trait]
impl LanguageModel for XaiChatModel {
    #[instrument(
        skip(self, request),
        fields(model = %self.config.model, messages = request.messages.len())
    )]
    async fn stream(&self, request: ModelRequest) -> Result<ModelStream, ModelError> {
        let body = CompletionRequest {
            model: &self.config.model,
            messages: wire_messages(&request.system, &request.messages),
            tools: request
                .tools
                .iter()
                .map(|function| WireTool {
                    kind: "function",
                    function,
                })
                .collect(),
            stream: true,
        };

        let response = self
            .client
            .post(format!(
                "{}/chat/completions",
                self.config.base_url.trim_end_matches('/')
            ))
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|error| ModelError::Transport(error.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(ModelError::Provider { status, message });
        }
        debug!("completion stream opened");

        Ok(Box::pin(decode_stream(response.bytes_stream())))
    }
}
