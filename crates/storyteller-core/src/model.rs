//! Language model abstraction: an opaque streaming text and tool-call
//! generator.

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::Serialize;
use thiserror::Error;

use crate::message::Message;

/// A function the model may call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDefinition {
    /// Name the model calls the tool by.
    pub name: String,
    /// What the tool does, shown to the model.
    pub description: String,
    /// JSON schema of the arguments.
    pub parameters: serde_json::Value,
}

/// Input to one generation.
#[derive(Debug, Clone)]
pub struct ModelRequest {
    /// System instruction.
    pub system: String,
    /// Transcript, oldest first, ending with the new user message.
    pub messages: Vec<Message>,
    /// Tools the model may call.
    pub tools: Vec<ToolDefinition>,
}

/// A tool call emitted by the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    /// Call id assigned by the model.
    pub call_id: String,
    /// Name of the requested tool.
    pub tool_name: String,
    /// Arguments as a JSON object.
    pub args: serde_json::Value,
}

/// Why the model stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    /// Natural end of the answer.
    Stop,
    /// The model stopped to let a tool run.
    ToolCalls,
    /// Output token limit reached.
    Length,
    /// Anything else the provider reports.
    Other,
}

impl FinishReason {
    /// Wire name of the reason.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stop => "stop",
            Self::ToolCalls => "tool-calls",
            Self::Length => "length",
            Self::Other => "other",
        }
    }
}

/// One item of the model's output stream.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelEvent {
    /// A fragment of narrative text.
    TextDelta(String),
    /// A complete tool call.
    ToolCall(ToolCall),
    /// End of the generation.
    Finish(FinishReason),
}

/// Failure to produce or read a generation.
#[derive(Debug, Error)]
pub enum ModelError {
    /// The provider answered with a non-success status.
    #[error("model provider error: {status} - {message}")]
    Provider {
        /// HTTP status code.
        status: u16,
        /// Response body.
        message: String,
    },

    /// The connection failed.
    #[error("model transport error: {0}")]
    Transport(String),

    /// The provider sent something that could not be interpreted.
    #[error("model protocol error: {0}")]
    Protocol(String),
}

/// Stream of model output.
pub type ModelStream = BoxStream<'static, Result<ModelEvent, ModelError>>;

/// A streaming language model.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Starts a generation. Errors returned here mean nothing was generated.
    async fn stream(&self, request: ModelRequest) -> Result<ModelStream, ModelError>;
}
