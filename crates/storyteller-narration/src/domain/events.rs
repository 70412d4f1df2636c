//! Events a running turn emits to the caller.

use storyteller_core::model::FinishReason;
use uuid::Uuid;

/// One item of a turn's output stream.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnEvent {
    /// Generation has started for the given response message.
    StepStarted {
        /// Id of the assistant response message being generated.
        message_id: Uuid,
    },
    /// A word-aligned fragment of narrative text.
    TextDelta(String),
    /// The model called a tool.
    ToolCall {
        /// Call id assigned by the model.
        tool_call_id: String,
        /// Invoked tool.
        tool_name: String,
        /// Arguments chosen by the model.
        args: serde_json::Value,
    },
    /// A tool call finished.
    ToolResult {
        /// Call id the result belongs to.
        tool_call_id: String,
        /// Value returned by the tool.
        result: serde_json::Value,
    },
    /// Generation failed; the stream ends after this event.
    Error(String),
    /// Generation completed.
    Finished {
        /// Why the model stopped.
        reason: FinishReason,
    },
}
