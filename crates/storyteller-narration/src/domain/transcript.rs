//! The model's response batch for one turn, and how it folds into the single
//! assistant message that gets persisted.

use storyteller_core::message::{Part, ToolInvocation, ToolInvocationState};
use storyteller_core::model::ToolCall;
use uuid::Uuid;

/// Author of a response message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseRole {
    /// Text and tool calls written by the model.
    Assistant,
    /// Results returned by tools.
    Tool,
}

/// One message of the model's response.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseMessage {
    /// Message id.
    pub id: Uuid,
    /// Author.
    pub role: ResponseRole,
    /// Body.
    pub parts: Vec<Part>,
}

/// Messages produced by the model during one turn, in order.
#[derive(Debug, Clone)]
pub struct ResponseBatch {
    assistant_id: Uuid,
    messages: Vec<ResponseMessage>,
}

impl ResponseBatch {
    /// Creates an empty batch. The assistant message, once the model writes
    /// anything, carries `assistant_id`.
    #[must_use]
    pub fn new(assistant_id: Uuid) -> Self {
        Self {
            assistant_id,
            messages: Vec::new(),
        }
    }

    /// Messages in the batch.
    #[must_use]
    pub fn messages(&self) -> &[ResponseMessage] {
        &self.messages
    }

    fn assistant_parts(&mut self) -> &mut Vec<Part> {
        let index = match self
            .messages
            .iter()
            .position(|message| message.role == ResponseRole::Assistant)
        {
            Some(index) => index,
            None => {
                self.messages.push(ResponseMessage {
                    id: self.assistant_id,
                    role: ResponseRole::Assistant,
                    parts: Vec::new(),
                });
                self.messages.len() - 1
            }
        };
        &mut self.messages[index].parts
    }

    /// Appends narrative text, merging it into a trailing text part.
    pub fn push_text(&mut self, delta: &str) {
        if delta.is_empty() {
            return;
        }
        let parts = self.assistant_parts();
        if let Some(Part::Text { text }) = parts.last_mut() {
            text.push_str(delta);
        } else {
            parts.push(Part::text(delta));
        }
    }

    /// Records a tool call made by the model.
    pub fn push_tool_call(&mut self, call: &ToolCall) {
        self.assistant_parts().push(Part::ToolInvocation {
            tool_invocation: ToolInvocation {
                tool_name: call.tool_name.clone(),
                tool_call_id: call.call_id.clone(),
                state: ToolInvocationState::Call {
                    args: call.args.clone(),
                },
            },
        });
    }

    /// Records a tool's result as a tool-authored message.
    pub fn push_tool_result(&mut self, message_id: Uuid, call: &ToolCall, result: serde_json::Value) {
        self.messages.push(ResponseMessage {
            id: message_id,
            role: ResponseRole::Tool,
            parts: vec![Part::ToolInvocation {
                tool_invocation: ToolInvocation {
                    tool_name: call.tool_name.clone(),
                    tool_call_id: call.call_id.clone(),
                    state: ToolInvocationState::Result {
                        args: call.args.clone(),
                        result,
                    },
                },
            }],
        });
    }

    /// Id of the last assistant-authored message in the batch.
    #[must_use]
    pub fn trailing_assistant_id(&self) -> Option<Uuid> {
        self.messages
            .iter()
            .rev()
            .find(|message| message.role == ResponseRole::Assistant)
            .map(|message| message.id)
    }

    /// Folds the batch into one assistant message body: assistant parts in
    /// order, with each tool call replaced by its result when one arrived.
    #[must_use]
    pub fn into_assistant_parts(self) -> Vec<Part> {
        let mut results: Vec<ToolInvocation> = Vec::new();
        let mut parts: Vec<Part> = Vec::new();

        for message in self.messages {
            match message.role {
                ResponseRole::Assistant => parts.extend(message.parts),
                ResponseRole::Tool => {
                    for part in message.parts {
                        match part {
                            Part::ToolInvocation { tool_invocation } => {
                                results.push(tool_invocation);
                            }
                            Part::Text { .. } => {}
                        }
                    }
                }
            }
        }

        parts
            .into_iter()
            .map(|part| match part {
                Part::ToolInvocation { tool_invocation } => {
                    let resolved = results
                        .iter()
                        .find(|result| result.tool_call_id == tool_invocation.tool_call_id)
                        .cloned()
                        .unwrap_or(tool_invocation);
                    Part::ToolInvocation {
                        tool_invocation: resolved,
                    }
                }
                text @ Part::Text { .. } => text,
            })
            .collect()
    }
}
