//! Chat messages and their parts.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::story::{STORY_TOOL_NAME, StoryResult};

/// Author of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The human side of the chat.
    User,
    /// The storyteller.
    Assistant,
}

impl Role {
    /// Returns the stored name of the role.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// Progress of a tool invocation inside a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum ToolInvocationState {
    /// The model has asked for the tool; no result yet.
    Call {
        /// Arguments chosen by the model.
        args: serde_json::Value,
    },
    /// The tool has produced its result.
    Result {
        /// Arguments chosen by the model.
        args: serde_json::Value,
        /// Value returned by the tool.
        result: serde_json::Value,
    },
}

/// A tool call recorded in an assistant message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolInvocation {
    /// Name of the invoked tool.
    pub tool_name: String,
    /// Call id assigned by the model.
    pub tool_call_id: String,
    /// Call or result state.
    #[serde(flatten)]
    pub state: ToolInvocationState,
}

impl ToolInvocation {
    /// Returns the story segment carried by a completed story tool call.
    #[must_use]
    pub fn story_result(&self) -> Option<StoryResult> {
        match &self.state {
            ToolInvocationState::Result { result, .. } if self.tool_name == STORY_TOOL_NAME => {
                serde_json::from_value(result.clone()).ok()
            }
            ToolInvocationState::Result { .. } | ToolInvocationState::Call { .. } => None,
        }
    }
}

/// One element of a message body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Part {
    /// Plain text.
    #[serde(rename = "text")]
    Text {
        /// The text content.
        text: String,
    },
    /// A tool call and, once available, its result.
    #[serde(rename = "tool-invocation")]
    ToolInvocation {
        /// The invocation.
        #[serde(rename = "toolInvocation")]
        tool_invocation: ToolInvocation,
    },
}

impl Part {
    /// Builds a text part.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }
}

/// A persisted chat message. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Message identifier.
    pub id: Uuid,
    /// Chat the message belongs to.
    pub chat_id: Uuid,
    /// Author.
    pub role: Role,
    /// Ordered body.
    pub parts: Vec<Part>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Concatenated text parts, in order.
    #[must_use]
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|part| match part {
                Part::Text { text } => Some(text.as_str()),
                Part::ToolInvocation { .. } => None,
            })
            .collect::<Vec<_>>()
            .join("")
    }

    /// Tool invocations in order of appearance.
    pub fn tool_invocations(&self) -> impl Iterator<Item = &ToolInvocation> {
        self.parts.iter().filter_map(|part| match part {
            Part::ToolInvocation { tool_invocation } => Some(tool_invocation),
            Part::Text { .. } => None,
        })
    }
}
