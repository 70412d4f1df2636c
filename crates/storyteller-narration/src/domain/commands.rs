//! Commands for the narration context.

use storyteller_core::message::Part;
use uuid::Uuid;

/// The user message a turn starts from.
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    /// Client-assigned id, if the client sent a usable one.
    pub id: Option<Uuid>,
    /// Message body.
    pub parts: Vec<Part>,
}

/// Command to run one turn of a chat.
#[derive(Debug, Clone)]
pub struct HandleTurn {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Chat the turn belongs to. Created if unknown.
    pub chat_id: Uuid,
    /// The new user message.
    pub message: IncomingMessage,
}
