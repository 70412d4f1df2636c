//! Persistence collaborators: chat/message store and user directory.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::chat::Chat;
use crate::error::DomainError;
use crate::message::Message;
use crate::user::User;

/// Store for chats and their append-only message log.
#[async_trait]
pub trait ChatRepository: Send + Sync {
    /// Loads a chat by id.
    async fn find_chat(&self, chat_id: Uuid) -> Result<Option<Chat>, DomainError>;

    /// Inserts a new chat.
    async fn save_chat(&self, chat: &Chat) -> Result<(), DomainError>;

    /// Loads all messages of a chat, oldest first.
    async fn messages_by_chat(&self, chat_id: Uuid) -> Result<Vec<Message>, DomainError>;

    /// Appends messages. Existing messages are never rewritten.
    async fn save_messages(&self, messages: &[Message]) -> Result<(), DomainError>;

    /// Counts user-authored messages in chats owned by `user_id` created at
    /// or after `since`.
    async fn count_user_messages_since(
        &self,
        user_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<u64, DomainError>;
}

/// Lookup of stored users.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Finds the user registered under `email`.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DomainError>;
}
