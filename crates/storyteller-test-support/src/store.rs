//! Test stores — in-memory `ChatRepository` and `UserDirectory`
//! implementations for tests.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use storyteller_core::chat::Chat;
use storyteller_core::error::DomainError;
use storyteller_core::message::{Message, Role};
use storyteller_core::repository::{ChatRepository, UserDirectory};
use storyteller_core::user::User;
use uuid::Uuid;

#[derive(Debug, Default)]
struct State {
    users: Vec<User>,
    chats: Vec<Chat>,
    messages: Vec<Message>,
    message_writes: usize,
}

/// A store that keeps users, chats and messages in memory and counts every
/// `save_messages` call.
#[derive(Debug, Default)]
pub struct InMemoryChatStore {
    state: Mutex<State>,
}

impl InMemoryChatStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a user.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn with_user(self, user: User) -> Self {
        self.state.lock().unwrap().users.push(user);
        self
    }

    /// Registers a chat.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn with_chat(self, chat: Chat) -> Self {
        self.state.lock().unwrap().chats.push(chat);
        self
    }

    /// Seeds messages without counting them as writes.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn with_messages(self, messages: Vec<Message>) -> Self {
        self.state.lock().unwrap().messages.extend(messages);
        self
    }

    /// Returns a snapshot of all chats.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn chats(&self) -> Vec<Chat> {
        self.state.lock().unwrap().chats.clone()
    }

    /// Returns a snapshot of all messages, in insertion order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn messages(&self) -> Vec<Message> {
        self.state.lock().unwrap().messages.clone()
    }

    /// Number of `save_messages` calls so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn message_writes(&self) -> usize {
        self.state.lock().unwrap().message_writes
    }
}

#[async_trait]
impl ChatRepository for InMemoryChatStore {
    async fn find_chat(&self, chat_id: Uuid) -> Result<Option<Chat>, DomainError> {
        let state = self.state.lock().unwrap();
        Ok(state.chats.iter().find(|chat| chat.id == chat_id).cloned())
    }

    async fn save_chat(&self, chat: &Chat) -> Result<(), DomainError> {
        self.state.lock().unwrap().chats.push(chat.clone());
        Ok(())
    }

    async fn messages_by_chat(&self, chat_id: Uuid) -> Result<Vec<Message>, DomainError> {
        let state = self.state.lock().unwrap();
        let mut messages: Vec<Message> = state
            .messages
            .iter()
            .filter(|message| message.chat_id == chat_id)
            .cloned()
            .collect();
        messages.sort_by_key(|message| message.created_at);
        Ok(messages)
    }

    async fn save_messages(&self, messages: &[Message]) -> Result<(), DomainError> {
        let mut state = self.state.lock().unwrap();
        state.messages.extend_from_slice(messages);
        state.message_writes += 1;
        Ok(())
    }

    async fn count_user_messages_since(
        &self,
        user_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<u64, DomainError> {
        let state = self.state.lock().unwrap();
        let count = state
            .messages
            .iter()
            .filter(|message| message.role == Role::User && message.created_at >= since)
            .filter(|message| {
                state
                    .chats
                    .iter()
                    .any(|chat| chat.id == message.chat_id && chat.owner_id == user_id)
            })
            .count();
        Ok(count as u64)
    }
}

#[async_trait]
impl UserDirectory for InMemoryChatStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DomainError> {
        let state = self.state.lock().unwrap();
        Ok(state.users.iter().find(|user| user.email == email).cloned())
    }
}

/// A store that always returns an infrastructure error. Useful for testing
/// error-handling paths.
#[derive(Debug)]
pub struct FailingChatStore;

#[async_trait]
impl ChatRepository for FailingChatStore {
    async fn find_chat(&self, _chat_id: Uuid) -> Result<Option<Chat>, DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }

    async fn save_chat(&self, _chat: &Chat) -> Result<(), DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }

    async fn messages_by_chat(&self, _chat_id: Uuid) -> Result<Vec<Message>, DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }

    async fn save_messages(&self, _messages: &[Message]) -> Result<(), DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }

    async fn count_user_messages_since(
        &self,
        _user_id: Uuid,
        _since: DateTime<Utc>,
    ) -> Result<u64, DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }
}

#[async_trait]
impl UserDirectory for FailingChatStore {
    async fn find_user_by_email(&self, _email: &str) -> Result<Option<User>, DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }
}
