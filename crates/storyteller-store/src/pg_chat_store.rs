//! `PostgreSQL` implementation of the `ChatRepository` and `UserDirectory`
//! traits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use tracing::{debug, instrument};
use uuid::Uuid;

use storyteller_core::chat::Chat;
use storyteller_core::error::DomainError;
use storyteller_core::message::{Message, Part};
use storyteller_core::repository::{ChatRepository, UserDirectory};
use storyteller_core::user::User;

/// PostgreSQL-backed chat, message and user store.
#[derive(Debug, Clone)]
pub struct PgChatStore {
    pool: PgPool,
}

impl PgChatStore {
    /// Creates a new `PgChatStore`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct ChatRow {
    id: Uuid,
    owner_id: Uuid,
    title: String,
    visibility: String,
}

impl TryFrom<ChatRow> for Chat {
    type Error = DomainError;

    fn try_from(row: ChatRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            owner_id: row.owner_id,
            title: row.title,
            visibility: row.visibility.parse().map_err(DomainError::Validation)?,
        })
    }
}

#[derive(FromRow)]
struct MessageRow {
    id: Uuid,
    chat_id: Uuid,
    role: String,
    parts: Json<Vec<Part>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<MessageRow> for Message {
    type Error = DomainError;

    fn try_from(row: MessageRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            chat_id: row.chat_id,
            role: row.role.parse().map_err(DomainError::Validation)?,
            parts: row.parts.0,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
}

#[allow(clippy::needless_pass_by_value)]
fn infrastructure(error: sqlx::Error) -> DomainError {
    DomainError::Infrastructure(error.to_string())
}

#[async_trait]
impl ChatRepository for PgChatStore {
    async fn find_chat(&self, chat_id: Uuid) -> Result<Option<Chat>, DomainError> {
        sqlx::query_as::<_, ChatRow>(
            "SELECT id, owner_id, title, visibility FROM chats WHERE id = $1",
        )
        .bind(chat_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(infrastructure)?
        .map(Chat::try_from)
        .transpose()
    }

    async fn save_chat(&self, chat: &Chat) -> Result<(), DomainError> {
        sqlx::query(
            "INSERT INTO chats (id, owner_id, title, visibility) VALUES ($1, $2, $3, $4) \
             ON CONFLICT (id) DO NOTHING",
        )
        .bind(chat.id)
        .bind(chat.owner_id)
        .bind(&chat.title)
        .bind(chat.visibility.as_str())
        .execute(&self.pool)
        .await
        .map_err(infrastructure)?;
        Ok(())
    }

    async fn messages_by_chat(&self, chat_id: Uuid) -> Result<Vec<Message>, DomainError> {
        sqlx::query_as::<_, MessageRow>(
            "SELECT id, chat_id, role, parts, created_at FROM messages \
             WHERE chat_id = $1 ORDER BY created_at ASC",
        )
        .bind(chat_id)
        .fetch_all(&self.pool)
        .await
        .map_err(infrastructure)?
        .into_iter()
        .map(Message::try_from)
        .collect()
    }

    #[instrument(skip(self, messages), fields(count = messages.len()))]
    async fn save_messages(&self, messages: &[Message]) -> Result<(), DomainError> {
        if messages.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await.map_err(infrastructure)?;
        for message in messages {
            sqlx::query(
                "INSERT INTO messages (id, chat_id, role, parts, created_at) \
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(message.id)
            .bind(message.chat_id)
            .bind(message.role.as_str())
            .bind(Json(&message.parts))
            .bind(message.created_at)
            .execute(&mut *tx)
            .await
            .map_err(infrastructure)?;
        }
        tx.commit().await.map_err(infrastructure)?;

        debug!("messages appended");
        Ok(())
    }

    async fn count_user_messages_since(
        &self,
        user_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<u64, DomainError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM messages m JOIN chats c ON c.id = m.chat_id \
             WHERE c.owner_id = $1 AND m.role = 'user' AND m.created_at >= $2",
        )
        .bind(user_id)
        .bind(since)
        .fetch_one(&self.pool)
        .await
        .map_err(infrastructure)?;

        u64::try_from(count)
            .map_err(|_| DomainError::Validation(format!("negative message count: {count}")))
    }
}

#[async_trait]
impl UserDirectory for PgChatStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DomainError> {
        let row = sqlx::query_as::<_, UserRow>("SELECT id, email FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(infrastructure)?;

        Ok(row.map(|row| User {
            id: row.id,
            email: row.email,
        }))
    }
}
