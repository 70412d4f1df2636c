//! `PostgreSQL` persistence for chats, messages and users.

pub mod pg_chat_store;
pub mod schema;

pub use pg_chat_store::PgChatStore;
pub use schema::MIGRATOR;
