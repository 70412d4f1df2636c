//! Database schema.
//!
//! Tables `users`, `chats` and `messages` are created by the SQL files in
//! the workspace `migrations/` directory. Message parts are stored as
//! `JSONB` in their wire form.

use sqlx::migrate::Migrator;

/// Embedded workspace migrations, applied at startup.
pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");
