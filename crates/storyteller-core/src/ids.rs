//! Identifier generation abstraction.
//!
//! Message, chat and story segment ids are minted through this trait so tests
//! and replays can inject a predictable sequence.

use uuid::Uuid;

/// Source of fresh unique identifiers.
pub trait IdGenerator: Send + Sync {
    /// Returns a new identifier that has not been handed out before.
    fn next_id(&self) -> Uuid;
}

/// Production generator backed by random v4 UUIDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomIds;

impl IdGenerator for RandomIds {
    fn next_id(&self) -> Uuid {
        Uuid::new_v4()
    }
}
