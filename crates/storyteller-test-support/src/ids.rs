//! Test ids — predictable `IdGenerator` implementation for tests.

use std::sync::atomic::{AtomicU64, Ordering};

use storyteller_core::ids::IdGenerator;
use uuid::Uuid;

/// Hands out `00000000-0000-0000-0000-000000000001`, `…02`, and so on.
#[derive(Debug, Default)]
pub struct SequenceIds {
    next: AtomicU64,
}

impl SequenceIds {
    /// Creates a generator whose first id is `start + 1`.
    #[must_use]
    pub fn starting_after(start: u64) -> Self {
        Self {
            next: AtomicU64::new(start),
        }
    }
}

impl IdGenerator for SequenceIds {
    fn next_id(&self) -> Uuid {
        let n = self.next.fetch_add(1, Ordering::SeqCst) + 1;
        Uuid::from_u128(u128::from(n))
    }
}
