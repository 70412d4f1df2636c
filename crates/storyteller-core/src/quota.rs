//! Daily message quota per user class.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::user::UserType;

/// Length of the trailing window user messages are counted over.
pub const QUOTA_WINDOW_HOURS: i64 = 24;

/// Limits granted to one class of user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entitlements {
    /// Ceiling on user-authored messages per trailing 24 hours.
    pub max_messages_per_day: u64,
}

/// Ceiling table keyed by user class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaPolicy {
    /// Users without an account.
    pub guest: Entitlements,
    /// Users with an account.
    pub regular: Entitlements,
}

impl Default for QuotaPolicy {
    fn default() -> Self {
        Self {
            guest: Entitlements {
                max_messages_per_day: 5,
            },
            regular: Entitlements {
                max_messages_per_day: 20,
            },
        }
    }
}

impl QuotaPolicy {
    /// Returns the entitlements of a user class.
    #[must_use]
    pub fn entitlements(&self, user_type: UserType) -> Entitlements {
        match user_type {
            UserType::Guest => self.guest,
            UserType::Regular => self.regular,
        }
    }

    /// Start of the trailing window that ends at `now`.
    #[must_use]
    pub fn window_start(now: DateTime<Utc>) -> DateTime<Utc> {
        now - TimeDelta::hours(QUOTA_WINDOW_HOURS)
    }

    /// Evaluates a user's recent message count against their ceiling.
    #[must_use]
    pub fn window(&self, user_type: UserType, used: u64) -> QuotaWindow {
        QuotaWindow {
            used,
            ceiling: self.entitlements(user_type).max_messages_per_day,
        }
    }
}

/// Messages used in the trailing window versus the ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaWindow {
    /// User-authored messages in the window.
    pub used: u64,
    /// Allowed messages in the window.
    pub ceiling: u64,
}

impl QuotaWindow {
    /// A user at their ceiling may not start another turn.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.used >= self.ceiling
    }
}
