//! Chat records.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Title given to chats created implicitly by a first turn.
pub const DEFAULT_CHAT_TITLE: &str = "Story";

/// Who may read a chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// Only the owner.
    Private,
    /// Anyone with the link.
    Public,
}

impl Visibility {
    /// Returns the stored name of the visibility.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::Public => "public",
        }
    }
}

impl std::str::FromStr for Visibility {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "private" => Ok(Self::Private),
            "public" => Ok(Self::Public),
            other => Err(format!("unknown visibility: {other}")),
        }
    }
}

/// A conversation between one user and the storyteller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    /// Chat identifier, chosen by the client.
    pub id: Uuid,
    /// The user who created the chat.
    pub owner_id: Uuid,
    /// Display title.
    pub title: String,
    /// Visibility of the chat.
    pub visibility: Visibility,
}

impl Chat {
    /// Creates the private "Story" chat opened by a first turn.
    #[must_use]
    pub fn new_story(id: Uuid, owner_id: Uuid) -> Self {
        Self {
            id,
            owner_id,
            title: DEFAULT_CHAT_TITLE.to_owned(),
            visibility: Visibility::Private,
        }
    }

    /// Returns `true` if `user_id` owns this chat.
    #[must_use]
    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.owner_id == user_id
    }
}
