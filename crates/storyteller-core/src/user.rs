//! Users and the identity asserted by the external auth layer.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A stored user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// User identifier.
    pub id: Uuid,
    /// Login email, the key identities resolve through.
    pub email: String,
}

/// Class of user, which selects the quota ceiling and ownership policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    /// Session-scoped user without an account. Its identifier may rotate.
    Guest,
    /// User with an account.
    Regular,
}

impl UserType {
    /// Returns the wire name of the class.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Guest => "guest",
            Self::Regular => "regular",
        }
    }
}

impl fmt::Display for UserType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "guest" => Ok(Self::Guest),
            "regular" => Ok(Self::Regular),
            other => Err(format!("unknown user type: {other}")),
        }
    }
}

/// Identity claim handed to a turn by the auth layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIdentity {
    /// Email the identity resolves through.
    pub email: String,
    /// Class of the identity.
    pub user_type: UserType,
}

impl UserIdentity {
    /// Returns `true` for guest identities.
    #[must_use]
    pub fn is_guest(&self) -> bool {
        self.user_type == UserType::Guest
    }
}
