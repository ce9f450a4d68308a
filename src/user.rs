//! Telegram user identity.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Telegram user identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The sender of an inbound event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub id: UserId,

    /// Full name as shown by Telegram.
    pub display_name: String,

    /// Public username without the leading `@`.
    pub username: Option<String>,
}

impl UserProfile {
    /// Creates a profile without a username.
    #[must_use]
    pub fn new(id: UserId, display_name: impl Into<String>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            username: None,
        }
    }

    /// Sets the public username.
    #[must_use]
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }
}
