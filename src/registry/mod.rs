//! Registry of users who have started the bot.

mod sqlite;

use async_trait::async_trait;
use thiserror::Error;

use crate::UserProfile;

pub use sqlite::SqliteUserRegistry;

/// Errors from the user registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("database connection poisoned")]
    Poisoned,

    #[error("database task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Storage for known users.
#[async_trait]
pub trait UserRegistry: Send + Sync {
    /// Stores the user unless already known. Returns true if newly added.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    async fn register_if_absent(&self, user: &UserProfile) -> Result<bool, RegistryError>;

    /// Number of registered users.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    async fn count_users(&self) -> Result<u64, RegistryError>;
}
