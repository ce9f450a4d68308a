//! SQLite-backed [`UserRegistry`].

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{Connection, params};
use tracing::{debug, info};

use super::{RegistryError, UserRegistry};
use crate::UserProfile;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY,
    username TEXT,
    full_name TEXT NOT NULL,
    registered_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);";

/// User registry stored in a single SQLite file.
///
/// Queries run on the blocking pool, one at a time.
#[derive(Debug)]
pub struct SqliteUserRegistry {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteUserRegistry {
    /// Opens (or creates) the database at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or the schema applied.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;
        info!("Opened user registry at {}", path.display());
        Self::with_connection(conn)
    }

    /// Opens a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema cannot be applied.
    pub fn open_in_memory() -> Result<Self, RegistryError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, RegistryError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn with_conn<T, F>(&self, query: F) -> Result<T, RegistryError>
    where
        F: FnOnce(&Connection) -> rusqlite::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || -> Result<T, RegistryError> {
            let conn = conn.lock().map_err(|_| RegistryError::Poisoned)?;
            Ok(query(&conn)?)
        })
        .await?
    }
}

#[async_trait]
impl UserRegistry for SqliteUserRegistry {
    async fn register_if_absent(&self, user: &UserProfile) -> Result<bool, RegistryError> {
        let (id, username, full_name) = (user.id.0, user.username.clone(), user.display_name.clone());
        let inserted = self
            .with_conn(move |conn| {
                conn.execute(
                    "INSERT OR IGNORE INTO users (id, username, full_name) VALUES (?1, ?2, ?3)",
                    params![id, username, full_name],
                )
            })
            .await?;
        if inserted > 0 {
            debug!("Registered user {} ({})", user.id, user.display_name);
        }
        Ok(inserted > 0)
    }

    async fn count_users(&self) -> Result<u64, RegistryError> {
        let count: i64 = self
            .with_conn(|conn| conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0)))
            .await?;
        Ok(u64::try_from(count).unwrap_or_default())
    }
}
