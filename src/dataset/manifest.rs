//! On-disk record of which uploaded file is the active dataset.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// File name of the manifest inside the upload directory.
pub const MANIFEST_FILE: &str = "active_dataset.json";

/// Persistent pointer to the active dataset file, survives restarts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetManifest {
    /// File name inside the upload directory.
    pub file_name: String,

    pub record_count: usize,

    pub loaded_at: DateTime<Utc>,
}

impl DatasetManifest {
    /// Returns the manifest path for an upload directory.
    #[must_use]
    pub fn path_in(dir: &Path) -> PathBuf {
        dir.join(MANIFEST_FILE)
    }

    /// Loads the manifest from a directory, `None` if absent or unreadable.
    pub async fn load(dir: &Path) -> Option<Self> {
        let content = tokio::fs::read_to_string(Self::path_in(dir)).await.ok()?;
        serde_json::from_str(&content).ok()
    }

    /// Saves the manifest into a directory.
    pub async fn save(&self, dir: &Path) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        tokio::fs::write(Self::path_in(dir), json).await
    }

    /// Removes the manifest, treating a missing file as success.
    pub async fn remove(dir: &Path) -> std::io::Result<()> {
        match tokio::fs::remove_file(Self::path_in(dir)).await {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}
