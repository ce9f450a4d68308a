//! The active dataset and its atomic replacement.
//!
//! Readers clone an `Arc` snapshot under a short read lock, so a lookup
//! always sees one complete dataset. Writers (load, upload, clear) are
//! serialized by a separate mutex that also covers the backing file and
//! manifest, so they never block lookups for longer than the pointer swap.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use super::manifest::{DatasetManifest, MANIFEST_FILE};
use super::record::{Dataset, DatasetRecord, LoadSummary};
use super::table::parse_dataset;
use super::xlsx::SheetError;

/// Errors that can occur while loading a dataset.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("'ID' column not found")]
    MissingKeyColumn,

    #[error("could not read the spreadsheet: {0}")]
    ParseError(#[from] SheetError),

    #[error("file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid file name: '{0}'")]
    InvalidFileName(String),

    #[error("parser task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Errors that can occur during lookup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("no dataset loaded")]
    NoDatasetLoaded,
}

/// Holds the single active dataset.
#[derive(Debug)]
pub struct DatasetStore {
    active: RwLock<Option<Arc<Dataset>>>,

    /// Serializes writers; lookups never take it.
    writer: Mutex<()>,

    /// Directory owning uploaded files and the manifest.
    storage_dir: PathBuf,
}

impl DatasetStore {
    /// Creates an empty store backed by the given directory.
    #[must_use]
    pub fn new(storage_dir: impl Into<PathBuf>) -> Self {
        Self {
            active: RwLock::new(None),
            writer: Mutex::new(()),
            storage_dir: storage_dir.into(),
        }
    }

    #[must_use]
    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    /// Parses a spreadsheet on disk and makes it the active dataset.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or lacks an
    /// `ID` column. The active dataset is left untouched on error.
    pub async fn load(&self, path: &Path) -> Result<LoadSummary, LoadError> {
        let _guard = self.writer.lock().await;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| LoadError::InvalidFileName(path.display().to_string()))?;
        let bytes = tokio::fs::read(path).await?;
        let dataset = parse_off_runtime(bytes, file_name, path.to_path_buf()).await?;

        Ok(self.install(dataset).await)
    }

    /// Parses uploaded bytes and, only if they parse, stores them in the
    /// upload directory and makes them the active dataset.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is unusable, the bytes do not parse, or
    /// the file cannot be written. Nothing is written or replaced on error.
    pub async fn load_upload(&self, file_name: &str, bytes: &[u8]) -> Result<LoadSummary, LoadError> {
        let file_name = sanitize_file_name(file_name)
            .ok_or_else(|| LoadError::InvalidFileName(file_name.to_owned()))?;
        let target = self.storage_dir.join(&file_name);

        let _guard = self.writer.lock().await;

        let dataset = parse_off_runtime(bytes.to_vec(), file_name, target.clone()).await?;

        tokio::fs::create_dir_all(&self.storage_dir).await?;
        write_atomically(&target, bytes).await?;

        Ok(self.install(dataset).await)
    }

    /// Loads the dataset named by the manifest, if there is one.
    ///
    /// # Errors
    ///
    /// Returns an error if the manifest names a file that no longer loads.
    pub async fn restore(&self) -> Result<Option<LoadSummary>, LoadError> {
        let Some(manifest) = DatasetManifest::load(&self.storage_dir).await else {
            debug!("No dataset manifest in {}", self.storage_dir.display());
            return Ok(None);
        };

        let path = self.storage_dir.join(&manifest.file_name);
        self.load(&path).await.map(Some)
    }

    /// Removes the active dataset together with its stored file.
    ///
    /// Returns `false` if nothing was loaded.
    pub async fn clear(&self) -> bool {
        let _guard = self.writer.lock().await;

        let Some(previous) = self.active.write().await.take() else {
            return false;
        };

        self.discard_backing_file(&previous).await;
        if let Err(e) = DatasetManifest::remove(&self.storage_dir).await {
            warn!("Failed to remove dataset manifest: {}", e);
        }

        info!("Cleared dataset '{}'", previous.file_name);
        true
    }

    /// Returns all records matching the normalized ID.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError::NoDatasetLoaded`] if the store is empty.
    pub async fn lookup(&self, id: &str) -> Result<Vec<DatasetRecord>, LookupError> {
        let snapshot = self.snapshot().await.ok_or(LookupError::NoDatasetLoaded)?;
        Ok(snapshot.find(id))
    }

    pub async fn is_loaded(&self) -> bool {
        self.active.read().await.is_some()
    }

    /// Returns the active dataset, if any.
    pub async fn snapshot(&self) -> Option<Arc<Dataset>> {
        self.active.read().await.clone()
    }

    /// Swaps in a new dataset. Callers must hold the writer lock.
    async fn install(&self, dataset: Dataset) -> LoadSummary {
        let summary = dataset.summary();
        let dataset = Arc::new(dataset);

        let previous = self.active.write().await.replace(Arc::clone(&dataset));

        if let Some(previous) = previous
            && previous.source_path != dataset.source_path
        {
            self.discard_backing_file(&previous).await;
        }

        if let Some(path) = dataset.source_path.as_deref()
            && self.owns(path)
        {
            let manifest = DatasetManifest {
                file_name: summary.file_name.clone(),
                record_count: summary.record_count,
                loaded_at: summary.loaded_at,
            };
            if let Err(e) = manifest.save(&self.storage_dir).await {
                warn!("Failed to save dataset manifest: {}", e);
            }
        }

        info!(
            "Loaded dataset '{}' ({} records, {} columns)",
            summary.file_name, summary.record_count, summary.column_count
        );
        summary
    }

    /// Deletes the file behind a dataset if it lives in the upload directory.
    async fn discard_backing_file(&self, dataset: &Dataset) {
        let Some(path) = dataset.source_path.as_deref() else {
            return;
        };
        if !self.owns(path) {
            debug!("Keeping external dataset file {}", path.display());
            return;
        }

        match tokio::fs::remove_file(path).await {
            Ok(()) => debug!("Removed dataset file {}", path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove dataset file {}: {}", path.display(), e),
        }
    }

    fn owns(&self, path: &Path) -> bool {
        path.parent() == Some(self.storage_dir.as_path())
    }
}

/// Reduces an uploaded name to a safe final path component.
fn sanitize_file_name(raw: &str) -> Option<String> {
    let name = raw.rsplit(['/', '\\']).next()?.trim();
    if name.is_empty() || name.starts_with('.') || name == MANIFEST_FILE {
        return None;
    }
    Some(name.to_owned())
}

/// Parses workbook bytes on the blocking pool.
async fn parse_off_runtime(
    bytes: Vec<u8>,
    file_name: String,
    source_path: PathBuf,
) -> Result<Dataset, LoadError> {
    tokio::task::spawn_blocking(move || parse_dataset(&bytes, &file_name, Some(source_path))).await?
}

/// Writes through a temporary sibling file so a crash never leaves a
/// half-written dataset under the final name.
async fn write_atomically(target: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut partial = target.as_os_str().to_owned();
    partial.push(".part");
    let partial = PathBuf::from(partial);

    tokio::fs::write(&partial, bytes).await?;
    if let Err(e) = tokio::fs::rename(&partial, target).await {
        let _ = tokio::fs::remove_file(&partial).await;
        return Err(e);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::record::CellValue;
    use crate::dataset::xlsx::tests::workbook_bytes;

    fn people() -> Vec<u8> {
        workbook_bytes(&[&["ID", "Name"], &["7", "Ann"], &["9", "Bob"]])
    }

    #[tokio::test]
    async fn test_fresh_store_reports_no_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let store = DatasetStore::new(dir.path());

        assert!(!store.is_loaded().await);
        assert_eq!(store.lookup("123").await, Err(LookupError::NoDatasetLoaded));
    }

    #[tokio::test]
    async fn test_upload_then_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let store = DatasetStore::new(dir.path());

        let summary = store.load_upload("people.xlsx", &people()).await.unwrap();
        assert_eq!(summary.record_count, 2);
        assert_eq!(summary.column_count, 2);
        assert!(dir.path().join("people.xlsx").exists());

        let found = store.lookup("7").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].get("ID"), Some(&CellValue::Integer(7)));
        assert_eq!(found[0].get("Name"), Some(&CellValue::Text("Ann".to_owned())));

        assert_eq!(store.lookup("8").await, Ok(Vec::new()));
        assert_eq!(store.lookup("  7 ").await, store.lookup("7").await);
    }

    #[tokio::test]
    async fn test_failed_load_keeps_previous_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let store = DatasetStore::new(dir.path());
        store.load_upload("people.xlsx", &people()).await.unwrap();
        let before = store.lookup("7").await;

        let no_key = workbook_bytes(&[&["Code", "Name"], &["7", "Eve"]]);
        assert!(matches!(
            store.load_upload("other.xlsx", &no_key).await,
            Err(LoadError::MissingKeyColumn)
        ));
        assert!(matches!(
            store.load_upload("broken.xlsx", b"not a workbook").await,
            Err(LoadError::ParseError(_))
        ));

        assert_eq!(store.lookup("7").await, before);
        assert!(!dir.path().join("other.xlsx").exists());
        assert!(!dir.path().join("broken.xlsx").exists());
    }

    #[tokio::test]
    async fn test_failed_first_load_stays_unloaded() {
        let dir = tempfile::tempdir().unwrap();
        let store = DatasetStore::new(dir.path());

        let no_key = workbook_bytes(&[&["Name"], &["Ann"]]);
        assert!(matches!(
            store.load_upload("people.xlsx", &no_key).await,
            Err(LoadError::MissingKeyColumn)
        ));
        assert!(!store.is_loaded().await);
        assert_eq!(store.lookup("7").await, Err(LookupError::NoDatasetLoaded));
    }

    #[tokio::test]
    async fn test_replace_does_not_merge() {
        let dir = tempfile::tempdir().unwrap();
        let store = DatasetStore::new(dir.path());
        store.load_upload("a.xlsx", &people()).await.unwrap();

        let other = workbook_bytes(&[&["ID", "Name"], &["10", "Cid"]]);
        store.load_upload("b.xlsx", &other).await.unwrap();

        assert_eq!(store.lookup("7").await, Ok(Vec::new()));
        assert_eq!(store.lookup("10").await.unwrap().len(), 1);
        assert!(!dir.path().join("a.xlsx").exists());
        assert!(dir.path().join("b.xlsx").exists());
    }

    #[tokio::test]
    async fn test_clear_is_idempotent_and_removes_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = DatasetStore::new(dir.path());
        store.load_upload("people.xlsx", &people()).await.unwrap();
        assert!(DatasetManifest::path_in(dir.path()).exists());

        assert!(store.clear().await);
        assert!(!store.clear().await);
        assert!(!dir.path().join("people.xlsx").exists());
        assert!(!DatasetManifest::path_in(dir.path()).exists());
        assert_eq!(store.lookup("7").await, Err(LookupError::NoDatasetLoaded));
    }

    #[tokio::test]
    async fn test_restore_from_manifest() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = DatasetStore::new(dir.path());
            assert_eq!(store.restore().await.unwrap(), None);
            store.load_upload("people.xlsx", &people()).await.unwrap();
        }

        let restarted = DatasetStore::new(dir.path());
        let summary = restarted.restore().await.unwrap().unwrap();
        assert_eq!(summary.file_name, "people.xlsx");
        assert_eq!(restarted.lookup("9").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_load_from_external_path_keeps_file() {
        let storage = tempfile::tempdir().unwrap();
        let elsewhere = tempfile::tempdir().unwrap();
        let path = elsewhere.path().join("people.xlsx");
        std::fs::write(&path, people()).unwrap();

        let store = DatasetStore::new(storage.path());
        store.load(&path).await.unwrap();
        assert!(store.clear().await);
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_upload_name_is_sanitized() {
        let dir = tempfile::tempdir().unwrap();
        let store = DatasetStore::new(dir.path());

        let summary = store.load_upload("../../etc/people.xlsx", &people()).await.unwrap();
        assert_eq!(summary.file_name, "people.xlsx");
        assert!(dir.path().join("people.xlsx").exists());

        assert!(matches!(
            store.load_upload("..", &people()).await,
            Err(LoadError::InvalidFileName(_))
        ));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_lookups_proceed_while_upload_is_parsed() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(DatasetStore::new(dir.path()));
        store.load_upload("people.xlsx", &people()).await.unwrap();

        let upload = {
            let store = Arc::clone(&store);
            let next = workbook_bytes(&[&["ID", "Name"], &["8", "Cat"]]);
            tokio::spawn(async move { store.load_upload("next.xlsx", &next).await })
        };
        tokio::task::yield_now().await;

        assert!(store.writer.try_lock().is_err(), "upload should be in flight");
        assert_eq!(store.lookup("7").await.unwrap().len(), 1);

        upload.await.unwrap().unwrap();
        assert!(store.lookup("7").await.unwrap().is_empty());
        assert_eq!(store.lookup("8").await.unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_lookups_never_mix_datasets() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(DatasetStore::new(dir.path()));

        let first = workbook_bytes(&[&["ID", "Src"], &["1", "a"], &["1", "a"], &["1", "a"]]);
        let second = workbook_bytes(&[&["ID", "Src"], &["1", "b"], &["1", "b"], &["1", "b"], &["1", "b"]]);
        store.load_upload("a.xlsx", &first).await.unwrap();

        let writer = {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                for i in 0..20 {
                    let (name, bytes) = if i % 2 == 0 { ("b.xlsx", &second) } else { ("a.xlsx", &first) };
                    store.load_upload(name, bytes).await.unwrap();
                }
            })
        };

        let readers: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    for _ in 0..200 {
                        let found = store.lookup("1").await.unwrap();
                        let sources: Vec<_> = found.iter().filter_map(|r| r.get("Src")).collect();
                        assert!(sources.windows(2).all(|w| w[0] == w[1]));
                        let expected = if sources[0] == &CellValue::Text("a".to_owned()) { 3 } else { 4 };
                        assert_eq!(found.len(), expected);
                        tokio::task::yield_now().await;
                    }
                })
            })
            .collect();

        writer.await.unwrap();
        for reader in readers {
            reader.await.unwrap();
        }
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("data.xlsx"), Some("data.xlsx".to_owned()));
        assert_eq!(sanitize_file_name("a/b\\c.xlsx"), Some("c.xlsx".to_owned()));
        assert_eq!(sanitize_file_name(".hidden.xlsx"), None);
        assert_eq!(sanitize_file_name(MANIFEST_FILE), None);
        assert_eq!(sanitize_file_name("dir/"), None);
    }
}
