//! Catalog persistence.
//!
//! [`KeyValueStore`] abstracts the backing store (a directory of JSON files in
//! production, an in-process map in tests). [`CatalogStore`] owns the live
//! catalog and the single edit slot.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, RwLock as StdRwLock};
use std::time::Instant;

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::catalog::{parse_catalog, Catalog};
use crate::edit::{EditGuard, EditSession};
use crate::error::{Error, Result};

/// String key-value storage.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read a value, `None` if the key has never been written.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value. Fails with `StorageQuotaExceeded` when the store is full.
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Delete a value. Deleting a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<()>;
}

fn quota_error(used: u64, incoming: u64, quota: u64) -> Error {
    Error::StorageQuotaExceeded(format!(
        "writing {} bytes would use {} of {} bytes",
        incoming,
        used + incoming,
        quota
    ))
}

// =============================================================================
// FILE STORE
// =============================================================================

/// One `<key>.json` file per key inside a directory.
///
/// Writes go to a temp file that is renamed over the target, so a failed or
/// interrupted write leaves the previous value intact. The optional quota
/// bounds the total size of all values in the directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
    quota: Option<u64>,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            quota: None,
        }
    }

    pub fn with_quota(mut self, bytes: u64) -> Self {
        self.quota = Some(bytes);
        self
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && !key.starts_with('.')
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'));
        if !valid {
            return Err(Error::InvalidInput(format!("invalid storage key '{}'", key)));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }

    /// Bytes used by every stored value except `exclude`.
    async fn used_bytes(&self, exclude: &PathBuf) -> Result<u64> {
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };
        let mut used = 0;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if &path == exclude || path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            used += entry.metadata().await?.len();
        }
        Ok(used)
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key)?;
        let incoming = value.len() as u64;

        if let Some(quota) = self.quota {
            let used = self.used_bytes(&path).await?;
            if used + incoming > quota {
                warn!(
                    subsystem = "catalog",
                    component = "file_store",
                    op = "set",
                    storage_key = %key,
                    bytes = incoming,
                    "Write rejected by storage quota"
                );
                return Err(quota_error(used, incoming, quota));
            }
        }

        fs::create_dir_all(&self.dir).await?;

        let temp_path = self.dir.join(format!(".{}.tmp", key));
        let mut file = fs::File::create(&temp_path).await.map_err(|e| {
            warn!(temp_path = %temp_path.display(), error = %e, "file_store: File::create failed");
            e
        })?;
        file.write_all(value.as_bytes()).await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&temp_path, &path).await.map_err(|e| {
            warn!(from = %temp_path.display(), to = %path.display(), error = %e, "file_store: rename failed");
            e
        })?;

        debug!(
            subsystem = "catalog",
            component = "file_store",
            op = "set",
            storage_key = %key,
            bytes = incoming,
            "Value written"
        );
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// =============================================================================
// MEMORY STORE
// =============================================================================

/// In-process store with an optional total-size quota.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: StdRwLock<HashMap<String, String>>,
    quota: Option<u64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(bytes: u64) -> Self {
        Self {
            values: StdRwLock::default(),
            quota: Some(bytes),
        }
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let values = self.values.read().unwrap_or_else(|e| e.into_inner());
        Ok(values.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut values = self.values.write().unwrap_or_else(|e| e.into_inner());
        if let Some(quota) = self.quota {
            let used: u64 = values
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(_, v)| v.len() as u64)
                .sum();
            let incoming = value.len() as u64;
            if used + incoming > quota {
                return Err(quota_error(used, incoming, quota));
            }
        }
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let mut values = self.values.write().unwrap_or_else(|e| e.into_inner());
        values.remove(key);
        Ok(())
    }
}

// =============================================================================
// LOAD / SAVE
// =============================================================================

/// Load the catalog stored under `key`.
///
/// Never fails: a missing value, a read error, or a value of the wrong shape
/// all yield the built-in catalog.
pub async fn load_catalog(storage: &dyn KeyValueStore, key: &str) -> Catalog {
    let raw = match storage.get(key).await {
        Ok(Some(raw)) => raw,
        Ok(None) => {
            info!(
                subsystem = "catalog",
                op = "load",
                storage_key = %key,
                "No stored catalog, using built-in default"
            );
            return Catalog::builtin();
        }
        Err(e) => {
            warn!(
                subsystem = "catalog",
                op = "load",
                storage_key = %key,
                error = %e,
                "Catalog read failed, using built-in default"
            );
            return Catalog::builtin();
        }
    };

    match parse_catalog(&raw) {
        Ok(catalog) => {
            info!(
                subsystem = "catalog",
                op = "load",
                storage_key = %key,
                bytes = raw.len(),
                style_count = catalog.style_count(),
                "Catalog loaded"
            );
            catalog
        }
        Err(e) => {
            warn!(
                subsystem = "catalog",
                op = "load",
                storage_key = %key,
                error = %e,
                "Stored catalog is malformed, using built-in default"
            );
            Catalog::builtin()
        }
    }
}

/// Serialize and persist a catalog under `key`.
pub async fn save_catalog(storage: &dyn KeyValueStore, key: &str, catalog: &Catalog) -> Result<()> {
    let start = Instant::now();
    let json = serde_json::to_string(catalog)?;
    storage.set(key, &json).await?;
    info!(
        subsystem = "catalog",
        op = "save",
        storage_key = %key,
        bytes = json.len(),
        style_count = catalog.style_count(),
        duration_ms = start.elapsed().as_millis() as u64,
        "Catalog saved"
    );
    Ok(())
}

// =============================================================================
// CATALOG STORE
// =============================================================================

/// Owner of the live catalog.
///
/// Readers get an immutable snapshot. Writers go through one
/// [`EditSession`] at a time; [`commit`](CatalogStore::commit) persists the
/// edited copy and only then swaps it in.
pub struct CatalogStore {
    storage: Arc<dyn KeyValueStore>,
    key: String,
    live: RwLock<Arc<Catalog>>,
    editing: Arc<AtomicBool>,
}

impl CatalogStore {
    /// Load the catalog once from `storage`.
    pub async fn open(storage: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        let key = key.into();
        let catalog = load_catalog(storage.as_ref(), &key).await;
        Self {
            storage,
            key,
            live: RwLock::new(Arc::new(catalog)),
            editing: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Snapshot of the live catalog.
    pub async fn current(&self) -> Arc<Catalog> {
        self.live.read().await.clone()
    }

    /// Open the store's single edit session.
    pub async fn begin_edit(&self) -> Result<EditSession> {
        let guard = EditGuard::acquire(&self.editing).ok_or(Error::EditInProgress)?;
        let snapshot = self.current().await;
        debug!(subsystem = "catalog", op = "begin_edit", "Edit session opened");
        Ok(EditSession::with_guard(&snapshot, guard))
    }

    /// Whether an edit session is currently open.
    pub fn is_editing(&self) -> bool {
        self.editing.load(std::sync::atomic::Ordering::Acquire)
    }

    /// Persist the session's catalog, then make it live.
    ///
    /// If the save fails the live catalog is unchanged and the edits are lost
    /// with the session.
    pub async fn commit(&self, session: EditSession) -> Result<Arc<Catalog>> {
        if !session.is_guarded() && self.is_editing() {
            return Err(Error::EditInProgress);
        }
        // Keep the slot held until the swap is done.
        let (catalog, _guard) = session.into_parts();
        catalog.validate()?;
        save_catalog(self.storage.as_ref(), &self.key, &catalog).await?;

        let catalog = Arc::new(catalog);
        *self.live.write().await = catalog.clone();
        info!(
            subsystem = "catalog",
            op = "commit",
            style_count = catalog.style_count(),
            "Catalog edit committed"
        );
        Ok(catalog)
    }
}
