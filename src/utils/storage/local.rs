//! Local filesystem storage backend.
//!
//! Each namespace is a directory under the base path and each record is one
//! `<id>.json` file in it. Writes go to a temporary sibling first and are
//! renamed into place, so a reader never sees a half-written record.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::fs;

use crate::{
    internal::session::error::{Result, SessionError},
    utils::storage::{BlobStore, Namespace, validate_id},
};

const RECORD_EXTENSION: &str = "json";

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Local filesystem storage backend
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    base_path: PathBuf,
}

impl LocalBlobStore {
    /// Create a store rooted at `base_path`, creating it if needed.
    pub fn new(base_path: impl Into<PathBuf>) -> Result<Self> {
        let base_path = base_path.into();
        std::fs::create_dir_all(&base_path).map_err(|e| {
            SessionError::DataDir(format!("cannot create {}: {e}", base_path.display()))
        })?;
        Ok(Self { base_path })
    }

    /// Store rooted at the resolved data directory.
    pub fn open_default() -> Result<Self> {
        Self::new(crate::utils::path::data_dir()?)
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn namespace_dir(&self, namespace: Namespace) -> PathBuf {
        self.base_path.join(namespace.dir_name())
    }

    /// Gets the full path to a record, for example `base/sessions/<id>.json`.
    pub(crate) fn record_path(&self, namespace: Namespace, id: &str) -> PathBuf {
        self.namespace_dir(namespace)
            .join(format!("{id}.{RECORD_EXTENSION}"))
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(&self, namespace: Namespace, id: &str, data: &[u8]) -> Result<()> {
        validate_id(id)?;
        let dir = self.namespace_dir(namespace);
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| SessionError::io(&dir, e))?;

        let path = self.record_path(namespace, id);
        let temp = dir.join(format!(
            ".{id}.{}.{}.tmp",
            std::process::id(),
            TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        fs::write(&temp, data)
            .await
            .map_err(|e| SessionError::io(&temp, e))?;
        if let Err(e) = fs::rename(&temp, &path).await {
            let _ = fs::remove_file(&temp).await;
            return Err(SessionError::io(&path, e));
        }
        tracing::debug!(namespace = %namespace, id, bytes = data.len(), "stored record");
        Ok(())
    }

    async fn get(&self, namespace: Namespace, id: &str) -> Result<Vec<u8>> {
        validate_id(id)?;
        let path = self.record_path(namespace, id);
        match fs::read(&path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(SessionError::NotFound {
                namespace,
                id: id.to_string(),
            }),
            Err(e) => Err(SessionError::io(path, e)),
        }
    }

    async fn list(&self, namespace: Namespace) -> Result<Vec<String>> {
        let dir = self.namespace_dir(namespace);
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(SessionError::io(&dir, e)),
        };

        let mut ids = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| SessionError::io(&dir, e))?
        {
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != RECORD_EXTENSION) {
                continue;
            }
            let Some(id) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            if validate_id(id).is_ok() {
                ids.push(id.to_string());
            }
        }
        Ok(ids)
    }

    async fn delete(&self, namespace: Namespace, id: &str) -> Result<()> {
        validate_id(id)?;
        let path = self.record_path(namespace, id);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SessionError::io(path, e)),
        }
    }
}
