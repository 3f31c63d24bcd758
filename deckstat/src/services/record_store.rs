//! Durable local record store
//!
//! One pretty-printed JSON document per `(kind, id)` at
//! `{root}/{cards|decks}/{id}.json`. Any I/O failure other than "file not
//! found" is a structural storage failure and aborts the run.

use crate::models::ResourceKind;
use deckstat_common::{Error, Result};
use serde_json::Value;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

/// File-per-record JSON store
#[derive(Debug)]
pub struct RecordStore {
    root: PathBuf,
    tmp_counter: AtomicU64,
}

impl RecordStore {
    /// Open a store rooted at `root`, creating the kind directories
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        for kind in [ResourceKind::Card, ResourceKind::Decklist] {
            let dir = root.join(kind.store_dir());
            tokio::fs::create_dir_all(&dir)
                .await
                .map_err(|e| Error::storage(&dir, e))?;
        }

        tracing::debug!(root = %root.display(), "Record store opened");

        Ok(Self {
            root,
            tmp_counter: AtomicU64::new(0),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of one record
    pub fn path_for(&self, kind: ResourceKind, id: &str) -> PathBuf {
        self.root.join(kind.store_dir()).join(format!("{}.json", id))
    }

    /// Load a persisted record
    ///
    /// `Ok(None)` when absent. A file that does not hold valid JSON is
    /// treated as absent so the caller refetches and overwrites it.
    pub async fn load(&self, kind: ResourceKind, id: &str) -> Result<Option<Value>> {
        let path = self.path_for(kind, id);

        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::storage(&path, e)),
        };

        match serde_json::from_slice::<Value>(&bytes) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Stored record is not valid JSON, ignoring it"
                );
                Ok(None)
            }
        }
    }

    /// Persist a record atomically (temp file + rename)
    pub async fn save(&self, kind: ResourceKind, id: &str, value: &Value) -> Result<()> {
        let path = self.path_for(kind, id);
        let dir = self.root.join(kind.store_dir());
        let tmp_path = dir.join(format!(
            ".{}.{}.tmp",
            id,
            self.tmp_counter.fetch_add(1, Ordering::Relaxed)
        ));

        let content = serde_json::to_vec_pretty(value)?;

        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| Error::storage(&dir, e))?;
        tokio::fs::write(&tmp_path, &content)
            .await
            .map_err(|e| Error::storage(&tmp_path, e))?;
        tokio::fs::rename(&tmp_path, &path)
            .await
            .map_err(|e| Error::storage(&path, e))?;

        tracing::debug!(kind = %kind, id = %id, "Record persisted");
        Ok(())
    }

    /// Ids of every persisted record of `kind`, sorted
    pub async fn list_ids(&self, kind: ResourceKind) -> Result<Vec<String>> {
        let dir = self.root.join(kind.store_dir());
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::storage(&dir, e)),
        };

        let mut ids = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| Error::storage(&dir, e))?
        {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                if !stem.starts_with('.') {
                    ids.push(stem.to_string());
                }
            }
        }

        ids.sort();
        Ok(ids)
    }
}
