//! Filesystem record store
//!
//! Layout under the root directory:
//!
//! ```text
//! <root>/
//!   LATEST_ANOMALY.md
//!   2025-08-10/
//!     20250810T140309Z_OPENAI-vs-ANTHROPIC-DIVERGENCE.md
//!     20250810T140309Z_OPENAI-vs-ANTHROPIC-DIVERGENCE.json
//! ```

use super::card::render_markdown;
use super::{AnomalyStore, StoredRecord};
use crate::error::StorageError;
use crate::types::AnomalyRecord;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// File name of the newest card, at the store root
pub const LATEST_CARD: &str = "LATEST_ANOMALY.md";

/// Record store writing markdown cards and JSON records to disk
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    #[inline]
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Load a JSON record written by this store
    ///
    /// # Errors
    /// Returns `StorageError` if the file is unreadable or not a record
    pub async fn load(path: impl AsRef<Path>) -> Result<AnomalyRecord, StorageError> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| StorageError::io_error(path, e))?;
        Ok(serde_json::from_str(&raw)?)
    }

    async fn write(path: &Path, contents: &[u8]) -> Result<(), StorageError> {
        tokio::fs::write(path, contents)
            .await
            .map_err(|e| StorageError::io_error(path, e))
    }
}

#[async_trait]
impl AnomalyStore for FileStore {
    async fn put(&self, record: &AnomalyRecord) -> Result<StoredRecord, StorageError> {
        let key = record.key();
        let dir = self.root.join(key.date_dir());
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| StorageError::io_error(&dir, e))?;

        let stem = key.file_stem();
        let json_path = dir.join(format!("{stem}.json"));
        let md_path = dir.join(format!("{stem}.md"));
        let latest_path = self.root.join(LATEST_CARD);

        let json = serde_json::to_string_pretty(record)?;
        let card = render_markdown(record)?;

        Self::write(&json_path, json.as_bytes()).await?;
        Self::write(&md_path, card.as_bytes()).await?;
        Self::write(&latest_path, card.as_bytes()).await?;

        tracing::debug!(json = %json_path.display(), md = %md_path.display(), "record files written");

        Ok(StoredRecord {
            key,
            artifacts: vec![json_path, md_path, latest_path],
        })
    }
}
