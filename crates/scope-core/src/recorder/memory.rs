//! In-memory record store

use super::{AnomalyStore, StoredRecord};
use crate::error::StorageError;
use crate::types::{AnomalyRecord, RecordKey};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Record store backed by a shared map
///
/// Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: Arc<RwLock<BTreeMap<RecordKey, AnomalyRecord>>>,
}

impl MemoryStore {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Record under a key
    pub async fn get(&self, key: &RecordKey) -> Option<AnomalyRecord> {
        self.records.read().await.get(key).cloned()
    }

    /// All records in key order
    pub async fn records(&self) -> Vec<AnomalyRecord> {
        self.records.read().await.values().cloned().collect()
    }
}

#[async_trait]
impl AnomalyStore for MemoryStore {
    async fn put(&self, record: &AnomalyRecord) -> Result<StoredRecord, StorageError> {
        let key = record.key();
        self.records.write().await.insert(key.clone(), record.clone());
        Ok(StoredRecord {
            key,
            artifacts: Vec::new(),
        })
    }
}
