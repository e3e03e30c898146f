//! Testing utilities for AnomalyScope workspace
//!
//! Shared provider doubles, stores and fixtures.

#![allow(missing_docs)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use scope_core::{
    AnomalyRecord, AnomalyStore, Provider, ProviderError, ProviderId, SampleSet, ScanConfig,
    StorageError, StoredRecord,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub fn provider_id(raw: &str) -> ProviderId {
    ProviderId::new(raw).unwrap()
}

/// Scan config over `providers` with `runs = 3`, `temperature = 0.9`
pub fn scan_config(providers: &[&str], threshold: f64) -> ScanConfig {
    let ids = providers.iter().map(|p| provider_id(p));
    ScanConfig::new("Explain drift.", ids, 3, 0.9, threshold).unwrap()
}

pub fn sample_set(groups: &[(&str, &[&str])]) -> SampleSet {
    groups
        .iter()
        .map(|(id, texts)| {
            (
                provider_id(id),
                texts.iter().map(|t| (*t).to_string()).collect(),
            )
        })
        .collect()
}

/// 2025-08-10T14:03:09Z
pub fn fixed_timestamp() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 8, 10, 14, 3, 9).unwrap()
}

/// Returns the same text for every run
#[derive(Debug, Clone)]
pub struct StaticProvider {
    id: ProviderId,
    text: String,
}

impl StaticProvider {
    pub fn new(id: &str, text: &str) -> Self {
        Self {
            id: provider_id(id),
            text: text.to_string(),
        }
    }
}

#[async_trait]
impl Provider for StaticProvider {
    fn id(&self) -> ProviderId {
        self.id.clone()
    }

    async fn generate(
        &self,
        _prompt: &str,
        _temperature: f64,
        n: usize,
    ) -> Result<Vec<String>, ProviderError> {
        Ok(vec![self.text.clone(); n])
    }
}

/// Replays scripted results in order, then repeats the last one
///
/// Clones share the script and call counter.
#[derive(Debug, Clone)]
pub struct ScriptedProvider {
    id: ProviderId,
    script: Arc<Mutex<VecDeque<Result<Vec<String>, ProviderError>>>>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedProvider {
    pub fn new(id: &str, script: Vec<Result<Vec<String>, ProviderError>>) -> Self {
        Self {
            id: provider_id(id),
            script: Arc::new(Mutex::new(script.into())),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of `generate` calls so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn id(&self) -> ProviderId {
        self.id.clone()
    }

    async fn generate(
        &self,
        _prompt: &str,
        _temperature: f64,
        _n: usize,
    ) -> Result<Vec<String>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut script = self.script.lock().unwrap();
        if script.len() > 1 {
            script.pop_front().unwrap()
        } else {
            script
                .front()
                .cloned()
                .unwrap_or_else(|| Err(ProviderError::MalformedResponse("empty script".into())))
        }
    }
}

/// Sleeps for `delay` before answering
#[derive(Debug, Clone)]
pub struct SlowProvider {
    inner: StaticProvider,
    delay: Duration,
}

impl SlowProvider {
    pub fn new(id: &str, text: &str, delay: Duration) -> Self {
        Self {
            inner: StaticProvider::new(id, text),
            delay,
        }
    }

    /// Never answers within any realistic deadline
    pub fn hanging(id: &str) -> Self {
        Self::new(id, "", Duration::from_secs(24 * 60 * 60))
    }
}

#[async_trait]
impl Provider for SlowProvider {
    fn id(&self) -> ProviderId {
        self.inner.id()
    }

    async fn generate(
        &self,
        prompt: &str,
        temperature: f64,
        n: usize,
    ) -> Result<Vec<String>, ProviderError> {
        tokio::time::sleep(self.delay).await;
        self.inner.generate(prompt, temperature, n).await
    }
}

/// Store that rejects every write
#[derive(Debug, Clone, Default)]
pub struct FailingStore;

#[async_trait]
impl AnomalyStore for FailingStore {
    async fn put(&self, _record: &AnomalyRecord) -> Result<StoredRecord, StorageError> {
        Err(StorageError::Backend("disk full".into()))
    }
}
