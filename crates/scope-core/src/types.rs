//! Core types for AnomalyScope
//!
//! Defines the data that flows through one scan cycle:
//! - Provider identifiers and the scan configuration
//! - Sample sets collected from providers
//! - Anomaly records and their storage keys
//! - Coverage gaps for providers that produced nothing

use crate::error::ConfigError;
use chrono::{DateTime, SubsecRound, Utc};
use indexmap::IndexMap;
use scope_similarity::WithinStats;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

/// Timestamp layout used for record headers and JSON
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Provider identifier (trimmed, lowercase)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderId(String);

impl ProviderId {
    /// Create a normalized provider identifier
    ///
    /// # Errors
    /// Returns `ConfigError::InvalidProvider` if the id is blank or contains
    /// characters other than ASCII alphanumerics, `-` and `_`
    pub fn new(raw: impl AsRef<str>) -> Result<Self, ConfigError> {
        let id = raw.as_ref().trim().to_ascii_lowercase();
        let valid = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if valid {
            Ok(Self(id))
        } else {
            Err(ConfigError::InvalidProvider(raw.as_ref().to_string()))
        }
    }

    /// Identifier as string slice
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Uppercase token used in anomaly slugs
    #[inline]
    #[must_use]
    pub fn slug_token(&self) -> String {
        self.0.to_ascii_uppercase()
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ProviderId {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl Borrow<str> for ProviderId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Parse a comma-separated provider list
///
/// Blank entries are skipped and duplicates keep their first position.
///
/// # Errors
/// Returns the first invalid identifier
pub fn parse_provider_list(list: &str) -> Result<Vec<ProviderId>, ConfigError> {
    let mut ids: Vec<ProviderId> = Vec::new();
    for raw in list.split(',').filter(|s| !s.trim().is_empty()) {
        let id = ProviderId::new(raw)?;
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    Ok(ids)
}

/// Settings for one scan cycle
///
/// Validated on construction and immutable afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanConfig {
    prompt: String,
    providers: Vec<ProviderId>,
    runs: usize,
    temperature: f64,
    threshold: f64,
}

impl ScanConfig {
    /// Create a validated scan configuration
    ///
    /// Duplicate providers are dropped, keeping first occurrence.
    ///
    /// # Errors
    /// - `ConfigError::MissingPrompt` if the prompt is blank
    /// - `ConfigError::NoProviders` if the provider list is empty
    /// - `ConfigError::InvalidRuns` if `runs` is zero
    /// - `ConfigError::InvalidTemperature` outside `[0, 2]`
    /// - `ConfigError::InvalidThreshold` outside `[0, 1]`
    pub fn new(
        prompt: impl Into<String>,
        providers: impl IntoIterator<Item = ProviderId>,
        runs: usize,
        temperature: f64,
        threshold: f64,
    ) -> Result<Self, ConfigError> {
        let prompt = prompt.into();
        if prompt.trim().is_empty() {
            return Err(ConfigError::MissingPrompt);
        }

        let mut unique: Vec<ProviderId> = Vec::new();
        for id in providers {
            if !unique.contains(&id) {
                unique.push(id);
            }
        }
        if unique.is_empty() {
            return Err(ConfigError::NoProviders);
        }

        if runs == 0 {
            return Err(ConfigError::InvalidRuns(runs));
        }
        if !(0.0..=2.0).contains(&temperature) {
            return Err(ConfigError::InvalidTemperature(temperature));
        }
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigError::InvalidThreshold(threshold));
        }

        Ok(Self {
            prompt,
            providers: unique,
            runs,
            temperature,
            threshold,
        })
    }

    #[inline]
    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[inline]
    #[must_use]
    pub fn providers(&self) -> &[ProviderId] {
        &self.providers
    }

    #[inline]
    #[must_use]
    pub fn runs(&self) -> usize {
        self.runs
    }

    #[inline]
    #[must_use]
    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    #[inline]
    #[must_use]
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Same configuration with a different threshold
    ///
    /// # Errors
    /// Returns `ConfigError::InvalidThreshold` outside `[0, 1]`
    pub fn with_threshold(&self, threshold: f64) -> Result<Self, ConfigError> {
        Self::new(
            self.prompt.clone(),
            self.providers.clone(),
            self.runs,
            self.temperature,
            threshold,
        )
    }
}

/// Samples collected per provider, in configuration order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SampleSet(IndexMap<ProviderId, Vec<String>>);

impl SampleSet {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a provider's samples
    pub fn insert(&mut self, provider: ProviderId, samples: Vec<String>) {
        self.0.insert(provider, samples);
    }

    /// Samples for a provider
    #[inline]
    #[must_use]
    pub fn get(&self, provider: &str) -> Option<&[String]> {
        self.0.get(provider).map(Vec::as_slice)
    }

    /// Providers with at least one sample
    pub fn sampled_providers(&self) -> impl Iterator<Item = &ProviderId> {
        self.0.iter().filter(|(_, s)| !s.is_empty()).map(|(p, _)| p)
    }

    /// Iterate `(provider, samples)` in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&ProviderId, &[String])> {
        self.0.iter().map(|(p, s)| (p, s.as_slice()))
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Total number of samples across providers
    #[must_use]
    pub fn total_samples(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }
}

impl FromIterator<(ProviderId, Vec<String>)> for SampleSet {
    fn from_iter<I: IntoIterator<Item = (ProviderId, Vec<String>)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Anomaly severity, derived from cross-provider similarity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What triggered an anomaly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnomalyKind {
    /// Providers disagree with each other
    Divergence,
    /// At least one provider disagrees with itself; providers agree
    Instability,
}

impl AnomalyKind {
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Divergence => "divergence",
            Self::Instability => "instability",
        }
    }
}

impl fmt::Display for AnomalyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured payload of an anomaly record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyMeta {
    pub prompt: String,
    pub threshold: f64,
    pub providers: Vec<ProviderId>,
    pub runs: usize,
    pub temperature: f64,
    pub samples: SampleSet,
    pub cross_similarity: f64,
    pub within: IndexMap<ProviderId, WithinStats>,
}

impl AnomalyMeta {
    /// Rebuild the scan configuration this record was produced with
    ///
    /// # Errors
    /// Returns `ConfigError` if the stored values are out of range
    pub fn scan_config(&self) -> Result<ScanConfig, ConfigError> {
        ScanConfig::new(
            self.prompt.clone(),
            self.providers.clone(),
            self.runs,
            self.temperature,
            self.threshold,
        )
    }
}

/// A detected anomaly, immutable once written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyRecord {
    /// Slug identifying the drifted providers
    pub id: String,
    /// Detection instant (second precision, UTC)
    pub timestamp: DateTime<Utc>,
    pub severity: Severity,
    pub kind: AnomalyKind,
    pub description: String,
    pub meta: AnomalyMeta,
}

impl AnomalyRecord {
    /// Storage key for this record
    #[inline]
    #[must_use]
    pub fn key(&self) -> RecordKey {
        RecordKey::new(self.timestamp, self.id.clone())
    }

    /// Header timestamp (`YYYY-MM-DDTHH:MM:SSZ`)
    #[inline]
    #[must_use]
    pub fn timestamp_str(&self) -> String {
        self.timestamp.format(TIMESTAMP_FORMAT).to_string()
    }
}

/// Identity of a stored record: timestamp plus slug
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordKey {
    pub timestamp: DateTime<Utc>,
    pub slug: String,
}

impl RecordKey {
    /// Create key, truncating the timestamp to whole seconds
    #[must_use]
    pub fn new(timestamp: DateTime<Utc>, slug: impl Into<String>) -> Self {
        Self {
            timestamp: timestamp.trunc_subsecs(0),
            slug: slug.into(),
        }
    }

    /// Date bucket (`YYYY-MM-DD`)
    #[inline]
    #[must_use]
    pub fn date_dir(&self) -> String {
        self.timestamp.format("%Y-%m-%d").to_string()
    }

    /// File stem (`YYYYMMDDTHHMMSSZ_SLUG`)
    #[inline]
    #[must_use]
    pub fn file_stem(&self) -> String {
        format!("{}_{}", self.timestamp.format("%Y%m%dT%H%M%SZ"), self.slug)
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.date_dir(), self.file_stem())
    }
}

/// Why a provider contributed no samples
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum GapReason {
    /// Adapter returned nothing for this provider
    NoSamples,
    /// Adapter failed; retries exhausted or error not retryable
    Failed { error: String, attempts: u32 },
    /// Still pending when the cycle deadline passed
    TimedOut,
}

impl fmt::Display for GapReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoSamples => f.write_str("no samples returned"),
            Self::Failed { error, attempts } => {
                write!(f, "failed after {attempts} attempt(s): {error}")
            }
            Self::TimedOut => f.write_str("timed out before cycle deadline"),
        }
    }
}

/// Provider excluded from analysis
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageGap {
    pub provider: ProviderId,
    #[serde(flatten)]
    pub reason: GapReason,
}

impl CoverageGap {
    #[inline]
    #[must_use]
    pub fn new(provider: ProviderId, reason: GapReason) -> Self {
        Self { provider, reason }
    }
}

impl fmt::Display for CoverageGap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.provider, self.reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn id(s: &str) -> ProviderId {
        ProviderId::new(s).unwrap()
    }

    #[test]
    fn provider_id_normalizes() {
        assert_eq!(id("  OpenAI ").as_str(), "openai");
        assert_eq!(id("anthropic").slug_token(), "ANTHROPIC");
        assert!(ProviderId::new("   ").is_err());
        assert!(ProviderId::new("open ai").is_err());
    }

    #[test]
    fn provider_list_parsing() {
        let ids = parse_provider_list("openai, Anthropic,,openai").unwrap();
        assert_eq!(ids, vec![id("openai"), id("anthropic")]);
        assert!(parse_provider_list("openai,bad id").is_err());
    }

    #[test]
    fn scan_config_validation() {
        let ok = ScanConfig::new("X", vec![id("openai")], 3, 0.9, 0.85);
        assert!(ok.is_ok());

        assert!(matches!(
            ScanConfig::new("  ", vec![id("openai")], 3, 0.9, 0.85),
            Err(ConfigError::MissingPrompt)
        ));
        assert!(matches!(
            ScanConfig::new("X", Vec::new(), 3, 0.9, 0.85),
            Err(ConfigError::NoProviders)
        ));
        assert!(matches!(
            ScanConfig::new("X", vec![id("openai")], 0, 0.9, 0.85),
            Err(ConfigError::InvalidRuns(0))
        ));
        assert!(matches!(
            ScanConfig::new("X", vec![id("openai")], 3, 2.5, 0.85),
            Err(ConfigError::InvalidTemperature(_))
        ));
        assert!(matches!(
            ScanConfig::new("X", vec![id("openai")], 3, 0.9, f64::NAN),
            Err(ConfigError::InvalidThreshold(_))
        ));
    }

    #[test]
    fn scan_config_dedups_providers() {
        let config =
            ScanConfig::new("X", vec![id("openai"), id("anthropic"), id("openai")], 1, 0.0, 0.5)
                .unwrap();
        assert_eq!(config.providers(), &[id("openai"), id("anthropic")]);
    }

    #[test]
    fn sample_set_keeps_order_and_skips_empty() {
        let mut set = SampleSet::new();
        set.insert(id("b"), vec!["x".into()]);
        set.insert(id("a"), Vec::new());
        set.insert(id("c"), vec!["y".into(), "z".into()]);

        let order: Vec<_> = set.iter().map(|(p, _)| p.as_str()).collect();
        assert_eq!(order, vec!["b", "a", "c"]);

        let sampled: Vec<_> = set.sampled_providers().map(ProviderId::as_str).collect();
        assert_eq!(sampled, vec!["b", "c"]);
        assert_eq!(set.total_samples(), 3);
        assert_eq!(set.get("c").map(<[String]>::len), Some(2));
    }

    #[test]
    fn record_key_layout() {
        let ts = Utc.with_ymd_and_hms(2025, 8, 10, 14, 3, 9).unwrap()
            + chrono::Duration::milliseconds(250);
        let key = RecordKey::new(ts, "OPENAI-vs-ANTHROPIC-DIVERGENCE");
        assert_eq!(key.date_dir(), "2025-08-10");
        assert_eq!(key.file_stem(), "20250810T140309Z_OPENAI-vs-ANTHROPIC-DIVERGENCE");
    }

    #[test]
    fn gap_reason_serializes_tagged() {
        let gap = CoverageGap::new(id("openai"), GapReason::TimedOut);
        let json = serde_json::to_value(&gap).unwrap();
        assert_eq!(json["provider"], "openai");
        assert_eq!(json["reason"], "timed_out");
    }
}
