//! File-based settings
//!
//! `anomalyscope.toml` holds four optional tables. Every field has a
//! default, so an empty file is valid:
//!
//! ```toml
//! [scan]
//! prompt = "Explain the purpose of AnomalyScope in one concise sentence."
//! providers = ["openai", "anthropic"]
//! runs = 3
//! temperature = 0.9
//! threshold = 0.85
//!
//! [analysis]
//! metric = "sequence_ratio"
//! cross_mode = "pair_mean"
//!
//! [sampling]
//! max_attempts = 3
//! cycle_timeout_secs = 120
//!
//! [output]
//! dir = "anomalies"
//! ```

use crate::analyzer::{AnalysisPolicy, SeverityPolicy};
use crate::error::ConfigError;
use crate::sampler::{RetryPolicy, SamplingPolicy};
use crate::types::{ProviderId, ScanConfig};
use scope_similarity::{CrossMode, MetricKind};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default probe prompt
pub const DEFAULT_PROMPT: &str = "Explain the purpose of AnomalyScope in one concise sentence.";

/// Conventional settings file name
pub const DEFAULT_CONFIG_FILE: &str = "anomalyscope.toml";

/// `[scan]` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScanSection {
    pub prompt: String,
    pub providers: Vec<String>,
    pub runs: usize,
    pub temperature: f64,
    pub threshold: f64,
}

impl Default for ScanSection {
    fn default() -> Self {
        Self {
            prompt: DEFAULT_PROMPT.to_string(),
            providers: vec!["openai".to_string(), "anthropic".to_string()],
            runs: 3,
            temperature: 0.9,
            threshold: 0.85,
        }
    }
}

/// `[analysis]` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisSection {
    pub metric: MetricKind,
    pub cross_mode: CrossMode,
    pub cross_margin: f64,
    pub within_factor: f64,
    pub high_margin: f64,
    pub medium_margin: f64,
}

impl Default for AnalysisSection {
    fn default() -> Self {
        let policy = AnalysisPolicy::default();
        Self {
            metric: MetricKind::default(),
            cross_mode: policy.cross_mode,
            cross_margin: policy.cross_margin,
            within_factor: policy.within_factor,
            high_margin: policy.severity.high_margin,
            medium_margin: policy.severity.medium_margin,
        }
    }
}

/// `[sampling]` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SamplingSection {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub backoff_multiplier: f64,
    pub max_backoff_ms: u64,
    pub cycle_timeout_secs: u64,
    pub max_parallel_providers: usize,
    /// Per-request HTTP timeout for provider adapters
    pub request_timeout_secs: u64,
}

impl Default for SamplingSection {
    fn default() -> Self {
        let policy = SamplingPolicy::default();
        Self {
            max_attempts: policy.retry.max_attempts,
            initial_backoff_ms: duration_ms(policy.retry.initial_backoff),
            backoff_multiplier: policy.retry.multiplier,
            max_backoff_ms: duration_ms(policy.retry.max_backoff),
            cycle_timeout_secs: policy.cycle_timeout.as_secs(),
            max_parallel_providers: policy.max_parallel_providers,
            request_timeout_secs: 60,
        }
    }
}

/// `[output]` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputSection {
    /// Root directory for anomaly records
    pub dir: PathBuf,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("anomalies"),
        }
    }
}

/// Complete settings file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScopeSettings {
    pub scan: ScanSection,
    pub analysis: AnalysisSection,
    pub sampling: SamplingSection,
    pub output: OutputSection,
}

impl ScopeSettings {
    /// Load settings from a TOML file
    ///
    /// # Errors
    /// - `ConfigError::Io` if the file cannot be read
    /// - `ConfigError::Parse` if it is not valid settings TOML
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&raw, path)
    }

    /// Load settings from a file when it exists, defaults otherwise
    ///
    /// # Errors
    /// Returns `ConfigError` if the file exists but is unreadable or invalid
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "settings file absent, using defaults");
            Ok(Self::default())
        }
    }

    /// Parse settings from TOML text
    ///
    /// # Errors
    /// Returns `ConfigError::Parse` on malformed TOML or unknown keys
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Self::parse(raw, Path::new("<inline>"))
    }

    fn parse(raw: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(raw).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Serialize back to TOML
    ///
    /// # Errors
    /// Returns `ConfigError::InvalidSetting` if a value cannot be encoded
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::invalid("settings", e.to_string()))
    }

    #[must_use]
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.scan.prompt = prompt.into();
        self
    }

    #[must_use]
    pub fn with_providers(mut self, providers: Vec<String>) -> Self {
        self.scan.providers = providers;
        self
    }

    #[must_use]
    pub fn with_runs(mut self, runs: usize) -> Self {
        self.scan.runs = runs;
        self
    }

    #[must_use]
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.scan.temperature = temperature;
        self
    }

    #[must_use]
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.scan.threshold = threshold;
        self
    }

    #[must_use]
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output.dir = dir.into();
        self
    }

    /// Validated scan configuration
    ///
    /// # Errors
    /// Returns `ConfigError` for an invalid provider identifier or any
    /// out-of-range scan value
    pub fn scan_config(&self) -> Result<ScanConfig, ConfigError> {
        let providers = self
            .scan
            .providers
            .iter()
            .map(ProviderId::new)
            .collect::<Result<Vec<_>, _>>()?;
        ScanConfig::new(
            self.scan.prompt.clone(),
            providers,
            self.scan.runs,
            self.scan.temperature,
            self.scan.threshold,
        )
    }

    /// Validated analysis policy
    ///
    /// # Errors
    /// Returns `ConfigError::InvalidSetting` for out-of-range margins
    pub fn analysis_policy(&self) -> Result<AnalysisPolicy, ConfigError> {
        let policy = AnalysisPolicy {
            cross_margin: self.analysis.cross_margin,
            within_factor: self.analysis.within_factor,
            severity: SeverityPolicy {
                high_margin: self.analysis.high_margin,
                medium_margin: self.analysis.medium_margin,
            },
            cross_mode: self.analysis.cross_mode,
        };
        policy.validate()?;
        Ok(policy)
    }

    /// Validated sampling policy
    ///
    /// # Errors
    /// Returns `ConfigError::InvalidSetting` for unusable limits
    pub fn sampling_policy(&self) -> Result<SamplingPolicy, ConfigError> {
        let s = &self.sampling;
        if s.max_backoff_ms < s.initial_backoff_ms {
            return Err(ConfigError::invalid(
                "max_backoff_ms",
                "must not be below initial_backoff_ms",
            ));
        }
        let policy = SamplingPolicy {
            retry: RetryPolicy {
                max_attempts: s.max_attempts,
                initial_backoff: Duration::from_millis(s.initial_backoff_ms),
                multiplier: s.backoff_multiplier,
                max_backoff: Duration::from_millis(s.max_backoff_ms),
            },
            cycle_timeout: Duration::from_secs(s.cycle_timeout_secs),
            max_parallel_providers: s.max_parallel_providers,
        };
        policy.validate()?;
        Ok(policy)
    }

    /// Per-request timeout for provider adapters
    #[inline]
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.sampling.request_timeout_secs)
    }

    /// Validate every section
    ///
    /// # Errors
    /// Returns the first `ConfigError` found
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.scan_config()?;
        self.analysis_policy()?;
        self.sampling_policy()?;
        if self.sampling.request_timeout_secs == 0 {
            return Err(ConfigError::invalid("request_timeout_secs", "must be positive"));
        }
        if self.output.dir.as_os_str().is_empty() {
            return Err(ConfigError::invalid("output.dir", "must not be empty"));
        }
        Ok(())
    }
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_file_is_defaults() {
        let settings = ScopeSettings::from_toml_str("").unwrap();
        assert_eq!(settings, ScopeSettings::default());
        assert!(settings.validate().is_ok());

        let config = settings.scan_config().unwrap();
        assert_eq!(config.prompt(), DEFAULT_PROMPT);
        assert_eq!(config.runs(), 3);
        assert_eq!(config.providers().len(), 2);
    }

    #[test]
    fn partial_tables_keep_other_defaults() {
        let settings = ScopeSettings::from_toml_str(
            r#"
            [scan]
            runs = 5
            providers = ["openai"]

            [analysis]
            cross_mode = "best_match"
            metric = "term_cosine"
            "#,
        )
        .unwrap();

        assert_eq!(settings.scan.runs, 5);
        assert_eq!(settings.scan.threshold, 0.85);
        assert_eq!(settings.analysis.cross_mode, CrossMode::BestMatch);
        assert_eq!(settings.analysis.metric, MetricKind::TermCosine);
        assert_eq!(settings.sampling, SamplingSection::default());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = ScopeSettings::from_toml_str("[scan]\nrunz = 3\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let settings = ScopeSettings::default().with_threshold(1.5);
        assert!(matches!(settings.validate(), Err(ConfigError::InvalidThreshold(_))));

        let settings = ScopeSettings::default().with_runs(0);
        assert!(matches!(settings.validate(), Err(ConfigError::InvalidRuns(0))));

        let mut settings = ScopeSettings::default();
        settings.sampling.max_backoff_ms = 10;
        assert!(settings.sampling_policy().is_err());
    }

    #[test]
    fn defaults_survive_toml_roundtrip() {
        let raw = ScopeSettings::default().to_toml_string().unwrap();
        assert_eq!(ScopeSettings::from_toml_str(&raw).unwrap(), ScopeSettings::default());
    }

    #[test]
    fn overrides_apply() {
        let settings = ScopeSettings::default()
            .with_prompt("Why?")
            .with_providers(vec!["anthropic".into()])
            .with_temperature(0.2);
        let config = settings.scan_config().unwrap();
        assert_eq!(config.prompt(), "Why?");
        assert_eq!(config.temperature(), 0.2);
        assert_eq!(config.providers()[0].as_str(), "anthropic");
    }
}
