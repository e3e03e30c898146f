//! Concurrent provider sampling
//!
//! Fan-out/fan-in over providers:
//! - One future per provider, at most `max_parallel_providers` in flight
//! - Transient errors retried with exponential backoff
//! - A shared cycle deadline; calls still pending at the deadline become
//!   coverage gaps
//!
//! The sample set is assembled only after every provider future settles.

use crate::error::{ConfigError, ProviderError};
use crate::provider::Provider;
use crate::types::{CoverageGap, GapReason, ProviderId, SampleSet, ScanConfig};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::Instant;

/// Retry policy for transient provider errors
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub multiplier: f64,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(500),
            multiplier: 2.0,
            max_backoff: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    /// Policy that never retries
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay after failed attempt number `attempt` (1-based)
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exp = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let secs = self.initial_backoff.as_secs_f64() * self.multiplier.powi(exp);
        if !secs.is_finite() || secs >= self.max_backoff.as_secs_f64() {
            self.max_backoff
        } else {
            Duration::from_secs_f64(secs.max(0.0))
        }
    }

    /// Delay before retrying `error`, honoring a server-suggested wait
    #[must_use]
    pub fn delay_for(&self, attempt: u32, error: &ProviderError) -> Duration {
        let base = self.backoff(attempt);
        match error.retry_after() {
            Some(wait) => wait.max(base).min(self.max_backoff),
            None => base,
        }
    }
}

/// Longest accepted cycle deadline
pub const MAX_CYCLE_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);

/// Sampling limits for one cycle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplingPolicy {
    pub retry: RetryPolicy,
    /// Wall-clock bound on the whole sampling stage
    pub cycle_timeout: Duration,
    pub max_parallel_providers: usize,
}

impl Default for SamplingPolicy {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            cycle_timeout: Duration::from_secs(120),
            max_parallel_providers: 4,
        }
    }
}

impl SamplingPolicy {
    /// Check limits are usable
    ///
    /// # Errors
    /// Returns `ConfigError::InvalidSetting` naming the offending field
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::invalid("max_attempts", "must be at least 1"));
        }
        if !(self.retry.multiplier.is_finite() && self.retry.multiplier >= 1.0) {
            return Err(ConfigError::invalid("backoff_multiplier", "must be >= 1"));
        }
        if self.cycle_timeout.is_zero() {
            return Err(ConfigError::invalid("cycle_timeout", "must be positive"));
        }
        if self.cycle_timeout > MAX_CYCLE_TIMEOUT {
            return Err(ConfigError::invalid("cycle_timeout", "must not exceed 24h"));
        }
        if self.max_parallel_providers == 0 {
            return Err(ConfigError::invalid("max_parallel_providers", "must be at least 1"));
        }
        Ok(())
    }
}

/// Result of the sampling stage
#[derive(Debug, Clone, Default)]
pub struct SamplingOutcome {
    /// Samples of every provider that succeeded, in configuration order
    pub samples: SampleSet,
    /// Providers that produced nothing, in configuration order
    pub gaps: Vec<CoverageGap>,
}

/// Sample every provider concurrently
///
/// Never fails as a whole: each provider either contributes exactly
/// `config.runs()` samples or becomes a coverage gap.
pub async fn sample_all(
    providers: Vec<(ProviderId, Arc<dyn Provider>)>,
    config: &ScanConfig,
    policy: &SamplingPolicy,
) -> SamplingOutcome {
    let deadline = Instant::now() + policy.cycle_timeout.min(MAX_CYCLE_TIMEOUT);
    let permits = Arc::new(Semaphore::new(policy.max_parallel_providers.max(1)));

    let tasks = providers.into_iter().map(|(id, provider)| {
        let permits = Arc::clone(&permits);
        async move {
            let outcome = tokio::time::timeout_at(deadline, async {
                let _permit = permits.acquire().await.map_err(|_| GapReason::Failed {
                    error: "sampling cancelled".to_string(),
                    attempts: 0,
                })?;
                generate_with_retry(&id, provider.as_ref(), config, &policy.retry).await
            })
            .await
            .unwrap_or(Err(GapReason::TimedOut));
            (id, outcome)
        }
    });

    // Single join point: nothing is assembled until every provider settles
    let settled = join_all(tasks).await;

    let mut outcome = SamplingOutcome::default();
    for (id, result) in settled {
        match result {
            Ok(samples) => outcome.samples.insert(id, samples),
            Err(reason) => {
                tracing::warn!(provider = %id, reason = %reason, "coverage gap");
                outcome.gaps.push(CoverageGap::new(id, reason));
            }
        }
    }
    outcome
}

async fn generate_with_retry(
    id: &ProviderId,
    provider: &dyn Provider,
    config: &ScanConfig,
    retry: &RetryPolicy,
) -> Result<Vec<String>, GapReason> {
    let max_attempts = retry.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        let result = provider
            .generate(config.prompt(), config.temperature(), config.runs())
            .await
            .and_then(|samples| {
                if samples.len() == config.runs() {
                    Ok(samples)
                } else {
                    Err(ProviderError::MalformedResponse(format!(
                        "expected {} samples, got {}",
                        config.runs(),
                        samples.len()
                    )))
                }
            });

        match result {
            Ok(samples) => {
                tracing::debug!(provider = %id, attempt, samples = samples.len(), "provider sampled");
                return Ok(samples);
            }
            Err(error) if error.is_transient() && attempt < max_attempts => {
                let delay = retry.delay_for(attempt, &error);
                tracing::warn!(
                    provider = %id,
                    attempt,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %error,
                    "transient provider error, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(error) => {
                return Err(GapReason::Failed {
                    error: error.to_string(),
                    attempts: attempt,
                });
            }
        }
    }
}
