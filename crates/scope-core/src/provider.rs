//! Provider client adapters
//!
//! A [`Provider`] turns `(prompt, temperature, n)` into `n` completions.
//! Adapters are stateless between calls and never retry on their own; the
//! sampler owns retry policy. The [`ProviderRegistry`] maps identifiers to
//! adapters so new providers plug in without touching the analyzer.

use crate::error::{ConfigError, ProviderError};
use crate::types::ProviderId;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// Text-completion capability of one AI provider
#[async_trait]
pub trait Provider: Send + Sync + 'static {
    /// Identifier this adapter registers under
    fn id(&self) -> ProviderId;

    /// Generate `n` completions for the same prompt and temperature
    ///
    /// # Errors
    /// Returns `ProviderError` on authentication, rate-limit, timeout or
    /// malformed-response failures
    async fn generate(
        &self,
        prompt: &str,
        temperature: f64,
        n: usize,
    ) -> Result<Vec<String>, ProviderError>;
}

impl std::fmt::Debug for dyn Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Provider").field("id", &self.id()).finish()
    }
}

/// Registry of adapters keyed by provider identifier
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<ProviderId, Arc<dyn Provider>>,
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.ids())
            .finish()
    }
}

impl ProviderRegistry {
    /// Create empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter under its own identifier
    ///
    /// Replaces any adapter already registered under that identifier.
    pub fn register<P: Provider>(&mut self, provider: P) {
        let provider: Arc<dyn Provider> = Arc::new(provider);
        self.providers.insert(provider.id(), provider);
    }

    /// Register a shared adapter under an explicit identifier
    pub fn register_shared(&mut self, id: ProviderId, provider: Arc<dyn Provider>) {
        self.providers.insert(id, provider);
    }

    /// Builder-style registration
    #[must_use]
    pub fn with<P: Provider>(mut self, provider: P) -> Self {
        self.register(provider);
        self
    }

    /// Adapter for an identifier
    #[inline]
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Arc<dyn Provider>> {
        self.providers.get(id).cloned()
    }

    #[inline]
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.providers.contains_key(id)
    }

    /// Registered identifiers, sorted
    #[must_use]
    pub fn ids(&self) -> Vec<ProviderId> {
        let mut ids: Vec<_> = self.providers.keys().cloned().collect();
        ids.sort();
        ids
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Resolve adapters for every requested provider, in order
    ///
    /// # Errors
    /// Returns `ConfigError::UnknownProvider` for the first identifier with
    /// no registered adapter
    pub fn resolve(
        &self,
        ids: &[ProviderId],
    ) -> Result<Vec<(ProviderId, Arc<dyn Provider>)>, ConfigError> {
        ids.iter()
            .map(|id| {
                self.get(id.as_str())
                    .map(|p| (id.clone(), p))
                    .ok_or_else(|| ConfigError::UnknownProvider(id.to_string()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo(&'static str);

    #[async_trait]
    impl Provider for Echo {
        fn id(&self) -> ProviderId {
            ProviderId::new(self.0).unwrap()
        }

        async fn generate(
            &self,
            prompt: &str,
            _temperature: f64,
            n: usize,
        ) -> Result<Vec<String>, ProviderError> {
            Ok(vec![prompt.to_string(); n])
        }
    }

    #[tokio::test]
    async fn registry_register_and_generate() {
        let registry = ProviderRegistry::new().with(Echo("openai")).with(Echo("anthropic"));
        assert_eq!(registry.len(), 2);
        assert!(registry.contains("openai"));

        let provider = registry.get("anthropic").unwrap();
        let out = provider.generate("hi", 0.5, 3).await.unwrap();
        assert_eq!(out, vec!["hi", "hi", "hi"]);
    }

    #[test]
    fn registry_resolve_unknown() {
        let registry = ProviderRegistry::new().with(Echo("openai"));
        let ids = vec![
            ProviderId::new("openai").unwrap(),
            ProviderId::new("mistral").unwrap(),
        ];
        let err = registry.resolve(&ids).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownProvider(ref p) if p == "mistral"));
    }

    #[test]
    fn registry_ids_sorted() {
        let registry = ProviderRegistry::new().with(Echo("zeta")).with(Echo("alpha"));
        let ids: Vec<_> = registry.ids().into_iter().map(|p| p.to_string()).collect();
        assert_eq!(ids, vec!["alpha", "zeta"]);
    }
}
