//! AnomalyScope Providers
//!
//! HTTP adapters implementing [`scope_core::Provider`] for the built-in
//! provider families. Credentials, models and base URLs come from the
//! process environment:
//!
//! | Provider    | Key                 | Model             | Base URL             |
//! |-------------|---------------------|-------------------|----------------------|
//! | `openai`    | `OPENAI_API_KEY`    | `OPENAI_MODEL`    | `OPENAI_BASE_URL`    |
//! | `anthropic` | `ANTHROPIC_API_KEY` | `ANTHROPIC_MODEL` | `ANTHROPIC_BASE_URL` |
//!
//! A provider without a key still registers; its calls fail with
//! `MissingCredentials` and the scan reports it as a coverage gap.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod anthropic;
mod endpoint;
mod http;
mod openai;

pub use anthropic::{AnthropicProvider, ANTHROPIC_VERSION};
pub use endpoint::{Endpoint, ProviderKind};
pub use http::{build_client, retry_after, status_error};
pub use openai::OpenAiProvider;

use reqwest::Client;
use scope_core::{ConfigError, ProviderId, ProviderRegistry};
use std::time::Duration;

/// Register the adapter for one endpoint
///
/// # Errors
/// Returns `ConfigError` if the adapter rejects the endpoint
pub fn register(
    registry: &mut ProviderRegistry,
    client: &Client,
    endpoint: Endpoint,
) -> Result<(), ConfigError> {
    if endpoint.api_key.is_none() {
        tracing::warn!(
            provider = %endpoint.kind,
            var = endpoint.kind.key_var(),
            "no API key configured; provider will be skipped"
        );
    }
    match endpoint.kind {
        ProviderKind::OpenAi => registry.register(OpenAiProvider::new(client.clone(), endpoint)?),
        ProviderKind::Anthropic => {
            registry.register(AnthropicProvider::new(client.clone(), endpoint)?);
        }
    }
    Ok(())
}

/// Registry of the requested built-in providers, configured from the
/// environment
///
/// # Errors
/// - `ConfigError::UnknownProvider` for an identifier with no built-in adapter
/// - `ConfigError::InvalidSetting` if the HTTP client cannot be built
pub fn default_registry(
    providers: &[ProviderId],
    request_timeout: Duration,
) -> Result<ProviderRegistry, ConfigError> {
    registry_with(providers, request_timeout, Endpoint::from_env)
}

/// Registry of the requested built-in providers with custom endpoints
///
/// # Errors
/// Same as [`default_registry`]
pub fn registry_with(
    providers: &[ProviderId],
    request_timeout: Duration,
    endpoint_for: impl Fn(ProviderKind) -> Endpoint,
) -> Result<ProviderRegistry, ConfigError> {
    let kinds = providers
        .iter()
        .map(ProviderKind::from_id)
        .collect::<Result<Vec<_>, _>>()?;

    let client = build_client(request_timeout)?;
    let mut registry = ProviderRegistry::new();
    for kind in kinds {
        register(&mut registry, &client, endpoint_for(kind))?;
    }
    Ok(registry)
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
