//! Anthropic messages adapter
//!
//! The messages API returns one completion per request, so a sampling call
//! issues `n` requests concurrently and fails if any of them fails.

use crate::endpoint::{Endpoint, ProviderKind};
use crate::http::{read_json, transport_error};
use async_trait::async_trait;
use futures::future::try_join_all;
use reqwest::Client;
use scope_core::{ConfigError, Provider, ProviderError, ProviderId};
use serde::{Deserialize, Serialize};

/// API version header value
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Highest temperature the messages API accepts
const MAX_TEMPERATURE: f64 = 1.0;

/// Anthropic provider adapter
#[derive(Debug, Clone)]
pub struct AnthropicProvider {
    id: ProviderId,
    client: Client,
    endpoint: Endpoint,
}

impl AnthropicProvider {
    /// Create adapter over a shared client
    ///
    /// # Errors
    /// Returns `ConfigError` if the endpoint is not an Anthropic endpoint
    pub fn new(client: Client, endpoint: Endpoint) -> Result<Self, ConfigError> {
        if endpoint.kind != ProviderKind::Anthropic {
            return Err(ConfigError::invalid(
                "endpoint",
                format!("expected anthropic endpoint, got {}", endpoint.kind),
            ));
        }
        Ok(Self {
            id: ProviderId::new(ProviderKind::Anthropic.name())?,
            client,
            endpoint,
        })
    }

    #[inline]
    #[must_use]
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    async fn complete_once(&self, key: &str, body: &MessagesRequest<'_>) -> Result<String, ProviderError> {
        let response = self
            .client
            .post(self.endpoint.url("messages"))
            .header("x-api-key", key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(body)
            .send()
            .await
            .map_err(|e| transport_error(&e))?;

        completion_text(read_json(response).await?)
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f64,
    messages: [Message<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

/// Concatenated text blocks, trimmed
fn completion_text(response: MessagesResponse) -> Result<String, ProviderError> {
    let text: String = response
        .content
        .iter()
        .filter(|block| block.kind == "text")
        .map(|block| block.text.as_str())
        .collect();
    if response.content.is_empty() {
        return Err(ProviderError::MalformedResponse("no content blocks in response".into()));
    }
    Ok(text.trim().to_string())
}

#[async_trait]
impl Provider for AnthropicProvider {
    fn id(&self) -> ProviderId {
        self.id.clone()
    }

    async fn generate(
        &self,
        prompt: &str,
        temperature: f64,
        n: usize,
    ) -> Result<Vec<String>, ProviderError> {
        let key = self.endpoint.api_key.as_deref().ok_or_else(|| {
            ProviderError::MissingCredentials(ProviderKind::Anthropic.key_var().into())
        })?;

        let body = MessagesRequest {
            model: &self.endpoint.model,
            max_tokens: self.endpoint.max_tokens,
            temperature: temperature.clamp(0.0, MAX_TEMPERATURE),
            messages: [Message {
                role: "user",
                content: prompt,
            }],
        };

        tracing::debug!(model = %self.endpoint.model, n, temperature = body.temperature, "anthropic request");

        try_join_all((0..n).map(|_| self.complete_once(key, &body))).await
    }
}
