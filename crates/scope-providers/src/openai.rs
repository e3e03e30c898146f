//! OpenAI chat-completions adapter
//!
//! One request per sampling call: the `n` parameter asks for every run at
//! once, and choices come back tagged with their index.

use crate::endpoint::{Endpoint, ProviderKind};
use crate::http::{read_json, transport_error};
use async_trait::async_trait;
use reqwest::{header, Client};
use scope_core::{ConfigError, Provider, ProviderError, ProviderId};
use serde::{Deserialize, Serialize};

/// OpenAI provider adapter
#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    id: ProviderId,
    client: Client,
    endpoint: Endpoint,
}

impl OpenAiProvider {
    /// Create adapter over a shared client
    ///
    /// # Errors
    /// Returns `ConfigError` if the endpoint is not an OpenAI endpoint
    pub fn new(client: Client, endpoint: Endpoint) -> Result<Self, ConfigError> {
        if endpoint.kind != ProviderKind::OpenAi {
            return Err(ConfigError::invalid(
                "endpoint",
                format!("expected openai endpoint, got {}", endpoint.kind),
            ));
        }
        Ok(Self {
            id: ProviderId::new(ProviderKind::OpenAi.name())?,
            client,
            endpoint,
        })
    }

    #[inline]
    #[must_use]
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f64,
    n: usize,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    index: usize,
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Completion texts in choice order, trimmed
fn completions(response: ChatResponse) -> Result<Vec<String>, ProviderError> {
    if response.choices.is_empty() {
        return Err(ProviderError::MalformedResponse("no choices in response".into()));
    }
    let mut choices = response.choices;
    choices.sort_by_key(|c| c.index);
    Ok(choices
        .into_iter()
        .map(|c| c.message.content.unwrap_or_default().trim().to_string())
        .collect())
}

#[async_trait]
impl Provider for OpenAiProvider {
    fn id(&self) -> ProviderId {
        self.id.clone()
    }

    async fn generate(
        &self,
        prompt: &str,
        temperature: f64,
        n: usize,
    ) -> Result<Vec<String>, ProviderError> {
        let key = self
            .endpoint
            .api_key
            .as_deref()
            .ok_or_else(|| ProviderError::MissingCredentials(ProviderKind::OpenAi.key_var().into()))?;

        let body = ChatRequest {
            model: &self.endpoint.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature,
            n,
            max_tokens: self.endpoint.max_tokens,
        };

        tracing::debug!(model = %self.endpoint.model, n, temperature, "openai request");

        let response = self
            .client
            .post(self.endpoint.url("chat/completions"))
            .header(header::AUTHORIZATION, format!("Bearer {key}"))
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(&e))?;

        completions(read_json(response).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn choices_are_ordered_by_index() {
        let raw = r#"{
            "id": "chatcmpl-1",
            "choices": [
                {"index": 2, "message": {"role": "assistant", "content": " third "}},
                {"index": 0, "message": {"role": "assistant", "content": "first"}},
                {"index": 1, "message": {"role": "assistant", "content": null}}
            ]
        }"#;
        let response: ChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(completions(response).unwrap(), vec!["first", "", "third"]);
    }

    #[test]
    fn empty_choices_is_malformed() {
        let response: ChatResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert!(matches!(
            completions(response),
            Err(ProviderError::MalformedResponse(_))
        ));
    }

    #[test]
    fn request_shape() {
        let body = ChatRequest {
            model: "gpt-4o-mini",
            messages: [ChatMessage {
                role: "user",
                content: "hi",
            }],
            temperature: 0.9,
            n: 3,
            max_tokens: 256,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["n"], 3);
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "hi");
    }

    #[tokio::test]
    async fn missing_key_fails_without_network() {
        let provider =
            OpenAiProvider::new(Client::new(), Endpoint::new(ProviderKind::OpenAi)).unwrap();
        let err = provider.generate("hi", 0.5, 1).await.unwrap_err();
        assert_eq!(err, ProviderError::MissingCredentials("OPENAI_API_KEY".into()));
        assert!(!err.is_transient());
    }

    #[test]
    fn rejects_foreign_endpoint() {
        assert!(OpenAiProvider::new(Client::new(), Endpoint::new(ProviderKind::Anthropic)).is_err());
    }
}
