use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{header, Client as ReqwestClient, Response};
use tracing::{debug, info, instrument, warn};

use super::errors::LlmApiError;
use super::types::{ChatCompletionRequest, ChatCompletionResponse};
use crate::domain::errors::GenerationError;
use crate::domain::models::ModelProfile;
use crate::domain::ports::{ChatMessage, Completion, CompletionService};

/// Configuration for the chat completions HTTP client
#[derive(Debug, Clone)]
pub struct ChatClientConfig {
    /// Model identifier sent with every request
    pub model: String,

    /// Base URL, `/chat/completions` is appended
    pub base_url: String,

    /// Bearer token
    pub api_key: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl ChatClientConfig {
    /// Build a config from a catalog profile, reading the API key from the
    /// environment variable the profile names.
    pub fn from_profile(profile: &ModelProfile, timeout_secs: u64) -> Result<Self> {
        let api_key = std::env::var(&profile.api_key_env).with_context(|| {
            format!(
                "{} environment variable not set (required by model {})",
                profile.api_key_env, profile.model
            )
        })?;

        Ok(Self {
            model: profile.model.clone(),
            base_url: profile.base_url.trim_end_matches('/').to_string(),
            api_key,
            timeout_secs,
        })
    }
}

/// HTTP client for OpenAI-compatible chat completion endpoints.
///
/// Sends exactly one request per [`CompletionService::complete`] call;
/// backoff on rate limits lives in
/// [`GenerationClient`](crate::services::GenerationClient).
pub struct ChatCompletionsClient {
    http_client: ReqwestClient,
    model: String,
    endpoint: String,
}

impl ChatCompletionsClient {
    pub fn new(config: ChatClientConfig) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        let mut auth = header::HeaderValue::from_str(&format!("Bearer {}", config.api_key))
            .context("API key contains characters not allowed in a header")?;
        auth.set_sensitive(true);
        headers.insert(header::AUTHORIZATION, auth);

        let http_client = ReqwestClient::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(2)
            .tcp_nodelay(true)
            .default_headers(headers)
            .build()
            .context("Failed to build HTTP client")?;

        info!(
            model = %config.model,
            base_url = %config.base_url,
            timeout_secs = config.timeout_secs,
            "Initialized chat completions client"
        );

        Ok(Self {
            http_client,
            endpoint: format!("{}/chat/completions", config.base_url),
            model: config.model,
        })
    }

    async fn handle_response(&self, response: Response) -> Result<Completion, LlmApiError> {
        let status = response.status();
        debug!(%status, "Response status");

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error body".to_string());
            warn!(%status, body = %body, "Completion request failed");
            return Err(LlmApiError::from_status(status, body));
        }

        let raw = response.text().await?;
        let text = match serde_json::from_str::<ChatCompletionResponse>(&raw) {
            Ok(parsed) => parsed.first_text().map(str::to_string),
            Err(e) => {
                warn!(error = %e, "Completion response did not match the expected shape");
                None
            }
        };

        Ok(Completion { text, raw })
    }
}

#[async_trait]
impl CompletionService for ChatCompletionsClient {
    fn model(&self) -> &str {
        &self.model
    }

    #[instrument(skip(self, messages), fields(model = %self.model, messages = messages.len()))]
    async fn complete(&self, messages: &[ChatMessage]) -> Result<Completion, GenerationError> {
        let request = ChatCompletionRequest {
            model: &self.model,
            messages,
        };

        debug!(endpoint = %self.endpoint, "POST");
        let response = self
            .http_client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(LlmApiError::from)?;

        Ok(self.handle_response(response).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> ModelProfile {
        ModelProfile {
            model: "codestral-latest".to_string(),
            base_url: "https://api.mistral.ai/v1/".to_string(),
            api_key_env: "COVSEED_TEST_MISTRAL_KEY".to_string(),
        }
    }

    #[test]
    fn test_config_from_profile() {
        temp_env::with_var("COVSEED_TEST_MISTRAL_KEY", Some("secret"), || {
            let config = ChatClientConfig::from_profile(&profile(), 30).unwrap();
            assert_eq!(config.api_key, "secret");
            assert_eq!(config.base_url, "https://api.mistral.ai/v1");
            assert_eq!(config.model, "codestral-latest");
        });
    }

    #[test]
    fn test_config_from_profile_missing_key() {
        temp_env::with_var_unset("COVSEED_TEST_MISTRAL_KEY", || {
            let err = ChatClientConfig::from_profile(&profile(), 30).unwrap_err();
            assert!(err.to_string().contains("COVSEED_TEST_MISTRAL_KEY"));
        });
    }

    #[test]
    fn test_client_endpoint() {
        let client = ChatCompletionsClient::new(ChatClientConfig {
            model: "o3".to_string(),
            base_url: "http://localhost:9999/v1".to_string(),
            api_key: "k".to_string(),
            timeout_secs: 5,
        })
        .unwrap();
        assert_eq!(client.endpoint, "http://localhost:9999/v1/chat/completions");
        assert_eq!(client.model(), "o3");
    }
}
