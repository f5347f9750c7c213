//! Generative model client.
//!
//! Flows only depend on the [`GenerativeModel`] trait; the OpenAI-compatible
//! implementation lives here as well.

use std::time::Duration;

use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_openai::types::chat::{
    ChatCompletionRequestMessage, ChatCompletionRequestUserMessage,
    CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::{MAX_RETRIES_LIMIT, ModelConfig};
use crate::error::MentorError;

/// Anything that turns a rendered prompt into model text.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    async fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String, MentorError>;
}

/// Connection settings for an OpenAI-compatible endpoint.
#[derive(Debug, Clone)]
pub struct ApiSettings {
    /// OpenAI-compatible API base URL.
    pub api_base: String,
    /// API key for authentication.
    pub api_key: String,
}

impl ApiSettings {
    pub fn new(api_base: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            api_base: api_base.into(),
            api_key: api_key.into(),
        }
    }
}

/// A [`GenerativeModel`] backed by any OpenAI-compatible chat completions API.
pub struct OpenAICompatibleModel {
    client: Client<OpenAIConfig>,
    model: String,
    max_retries: u32,
}

impl OpenAICompatibleModel {
    pub fn new(settings: &ApiSettings, model: &ModelConfig) -> Result<Self, MentorError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(model.request_timeout_secs))
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| {
                MentorError::ConfigError(format!("Failed to create HTTP client: {}", e))
            })?;

        let config = OpenAIConfig::new()
            .with_api_key(&settings.api_key)
            .with_api_base(&settings.api_base);

        Ok(Self {
            client: Client::with_config(config).with_http_client(http_client),
            model: model.name.clone(),
            max_retries: model.max_retries.clamp(1, MAX_RETRIES_LIMIT),
        })
    }
}

#[async_trait]
impl GenerativeModel for OpenAICompatibleModel {
    async fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String, MentorError> {
        let messages = vec![ChatCompletionRequestMessage::User(
            ChatCompletionRequestUserMessage {
                content: prompt.to_string().into(),
                name: None,
            },
        )];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .max_completion_tokens(max_tokens)
            .messages(messages)
            .build()?;

        let mut last_error = None;

        for attempt in 0..self.max_retries {
            if attempt > 0 {
                tokio::time::sleep(backoff_delay(attempt)).await;
            }

            match self.client.chat().create(request.clone()).await {
                Ok(response) => {
                    let content = response
                        .choices
                        .first()
                        .and_then(|c| c.message.content.clone())
                        .unwrap_or_default();
                    debug!(
                        model = %self.model,
                        attempt,
                        chars = content.len(),
                        "Completion received"
                    );

                    if content.trim().is_empty() {
                        return Err(MentorError::invalid_response(
                            self.model.as_str(),
                            "model returned no content",
                        ));
                    }
                    return Ok(content);
                }
                Err(e) => {
                    warn!(model = %self.model, attempt, error = %e, "Completion request failed");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.map(MentorError::from).unwrap_or_else(|| {
            MentorError::ConfigError("Unknown API error after retries".to_string())
        }))
    }
}

/// Wait before retry `attempt` (1-based): 1s, 2s, 4s, ...
fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_secs(2u64.saturating_pow(attempt.saturating_sub(1)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles() {
        assert_eq!(backoff_delay(1), Duration::from_secs(1));
        assert_eq!(backoff_delay(2), Duration::from_secs(2));
        assert_eq!(backoff_delay(4), Duration::from_secs(8));
    }

    #[test]
    fn test_backoff_saturates_for_large_attempts() {
        assert_eq!(backoff_delay(64), Duration::from_secs(1 << 63));
        assert_eq!(backoff_delay(65), Duration::from_secs(u64::MAX));
        assert_eq!(backoff_delay(u32::MAX), Duration::from_secs(u64::MAX));
    }
}
