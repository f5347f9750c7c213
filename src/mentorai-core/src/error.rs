//! Error types for the learning assistant.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MentorError {
    #[error("Invalid persona count: expected {min}-{max}, got {actual}")]
    InvalidPersonaCount {
        min: usize,
        max: usize,
        actual: usize,
    },

    #[error("Invalid {field}: {message}")]
    Validation { field: String, message: String },

    #[error("OpenAI API error: {0}")]
    OpenAIError(#[from] async_openai::error::OpenAIError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Template error: {0}")]
    TemplateError(String),

    #[error("Flow '{flow}' returned an invalid response: {reason}")]
    InvalidResponse { flow: String, reason: String },

    #[error("TTS error: {0}")]
    TtsError(String),

    #[error("Unknown orchestration mode: {0}")]
    UnknownMode(String),

    #[error("Unknown voice: {0}")]
    UnknownVoice(String),
}

impl MentorError {
    /// Shorthand for a field validation failure.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn invalid_response(flow: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidResponse {
            flow: flow.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error was raised before any collaborator was called.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::Validation { .. } | Self::InvalidPersonaCount { .. }
        )
    }
}
