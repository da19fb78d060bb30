use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::errors::GenerationError;

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single role-tagged message block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// A terminal response from the completion service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Completion {
    /// First textual completion, if the response carried one
    pub text: Option<String>,
    /// Raw response body, kept for diagnostics when `text` is missing
    pub raw: String,
}

/// Port trait for a remote text-completion service.
///
/// One call is one request. Implementations report a rate-limit signal as
/// [`GenerationError::RateLimited`] and leave retrying to the caller.
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Model identifier used for requests, for logging.
    fn model(&self) -> &str;

    async fn complete(&self, messages: &[ChatMessage]) -> Result<Completion, GenerationError>;
}
