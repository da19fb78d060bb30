/// Request and response types for OpenAI-compatible chat completions
use serde::{Deserialize, Serialize};

use crate::domain::ports::ChatMessage;

/// Chat completion request body
#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest<'a> {
    /// Model identifier (e.g., "codestral-latest")
    pub model: &'a str,

    /// System blocks followed by the user prompt
    pub messages: &'a [ChatMessage],
}

/// Chat completion response body
///
/// Only the fields needed to extract the first completion are modelled;
/// everything else in the payload is ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    #[serde(default)]
    pub message: Option<ChoiceMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChoiceMessage {
    /// Text content; `null` or a non-string value yields no completion
    #[serde(default)]
    pub content: Option<serde_json::Value>,
}

impl ChatCompletionResponse {
    /// First choice's message content, when it is a string.
    pub fn first_text(&self) -> Option<&str> {
        self.choices
            .first()?
            .message
            .as_ref()?
            .content
            .as_ref()?
            .as_str()
    }
}
