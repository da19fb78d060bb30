//! Retrying wrapper around a completion service.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::backoff::BackoffPolicy;
use crate::domain::errors::GenerationError;
use crate::domain::ports::{ChatMessage, CompletionService, Sleeper, TokioSleeper};

/// Fence openers stripped from completions, first match wins.
const FENCE_PREFIXES: [&str; 2] = ["```def", "```"];
const FENCE: &str = "```";

/// One logical generation request with rate-limit backoff.
///
/// Outcomes of [`invoke`](Self::invoke):
/// - text of the first completion, fences stripped
/// - empty string when the service answered without text, failed softly, or
///   kept rate limiting until the attempts ran out
/// - `Err` only for fatal errors (unknown model, rejected credentials)
#[derive(Clone)]
pub struct GenerationClient {
    service: Arc<dyn CompletionService>,
    policy: BackoffPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl std::fmt::Debug for GenerationClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationClient")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl GenerationClient {
    pub fn new(service: Arc<dyn CompletionService>, policy: BackoffPolicy) -> Self {
        Self::with_sleeper(service, policy, Arc::new(TokioSleeper))
    }

    pub fn with_sleeper(
        service: Arc<dyn CompletionService>,
        policy: BackoffPolicy,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        Self {
            service,
            policy,
            sleeper,
        }
    }

    /// Model identifier of the underlying service.
    pub fn model(&self) -> &str {
        self.service.model()
    }

    pub fn policy(&self) -> &BackoffPolicy {
        &self.policy
    }

    /// Send each system message as its own block, then the user prompt.
    pub async fn invoke(
        &self,
        system_messages: &[String],
        user_prompt: &str,
    ) -> Result<String, GenerationError> {
        let messages: Vec<ChatMessage> = system_messages
            .iter()
            .map(|m| ChatMessage::system(m.as_str()))
            .chain(std::iter::once(ChatMessage::user(user_prompt)))
            .collect();

        for attempt in 0..self.policy.max_attempts {
            match self.service.complete(&messages).await {
                Ok(completion) => {
                    let Some(text) = completion.text else {
                        warn!(model = %self.model(), "Completion carried no text");
                        debug!(raw = %completion.raw, "Raw completion payload");
                        return Ok(String::new());
                    };
                    info!(model = %self.model(), attempt, chars = text.len(), "Completion received");
                    return Ok(strip_code_fences(&text));
                }
                Err(err) if err.is_rate_limit() => {
                    let delay = self.policy.delay_for(attempt);
                    warn!(
                        model = %self.model(),
                        attempt = attempt + 1,
                        max_attempts = self.policy.max_attempts,
                        delay_secs = delay.as_secs_f64(),
                        "Rate limited, backing off"
                    );
                    self.sleeper.sleep(delay).await;
                }
                Err(err) if err.is_fatal() => {
                    tracing::error!(model = %self.model(), error = %err, "Fatal generation error");
                    return Err(err);
                }
                Err(err) => {
                    warn!(model = %self.model(), error = %err, "Generation failed, returning empty output");
                    return Ok(String::new());
                }
            }
        }

        warn!(
            model = %self.model(),
            max_attempts = self.policy.max_attempts,
            "Rate limit retries exhausted, returning empty output"
        );
        Ok(String::new())
    }
}

/// Remove a surrounding markdown code fence from a completion.
pub fn strip_code_fences(text: &str) -> String {
    let mut body = text.trim();
    if let Some(rest) = FENCE_PREFIXES
        .iter()
        .find_map(|prefix| body.strip_prefix(prefix))
    {
        body = rest.trim();
    }
    if let Some(rest) = body.strip_suffix(FENCE) {
        body = rest;
    }
    body.trim().to_string()
}
