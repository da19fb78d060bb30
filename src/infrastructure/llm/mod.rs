pub mod client;
pub mod errors;
pub mod types;

pub use client::{ChatClientConfig, ChatCompletionsClient};
pub use errors::LlmApiError;
pub use types::{ChatCompletionRequest, ChatCompletionResponse};
