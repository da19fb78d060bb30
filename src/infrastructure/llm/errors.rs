use reqwest::StatusCode;
use thiserror::Error;

use crate::domain::errors::GenerationError;

/// Errors that can occur when talking to a chat completions endpoint
#[derive(Error, Debug)]
pub enum LlmApiError {
    /// Invalid request parameters (HTTP 400)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Invalid or missing API key (HTTP 401/403)
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Unknown model or endpoint (HTTP 404)
    #[error("Model not found: {0}")]
    NotFound(String),

    /// Rate limit exceeded (HTTP 429)
    #[error("Rate limit exceeded - too many requests")]
    RateLimitExceeded,

    /// Server error (HTTP 5xx)
    #[error("Server error ({0}): {1}")]
    ServerError(StatusCode, String),

    /// Network or connection error
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Unknown or unexpected status
    #[error("Unknown error ({0}): {1}")]
    UnknownError(StatusCode, String),
}

impl LlmApiError {
    /// Map a non-success HTTP status and its body to an error variant.
    pub fn from_status(status: StatusCode, body: String) -> Self {
        match status {
            StatusCode::BAD_REQUEST => Self::InvalidRequest(body),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Self::AuthenticationFailed(body),
            StatusCode::NOT_FOUND => Self::NotFound(body),
            StatusCode::TOO_MANY_REQUESTS => Self::RateLimitExceeded,
            status if status.is_server_error() => Self::ServerError(status, body),
            status => Self::UnknownError(status, body),
        }
    }
}

impl From<LlmApiError> for GenerationError {
    fn from(err: LlmApiError) -> Self {
        match err {
            LlmApiError::InvalidRequest(body) => Self::InvalidRequest(body),
            LlmApiError::AuthenticationFailed(body) => Self::AuthenticationFailed(body),
            LlmApiError::NotFound(body) => Self::ModelNotFound(body),
            LlmApiError::RateLimitExceeded => Self::RateLimited,
            LlmApiError::ServerError(status, body) | LlmApiError::UnknownError(status, body) => {
                Self::Service {
                    status: status.as_u16(),
                    body,
                }
            }
            LlmApiError::NetworkError(e) => Self::Transport(e.to_string()),
            LlmApiError::JsonError(e) => Self::MalformedResponse(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_429() {
        let error = LlmApiError::from_status(StatusCode::TOO_MANY_REQUESTS, String::new());
        assert!(matches!(error, LlmApiError::RateLimitExceeded));
        assert!(GenerationError::from(error).is_rate_limit());
    }

    #[test]
    fn test_from_status_404_is_fatal() {
        let error = LlmApiError::from_status(StatusCode::NOT_FOUND, "no such model".to_string());
        assert!(matches!(error, LlmApiError::NotFound(_)));
        assert!(GenerationError::from(error).is_fatal());
    }

    #[test]
    fn test_from_status_401_and_403() {
        for status in [StatusCode::UNAUTHORIZED, StatusCode::FORBIDDEN] {
            let error = LlmApiError::from_status(status, "denied".to_string());
            assert!(matches!(error, LlmApiError::AuthenticationFailed(_)));
        }
    }

    #[test]
    fn test_from_status_server_error() {
        let error = LlmApiError::from_status(StatusCode::BAD_GATEWAY, "upstream".to_string());
        assert!(matches!(error, LlmApiError::ServerError(StatusCode::BAD_GATEWAY, _)));

        let generation = GenerationError::from(error);
        assert!(!generation.is_fatal());
        assert!(!generation.is_rate_limit());
    }

    #[test]
    fn test_from_status_unknown() {
        let error = LlmApiError::from_status(StatusCode::IM_A_TEAPOT, "teapot".to_string());
        assert!(matches!(error, LlmApiError::UnknownError(_, _)));
        assert!(error.to_string().starts_with("Unknown error (418"));
    }
}
