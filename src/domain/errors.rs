//! Domain errors for the covseed synthesis loop.

use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by a completion service.
///
/// Only [`GenerationError::RateLimited`] is retried; [`is_fatal`](Self::is_fatal)
/// errors abort the run, everything else degrades to an empty completion.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Service error ({status}): {body}")]
    Service { status: u16, body: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

impl GenerationError {
    pub const fn is_rate_limit(&self) -> bool {
        matches!(self, Self::RateLimited)
    }

    /// Errors that no amount of retrying will fix.
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::ModelNotFound(_) | Self::AuthenticationFailed(_))
    }
}

/// Errors raised by the verification oracle adapter.
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("Verification tool '{0}' not found")]
    ExecutableNotFound(String),

    #[error("Verification script not found: {}", .0.display())]
    ScriptNotFound(PathBuf),

    #[error("Failed to write bundled checker script to {}: {source}", path.display())]
    BundledScript {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to run verification tool '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Invalid target selection window.
#[derive(Debug, Error, PartialEq)]
pub enum SelectionError {
    #[error("{name} must be between 0.0 and 100.0, got {value}")]
    ThresholdOutOfRange { name: &'static str, value: f64 },

    #[error("min-threshold ({min}) must be less than threshold ({max})")]
    InvertedWindow { min: f64, max: f64 },
}

/// Errors that abort processing of a target and the run with it.
///
/// Soft per-target failures (rejections, empty completions, unreadable
/// sources) are reported through outcomes, not through this type.
#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("Generation failed: {0}")]
    Generation(#[from] GenerationError),

    #[error("Verification failed: {0}")]
    Oracle(#[from] OracleError),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write provenance: {0}")]
    Provenance(#[from] serde_json::Error),
}

impl SynthesisError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type SynthesisResult<T> = Result<T, SynthesisError>;
