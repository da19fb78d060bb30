//! Domain models for coverage-guided synthesis.

pub mod attempt;
pub mod config;
pub mod coverage;
pub mod target;

pub use attempt::{ArtifactLayout, Attempt, PromptKind, Provenance, SynthesisOutcome, Verdict};
pub use config::{
    Config, GenerationConfig, LoggingConfig, ModelProfile, OracleConfig, RetryConfig, RunConfig,
};
pub use coverage::{Coverage, CoverageError, CoverageRecord, FunctionCoverage};
pub use target::{Target, TargetMode};
