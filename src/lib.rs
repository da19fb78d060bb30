//! covseed - coverage-guided synthesis of test designs
//!
//! covseed reads a line-coverage report of a tool's source tree, picks the
//! files (or functions) that tests barely reach, and asks a language model
//! for DEF designs that should exercise them. Every candidate is checked by
//! an external tool; rejected candidates go back to the model together with
//! the checker's diagnostic until one is accepted or the retry budget runs
//! out.
//!
//! # Architecture
//!
//! - **Domain Layer** (`domain`): coverage model, targets, attempts, errors
//!   and the ports the services depend on
//! - **Service Layer** (`services`): target selection, generation with
//!   backoff, the synthesis agent and the run controller
//! - **Infrastructure Layer** (`infrastructure`): configuration, logging,
//!   the chat completions client and the process-based checker
//! - **CLI Layer** (`cli`): command-line interface

pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

pub use domain::models::{Config, Coverage, CoverageRecord, Target, TargetMode};
pub use domain::ports::{CompletionService, Sleeper, VerificationOracle};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{GenerationClient, RunController, RunSummary, SynthesisAgent, TargetSelector};
