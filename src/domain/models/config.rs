use std::path::PathBuf;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Main configuration structure for covseed
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Completion service configuration
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Rate-limit retry policy
    #[serde(default)]
    pub retry: RetryConfig,

    /// Verification oracle configuration
    #[serde(default)]
    pub oracle: OracleConfig,

    /// Per-run limits and output naming
    #[serde(default)]
    pub run: RunConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Completion service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct GenerationConfig {
    /// Model alias → endpoint profile
    #[serde(default = "default_models")]
    pub models: IndexMap<String, ModelProfile>,

    /// HTTP request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// One selectable model behind an OpenAI-compatible endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ModelProfile {
    /// Model identifier sent to the service
    pub model: String,

    /// Base URL of the chat completions API (without `/chat/completions`)
    pub base_url: String,

    /// Environment variable holding the API key
    pub api_key_env: String,
}

impl ModelProfile {
    fn new(model: &str, base_url: &str, api_key_env: &str) -> Self {
        Self {
            model: model.to_string(),
            base_url: base_url.to_string(),
            api_key_env: api_key_env.to_string(),
        }
    }
}

fn default_models() -> IndexMap<String, ModelProfile> {
    const GEMINI_OPENAI: &str = "https://generativelanguage.googleapis.com/v1beta/openai";

    IndexMap::from([
        (
            "openai".to_string(),
            ModelProfile::new("o3", "https://api.openai.com/v1", "OPENAI_API_KEY"),
        ),
        (
            "mistral".to_string(),
            ModelProfile::new(
                "codestral-latest",
                "https://api.mistral.ai/v1",
                "MISTRAL_API_KEY",
            ),
        ),
        (
            "gemini-pro".to_string(),
            ModelProfile::new("gemini-2.5-pro-exp-06-05", GEMINI_OPENAI, "GEMINI_API_KEY"),
        ),
        (
            "gemini".to_string(),
            ModelProfile::new(
                "gemini-2.5-flash-preview-05-20",
                GEMINI_OPENAI,
                "GEMINI_API_KEY",
            ),
        ),
    ])
}

const fn default_timeout_secs() -> u64 {
    600
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            models: default_models(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Rate-limit retry policy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RetryConfig {
    /// Maximum number of completion requests per invocation
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Wait before the first retry, in seconds
    #[serde(default = "default_base_wait_secs")]
    pub base_wait_secs: u64,

    /// Multiplier applied to the wait for every further retry
    #[serde(default = "default_exponential_factor")]
    pub exponential_factor: u32,
}

const fn default_max_attempts() -> u32 {
    6
}

// Per-minute quotas reset after a minute.
const fn default_base_wait_secs() -> u64 {
    60
}

const fn default_exponential_factor() -> u32 {
    6
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_wait_secs: default_base_wait_secs(),
            exponential_factor: default_exponential_factor(),
        }
    }
}

/// Verification oracle configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct OracleConfig {
    /// Checker executable, looked up on `PATH` unless it contains a separator
    #[serde(default = "default_oracle_program")]
    pub program: String,

    /// Arguments passed before the script
    #[serde(default = "default_oracle_args")]
    pub args: Vec<String>,

    /// Checker script appended after `args`
    #[serde(default)]
    pub script: Option<PathBuf>,

    /// Pass the DEF checker script built into the binary when `script` is
    /// unset
    #[serde(default = "default_bundled_script")]
    pub bundled_script: bool,

    /// Environment variable carrying the candidate artifact path
    #[serde(default = "default_artifact_var")]
    pub artifact_var: String,

    /// Environment variable carrying the space-joined auxiliary file paths
    #[serde(default = "default_aux_files_var")]
    pub aux_files_var: String,
}

fn default_oracle_program() -> String {
    "openroad".to_string()
}

fn default_oracle_args() -> Vec<String> {
    ["-exit", "-no_init", "-no_splash", "-no_settings", "-threads", "max"]
        .into_iter()
        .map(String::from)
        .collect()
}

const fn default_bundled_script() -> bool {
    true
}

fn default_artifact_var() -> String {
    "DEF_FILE".to_string()
}

fn default_aux_files_var() -> String {
    "LEF_FILES".to_string()
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            program: default_oracle_program(),
            args: default_oracle_args(),
            script: None,
            bundled_script: default_bundled_script(),
            artifact_var: default_artifact_var(),
            aux_files_var: default_aux_files_var(),
        }
    }
}

/// Per-run limits and output naming
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RunConfig {
    /// Feedback rounds after the first attempt
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Source files larger than this (bytes) are not sent to the model
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,

    /// Extension of generated artifacts
    #[serde(default = "default_extension")]
    pub extension: String,

    /// Longest sanitized function name used in output file names
    #[serde(default = "default_max_filename_length")]
    pub max_filename_length: usize,

    /// Run the DEF repair rules over every candidate before verification
    #[serde(default)]
    pub repair_candidates: bool,
}

const fn default_max_retries() -> u32 {
    3
}

const fn default_max_file_size() -> u64 {
    100 * 1024
}

fn default_extension() -> String {
    ".def".to_string()
}

const fn default_max_filename_length() -> usize {
    100
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            max_file_size: default_max_file_size(),
            extension: default_extension(),
            max_filename_length: default_max_filename_length(),
            repair_candidates: false,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling log files (stderr only when unset)
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// Rotation for file logs: daily, hourly, never
    #[serde(default = "default_rotation")]
    pub rotation: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            rotation: default_rotation(),
        }
    }
}
