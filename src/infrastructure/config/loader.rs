use std::path::Path;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use thiserror::Error;

use crate::domain::models::config::Config;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid log rotation: {0}. Must be one of: daily, hourly, never")]
    InvalidRotation(String),

    #[error("Invalid max_attempts: {0}. Must be at least 1")]
    InvalidMaxAttempts(u32),

    #[error("Invalid exponential_factor: {0}. Must be at least 1")]
    InvalidExponentialFactor(u32),

    #[error("Invalid max_filename_length: {0}. Must be at least 1")]
    InvalidFilenameLength(usize),

    #[error("Model catalog is empty")]
    EmptyModelCatalog,

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Load(Box::new(err))
    }
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. covseed.yaml in the working directory
    /// 3. covseed.local.yaml (local overrides, optional)
    /// 4. `explicit` file given with `--config`
    /// 5. Environment variables (COVSEED_* prefix, `__` separates sections)
    pub fn load(explicit: Option<&Path>) -> Result<Config, ConfigError> {
        let mut figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file("covseed.yaml"))
            .merge(Yaml::file("covseed.local.yaml"));

        if let Some(path) = explicit {
            if !path.is_file() {
                return Err(ConfigError::FileNotFound(path.display().to_string()));
            }
            figment = figment.merge(Yaml::file(path));
        }

        let config: Config = figment
            .merge(Env::prefixed("COVSEED_").split("__"))
            .extract()?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file, ignoring the environment
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path))
            .extract()?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&config.logging.rotation.as_str()) {
            return Err(ConfigError::InvalidRotation(
                config.logging.rotation.clone(),
            ));
        }

        if config.retry.max_attempts == 0 {
            return Err(ConfigError::InvalidMaxAttempts(config.retry.max_attempts));
        }

        if config.retry.exponential_factor == 0 {
            return Err(ConfigError::InvalidExponentialFactor(
                config.retry.exponential_factor,
            ));
        }

        if config.run.max_filename_length == 0 {
            return Err(ConfigError::InvalidFilenameLength(
                config.run.max_filename_length,
            ));
        }

        if config.generation.models.is_empty() {
            return Err(ConfigError::EmptyModelCatalog);
        }

        for (alias, profile) in &config.generation.models {
            if profile.model.is_empty() || profile.base_url.is_empty() {
                return Err(ConfigError::ValidationFailed(format!(
                    "model '{alias}' needs both model and base_url"
                )));
            }
        }

        if config.oracle.program.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "oracle program cannot be empty".to_string(),
            ));
        }

        if config.oracle.artifact_var.is_empty() || config.oracle.aux_files_var.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "oracle environment variable names cannot be empty".to_string(),
            ));
        }

        if config.run.max_file_size == 0 {
            return Err(ConfigError::ValidationFailed(
                "max_file_size must be positive".to_string(),
            ));
        }

        if !config.run.extension.starts_with('.') {
            return Err(ConfigError::ValidationFailed(format!(
                "extension '{}' must start with a dot",
                config.run.extension
            )));
        }

        Ok(())
    }
}
