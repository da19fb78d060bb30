//! Shared setup for commands: configuration, logging and collaborators.
//!
//! Every function here reports failures as [`SetupError`], so a command can
//! use `?` and still exit with the usage code.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;
use tracing::info;

use super::types::GlobalArgs;
use super::SetupError;
use crate::domain::models::{Config, Coverage};
use crate::domain::ports::VerificationOracle;
use crate::infrastructure::config::ConfigLoader;
use crate::infrastructure::llm::{ChatClientConfig, ChatCompletionsClient};
use crate::infrastructure::logging::{LogConfig, LoggerError, LoggerImpl};
use crate::infrastructure::oracle::ProcessOracle;
use crate::services::{BackoffPolicy, GenerationClient, PromptBuilder, SelectionWindow};

/// Loaded configuration plus the logger guard, held for the command's
/// lifetime.
pub struct Session {
    pub config: Config,
    _logger: Option<LoggerImpl>,
}

impl Session {
    /// Load configuration, apply global flag overrides and start logging.
    pub fn start(global: &GlobalArgs) -> Result<Self, SetupError> {
        let mut config = ConfigLoader::load(global.config.as_deref())
            .context("invalid configuration")?;

        if let Some(level) = &global.log_level {
            config.logging.level.clone_from(level);
        }
        ConfigLoader::validate(&config).context("invalid configuration")?;

        // A subscriber may already be installed when commands run in-process.
        let logger = match LoggerImpl::init(&LogConfig::from(&config.logging)) {
            Ok(logger) => Some(logger),
            Err(LoggerError::AlreadyInstalled(_)) => None,
            Err(e) => return Err(anyhow::Error::new(e).context("cannot start logging").into()),
        };

        Ok(Self {
            config,
            _logger: logger,
        })
    }

    /// Same as [`Session::start`] with an already built configuration.
    pub fn with_config(config: Config) -> Result<Self, SetupError> {
        ConfigLoader::validate(&config).context("invalid configuration")?;
        Ok(Self {
            config,
            _logger: None,
        })
    }

    /// Oracle built from the `oracle` section, checked to be runnable.
    pub async fn oracle(&self) -> Result<Arc<dyn VerificationOracle>, SetupError> {
        let oracle = ProcessOracle::new(&self.config.oracle);
        oracle
            .ensure_available()
            .await
            .context("verification oracle unavailable")?;
        info!(oracle = oracle.name(), "Verification oracle ready");
        Ok(Arc::new(oracle))
    }

    /// Generation client for a catalog alias.
    pub fn generator(&self, alias: &str) -> Result<GenerationClient, SetupError> {
        let generation = &self.config.generation;
        let profile = generation.models.get(alias).ok_or_else(|| {
            let known = generation
                .models
                .keys()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(", ");
            SetupError::msg(format!("unknown model alias '{alias}' (known: {known})"))
        })?;

        let client_config = ChatClientConfig::from_profile(profile, generation.timeout_secs)?;
        let client = ChatCompletionsClient::new(client_config)?;
        info!(alias, model = %profile.model, "Generation client ready");

        Ok(GenerationClient::new(
            Arc::new(client),
            BackoffPolicy::from(&self.config.retry),
        ))
    }
}

/// Prompt builder over the given library files, all of which must exist.
pub fn prompts(libraries: &[PathBuf]) -> Result<PromptBuilder, SetupError> {
    ensure_files(libraries, "library file")?;
    PromptBuilder::load(libraries)
        .context("failed to read library files")
        .map_err(SetupError::from)
}

/// Threshold window `[min, max)`.
pub fn window(min: f64, max: f64) -> Result<SelectionWindow, SetupError> {
    SelectionWindow::new(min, max)
        .context("invalid threshold window")
        .map_err(SetupError::from)
}

/// Parse a coverage report.
pub fn coverage(path: &Path) -> Result<Coverage, SetupError> {
    Coverage::load(path)
        .context("cannot use coverage report")
        .map_err(SetupError::from)
}

/// Fail unless every path is an existing regular file.
pub fn ensure_files(paths: &[PathBuf], what: &str) -> Result<(), SetupError> {
    match paths.iter().find(|p| !p.is_file()) {
        Some(missing) => Err(SetupError::msg(format!(
            "{what} not found: {}",
            missing.display()
        ))),
        None => Ok(()),
    }
}

/// Absolute form of `path` without requiring it to exist.
pub fn absolute(path: &Path) -> Result<PathBuf, SetupError> {
    std::path::absolute(path)
        .with_context(|| format!("cannot resolve {}", path.display()))
        .map_err(SetupError::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session::with_config(Config::default()).unwrap()
    }

    #[test]
    fn test_unknown_alias_lists_catalog() {
        let err = session().generator("gpt-9").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("gpt-9"));
        assert!(message.contains("mistral"));
    }

    #[test]
    fn test_missing_api_key_is_setup_error() {
        temp_env::with_var_unset("MISTRAL_API_KEY", || {
            let err = session().generator("mistral").unwrap_err();
            assert!(format!("{err:#}").contains("MISTRAL_API_KEY"));
        });
    }

    #[test]
    fn test_inverted_window_rejected() {
        assert!(window(50.0, 10.0).is_err());
        assert!(window(0.0, 40.0).is_ok());
    }

    #[test]
    fn test_missing_library_rejected() {
        let err = prompts(&[PathBuf::from("/no/such/lib.lef")]).unwrap_err();
        assert!(err.to_string().contains("/no/such/lib.lef"));
    }

    #[test]
    fn test_ensure_files() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(ensure_files(&[file.path().to_path_buf()], "library file").is_ok());
        assert!(ensure_files(&[], "library file").is_ok());
    }

    #[test]
    fn test_unusable_log_dir_is_setup_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "").unwrap();
        let config_file = dir.path().join("covseed.override.yaml");
        std::fs::write(
            &config_file,
            format!("logging:\n  log_dir: {}\n", blocker.join("logs").display()),
        )
        .unwrap();

        let global = GlobalArgs {
            config: Some(config_file),
            ..Default::default()
        };
        let Err(err) = Session::start(&global) else {
            panic!("logging into a file path should fail");
        };
        assert!(format!("{err:#}").contains("cannot start logging"));
    }

    #[tokio::test]
    async fn test_missing_oracle_program() {
        let mut config = Config::default();
        config.oracle.program = "/no/such/checker".to_string();
        let session = Session::with_config(config).unwrap();
        assert!(session.oracle().await.is_err());
    }
}
