//! Command-line interface.
//!
//! Commands return the process exit code on success. Problems found while
//! preparing a run are wrapped in [`SetupError`] and exit with 2; anything
//! that goes wrong once targets are being processed exits with 1.

pub mod commands;
pub mod context;
pub mod output;
pub mod types;

use thiserror::Error;

pub use types::{Cli, Commands, GlobalArgs};

/// Exit code for a run where every target succeeded or was skipped.
pub const EXIT_SUCCESS: i32 = 0;
/// Exit code when a target failed or the run stopped on a fatal error.
pub const EXIT_FAILURE: i32 = 1;
/// Exit code for invalid arguments or configuration.
pub const EXIT_USAGE: i32 = 2;

/// Invalid arguments, configuration or environment, detected before any
/// target is processed.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct SetupError(#[from] anyhow::Error);

impl SetupError {
    pub fn msg(message: impl std::fmt::Display) -> Self {
        Self(anyhow::anyhow!("{message}"))
    }
}

/// Report `err` once and return the exit code it maps to.
pub fn handle_error(err: &anyhow::Error, json_mode: bool) -> i32 {
    let code = if err.downcast_ref::<SetupError>().is_some() {
        EXIT_USAGE
    } else {
        EXIT_FAILURE
    };

    if json_mode {
        let body = serde_json::json!({
            "error": format!("{err:#}"),
            "exit_code": code,
        });
        println!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
    } else {
        eprintln!("Error: {err:#}");
    }
    code
}

/// Run the parsed command line to completion.
pub async fn run(cli: Cli) -> i32 {
    let global = cli.global;
    let result = match cli.command {
        Commands::Seed(args) => commands::seed::execute(args, &global).await,
        Commands::Snippet(args) => commands::snippet::execute(args, &global).await,
        Commands::Coverage(args) => commands::coverage::execute(args, &global),
        Commands::Verify(args) => commands::verify::execute(args, &global).await,
        Commands::Repair(args) => commands::repair::execute(&args, &global),
    };

    result.unwrap_or_else(|err| handle_error(&err, global.json))
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_setup_errors_exit_with_usage_code() {
        let err: anyhow::Error = SetupError::msg("unknown model alias 'gpt'").into();
        assert_eq!(handle_error(&err, false), EXIT_USAGE);
    }

    #[test]
    fn test_setup_error_keeps_code_under_context() {
        let err: anyhow::Error = SetupError::msg("bad threshold").into();
        let err = err.context("preparing run");
        assert_eq!(handle_error(&err, true), EXIT_USAGE);
    }

    #[test]
    fn test_runtime_errors_exit_with_failure_code() {
        let err = std::fs::read("/no/such/file")
            .context("reading design")
            .unwrap_err();
        assert_eq!(handle_error(&err, false), EXIT_FAILURE);
    }
}
