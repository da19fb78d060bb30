//! `covseed snippet`: synthesize a design for one source file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use crate::cli::context::{self, Session};
use crate::cli::output::{output, CommandOutput};
use crate::cli::types::GlobalArgs;
use crate::cli::SetupError;
use crate::domain::models::{CoverageRecord, Target};
use crate::services::{AgentSettings, RunController, RunSettings, TargetStatus};

#[derive(Args, Debug, Clone)]
pub struct SnippetArgs {
    /// Model alias from the configured catalog
    #[arg(short, long)]
    pub model: String,

    /// Source file the design should exercise
    #[arg(short, long, value_name = "FILE")]
    pub target: PathBuf,

    /// Path of the design to write
    #[arg(short, long, value_name = "FILE")]
    pub output: PathBuf,

    /// Technology library files (LEF) handed to the model and the checker
    #[arg(short, long = "library", value_name = "FILE", required = true)]
    pub libraries: Vec<PathBuf>,

    /// Feedback rounds after the first attempt
    #[arg(long)]
    pub max_retries: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct SnippetOutput {
    pub target: PathBuf,
    #[serde(flatten)]
    pub status: TargetStatus,
}

impl CommandOutput for SnippetOutput {
    fn to_human(&self) -> String {
        match &self.status {
            TargetStatus::Succeeded { output, attempt } => format!(
                "Wrote {} for {} (accepted on attempt {attempt})",
                output.display(),
                self.target.display()
            ),
            TargetStatus::Skipped { output } => {
                format!("{} already exists, nothing to do", output.display())
            }
            TargetStatus::Failed { reason } => {
                format!("No design for {}: {reason}", self.target.display())
            }
        }
    }
}

impl SnippetOutput {
    const fn exit_code(&self) -> i32 {
        match self.status {
            TargetStatus::Failed { .. } => crate::cli::EXIT_FAILURE,
            TargetStatus::Succeeded { .. } | TargetStatus::Skipped { .. } => {
                crate::cli::EXIT_SUCCESS
            }
        }
    }
}

pub async fn execute(args: SnippetArgs, global: &GlobalArgs) -> Result<i32> {
    let mut session = Session::start(global)?;
    if let Some(max_retries) = args.max_retries {
        session.config.run.max_retries = max_retries;
    }

    check_paths(&args.target, &args.output)?;
    let oracle = session.oracle().await?;
    let generator = session.generator(&args.model)?;
    let prompts = context::prompts(&args.libraries)?;

    let output_dir = args
        .output
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("cannot create output directory {}", output_dir.display()))
        .map_err(SetupError::from)?;

    let config = &session.config;
    let controller = RunController::new(
        generator,
        oracle,
        prompts,
        AgentSettings {
            max_retries: config.run.max_retries,
            libraries: args.libraries.clone(),
            model_alias: args.model.clone(),
            repair_candidates: config.run.repair_candidates,
        },
        RunSettings {
            output_dir,
            extension: config.run.extension.clone(),
            max_file_size: config.run.max_file_size,
            max_filename_length: config.run.max_filename_length,
        },
    );

    let target = Target::File {
        path: args.target.clone(),
        coverage_percent: 0.0,
        record: CoverageRecord::default(),
    };
    let mut summary = controller
        .run_single(&target, args.output.clone())
        .await
        .context("run aborted")?;

    let status = summary.targets.pop().map_or_else(
        || TargetStatus::Failed {
            reason: "target was not processed".to_string(),
        },
        |report| report.status,
    );
    let result = SnippetOutput {
        target: args.target,
        status,
    };
    output(&result, global.json);
    Ok(result.exit_code())
}

/// The target must exist and must not be the file we are about to write.
fn check_paths(target: &Path, output: &Path) -> Result<(), SetupError> {
    if !target.is_file() {
        return Err(SetupError::msg(format!(
            "target file not found: {}",
            target.display()
        )));
    }
    let target = std::fs::canonicalize(target)
        .with_context(|| format!("cannot resolve {}", target.display()))?;
    let output = std::fs::canonicalize(output).or_else(|_| context::absolute(output))?;
    if target == output {
        return Err(SetupError::msg(format!(
            "target and output are the same file: {}",
            target.display()
        )));
    }
    Ok(())
}
