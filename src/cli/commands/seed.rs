//! `covseed seed`: a full run over a coverage report.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use crate::cli::context::{self, Session};
use crate::cli::output::{output, CommandOutput};
use crate::cli::types::GlobalArgs;
use crate::cli::SetupError;
use crate::domain::models::TargetMode;
use crate::infrastructure::config::ConfigLoader;
use crate::services::{
    AgentSettings, RunController, RunSettings, RunSummary, TargetSelector, TargetStatus,
};

#[derive(Args, Debug, Clone)]
pub struct SeedArgs {
    /// Coverage report (fastcov JSON)
    #[arg(long, value_name = "FILE")]
    pub coverage: PathBuf,

    /// Upper bound (exclusive) of the line coverage window, in percent
    #[arg(long, default_value_t = 40.0)]
    pub threshold: f64,

    /// Lower bound (inclusive) of the line coverage window, in percent
    #[arg(long, default_value_t = 0.0)]
    pub min_threshold: f64,

    /// Model alias from the configured catalog
    #[arg(short, long)]
    pub model: String,

    /// Feedback rounds after the first attempt
    #[arg(long)]
    pub max_retries: Option<u32>,

    /// Directory receiving the generated designs
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: PathBuf,

    /// Select whole files or never-executed functions
    #[arg(long, value_enum, default_value_t = TargetMode::File)]
    pub target: TargetMode,

    /// Extension of generated designs
    #[arg(long)]
    pub extension: Option<String>,

    /// Technology library files (LEF) handed to the model and the checker
    #[arg(short, long = "library", value_name = "FILE")]
    pub libraries: Vec<PathBuf>,

    /// Run the DEF clean-up rules over every candidate before checking it
    #[arg(long)]
    pub repair: bool,
}

#[derive(Debug, Serialize)]
pub struct SeedOutput {
    pub selected: usize,
    pub output_dir: PathBuf,
    #[serde(flatten)]
    pub summary: RunSummary,
    pub success_rate: Option<f64>,
}

impl CommandOutput for SeedOutput {
    fn to_human(&self) -> String {
        if self.selected == 0 {
            return "No targets in the selected coverage window.".to_string();
        }

        let mut lines = Vec::with_capacity(self.summary.targets.len() + 2);
        for report in &self.summary.targets {
            let line = match &report.status {
                TargetStatus::Succeeded { output, attempt } => {
                    format!("  ok      {} -> {} (attempt {attempt})", report.target, output.display())
                }
                TargetStatus::Skipped { output } => {
                    format!("  skip    {} ({} exists)", report.target, output.display())
                }
                TargetStatus::Failed { reason } => {
                    format!("  failed  {}: {reason}", report.target)
                }
            };
            lines.push(line);
        }
        lines.push(String::new());
        lines.push(self.summary.to_string());
        lines.join("\n")
    }
}

pub async fn execute(args: SeedArgs, global: &GlobalArgs) -> Result<i32> {
    let mut session = Session::start(global)?;
    apply_overrides(&mut session, &args)?;
    let config = &session.config;

    let window = context::window(args.min_threshold, args.threshold)?;
    let coverage = context::coverage(&args.coverage)?;
    let oracle = session.oracle().await?;
    let generator = session.generator(&args.model)?;
    let prompts = context::prompts(&args.libraries)?;

    std::fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("cannot create output directory {}", args.output_dir.display()))
        .map_err(SetupError::from)?;

    let targets = TargetSelector::new(window).select(&coverage, args.target);

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
            output_dir: args.output_dir.clone(),
            extension: config.run.extension.clone(),
            max_file_size: config.run.max_file_size,
            max_filename_length: config.run.max_filename_length,
        },
    );

    let summary = controller.run(&targets).await.context("run aborted")?;
    let result = SeedOutput {
        selected: targets.len(),
        output_dir: args.output_dir,
        success_rate: summary.success_rate(),
        summary,
    };
    output(&result, global.json);
    Ok(result.summary.exit_code())
}

/// Fold command-line flags into the loaded configuration.
fn apply_overrides(session: &mut Session, args: &SeedArgs) -> Result<(), SetupError> {
    let run = &mut session.config.run;
    if let Some(max_retries) = args.max_retries {
        run.max_retries = max_retries;
    }
    if let Some(extension) = &args.extension {
        run.extension.clone_from(extension);
    }
    if args.repair {
        run.repair_candidates = true;
    }
    ConfigLoader::validate(&session.config)
        .context("invalid arguments")
        .map_err(SetupError::from)
}
