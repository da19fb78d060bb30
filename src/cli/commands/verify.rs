//! `covseed verify`: run the checker once on an existing design.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use crate::cli::context::{self, Session};
use crate::cli::output::{output, CommandOutput};
use crate::cli::types::GlobalArgs;
use crate::cli::{EXIT_FAILURE, EXIT_SUCCESS};

#[derive(Args, Debug, Clone)]
pub struct VerifyArgs {
    /// Design to check
    pub file: PathBuf,

    /// Technology library files (LEF) passed to the checker
    #[arg(short, long = "library", value_name = "FILE")]
    pub libraries: Vec<PathBuf>,
}

#[derive(Debug, Serialize)]
pub struct VerifyOutput {
    pub file: PathBuf,
    pub oracle: String,
    pub accepted: bool,
    pub diagnostic: String,
}

impl CommandOutput for VerifyOutput {
    fn to_human(&self) -> String {
        let verdict = if self.accepted { "accepted" } else { "rejected" };
        let mut text = format!("{} {verdict} by {}", self.file.display(), self.oracle);
        if !self.diagnostic.is_empty() {
            text.push_str("\n\n");
            text.push_str(&self.diagnostic);
        }
        text
    }
}

pub async fn execute(args: VerifyArgs, global: &GlobalArgs) -> Result<i32> {
    let session = Session::start(global)?;
    context::ensure_files(std::slice::from_ref(&args.file), "design file")?;
    context::ensure_files(&args.libraries, "library file")?;
    let oracle = session.oracle().await?;

    let verdict = oracle
        .verify(&args.file, &args.libraries)
        .await
        .with_context(|| format!("checker failed on {}", args.file.display()))?;

    let result = VerifyOutput {
        file: args.file,
        oracle: oracle.name().to_string(),
        accepted: verdict.accepted,
        diagnostic: verdict.diagnostic,
    };
    output(&result, global.json);
    Ok(if result.accepted { EXIT_SUCCESS } else { EXIT_FAILURE })
}
