//! `covseed repair`: apply the DEF clean-up rules to a file.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use crate::cli::context::{self, Session};
use crate::cli::output::{output, CommandOutput};
use crate::cli::types::GlobalArgs;
use crate::cli::{SetupError, EXIT_SUCCESS};
use crate::services::repair_def;

#[derive(Args, Debug, Clone)]
pub struct RepairArgs {
    /// Design to repair
    pub file: PathBuf,

    /// Write the result back instead of printing it
    #[arg(short, long)]
    pub in_place: bool,
}

#[derive(Debug, Serialize)]
pub struct RepairOutput {
    pub file: PathBuf,
    pub changed: bool,
    pub in_place: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl CommandOutput for RepairOutput {
    fn to_human(&self) -> String {
        match (&self.text, self.changed) {
            (Some(text), _) => text.trim_end_matches('\n').to_string(),
            (None, true) => format!("Repaired {}", self.file.display()),
            (None, false) => format!("{} needed no changes", self.file.display()),
        }
    }
}

pub fn execute(args: &RepairArgs, global: &GlobalArgs) -> Result<i32> {
    let _session = Session::start(global)?;
    context::ensure_files(std::slice::from_ref(&args.file), "design file")?;

    let original = std::fs::read_to_string(&args.file)
        .with_context(|| format!("cannot read {}", args.file.display()))
        .map_err(SetupError::from)?;
    let result = repair(&args.file, &original, args.in_place)?;
    output(&result, global.json);
    Ok(EXIT_SUCCESS)
}

fn repair(file: &std::path::Path, original: &str, in_place: bool) -> Result<RepairOutput> {
    let repaired = repair_def(original);
    let changed = repaired != original;

    if in_place && changed {
        std::fs::write(file, &repaired)
            .with_context(|| format!("cannot write {}", file.display()))?;
    }

    Ok(RepairOutput {
        file: file.to_path_buf(),
        changed,
        in_place,
        text: (!in_place).then_some(repaired),
    })
}
