//! Synthesis targets.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::coverage::CoverageRecord;

/// A unit of synthesis work selected from the coverage report.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Target {
    /// A whole source file whose line coverage falls in the selection window.
    File {
        path: PathBuf,
        coverage_percent: f64,
        #[serde(skip)]
        record: CoverageRecord,
    },
    /// A single function that was never executed.
    Function {
        path: PathBuf,
        name: String,
        start_line: u32,
    },
}

impl Target {
    /// Source file the target lives in.
    pub fn path(&self) -> &Path {
        match self {
            Self::File { path, .. } | Self::Function { path, .. } => path,
        }
    }

    /// Function name for function targets.
    pub fn function_name(&self) -> Option<&str> {
        match self {
            Self::File { .. } => None,
            Self::Function { name, .. } => Some(name),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File {
                path,
                coverage_percent,
                ..
            } => write!(f, "{} ({coverage_percent:.2}%)", path.display()),
            Self::Function {
                path,
                name,
                start_line,
            } => write!(f, "{name} in {}:{start_line}", path.display()),
        }
    }
}

/// Which kind of targets a run selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum TargetMode {
    /// Files whose line coverage falls inside the threshold window
    #[default]
    File,
    /// Functions with zero executions
    Function,
}
