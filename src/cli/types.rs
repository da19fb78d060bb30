use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use super::commands::coverage::CoverageArgs;
use super::commands::repair::RepairArgs;
use super::commands::seed::SeedArgs;
use super::commands::snippet::SnippetArgs;
use super::commands::verify::VerifyArgs;

#[derive(Parser, Debug)]
#[command(name = "covseed")]
#[command(about = "Coverage-guided synthesis of DEF test designs", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Options shared by every command.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Extra configuration file, merged over covseed.yaml
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate designs for every low-coverage target in a report
    Seed(SeedArgs),
    /// Generate a design for a single source file
    Snippet(SnippetArgs),
    /// List the targets a report would select
    Coverage(CoverageArgs),
    /// Run the checker once on an existing design
    Verify(VerifyArgs),
    /// Apply the deterministic DEF clean-up rules to a file
    Repair(RepairArgs),
}
