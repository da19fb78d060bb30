//! `covseed coverage`: show what a run would select.

use std::env;
use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use comfy_table::{presets, Attribute, Cell, Color, ContentArrangement, Table};
use serde::Serialize;

use crate::cli::context::{self, Session};
use crate::cli::output::{output, truncate, CommandOutput};
use crate::cli::types::GlobalArgs;
use crate::domain::models::{Target, TargetMode};
use crate::services::TargetSelector;

#[derive(Args, Debug, Clone)]
pub struct CoverageArgs {
    /// Coverage report (fastcov JSON)
    #[arg(long, value_name = "FILE")]
    pub coverage: PathBuf,

    /// Upper bound (exclusive) of the line coverage window, in percent
    #[arg(long, default_value_t = 40.0)]
    pub threshold: f64,

    /// Lower bound (inclusive) of the line coverage window, in percent
    #[arg(long, default_value_t = 0.0)]
    pub min_threshold: f64,

    /// Select whole files or never-executed functions
    #[arg(long, value_enum, default_value_t = TargetMode::File)]
    pub target: TargetMode,
}

/// One selected target as listed by the command.
#[derive(Debug, Clone, Serialize)]
pub struct TargetRow {
    pub path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_line: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coverage_percent: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub covered_lines: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_lines: Option<usize>,
}

impl From<&Target> for TargetRow {
    fn from(target: &Target) -> Self {
        match target {
            Target::File {
                path,
                coverage_percent,
                record,
            } => Self {
                path: path.clone(),
                function: None,
                start_line: None,
                coverage_percent: Some(*coverage_percent),
                covered_lines: Some(record.covered_lines()),
                total_lines: Some(record.total_lines()),
            },
            Target::Function {
                path,
                name,
                start_line,
            } => Self {
                path: path.clone(),
                function: Some(name.clone()),
                start_line: Some(*start_line),
                coverage_percent: None,
                covered_lines: None,
                total_lines: None,
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CoverageOutput {
    pub mode: &'static str,
    pub min_threshold: f64,
    pub threshold: f64,
    pub files_in_report: usize,
    pub targets: Vec<TargetRow>,
    #[serde(skip)]
    pub use_colors: bool,
}

impl CommandOutput for CoverageOutput {
    fn to_human(&self) -> String {
        if self.targets.is_empty() {
            return format!(
                "No targets selected from {} file(s) in the report.",
                self.files_in_report
            );
        }

        let mut table = Table::new();
        table
            .load_preset(presets::UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);

        if self.mode == "function" {
            table.set_header(vec![
                Cell::new("Source").add_attribute(Attribute::Bold),
                Cell::new("Function").add_attribute(Attribute::Bold),
                Cell::new("Line").add_attribute(Attribute::Bold),
            ]);
            for row in &self.targets {
                table.add_row(vec![
                    Cell::new(row.path.display()),
                    Cell::new(truncate(row.function.as_deref().unwrap_or_default(), 60)),
                    Cell::new(row.start_line.unwrap_or_default()),
                ]);
            }
        } else {
            table.set_header(vec![
                Cell::new("Source").add_attribute(Attribute::Bold),
                Cell::new("Coverage").add_attribute(Attribute::Bold),
                Cell::new("Lines").add_attribute(Attribute::Bold),
            ]);
            for row in &self.targets {
                let percent = row.coverage_percent.unwrap_or_default();
                let mut coverage = Cell::new(format!("{percent:.2}%"));
                if self.use_colors {
                    coverage = coverage.fg(coverage_color(percent));
                }
                table.add_row(vec![
                    Cell::new(row.path.display()),
                    coverage,
                    Cell::new(format!(
                        "{}/{}",
                        row.covered_lines.unwrap_or_default(),
                        row.total_lines.unwrap_or_default()
                    )),
                ]);
            }
        }

        format!(
            "{table}\n{} target(s) selected from {} file(s), window [{:.2}%, {:.2}%)",
            self.targets.len(),
            self.files_in_report,
            self.min_threshold,
            self.threshold
        )
    }
}

fn coverage_color(percent: f64) -> Color {
    if percent < 10.0 {
        Color::Red
    } else if percent < 25.0 {
        Color::Yellow
    } else {
        Color::Green
    }
}

/// Check if color output is supported
fn supports_color() -> bool {
    if env::var_os("NO_COLOR").is_some() {
        return false;
    }
    !matches!(env::var("TERM").as_deref(), Ok("dumb"))
}

pub fn execute(args: CoverageArgs, global: &GlobalArgs) -> Result<i32> {
    let _session = Session::start(global)?;
    let window = context::window(args.min_threshold, args.threshold)?;
    let coverage = context::coverage(&args.coverage)?;

    let targets = TargetSelector::new(window).select(&coverage, args.target);
    let result = CoverageOutput {
        mode: match args.target {
            TargetMode::File => "file",
            TargetMode::Function => "function",
        },
        min_threshold: args.min_threshold,
        threshold: args.threshold,
        files_in_report: coverage.len(),
        targets: targets.iter().map(TargetRow::from).collect(),
        use_colors: supports_color(),
    };
    output(&result, global.json);
    Ok(crate::cli::EXIT_SUCCESS)
}
