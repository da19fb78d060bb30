//! Drives the synthesis agent over a list of targets and keeps the tally.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info, warn};

use super::function_extract::{extract_function, sanitize_filename};
use super::generation_client::GenerationClient;
use super::prompts::PromptBuilder;
use super::synthesis_agent::{AgentSettings, SynthesisAgent, SynthesisRequest, TargetResult};
use crate::domain::errors::SynthesisResult;
use crate::domain::models::{SynthesisOutcome, Target};
use crate::domain::ports::VerificationOracle;

/// Per-run settings that shape output names and source limits.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub output_dir: PathBuf,
    /// Artifact extension including the leading dot
    pub extension: String,
    /// Sources larger than this many bytes are not sent to the model
    pub max_file_size: u64,
    pub max_filename_length: usize,
}

/// How a single target ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TargetStatus {
    Succeeded { output: PathBuf, attempt: u32 },
    Failed { reason: String },
    Skipped { output: PathBuf },
}

/// Report line for one target.
#[derive(Debug, Clone, Serialize)]
pub struct TargetReport {
    pub target: String,
    #[serde(flatten)]
    pub status: TargetStatus,
}

/// Tally of a finished run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub targets: Vec<TargetReport>,
}

impl RunSummary {
    /// Percentage of processed targets that succeeded; `None` when nothing
    /// was processed.
    pub fn success_rate(&self) -> Option<f64> {
        let processed = self.succeeded + self.failed;
        if processed == 0 {
            return None;
        }
        #[allow(clippy::cast_precision_loss)]
        let rate = self.succeeded as f64 / processed as f64 * 100.0;
        Some(rate)
    }

    /// 0 when no target failed, 1 otherwise.
    pub const fn exit_code(&self) -> i32 {
        if self.failed == 0 {
            0
        } else {
            1
        }
    }

    fn record(&mut self, target: &Target, status: TargetStatus) {
        match status {
            TargetStatus::Succeeded { .. } => self.succeeded += 1,
            TargetStatus::Failed { .. } => self.failed += 1,
            TargetStatus::Skipped { .. } => self.skipped += 1,
        }
        self.targets.push(TargetReport {
            target: target.to_string(),
            status,
        });
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.success_rate() {
            None => write!(f, "no targets processed")?,
            Some(rate) => write!(
                f,
                "{} succeeded, {} failed ({rate:.2}% success rate)",
                self.succeeded, self.failed
            )?,
        }
        if self.skipped > 0 {
            write!(f, ", {} skipped", self.skipped)?;
        }
        Ok(())
    }
}

/// Processes targets one after another with a single agent.
#[derive(Debug)]
pub struct RunController {
    agent: SynthesisAgent,
    settings: RunSettings,
}

impl RunController {
    pub fn new(
        generator: GenerationClient,
        oracle: Arc<dyn VerificationOracle>,
        prompts: PromptBuilder,
        agent_settings: AgentSettings,
        settings: RunSettings,
    ) -> Self {
        Self {
            agent: SynthesisAgent::new(generator, oracle, prompts, agent_settings),
            settings,
        }
    }

    pub const fn agent(&self) -> &SynthesisAgent {
        &self.agent
    }

    /// Canonical output path for a target.
    ///
    /// File targets map to `<stem><ext>`, function targets to
    /// `<stem>_<sanitized function><ext>`.
    pub fn output_path(&self, target: &Target) -> PathBuf {
        let stem = target
            .path()
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let name = match target {
            Target::File { .. } => format!("{stem}{}", self.settings.extension),
            Target::Function { name, .. } => format!(
                "{stem}_{}{}",
                sanitize_filename(name, self.settings.max_filename_length),
                self.settings.extension
            ),
        };
        self.settings.output_dir.join(name)
    }

    /// Process every target in order.
    ///
    /// Only fatal errors stop the run early; every other problem is counted
    /// as a failure of the target at hand.
    pub async fn run(&self, targets: &[Target]) -> SynthesisResult<RunSummary> {
        let mut summary = RunSummary::default();
        let total = targets.len();

        for (position, target) in targets.iter().enumerate() {
            info!(item = %target, position = position + 1, total, "Processing target");
            let output = self.output_path(target);
            let status = self.process(target, output).await?;
            summary.record(target, status);
        }

        info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            skipped = summary.skipped,
            "Run finished"
        );
        Ok(summary)
    }

    /// Process a single target into an explicit output path.
    pub async fn run_single(&self, target: &Target, output: PathBuf) -> SynthesisResult<RunSummary> {
        let mut summary = RunSummary::default();
        let status = self.process(target, output).await?;
        summary.record(target, status);
        Ok(summary)
    }

    async fn process(&self, target: &Target, output: PathBuf) -> SynthesisResult<TargetStatus> {
        let source = target.path();
        let content = match self.read_source(source) {
            Ok(content) => content,
            Err(reason) => {
                error!(path = %source.display(), %reason, "Target source unusable");
                return Ok(TargetStatus::Failed { reason });
            }
        };

        let target_name = source
            .file_name()
            .map_or_else(|| source.display().to_string(), |n| n.to_string_lossy().into_owned());

        let (content, coverage_excerpt) = match target {
            Target::File { record, .. } => (content, record.line_excerpt()),
            Target::Function {
                name, start_line, ..
            } => match extract_function(&content, *start_line) {
                Some(snippet) => (snippet, "{}".to_string()),
                None => {
                    let reason =
                        format!("could not extract function '{name}' at line {start_line}");
                    error!(path = %source.display(), %reason, "Skipping function");
                    return Ok(TargetStatus::Failed { reason });
                }
            },
        };

        let request = SynthesisRequest {
            target,
            target_name,
            content,
            coverage_excerpt,
            output: output.clone(),
        };

        Ok(match self.agent.run(&request).await? {
            TargetResult::Skipped => TargetStatus::Skipped { output },
            TargetResult::Processed { outcome, attempts } => match outcome {
                SynthesisOutcome::Accepted { artifact, attempt } => {
                    info!(output = %artifact.display(), "Target succeeded");
                    TargetStatus::Succeeded {
                        output: artifact,
                        attempt,
                    }
                }
                SynthesisOutcome::Exhausted { failed_artifacts } => {
                    warn!(
                        attempts = attempts.len(),
                        kept = failed_artifacts.len(),
                        "Target failed"
                    );
                    TargetStatus::Failed {
                        reason: format!("no accepted design after {} attempts", attempts.len()),
                    }
                }
            },
        })
    }

    /// Read a target source, enforcing the size ceiling.
    fn read_source(&self, path: &Path) -> Result<String, String> {
        let metadata = std::fs::metadata(path).map_err(|e| format!("cannot stat source: {e}"))?;
        if metadata.len() > self.settings.max_file_size {
            return Err(format!(
                "source is {} bytes, above the {} byte limit",
                metadata.len(),
                self.settings.max_file_size
            ));
        }
        std::fs::read_to_string(path).map_err(|e| format!("cannot read source: {e}"))
    }
}
