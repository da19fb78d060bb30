//! Per-target generate → verify → refine loop.
//!
//! The loop is an explicit state machine:
//!
//! ```text
//! Building ─▶ Generating ─┬─▶ EmptyResponse ──────────────▶ Building (initial prompt)
//!                         └─▶ Candidate ─▶ Verifying ─┬─▶ Accepted
//!                                                     └─▶ Rejected ─▶ Building (feedback prompt)
//! Building with no attempt slot left ─▶ Exhausted
//! ```
//!
//! Every generation consumes one attempt slot, so a target sees at most
//! `max_retries + 1` attempts.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use super::def_repair::repair_def;
use super::generation_client::GenerationClient;
use super::prompts::PromptBuilder;
use crate::domain::errors::{SynthesisError, SynthesisResult};
use crate::domain::models::{
    ArtifactLayout, Attempt, PromptKind, Provenance, SynthesisOutcome, Target,
};
use crate::domain::ports::VerificationOracle;

/// Everything the agent needs to work on one target.
#[derive(Debug, Clone)]
pub struct SynthesisRequest<'a> {
    pub target: &'a Target,
    /// Name the model sees for the target (usually the source file name)
    pub target_name: String,
    /// Source text the design should exercise
    pub content: String,
    /// Coverage excerpt for the target, `{}` when none applies
    pub coverage_excerpt: String,
    /// Canonical output path
    pub output: PathBuf,
}

/// Result of handing one target to the agent.
#[derive(Debug, Clone)]
pub enum TargetResult {
    /// The canonical output already existed; nothing was attempted.
    Skipped,
    /// The attempt loop ran to a terminal state.
    Processed {
        outcome: SynthesisOutcome,
        attempts: Vec<Attempt>,
    },
}

/// Agent tuning that does not change between targets.
#[derive(Debug, Clone)]
pub struct AgentSettings {
    pub max_retries: u32,
    /// Auxiliary files handed to the oracle and the technology prompt
    pub libraries: Vec<PathBuf>,
    /// Catalog alias recorded in provenance manifests
    pub model_alias: String,
    pub repair_candidates: bool,
}

/// Next prompt to build.
#[derive(Debug)]
enum NextPrompt {
    Initial,
    Feedback { candidate: String, diagnostic: String },
}

#[derive(Debug)]
enum AgentState {
    Building(NextPrompt),
    Generating { kind: PromptKind, prompt: String },
    EmptyResponse,
    Candidate { kind: PromptKind, prompt: String, text: String },
    Verifying { attempt: Attempt, artifact: PathBuf },
    Accepted { index: u32, artifact: PathBuf },
    Rejected { candidate: String, diagnostic: String },
    Exhausted,
}

/// Runs the attempt loop for one target at a time.
pub struct SynthesisAgent {
    generator: GenerationClient,
    oracle: Arc<dyn VerificationOracle>,
    prompts: PromptBuilder,
    settings: AgentSettings,
    run_id: Uuid,
}

impl SynthesisAgent {
    pub fn new(
        generator: GenerationClient,
        oracle: Arc<dyn VerificationOracle>,
        prompts: PromptBuilder,
        settings: AgentSettings,
    ) -> Self {
        Self {
            generator,
            oracle,
            prompts,
            settings,
            run_id: Uuid::new_v4(),
        }
    }

    pub const fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub const fn settings(&self) -> &AgentSettings {
        &self.settings
    }

    /// Process one target.
    ///
    /// Errors are fatal for the whole run: an unusable model, a checker that
    /// cannot be spawned, or a failing file system. Rejections and empty
    /// completions end in [`SynthesisOutcome::Exhausted`] instead.
    #[instrument(skip_all, fields(source = %request.target, output = %request.output.display()))]
    pub async fn run(&self, request: &SynthesisRequest<'_>) -> SynthesisResult<TargetResult> {
        let layout = ArtifactLayout::new(&request.output);
        if layout.output().exists() {
            warn!("Output already exists, skipping target");
            return Ok(TargetResult::Skipped);
        }

        if !layout.dir().as_os_str().is_empty() {
            std::fs::create_dir_all(layout.dir())
                .map_err(|e| SynthesisError::io(layout.dir(), e))?;
        }
        Self::retire_stale_attempts(&layout)?;

        let system = self.prompts.system_messages(
            &request.target_name,
            &request.content,
            &request.coverage_excerpt,
        );
        let initial_prompt = self.prompts.initial_prompt(&request.target_name);
        let max_attempts = self.settings.max_retries + 1;

        let mut attempts: Vec<Attempt> = Vec::new();
        let mut state = AgentState::Building(NextPrompt::Initial);

        loop {
            let index = u32::try_from(attempts.len()).unwrap_or(u32::MAX);
            state = match state {
                AgentState::Building(_) if index >= max_attempts => AgentState::Exhausted,
                AgentState::Building(next) => {
                    info!(attempt = index + 1, max_attempts, "Starting attempt");
                    match next {
                        NextPrompt::Initial => AgentState::Generating {
                            kind: PromptKind::Initial,
                            prompt: initial_prompt.clone(),
                        },
                        NextPrompt::Feedback {
                            candidate,
                            diagnostic,
                        } => AgentState::Generating {
                            kind: PromptKind::Feedback,
                            prompt: self.prompts.feedback_prompt(
                                &request.target_name,
                                &candidate,
                                &diagnostic,
                            ),
                        },
                    }
                }
                AgentState::Generating { kind, prompt } => {
                    let text = self.generator.invoke(&system, &prompt).await?;
                    if text.trim().is_empty() {
                        attempts.push(Attempt {
                            index,
                            prompt_kind: kind,
                            prompt,
                            generated: text,
                            artifact: None,
                            verdict: None,
                        });
                        AgentState::EmptyResponse
                    } else {
                        AgentState::Candidate { kind, prompt, text }
                    }
                }
                AgentState::EmptyResponse => {
                    warn!(attempt = index, "Model returned nothing, retrying with the initial prompt");
                    AgentState::Building(NextPrompt::Initial)
                }
                AgentState::Candidate { kind, prompt, text } => {
                    let text = if self.settings.repair_candidates {
                        repair_def(&text)
                    } else {
                        text
                    };
                    let artifact = layout.free_attempt_path(index);
                    journal_attempt(&layout.journal_path(), &artifact)?;
                    write_artifact(&artifact, &text)?;
                    debug!(artifact = %artifact.display(), "Candidate written");
                    AgentState::Verifying {
                        attempt: Attempt {
                            index,
                            prompt_kind: kind,
                            prompt,
                            generated: text,
                            artifact: Some(artifact.clone()),
                            verdict: None,
                        },
                        artifact,
                    }
                }
                AgentState::Verifying {
                    mut attempt,
                    artifact,
                } => {
                    let verdict = self
                        .oracle
                        .verify(&artifact, &self.settings.libraries)
                        .await?;
                    let next = if verdict.accepted {
                        AgentState::Accepted {
                            index: attempt.index,
                            artifact,
                        }
                    } else {
                        error!(
                            artifact = %artifact.display(),
                            diagnostic = %verdict.diagnostic,
                            "Candidate rejected"
                        );
                        AgentState::Rejected {
                            candidate: attempt.generated.clone(),
                            diagnostic: verdict.diagnostic.clone(),
                        }
                    };
                    attempt.verdict = Some(verdict);
                    attempts.push(attempt);
                    next
                }
                AgentState::Rejected {
                    candidate,
                    diagnostic,
                } => AgentState::Building(NextPrompt::Feedback {
                    candidate,
                    diagnostic,
                }),
                AgentState::Accepted { index, artifact } => {
                    let outcome = self.accept(request, &layout, &attempts, index, &artifact)?;
                    remove_journal(&layout)?;
                    return Ok(TargetResult::Processed { outcome, attempts });
                }
                AgentState::Exhausted => {
                    let failed_artifacts = Self::retire_attempts(&layout, &attempts)?;
                    remove_journal(&layout)?;
                    error!(
                        attempts = attempts.len(),
                        failed_artifacts = failed_artifacts.len(),
                        "No accepted design after all attempts"
                    );
                    return Ok(TargetResult::Processed {
                        outcome: SynthesisOutcome::Exhausted { failed_artifacts },
                        attempts,
                    });
                }
            };
        }
    }

    /// Move the accepted artifact to the canonical path, retire the rejected
    /// ones and write the provenance manifest.
    fn accept(
        &self,
        request: &SynthesisRequest<'_>,
        layout: &ArtifactLayout,
        attempts: &[Attempt],
        index: u32,
        artifact: &Path,
    ) -> SynthesisResult<SynthesisOutcome> {
        let output = layout.output();
        std::fs::rename(artifact, output).map_err(|e| SynthesisError::io(artifact, e))?;

        let rejected: Vec<Attempt> = attempts
            .iter()
            .filter(|a| a.index != index)
            .cloned()
            .collect();
        Self::retire_attempts(layout, &rejected)?;

        let provenance = Provenance {
            run_id: self.run_id,
            target: request.target.path().to_path_buf(),
            function: request.target.function_name().map(str::to_string),
            model: self.settings.model_alias.clone(),
            accepted_attempt: index,
            attempts: u32::try_from(attempts.len()).unwrap_or(u32::MAX),
            artifact: output.to_path_buf(),
            created_at: Utc::now(),
        };
        let manifest = layout.provenance_path();
        let json = serde_json::to_string_pretty(&provenance)?;
        std::fs::write(&manifest, json).map_err(|e| SynthesisError::io(&manifest, e))?;

        info!(
            output = %output.display(),
            attempt = index + 1,
            "Design accepted"
        );
        Ok(SynthesisOutcome::Accepted {
            artifact: output.to_path_buf(),
            attempt: index,
        })
    }

    /// Rename every artifact these attempts produced to a failed name.
    fn retire_attempts(
        layout: &ArtifactLayout,
        attempts: &[Attempt],
    ) -> SynthesisResult<Vec<PathBuf>> {
        let mut retired = Vec::new();
        for attempt in attempts {
            let Some(artifact) = &attempt.artifact else {
                continue;
            };
            if !artifact.exists() {
                continue;
            }
            let failed = layout.free_failed_path(attempt.index);
            std::fs::rename(artifact, &failed).map_err(|e| SynthesisError::io(artifact, e))?;
            debug!(from = %artifact.display(), to = %failed.display(), "Artifact retired");
            retired.push(failed);
        }
        Ok(retired)
    }

    /// Attempt files left by an interrupted run would otherwise be
    /// overwritten; move them to failed names first.
    ///
    /// Only names listed in the output's journal are touched, and never an
    /// accepted output of another target.
    fn retire_stale_attempts(layout: &ArtifactLayout) -> SynthesisResult<()> {
        let journal = layout.journal_path();
        let listed = match std::fs::read_to_string(&journal) {
            Ok(listed) => listed,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(SynthesisError::io(&journal, e)),
        };

        let mut stale: Vec<(u32, PathBuf)> = listed
            .lines()
            .filter_map(|name| {
                let index = layout.attempt_index(name.trim())?;
                let path = layout.dir().join(name.trim());
                (path.is_file() && !ArtifactLayout::is_accepted_output(&path))
                    .then_some((index, path))
            })
            .collect();
        stale.sort();
        stale.dedup();

        for (index, path) in stale {
            let failed = layout.free_failed_path(index);
            warn!(
                from = %path.display(),
                to = %failed.display(),
                "Retiring attempt artifact from an earlier run"
            );
            std::fs::rename(&path, &failed).map_err(|e| SynthesisError::io(&path, e))?;
        }
        remove_journal(layout)
    }
}

/// Record an attempt file name before the file is written.
fn journal_attempt(journal: &Path, artifact: &Path) -> SynthesisResult<()> {
    use std::io::Write as _;

    let Some(name) = artifact.file_name() else {
        return Ok(());
    };
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(journal)
        .map_err(|e| SynthesisError::io(journal, e))?;
    writeln!(file, "{}", name.to_string_lossy()).map_err(|e| SynthesisError::io(journal, e))
}

fn remove_journal(layout: &ArtifactLayout) -> SynthesisResult<()> {
    let journal = layout.journal_path();
    match std::fs::remove_file(&journal) {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(SynthesisError::io(&journal, e)),
        _ => Ok(()),
    }
}

/// Write a candidate, always ending with a newline.
fn write_artifact(path: &Path, text: &str) -> SynthesisResult<()> {
    let mut body = text.to_string();
    if !body.ends_with('\n') {
        body.push('\n');
    }
    std::fs::write(path, body).map_err(|e| SynthesisError::io(path, e))
}

impl std::fmt::Debug for SynthesisAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SynthesisAgent")
            .field("model", &self.generator.model())
            .field("oracle", &self.oracle.name())
            .field("settings", &self.settings)
            .field("run_id", &self.run_id)
            .finish_non_exhaustive()
    }
}
