//! Attempts, outcomes and the on-disk artifact layout.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The oracle's judgement of one candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub accepted: bool,
    pub diagnostic: String,
}

impl Verdict {
    pub fn accepted(diagnostic: impl Into<String>) -> Self {
        Self {
            accepted: true,
            diagnostic: diagnostic.into(),
        }
    }

    pub fn rejected(diagnostic: impl Into<String>) -> Self {
        Self {
            accepted: false,
            diagnostic: diagnostic.into(),
        }
    }
}

/// Which prompt an attempt was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptKind {
    Initial,
    Feedback,
}

/// One generate/verify cycle for a target.
#[derive(Debug, Clone)]
pub struct Attempt {
    /// 0-based attempt index
    pub index: u32,
    pub prompt_kind: PromptKind,
    pub prompt: String,
    /// Raw text after fence stripping; empty when the model returned nothing
    pub generated: String,
    /// Where the candidate was written, if one was produced
    pub artifact: Option<PathBuf>,
    /// Oracle verdict, if the candidate was verified
    pub verdict: Option<Verdict>,
}

impl Attempt {
    pub fn is_accepted(&self) -> bool {
        self.verdict.as_ref().is_some_and(|v| v.accepted)
    }
}

/// Terminal state of one processed target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SynthesisOutcome {
    /// A candidate passed verification and was stored at the canonical path.
    Accepted { artifact: PathBuf, attempt: u32 },
    /// The retry budget ran out; attempt artifacts were renamed to these paths.
    Exhausted { failed_artifacts: Vec<PathBuf> },
}

impl SynthesisOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }
}

/// Naming scheme for the canonical output and its per-attempt artifacts.
///
/// For an output `dir/name.def`:
/// - attempt `i` is written to `dir/name.<i>.def`
/// - a failed attempt is renamed to `dir/name.failed.<i>.def`, or
///   `dir/name.failed.<i>.r<n>.def` when an earlier run already left that file
/// - the provenance manifest is `dir/name.provenance.json`
/// - `dir/name.attempts` lists the attempt files of a target in progress
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactLayout {
    output: PathBuf,
    dir: PathBuf,
    stem: String,
    suffix: String,
}

impl ArtifactLayout {
    pub fn new(output: impl Into<PathBuf>) -> Self {
        let output = output.into();
        let dir = output
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let stem = output
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let suffix = output
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();

        Self {
            output,
            dir,
            stem,
            suffix,
        }
    }

    /// Canonical output path.
    pub fn output(&self) -> &Path {
        &self.output
    }

    pub fn attempt_path(&self, index: u32) -> PathBuf {
        self.dir
            .join(format!("{}.{index}{}", self.stem, self.suffix))
    }

    pub fn failed_path(&self, index: u32) -> PathBuf {
        self.dir
            .join(format!("{}.failed.{index}{}", self.stem, self.suffix))
    }

    /// First failed-artifact name for `index` that does not exist yet.
    pub fn free_failed_path(&self, index: u32) -> PathBuf {
        let primary = self.failed_path(index);
        if !primary.exists() {
            return primary;
        }
        (1u32..)
            .map(|run| {
                self.dir.join(format!(
                    "{}.failed.{index}.r{run}{}",
                    self.stem, self.suffix
                ))
            })
            .find(|candidate| !candidate.exists())
            .unwrap_or(primary)
    }

    /// Directory holding the output and its artifacts.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Attempt path for `index` that does not overwrite another target's
    /// accepted output.
    ///
    /// `src/parser.2.cpp` is accepted as `parser.2.def`, which is also the
    /// third attempt name of `parser.def`; such an index moves to
    /// `<stem>.<i>.r<n><ext>`.
    pub fn free_attempt_path(&self, index: u32) -> PathBuf {
        let primary = self.attempt_path(index);
        if !Self::is_accepted_output(&primary) {
            return primary;
        }
        (1u32..)
            .map(|run| {
                self.dir
                    .join(format!("{}.{index}.r{run}{}", self.stem, self.suffix))
            })
            .find(|candidate| !candidate.exists() && !Self::is_accepted_output(candidate))
            .unwrap_or(primary)
    }

    /// Whether `path` is an accepted output, recognised by its provenance
    /// manifest.
    pub fn is_accepted_output(path: &Path) -> bool {
        Self::new(path).provenance_path().exists()
    }

    /// Attempt index encoded in `file_name`, if it names an attempt artifact
    /// of this output (`<stem>.<i><ext>` or `<stem>.<i>.r<n><ext>`).
    pub fn attempt_index(&self, file_name: &str) -> Option<u32> {
        let rest = file_name
            .strip_prefix(self.stem.as_str())?
            .strip_prefix('.')?
            .strip_suffix(self.suffix.as_str())?;
        let (index, run) = match rest.split_once(".r") {
            Some((index, run)) => (index, Some(run)),
            None => (rest, None),
        };
        let digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
        if !digits(index) || !run.is_none_or(digits) {
            return None;
        }
        index.parse().ok()
    }

    pub fn provenance_path(&self) -> PathBuf {
        self.dir.join(format!("{}.provenance.json", self.stem))
    }

    /// Journal of attempt file names written for this output; present only
    /// while a target is in progress.
    pub fn journal_path(&self) -> PathBuf {
        self.dir.join(format!("{}.attempts", self.stem))
    }
}

/// Record linking an accepted output back to what it was generated for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    pub run_id: Uuid,
    pub target: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function: Option<String>,
    pub model: String,
    pub accepted_attempt: u32,
    pub attempts: u32,
    pub artifact: PathBuf,
    pub created_at: DateTime<Utc>,
}
