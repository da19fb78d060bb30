//! Verification oracle backed by an external checker process.
//!
//! The checker receives the candidate and the auxiliary library files through
//! environment variables and signals acceptance with exit status 0.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;

use crate::domain::errors::OracleError;
use crate::domain::models::{OracleConfig, Verdict};
use crate::domain::ports::VerificationOracle;

/// DEF checker script compiled into the binary.
pub const BUNDLED_SCRIPT: &str = include_str!("../../../scripts/check_def.tcl");

/// Script appended to the checker's arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ScriptSource {
    None,
    File(PathBuf),
    Bundled,
}

/// Oracle that runs a checker executable once per candidate.
#[derive(Debug, Clone)]
pub struct ProcessOracle {
    program: String,
    args: Vec<OsString>,
    script: ScriptSource,
    artifact_var: String,
    aux_files_var: String,
}

impl ProcessOracle {
    pub fn new(config: &OracleConfig) -> Self {
        Self {
            program: config.program.clone(),
            args: config.args.iter().map(OsString::from).collect(),
            script: match (&config.script, config.bundled_script) {
                (Some(path), _) => ScriptSource::File(path.clone()),
                (None, true) => ScriptSource::Bundled,
                (None, false) => ScriptSource::None,
            },
            artifact_var: config.artifact_var.clone(),
            aux_files_var: config.aux_files_var.clone(),
        }
    }

    /// Locate the checker executable.
    pub fn resolve_program(&self) -> Result<PathBuf, OracleError> {
        find_executable(&self.program, std::env::var_os("PATH"))
            .ok_or_else(|| OracleError::ExecutableNotFound(self.program.clone()))
    }

    /// Absolute path of the script to pass, writing the bundled one out
    /// when needed.
    pub fn script_path(&self) -> Result<Option<PathBuf>, OracleError> {
        match &self.script {
            ScriptSource::None => Ok(None),
            ScriptSource::File(path) if path.is_file() => Ok(Some(absolute(path))),
            ScriptSource::File(path) => Err(OracleError::ScriptNotFound(path.clone())),
            ScriptSource::Bundled => bundled_script_path().map(Some),
        }
    }

    /// Pick the diagnostic text: stderr if present, otherwise stdout.
    fn diagnostic(stdout: &str, stderr: &str) -> String {
        let stderr = stderr.trim();
        if stderr.is_empty() {
            stdout.trim().to_string()
        } else {
            stderr.to_string()
        }
    }
}

/// Search for `program` the way a shell would: paths containing a separator
/// are taken as-is, bare names are looked up in every `PATH` entry.
fn find_executable(program: &str, path_var: Option<OsString>) -> Option<PathBuf> {
    let candidate = Path::new(program);
    if candidate.components().count() > 1 {
        return candidate.is_file().then(|| candidate.to_path_buf());
    }

    let path_var = path_var?;
    std::env::split_paths(&path_var)
        .map(|dir| dir.join(program))
        .find(|full| full.is_file())
}

/// Materialize [`BUNDLED_SCRIPT`] under the temp directory, keyed by version.
fn bundled_script_path() -> Result<PathBuf, OracleError> {
    let path = std::env::temp_dir()
        .join(format!("covseed-{}", env!("CARGO_PKG_VERSION")))
        .join("check_def.tcl");
    if std::fs::read_to_string(&path).is_ok_and(|current| current == BUNDLED_SCRIPT) {
        return Ok(path);
    }

    // Write then rename so a concurrent run never reads a partial script.
    let staging = path.with_extension(format!("tcl.{}", std::process::id()));
    let write = || -> std::io::Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(&staging, BUNDLED_SCRIPT)?;
        std::fs::rename(&staging, &path)
    };
    write().map_err(|source| OracleError::BundledScript {
        path: path.clone(),
        source,
    })?;
    tracing::debug!(script = %path.display(), "Bundled checker script written");
    Ok(path)
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

#[async_trait]
impl VerificationOracle for ProcessOracle {
    fn name(&self) -> &str {
        &self.program
    }

    async fn ensure_available(&self) -> Result<(), OracleError> {
        let resolved = self.resolve_program()?;
        let script = self.script_path()?;
        tracing::info!(
            oracle = %resolved.display(),
            script = ?script,
            "Verification tool available"
        );
        Ok(())
    }

    async fn verify(&self, artifact: &Path, aux_files: &[PathBuf]) -> Result<Verdict, OracleError> {
        let program = self.resolve_program()?;
        let script = self.script_path()?;
        let aux_joined = aux_files
            .iter()
            .map(|f| absolute(f).display().to_string())
            .collect::<Vec<_>>()
            .join(" ");

        tracing::debug!(
            oracle = %program.display(),
            artifact = %artifact.display(),
            aux_files = aux_files.len(),
            "Running verification"
        );

        let mut command = Command::new(&program);
        command
            .args(&self.args)
            .env(&self.artifact_var, absolute(artifact))
            .env(&self.aux_files_var, aux_joined)
            .kill_on_drop(true);
        if let Some(script) = script {
            command.arg(script);
        }

        let output = command.output().await.map_err(|source| OracleError::Spawn {
            program: self.program.clone(),
            source,
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let accepted = output.status.success();

        if !stdout.trim().is_empty() {
            if accepted {
                tracing::debug!(stdout = %stdout.trim(), "Verification stdout");
            } else {
                tracing::warn!(stdout = %stdout.trim(), "Verification stdout");
            }
        }
        if !stderr.trim().is_empty() {
            tracing::error!(stderr = %stderr.trim(), "Verification stderr");
        }

        let diagnostic = Self::diagnostic(&stdout, &stderr);
        tracing::info!(
            artifact = %artifact.display(),
            accepted,
            status = ?output.status.code(),
            "Verification complete"
        );

        Ok(Verdict {
            accepted,
            diagnostic,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_prefers_stderr() {
        assert_eq!(ProcessOracle::diagnostic("out\n", "err\n"), "err");
        assert_eq!(ProcessOracle::diagnostic("out\n", "  \n"), "out");
        assert_eq!(ProcessOracle::diagnostic("", ""), "");
    }

    #[test]
    fn test_find_executable_on_path() {
        let dir = tempfile::tempdir().unwrap();
        let tool = dir.path().join("checker");
        std::fs::write(&tool, "").unwrap();

        let path_var = std::env::join_paths([dir.path()]).unwrap();
        assert_eq!(find_executable("checker", Some(path_var.clone())), Some(tool));
        assert_eq!(find_executable("missing-tool", Some(path_var)), None);
        assert_eq!(find_executable("checker", None), None);
    }

    #[test]
    fn test_find_executable_with_separator() {
        let dir = tempfile::tempdir().unwrap();
        let tool = dir.path().join("checker");
        std::fs::write(&tool, "").unwrap();

        let program = tool.display().to_string();
        assert_eq!(find_executable(&program, None), Some(tool));
    }

    #[test]
    fn test_script_source_from_config() {
        let bundled = ProcessOracle::new(&OracleConfig::default());
        assert_eq!(bundled.script, ScriptSource::Bundled);

        let explicit = ProcessOracle::new(&OracleConfig {
            script: Some(PathBuf::from("checks/def.tcl")),
            ..Default::default()
        });
        assert_eq!(
            explicit.script,
            ScriptSource::File(PathBuf::from("checks/def.tcl"))
        );

        let none = ProcessOracle::new(&OracleConfig {
            bundled_script: false,
            ..Default::default()
        });
        assert_eq!(none.script, ScriptSource::None);
        assert_eq!(none.script_path().unwrap(), None);
    }

    #[test]
    fn test_bundled_script_is_written_outside_working_dir() {
        let path = bundled_script_path().unwrap();
        assert!(path.is_absolute());
        assert!(path.starts_with(std::env::temp_dir()));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), BUNDLED_SCRIPT);
        assert!(BUNDLED_SCRIPT.contains("read_def"));

        // A second call reuses the file.
        assert_eq!(bundled_script_path().unwrap(), path);
    }

    #[tokio::test]
    async fn test_missing_tool_is_reported() {
        let oracle = ProcessOracle::new(&OracleConfig {
            program: "covseed-no-such-checker".to_string(),
            ..Default::default()
        });
        let err = oracle.ensure_available().await.unwrap_err();
        assert!(matches!(err, OracleError::ExecutableNotFound(_)));
    }
}
