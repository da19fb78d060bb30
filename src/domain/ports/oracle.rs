use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::domain::errors::OracleError;
use crate::domain::models::Verdict;

/// Port trait for the external checker that accepts or rejects candidates.
#[async_trait]
pub trait VerificationOracle: Send + Sync {
    /// Human-readable name for logs.
    fn name(&self) -> &str;

    /// Check that the oracle can run at all. Called once before any target.
    async fn ensure_available(&self) -> Result<(), OracleError>;

    /// Judge `artifact` against the given auxiliary library files.
    async fn verify(&self, artifact: &Path, aux_files: &[PathBuf]) -> Result<Verdict, OracleError>;
}
