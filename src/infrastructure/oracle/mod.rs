//! Verification oracle adapters.

pub mod process;

pub use process::ProcessOracle;
