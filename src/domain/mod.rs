//! Domain layer: coverage data, targets, attempts and the ports the
//! synthesis loop talks through.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{GenerationError, OracleError, SelectionError, SynthesisError, SynthesisResult};
