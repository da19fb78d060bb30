//! Port traits for the external collaborators of the synthesis loop.

pub mod completion;
pub mod oracle;
pub mod sleeper;

pub use completion::{ChatMessage, Completion, CompletionService, Role};
pub use oracle::VerificationOracle;
pub use sleeper::{Sleeper, TokioSleeper};
