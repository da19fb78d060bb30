//! Infrastructure layer
//!
//! Adapters for the outside world: configuration, logging, the chat
//! completion endpoint and the verification tool.

pub mod config;
pub mod llm;
pub mod logging;
pub mod oracle;
