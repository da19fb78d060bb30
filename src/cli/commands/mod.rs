//! CLI command implementations.

pub mod coverage;
pub mod repair;
pub mod seed;
pub mod snippet;
pub mod verify;
