//! Service layer: the synthesis loop and the pure helpers around it.

pub mod backoff;
pub mod def_repair;
pub mod function_extract;
pub mod generation_client;
pub mod prompts;
pub mod run_controller;
pub mod synthesis_agent;
pub mod target_selector;

pub use backoff::BackoffPolicy;
pub use def_repair::repair_def;
pub use function_extract::{extract_function, sanitize_filename};
pub use generation_client::{strip_code_fences, GenerationClient};
pub use prompts::{LibraryFile, PromptBuilder};
pub use run_controller::{RunController, RunSettings, RunSummary, TargetReport, TargetStatus};
pub use synthesis_agent::{AgentSettings, SynthesisAgent, SynthesisRequest, TargetResult};
pub use target_selector::{SelectionWindow, TargetSelector};
