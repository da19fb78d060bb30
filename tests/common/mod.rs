//! Shared fakes for integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use covseed::domain::errors::{GenerationError, OracleError};
use covseed::domain::models::Verdict;
use covseed::domain::ports::{
    ChatMessage, Completion, CompletionService, Sleeper, VerificationOracle,
};
use covseed::services::{BackoffPolicy, GenerationClient, PromptBuilder};

/// Completion service that replays a script, then repeats `fallback`.
pub struct ScriptedService {
    script: Mutex<VecDeque<Result<Option<String>, GenerationError>>>,
    fallback: Option<String>,
    requests: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedService {
    pub fn new(script: Vec<Result<Option<String>, GenerationError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Always answer with `text`.
    pub fn always(text: &str) -> Self {
        Self {
            fallback: Some(text.to_string()),
            ..Self::new(Vec::new())
        }
    }

    /// Always answer with an empty completion.
    pub fn always_empty() -> Self {
        Self::always("")
    }

    /// Every request seen so far.
    pub fn requests(&self) -> Vec<Vec<ChatMessage>> {
        self.requests.lock().unwrap().clone()
    }

    /// Last user message of every request.
    pub fn user_prompts(&self) -> Vec<String> {
        self.requests()
            .iter()
            .filter_map(|messages| messages.last().map(|m| m.content.clone()))
            .collect()
    }
}

#[async_trait]
impl CompletionService for ScriptedService {
    fn model(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, messages: &[ChatMessage]) -> Result<Completion, GenerationError> {
        self.requests.lock().unwrap().push(messages.to_vec());
        let next = self.script.lock().unwrap().pop_front();
        let text = match next {
            Some(step) => step?,
            None => self.fallback.clone(),
        };
        Ok(Completion {
            text,
            raw: String::new(),
        })
    }
}

/// Oracle with a fixed verdict sequence; the last verdict repeats.
pub struct ScriptedOracle {
    verdicts: Mutex<VecDeque<bool>>,
    last: Mutex<bool>,
    seen: Mutex<Vec<(PathBuf, String)>>,
}

impl ScriptedOracle {
    pub fn new(verdicts: &[bool]) -> Self {
        Self {
            verdicts: Mutex::new(verdicts.iter().copied().collect()),
            last: Mutex::new(verdicts.last().copied().unwrap_or(false)),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn always_reject() -> Self {
        Self::new(&[false])
    }

    pub fn always_accept() -> Self {
        Self::new(&[true])
    }

    /// Artifact paths and their contents at verification time.
    pub fn seen(&self) -> Vec<(PathBuf, String)> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl VerificationOracle for ScriptedOracle {
    fn name(&self) -> &str {
        "scripted-oracle"
    }

    async fn ensure_available(&self) -> Result<(), OracleError> {
        Ok(())
    }

    async fn verify(&self, artifact: &Path, _aux_files: &[PathBuf]) -> Result<Verdict, OracleError> {
        let content = std::fs::read_to_string(artifact).unwrap_or_default();
        self.seen
            .lock()
            .unwrap()
            .push((artifact.to_path_buf(), content));

        let accepted = self
            .verdicts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| *self.last.lock().unwrap());
        Ok(if accepted {
            Verdict::accepted("")
        } else {
            Verdict::rejected(format!("ERROR: {} rejected", artifact.display()))
        })
    }
}

/// Sleeper that only records the requested delays.
#[derive(Default)]
pub struct RecordingSleeper {
    delays: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn delays(&self) -> Vec<Duration> {
        self.delays.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.delays.lock().unwrap().push(duration);
    }
}

/// Generation client over `service` that never actually sleeps.
pub fn generator(service: Arc<ScriptedService>) -> (GenerationClient, Arc<RecordingSleeper>) {
    let sleeper = Arc::new(RecordingSleeper::default());
    let client = GenerationClient::with_sleeper(
        service,
        BackoffPolicy::new(3, Duration::from_secs(1), 2),
        sleeper.clone(),
    );
    (client, sleeper)
}

/// Prompt builder with one small library file.
pub fn prompts() -> PromptBuilder {
    PromptBuilder::new(&[covseed::services::LibraryFile {
        name: "tech.lef".to_string(),
        content: "VERSION 5.8 ;\nEND LIBRARY".to_string(),
    }])
}

/// Minimal accepted-looking design.
pub const DESIGN: &str = "VERSION 5.8 ;\nDESIGN top ;\nEND DESIGN";

/// Write `content` to `dir/name` and return the path.
pub fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
    path
}

/// Sorted file names in `dir`.
pub fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
