//! Error types for the use case layer

use hq_domain::{AgentError, MissionError, RepositoryError, Stage};
use thiserror::Error;

/// Failure talking to the model provider
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Provider returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Provider transport error: {0}")]
    Transport(String),

    #[error("Could not decode provider response: {0}")]
    Decode(String),
}

/// Failure talking to the chat platform
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Category '{category}' does not exist")]
    MissingCategory { category: String },

    #[error("Failed to send to #{channel}: {message}")]
    SendFailed { channel: String, message: String },
}

/// Failure reading a system prompt
#[derive(Debug, Error)]
pub enum PromptError {
    #[error("Failed to read prompt template {path}: {message}")]
    Read { path: String, message: String },
}

/// Failure reading or writing the chat transcript
#[derive(Debug, Error)]
pub enum TranscriptError {
    #[error("Transcript IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Transcript JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Everything the stage engine can fail with
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Prompt(#[from] PromptError),

    #[error(transparent)]
    Transcript(#[from] TranscriptError),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Mission error: {0}")]
    Mission(#[from] MissionError),

    #[error("Agent error: {0}")]
    Agent(#[from] AgentError),

    #[error("Mission '{0}' already exists")]
    MissionExists(String),

    #[error("Stage {stage} is not part of the stage plan")]
    StageNotPlanned { stage: Stage },

    #[error("Cannot go from stage {from} to {to}: stages advance one at a time")]
    StageSkipped { from: Stage, to: Stage },

    #[error("Mission '{mission}' has no stage after {stage}")]
    NoSuccessor { mission: String, stage: Stage },

    #[error("{operation} timed out after {seconds}s")]
    Timeout {
        operation: &'static str,
        seconds: u64,
    },
}

impl EngineError {
    /// Transient failures are worth retrying by the sender
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            EngineError::Timeout { .. } | EngineError::Provider(ProviderError::Transport(_))
        )
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
