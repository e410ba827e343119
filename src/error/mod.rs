//! Error types for Palaver.

use thiserror::Error;

/// Primary error type for all Palaver operations.
#[derive(Error, Debug)]
pub enum PalaverError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid transcript: {0}")]
    InvalidTranscript(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Tool execution error: {tool_name}: {message}")]
    ToolExecution { tool_name: String, message: String },

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Run exhausted: tool loop exceeded {iterations} iterations")]
    RunExhausted { iterations: usize },

    #[error("Conversation busy: '{0}' already has an active run")]
    ConversationBusy(String),

    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl PalaverError {
    /// Whether this error terminates a run (as opposed to being folded into
    /// the transcript as a tool-result error payload).
    pub fn is_run_terminating(&self) -> bool {
        !matches!(
            self,
            Self::ToolExecution { .. } | Self::Checkpoint(_) | Self::InvalidArgument(_)
        )
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, PalaverError>;
