//! Error types for Mneme operations

/// Result type for Mneme operations
pub type Result<T> = std::result::Result<T, MnemeError>;

/// Error types for the memory engine
#[derive(Debug, thiserror::Error)]
pub enum MnemeError {
    /// Durable write or read against the conversation store failed
    #[error("Conversation store unavailable: {0}")]
    StoreUnavailable(String),

    /// A turn was requested on a session that was never started or is closed
    #[error("No active session. Call start() first")]
    NoActiveSession,

    /// The LLM delegate call failed; the turn may be retried
    #[error("Generation failed: {0}")]
    GenerationFailed(String),

    /// Summarizer delegate failed; internal, degrades to trimming
    #[error("Summarization failed: {0}")]
    Summarization(String),

    /// Unrecognized memory policy selector
    #[error("Unknown memory policy: {0}")]
    UnknownPolicy(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<String> for MnemeError {
    fn from(s: String) -> Self {
        MnemeError::Other(s)
    }
}

impl From<&str> for MnemeError {
    fn from(s: &str) -> Self {
        MnemeError::Other(s.to_string())
    }
}

impl From<anyhow::Error> for MnemeError {
    fn from(err: anyhow::Error) -> Self {
        MnemeError::Other(err.to_string())
    }
}
