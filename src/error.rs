//! Error types for the stock trading agent

use thiserror::Error;

/// Result type alias for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;

#[derive(Error, Debug)]
pub enum AgentError {

    // =============================
    // Core Loop Errors
    // =============================

    #[error("LLM error: {0}")]
    LlmError(String),

    #[error("Tool error: {0}")]
    ToolError(String),

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Invalid tool input: {0}")]
    InvalidToolInput(String),

    #[error("Market data error: {0}")]
    MarketDataError(String),

    #[error("Session error: {0}")]
    SessionError(String),

    #[error("Confirmation pending: {0}")]
    ConfirmationPending(String),

    #[error("No pending confirmation: {0}")]
    NoPendingConfirmation(String),

    #[error("Tool rounds exceeded: {0}")]
    ToolRoundsExceeded(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
