//! Error types for the promptforge optimization engine
//!
//! This module provides structured error handling using thiserror for
//! error definitions and anyhow for propagation at the binary edges.

use thiserror::Error;

/// Main error type for promptforge operations
#[derive(Error, Debug)]
pub enum PromptforgeError {
    /// Malformed caller input (empty prompt, out-of-range rating, bad field)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Task type outside the closed enumeration
    #[error("Unsupported task type: {0}")]
    UnsupportedTaskType(String),

    /// Scorer exceeded the caller-specified budget
    #[error("Scorer timed out after {0}ms")]
    Timeout(u64),

    /// Internal or external scorer dependency error
    #[error("Scorer failure: {0}")]
    ScorerFailure(String),

    /// Unknown identifier on lookup
    #[error("Not found: {0}")]
    NotFound(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

/// Result type alias for promptforge operations
pub type Result<T> = std::result::Result<T, PromptforgeError>;

/// Convert anyhow::Error to PromptforgeError
impl From<anyhow::Error> for PromptforgeError {
    fn from(err: anyhow::Error) -> Self {
        PromptforgeError::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PromptforgeError::NotFound("OPT-123".to_string());
        assert_eq!(err.to_string(), "Not found: OPT-123");

        let err = PromptforgeError::Timeout(5000);
        assert_eq!(err.to_string(), "Scorer timed out after 5000ms");
    }

    #[test]
    fn test_anyhow_conversion() {
        let err: PromptforgeError = anyhow::anyhow!("boom").into();
        assert!(matches!(err, PromptforgeError::Other(_)));
        assert_eq!(err.to_string(), "boom");
    }
}
