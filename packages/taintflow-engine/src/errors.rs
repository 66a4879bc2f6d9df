//! Error types for taintflow-engine
//!
//! Provides unified error handling across the crate.

use thiserror::Error;

/// Main error type for taintflow operations
#[derive(Debug, Error)]
pub enum TaintflowError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error (fatal for the single file; other files continue)
    #[error("Parse error: {0}")]
    Parse(String),

    /// Configuration error (fatal for the whole run)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Analysis error (internal invariant violation)
    #[error("Analysis error: {0}")]
    Analysis(String),
}

impl TaintflowError {
    /// Create a parse error
    pub fn parse(msg: impl Into<String>) -> Self {
        TaintflowError::Parse(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        TaintflowError::Config(msg.into())
    }

    /// Create an internal analysis error
    pub fn internal(msg: impl Into<String>) -> Self {
        TaintflowError::Analysis(msg.into())
    }
}

/// Result type alias for taintflow operations
pub type Result<T> = std::result::Result<T, TaintflowError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TaintflowError::parse("unexpected token");
        assert_eq!(err.to_string(), "Parse error: unexpected token");

        let err = TaintflowError::config("empty sink list");
        assert!(err.to_string().starts_with("Configuration error"));
    }
}
