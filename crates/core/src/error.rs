//! Error types for Agri Advisor.
//!
//! One unified error enum covers configuration, I/O, corpus loading, the
//! dense index, retrieval, prompt rendering and the LLM collaborator.
//!
//! Evidentiary insufficiency and missing slots are *not* errors: they are
//! grounding decisions and never surface through this type.

use thiserror::Error;

/// Unified error type for Agri Advisor.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Answer synthesis / LLM provider errors
    #[error("LLM error: {0}")]
    Llm(String),

    /// Corpus snapshot errors (missing shards, empty corpus)
    #[error("Corpus error: {0}")]
    Corpus(String),

    /// Dense index and embedding errors
    #[error("Index error: {0}")]
    Index(String),

    /// Errors raised while ranking a query
    #[error("Retrieval error: {0}")]
    Retrieval(String),

    /// Prompt system errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AppError::Corpus("no shards".to_string());
        assert_eq!(err.to_string(), "Corpus error: no shards");
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: AppError = json_err.into();
        assert!(matches!(err, AppError::Serialization(_)));
    }
}
