//! Error types for the retrieval-augmented answer backend

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy for the answer backend
///
/// Transient backend failures are retryable; everything else either aborts
/// the build stage, surfaces as not-ready, or is returned to the caller as a
/// structured payload.
#[derive(Error, Debug)]
pub enum Error {
    #[error("transient backend error: {0}")]
    TransientBackend(String),

    #[error("embedding backend error: {0}")]
    Embedding(String),

    #[error("generation backend error: {0}")]
    Generation(String),

    #[error("index unavailable: {0}")]
    IndexUnavailable(String),

    #[error("index build error: {0}")]
    Build(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Stable machine-readable error kind
    pub fn kind(&self) -> &'static str {
        match self {
            Error::TransientBackend(_) => "transient_backend",
            Error::Embedding(_) => "embedding",
            Error::Generation(_) => "generation",
            Error::IndexUnavailable(_) => "index_unavailable",
            Error::Build(_) => "build",
            Error::Config(_) => "config",
            Error::InvalidInput(_) => "invalid_input",
            Error::Timeout(_) => "timeout",
            Error::Serialization(_) => "serialization",
            Error::Io(_) => "io",
        }
    }

    /// Whether retrying the same call can reasonably succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::TransientBackend(_) | Error::Timeout(_))
    }

    /// User-visible payload; internal details stay in logs
    pub fn to_payload(&self) -> ErrorPayload {
        let message = match self {
            Error::TransientBackend(_) => "A backend dependency is temporarily unavailable.",
            Error::Embedding(_) => "The embedding backend rejected the request.",
            Error::Generation(_) => "The generation backend rejected the request.",
            Error::IndexUnavailable(_) => "The retrieval index is not available. The service is not ready.",
            Error::Build(_) => "The index build failed.",
            Error::Config(_) => "The service configuration is invalid.",
            Error::InvalidInput(_) => "The query was rejected.",
            Error::Timeout(_) => "The request timed out.",
            Error::Serialization(_) => "An internal serialization failure occurred.",
            Error::Io(_) => "An internal storage failure occurred.",
        };

        ErrorPayload {
            kind: self.kind().to_string(),
            message: message.to_string(),
            retryable: self.is_transient(),
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Build(err.to_string())
    }
}

/// Structured error payload returned to callers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub kind: String,
    pub message: String,
    pub retryable: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(Error::TransientBackend("503".to_string()).is_transient());
        assert!(Error::Timeout("embed call".to_string()).is_transient());
        assert!(!Error::IndexUnavailable("missing".to_string()).is_transient());
        assert!(!Error::Build("empty input".to_string()).is_transient());
    }

    #[test]
    fn test_payload_hides_internal_details() {
        let err = Error::Generation("upstream said: secret-internal-hostname".to_string());
        let payload = err.to_payload();
        assert_eq!(payload.kind, "generation");
        assert!(!payload.retryable);
        assert!(!payload.message.contains("secret-internal-hostname"));
    }

    #[test]
    fn test_payload_snapshot() {
        let payload = Error::TransientBackend("connection refused".to_string()).to_payload();
        let json = serde_json::to_string(&payload).unwrap();
        insta::assert_snapshot!(json, @r#"{"kind":"transient_backend","message":"A backend dependency is temporarily unavailable.","retryable":true}"#);
    }
}
