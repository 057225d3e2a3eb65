//! Error types for the Ledgerwise domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum, folded into [`Error`].

use thiserror::Error;

/// The top-level error type for all Ledgerwise operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Generation service errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Knowledge store / index errors ---
    #[error("Knowledge error: {0}")]
    Knowledge(#[from] KnowledgeError),

    // --- Session store errors ---
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    // --- Request validation ---
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse failure classification surfaced to callers and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    UnknownSession,
    IndexBuildFailure,
    GenerationFailure,
    Internal,
}

impl ErrorKind {
    /// Stable snake_case label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidInput => "invalid_input",
            Self::UnknownSession => "unknown_session",
            Self::IndexBuildFailure => "index_build_failure",
            Self::GenerationFailure => "generation_failure",
            Self::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Error {
    /// Classify this error into the public failure taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::Session(SessionError::NotFound(_)) => ErrorKind::UnknownSession,
            Self::Knowledge(KnowledgeError::IndexBuild { .. }) => ErrorKind::IndexBuildFailure,
            // Outside an index build, a vectorizer failure means the query
            // itself could not be embedded by the external service.
            Self::Knowledge(KnowledgeError::Embedding { .. })
            | Self::Knowledge(KnowledgeError::Vectorization(_)) => ErrorKind::GenerationFailure,
            Self::Provider(_) => ErrorKind::GenerationFailure,
            _ => ErrorKind::Internal,
        }
    }

    /// The external service failure behind this error, if any.
    pub fn provider_error(&self) -> Option<&ProviderError> {
        match self {
            Self::Provider(e) => Some(e),
            Self::Knowledge(e) => e.provider_error(),
            _ => None,
        }
    }

    /// Whether retrying the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        self.provider_error().is_some_and(ProviderError::is_retryable)
    }

    /// Whether an external call ran out of time.
    pub fn is_timeout(&self) -> bool {
        matches!(self.provider_error(), Some(ProviderError::Timeout(_)))
    }
}

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Provider returned no content: {0}")]
    EmptyResponse(String),
}

impl ProviderError {
    /// Timeouts, transport failures, rate limits and 5xx responses are transient.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout(_) | Self::Network(_) | Self::RateLimited { .. } => true,
            Self::ApiError { status_code, .. } => *status_code >= 500,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum KnowledgeError {
    #[error("Index build failed at term '{term}': {source}")]
    IndexBuild {
        term: String,
        source: Box<KnowledgeError>,
    },

    #[error("Embedding via '{provider}' failed: {source}")]
    Embedding {
        provider: String,
        source: ProviderError,
    },

    #[error("Vectorization failed: {0}")]
    Vectorization(String),

    #[error("Index storage error: {0}")]
    Storage(String),

    #[error("Persisted index is corrupt: {0}")]
    Corrupt(String),

    #[error("Failed to load knowledge file {path}: {reason}")]
    Load { path: String, reason: String },
}

impl KnowledgeError {
    /// The external service failure behind this error, if any.
    pub fn provider_error(&self) -> Option<&ProviderError> {
        match self {
            Self::Embedding { source, .. } => Some(source),
            Self::IndexBuild { source, .. } => source.provider_error(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    NotFound(String),

    #[error("Session {0} has no pending turn to complete")]
    NoPendingTurn(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_displays_correctly() {
        let err = Error::Provider(ProviderError::ApiError {
            status_code: 429,
            message: "Too many requests".into(),
        });
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("Too many requests"));
    }

    #[test]
    fn kinds_follow_taxonomy() {
        assert_eq!(
            Error::InvalidInput("missing message".into()).kind(),
            ErrorKind::InvalidInput
        );
        assert_eq!(
            Error::from(SessionError::NotFound("abc".into())).kind(),
            ErrorKind::UnknownSession
        );
        assert_eq!(
            Error::from(KnowledgeError::IndexBuild {
                term: "budget".into(),
                source: Box::new(KnowledgeError::Vectorization("boom".into())),
            })
            .kind(),
            ErrorKind::IndexBuildFailure
        );
        assert_eq!(
            Error::from(KnowledgeError::Vectorization("no embedding returned".into())).kind(),
            ErrorKind::GenerationFailure
        );
        assert_eq!(
            Error::from(ProviderError::Timeout("60s".into())).kind(),
            ErrorKind::GenerationFailure
        );
        assert_eq!(
            Error::from(SessionError::NoPendingTurn("abc".into())).kind(),
            ErrorKind::Internal
        );
    }

    #[test]
    fn retryable_classification() {
        assert!(ProviderError::Timeout("t".into()).is_retryable());
        assert!(ProviderError::Network("reset".into()).is_retryable());
        assert!(ProviderError::RateLimited { retry_after_secs: 1 }.is_retryable());
        assert!(
            ProviderError::ApiError {
                status_code: 503,
                message: "unavailable".into()
            }
            .is_retryable()
        );
        assert!(
            !ProviderError::ApiError {
                status_code: 400,
                message: "bad".into()
            }
            .is_retryable()
        );
        assert!(!ProviderError::AuthenticationFailed("key".into()).is_retryable());
        assert!(!Error::InvalidInput("x".into()).is_retryable());
    }

    #[test]
    fn embedding_timeout_is_retryable_generation_failure() {
        let err = Error::from(KnowledgeError::Embedding {
            provider: "openai".into(),
            source: ProviderError::Timeout("embedding timed out".into()),
        });
        assert_eq!(err.kind(), ErrorKind::GenerationFailure);
        assert!(err.is_retryable());
        assert!(err.is_timeout());
        assert!(err.to_string().contains("embedding timed out"));
    }

    #[test]
    fn index_build_keeps_provider_classification() {
        let err = Error::from(KnowledgeError::IndexBuild {
            term: "bond".into(),
            source: Box::new(KnowledgeError::Embedding {
                provider: "gemini".into(),
                source: ProviderError::Network("reset".into()),
            }),
        });
        assert_eq!(err.kind(), ErrorKind::IndexBuildFailure);
        assert!(err.is_retryable());
        assert!(!err.is_timeout());

        let err = Error::from(KnowledgeError::Corrupt("bad json".into()));
        assert!(!err.is_retryable());
        assert!(err.provider_error().is_none());
    }

    #[test]
    fn kind_labels_are_snake_case() {
        assert_eq!(ErrorKind::GenerationFailure.to_string(), "generation_failure");
        assert_eq!(ErrorKind::UnknownSession.as_str(), "unknown_session");
    }
}
