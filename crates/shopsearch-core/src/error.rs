//! Error types for the search pipeline.

use thiserror::Error;

/// Result type alias using SearchError.
pub type Result<T> = std::result::Result<T, SearchError>;

/// Which retrieval lane an error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lane {
    /// Approximate-nearest-neighbor vector lane.
    Ann,
    /// Full-text lexical lane.
    Lexical,
}

impl std::fmt::Display for Lane {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ann => write!(f, "ann"),
            Self::Lexical => write!(f, "lexical"),
        }
    }
}

/// Errors that can occur while serving a search request.
///
/// Any embedding or retrieval failure is fatal to the request; per-ID
/// hydration loss is not an error and never appears here.
#[derive(Error, Debug)]
pub enum SearchError {
    /// Malformed request (empty query, bad limit/score). Rejected before
    /// any remote call.
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    /// Embedding endpoint rejected our credentials.
    #[error("Embedding auth failure: {message}")]
    EmbeddingAuth { message: String },

    /// Embedding call exceeded its deadline.
    #[error("Embedding call timed out after {elapsed_ms}ms")]
    EmbeddingTimeout { elapsed_ms: u64 },

    /// Embedding endpoint returned a non-success HTTP status.
    #[error("Embedding endpoint returned status {status}: {message}")]
    EmbeddingStatus { status: u16, message: String },

    /// Embedding response envelope did not parse.
    #[error("Malformed embedding response: {message}")]
    EmbeddingResponse { message: String },

    /// Embedding response carried no vector, or one of the wrong dimension.
    /// Never substituted with a zero vector.
    #[error("Embedding response had {got} values, expected {expected}")]
    EmbeddingEmpty { got: usize, expected: usize },

    /// A retrieval lane's data access failed.
    #[error("Retrieval failure in {lane} lane: {message}")]
    Retrieval { lane: Lane, message: String },

    /// The batched hydration lookup itself failed.
    #[error("Hydration failure: {message}")]
    Hydration { message: String },

    /// Store error outside the search path (loading, stats).
    #[error("Store error: {message}")]
    Store { message: String },

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SearchError {
    /// Create an invalid request error.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Create a retrieval error for the given lane.
    pub fn retrieval(lane: Lane, message: impl Into<String>) -> Self {
        Self::Retrieval {
            lane,
            message: message.into(),
        }
    }

    /// Create a hydration error.
    pub fn hydration(message: impl Into<String>) -> Self {
        Self::Hydration {
            message: message.into(),
        }
    }

    /// Create a store error.
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Machine-readable error code.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidRequest { .. } => "INVALID_REQUEST",
            Self::EmbeddingAuth { .. } => "EMBEDDING_AUTH",
            Self::EmbeddingTimeout { .. } => "EMBEDDING_TIMEOUT",
            Self::EmbeddingStatus { .. } => "EMBEDDING_STATUS",
            Self::EmbeddingResponse { .. } => "EMBEDDING_RESPONSE",
            Self::EmbeddingEmpty { .. } => "EMBEDDING_EMPTY",
            Self::Retrieval { .. } => "RETRIEVAL_FAILURE",
            Self::Hydration { .. } => "HYDRATION_FAILURE",
            Self::Store { .. } => "STORE_ERROR",
            Self::Config { .. } => "CONFIG_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// HTTP status this error surfaces as: 400 for caller errors, 500
    /// for everything else. No partial/degraded response body on failure.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::InvalidRequest { .. } => 400,
            _ => 500,
        }
    }

    /// Whether this error is an embedding failure of any kind.
    pub fn is_embedding_failure(&self) -> bool {
        matches!(
            self,
            Self::EmbeddingAuth { .. }
                | Self::EmbeddingTimeout { .. }
                | Self::EmbeddingStatus { .. }
                | Self::EmbeddingResponse { .. }
                | Self::EmbeddingEmpty { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SearchError::retrieval(Lane::Ann, "index unavailable");
        assert!(err.to_string().contains("ann"));
        assert!(err.to_string().contains("index unavailable"));
    }

    #[test]
    fn test_http_status_mapping() {
        assert_eq!(SearchError::invalid_request("empty query").http_status(), 400);
        assert_eq!(
            SearchError::EmbeddingTimeout { elapsed_ms: 1000 }.http_status(),
            500
        );
        assert_eq!(SearchError::hydration("connection reset").http_status(), 500);
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            SearchError::invalid_request("x").error_code(),
            "INVALID_REQUEST"
        );
        assert_eq!(
            SearchError::EmbeddingEmpty { got: 0, expected: 768 }.error_code(),
            "EMBEDDING_EMPTY"
        );
        assert_eq!(
            SearchError::retrieval(Lane::Lexical, "x").error_code(),
            "RETRIEVAL_FAILURE"
        );
    }

    #[test]
    fn test_embedding_failure_predicate() {
        assert!(SearchError::EmbeddingEmpty { got: 0, expected: 768 }.is_embedding_failure());
        assert!(!SearchError::invalid_request("x").is_embedding_failure());
    }
}
