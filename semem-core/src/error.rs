/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the semantic memory engine
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Unsupported operation: {0}")]
    Domain(String),

    #[error("Data error: {0}")]
    Data(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Provider unavailable: {0}")]
    Provider(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Check if this error is recoverable (can retry with backoff)
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::Http(_) | Error::Timeout(_) | Error::Storage(_) | Error::Provider(_) => true,
            Error::Config(_)
            | Error::Protocol(_)
            | Error::Parse(_)
            | Error::Domain(_)
            | Error::Data(_)
            | Error::SessionNotFound(_)
            | Error::Serialization(_)
            | Error::Io(_) => false,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::Timeout(err.to_string())
        } else if err.is_decode() {
            Error::Protocol(err.to_string())
        } else {
            Error::Http(err.to_string())
        }
    }
}
