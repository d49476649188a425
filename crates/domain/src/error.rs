/// Shared error type used across all GoalConvo crates.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("transport failure: {0}")]
    TransportFailure(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("rate limited, retry after {retry_after_ms:?}ms")]
    RateLimited { retry_after_ms: Option<u64> },

    #[error("bad LLM response: {0}")]
    BadLlmResponse(String),

    #[error("invalid dialogue: {0}")]
    InvalidDialogue(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("config error: {0}")]
    ConfigError(String),
}

impl Error {
    /// Whether a caller should retry the operation that produced this error.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            Error::Timeout(_) | Error::RateLimited { .. } | Error::TransportFailure(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
