//! Crate-wide error type for search, fetch, and persistence failures.

/// Errors raised while harvesting articles.
#[derive(Debug, thiserror::Error)]
pub enum HarvestError {
    /// Network or transport error, including request timeouts.
    #[error("network error: {0}")]
    Network(String),

    /// Explicit rate-limit response (HTTP 429).
    #[error("rate limited by the endpoint")]
    RateLimited,

    /// Server-side failure (5xx).
    #[error("server error: {0}")]
    Server(String),

    /// Malformed response body (JSON or XML).
    #[error("parse error: {0}")]
    Parse(String),

    /// Unexpected, non-retryable API response.
    #[error("API error: {0}")]
    Api(String),

    /// The record does not exist at the endpoint.
    #[error("record not found: {0}")]
    NotFound(String),

    /// The repository holds the record but will not serve its full text.
    #[error("record unavailable: {0}")]
    Unavailable(String),

    /// Search failed after retries; fatal for a run.
    #[error("search failed: {0}")]
    Search(String),

    /// Filesystem fault while persisting an artifact.
    #[error("storage error: {0}")]
    Io(#[from] std::io::Error),
}

impl HarvestError {
    /// Whether a retry can plausibly fix this failure.
    ///
    /// Malformed bodies count as transient: NCBI intermittently serves
    /// truncated responses under load.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::RateLimited | Self::Server(_) | Self::Parse(_)
        )
    }

    /// Map a non-success HTTP status onto the matching error kind.
    pub(crate) fn from_status(status: reqwest::StatusCode, context: &str) -> Self {
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            Self::RateLimited
        } else if status == reqwest::StatusCode::NOT_FOUND {
            Self::NotFound(context.to_string())
        } else if status.is_server_error() {
            Self::Server(format!("{context}: HTTP {status}"))
        } else {
            Self::Api(format!("{context}: HTTP {status}"))
        }
    }
}

impl From<reqwest::Error> for HarvestError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return Self::Network(format!("request timed out: {err}"));
        }
        Self::Network(err.to_string())
    }
}

impl From<serde_json::Error> for HarvestError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(format!("JSON: {err}"))
    }
}
