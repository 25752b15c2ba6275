// Error taxonomy for retrieval, search and configuration.
//
// None of these reach HTTP callers as structured payloads: fetch errors
// collapse into the "Failed to retrieve content" sentinel, search errors
// into the one-element `{"error": ...}` list.

/// Why a single fetch attempt (direct or render) produced no HTML.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// DNS, connect, TLS, timeout or body-read failure.
    #[error("transport error for '{url}': {reason}")]
    Transport { url: String, reason: String },

    /// Upstream answered with a non-success status.
    #[error("HTTP {status} for '{url}'")]
    UpstreamStatus { url: String, status: u16 },

    /// Success status with nothing but whitespace in the body.
    #[error("empty response body for '{url}'")]
    EmptyBody { url: String },

    /// Body larger than the page size cap.
    #[error("response too large for '{url}': {bytes} bytes")]
    TooLarge { url: String, bytes: usize },
}

impl FetchError {
    pub(crate) fn transport(url: &str, err: impl std::fmt::Display) -> Self {
        FetchError::Transport {
            url: url.to_string(),
            reason: err.to_string(),
        }
    }
}

/// The search engine itself failed; turned into the error payload.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("Search query failed with error: {0}")]
    Transport(String),

    #[error("Search query failed with HTTP error: {0}")]
    Status(String),

    #[error("Search query failed with error: invalid response body: {0}")]
    Decode(String),
}

/// Startup configuration problems.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },

    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),
}
