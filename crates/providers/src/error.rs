use thiserror::Error;

/// Errors raised while talking to the Spotify accounts or Web API.
#[derive(Debug, Error)]
pub enum SpotifyError {
    /// HTTP request failed before a response arrived
    #[error("spotify request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Non-success response from the Web API
    #[error("spotify api error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("spotify rate limit hit, retry after {retry_after_secs} seconds")]
    RateLimited { retry_after_secs: u64 },

    /// Token endpoint rejected the grant
    #[error("spotify authorization failed: {0}")]
    Auth(String),

    #[error("authorization response rejected: {0}")]
    AuthorizationResponse(String),

    #[error("failed to parse spotify response: {0}")]
    Parse(String),

    #[error("token cache io error: {0}")]
    Io(#[from] std::io::Error),
}
