use thiserror::Error;

/// Result type for APOD operations.
pub type Result<T> = std::result::Result<T, ApodError>;

/// Errors surfaced by the APOD client.
#[derive(Debug, Error)]
pub enum ApodError {
    /// The local rate limiter denied a permit. No request was sent.
    #[error("Rate limit exceeded: no permit available for another APOD request")]
    RateLimitExceeded,

    /// Anything the HTTP transport reports, including non-2xx statuses.
    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    #[error("Invalid request URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// A call that expected exactly one record got none.
    #[error("APOD response contained no records")]
    EmptyResult,

    #[error("APOD record has no date")]
    MissingDate,

    #[error("APOD record has an invalid date '{value}': {source}")]
    InvalidDate {
        value: String,
        #[source]
        source: chrono::ParseError,
    },
}

impl ApodError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ApodError::RateLimitExceeded)
    }
}
