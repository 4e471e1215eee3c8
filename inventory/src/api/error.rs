use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("item not found")]
    NotFound,

    /// Displays as the bare status text, e.g. `500 Internal Server Error`
    #[error("{status}")]
    UnexpectedStatus { status: reqwest::StatusCode },

    #[error("Failed to parse response: {0}")]
    Decode(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("request cancelled")]
    Cancelled,
}
