use thiserror::Error;

/// Why a ticker list or price history could not be obtained.
///
/// Raised at the fetch boundary and consumed by the screener, which logs it
/// and moves on to the next ticker.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("venue returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("rate limited by venue")]
    RateLimited,

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("no price data for {0}")]
    Empty(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}
