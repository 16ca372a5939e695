use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, ScanError>;

/// Errors raised by a single navigation. None of these ever escape a crawl attempt.
#[derive(Error, Debug)]
pub enum FetchError {
    /// Request refused by the fetcher's block policy.
    #[error("net::ERR_ABORTED {0}")]
    Aborted(String),

    #[error("Navigation timeout of {}ms exceeded", .0.as_millis())]
    Timeout(Duration),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Evaluation failed: {0}")]
    Evaluation(String),
}

impl FetchError {
    /// Aborts come from our own block policy and are not worth reporting.
    pub fn is_abort(&self) -> bool {
        matches!(self, FetchError::Aborted(_))
    }

    pub(crate) fn from_reqwest(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            FetchError::Timeout(timeout)
        } else {
            FetchError::Transport(err.to_string())
        }
    }
}
