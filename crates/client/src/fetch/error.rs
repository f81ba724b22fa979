//! Network fetch error types.

use std::sync::Arc;

/// A fetch that produced no HTTP response at all.
///
/// Non-2xx statuses are not errors at this layer; they come back as a
/// regular `HttpResponse` and each strategy decides what they mean.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
    /// The request could not be turned into an upstream request.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Connection refused, DNS failure, or similar.
    #[error("connect error: {0}")]
    Connect(String),

    /// Request timeout.
    #[error("request timeout")]
    Timeout,

    /// Any other transport failure.
    #[error("network error: {0}")]
    Network(Arc<reqwest::Error>),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else if err.is_connect() {
            FetchError::Connect(err.to_string())
        } else if err.is_builder() {
            FetchError::InvalidRequest(err.to_string())
        } else {
            FetchError::Network(Arc::new(err))
        }
    }
}

impl From<FetchError> for pantry_core::Error {
    fn from(err: FetchError) -> Self {
        pantry_core::Error::Network(err.to_string())
    }
}
