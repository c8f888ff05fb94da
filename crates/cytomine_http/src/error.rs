//! Error types for building the HTTP transport.

use thiserror::Error;

/// Result type for transport construction.
pub type HttpResult<T> = Result<T, HttpError>;

/// Errors raised while building an [`HttpTransport`](crate::HttpTransport).
#[derive(Error, Debug)]
pub enum HttpError {
    /// The base URL is empty or has no scheme.
    #[error("invalid base url: {0}")]
    InvalidUrl(String),

    /// A default header could not be encoded.
    #[error("invalid header `{name}`: {message}")]
    InvalidHeader {
        /// Header name.
        name: String,
        /// Why it was rejected.
        message: String,
    },

    /// The underlying client could not be created.
    #[error("failed to build http client: {0}")]
    Client(#[from] reqwest::Error),
}
