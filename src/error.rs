//! Error taxonomy for catalog operations.
//!
//! The fetch engine degrades every failure class to "no progress this round"
//! (prior state intact, back to idle), but the classes stay distinct here so
//! the failure mode is auditable and testable.

use reqwest::StatusCode;
use thiserror::Error;

/// Umbrella error for a single fetch round.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Cache(#[from] CacheError),
}

/// Failures while constructing the HTTP client or performing a request.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid gateway url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("invalid header name: {0}")]
    HeaderName(#[from] reqwest::header::InvalidHeaderName),
    #[error("invalid header value: {0}")]
    HeaderValue(#[from] reqwest::header::InvalidHeaderValue),
    #[error("failed to build http client: {0}")]
    Build(#[source] reqwest::Error),
    #[error("request failed: {0}")]
    Request(#[source] reqwest::Error),
    #[error("unexpected response status: {0}")]
    Status(StatusCode),
}

/// The response body did not match the expected page envelope.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed page envelope: {0}")]
    Envelope(#[from] serde_json::Error),
}

/// The response cache backend was unable to serve a read or write.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache storage unavailable: {0}")]
    Unavailable(String),
}
