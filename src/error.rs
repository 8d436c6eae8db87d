//! Error type shared by the batching core and the provider clients.

use thiserror::Error;

/// Errors produced while partitioning, executing, or stitching requests.
///
/// Provider failures are propagated verbatim as the error of the whole
/// top-level call. Nothing is retried and no partial result is returned.
#[derive(Error, Debug)]
pub enum Error {
    /// Transport failure reported by the HTTP client.
    #[cfg(feature = "http")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with a non-success HTTP status.
    #[error("provider returned HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    /// The provider answered but reported a request-level failure.
    #[error("provider status {status}: {message}")]
    Provider { status: String, message: String },

    /// The provider response does not match the shape of its request.
    #[error("malformed provider response: {0}")]
    MalformedResponse(String),

    /// An encoded polyline could not be decoded.
    #[error("invalid encoded polyline at byte {position}: {reason}")]
    PolylineDecode { position: usize, reason: &'static str },

    /// The caller's input violates a precondition.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A `BatchConfig` limit is unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A spawned request task panicked or was aborted.
    #[error("request task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// The caller's cancellation token fired, or a request task ended
    /// without reporting a result.
    #[error("request cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, Error>;
