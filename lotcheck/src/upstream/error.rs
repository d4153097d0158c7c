//! Upstream error taxonomy.

use thiserror::Error;

/// Failure to complete one HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The request exceeded its timeout.
    #[error("request timed out")]
    Timeout,

    /// Connection, TLS, body read or any other transport failure.
    #[error("{0}")]
    Other(String),
}

/// Errors produced while talking to, or interpreting, the upstream service.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum UpstreamError {
    /// The HTTP exchange itself failed.
    #[error("transport failure: {0}")]
    Transport(#[from] TransportError),

    /// The upstream reported that its rate limit was exceeded.
    #[error("upstream throttled: {0}")]
    Throttled(String),

    /// The upstream answered with a description instead of a result.
    #[error("upstream rejected: {0}")]
    Rejected(String),

    /// Credentials were refused or missing.
    #[error("authentication failed: {0}")]
    AuthFailure(String),

    /// The response could not be understood.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Every escalation round was throttled.
    #[error("retry budget exhausted")]
    RetryBudgetExhausted,
}
