//! Error types for the request pipeline.

use thiserror::Error;

/// Failure reported by a [`Transport`](crate::transport::Transport).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Attempt exceeded the per-attempt timeout.
    #[error("Request timed out after {timeout_ms}ms")]
    Timeout {
        /// Configured ceiling for one attempt.
        timeout_ms: u64,
    },

    /// Connection could not be established.
    #[error("Connection failed: {0}")]
    Connect(String),

    /// Response body could not be read to completion.
    #[error("Response body interrupted: {0}")]
    Body(String),

    /// Request could not be built or sent (not transient).
    #[error("Request failed: {0}")]
    Request(String),
}

impl TransportError {
    /// Returns `true` for failures worth another attempt.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Connect(_) | Self::Body(_))
    }
}

/// Errors surfaced by [`Pipeline::execute`](crate::pipeline::Pipeline::execute).
#[derive(Error, Debug, Clone)]
pub enum PipelineError {
    /// Query text was empty.
    #[error("Query text is empty")]
    EmptyQuery,

    /// Server answered with a non-success status.
    #[error("HTTP status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body (truncated if needed).
        body: String,
    },

    /// Network-level failure.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Retry budget spent; `last` is the final attempt's failure.
    #[error("Gave up after {attempts} attempts: {last}")]
    Exhausted {
        /// Attempts made, including the first.
        attempts: u32,
        /// Failure of the final attempt.
        last: Box<PipelineError>,
    },

    /// Backend revoked authorization for an established session.
    #[error("Session revoked by the server; login required")]
    SessionRevoked,

    /// Request body is not a valid JSON envelope.
    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    /// JSON encoding/decoding failed.
    #[error("JSON error: {0}")]
    Json(String),
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

impl PipelineError {
    /// HTTP status carried by this error, looking through `Exhausted`.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Exhausted { last, .. } => last.status(),
            _ => None,
        }
    }

    /// Response body carried by this error, looking through `Exhausted`.
    pub fn body(&self) -> Option<&str> {
        match self {
            Self::Status { body, .. } => Some(body.as_str()),
            Self::Exhausted { last, .. } => last.body(),
            _ => None,
        }
    }

    /// Short label used for log fields and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::EmptyQuery => "empty_query",
            Self::Status { .. } => "status",
            Self::Transport(_) => "transport",
            Self::Exhausted { .. } => "exhausted",
            Self::SessionRevoked => "session_revoked",
            Self::InvalidBody(_) => "invalid_body",
            Self::Json(_) => "json",
        }
    }
}
