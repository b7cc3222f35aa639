//! Error types for webhook parsing, forwarding and configuration.

use reqwest::StatusCode;
use thiserror::Error;

/// The webhook body could not be interpreted.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EventError {
    #[error("malformed event: {0}")]
    Malformed(String),
}

impl EventError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        EventError::Malformed(reason.into())
    }
}

/// A single Instapaper call failed.
#[derive(Debug, Error)]
pub enum ForwardError {
    /// Instapaper refused the configured credentials.
    #[error("instapaper rejected credentials (status {0})")]
    Auth(StatusCode),

    /// Instapaper refused the request itself, typically a bad URL.
    #[error("instapaper rejected request (status {status}): {body}")]
    Rejected { status: StatusCode, body: String },

    /// Instapaper answered with a server error or an unexpected status.
    #[error("instapaper service error (status {0})")]
    Service(StatusCode),

    /// Connection, TLS or timeout failure.
    #[error("instapaper request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Coarse classification used in responses and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The article itself was invalid; never sent downstream.
    Malformed,
    Auth,
    Rejected,
    Transient,
}

impl FailureKind {
    /// Whether the failure happened at Instapaper rather than in the payload.
    pub fn is_downstream(self) -> bool {
        !matches!(self, FailureKind::Malformed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FailureKind::Malformed => "malformed_event",
            FailureKind::Auth => "auth_error",
            FailureKind::Rejected => "rejected",
            FailureKind::Transient => "transient_error",
        }
    }
}

impl ForwardError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ForwardError::Auth(_) => FailureKind::Auth,
            ForwardError::Rejected { .. } => FailureKind::Rejected,
            ForwardError::Service(_) | ForwardError::Transport(_) => FailureKind::Transient,
        }
    }
}

/// Startup configuration problem.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),

    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}
