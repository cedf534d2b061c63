//! Error types for apiprobe

use thiserror::Error;

use crate::schema::ValidationError;

/// Result type alias using apiprobe Error
pub type Result<T> = std::result::Result<T, Error>;

/// Maximum number of body characters kept on a failure.
pub const BODY_SNIPPET_LEN: usize = 256;

/// Classified failures surfaced by the domain client and validators
#[derive(Error, Debug)]
pub enum Error {
    #[error("Contract violation in {operation}: got HTTP {status}, expected one of {expected:?}; body: {body}")]
    ContractViolation {
        operation: String,
        status: u16,
        expected: Vec<u16>,
        body: String,
    },

    #[error("Unauthorized: {operation} returned HTTP {status}; body: {body}")]
    Unauthorized {
        operation: String,
        status: u16,
        body: String,
    },

    #[error("Resource not found: {kind} with id {id} (HTTP {status})")]
    NotFound { kind: String, id: String, status: u16 },

    #[error("Resource already exists: {kind} with id {id} (HTTP {status})")]
    Conflict { kind: String, id: String, status: u16 },

    #[error("Request rejected by {operation}: HTTP {status}; body: {body}")]
    Rejected {
        operation: String,
        status: u16,
        body: String,
    },

    #[error("Operation timeout: {operation} exceeded {millis}ms")]
    Timeout { operation: String, millis: u64 },

    #[error("Schema validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Transport error in {operation}: {reason}")]
    Transport { operation: String, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// HTTP status carried by the failure, if the remote answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::ContractViolation { status, .. }
            | Error::Unauthorized { status, .. }
            | Error::NotFound { status, .. }
            | Error::Conflict { status, .. }
            | Error::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Failures worth retrying when a scenario explicitly asks for it.
    ///
    /// Timeouts, connection failures and 5xx answers are transient; everything
    /// else is a deterministic answer from the remote system.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Timeout { .. } | Error::Transport { .. } => true,
            Error::ContractViolation { status, .. } => *status >= 500,
            _ => false,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout { .. })
    }
}

/// Truncate a response body for inclusion in an error message
pub fn body_snippet(body: &str) -> String {
    let mut chars = body.chars();
    let snippet: String = chars.by_ref().take(BODY_SNIPPET_LEN).collect();
    if chars.next().is_some() {
        format!("{}...", snippet)
    } else {
        snippet
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_snippet_truncates_long_bodies() {
        let body = "x".repeat(BODY_SNIPPET_LEN + 10);
        let snippet = body_snippet(&body);
        assert_eq!(snippet.len(), BODY_SNIPPET_LEN + 3);
        assert!(snippet.ends_with("..."));
        assert_eq!(body_snippet("short"), "short");
    }

    #[test]
    fn test_transient_classification() {
        let timeout = Error::Timeout {
            operation: "list_catalog".to_string(),
            millis: 10,
        };
        assert!(timeout.is_transient());
        assert!(timeout.is_timeout());

        let unavailable = Error::ContractViolation {
            operation: "list_catalog".to_string(),
            status: 503,
            expected: vec![200],
            body: String::new(),
        };
        assert!(unavailable.is_transient());
        assert_eq!(unavailable.status(), Some(503));

        let unauthorized = Error::Unauthorized {
            operation: "fetch_account".to_string(),
            status: 401,
            body: String::new(),
        };
        assert!(!unauthorized.is_transient());
    }
}
