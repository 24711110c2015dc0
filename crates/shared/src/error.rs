//! Application-wide error types.
//!
//! [`ErrorKind`] is the stable, machine-readable classification every error
//! surfaces to API consumers. Network-layer kinds (`Timeout`, `Connectivity`)
//! are produced by clients only and never by the ledger itself.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using `AppError`.
pub type AppResult<T> = Result<T, AppError>;

/// Stable machine-readable error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed or constraint-violating input.
    Validation,
    /// Non-positive or over-settling payment amount.
    InvalidAmount,
    /// Template application rejected.
    Template,
    /// Concurrent-mutation or integrity conflict.
    Conflict,
    /// Journal entry debits and credits differ.
    UnbalancedEntry,
    /// Entity already left the draft state.
    AlreadyPosted,
    /// Journal entry already has a compensating entry.
    AlreadyReversed,
    /// Hierarchy change would form (or found) a cycle.
    Cycle,
    /// Operation not allowed in the entity's current state.
    NotPostableState,
    /// Referenced entity does not exist.
    NotFound,
    /// Unexpected server-side failure.
    Internal,
    /// Client gave up waiting for the server.
    Timeout,
    /// Client could not reach the server.
    Connectivity,
}

impl ErrorKind {
    /// Returns the string representation of the kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::InvalidAmount => "invalid_amount",
            Self::Template => "template",
            Self::Conflict => "conflict",
            Self::UnbalancedEntry => "unbalanced_entry",
            Self::AlreadyPosted => "already_posted",
            Self::AlreadyReversed => "already_reversed",
            Self::Cycle => "cycle",
            Self::NotPostableState => "not_postable_state",
            Self::NotFound => "not_found",
            Self::Internal => "internal",
            Self::Timeout => "timeout",
            Self::Connectivity => "connectivity",
        }
    }

    /// Returns true for failures of the transport rather than the domain.
    #[must_use]
    pub const fn is_network(&self) -> bool {
        matches!(self, Self::Timeout | Self::Connectivity)
    }

    /// Returns true if the same request may succeed when retried as-is
    /// (after re-reading state, for conflicts).
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict | Self::Timeout | Self::Connectivity)
    }

    /// Returns the HTTP status code for this kind.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Validation | Self::InvalidAmount | Self::Template => 400,
            Self::NotFound => 404,
            Self::Conflict => 409,
            Self::UnbalancedEntry
            | Self::AlreadyPosted
            | Self::AlreadyReversed
            | Self::Cycle
            | Self::NotPostableState => 422,
            Self::Internal => 500,
            Self::Timeout => 504,
            Self::Connectivity => 503,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error payload carried in `{ "success": false, "error": ... }` responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    /// Stable error classification.
    pub kind: ErrorKind,
    /// SCREAMING_SNAKE error code, finer grained than `kind`.
    pub code: String,
    /// Human-readable message.
    pub message: String,
    /// Whether the caller may retry.
    pub retryable: bool,
    /// Offending input field, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

/// Application error types.
#[derive(Debug, Error)]
pub enum AppError {
    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Validation error.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Business rule violation.
    #[error("Business rule violation: {0}")]
    BusinessRule(String),

    /// Conflict (e.g., stale version).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Request timed out before the server answered.
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Server could not be reached.
    #[error("Connection failed: {0}")]
    Connectivity(String),

    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns the error kind.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Validation(_) => ErrorKind::Validation,
            Self::BusinessRule(_) => ErrorKind::NotPostableState,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::Connectivity(_) => ErrorKind::Connectivity,
            Self::Config(_) | Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        self.kind().status_code()
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::BusinessRule(_) => "BUSINESS_RULE_VIOLATION",
            Self::Conflict(_) => "CONFLICT",
            Self::Timeout(_) => "TIMEOUT",
            Self::Connectivity(_) => "CONNECTIVITY",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Builds the API error payload.
    #[must_use]
    pub fn to_body(&self) -> ApiErrorBody {
        ApiErrorBody {
            kind: self.kind(),
            code: self.error_code().to_string(),
            message: self.to_string(),
            retryable: self.kind().is_retryable(),
            field: None,
        }
    }
}
