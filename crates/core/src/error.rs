//! Ledger error types.
//!
//! Every failure of a ledger operation is a [`LedgerError`]. Each variant
//! carries enough context (entity, id or code, field, current state) for the
//! caller to decide whether to retry, fix input, or surface it to a human.

use rust_decimal::Decimal;
use tally_shared::types::JournalEntryId;
use tally_shared::{ApiErrorBody, AppError, ErrorKind};
use thiserror::Error;

/// Result type alias using `LedgerError`.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Errors that can occur during ledger operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerError {
    // ========== Input Errors ==========
    /// Malformed or constraint-violating input.
    #[error("Invalid {field}: {message}")]
    Validation {
        /// The offending input field.
        field: String,
        /// What is wrong with it.
        message: String,
    },

    /// Payment amount is non-positive or would over-settle the transaction.
    #[error("Invalid amount {amount}: {reason}")]
    InvalidAmount {
        /// The rejected amount.
        amount: Decimal,
        /// Why it was rejected.
        reason: String,
    },

    /// Template application rejected; nothing was created.
    #[error("Template rejected at account {code}: {reason}")]
    Template {
        /// First offending account code.
        code: String,
        /// Why it was rejected.
        reason: String,
    },

    // ========== Integrity Errors ==========
    /// Integrity conflict (references, children, balance, system flag).
    #[error("Conflict: {message}")]
    Conflict {
        /// Description of the conflict.
        message: String,
    },

    /// Account was modified since the caller read it.
    #[error("Account {code} version mismatch: expected {expected}, got {actual}")]
    VersionMismatch {
        /// The account code.
        code: String,
        /// The version the caller read.
        expected: i64,
        /// The version currently stored.
        actual: i64,
    },

    // ========== Domain State Errors ==========
    /// Journal entry debits and credits differ.
    #[error("Journal entry is not balanced. Debit: {debit}, Credit: {credit}")]
    UnbalancedEntry {
        /// Total debits.
        debit: Decimal,
        /// Total credits.
        credit: Decimal,
    },

    /// Entity is no longer a draft.
    #[error("{entity} {id} is already {status}")]
    AlreadyPosted {
        /// Entity name.
        entity: &'static str,
        /// Entity id.
        id: String,
        /// Current status.
        status: String,
    },

    /// Journal entry already has a compensating entry.
    #[error("Journal entry {entry_id} was already reversed by {reversed_by}")]
    AlreadyReversed {
        /// The original entry.
        entry_id: JournalEntryId,
        /// The compensating entry.
        reversed_by: JournalEntryId,
    },

    /// Hierarchy change would form a cycle, or a stored cycle was found.
    #[error("Cycle at account {code}: {detail}")]
    Cycle {
        /// The account where the cycle was detected.
        code: String,
        /// Description.
        detail: String,
    },

    /// Operation not allowed in the entity's current state.
    #[error("{entity} {id} cannot do this while {status}")]
    NotPostableState {
        /// Entity name.
        entity: &'static str,
        /// Entity id.
        id: String,
        /// Current status.
        status: String,
    },

    // ========== Lookup Errors ==========
    /// Referenced entity does not exist.
    #[error("{entity} not found: {key}")]
    NotFound {
        /// Entity name.
        entity: &'static str,
        /// The id or code that was looked up.
        key: String,
    },

    // ========== Internal Errors ==========
    /// Internal error (e.g. a poisoned lock).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl LedgerError {
    /// Shorthand for a [`LedgerError::Validation`].
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Shorthand for a [`LedgerError::Conflict`].
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Shorthand for a [`LedgerError::NotFound`].
    pub fn not_found(entity: &'static str, key: impl ToString) -> Self {
        Self::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    /// Returns the stable error kind.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::InvalidAmount { .. } => ErrorKind::InvalidAmount,
            Self::Template { .. } => ErrorKind::Template,
            Self::Conflict { .. } | Self::VersionMismatch { .. } => ErrorKind::Conflict,
            Self::UnbalancedEntry { .. } => ErrorKind::UnbalancedEntry,
            Self::AlreadyPosted { .. } => ErrorKind::AlreadyPosted,
            Self::AlreadyReversed { .. } => ErrorKind::AlreadyReversed,
            Self::Cycle { .. } => ErrorKind::Cycle,
            Self::NotPostableState { .. } => ErrorKind::NotPostableState,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::InvalidAmount { .. } => "INVALID_AMOUNT",
            Self::Template { .. } => "TEMPLATE_ERROR",
            Self::Conflict { .. } => "CONFLICT",
            Self::VersionMismatch { .. } => "VERSION_MISMATCH",
            Self::UnbalancedEntry { .. } => "UNBALANCED_ENTRY",
            Self::AlreadyPosted { .. } => "ALREADY_POSTED",
            Self::AlreadyReversed { .. } => "ALREADY_REVERSED",
            Self::Cycle { .. } => "CYCLE_DETECTED",
            Self::NotPostableState { .. } => "NOT_POSTABLE_STATE",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        self.kind().status_code()
    }

    /// Returns true if this error is retryable after re-reading state.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict { .. } | Self::VersionMismatch { .. })
    }

    /// Returns the offending input field, when the error names one.
    #[must_use]
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Validation { field, .. } => Some(field),
            Self::InvalidAmount { .. } => Some("amount"),
            Self::Template { .. } => Some("code"),
            _ => None,
        }
    }

    /// Builds the API error payload.
    #[must_use]
    pub fn to_body(&self) -> ApiErrorBody {
        ApiErrorBody {
            kind: self.kind(),
            code: self.error_code().to_string(),
            message: self.to_string(),
            retryable: self.is_retryable(),
            field: self.field().map(str::to_string),
        }
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        match err.kind() {
            ErrorKind::NotFound => Self::NotFound(err.to_string()),
            ErrorKind::Validation | ErrorKind::InvalidAmount | ErrorKind::Template => {
                Self::Validation(err.to_string())
            }
            ErrorKind::Conflict => Self::Conflict(err.to_string()),
            ErrorKind::Internal | ErrorKind::Timeout | ErrorKind::Connectivity => {
                Self::Internal(err.to_string())
            }
            ErrorKind::UnbalancedEntry
            | ErrorKind::AlreadyPosted
            | ErrorKind::AlreadyReversed
            | ErrorKind::Cycle
            | ErrorKind::NotPostableState => Self::BusinessRule(err.to_string()),
        }
    }
}
