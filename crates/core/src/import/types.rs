//! Bulk import types.

use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

/// Why one data row was not imported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowError {
    /// 1-based data-row number (the header row is not counted).
    pub row: usize,
    /// Offending column, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// Human-readable reason.
    pub reason: String,
}

impl RowError {
    /// Creates a row error.
    pub fn new(row: usize, field: Option<&str>, reason: impl Into<String>) -> Self {
        Self {
            row,
            field: field.map(str::to_string),
            reason: reason.into(),
        }
    }

    /// Wraps a ledger error raised while committing `row`.
    #[must_use]
    pub fn from_ledger(row: usize, err: &LedgerError) -> Self {
        Self::new(row, err.field(), err.to_string())
    }
}

/// A parsed data row: the entity input, or why the row could not be read.
pub type ImportRow<T> = Result<T, RowError>;

/// Outcome of a batch import.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportSummary<T> {
    /// One-line summary.
    pub message: String,
    /// Rows that created a new entity.
    pub created: usize,
    /// Rows that updated an existing draft.
    pub updated: usize,
    /// Rows that failed, in row order.
    pub errors: Vec<RowError>,
    /// Entities created or updated, in row order.
    pub imported: Vec<T>,
}

impl<T> Default for ImportSummary<T> {
    fn default() -> Self {
        Self {
            message: String::new(),
            created: 0,
            updated: 0,
            errors: Vec::new(),
            imported: Vec::new(),
        }
    }
}

impl<T> ImportSummary<T> {
    /// Fills in the summary message from the counters.
    #[must_use]
    pub fn finish(mut self, entity: &str) -> Self {
        self.message = format!(
            "Imported {entity}: {} created, {} updated, {} failed",
            self.created,
            self.updated,
            self.errors.len()
        );
        self
    }

    /// Total rows seen.
    #[must_use]
    pub fn rows(&self) -> usize {
        self.created + self.updated + self.errors.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_error_from_ledger_keeps_field() {
        let err = RowError::from_ledger(2, &LedgerError::validation("code", "already exists"));
        assert_eq!(err.row, 2);
        assert_eq!(err.field.as_deref(), Some("code"));
        assert!(err.reason.contains("already exists"));
    }

    #[test]
    fn test_summary_message() {
        let summary = ImportSummary::<u8> {
            created: 2,
            errors: vec![RowError::new(2, None, "bad")],
            ..ImportSummary::default()
        }
        .finish("accounts");
        assert_eq!(summary.message, "Imported accounts: 2 created, 0 updated, 1 failed");
        assert_eq!(summary.rows(), 3);
    }

    #[test]
    fn test_row_error_omits_missing_field() {
        let json = serde_json::to_value(RowError::new(1, None, "x")).unwrap();
        assert!(json.get("field").is_none());
    }
}
