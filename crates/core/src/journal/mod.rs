//! Double-entry journal.
//!
//! - `types` - Journal entries, lines, filters and integrity reports
//! - `balance` - Signed balance changes and running balances
//! - `validation` - Structural and balancing rules for line sets
//! - `reversal` - Compensating lines for posted entries
//! - `engine` - Draft, post, reverse and query operations on the ledger

pub mod balance;
pub mod engine;
pub mod reversal;
pub mod types;
pub mod validation;

#[cfg(test)]
mod engine_props;

pub use balance::{RunningBalance, balance_change};
pub use reversal::reversing_lines;
pub use types::{
    AccountLedgerLine, DraftEntryInput, EntryFilter, EntryTotals, IntegrityIssue,
    IntegrityReport, JournalEntry, JournalLine, JournalStatus,
};
pub use validation::{ensure_balanced, totals, validate_lines};
