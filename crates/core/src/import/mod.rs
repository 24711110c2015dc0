//! Bulk import and export.
//!
//! - `types` - Row errors and import summaries
//! - `records` - CSV records, parsing, export writers and templates
//! - `service` - Per-row commit of parsed batches on the ledger

pub mod records;
pub mod service;
pub mod types;

pub use records::{
    AccountRecord, TransactionRecord, account_csv_template, parse_account_csv,
    parse_transaction_csv, transaction_csv_template,
};
pub use types::{ImportRow, ImportSummary, RowError};
