//! General ledger core for Tally.
//!
//! This crate contains the ledger's business logic with ZERO web dependencies.
//! Every operation runs against a [`Ledger`], a single transactional store
//! shared by all callers.
//!
//! # Modules
//!
//! - `accounts` - Chart of accounts registry, hierarchy queries, templates
//! - `journal` - Double-entry journal posting and reversal
//! - `transactions` - Expense/bill/invoice lifecycle and payment settlement
//! - `import` - CSV/JSON bulk import and export with per-row error reporting

pub mod accounts;
pub mod error;
pub mod import;
pub mod journal;
pub mod store;
pub mod transactions;

pub use error::{LedgerError, LedgerResult};
pub use store::Ledger;
