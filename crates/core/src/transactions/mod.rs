//! Business transactions: expenses, bills and invoices.
//!
//! - `types` - Transactions, payments, inputs, filters and sorting
//! - `validation` - Input checks and the total policy
//! - `workflow` - Lifecycle state machine
//! - `posting` - Journal lines generated on posting and settlement
//! - `service` - Create, post, pay, cancel and query operations on the ledger

pub mod posting;
pub mod service;
pub mod types;
pub mod validation;
pub mod workflow;

#[cfg(test)]
mod workflow_props;

pub use posting::{posting_lines, settlement_lines};
pub use types::{
    LineItem, Payment, PaymentMode, PaymentOutcome, RecordPaymentInput, SortField, SortOrder,
    TaxBreakdown, Transaction, TransactionFilter, TransactionInput, TransactionKind,
    TransactionSort, TransactionStatus,
};
pub use validation::resolve_total;
pub use workflow::{CancelEffect, TransactionWorkflow};
