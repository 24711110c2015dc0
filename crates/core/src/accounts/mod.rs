//! Chart of accounts.
//!
//! # Modules
//!
//! - `types` - Accounts, inputs, filters, tree nodes and statistics
//! - `tree` - Bounded read projections over parent pointers
//! - `templates` - Built-in industry charts
//! - `registry` - Create, update, move, delete and query operations

pub mod registry;
pub mod templates;
pub mod tree;
pub mod types;

#[cfg(test)]
mod tree_props;

pub use templates::{AccountTemplate, TemplateSummary};
pub use types::{
    Account, AccountFilter, AccountNode, AccountStatistics, AccountType, CreateAccountInput,
    NormalBalance, UpdateAccountInput,
};
