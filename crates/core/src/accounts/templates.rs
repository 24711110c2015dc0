//! Built-in chart of accounts templates.

use serde::Serialize;

use super::types::{AccountType, CreateAccountInput};

type Row = (&'static str, &'static str, AccountType, Option<&'static str>);

const COMMON: &[Row] = &[
    ("1000", "Assets", AccountType::Asset, None),
    ("1100", "Cash", AccountType::Asset, Some("1000")),
    ("1200", "Bank", AccountType::Asset, Some("1000")),
    ("1300", "Accounts Receivable", AccountType::Asset, Some("1000")),
    ("2000", "Liabilities", AccountType::Liability, None),
    ("2100", "Accounts Payable", AccountType::Liability, Some("2000")),
    ("2200", "Tax Payable", AccountType::Liability, Some("2000")),
    ("3000", "Equity", AccountType::Equity, None),
    ("3100", "Owner's Capital", AccountType::Equity, Some("3000")),
    ("3200", "Retained Earnings", AccountType::Equity, Some("3000")),
    ("4000", "Income", AccountType::Income, None),
    ("5000", "Expenses", AccountType::Expense, None),
    ("5200", "Rent", AccountType::Expense, Some("5000")),
    ("5300", "Salaries", AccountType::Expense, Some("5000")),
    ("5400", "Utilities", AccountType::Expense, Some("5000")),
];

const GENERAL: &[Row] = &[
    ("4100", "Sales", AccountType::Income, Some("4000")),
    ("4900", "Other Income", AccountType::Income, Some("4000")),
    ("5500", "Office Supplies", AccountType::Expense, Some("5000")),
];

const RETAIL: &[Row] = &[
    ("1400", "Inventory", AccountType::Asset, Some("1000")),
    ("4100", "Product Sales", AccountType::Income, Some("4000")),
    ("4150", "Sales Returns", AccountType::Income, Some("4100")),
    ("5100", "Cost of Goods Sold", AccountType::Expense, Some("5000")),
    ("5600", "Shipping & Freight", AccountType::Expense, Some("5000")),
];

const SERVICES: &[Row] = &[
    ("1400", "Unbilled Revenue", AccountType::Asset, Some("1000")),
    ("2300", "Customer Deposits", AccountType::Liability, Some("2000")),
    ("4100", "Consulting Income", AccountType::Income, Some("4000")),
    ("4200", "Retainer Income", AccountType::Income, Some("4000")),
    ("5100", "Subcontractors", AccountType::Expense, Some("5000")),
    ("5600", "Software Subscriptions", AccountType::Expense, Some("5000")),
];

/// A named industry chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountTemplate {
    /// Template name used for lookup.
    pub name: &'static str,
    /// What the template is for.
    pub description: &'static str,
    /// Accounts, parents before children.
    pub accounts: Vec<CreateAccountInput>,
}

/// Listing entry for a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateSummary {
    /// Template name.
    pub name: &'static str,
    /// What the template is for.
    pub description: &'static str,
    /// Number of accounts it creates.
    pub account_count: usize,
}

const TEMPLATES: &[(&str, &str, &[Row])] = &[
    ("general", "General small business", GENERAL),
    ("retail", "Retail and inventory-based trade", RETAIL),
    ("services", "Professional and consulting services", SERVICES),
];

fn build(rows: &[Row]) -> Vec<CreateAccountInput> {
    let mut accounts: Vec<CreateAccountInput> = COMMON
        .iter()
        .chain(rows)
        .map(|(code, name, account_type, parent)| {
            let input = CreateAccountInput::new(*code, *name, *account_type);
            match parent {
                Some(parent) => input.with_parent(*parent),
                // Top-level headers are protected.
                None => input.system(),
            }
        })
        .collect();
    accounts.sort_by(|a, b| a.code.cmp(&b.code));
    accounts
}

/// Looks up a built-in template by name (case-insensitive).
#[must_use]
pub fn template(name: &str) -> Option<AccountTemplate> {
    TEMPLATES
        .iter()
        .find(|(template_name, _, _)| template_name.eq_ignore_ascii_case(name.trim()))
        .map(|(name, description, rows)| AccountTemplate {
            name: *name,
            description: *description,
            accounts: build(rows),
        })
}

/// Summaries of every built-in template.
#[must_use]
pub fn summaries() -> Vec<TemplateSummary> {
    TEMPLATES
        .iter()
        .map(|(name, description, rows)| TemplateSummary {
            name: *name,
            description: *description,
            account_count: COMMON.len() + rows.len(),
        })
        .collect()
}
