//! Chart of accounts domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tally_shared::types::AccountId;

/// Account classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AccountType {
    /// Resources owned.
    Asset,
    /// Obligations owed.
    Liability,
    /// Owner's residual interest.
    Equity,
    /// Revenue earned.
    Income,
    /// Costs incurred.
    Expense,
}

impl AccountType {
    /// All account types in chart order.
    pub const ALL: [Self; 5] = [
        Self::Asset,
        Self::Liability,
        Self::Equity,
        Self::Income,
        Self::Expense,
    ];

    /// Returns the string representation of the type.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Asset => "ASSET",
            Self::Liability => "LIABILITY",
            Self::Equity => "EQUITY",
            Self::Income => "INCOME",
            Self::Expense => "EXPENSE",
        }
    }

    /// Parses a type from a string, case-insensitively. `REVENUE` is accepted for `INCOME`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "ASSET" => Some(Self::Asset),
            "LIABILITY" => Some(Self::Liability),
            "EQUITY" => Some(Self::Equity),
            "INCOME" | "REVENUE" => Some(Self::Income),
            "EXPENSE" => Some(Self::Expense),
            _ => None,
        }
    }

    /// The normal balance side determined by this type.
    ///
    /// Asset/Expense are debit-normal; Liability/Equity/Income are credit-normal.
    #[must_use]
    pub const fn normal_balance(&self) -> NormalBalance {
        match self {
            Self::Asset | Self::Expense => NormalBalance::Debit,
            Self::Liability | Self::Equity | Self::Income => NormalBalance::Credit,
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The side on which an account's balance naturally increases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NormalBalance {
    /// Debits increase the balance.
    Debit,
    /// Credits increase the balance.
    Credit,
}

impl NormalBalance {
    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Debit => "DEBIT",
            Self::Credit => "CREDIT",
        }
    }

    /// Parses a side from a string, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "DEBIT" | "DR" => Some(Self::Debit),
            "CREDIT" | "CR" => Some(Self::Credit),
            _ => None,
        }
    }
}

impl fmt::Display for NormalBalance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A node in the chart of accounts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Unique identifier.
    pub id: AccountId,
    /// Human-assigned code, unique within the ledger.
    pub code: String,
    /// Display name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Account classification.
    #[serde(rename = "type")]
    pub account_type: AccountType,
    /// Side on which the balance increases.
    pub normal_balance: NormalBalance,
    /// Parent account, if any.
    pub parent_id: Option<AccountId>,
    /// Depth in the tree (roots are 0).
    pub level: u32,
    /// Balance at creation.
    pub opening_balance: Decimal,
    /// Balance after all posted journal lines.
    pub current_balance: Decimal,
    /// Protected from deletion and rename.
    pub is_system: bool,
    /// Bumped on every mutation.
    pub version: i64,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
    /// When the account was last changed.
    pub updated_at: DateTime<Utc>,
}

/// Input for creating an account.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateAccountInput {
    /// Account code (must be unique).
    pub code: String,
    /// Account name.
    pub name: String,
    /// Account description.
    #[serde(default)]
    pub description: Option<String>,
    /// Account type.
    #[serde(rename = "type")]
    pub account_type: Option<AccountType>,
    /// Normal balance; derived from the type when omitted.
    #[serde(default)]
    pub normal_balance: Option<NormalBalance>,
    /// Code of the parent account.
    #[serde(default)]
    pub parent_code: Option<String>,
    /// Opening balance (defaults to zero).
    #[serde(default)]
    pub opening_balance: Option<Decimal>,
    /// Whether the account is system-protected.
    #[serde(default)]
    pub is_system: bool,
}

impl CreateAccountInput {
    /// Minimal input: code, name and type.
    pub fn new(code: impl Into<String>, name: impl Into<String>, account_type: AccountType) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            account_type: Some(account_type),
            ..Self::default()
        }
    }

    /// Sets the parent code.
    #[must_use]
    pub fn with_parent(mut self, parent_code: impl Into<String>) -> Self {
        self.parent_code = Some(parent_code.into());
        self
    }

    /// Sets the opening balance.
    #[must_use]
    pub fn with_opening_balance(mut self, amount: Decimal) -> Self {
        self.opening_balance = Some(amount);
        self
    }

    /// Marks the account as system-protected.
    #[must_use]
    pub fn system(mut self) -> Self {
        self.is_system = true;
        self
    }
}

/// Input for updating an account. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateAccountInput {
    /// New code.
    #[serde(default)]
    pub code: Option<String>,
    /// New name.
    #[serde(default)]
    pub name: Option<String>,
    /// New description (`Some(None)` clears it).
    #[serde(default, deserialize_with = "present")]
    pub description: Option<Option<String>>,
    /// New type.
    #[serde(default, rename = "type")]
    pub account_type: Option<AccountType>,
    /// New normal balance.
    #[serde(default)]
    pub normal_balance: Option<NormalBalance>,
    /// Version the caller read; the update fails if it changed since.
    #[serde(default)]
    pub expected_version: Option<i64>,
}

/// Distinguishes an explicit `null` (`Some(None)`) from an absent field (`None`).
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Filter options for listing accounts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountFilter {
    /// Case-insensitive substring match against name or code.
    #[serde(default)]
    pub search: Option<String>,
    /// Filter by account type.
    #[serde(default, rename = "type")]
    pub account_type: Option<AccountType>,
    /// Filter by parent code (`Some("")` = roots only).
    #[serde(default)]
    pub parent_code: Option<String>,
}

/// A nested view of an account and its subtree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountNode {
    /// The account.
    #[serde(flatten)]
    pub account: Account,
    /// Direct children, ordered by code.
    pub children: Vec<AccountNode>,
}

/// Chart of accounts statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AccountStatistics {
    /// Total number of accounts.
    pub total: usize,
    /// Number of accounts per type.
    pub by_type: BTreeMap<AccountType, usize>,
    /// Number of root accounts.
    pub roots: usize,
    /// Number of leaf accounts.
    pub leaves: usize,
    /// Deepest level in the tree.
    pub max_depth: u32,
    /// Number of system accounts.
    pub system: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normal_balance_is_type_determined() {
        assert_eq!(AccountType::Asset.normal_balance(), NormalBalance::Debit);
        assert_eq!(AccountType::Expense.normal_balance(), NormalBalance::Debit);
        assert_eq!(AccountType::Liability.normal_balance(), NormalBalance::Credit);
        assert_eq!(AccountType::Equity.normal_balance(), NormalBalance::Credit);
        assert_eq!(AccountType::Income.normal_balance(), NormalBalance::Credit);
    }

    #[test]
    fn test_account_type_parse() {
        assert_eq!(AccountType::parse("asset"), Some(AccountType::Asset));
        assert_eq!(AccountType::parse(" EXPENSE "), Some(AccountType::Expense));
        assert_eq!(AccountType::parse("Revenue"), Some(AccountType::Income));
        assert_eq!(AccountType::parse("cash"), None);
    }

    #[test]
    fn test_normal_balance_parse() {
        assert_eq!(NormalBalance::parse("debit"), Some(NormalBalance::Debit));
        assert_eq!(NormalBalance::parse("CR"), Some(NormalBalance::Credit));
        assert_eq!(NormalBalance::parse("both"), None);
    }

    #[test]
    fn test_update_description_null_clears() {
        let clear: UpdateAccountInput = serde_json::from_str(r#"{"description": null}"#).unwrap();
        assert_eq!(clear.description, Some(None));
        let untouched: UpdateAccountInput = serde_json::from_str(r#"{"name": "Cash"}"#).unwrap();
        assert_eq!(untouched.description, None);
    }

    #[test]
    fn test_serializes_uppercase() {
        assert_eq!(
            serde_json::to_string(&AccountType::Liability).unwrap(),
            "\"LIABILITY\""
        );
        assert_eq!(
            serde_json::to_string(&NormalBalance::Credit).unwrap(),
            "\"CREDIT\""
        );
    }
}
