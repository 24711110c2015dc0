//! Journal entry domain types.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use tally_shared::types::{AccountId, JournalEntryId, TransactionId, checked_sum};

/// Journal entry status.
///
/// The valid transitions are:
/// - Draft → Posted (post)
/// - Posted → Reversed (a compensating entry was posted)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JournalStatus {
    /// Editable, no ledger impact.
    Draft,
    /// Committed to account balances (immutable).
    Posted,
    /// Posted and since neutralized by a compensating entry (immutable).
    Reversed,
}

impl JournalStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Posted => "POSTED",
            Self::Reversed => "REVERSED",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "DRAFT" => Some(Self::Draft),
            "POSTED" => Some(Self::Posted),
            "REVERSED" => Some(Self::Reversed),
            _ => None,
        }
    }

    /// Returns true if the entry's lines count toward account balances.
    #[must_use]
    pub const fn is_posted(&self) -> bool {
        matches!(self, Self::Posted | Self::Reversed)
    }
}

impl fmt::Display for JournalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One debit or credit line of a journal entry.
///
/// Exactly one of `debit`/`credit` is non-zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalLine {
    /// The account affected by this line.
    pub account_id: AccountId,
    /// Debit amount (zero for credit lines).
    #[serde(default)]
    pub debit: Decimal,
    /// Credit amount (zero for debit lines).
    #[serde(default)]
    pub credit: Decimal,
    /// Optional line memo.
    #[serde(default)]
    pub memo: Option<String>,
}

impl JournalLine {
    /// A debit line.
    #[must_use]
    pub fn debit(account_id: AccountId, amount: Decimal) -> Self {
        Self {
            account_id,
            debit: amount,
            credit: Decimal::ZERO,
            memo: None,
        }
    }

    /// A credit line.
    #[must_use]
    pub fn credit(account_id: AccountId, amount: Decimal) -> Self {
        Self {
            account_id,
            debit: Decimal::ZERO,
            credit: amount,
            memo: None,
        }
    }

    /// Attaches a memo.
    #[must_use]
    pub fn with_memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = Some(memo.into());
        self
    }

    /// Signed amount: positive for debit, negative for credit.
    #[must_use]
    pub fn signed_amount(&self) -> Decimal {
        self.debit - self.credit
    }
}

/// An atomic, balanced ledger posting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Unique identifier.
    pub id: JournalEntryId,
    /// Accounting date.
    pub date: NaiveDate,
    /// Optional external reference.
    pub reference: Option<String>,
    /// Optional description.
    pub description: Option<String>,
    /// Current status.
    pub status: JournalStatus,
    /// Ordered lines.
    pub lines: Vec<JournalLine>,
    /// The entry this one compensates.
    pub reversal_of: Option<JournalEntryId>,
    /// The entry that compensates this one.
    pub reversed_by: Option<JournalEntryId>,
    /// The business transaction that generated this entry.
    pub source_transaction: Option<TransactionId>,
    /// Position in the posting order (set when posted).
    pub posting_sequence: Option<u64>,
    /// When the entry was created.
    pub created_at: DateTime<Utc>,
    /// When the entry was posted.
    pub posted_at: Option<DateTime<Utc>>,
}

impl JournalEntry {
    /// Total debits across lines. Stored entries have their totals checked
    /// when drafted, so this saturates only for hand-built entries.
    #[must_use]
    pub fn total_debit(&self) -> Decimal {
        checked_sum(self.lines.iter().map(|l| l.debit)).unwrap_or(Decimal::MAX)
    }

    /// Total credits across lines; saturates like [`JournalEntry::total_debit`].
    #[must_use]
    pub fn total_credit(&self) -> Decimal {
        checked_sum(self.lines.iter().map(|l| l.credit)).unwrap_or(Decimal::MAX)
    }

    /// Returns true if any line touches the account.
    #[must_use]
    pub fn touches(&self, account_id: AccountId) -> bool {
        self.lines.iter().any(|l| l.account_id == account_id)
    }
}

/// Input for drafting (or redrafting) a journal entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftEntryInput {
    /// Accounting date.
    pub date: NaiveDate,
    /// Optional external reference.
    #[serde(default)]
    pub reference: Option<String>,
    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,
    /// Lines (at least one).
    pub lines: Vec<JournalLine>,
}

/// Filter options for listing journal entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryFilter {
    /// Filter by status.
    #[serde(default)]
    pub status: Option<JournalStatus>,
    /// Entries dated on or after.
    #[serde(default)]
    pub from: Option<NaiveDate>,
    /// Entries dated on or before.
    #[serde(default)]
    pub to: Option<NaiveDate>,
    /// Entries touching this account.
    #[serde(default)]
    pub account_id: Option<AccountId>,
}

/// Debit and credit sums of a set of lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryTotals {
    /// Total debit amount.
    pub debit: Decimal,
    /// Total credit amount.
    pub credit: Decimal,
    /// Whether debits equal credits.
    pub is_balanced: bool,
}

impl EntryTotals {
    /// Creates totals from debit and credit sums.
    #[must_use]
    pub fn new(debit: Decimal, credit: Decimal) -> Self {
        Self {
            debit,
            credit,
            is_balanced: debit == credit,
        }
    }

    /// Returns the difference between debits and credits.
    #[must_use]
    pub fn difference(&self) -> Decimal {
        self.debit - self.credit
    }
}

/// One posted line of an account's ledger with its running balance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountLedgerLine {
    /// Entry the line belongs to.
    pub entry_id: JournalEntryId,
    /// Entry date.
    pub date: NaiveDate,
    /// Entry reference.
    pub reference: Option<String>,
    /// Debit amount.
    pub debit: Decimal,
    /// Credit amount.
    pub credit: Decimal,
    /// Line memo.
    pub memo: Option<String>,
    /// Running balance before and after this line.
    #[serde(flatten)]
    pub running: super::balance::RunningBalance,
}

/// A discrepancy found by an integrity check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum IntegrityIssue {
    /// Stored balance differs from opening balance plus posted movements.
    BalanceDrift {
        /// Account code.
        code: String,
        /// Recomputed balance.
        expected: Decimal,
        /// Stored balance.
        actual: Decimal,
    },
    /// A posted entry does not balance.
    UnbalancedEntry {
        /// Entry id.
        entry_id: JournalEntryId,
        /// Total debits.
        debit: Decimal,
        /// Total credits.
        credit: Decimal,
    },
}

/// Result of [`crate::Ledger::verify_integrity`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IntegrityReport {
    /// Number of accounts checked.
    pub accounts_checked: usize,
    /// Number of posted entries checked.
    pub entries_checked: usize,
    /// Every discrepancy found.
    pub issues: Vec<IntegrityIssue>,
}

impl IntegrityReport {
    /// Returns true if nothing was found.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_status_posted() {
        assert!(!JournalStatus::Draft.is_posted());
        assert!(JournalStatus::Posted.is_posted());
        assert!(JournalStatus::Reversed.is_posted());
    }

    #[test]
    fn test_status_parse() {
        assert_eq!(JournalStatus::parse("posted"), Some(JournalStatus::Posted));
        assert_eq!(JournalStatus::parse("void"), None);
    }

    #[test]
    fn test_line_signed_amount() {
        let id = AccountId::new();
        assert_eq!(JournalLine::debit(id, dec!(10)).signed_amount(), dec!(10));
        assert_eq!(JournalLine::credit(id, dec!(10)).signed_amount(), dec!(-10));
    }

    #[test]
    fn test_entry_totals() {
        let totals = EntryTotals::new(dec!(100.00), dec!(50.00));
        assert!(!totals.is_balanced);
        assert_eq!(totals.difference(), dec!(50.00));
        assert!(EntryTotals::new(dec!(5), dec!(5.00)).is_balanced);
    }
}
