//! Business transaction domain types.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use tally_shared::types::{ContactId, JournalEntryId, PaymentId, TransactionId, checked_sum};

/// Kind of business document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionKind {
    /// Money spent, settled now or later.
    #[default]
    Expense,
    /// Supplier bill (payable).
    Bill,
    /// Customer invoice (receivable).
    Invoice,
}

impl TransactionKind {
    /// Returns the string representation of the kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Expense => "EXPENSE",
            Self::Bill => "BILL",
            Self::Invoice => "INVOICE",
        }
    }

    /// Parses a kind from a string, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "EXPENSE" => Some(Self::Expense),
            "BILL" => Some(Self::Bill),
            "INVOICE" => Some(Self::Invoice),
            _ => None,
        }
    }

    /// Invoices are receivables; expenses and bills are payables.
    #[must_use]
    pub const fn is_receivable(&self) -> bool {
        matches!(self, Self::Invoice)
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transaction lifecycle status.
///
/// The valid transitions are:
/// - Draft → Posted (post)
/// - Draft → Cancelled (cancel)
/// - Posted → Partial | Paid (payment)
/// - Posted → Cancelled (cancel, no payments, when permitted)
/// - Partial → Partial | Paid (payment)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionStatus {
    /// Editable, no ledger impact.
    Draft,
    /// Journal entry generated and posted; nothing paid yet.
    Posted,
    /// Some but not all of the total has been paid.
    Partial,
    /// Fully settled (terminal).
    Paid,
    /// Withdrawn (terminal).
    Cancelled,
}

impl TransactionStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Posted => "POSTED",
            Self::Partial => "PARTIAL",
            Self::Paid => "PAID",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "DRAFT" => Some(Self::Draft),
            "POSTED" => Some(Self::Posted),
            "PARTIAL" => Some(Self::Partial),
            "PAID" => Some(Self::Paid),
            "CANCELLED" | "CANCELED" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Returns true if the transaction can be modified.
    #[must_use]
    pub const fn is_editable(&self) -> bool {
        matches!(self, Self::Draft)
    }

    /// Returns true if no further transition is possible.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Paid | Self::Cancelled)
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a payment was made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentMode {
    /// Cash.
    #[default]
    Cash,
    /// Bank transfer, card or other online channel.
    Online,
    /// On credit.
    Credit,
}

impl PaymentMode {
    /// Returns the string representation of the mode.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Cash => "CASH",
            Self::Online => "ONLINE",
            Self::Credit => "CREDIT",
        }
    }

    /// Parses a mode from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "CASH" => Some(Self::Cash),
            "ONLINE" => Some(Self::Online),
            "CREDIT" => Some(Self::Credit),
            _ => None,
        }
    }
}

/// One line of a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// What the line is for.
    pub description: String,
    /// Line amount.
    pub amount: Decimal,
    /// Account code the line posts to; the category account when omitted.
    #[serde(default)]
    pub account: Option<String>,
}

/// Tax portion of a transaction's total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxBreakdown {
    /// Tax label (e.g. "VAT 11%").
    pub label: String,
    /// Tax amount, included in the total.
    pub amount: Decimal,
    /// Account code the tax posts to; the category account when omitted.
    #[serde(default)]
    pub account: Option<String>,
}

/// An append-only settlement record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    /// Unique identifier.
    pub id: PaymentId,
    /// Amount applied.
    pub amount: Decimal,
    /// Payment date.
    pub date: NaiveDate,
    /// Payment channel.
    pub mode: PaymentMode,
    /// External reference.
    pub reference: Option<String>,
    /// Free-form notes.
    pub notes: Option<String>,
    /// Settlement account code, when a settlement entry was posted.
    pub account: Option<String>,
    /// Settlement journal entry.
    pub journal_entry_id: Option<JournalEntryId>,
    /// Client-supplied deduplication key.
    pub idempotency_key: Option<String>,
    /// When the payment was recorded.
    pub created_at: DateTime<Utc>,
}

/// A business document that produces ledger impact when posted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique identifier.
    pub id: TransactionId,
    /// Document kind.
    pub kind: TransactionKind,
    /// Document reference, unique within the ledger.
    pub reference: String,
    /// Document date.
    pub date: NaiveDate,
    /// Payment due date.
    pub due_date: Option<NaiveDate>,
    /// Counter-party.
    pub contact_id: Option<ContactId>,
    /// Free-form description.
    pub description: Option<String>,
    /// Default ledger-side account code.
    pub category_account: String,
    /// Cash/payable (or receivable for invoices) account code.
    pub counter_account: String,
    /// Total amount, tax included.
    pub total_amount: Decimal,
    /// Tax portion of the total.
    pub tax: Option<TaxBreakdown>,
    /// Line items; their amounts plus tax make up the total when present.
    pub line_items: Vec<LineItem>,
    /// Lifecycle status.
    pub status: TransactionStatus,
    /// Journal entry generated on posting.
    pub journal_entry_id: Option<JournalEntryId>,
    /// Payments in application order.
    pub payments: Vec<Payment>,
    /// When the transaction was created.
    pub created_at: DateTime<Utc>,
    /// When the transaction was last changed.
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    /// Sum of applied payments. Payments never exceed the total, so the sum
    /// saturates only for hand-built values.
    #[must_use]
    pub fn paid_amount(&self) -> Decimal {
        checked_sum(self.payments.iter().map(|p| p.amount)).unwrap_or(Decimal::MAX)
    }

    /// Total still to be paid.
    #[must_use]
    pub fn outstanding(&self) -> Decimal {
        self.total_amount.saturating_sub(self.paid_amount())
    }
}

/// Input for creating or replacing a draft transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionInput {
    /// Document kind.
    #[serde(default)]
    pub kind: TransactionKind,
    /// Document reference.
    pub reference: String,
    /// Document date.
    pub date: NaiveDate,
    /// Payment due date.
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    /// Counter-party.
    #[serde(default)]
    pub contact_id: Option<ContactId>,
    /// Free-form description.
    #[serde(default)]
    pub description: Option<String>,
    /// Default ledger-side account code.
    pub category_account: String,
    /// Cash/payable/receivable account code.
    pub counter_account: String,
    /// Explicit total; derived from line items when omitted.
    #[serde(default)]
    pub total_amount: Option<Decimal>,
    /// Tax portion of the total.
    #[serde(default)]
    pub tax: Option<TaxBreakdown>,
    /// Line items.
    #[serde(default)]
    pub line_items: Vec<LineItem>,
}

/// Input for recording a payment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordPaymentInput {
    /// Amount to apply.
    pub amount: Decimal,
    /// Payment date.
    pub date: NaiveDate,
    /// Payment channel.
    #[serde(default)]
    pub mode: PaymentMode,
    /// External reference.
    #[serde(default)]
    pub reference: Option<String>,
    /// Free-form notes.
    #[serde(default)]
    pub notes: Option<String>,
    /// Settlement account code; when given a settlement entry is posted.
    #[serde(default)]
    pub account: Option<String>,
    /// Client-supplied deduplication key.
    #[serde(default)]
    pub idempotency_key: Option<String>,
}

/// Result of recording a payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentOutcome {
    /// The transaction after the payment.
    pub transaction: Transaction,
    /// The payment record.
    pub payment: Payment,
    /// True when the idempotency key matched an earlier payment and nothing
    /// new was applied.
    pub replayed: bool,
}

/// Filter options for listing transactions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionFilter {
    /// Filter by kind.
    #[serde(default)]
    pub kind: Option<TransactionKind>,
    /// Filter by status.
    #[serde(default)]
    pub status: Option<TransactionStatus>,
    /// Filter by counter-party.
    #[serde(default)]
    pub contact_id: Option<ContactId>,
    /// Transactions touching this account code (category, item or tax).
    #[serde(default)]
    pub category: Option<String>,
    /// Dated on or after.
    #[serde(default)]
    pub from: Option<NaiveDate>,
    /// Dated on or before.
    #[serde(default)]
    pub to: Option<NaiveDate>,
    /// Unsettled and due on or before.
    #[serde(default)]
    pub due_before: Option<NaiveDate>,
}

/// Sortable transaction fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    /// Document date.
    #[default]
    Date,
    /// Total amount.
    Amount,
    /// Reference.
    Reference,
    /// Due date (undated last).
    DueDate,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Ascending.
    Asc,
    /// Descending.
    #[default]
    Desc,
}

/// How to order listed transactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TransactionSort {
    /// Field to sort by.
    #[serde(default)]
    pub field: SortField,
    /// Direction.
    #[serde(default)]
    pub order: SortOrder,
}
