//! Journal lines generated by transactions.
//!
//! - EXPENSE/BILL: debit item/category accounts and the tax account, credit
//!   the counter (cash or payable) account
//! - INVOICE: debit the counter (receivable) account, credit item/category
//!   accounts and the tax account
//!
//! Settlement entries move the paid amount between the counter account and
//! the settlement account in the opposite direction.

use rust_decimal::Decimal;
use tally_shared::types::AccountId;

use super::types::{Transaction, TransactionKind};
use crate::error::{LedgerError, LedgerResult};
use crate::journal::JournalLine;

/// Amounts per account code on the ledger side, first-seen order.
fn ledger_side(transaction: &Transaction) -> Vec<(String, String, Decimal)> {
    let mut sides: Vec<(String, String, Decimal)> = Vec::new();
    let mut add = |field: String, code: &str, amount: Decimal| {
        if amount.is_zero() {
            return;
        }
        let code = code.trim();
        match sides.iter_mut().find(|(_, existing, _)| existing == code) {
            Some((_, _, total)) => *total = total.saturating_add(amount),
            None => sides.push((field, code.to_string(), amount)),
        }
    };

    let tax = transaction.tax.as_ref().map_or(Decimal::ZERO, |t| t.amount);
    if transaction.line_items.is_empty() {
        add(
            "category_account".to_string(),
            &transaction.category_account,
            transaction.total_amount - tax,
        );
    } else {
        for (index, item) in transaction.line_items.iter().enumerate() {
            match &item.account {
                Some(code) => add(format!("line_items[{index}].account"), code, item.amount),
                None => add("category_account".to_string(), &transaction.category_account, item.amount),
            }
        }
    }

    if let Some(tax) = &transaction.tax {
        match &tax.account {
            Some(code) => add("tax.account".to_string(), code, tax.amount),
            None => add("category_account".to_string(), &transaction.category_account, tax.amount),
        }
    }

    sides
}

/// Builds the balanced lines for posting a transaction.
///
/// `resolve` maps an account code to its id.
///
/// # Errors
///
/// - `Validation` if the total is zero
/// - `Validation` naming the field whose account code does not resolve
pub fn posting_lines(
    transaction: &Transaction,
    resolve: impl Fn(&str) -> Option<AccountId>,
) -> LedgerResult<Vec<JournalLine>> {
    if transaction.total_amount <= Decimal::ZERO {
        return Err(LedgerError::validation(
            "total_amount",
            "a transaction with a zero total cannot be posted",
        ));
    }

    let lookup = |field: &str, code: &str| {
        resolve(code.trim()).ok_or_else(|| {
            LedgerError::validation(field, format!("account {} does not exist", code.trim()))
        })
    };

    let counter = lookup("counter_account", &transaction.counter_account)?;
    let memo = format!("{} {}", transaction.kind, transaction.reference);
    let receivable = transaction.kind.is_receivable();

    let mut lines = Vec::new();
    if receivable {
        lines.push(JournalLine::debit(counter, transaction.total_amount).with_memo(memo.clone()));
    }
    for (field, code, amount) in ledger_side(transaction) {
        let account = lookup(&field, &code)?;
        let line = if receivable {
            JournalLine::credit(account, amount)
        } else {
            JournalLine::debit(account, amount)
        };
        lines.push(line.with_memo(memo.clone()));
    }
    if !receivable {
        lines.push(JournalLine::credit(counter, transaction.total_amount).with_memo(memo));
    }

    Ok(lines)
}

/// Lines for a settlement entry of `amount`.
#[must_use]
pub fn settlement_lines(
    kind: TransactionKind,
    counter: AccountId,
    settlement: AccountId,
    amount: Decimal,
    memo: &str,
) -> Vec<JournalLine> {
    if kind.is_receivable() {
        vec![
            JournalLine::debit(settlement, amount).with_memo(memo),
            JournalLine::credit(counter, amount).with_memo(memo),
        ]
    } else {
        vec![
            JournalLine::debit(counter, amount).with_memo(memo),
            JournalLine::credit(settlement, amount).with_memo(memo),
        ]
    }
}
