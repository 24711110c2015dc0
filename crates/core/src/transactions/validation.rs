//! Input validation for business transactions.
//!
//! Total policy: when line items are present the total is their sum plus
//! tax, and an explicit total that disagrees is rejected. Without line items
//! an explicit total is required.

use rust_decimal::Decimal;
use tally_shared::types::{checked_sum, exceeds_scale};

use super::types::TransactionInput;
use crate::error::{LedgerError, LedgerResult};

fn check_amount(field: &str, amount: Decimal, scale: u32) -> LedgerResult<()> {
    if amount < Decimal::ZERO {
        return Err(LedgerError::validation(field, "must not be negative"));
    }
    if exceeds_scale(amount, scale) {
        return Err(LedgerError::validation(
            field,
            format!("amounts allow at most {scale} decimal places"),
        ));
    }
    Ok(())
}

fn check_code(field: &str, code: &str) -> LedgerResult<()> {
    if code.trim().is_empty() {
        return Err(LedgerError::validation(field, "account code must not be blank"));
    }
    Ok(())
}

/// Validates a transaction input and returns its total.
///
/// # Errors
///
/// Returns `Validation` naming the first offending field, or
/// `InvalidAmount` if the derived total overflows.
pub fn resolve_total(input: &TransactionInput, scale: u32) -> LedgerResult<Decimal> {
    if input.reference.trim().is_empty() {
        return Err(LedgerError::validation("reference", "must not be blank"));
    }
    check_code("category_account", &input.category_account)?;
    check_code("counter_account", &input.counter_account)?;

    if let Some(due) = input.due_date {
        if due < input.date {
            return Err(LedgerError::validation(
                "due_date",
                "must not be before the transaction date",
            ));
        }
    }

    for (index, item) in input.line_items.iter().enumerate() {
        check_amount(&format!("line_items[{index}].amount"), item.amount, scale)?;
        if let Some(account) = &item.account {
            check_code(&format!("line_items[{index}].account"), account)?;
        }
    }

    let tax = match &input.tax {
        Some(tax) => {
            check_amount("tax.amount", tax.amount, scale)?;
            if let Some(account) = &tax.account {
                check_code("tax.account", account)?;
            }
            tax.amount
        }
        None => Decimal::ZERO,
    };

    let total = if input.line_items.is_empty() {
        input.total_amount.ok_or_else(|| {
            LedgerError::validation(
                "total_amount",
                "required when the transaction has no line items",
            )
        })?
    } else {
        let derived = checked_sum(input.line_items.iter().map(|i| i.amount).chain([tax]))
            .ok_or_else(|| LedgerError::InvalidAmount {
                amount: Decimal::MAX,
                reason: "line items plus tax exceed the supported range".to_string(),
            })?;
        match input.total_amount {
            Some(explicit) if explicit != derived => {
                return Err(LedgerError::validation(
                    "total_amount",
                    format!("{explicit} does not match line items plus tax ({derived})"),
                ));
            }
            _ => derived,
        }
    };

    check_amount("total_amount", total, scale)?;
    if tax > total {
        return Err(LedgerError::validation(
            "tax.amount",
            format!("tax {tax} exceeds the total {total}"),
        ));
    }

    Ok(total)
}
