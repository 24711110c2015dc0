//! Business rule validation for journal lines.

use rust_decimal::Decimal;
use tally_shared::types::{checked_sum, exceeds_scale};

use super::types::{EntryTotals, JournalLine};
use crate::error::{LedgerError, LedgerResult};

/// Validates the shape of a line set: at least one line, every line
/// exactly one-sided, no negative amounts, no excess precision, and side
/// totals that fit in a `Decimal`.
///
/// Account resolution and balancing are checked separately.
///
/// # Errors
///
/// Returns `Validation` naming the first offending line, or `InvalidAmount`
/// if a side total overflows.
pub fn validate_lines(lines: &[JournalLine], scale: u32) -> LedgerResult<()> {
    if lines.is_empty() {
        return Err(LedgerError::validation(
            "lines",
            "journal entry must have at least one line",
        ));
    }

    for (index, line) in lines.iter().enumerate() {
        validate_line(index, line, scale)?;
    }

    totals(lines).map(|_| ())
}

fn validate_line(index: usize, line: &JournalLine, scale: u32) -> LedgerResult<()> {
    let field = format!("lines[{index}]");

    if line.debit < Decimal::ZERO || line.credit < Decimal::ZERO {
        return Err(LedgerError::validation(field, "amounts must not be negative"));
    }

    match (line.debit.is_zero(), line.credit.is_zero()) {
        (true, true) => {
            return Err(LedgerError::validation(
                field,
                "line must have a non-zero debit or credit",
            ));
        }
        (false, false) => {
            return Err(LedgerError::validation(
                field,
                "line must not have both debit and credit",
            ));
        }
        _ => {}
    }

    if exceeds_scale(line.debit, scale) || exceeds_scale(line.credit, scale) {
        return Err(LedgerError::validation(
            field,
            format!("amounts allow at most {scale} decimal places"),
        ));
    }

    Ok(())
}

/// Sums debits and credits.
///
/// # Errors
///
/// Returns `InvalidAmount` if either side total overflows.
pub fn totals(lines: &[JournalLine]) -> LedgerResult<EntryTotals> {
    let debit = side_total("debit", lines.iter().map(|l| l.debit))?;
    let credit = side_total("credit", lines.iter().map(|l| l.credit))?;
    Ok(EntryTotals::new(debit, credit))
}

fn side_total(side: &str, amounts: impl Iterator<Item = Decimal> + Clone) -> LedgerResult<Decimal> {
    checked_sum(amounts.clone()).ok_or_else(|| LedgerError::InvalidAmount {
        amount: amounts.max().unwrap_or_default(),
        reason: format!("{side} total exceeds the supported range"),
    })
}

/// Fails unless total debits equal total credits.
///
/// # Errors
///
/// Returns `UnbalancedEntry` carrying both totals, or `InvalidAmount` as
/// [`totals`].
pub fn ensure_balanced(lines: &[JournalLine]) -> LedgerResult<EntryTotals> {
    let totals = totals(lines)?;
    if !totals.is_balanced {
        return Err(LedgerError::UnbalancedEntry {
            debit: totals.debit,
            credit: totals.credit,
        });
    }
    Ok(totals)
}
