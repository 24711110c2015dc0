//! Transaction lifecycle state machine.
//!
//! Transitions are pure: they inspect the current state and return the next
//! one (or the reason it is not allowed). The service applies them.

use rust_decimal::Decimal;
use tally_shared::types::TransactionId;

use super::types::TransactionStatus;
use crate::error::{LedgerError, LedgerResult};

const ENTITY: &str = "Transaction";

/// What cancelling does to the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelEffect {
    /// The transaction never reached the ledger.
    Discard,
    /// The generated journal entry must be reversed.
    ReverseEntry,
}

/// Stateless transition rules.
pub struct TransactionWorkflow;

impl TransactionWorkflow {
    /// Editing and deleting are only possible while DRAFT.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyPosted` for any other status.
    pub fn ensure_editable(id: TransactionId, status: TransactionStatus) -> LedgerResult<()> {
        if status.is_editable() {
            Ok(())
        } else {
            Err(LedgerError::AlreadyPosted {
                entity: ENTITY,
                id: id.to_string(),
                status: status.to_string(),
            })
        }
    }

    /// DRAFT → POSTED.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyPosted` if the transaction is not a draft.
    pub fn post(id: TransactionId, status: TransactionStatus) -> LedgerResult<TransactionStatus> {
        Self::ensure_editable(id, status)?;
        Ok(TransactionStatus::Posted)
    }

    /// Applies a payment of `amount` on top of `paid` against `total`.
    ///
    /// Returns PARTIAL while something remains outstanding and PAID once the
    /// payments reach the total.
    ///
    /// # Errors
    ///
    /// - `NotPostableState` if the transaction is DRAFT or CANCELLED
    /// - `InvalidAmount` if `amount` is not positive or would over-settle
    ///   (which is every amount once PAID)
    pub fn apply_payment(
        id: TransactionId,
        status: TransactionStatus,
        total: Decimal,
        paid: Decimal,
        amount: Decimal,
    ) -> LedgerResult<TransactionStatus> {
        if matches!(status, TransactionStatus::Draft | TransactionStatus::Cancelled) {
            return Err(LedgerError::NotPostableState {
                entity: ENTITY,
                id: id.to_string(),
                status: status.to_string(),
            });
        }

        if amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount {
                amount,
                reason: "payment amount must be positive".to_string(),
            });
        }

        let outstanding = total.saturating_sub(paid);
        if amount > outstanding {
            return Err(LedgerError::InvalidAmount {
                amount,
                reason: format!("exceeds the outstanding balance of {outstanding}"),
            });
        }

        if amount == outstanding {
            Ok(TransactionStatus::Paid)
        } else {
            Ok(TransactionStatus::Partial)
        }
    }

    /// → CANCELLED.
    ///
    /// # Errors
    ///
    /// - `Conflict` if any payment has been applied
    /// - `NotPostableState` if already terminal, or POSTED while cancelling
    ///   posted transactions is not permitted
    pub fn cancel(
        id: TransactionId,
        status: TransactionStatus,
        payment_count: usize,
        allow_posted: bool,
    ) -> LedgerResult<CancelEffect> {
        if payment_count > 0 {
            return Err(LedgerError::conflict(format!(
                "transaction {id} has {payment_count} payment(s) and cannot be cancelled"
            )));
        }

        match status {
            TransactionStatus::Draft => Ok(CancelEffect::Discard),
            TransactionStatus::Posted if allow_posted => Ok(CancelEffect::ReverseEntry),
            _ => Err(LedgerError::NotPostableState {
                entity: ENTITY,
                id: id.to_string(),
                status: status.to_string(),
            }),
        }
    }
}
