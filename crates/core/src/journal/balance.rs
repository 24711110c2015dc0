//! Account balance arithmetic.
//!
//! - Debit-normal accounts: balance += debit - credit
//! - Credit-normal accounts: balance += credit - debit

use rust_decimal::Decimal;
use serde::Serialize;

use crate::accounts::NormalBalance;

/// Signed balance change a line causes on an account with the given normal side.
#[must_use]
pub fn balance_change(normal_balance: NormalBalance, debit: Decimal, credit: Decimal) -> Decimal {
    match normal_balance {
        NormalBalance::Debit => debit - credit,
        NormalBalance::Credit => credit - debit,
    }
}

/// Running balance at one line of an account's ledger.
///
/// - `current_balance[N] = previous_balance[N] + change`
/// - `previous_balance[N] = current_balance[N-1]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunningBalance {
    /// Number of posted lines applied so far, including this one.
    pub sequence: u64,
    /// Balance before this line.
    pub previous_balance: Decimal,
    /// Balance after this line.
    pub current_balance: Decimal,
}

impl RunningBalance {
    /// Starting point: no lines applied, balance at the opening amount.
    #[must_use]
    pub fn opening(balance: Decimal) -> Self {
        Self {
            sequence: 0,
            previous_balance: balance,
            current_balance: balance,
        }
    }

    /// Running balance after applying one more change, or `None` on overflow.
    #[must_use]
    pub fn next(&self, change: Decimal) -> Option<Self> {
        Some(Self {
            sequence: self.sequence + 1,
            previous_balance: self.current_balance,
            current_balance: self.current_balance.checked_add(change)?,
        })
    }
}
