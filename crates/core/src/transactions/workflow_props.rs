//! Property-based tests for payment settlement.
//!
//! - Paid amount never exceeds the total, whatever amounts are attempted
//! - Rejected payments change nothing
//! - Status is PARTIAL while something is outstanding and PAID exactly when
//!   the payments reach the total

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;

use super::types::{RecordPaymentInput, TransactionInput, TransactionStatus};
use crate::accounts::{AccountType, CreateAccountInput};
use crate::error::LedgerError;
use crate::store::Ledger;

/// Strategy to generate positive amounts (0.01 to 5,000.00).
fn positive_amount() -> impl Strategy<Value = Decimal> {
    (1i64..500_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 2, 1).unwrap()
}

fn posted_expense(total: Decimal) -> (Ledger, tally_shared::types::TransactionId) {
    let ledger = Ledger::default();
    ledger
        .create_account(CreateAccountInput::new("1000", "Cash", AccountType::Asset))
        .unwrap();
    ledger
        .create_account(CreateAccountInput::new("6000", "Expenses", AccountType::Expense))
        .unwrap();
    let draft = ledger
        .create_transaction(TransactionInput {
            reference: "EXP-P".into(),
            date: date(),
            category_account: "6000".into(),
            counter_account: "1000".into(),
            total_amount: Some(total),
            ..TransactionInput::default()
        })
        .unwrap();
    ledger.post_transaction(draft.id).unwrap();
    (ledger, draft.id)
}

fn payment(amount: Decimal) -> RecordPaymentInput {
    RecordPaymentInput {
        amount,
        date: date(),
        ..RecordPaymentInput::default()
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_paid_never_exceeds_total(
        total in positive_amount(),
        attempts in prop::collection::vec(positive_amount(), 1..12),
    ) {
        let (ledger, id) = posted_expense(total);
        let mut expected_paid = Decimal::ZERO;

        for amount in attempts {
            let before = ledger.get_transaction(id).unwrap();
            match ledger.record_payment(id, payment(amount)) {
                Ok(outcome) => {
                    expected_paid += amount;
                    prop_assert!(expected_paid <= total);
                    prop_assert_eq!(outcome.transaction.paid_amount(), expected_paid);
                    let expected_status = if expected_paid == total {
                        TransactionStatus::Paid
                    } else {
                        TransactionStatus::Partial
                    };
                    prop_assert_eq!(outcome.transaction.status, expected_status);
                }
                Err(err) => {
                    prop_assert!(matches!(err, LedgerError::InvalidAmount { .. }), "expected InvalidAmount error");
                    prop_assert!(amount > total - expected_paid);
                    prop_assert_eq!(ledger.get_transaction(id).unwrap(), before);
                }
            }
        }

        prop_assert_eq!(ledger.outstanding(id).unwrap(), total - expected_paid);
    }

    #[test]
    fn prop_exact_split_settles(
        total in positive_amount(),
        cuts in prop::collection::vec(1u32..100, 0..6),
    ) {
        let (ledger, id) = posted_expense(total);

        // Split the total into payments at the given percentages, rounded to
        // cents, with the remainder as the last payment.
        let mut remaining = total;
        for cut in cuts {
            let amount = (total * Decimal::new(i64::from(cut), 2)).round_dp(2);
            if amount.is_zero() || amount >= remaining {
                continue;
            }
            let outcome = ledger.record_payment(id, payment(amount)).unwrap();
            prop_assert_eq!(outcome.transaction.status, TransactionStatus::Partial);
            remaining -= amount;
        }

        let last = ledger.record_payment(id, payment(remaining)).unwrap();
        prop_assert_eq!(last.transaction.status, TransactionStatus::Paid);
        prop_assert_eq!(last.transaction.paid_amount(), total);
        prop_assert!(ledger.record_payment(id, payment(Decimal::new(1, 2))).is_err());
    }
}
