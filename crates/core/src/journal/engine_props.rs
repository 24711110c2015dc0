//! Property-based tests for the posting engine.
//!
//! - Posted entries always balance; unbalanced line sets are rejected
//! - Balances equal opening balance plus signed postings after any sequence
//!   of posts and reversals
//! - Posting then reversing restores every affected balance

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;
use tally_shared::types::AccountId;

use super::types::{DraftEntryInput, JournalLine, JournalStatus};
use crate::accounts::{AccountType, CreateAccountInput};
use crate::error::LedgerError;
use crate::store::Ledger;

const CODES: [(&str, AccountType); 4] = [
    ("1000", AccountType::Asset),
    ("2000", AccountType::Liability),
    ("4000", AccountType::Income),
    ("6000", AccountType::Expense),
];

/// Strategy to generate positive amounts (0.01 to 10,000.00).
fn positive_amount() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy to generate opening balances (-1,000.00 to 1,000.00).
fn opening_balance() -> impl Strategy<Value = Decimal> {
    (-100_000i64..100_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// A side-tagged line: (account index, is debit, amount).
fn raw_line() -> impl Strategy<Value = (usize, bool, Decimal)> {
    (0..CODES.len(), any::<bool>(), positive_amount())
}

/// A balanced set: debit lines plus one credit line closing the sum.
fn balanced_lines() -> impl Strategy<Value = Vec<(usize, bool, Decimal)>> {
    (
        prop::collection::vec((0..CODES.len(), positive_amount()), 1..5),
        0..CODES.len(),
    )
        .prop_map(|(debits, closing)| {
            let total: Decimal = debits.iter().map(|(_, amount)| *amount).sum();
            let mut lines: Vec<_> = debits.into_iter().map(|(i, a)| (i, true, a)).collect();
            lines.push((closing, false, total));
            lines
        })
}

fn setup(openings: &[Decimal]) -> (Ledger, Vec<AccountId>) {
    let ledger = Ledger::default();
    let ids = CODES
        .iter()
        .zip(openings)
        .map(|((code, account_type), opening)| {
            ledger
                .create_account(
                    CreateAccountInput::new(*code, *code, *account_type)
                        .with_opening_balance(*opening),
                )
                .unwrap()
                .id
        })
        .collect();
    (ledger, ids)
}

fn to_input(ids: &[AccountId], raw: &[(usize, bool, Decimal)]) -> DraftEntryInput {
    DraftEntryInput {
        date: NaiveDate::from_ymd_opt(2026, 1, 15).unwrap(),
        reference: None,
        description: None,
        lines: raw
            .iter()
            .map(|(index, is_debit, amount)| {
                if *is_debit {
                    JournalLine::debit(ids[*index], *amount)
                } else {
                    JournalLine::credit(ids[*index], *amount)
                }
            })
            .collect(),
    }
}

fn balances(ledger: &Ledger, ids: &[AccountId]) -> Vec<Decimal> {
    ids.iter()
        .map(|id| ledger.get_account(*id).unwrap().current_balance)
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Random line sets post only when they balance.
    #[test]
    fn prop_only_balanced_entries_post(
        raw in prop::collection::vec(raw_line(), 1..6),
    ) {
        let (ledger, ids) = setup(&[Decimal::ZERO; 4]);
        let draft = ledger.draft_entry(to_input(&ids, &raw)).unwrap();
        let debit: Decimal = raw.iter().filter(|l| l.1).map(|l| l.2).sum();
        let credit: Decimal = raw.iter().filter(|l| !l.1).map(|l| l.2).sum();

        match ledger.post_entry(draft.id) {
            Ok(entry) => {
                prop_assert_eq!(debit, credit);
                prop_assert_eq!(entry.total_debit(), entry.total_credit());
            }
            Err(LedgerError::UnbalancedEntry { debit: d, credit: c }) => {
                prop_assert_ne!(debit, credit);
                prop_assert_eq!(d, debit);
                prop_assert_eq!(c, credit);
                prop_assert_eq!(balances(&ledger, &ids), vec![Decimal::ZERO; 4]);
            }
            Err(other) => prop_assert!(false, "unexpected error: {other}"),
        }
    }

    /// After any sequence of posts and reversals, every balance equals the
    /// opening balance plus its signed posted lines.
    #[test]
    fn prop_balances_match_posted_lines(
        openings in prop::collection::vec(opening_balance(), 4),
        entries in prop::collection::vec((balanced_lines(), any::<bool>()), 1..8),
    ) {
        let (ledger, ids) = setup(&openings);

        for (raw, reverse) in &entries {
            let draft = ledger.draft_entry(to_input(&ids, raw)).unwrap();
            ledger.post_entry(draft.id).unwrap();
            if *reverse {
                ledger.reverse_entry(draft.id, None).unwrap();
            }
        }

        let report = ledger.verify_integrity().unwrap();
        prop_assert!(report.is_clean(), "issues: {:?}", report.issues);
    }

    /// Posting then reversing restores every affected account.
    #[test]
    fn prop_reverse_restores_balances(
        openings in prop::collection::vec(opening_balance(), 4),
        raw in balanced_lines(),
    ) {
        let (ledger, ids) = setup(&openings);
        let before = balances(&ledger, &ids);

        let draft = ledger.draft_entry(to_input(&ids, &raw)).unwrap();
        ledger.post_entry(draft.id).unwrap();
        let reversal = ledger.reverse_entry(draft.id, None).unwrap();

        prop_assert_eq!(balances(&ledger, &ids), before);
        prop_assert_eq!(ledger.get_entry(draft.id).unwrap().status, JournalStatus::Reversed);
        prop_assert_eq!(reversal.reversal_of, Some(draft.id));
    }
}
