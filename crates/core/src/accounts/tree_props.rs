//! Property-based tests for the account registry.
//!
//! - Moving an account under itself or a descendant is always rejected and
//!   leaves the tree unchanged
//! - Deleting an account with children, a balance, or journal references is
//!   always rejected
//! - Stored levels always equal the parent-chain depth

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;
use tally_shared::types::AccountId;

use super::types::{AccountType, CreateAccountInput};
use crate::error::LedgerError;
use crate::journal::{DraftEntryInput, JournalLine};
use crate::store::Ledger;

/// Random forest shape: node `i` has parent `parents[i] < i`, or none.
fn forest_shape() -> impl Strategy<Value = Vec<Option<usize>>> {
    (1usize..40).prop_flat_map(|n| {
        (0..n)
            .map(|i| {
                if i == 0 {
                    Just(None).boxed()
                } else {
                    prop_oneof![1 => Just(None), 4 => (0..i).prop_map(Some)].boxed()
                }
            })
            .collect::<Vec<_>>()
    })
}

fn code(i: usize) -> String {
    format!("A{i:03}")
}

fn build(shape: &[Option<usize>]) -> (Ledger, Vec<AccountId>) {
    let ledger = Ledger::default();
    let ids = shape
        .iter()
        .enumerate()
        .map(|(i, parent)| {
            let mut input = CreateAccountInput::new(code(i), code(i), AccountType::Asset);
            if let Some(p) = parent {
                input = input.with_parent(code(*p));
            }
            ledger.create_account(input).unwrap().id
        })
        .collect();
    (ledger, ids)
}

/// Index of a strict descendant of `root`, if any.
fn some_descendant(shape: &[Option<usize>], root: usize, pick: usize) -> Option<usize> {
    let below: Vec<usize> = (0..shape.len())
        .filter(|&i| {
            let mut current = shape[i];
            while let Some(p) = current {
                if p == root {
                    return true;
                }
                current = shape[p];
            }
            false
        })
        .collect();
    (!below.is_empty()).then(|| below[pick % below.len()])
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// For any tree shape, moving an account under itself or a descendant
    /// fails with a cycle error and changes nothing.
    #[test]
    fn prop_move_under_descendant_rejected(
        shape in forest_shape(),
        root_pick in any::<usize>(),
        pick in any::<usize>(),
    ) {
        let root = root_pick % shape.len();
        let target = some_descendant(&shape, root, pick).unwrap_or(root);
        let (ledger, ids) = build(&shape);
        let before = ledger.account_tree().unwrap();

        let result = ledger.move_account(ids[root], Some(&code(target)));

        prop_assert!(matches!(result, Err(LedgerError::Cycle { .. })), "expected Cycle error");
        prop_assert_eq!(ledger.account_tree().unwrap(), before);
    }

    /// After any legal move, stored levels equal parent-chain depths.
    #[test]
    fn prop_levels_follow_moves(
        shape in forest_shape(),
        moves in prop::collection::vec((any::<usize>(), any::<usize>()), 1..10),
    ) {
        let (ledger, ids) = build(&shape);

        for (node, parent) in moves {
            let node = ids[node % ids.len()];
            let parent = code(parent % ids.len());
            match ledger.move_account(node, Some(&parent)) {
                Ok(_) | Err(LedgerError::Cycle { .. }) => {}
                Err(other) => prop_assert!(false, "unexpected error: {other}"),
            }
        }

        for id in &ids {
            let account = ledger.get_account(*id).unwrap();
            prop_assert_eq!(account.level, ledger.account_level(*id).unwrap());
        }
        let stats = ledger.account_statistics().unwrap();
        prop_assert_eq!(stats.total, ids.len());
    }

    /// Deleting an account with children, a balance, or a journal reference
    /// always fails; a clean leaf always succeeds.
    #[test]
    fn prop_delete_guards(
        shape in forest_shape(),
        pick in any::<usize>(),
        opening in 1i64..10_000,
        referenced in any::<bool>(),
    ) {
        let (ledger, ids) = build(&shape);
        let index = pick % ids.len();
        let has_children = shape.iter().any(|p| *p == Some(index));

        if has_children {
            prop_assert!(matches!(ledger.delete_account(ids[index]), Err(LedgerError::Conflict { .. })), "expected Conflict error");
            return Ok(());
        }

        if referenced {
            ledger
                .draft_entry(DraftEntryInput {
                    date: NaiveDate::from_ymd_opt(2026, 2, 1).unwrap(),
                    reference: None,
                    description: None,
                    lines: vec![JournalLine::debit(ids[index], Decimal::ONE)],
                })
                .unwrap();
            prop_assert!(matches!(ledger.delete_account(ids[index]), Err(LedgerError::Conflict { .. })), "expected Conflict error");
        } else {
            let funded = ledger
                .create_account(
                    CreateAccountInput::new("FUNDED", "Funded", AccountType::Asset)
                        .with_opening_balance(Decimal::new(opening, 2)),
                )
                .unwrap();
            prop_assert!(matches!(ledger.delete_account(funded.id), Err(LedgerError::Conflict { .. })), "expected Conflict error");
            prop_assert!(ledger.delete_account(ids[index]).is_ok());
        }
    }
}
