//! Compensating entries for posted journal entries.

use super::types::{JournalEntry, JournalLine};

/// Builds the compensating lines for an entry.
///
/// For each original line:
/// - Debits become credits and credits become debits
/// - The account is preserved
/// - The memo is prefixed with "Reversal: "
#[must_use]
pub fn reversing_lines(lines: &[JournalLine]) -> Vec<JournalLine> {
    lines
        .iter()
        .map(|line| JournalLine {
            account_id: line.account_id,
            debit: line.credit,
            credit: line.debit,
            memo: Some(format!(
                "Reversal: {}",
                line.memo.as_deref().unwrap_or_default()
            )),
        })
        .collect()
}

/// Description for the compensating entry.
#[must_use]
pub fn reversal_description(original: &JournalEntry) -> String {
    match original.reference.as_deref() {
        Some(reference) => format!("Reversal of journal entry {} ({reference})", original.id),
        None => format!("Reversal of journal entry {}", original.id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::validation::totals;
    use rust_decimal_macros::dec;
    use tally_shared::types::AccountId;

    #[test]
    fn test_swaps_sides_and_prefixes_memo() {
        let cash = AccountId::new();
        let rent = AccountId::new();
        let lines = vec![
            JournalLine::debit(rent, dec!(500.00)).with_memo("March rent"),
            JournalLine::credit(cash, dec!(500.00)),
        ];

        let reversed = reversing_lines(&lines);

        assert_eq!(reversed[0].account_id, rent);
        assert_eq!(reversed[0].credit, dec!(500.00));
        assert!(reversed[0].debit.is_zero());
        assert_eq!(reversed[0].memo.as_deref(), Some("Reversal: March rent"));
        assert_eq!(reversed[1].debit, dec!(500.00));
        assert_eq!(reversed[1].memo.as_deref(), Some("Reversal: "));
    }

    #[test]
    fn test_reversal_keeps_totals_mirrored() {
        let lines = vec![
            JournalLine::debit(AccountId::new(), dec!(70)),
            JournalLine::debit(AccountId::new(), dec!(30)),
            JournalLine::credit(AccountId::new(), dec!(100)),
        ];
        let original = totals(&lines).unwrap();
        let reversed = totals(&reversing_lines(&lines)).unwrap();
        assert_eq!(reversed.debit, original.credit);
        assert_eq!(reversed.credit, original.debit);
    }
}
