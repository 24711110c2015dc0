//! Journal posting engine.
//!
//! Drafts are validated structurally and stored without touching balances.
//! Posting re-validates, computes every affected account's new balance, and
//! only then applies them all together with the status flip. Nothing is
//! written until every check has passed, so a rejected posting leaves no
//! account partially updated.

use std::collections::BTreeMap;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use tally_shared::types::{AccountId, JournalEntryId, PageRequest, PageResponse, TransactionId};
use tracing::{debug, info, warn};

use super::balance::{RunningBalance, balance_change};
use super::reversal::{reversal_description, reversing_lines};
use super::types::{
    AccountLedgerLine, DraftEntryInput, EntryFilter, IntegrityIssue, IntegrityReport,
    JournalEntry, JournalLine, JournalStatus,
};
use super::validation::{ensure_balanced, totals, validate_lines};
use crate::error::{LedgerError, LedgerResult};
use crate::store::{Ledger, LedgerState};

const ENTITY: &str = "Journal entry";

impl LedgerState {
    /// Fails unless every line references an existing account.
    fn resolve_lines(&self, lines: &[JournalLine]) -> LedgerResult<()> {
        for (index, line) in lines.iter().enumerate() {
            if !self.accounts.contains_key(&line.account_id) {
                return Err(LedgerError::validation(
                    format!("lines[{index}].account_id"),
                    format!("account {} does not exist", line.account_id),
                ));
            }
        }
        Ok(())
    }

    fn check_draft_input(&self, input: &DraftEntryInput, scale: u32) -> LedgerResult<()> {
        validate_lines(&input.lines, scale)?;
        self.resolve_lines(&input.lines)
    }

    /// Stores a validated draft.
    pub(crate) fn insert_draft(
        &mut self,
        input: DraftEntryInput,
        source_transaction: Option<TransactionId>,
        scale: u32,
    ) -> LedgerResult<JournalEntryId> {
        self.check_draft_input(&input, scale)?;

        let entry = JournalEntry {
            id: JournalEntryId::new(),
            date: input.date,
            reference: input.reference,
            description: input.description,
            status: JournalStatus::Draft,
            lines: input.lines,
            reversal_of: None,
            reversed_by: None,
            source_transaction,
            posting_sequence: None,
            created_at: Utc::now(),
            posted_at: None,
        };
        let id = entry.id;
        self.entries.insert(id, entry);
        Ok(id)
    }

    /// Posts a draft: validate, compute all balance updates, then apply.
    pub(crate) fn post_draft(&mut self, id: JournalEntryId, scale: u32) -> LedgerResult<()> {
        let entry = self.entry(id)?;
        if entry.status != JournalStatus::Draft {
            return Err(LedgerError::AlreadyPosted {
                entity: ENTITY,
                id: id.to_string(),
                status: entry.status.to_string(),
            });
        }

        validate_lines(&entry.lines, scale)?;
        ensure_balanced(&entry.lines)?;
        self.resolve_lines(&entry.lines)?;

        let mut updates: BTreeMap<AccountId, Decimal> = BTreeMap::new();
        for line in &entry.lines {
            let account = self.account(line.account_id)?;
            let balance = updates
                .entry(account.id)
                .or_insert(account.current_balance);
            let change = balance_change(account.normal_balance, line.debit, line.credit);
            *balance = balance
                .checked_add(change)
                .ok_or_else(|| LedgerError::InvalidAmount {
                    amount: change,
                    reason: format!("balance of account {} would overflow", account.code),
                })?;
        }

        // Everything below is infallible.
        let now = Utc::now();
        for (account_id, balance) in updates {
            if let Some(account) = self.accounts.get_mut(&account_id) {
                account.current_balance = balance;
                account.version += 1;
                account.updated_at = now;
            }
        }

        let sequence = self.next_sequence();
        if let Some(entry) = self.entries.get_mut(&id) {
            entry.status = JournalStatus::Posted;
            entry.posted_at = Some(now);
            entry.posting_sequence = Some(sequence);
        }
        Ok(())
    }

    /// Drafts and posts in one step; on failure nothing is stored.
    pub(crate) fn post_new_entry(
        &mut self,
        input: DraftEntryInput,
        source_transaction: Option<TransactionId>,
        scale: u32,
    ) -> LedgerResult<JournalEntryId> {
        ensure_balanced(&input.lines)?;
        let id = self.insert_draft(input, source_transaction, scale)?;
        if let Err(err) = self.post_draft(id, scale) {
            self.entries.remove(&id);
            return Err(err);
        }
        Ok(id)
    }

    /// Posts the compensating entry for `id` and marks the original reversed.
    pub(crate) fn reverse(
        &mut self,
        id: JournalEntryId,
        date: Option<NaiveDate>,
        scale: u32,
    ) -> LedgerResult<JournalEntryId> {
        let original = self.entry(id)?;
        match (original.status, original.reversed_by) {
            (JournalStatus::Reversed, Some(reversed_by)) => {
                return Err(LedgerError::AlreadyReversed {
                    entry_id: id,
                    reversed_by,
                });
            }
            (JournalStatus::Posted, _) => {}
            (status, _) => {
                return Err(LedgerError::NotPostableState {
                    entity: ENTITY,
                    id: id.to_string(),
                    status: status.to_string(),
                });
            }
        }

        let input = DraftEntryInput {
            date: date.unwrap_or(original.date),
            reference: original.reference.clone(),
            description: Some(reversal_description(original)),
            lines: reversing_lines(&original.lines),
        };
        let source = original.source_transaction;

        let reversal_id = self.post_new_entry(input, source, scale)?;
        if let Some(reversal) = self.entries.get_mut(&reversal_id) {
            reversal.reversal_of = Some(id);
        }
        if let Some(original) = self.entries.get_mut(&id) {
            original.status = JournalStatus::Reversed;
            original.reversed_by = Some(reversal_id);
        }
        Ok(reversal_id)
    }

    fn draft_mut(&mut self, id: JournalEntryId) -> LedgerResult<&mut JournalEntry> {
        let entry = self
            .entries
            .get_mut(&id)
            .ok_or_else(|| LedgerError::not_found(ENTITY, id))?;
        if entry.status != JournalStatus::Draft {
            return Err(LedgerError::AlreadyPosted {
                entity: ENTITY,
                id: id.to_string(),
                status: entry.status.to_string(),
            });
        }
        Ok(entry)
    }
}

impl Ledger {
    /// Creates a draft journal entry. Balances are untouched.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for an empty line set, a malformed line, or an
    /// unknown account.
    pub fn draft_entry(&self, input: DraftEntryInput) -> LedgerResult<JournalEntry> {
        let scale = self.settings().amount_scale;
        let mut state = self.write()?;
        let id = state.insert_draft(input, None, scale)?;
        let entry = state.entry(id)?.clone();
        info!(entry_id = %id, lines = entry.lines.len(), "Journal entry drafted");
        Ok(entry)
    }

    /// Replaces the date, reference, description and lines of a draft.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyPosted` once the entry has been posted.
    pub fn update_draft_entry(
        &self,
        id: JournalEntryId,
        input: DraftEntryInput,
    ) -> LedgerResult<JournalEntry> {
        let scale = self.settings().amount_scale;
        let mut state = self.write()?;
        state.draft_mut(id)?;
        state.check_draft_input(&input, scale)?;

        let entry = state.draft_mut(id)?;
        entry.date = input.date;
        entry.reference = input.reference;
        entry.description = input.description;
        entry.lines = input.lines;
        let entry = entry.clone();
        info!(entry_id = %id, "Journal entry draft updated");
        Ok(entry)
    }

    /// Deletes a draft.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyPosted` once the entry has been posted.
    pub fn delete_draft_entry(&self, id: JournalEntryId) -> LedgerResult<()> {
        let mut state = self.write()?;
        state.draft_mut(id)?;
        state.entries.remove(&id);
        info!(entry_id = %id, "Journal entry draft deleted");
        Ok(())
    }

    /// Posts a draft and applies its lines to account balances.
    ///
    /// # Errors
    ///
    /// - `UnbalancedEntry` if debits and credits differ
    /// - `AlreadyPosted` if the entry is not a draft
    pub fn post_entry(&self, id: JournalEntryId) -> LedgerResult<JournalEntry> {
        let scale = self.settings().amount_scale;
        let mut state = self.write()?;
        if let Err(err) = state.post_draft(id, scale) {
            warn!(entry_id = %id, error = %err, "Journal entry posting rejected");
            return Err(err);
        }
        let entry = state.entry(id)?.clone();
        info!(
            entry_id = %id,
            debit = %entry.total_debit(),
            sequence = ?entry.posting_sequence,
            "Journal entry posted"
        );
        Ok(entry)
    }

    /// Posts a compensating entry for a posted entry and returns it.
    ///
    /// Entries generated by a business transaction are reversed by
    /// cancelling that transaction instead.
    ///
    /// # Errors
    ///
    /// - `AlreadyReversed` if a compensating entry already exists
    /// - `NotPostableState` if the entry is still a draft
    /// - `Conflict` if the entry belongs to a transaction
    pub fn reverse_entry(
        &self,
        id: JournalEntryId,
        date: Option<NaiveDate>,
    ) -> LedgerResult<JournalEntry> {
        let scale = self.settings().amount_scale;
        let mut state = self.write()?;
        let original = state.entry(id)?;
        if let (Some(transaction_id), JournalStatus::Posted) =
            (original.source_transaction, original.status)
        {
            return Err(LedgerError::conflict(format!(
                "journal entry {id} was generated by transaction {transaction_id}; cancel the transaction instead"
            )));
        }

        let reversal_id = state.reverse(id, date, scale)?;
        let reversal = state.entry(reversal_id)?.clone();
        info!(entry_id = %id, reversal_id = %reversal_id, "Journal entry reversed");
        Ok(reversal)
    }

    /// Gets a journal entry by id.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the entry does not exist.
    pub fn get_entry(&self, id: JournalEntryId) -> LedgerResult<JournalEntry> {
        self.read()?.entry(id).cloned()
    }

    /// Lists journal entries, newest date first.
    ///
    /// # Errors
    ///
    /// Returns `Internal` if the store is unavailable.
    pub fn list_entries(
        &self,
        filter: &EntryFilter,
        page: PageRequest,
    ) -> LedgerResult<PageResponse<JournalEntry>> {
        let state = self.read()?;
        let mut entries: Vec<JournalEntry> = state
            .entries
            .values()
            .filter(|e| filter.status.is_none_or(|s| e.status == s))
            .filter(|e| filter.from.is_none_or(|d| e.date >= d))
            .filter(|e| filter.to.is_none_or(|d| e.date <= d))
            .filter(|e| filter.account_id.is_none_or(|a| e.touches(a)))
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.date.cmp(&a.date).then(b.created_at.cmp(&a.created_at)));
        debug!(count = entries.len(), "Listing journal entries");
        Ok(self.page(page).paginate(entries))
    }

    /// Posted lines of an account in posting order, with running balances
    /// starting from the opening balance.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the account does not exist.
    pub fn account_ledger(&self, account_id: AccountId) -> LedgerResult<Vec<AccountLedgerLine>> {
        let state = self.read()?;
        let account = state.account(account_id)?;

        let mut posted: Vec<&JournalEntry> = state
            .entries
            .values()
            .filter(|e| e.status.is_posted() && e.touches(account_id))
            .collect();
        posted.sort_by_key(|e| e.posting_sequence);

        let mut running = RunningBalance::opening(account.opening_balance);
        let mut lines = Vec::new();
        for entry in posted {
            for line in entry.lines.iter().filter(|l| l.account_id == account_id) {
                let change = balance_change(account.normal_balance, line.debit, line.credit);
                running = running.next(change).ok_or_else(|| {
                    LedgerError::Internal(format!(
                        "running balance of account {} overflowed",
                        account.code
                    ))
                })?;
                lines.push(AccountLedgerLine {
                    entry_id: entry.id,
                    date: entry.date,
                    reference: entry.reference.clone(),
                    debit: line.debit,
                    credit: line.credit,
                    memo: line.memo.clone(),
                    running,
                });
            }
        }
        Ok(lines)
    }

    /// Recomputes every balance from opening balances and posted lines and
    /// checks every posted entry balances.
    ///
    /// # Errors
    ///
    /// Returns `Internal` if the store is unavailable.
    pub fn verify_integrity(&self) -> LedgerResult<IntegrityReport> {
        let state = self.read()?;
        let mut report = IntegrityReport {
            accounts_checked: state.accounts.len(),
            ..IntegrityReport::default()
        };

        let mut accounts: Vec<_> = state.accounts.values().collect();
        accounts.sort_by(|a, b| a.code.cmp(&b.code));
        for account in accounts {
            let expected = state
                .posted_movement(account)
                .and_then(|movement| account.opening_balance.checked_add(movement))
                .ok_or_else(|| {
                    LedgerError::Internal(format!(
                        "recomputed balance of account {} overflowed",
                        account.code
                    ))
                })?;
            if expected != account.current_balance {
                report.issues.push(IntegrityIssue::BalanceDrift {
                    code: account.code.clone(),
                    expected,
                    actual: account.current_balance,
                });
            }
        }

        for entry in state.entries.values().filter(|e| e.status.is_posted()) {
            report.entries_checked += 1;
            let totals = totals(&entry.lines)?;
            let (debit, credit) = (totals.debit, totals.credit);
            if debit != credit {
                report.issues.push(IntegrityIssue::UnbalancedEntry {
                    entry_id: entry.id,
                    debit,
                    credit,
                });
            }
        }

        if report.is_clean() {
            debug!(accounts = report.accounts_checked, "Ledger integrity verified");
        } else {
            warn!(issues = report.issues.len(), "Ledger integrity issues found");
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::{AccountType, CreateAccountInput};
    use rust_decimal_macros::dec;

    fn ledger_with_accounts() -> (Ledger, AccountId, AccountId) {
        let ledger = Ledger::default();
        let cash = ledger
            .create_account(CreateAccountInput::new("1000", "Cash", AccountType::Asset))
            .unwrap()
            .id;
        let rent = ledger
            .create_account(CreateAccountInput::new("6100", "Rent", AccountType::Expense))
            .unwrap()
            .id;
        (ledger, cash, rent)
    }

    fn input(lines: Vec<JournalLine>) -> DraftEntryInput {
        DraftEntryInput {
            date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            reference: Some("JE-1".into()),
            description: None,
            lines,
        }
    }

    #[test]
    fn test_draft_does_not_touch_balances() {
        let (ledger, cash, rent) = ledger_with_accounts();
        let entry = ledger
            .draft_entry(input(vec![
                JournalLine::debit(rent, dec!(500)),
                JournalLine::credit(cash, dec!(500)),
            ]))
            .unwrap();

        assert_eq!(entry.status, JournalStatus::Draft);
        assert_eq!(ledger.get_account(rent).unwrap().current_balance, dec!(0));
    }

    #[test]
    fn test_draft_rejects_unknown_account() {
        let (ledger, cash, _) = ledger_with_accounts();
        let err = ledger
            .draft_entry(input(vec![
                JournalLine::debit(AccountId::new(), dec!(5)),
                JournalLine::credit(cash, dec!(5)),
            ]))
            .unwrap_err();
        assert!(matches!(err, LedgerError::Validation { ref field, .. } if field == "lines[0].account_id"));
    }

    #[test]
    fn test_post_applies_signed_balances() {
        let (ledger, cash, rent) = ledger_with_accounts();
        let draft = ledger
            .draft_entry(input(vec![
                JournalLine::debit(rent, dec!(500)),
                JournalLine::credit(cash, dec!(500)),
            ]))
            .unwrap();

        let posted = ledger.post_entry(draft.id).unwrap();

        assert_eq!(posted.status, JournalStatus::Posted);
        assert_eq!(posted.posting_sequence, Some(1));
        assert_eq!(ledger.get_account(rent).unwrap().current_balance, dec!(500));
        assert_eq!(ledger.get_account(cash).unwrap().current_balance, dec!(-500));
    }

    #[test]
    fn test_post_unbalanced_leaves_everything_untouched() {
        let (ledger, cash, rent) = ledger_with_accounts();
        let draft = ledger
            .draft_entry(input(vec![
                JournalLine::debit(rent, dec!(500)),
                JournalLine::credit(cash, dec!(400)),
            ]))
            .unwrap();

        let err = ledger.post_entry(draft.id).unwrap_err();

        assert_eq!(
            err,
            LedgerError::UnbalancedEntry {
                debit: dec!(500),
                credit: dec!(400),
            }
        );
        assert_eq!(ledger.get_entry(draft.id).unwrap().status, JournalStatus::Draft);
        assert_eq!(ledger.get_account(rent).unwrap().current_balance, dec!(0));
        assert_eq!(ledger.get_account(cash).unwrap().version, 1);
    }

    #[test]
    fn test_post_twice_fails() {
        let (ledger, cash, rent) = ledger_with_accounts();
        let draft = ledger
            .draft_entry(input(vec![
                JournalLine::debit(rent, dec!(1)),
                JournalLine::credit(cash, dec!(1)),
            ]))
            .unwrap();
        ledger.post_entry(draft.id).unwrap();

        assert!(matches!(
            ledger.post_entry(draft.id),
            Err(LedgerError::AlreadyPosted { .. })
        ));
        assert_eq!(ledger.get_account(rent).unwrap().current_balance, dec!(1));
    }

    #[test]
    fn test_reverse_restores_balances() {
        let (ledger, cash, rent) = ledger_with_accounts();
        let draft = ledger
            .draft_entry(input(vec![
                JournalLine::debit(rent, dec!(250.50)),
                JournalLine::credit(cash, dec!(250.50)),
            ]))
            .unwrap();
        ledger.post_entry(draft.id).unwrap();

        let reversal = ledger.reverse_entry(draft.id, None).unwrap();

        assert_eq!(reversal.reversal_of, Some(draft.id));
        assert_eq!(reversal.status, JournalStatus::Posted);
        let original = ledger.get_entry(draft.id).unwrap();
        assert_eq!(original.status, JournalStatus::Reversed);
        assert_eq!(original.reversed_by, Some(reversal.id));
        assert_eq!(ledger.get_account(rent).unwrap().current_balance, dec!(0));
        assert_eq!(ledger.get_account(cash).unwrap().current_balance, dec!(0));

        assert!(matches!(
            ledger.reverse_entry(draft.id, None),
            Err(LedgerError::AlreadyReversed { reversed_by, .. }) if reversed_by == reversal.id
        ));
        assert!(ledger.verify_integrity().unwrap().is_clean());
    }

    #[test]
    fn test_reverse_draft_is_not_allowed() {
        let (ledger, cash, rent) = ledger_with_accounts();
        let draft = ledger
            .draft_entry(input(vec![
                JournalLine::debit(rent, dec!(1)),
                JournalLine::credit(cash, dec!(1)),
            ]))
            .unwrap();
        assert!(matches!(
            ledger.reverse_entry(draft.id, None),
            Err(LedgerError::NotPostableState { .. })
        ));
    }

    #[test]
    fn test_update_and_delete_only_while_draft() {
        let (ledger, cash, rent) = ledger_with_accounts();
        let draft = ledger
            .draft_entry(input(vec![JournalLine::debit(rent, dec!(1))]))
            .unwrap();

        let updated = ledger
            .update_draft_entry(
                draft.id,
                input(vec![
                    JournalLine::debit(rent, dec!(2)),
                    JournalLine::credit(cash, dec!(2)),
                ]),
            )
            .unwrap();
        assert_eq!(updated.lines.len(), 2);

        ledger.post_entry(draft.id).unwrap();
        assert!(matches!(
            ledger.update_draft_entry(draft.id, input(vec![JournalLine::debit(rent, dec!(3))])),
            Err(LedgerError::AlreadyPosted { .. })
        ));
        assert!(matches!(
            ledger.delete_draft_entry(draft.id),
            Err(LedgerError::AlreadyPosted { .. })
        ));
    }

    #[test]
    fn test_account_ledger_running_balance() {
        let (ledger, cash, rent) = ledger_with_accounts();
        for amount in [dec!(100), dec!(50)] {
            let draft = ledger
                .draft_entry(input(vec![
                    JournalLine::debit(rent, amount),
                    JournalLine::credit(cash, amount),
                ]))
                .unwrap();
            ledger.post_entry(draft.id).unwrap();
        }

        let lines = ledger.account_ledger(rent).unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].running.current_balance, dec!(100));
        assert_eq!(lines[1].running.previous_balance, dec!(100));
        assert_eq!(lines[1].running.current_balance, dec!(150));
    }

    #[test]
    fn test_list_entries_filters_by_status() {
        let (ledger, cash, rent) = ledger_with_accounts();
        let lines = vec![
            JournalLine::debit(rent, dec!(1)),
            JournalLine::credit(cash, dec!(1)),
        ];
        let first = ledger.draft_entry(input(lines.clone())).unwrap();
        ledger.draft_entry(input(lines)).unwrap();
        ledger.post_entry(first.id).unwrap();

        let filter = EntryFilter {
            status: Some(JournalStatus::Draft),
            ..EntryFilter::default()
        };
        let page = ledger.list_entries(&filter, PageRequest::default()).unwrap();
        assert_eq!(page.pagination.total, 1);
    }

    #[test]
    fn test_overflow_is_rejected_and_ledger_stays_readable() {
        let ledger = Ledger::default();
        let vault = ledger
            .create_account(
                CreateAccountInput::new("1900", "Vault", AccountType::Asset)
                    .with_opening_balance(Decimal::MAX),
            )
            .unwrap()
            .id;
        let equity = ledger
            .create_account(CreateAccountInput::new("3000", "Equity", AccountType::Equity))
            .unwrap()
            .id;

        let oversized = ledger.draft_entry(input(vec![
            JournalLine::debit(vault, Decimal::MAX),
            JournalLine::debit(vault, Decimal::MAX),
            JournalLine::credit(equity, Decimal::MAX),
            JournalLine::credit(equity, Decimal::MAX),
        ]));
        assert!(matches!(oversized, Err(LedgerError::InvalidAmount { .. })));

        let draft = ledger
            .draft_entry(input(vec![
                JournalLine::debit(vault, dec!(1)),
                JournalLine::credit(equity, dec!(1)),
            ]))
            .unwrap();
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| ledger.post_entry(draft.id)));
        assert!(matches!(outcome, Ok(Err(LedgerError::InvalidAmount { .. }))));

        assert_eq!(ledger.get_account(vault).unwrap().current_balance, Decimal::MAX);
        assert_eq!(ledger.get_account(equity).unwrap().current_balance, dec!(0));
        assert_eq!(ledger.get_entry(draft.id).unwrap().status, JournalStatus::Draft);
    }
}
