//! The transactional ledger store.
//!
//! A [`Ledger`] owns one [`LedgerState`] behind a read-write lock. Reads share
//! the lock; every mutating operation holds the write lock for its whole
//! validate-then-apply unit, so balance updates of one journal entry (or one
//! payment application) are never interleaved with another writer's and are
//! never visible half-applied.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use rust_decimal::Decimal;
use tally_shared::LedgerSettings;
use tally_shared::types::{
    AccountId, JournalEntryId, PageRequest, PaymentId, TransactionId, checked_sum,
};

use crate::accounts::Account;
use crate::error::{LedgerError, LedgerResult};
use crate::journal::JournalEntry;
use crate::transactions::Transaction;

/// Everything the ledger knows, guarded as one unit.
#[derive(Debug, Clone, Default)]
pub struct LedgerState {
    /// Account arena.
    pub(crate) accounts: HashMap<AccountId, Account>,
    /// Code → id index.
    pub(crate) codes: HashMap<String, AccountId>,
    /// Journal entries, draft and posted.
    pub(crate) entries: HashMap<JournalEntryId, JournalEntry>,
    /// Business transactions.
    pub(crate) transactions: HashMap<TransactionId, Transaction>,
    /// Transaction reference → id index.
    pub(crate) references: HashMap<String, TransactionId>,
    /// (transaction, client key) → payment already applied for that key.
    pub(crate) payment_keys: HashMap<(TransactionId, String), PaymentId>,
    /// Last posting sequence handed out.
    pub(crate) last_sequence: u64,
}

impl LedgerState {
    /// Looks up an account by id.
    pub(crate) fn account(&self, id: AccountId) -> LedgerResult<&Account> {
        self.accounts
            .get(&id)
            .ok_or_else(|| LedgerError::not_found("Account", id))
    }

    /// Looks up an account by code.
    pub(crate) fn account_by_code(&self, code: &str) -> LedgerResult<&Account> {
        self.codes
            .get(code)
            .and_then(|id| self.accounts.get(id))
            .ok_or_else(|| LedgerError::not_found("Account", code))
    }

    /// Looks up a journal entry by id.
    pub(crate) fn entry(&self, id: JournalEntryId) -> LedgerResult<&JournalEntry> {
        self.entries
            .get(&id)
            .ok_or_else(|| LedgerError::not_found("Journal entry", id))
    }

    /// Looks up a transaction by id.
    pub(crate) fn transaction(&self, id: TransactionId) -> LedgerResult<&Transaction> {
        self.transactions
            .get(&id)
            .ok_or_else(|| LedgerError::not_found("Transaction", id))
    }

    /// Hands out the next posting sequence number.
    pub(crate) fn next_sequence(&mut self) -> u64 {
        self.last_sequence += 1;
        self.last_sequence
    }

    /// Number of journal lines (draft or posted) referencing an account.
    pub(crate) fn line_references(&self, id: AccountId) -> usize {
        self.entries
            .values()
            .flat_map(|entry| entry.lines.iter())
            .filter(|line| line.account_id == id)
            .count()
    }

    /// Sum of signed posted movements on an account, per its normal balance.
    /// `None` if the sum overflows.
    pub(crate) fn posted_movement(&self, account: &Account) -> Option<Decimal> {
        checked_sum(
            self.entries
                .values()
                .filter(|entry| entry.status.is_posted())
                .flat_map(|entry| entry.lines.iter())
                .filter(|line| line.account_id == account.id)
                .map(|line| {
                    crate::journal::balance_change(account.normal_balance, line.debit, line.credit)
                }),
        )
    }
}

/// The shared ledger. Wrap in an `Arc` to share across threads or handlers.
#[derive(Debug, Default)]
pub struct Ledger {
    state: RwLock<LedgerState>,
    settings: LedgerSettings,
}

impl Ledger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new(settings: LedgerSettings) -> Self {
        Self {
            state: RwLock::new(LedgerState::default()),
            settings,
        }
    }

    /// The settings this ledger was created with.
    #[must_use]
    pub fn settings(&self) -> &LedgerSettings {
        &self.settings
    }

    pub(crate) fn read(&self) -> LedgerResult<RwLockReadGuard<'_, LedgerState>> {
        self.state
            .read()
            .map_err(|_| LedgerError::Internal("ledger lock poisoned".to_string()))
    }

    pub(crate) fn write(&self) -> LedgerResult<RwLockWriteGuard<'_, LedgerState>> {
        self.state
            .write()
            .map_err(|_| LedgerError::Internal("ledger lock poisoned".to_string()))
    }

    /// Clamps a requested page to the configured maximum size.
    pub(crate) fn page(&self, request: PageRequest) -> PageRequest {
        PageRequest::new(request.page, request.limit, self.settings.max_page_size)
    }

    /// Runs `f` against a private copy of the state and swaps it in only if
    /// `f` succeeds, so a template that fails partway leaves nothing behind.
    pub(crate) fn atomically<T>(
        &self,
        f: impl FnOnce(&mut LedgerState) -> LedgerResult<T>,
    ) -> LedgerResult<T> {
        let mut guard = self.write()?;
        let mut scratch = guard.clone();
        let value = f(&mut scratch)?;
        *guard = scratch;
        Ok(value)
    }
}
