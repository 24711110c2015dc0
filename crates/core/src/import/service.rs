//! Batch import and export on the ledger.
//!
//! Rows are committed one at a time, each under its own write lock, so a bad
//! row never rolls back the rows before it and concurrent batches interleave
//! at row boundaries.

use tracing::{debug, info};

use super::records::{
    AccountRecord, accounts_to_csv, parse_account_csv, parse_transaction_csv,
    transactions_to_csv, transactions_to_json,
};
use super::types::{ImportRow, ImportSummary, RowError};
use crate::accounts::{Account, CreateAccountInput, tree};
use crate::error::{LedgerError, LedgerResult};
use crate::store::{Ledger, LedgerState};
use crate::transactions::{Transaction, TransactionFilter, TransactionInput, TransactionSort};

/// Whether a committed row created or updated its entity.
enum Committed {
    Created,
    Updated,
}

impl LedgerState {
    fn upsert_draft_transaction(
        &mut self,
        input: TransactionInput,
        scale: u32,
    ) -> LedgerResult<(Transaction, Committed)> {
        match self.references.get(input.reference.trim()).copied() {
            Some(id) => {
                let transaction = self.replace_draft(id, input, scale)?.clone();
                Ok((transaction, Committed::Updated))
            }
            None => {
                let transaction = self.insert_transaction(input, scale)?.clone();
                Ok((transaction, Committed::Created))
            }
        }
    }
}

impl Ledger {
    fn check_batch_size(&self, rows: usize) -> LedgerResult<()> {
        let max = self.settings().max_import_rows;
        if rows > max {
            return Err(LedgerError::validation(
                "rows",
                format!("batch has {rows} rows; at most {max} are accepted"),
            ));
        }
        Ok(())
    }

    fn import_rows<I, T>(
        &self,
        rows: Vec<ImportRow<I>>,
        entity: &str,
        commit: impl Fn(&mut LedgerState, I) -> LedgerResult<(T, Committed)>,
    ) -> LedgerResult<ImportSummary<T>> {
        self.check_batch_size(rows.len())?;
        let mut summary = ImportSummary::default();

        for (index, parsed) in rows.into_iter().enumerate() {
            let row = index + 1;
            let outcome = parsed.and_then(|input| {
                let mut state = self.write().map_err(|e| RowError::from_ledger(row, &e))?;
                commit(&mut *state, input).map_err(|e| RowError::from_ledger(row, &e))
            });
            match outcome {
                Ok((item, Committed::Created)) => {
                    summary.created += 1;
                    summary.imported.push(item);
                }
                Ok((item, Committed::Updated)) => {
                    summary.updated += 1;
                    summary.imported.push(item);
                }
                Err(error) => {
                    debug!(row, field = ?error.field, reason = %error.reason, "Import row rejected");
                    summary.errors.push(error);
                }
            }
        }

        let summary = summary.finish(entity);
        info!(
            entity,
            created = summary.created,
            updated = summary.updated,
            failed = summary.errors.len(),
            "Import finished"
        );
        Ok(summary)
    }

    /// Imports account rows. Each row runs the same checks as
    /// [`Ledger::create_account`]; an existing code is a row error, never an
    /// overwrite.
    ///
    /// # Errors
    ///
    /// Returns `Validation` on field `rows` if the batch exceeds the
    /// configured maximum. Row failures are reported in the summary.
    pub fn import_accounts(
        &self,
        rows: Vec<ImportRow<CreateAccountInput>>,
    ) -> LedgerResult<ImportSummary<Account>> {
        let scale = self.settings().amount_scale;
        self.import_rows(rows, "accounts", |state, input| {
            let account = state.insert_account(input, scale)?.clone();
            Ok((account, Committed::Created))
        })
    }

    /// Imports transaction rows as drafts. A row whose reference belongs to
    /// an existing DRAFT transaction updates it in place; one belonging to a
    /// posted transaction is a row error.
    ///
    /// # Errors
    ///
    /// Returns `Validation` on field `rows` if the batch exceeds the
    /// configured maximum.
    pub fn import_transactions(
        &self,
        rows: Vec<ImportRow<TransactionInput>>,
    ) -> LedgerResult<ImportSummary<Transaction>> {
        let scale = self.settings().amount_scale;
        self.import_rows(rows, "transactions", |state, input| {
            state.upsert_draft_transaction(input, scale)
        })
    }

    /// Parses and imports account CSV.
    ///
    /// # Errors
    ///
    /// As [`parse_account_csv`] and [`Ledger::import_accounts`].
    pub fn import_accounts_csv(&self, text: &str) -> LedgerResult<ImportSummary<Account>> {
        self.import_accounts(parse_account_csv(text)?)
    }

    /// Parses and imports transaction CSV.
    ///
    /// # Errors
    ///
    /// As [`parse_transaction_csv`] and [`Ledger::import_transactions`].
    pub fn import_transactions_csv(&self, text: &str) -> LedgerResult<ImportSummary<Transaction>> {
        self.import_transactions(parse_transaction_csv(text)?)
    }

    /// Every account as CSV, parents ahead of their children so the file
    /// re-imports in one pass.
    ///
    /// # Errors
    ///
    /// - `Cycle` if a stored parent chain does not reach a root
    /// - `Internal` if the store is unavailable or the writer fails
    pub fn export_accounts_csv(&self) -> LedgerResult<String> {
        let records = {
            let state = self.read()?;
            tree::parent_first(&state.accounts)?
                .into_iter()
                .map(|account| {
                    let parent = account
                        .parent_id
                        .and_then(|id| state.accounts.get(&id))
                        .map(|p| p.code.as_str());
                    AccountRecord::from_account(account, parent)
                })
                .collect::<Vec<_>>()
        };
        debug!(count = records.len(), "Exporting accounts");
        accounts_to_csv(&records)
    }

    /// Matching transactions as CSV.
    ///
    /// # Errors
    ///
    /// Returns `Internal` if the store is unavailable or the writer fails.
    pub fn export_transactions_csv(
        &self,
        filter: &TransactionFilter,
        sort: TransactionSort,
    ) -> LedgerResult<String> {
        transactions_to_csv(&self.all_transactions(filter, sort)?)
    }

    /// Matching transactions as a JSON array.
    ///
    /// # Errors
    ///
    /// Returns `Internal` if the store is unavailable.
    pub fn export_transactions_json(
        &self,
        filter: &TransactionFilter,
        sort: TransactionSort,
    ) -> LedgerResult<String> {
        transactions_to_json(&self.all_transactions(filter, sort)?)
    }
}
