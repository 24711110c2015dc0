//! Transaction lifecycle operations.

use std::cmp::Ordering;

use chrono::Utc;
use rust_decimal::Decimal;
use tally_shared::types::{PageRequest, PageResponse, PaymentId, TransactionId, exceeds_scale};
use tracing::{debug, info, warn};

use super::posting::{posting_lines, settlement_lines};
use super::types::{
    Payment, PaymentOutcome, RecordPaymentInput, SortField, SortOrder, Transaction,
    TransactionFilter, TransactionInput, TransactionSort, TransactionStatus,
};
use super::validation::resolve_total;
use super::workflow::{CancelEffect, TransactionWorkflow};
use crate::error::{LedgerError, LedgerResult};
use crate::journal::DraftEntryInput;
use crate::store::{Ledger, LedgerState};

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl LedgerState {
    fn check_reference(&self, reference: &str, owner: Option<TransactionId>) -> LedgerResult<()> {
        match self.references.get(reference) {
            Some(existing) if Some(*existing) != owner => Err(LedgerError::validation(
                "reference",
                format!("transaction reference {reference} already exists"),
            )),
            _ => Ok(()),
        }
    }

    /// Validates and stores a new DRAFT transaction.
    pub(crate) fn insert_transaction(
        &mut self,
        input: TransactionInput,
        scale: u32,
    ) -> LedgerResult<&Transaction> {
        let total = resolve_total(&input, scale)?;
        let reference = input.reference.trim().to_string();
        self.check_reference(&reference, None)?;

        let now = Utc::now();
        let transaction = Transaction {
            id: TransactionId::new(),
            kind: input.kind,
            reference,
            date: input.date,
            due_date: input.due_date,
            contact_id: input.contact_id,
            description: trimmed(input.description),
            category_account: input.category_account.trim().to_string(),
            counter_account: input.counter_account.trim().to_string(),
            total_amount: total,
            tax: input.tax,
            line_items: input.line_items,
            status: TransactionStatus::Draft,
            journal_entry_id: None,
            payments: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        let id = transaction.id;
        self.references.insert(transaction.reference.clone(), id);
        self.transactions.insert(id, transaction);
        self.transaction(id)
    }

    /// Replaces the editable fields of a DRAFT transaction.
    pub(crate) fn replace_draft(
        &mut self,
        id: TransactionId,
        input: TransactionInput,
        scale: u32,
    ) -> LedgerResult<&Transaction> {
        let current = self.transaction(id)?;
        TransactionWorkflow::ensure_editable(id, current.status)?;
        let total = resolve_total(&input, scale)?;
        let reference = input.reference.trim().to_string();
        self.check_reference(&reference, Some(id))?;
        let old_reference = current.reference.clone();

        let transaction = self
            .transactions
            .get_mut(&id)
            .ok_or_else(|| LedgerError::not_found("Transaction", id))?;
        transaction.kind = input.kind;
        transaction.reference = reference.clone();
        transaction.date = input.date;
        transaction.due_date = input.due_date;
        transaction.contact_id = input.contact_id;
        transaction.description = trimmed(input.description);
        transaction.category_account = input.category_account.trim().to_string();
        transaction.counter_account = input.counter_account.trim().to_string();
        transaction.total_amount = total;
        transaction.tax = input.tax;
        transaction.line_items = input.line_items;
        transaction.updated_at = Utc::now();

        self.references.remove(&old_reference);
        self.references.insert(reference, id);
        self.transaction(id)
    }

    fn post_transaction(&mut self, id: TransactionId, scale: u32) -> LedgerResult<()> {
        let transaction = self.transaction(id)?;
        let next = TransactionWorkflow::post(id, transaction.status)?;
        let lines = posting_lines(transaction, |code| self.codes.get(code).copied())?;
        let input = DraftEntryInput {
            date: transaction.date,
            reference: Some(transaction.reference.clone()),
            description: Some(format!("{} {}", transaction.kind, transaction.reference)),
            lines,
        };

        let entry_id = self.post_new_entry(input, Some(id), scale)?;
        if let Some(transaction) = self.transactions.get_mut(&id) {
            transaction.status = next;
            transaction.journal_entry_id = Some(entry_id);
            transaction.updated_at = Utc::now();
        }
        Ok(())
    }

    fn apply_payment(
        &mut self,
        id: TransactionId,
        input: RecordPaymentInput,
        scale: u32,
    ) -> LedgerResult<(PaymentId, bool)> {
        let transaction = self.transaction(id)?;

        let key = trimmed(input.idempotency_key);
        if let Some(existing) = key
            .as_ref()
            .and_then(|k| self.payment_keys.get(&(id, k.clone())))
        {
            return Ok((*existing, true));
        }

        let next = TransactionWorkflow::apply_payment(
            id,
            transaction.status,
            transaction.total_amount,
            transaction.paid_amount(),
            input.amount,
        )?;
        if exceeds_scale(input.amount, scale) {
            return Err(LedgerError::InvalidAmount {
                amount: input.amount,
                reason: format!("amounts allow at most {scale} decimal places"),
            });
        }

        let settlement_account = trimmed(input.account);
        let journal_entry_id = match &settlement_account {
            None => None,
            Some(code) => {
                let settlement = self.codes.get(code.as_str()).copied().ok_or_else(|| {
                    LedgerError::validation("account", format!("account {code} does not exist"))
                })?;
                let counter = self
                    .codes
                    .get(&transaction.counter_account)
                    .copied()
                    .ok_or_else(|| {
                        LedgerError::validation(
                            "counter_account",
                            format!("account {} does not exist", transaction.counter_account),
                        )
                    })?;
                let memo = format!("Payment {}", transaction.reference);
                let entry = DraftEntryInput {
                    date: input.date,
                    reference: input
                        .reference
                        .clone()
                        .or_else(|| Some(transaction.reference.clone())),
                    description: Some(memo.clone()),
                    lines: settlement_lines(
                        transaction.kind,
                        counter,
                        settlement,
                        input.amount,
                        &memo,
                    ),
                };
                Some(self.post_new_entry(entry, Some(id), scale)?)
            }
        };

        let payment = Payment {
            id: PaymentId::new(),
            amount: input.amount,
            date: input.date,
            mode: input.mode,
            reference: trimmed(input.reference),
            notes: trimmed(input.notes),
            account: settlement_account,
            journal_entry_id,
            idempotency_key: key.clone(),
            created_at: Utc::now(),
        };
        let payment_id = payment.id;

        if let Some(transaction) = self.transactions.get_mut(&id) {
            transaction.payments.push(payment);
            transaction.status = next;
            transaction.updated_at = Utc::now();
        }
        if let Some(key) = key {
            self.payment_keys.insert((id, key), payment_id);
        }
        Ok((payment_id, false))
    }
}

fn compare(a: &Transaction, b: &Transaction, sort: TransactionSort) -> Ordering {
    let primary = match sort.field {
        SortField::Date => a.date.cmp(&b.date),
        SortField::Amount => a.total_amount.cmp(&b.total_amount),
        SortField::Reference => a.reference.cmp(&b.reference),
        SortField::DueDate => match (a.due_date, b.due_date) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        },
    };
    let ordering = primary.then_with(|| a.reference.cmp(&b.reference));
    match sort.order {
        SortOrder::Asc => ordering,
        SortOrder::Desc => ordering.reverse(),
    }
}

fn matches_filter(transaction: &Transaction, filter: &TransactionFilter) -> bool {
    let touches_category = |code: &str| {
        transaction.category_account == code
            || transaction
                .line_items
                .iter()
                .any(|i| i.account.as_deref() == Some(code))
            || transaction
                .tax
                .as_ref()
                .is_some_and(|t| t.account.as_deref() == Some(code))
    };

    filter.kind.is_none_or(|k| transaction.kind == k)
        && filter.status.is_none_or(|s| transaction.status == s)
        && filter
            .contact_id
            .is_none_or(|c| transaction.contact_id == Some(c))
        && filter
            .category
            .as_deref()
            .is_none_or(|c| touches_category(c.trim()))
        && filter.from.is_none_or(|d| transaction.date >= d)
        && filter.to.is_none_or(|d| transaction.date <= d)
        && filter.due_before.is_none_or(|d| {
            matches!(
                transaction.status,
                TransactionStatus::Posted | TransactionStatus::Partial
            ) && transaction.due_date.is_some_and(|due| due <= d)
        })
}

impl Ledger {
    /// Creates a DRAFT transaction.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for blank references or account codes, a
    /// duplicate reference, or a total that violates the total policy.
    pub fn create_transaction(&self, input: TransactionInput) -> LedgerResult<Transaction> {
        let scale = self.settings().amount_scale;
        let mut state = self.write()?;
        let transaction = state.insert_transaction(input, scale)?.clone();
        info!(
            transaction_id = %transaction.id,
            reference = %transaction.reference,
            kind = %transaction.kind,
            total = %transaction.total_amount,
            "Transaction created"
        );
        Ok(transaction)
    }

    /// Replaces a DRAFT transaction's fields.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyPosted` once posted, otherwise as
    /// [`Ledger::create_transaction`].
    pub fn update_transaction(
        &self,
        id: TransactionId,
        input: TransactionInput,
    ) -> LedgerResult<Transaction> {
        let scale = self.settings().amount_scale;
        let mut state = self.write()?;
        let transaction = state.replace_draft(id, input, scale)?.clone();
        info!(transaction_id = %id, reference = %transaction.reference, "Transaction updated");
        Ok(transaction)
    }

    /// Deletes a DRAFT transaction.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyPosted` once posted.
    pub fn delete_transaction(&self, id: TransactionId) -> LedgerResult<()> {
        let mut state = self.write()?;
        let transaction = state.transaction(id)?;
        TransactionWorkflow::ensure_editable(id, transaction.status)?;
        let reference = transaction.reference.clone();
        state.transactions.remove(&id);
        state.references.remove(&reference);
        info!(transaction_id = %id, reference = %reference, "Transaction deleted");
        Ok(())
    }

    /// Posts a DRAFT transaction: generates, posts and links its journal
    /// entry. On any failure the transaction stays DRAFT and no entry exists.
    ///
    /// # Errors
    ///
    /// - `AlreadyPosted` if not a draft
    /// - `Validation` if an account code does not resolve or the total is zero
    pub fn post_transaction(&self, id: TransactionId) -> LedgerResult<Transaction> {
        let scale = self.settings().amount_scale;
        let mut state = self.write()?;
        if let Err(err) = state.post_transaction(id, scale) {
            warn!(transaction_id = %id, error = %err, "Transaction posting rejected");
            return Err(err);
        }
        let transaction = state.transaction(id)?.clone();
        info!(
            transaction_id = %id,
            entry_id = ?transaction.journal_entry_id,
            "Transaction posted"
        );
        Ok(transaction)
    }

    /// Applies a payment. A repeated idempotency key returns the original
    /// payment without applying anything.
    ///
    /// # Errors
    ///
    /// - `InvalidAmount` if the amount is not positive or would over-settle
    /// - `NotPostableState` if the transaction is DRAFT or CANCELLED
    /// - `Validation` if the settlement account does not resolve
    pub fn record_payment(
        &self,
        id: TransactionId,
        input: RecordPaymentInput,
    ) -> LedgerResult<PaymentOutcome> {
        let scale = self.settings().amount_scale;
        let mut state = self.write()?;
        let amount = input.amount;
        let (payment_id, replayed) = match state.apply_payment(id, input, scale) {
            Ok(applied) => applied,
            Err(err) => {
                warn!(transaction_id = %id, amount = %amount, error = %err, "Payment rejected");
                return Err(err);
            }
        };

        let transaction = state.transaction(id)?.clone();
        let payment = transaction
            .payments
            .iter()
            .find(|p| p.id == payment_id)
            .cloned()
            .ok_or_else(|| LedgerError::Internal(format!("payment {payment_id} missing")))?;

        if replayed {
            info!(transaction_id = %id, payment_id = %payment_id, "Payment replayed for idempotency key");
        } else {
            info!(
                transaction_id = %id,
                payment_id = %payment_id,
                amount = %payment.amount,
                status = %transaction.status,
                "Payment recorded"
            );
        }
        Ok(PaymentOutcome {
            transaction,
            payment,
            replayed,
        })
    }

    /// Cancels a transaction without payments. Cancelling a POSTED
    /// transaction reverses its journal entry.
    ///
    /// # Errors
    ///
    /// - `Conflict` if any payment exists
    /// - `NotPostableState` if terminal, or POSTED while not permitted
    pub fn cancel_transaction(&self, id: TransactionId) -> LedgerResult<Transaction> {
        let scale = self.settings().amount_scale;
        let allow_posted = self.settings().allow_cancel_posted;
        let mut state = self.write()?;
        let transaction = state.transaction(id)?;
        let effect = TransactionWorkflow::cancel(
            id,
            transaction.status,
            transaction.payments.len(),
            allow_posted,
        )?;
        let entry_id = transaction.journal_entry_id;

        if let (CancelEffect::ReverseEntry, Some(entry_id)) = (effect, entry_id) {
            state.reverse(entry_id, None, scale)?;
        }

        let transaction = state
            .transactions
            .get_mut(&id)
            .ok_or_else(|| LedgerError::not_found("Transaction", id))?;
        transaction.status = TransactionStatus::Cancelled;
        transaction.updated_at = Utc::now();
        let transaction = transaction.clone();
        info!(transaction_id = %id, effect = ?effect, "Transaction cancelled");
        Ok(transaction)
    }

    /// Gets a transaction by id.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the transaction does not exist.
    pub fn get_transaction(&self, id: TransactionId) -> LedgerResult<Transaction> {
        self.read()?.transaction(id).cloned()
    }

    /// Gets a transaction by reference.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no transaction has the reference.
    pub fn get_transaction_by_reference(&self, reference: &str) -> LedgerResult<Transaction> {
        let state = self.read()?;
        let reference = reference.trim();
        state
            .references
            .get(reference)
            .and_then(|id| state.transactions.get(id))
            .cloned()
            .ok_or_else(|| LedgerError::not_found("Transaction", reference))
    }

    /// Remaining amount to be paid.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the transaction does not exist.
    pub fn outstanding(&self, id: TransactionId) -> LedgerResult<Decimal> {
        Ok(self.read()?.transaction(id)?.outstanding())
    }

    /// Lists transactions matching `filter` in `sort` order.
    ///
    /// # Errors
    ///
    /// Returns `Internal` if the store is unavailable.
    pub fn list_transactions(
        &self,
        filter: &TransactionFilter,
        sort: TransactionSort,
        page: PageRequest,
    ) -> LedgerResult<PageResponse<Transaction>> {
        let transactions = self.all_transactions(filter, sort)?;
        debug!(count = transactions.len(), "Listing transactions");
        Ok(self.page(page).paginate(transactions))
    }

    /// Every transaction matching `filter` in `sort` order, unpaginated.
    ///
    /// # Errors
    ///
    /// Returns `Internal` if the store is unavailable.
    pub fn all_transactions(
        &self,
        filter: &TransactionFilter,
        sort: TransactionSort,
    ) -> LedgerResult<Vec<Transaction>> {
        let state = self.read()?;
        let mut transactions: Vec<Transaction> = state
            .transactions
            .values()
            .filter(|t| matches_filter(t, filter))
            .cloned()
            .collect();
        transactions.sort_by(|a, b| compare(a, b, sort));
        Ok(transactions)
    }
}
