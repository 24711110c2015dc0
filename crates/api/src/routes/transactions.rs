//! Business transaction routes: expenses, bills and invoices.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::NaiveDate;
use serde::Deserialize;
use tally_core::LedgerError;
use tally_core::import::transaction_csv_template;
use tally_core::transactions::{
    RecordPaymentInput, SortField, SortOrder, TransactionFilter, TransactionInput,
    TransactionKind, TransactionSort, TransactionStatus,
};
use tally_shared::types::{ContactId, Envelope, TransactionId};
use tracing::info;

use crate::AppState;
use crate::error::ApiResult;
use crate::extractors::{ApiJson, ApiPath, ApiQuery, IdempotencyKey};
use crate::response::{attachment, created, ok, page_request};

/// Creates the transaction routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/transactions", get(list_transactions).post(create_transaction))
        .route("/transactions/import", post(import_transactions))
        .route("/transactions/import/template", get(import_template))
        .route("/transactions/export", get(export_transactions))
        .route("/transactions/reference/{reference}", get(get_by_reference))
        .route(
            "/transactions/{id}",
            get(get_transaction)
                .put(update_transaction)
                .delete(delete_transaction),
        )
        .route("/transactions/{id}/post", post(post_transaction))
        .route("/transactions/{id}/payments", post(record_payment))
        .route("/transactions/{id}/cancel", post(cancel_transaction))
}

/// Query parameters shared by listing and export.
#[derive(Debug, Default, Deserialize)]
pub struct TransactionQuery {
    /// `draft`, `posted`, `partial`, `paid` or `cancelled`.
    pub status: Option<String>,
    /// `expense`, `bill` or `invoice`.
    pub kind: Option<String>,
    /// Counter-party.
    pub contact_id: Option<ContactId>,
    /// Account code used as category, item or tax account.
    pub category: Option<String>,
    /// Dated on or after (YYYY-MM-DD).
    pub from: Option<NaiveDate>,
    /// Dated on or before (YYYY-MM-DD).
    pub to: Option<NaiveDate>,
    /// Unsettled and due on or before (YYYY-MM-DD).
    pub due_before: Option<NaiveDate>,
    /// `date`, `amount`, `reference` or `due_date`.
    pub sort: Option<SortField>,
    /// `asc` or `desc`.
    pub order: Option<SortOrder>,
    /// Page number (1-indexed).
    pub page: Option<u32>,
    /// Page size.
    pub limit: Option<u32>,
    /// Export format: `csv` (default) or `json`.
    pub format: Option<String>,
}

impl TransactionQuery {
    fn filter(&self) -> ApiResult<TransactionFilter> {
        let status = non_blank(self.status.as_deref())
            .map(|raw| {
                TransactionStatus::parse(raw)
                    .ok_or_else(|| LedgerError::validation("status", format!("unknown status '{raw}'")))
            })
            .transpose()?;
        let kind = non_blank(self.kind.as_deref())
            .map(|raw| {
                TransactionKind::parse(raw)
                    .ok_or_else(|| LedgerError::validation("kind", format!("unknown kind '{raw}'")))
            })
            .transpose()?;

        Ok(TransactionFilter {
            kind,
            status,
            contact_id: self.contact_id,
            category: non_blank(self.category.as_deref()).map(str::to_string),
            from: self.from,
            to: self.to,
            due_before: self.due_before,
        })
    }

    fn sort(&self) -> TransactionSort {
        TransactionSort {
            field: self.sort.unwrap_or_default(),
            order: self.order.unwrap_or_default(),
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// GET `/transactions` - List with filters and sorting.
async fn list_transactions(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<TransactionQuery>,
) -> ApiResult<impl IntoResponse> {
    let filter = query.filter()?;
    let page = page_request(state.ledger.settings(), query.page, query.limit);
    Ok(Json(state.ledger.list_transactions(&filter, query.sort(), page)?))
}

/// POST `/transactions` - Create a draft.
async fn create_transaction(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<TransactionInput>,
) -> ApiResult<impl IntoResponse> {
    Ok(created(state.ledger.create_transaction(input)?))
}

async fn get_transaction(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<TransactionId>,
) -> ApiResult<impl IntoResponse> {
    Ok(ok(state.ledger.get_transaction(id)?))
}

async fn get_by_reference(
    State(state): State<AppState>,
    ApiPath(reference): ApiPath<String>,
) -> ApiResult<impl IntoResponse> {
    Ok(ok(state.ledger.get_transaction_by_reference(&reference)?))
}

/// PUT `/transactions/{id}` - Replace a draft.
async fn update_transaction(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<TransactionId>,
    ApiJson(input): ApiJson<TransactionInput>,
) -> ApiResult<impl IntoResponse> {
    Ok(ok(state.ledger.update_transaction(id, input)?))
}

async fn delete_transaction(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<TransactionId>,
) -> ApiResult<StatusCode> {
    state.ledger.delete_transaction(id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST `/transactions/{id}/post` - Generate and post the journal entry.
async fn post_transaction(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<TransactionId>,
) -> ApiResult<impl IntoResponse> {
    Ok(ok(state.ledger.post_transaction(id)?))
}

/// POST `/transactions/{id}/payments` - Apply a payment.
///
/// An `Idempotency-Key` header takes precedence over `idempotency_key` in
/// the body. A replayed key answers `200` with the original payment.
async fn record_payment(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<TransactionId>,
    IdempotencyKey(header_key): IdempotencyKey,
    ApiJson(mut input): ApiJson<RecordPaymentInput>,
) -> ApiResult<Response> {
    if header_key.is_some() {
        input.idempotency_key = header_key;
    }
    let outcome = state.ledger.record_payment(id, input)?;
    let status = if outcome.replayed {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((status, Json(Envelope::ok(outcome))).into_response())
}

/// POST `/transactions/{id}/cancel` - Cancel, reversing the entry if posted.
async fn cancel_transaction(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<TransactionId>,
) -> ApiResult<impl IntoResponse> {
    Ok(ok(state.ledger.cancel_transaction(id)?))
}

/// POST `/transactions/import` - Import draft transactions from a CSV body.
async fn import_transactions(
    State(state): State<AppState>,
    body: String,
) -> ApiResult<impl IntoResponse> {
    let summary = state.ledger.import_transactions_csv(&body)?;
    info!(
        created = summary.created,
        updated = summary.updated,
        failed = summary.errors.len(),
        "Transaction import finished"
    );
    Ok(Json(summary))
}

/// GET `/transactions/export?format=csv|json` - Matching transactions as a file.
async fn export_transactions(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<TransactionQuery>,
) -> ApiResult<Response> {
    let filter = query.filter()?;
    let sort = query.sort();
    match non_blank(query.format.as_deref()).map(str::to_ascii_lowercase).as_deref() {
        None | Some("csv") => {
            let body = state.ledger.export_transactions_csv(&filter, sort)?;
            Ok(attachment("text/csv; charset=utf-8", "transactions.csv", body))
        }
        Some("json") => {
            let body = state.ledger.export_transactions_json(&filter, sort)?;
            Ok(attachment("application/json", "transactions.json", body))
        }
        Some(other) => Err(LedgerError::validation(
            "format",
            format!("unsupported export format '{other}', expected csv or json"),
        )
        .into()),
    }
}

async fn import_template() -> ApiResult<Response> {
    let csv = transaction_csv_template()?;
    Ok(attachment("text/csv; charset=utf-8", "transactions_template.csv", csv))
}
