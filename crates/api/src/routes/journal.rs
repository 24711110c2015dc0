//! Journal entry routes.

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::NaiveDate;
use serde::Deserialize;
use tally_core::LedgerError;
use tally_core::journal::{DraftEntryInput, EntryFilter, JournalStatus};
use tally_shared::AppError;
use tally_shared::types::{AccountId, JournalEntryId};

use crate::AppState;
use crate::error::ApiResult;
use crate::extractors::{ApiJson, ApiPath, ApiQuery};
use crate::response::{created, ok, page_request};

/// Creates the journal entry routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/journal-entries", get(list_entries).post(draft_entry))
        .route("/journal-entries/integrity", get(verify_integrity))
        .route(
            "/journal-entries/{id}",
            get(get_entry).put(update_draft).delete(delete_draft),
        )
        .route("/journal-entries/{id}/post", post(post_entry))
        .route("/journal-entries/{id}/reverse", post(reverse_entry))
}

/// Query parameters for listing journal entries.
#[derive(Debug, Deserialize)]
pub struct ListEntriesQuery {
    /// `draft` or `posted`.
    pub status: Option<String>,
    /// Entries dated on or after (YYYY-MM-DD).
    pub from: Option<NaiveDate>,
    /// Entries dated on or before (YYYY-MM-DD).
    pub to: Option<NaiveDate>,
    /// Entries with a line on this account.
    pub account_id: Option<AccountId>,
    /// Page number (1-indexed).
    pub page: Option<u32>,
    /// Page size.
    pub limit: Option<u32>,
}

/// Request body for reversing an entry.
#[derive(Debug, Default, Deserialize)]
pub struct ReverseRequest {
    /// Date of the compensating entry; defaults to the original's date.
    #[serde(default)]
    pub date: Option<NaiveDate>,
}

/// GET `/journal-entries` - List entries in date order.
async fn list_entries(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListEntriesQuery>,
) -> ApiResult<impl IntoResponse> {
    let status = match query.status.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        None => None,
        Some(raw) => Some(JournalStatus::parse(raw).ok_or_else(|| {
            LedgerError::validation("status", format!("unknown status '{raw}'"))
        })?),
    };
    let filter = EntryFilter {
        status,
        from: query.from,
        to: query.to,
        account_id: query.account_id,
    };
    let page = page_request(state.ledger.settings(), query.page, query.limit);
    Ok(Json(state.ledger.list_entries(&filter, page)?))
}

/// POST `/journal-entries` - Create a draft.
async fn draft_entry(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<DraftEntryInput>,
) -> ApiResult<impl IntoResponse> {
    Ok(created(state.ledger.draft_entry(input)?))
}

async fn get_entry(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<JournalEntryId>,
) -> ApiResult<impl IntoResponse> {
    Ok(ok(state.ledger.get_entry(id)?))
}

/// PUT `/journal-entries/{id}` - Replace a draft.
async fn update_draft(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<JournalEntryId>,
    ApiJson(input): ApiJson<DraftEntryInput>,
) -> ApiResult<impl IntoResponse> {
    Ok(ok(state.ledger.update_draft_entry(id, input)?))
}

async fn delete_draft(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<JournalEntryId>,
) -> ApiResult<StatusCode> {
    state.ledger.delete_draft_entry(id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST `/journal-entries/{id}/post` - Post a balanced draft.
async fn post_entry(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<JournalEntryId>,
) -> ApiResult<impl IntoResponse> {
    Ok(ok(state.ledger.post_entry(id)?))
}

/// POST `/journal-entries/{id}/reverse` - Post the compensating entry.
///
/// The body is optional; an empty request reverses on the original date.
async fn reverse_entry(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<JournalEntryId>,
    body: Bytes,
) -> ApiResult<impl IntoResponse> {
    let request = if body.iter().all(u8::is_ascii_whitespace) {
        ReverseRequest::default()
    } else {
        serde_json::from_slice::<ReverseRequest>(&body)
            .map_err(|err| AppError::Validation(format!("invalid reverse request: {err}")))?
    };
    Ok(created(state.ledger.reverse_entry(id, request.date)?))
}

/// GET `/journal-entries/integrity` - Check balance and entry invariants.
async fn verify_integrity(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    Ok(ok(state.ledger.verify_integrity()?))
}
