//! Chart of accounts routes.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tally_core::LedgerError;
use tally_core::accounts::{
    AccountFilter, AccountType, CreateAccountInput, NormalBalance, UpdateAccountInput,
};
use tally_core::import::account_csv_template;
use tally_shared::types::AccountId;

use crate::AppState;
use crate::error::ApiResult;
use crate::extractors::{ApiJson, ApiPath, ApiQuery};
use crate::response::{attachment, created, ok, page_request};

/// Creates the account routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/accounts", get(list_accounts).post(create_account))
        .route("/accounts/tree", get(account_tree))
        .route("/accounts/roots", get(root_accounts))
        .route("/accounts/leaves", get(leaf_accounts))
        .route("/accounts/statistics", get(account_statistics))
        .route("/accounts/templates", get(list_templates))
        .route("/accounts/templates/{name}", get(get_template))
        .route("/accounts/templates/{name}/apply", post(apply_template))
        .route("/accounts/import", post(import_accounts))
        .route("/accounts/import/template", get(import_template))
        .route("/accounts/export", get(export_accounts))
        .route("/accounts/code/{code}", get(get_account_by_code))
        .route(
            "/accounts/{id}",
            get(get_account)
                .put(replace_account)
                .patch(update_account)
                .delete(delete_account),
        )
        .route("/accounts/{id}/move", post(move_account))
        .route("/accounts/{id}/ancestors", get(ancestors))
        .route("/accounts/{id}/descendants", get(descendants))
        .route("/accounts/{id}/children", get(children))
        .route("/accounts/{id}/path", get(account_path))
        .route("/accounts/{id}/level", get(account_level))
        .route("/accounts/{id}/ledger", get(account_ledger))
}

/// Query parameters for listing accounts.
#[derive(Debug, Deserialize)]
pub struct ListAccountsQuery {
    /// Case-insensitive match on name or code.
    pub search: Option<String>,
    /// Account type, e.g. `asset` or `EXPENSE`.
    #[serde(rename = "type")]
    pub account_type: Option<String>,
    /// Parent code; empty for roots only.
    pub parent: Option<String>,
    /// Page number (1-indexed).
    pub page: Option<u32>,
    /// Page size.
    pub limit: Option<u32>,
}

/// Page parameters.
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    /// Page number (1-indexed).
    pub page: Option<u32>,
    /// Page size.
    pub limit: Option<u32>,
}

/// Request body for a full account update.
#[derive(Debug, Deserialize)]
pub struct ReplaceAccountRequest {
    /// Account code.
    pub code: String,
    /// Account name.
    pub name: String,
    /// Description; omitted or null clears it.
    #[serde(default)]
    pub description: Option<String>,
    /// Account type.
    #[serde(rename = "type")]
    pub account_type: AccountType,
    /// Normal balance; derived from the type when omitted.
    #[serde(default)]
    pub normal_balance: Option<NormalBalance>,
    /// Version the caller read.
    #[serde(default)]
    pub expected_version: Option<i64>,
}

impl From<ReplaceAccountRequest> for UpdateAccountInput {
    fn from(request: ReplaceAccountRequest) -> Self {
        Self {
            code: Some(request.code),
            name: Some(request.name),
            description: Some(request.description),
            account_type: Some(request.account_type),
            normal_balance: Some(
                request
                    .normal_balance
                    .unwrap_or_else(|| request.account_type.normal_balance()),
            ),
            expected_version: request.expected_version,
        }
    }
}

/// Request body for moving an account.
#[derive(Debug, Deserialize)]
pub struct MoveAccountRequest {
    /// New parent code; null moves the account to the root.
    #[serde(default)]
    pub parent_code: Option<String>,
}

/// Response for the level endpoint.
#[derive(Debug, Serialize)]
pub struct LevelResponse {
    /// Account id.
    pub id: AccountId,
    /// Depth in the tree.
    pub level: u32,
}

fn parse_account_type(value: Option<&str>) -> ApiResult<Option<AccountType>> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(raw) => AccountType::parse(raw).map(Some).ok_or_else(|| {
            LedgerError::validation(
                "type",
                format!("unknown account type '{raw}', expected one of ASSET, LIABILITY, EQUITY, INCOME, EXPENSE"),
            )
            .into()
        }),
    }
}

/// GET `/accounts` - List accounts as `{data, pagination}`.
async fn list_accounts(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListAccountsQuery>,
) -> ApiResult<impl IntoResponse> {
    let filter = AccountFilter {
        search: query.search,
        account_type: parse_account_type(query.account_type.as_deref())?,
        parent_code: query.parent,
    };
    let page = page_request(state.ledger.settings(), query.page, query.limit);
    Ok(Json(state.ledger.list_accounts(&filter, page)?))
}

/// POST `/accounts` - Create an account.
async fn create_account(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<CreateAccountInput>,
) -> ApiResult<impl IntoResponse> {
    Ok(created(state.ledger.create_account(input)?))
}

async fn get_account(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<AccountId>,
) -> ApiResult<impl IntoResponse> {
    Ok(ok(state.ledger.get_account(id)?))
}

async fn get_account_by_code(
    State(state): State<AppState>,
    ApiPath(code): ApiPath<String>,
) -> ApiResult<impl IntoResponse> {
    Ok(ok(state.ledger.get_account_by_code(&code)?))
}

/// PUT `/accounts/{id}` - Replace every editable field.
async fn replace_account(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<AccountId>,
    ApiJson(request): ApiJson<ReplaceAccountRequest>,
) -> ApiResult<impl IntoResponse> {
    Ok(ok(state.ledger.update_account(id, request.into())?))
}

/// PATCH `/accounts/{id}` - Change only the fields present.
async fn update_account(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<AccountId>,
    ApiJson(input): ApiJson<UpdateAccountInput>,
) -> ApiResult<impl IntoResponse> {
    Ok(ok(state.ledger.update_account(id, input)?))
}

/// DELETE `/accounts/{id}` - Delete a leaf account with no journal activity.
async fn delete_account(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<AccountId>,
) -> ApiResult<StatusCode> {
    state.ledger.delete_account(id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST `/accounts/{id}/move` - Re-parent an account.
async fn move_account(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<AccountId>,
    ApiJson(request): ApiJson<MoveAccountRequest>,
) -> ApiResult<impl IntoResponse> {
    let parent = request.parent_code.as_deref().map(str::trim).filter(|c| !c.is_empty());
    Ok(ok(state.ledger.move_account(id, parent)?))
}

async fn ancestors(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<AccountId>,
) -> ApiResult<impl IntoResponse> {
    Ok(ok(state.ledger.ancestors(id)?))
}

async fn descendants(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<AccountId>,
) -> ApiResult<impl IntoResponse> {
    Ok(ok(state.ledger.descendants(id)?))
}

async fn children(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<AccountId>,
) -> ApiResult<impl IntoResponse> {
    Ok(ok(state.ledger.children(id)?))
}

async fn account_path(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<AccountId>,
) -> ApiResult<impl IntoResponse> {
    Ok(ok(state.ledger.account_path(id)?))
}

async fn account_level(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<AccountId>,
) -> ApiResult<impl IntoResponse> {
    let level = state.ledger.account_level(id)?;
    Ok(ok(LevelResponse { id, level }))
}

/// GET `/accounts/{id}/ledger` - Posted lines with running balance.
async fn account_ledger(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<AccountId>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> ApiResult<impl IntoResponse> {
    let lines = state.ledger.account_ledger(id)?;
    let page = page_request(state.ledger.settings(), query.page, query.limit);
    Ok(Json(page.paginate(lines)))
}

/// GET `/accounts/tree` - The whole chart as nested nodes.
async fn account_tree(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    Ok(ok(state.ledger.account_tree()?))
}

async fn root_accounts(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    Ok(ok(state.ledger.root_accounts()?))
}

async fn leaf_accounts(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    Ok(ok(state.ledger.leaf_accounts()?))
}

async fn account_statistics(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    Ok(ok(state.ledger.account_statistics()?))
}

async fn list_templates(State(state): State<AppState>) -> impl IntoResponse {
    ok(state.ledger.list_templates())
}

async fn get_template(
    State(state): State<AppState>,
    ApiPath(name): ApiPath<String>,
) -> ApiResult<impl IntoResponse> {
    Ok(ok(state.ledger.get_template(&name)?))
}

/// POST `/accounts/templates/{name}/apply` - Create a built-in chart, all or nothing.
async fn apply_template(
    State(state): State<AppState>,
    ApiPath(name): ApiPath<String>,
) -> ApiResult<impl IntoResponse> {
    Ok(created(state.ledger.apply_named_template(&name)?))
}

/// POST `/accounts/import` - Import accounts from a CSV body; the summary is
/// returned unwrapped.
async fn import_accounts(State(state): State<AppState>, body: String) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.ledger.import_accounts_csv(&body)?))
}

/// GET `/accounts/export` - The chart as a re-importable CSV file.
async fn export_accounts(State(state): State<AppState>) -> ApiResult<Response> {
    let csv = state.ledger.export_accounts_csv()?;
    Ok(attachment("text/csv; charset=utf-8", "accounts.csv", csv))
}

async fn import_template() -> ApiResult<Response> {
    let csv = account_csv_template()?;
    Ok(attachment("text/csv; charset=utf-8", "accounts_template.csv", csv))
}
