//! End-to-end tests for the HTTP API over an in-memory ledger.

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header::CONTENT_TYPE},
};
use http_body_util::BodyExt;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{Value, json};
use tally_api::{AppState, create_router};
use tally_core::Ledger;
use tower::ServiceExt;

fn app() -> Router {
    create_router(AppState::new(Ledger::default()))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header(CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn create_account(app: &Router, code: &str, name: &str, account_type: &str) -> Value {
    let (status, body) = send(
        app,
        "POST",
        "/api/v1/accounts",
        Some(json!({ "code": code, "name": name, "type": account_type })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["data"].clone()
}

#[tokio::test]
async fn test_health() {
    let app = app();
    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["ledger"], "ok");
}

#[tokio::test]
async fn test_create_and_list_accounts() {
    let app = app();
    create_account(&app, "1000", "Cash", "ASSET").await;
    create_account(&app, "5000", "Expenses", "EXPENSE").await;

    let (status, body) = send(&app, "GET", "/api/v1/accounts?type=expense", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.get("success").is_none(), "{body}");
    assert_eq!(body["pagination"]["total"], 1);
    assert_eq!(body["data"][0]["code"], "5000");
    assert_eq!(body["data"][0]["normal_balance"], "DEBIT");
}

#[tokio::test]
async fn test_error_envelope_statuses() {
    let app = app();
    let assets = create_account(&app, "1000", "Assets", "ASSET").await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/accounts",
        Some(json!({ "code": "1000", "name": "Again", "type": "ASSET" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["kind"], "validation");
    assert_eq!(body["error"]["field"], "code");

    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/accounts",
        Some(json!({ "code": "1100", "name": "Cash", "type": "ASSET", "parent_code": "1000" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = assets["id"].as_str().unwrap();
    let (status, body) = send(&app, "DELETE", &format!("/api/v1/accounts/{id}"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["kind"], "conflict");

    let (status, body) = send(&app, "GET", "/api/v1/accounts/code/9999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["retryable"], false);

    let (status, body) = send(&app, "GET", "/api/v1/accounts/not-a-uuid", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (status, _) = send(&app, "GET", "/api/v1/accounts?type=cash", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unbalanced_entry_is_unprocessable() {
    let app = app();
    let cash = create_account(&app, "1000", "Cash", "ASSET").await;
    let equity = create_account(&app, "3000", "Equity", "EQUITY").await;

    let (status, draft) = send(
        &app,
        "POST",
        "/api/v1/journal-entries",
        Some(json!({
            "date": "2024-03-01",
            "lines": [
                { "account_id": cash["id"], "debit": "100.00" },
                { "account_id": equity["id"], "credit": "90.00" }
            ]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let id = draft["data"]["id"].as_str().unwrap();
    let (status, body) = send(&app, "POST", &format!("/api/v1/journal-entries/{id}/post"), None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "UNBALANCED_ENTRY");
}

#[tokio::test]
async fn test_post_and_pay_bill_with_idempotency_key() {
    let app = app();
    create_account(&app, "1000", "Cash", "ASSET").await;
    create_account(&app, "2100", "Accounts Payable", "LIABILITY").await;
    create_account(&app, "5200", "Rent", "EXPENSE").await;

    let (status, created) = send(
        &app,
        "POST",
        "/api/v1/transactions",
        Some(json!({
            "kind": "BILL",
            "reference": "BILL-001",
            "date": "2024-03-01",
            "due_date": "2024-03-31",
            "category_account": "5200",
            "counter_account": "2100",
            "total_amount": "1000.00"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["data"]["id"].as_str().unwrap().to_string();

    let (status, posted) = send(&app, "POST", &format!("/api/v1/transactions/{id}/post"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(posted["data"]["status"], "POSTED");

    let pay = |key: &'static str| {
        Request::builder()
            .method("POST")
            .uri(format!("/api/v1/transactions/{id}/payments"))
            .header(CONTENT_TYPE, "application/json")
            .header("Idempotency-Key", key)
            .body(Body::from(
                json!({ "amount": "600.00", "date": "2024-03-10", "account": "1000" }).to_string(),
            ))
            .unwrap()
    };

    let first = app.clone().oneshot(pay("pay-1")).await.unwrap();
    assert_eq!(first.status(), StatusCode::CREATED);
    let replay = app.clone().oneshot(pay("pay-1")).await.unwrap();
    assert_eq!(replay.status(), StatusCode::OK);
    let bytes = replay.into_body().collect().await.unwrap().to_bytes();
    let replay: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(replay["data"]["replayed"], true);
    assert_eq!(replay["data"]["transaction"]["status"], "PARTIAL");

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/v1/transactions/{id}/payments"),
        Some(json!({ "amount": "500.00", "date": "2024-03-20" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_AMOUNT");

    let (status, cash) = send(&app, "GET", "/api/v1/accounts/code/1000", None).await;
    assert_eq!(status, StatusCode::OK);
    let balance: Decimal = cash["data"]["current_balance"].as_str().unwrap().parse().unwrap();
    assert_eq!(balance, dec!(-600));
}

#[tokio::test]
async fn test_account_csv_import_reports_row_errors() {
    let app = app();
    let csv = "code,name,type,parent_code\n1000,Assets,ASSET,\n1100,Cash,ASSET,1000\n1100,Cash again,ASSET,1000\n";
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/accounts/import")
                .header(CONTENT_TYPE, "text/csv")
                .body(Body::from(csv))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert!(body.get("success").is_none(), "{body}");
    assert_eq!(body["created"], 2);
    assert_eq!(body["updated"], 0);
    assert!(body["message"].as_str().unwrap().contains("2 created"));
    assert_eq!(body["errors"][0]["row"], 3);

    let export = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/accounts/export")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(export.status(), StatusCode::OK);
    assert!(
        export.headers()[CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/csv")
    );
}

#[tokio::test]
async fn test_list_endpoints_return_page_at_top_level() {
    let app = app();
    create_account(&app, "1000", "Cash", "ASSET").await;
    create_account(&app, "6000", "Expenses", "EXPENSE").await;
    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/transactions",
        Some(json!({
            "kind": "EXPENSE",
            "reference": "EXP-001",
            "date": "2024-03-01",
            "category_account": "6000",
            "counter_account": "1000",
            "total_amount": "25.00"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    for uri in ["/api/v1/transactions", "/api/v1/journal-entries"] {
        let (status, body) = send(&app, "GET", uri, None).await;
        assert_eq!(status, StatusCode::OK, "{uri}");
        assert!(body["data"].is_array(), "{uri}: {body}");
        assert!(body["pagination"].is_object(), "{uri}: {body}");
    }

    let (_, body) = send(&app, "GET", "/api/v1/transactions", None).await;
    assert_eq!(body["pagination"]["total"], 1);
    assert_eq!(body["data"][0]["reference"], "EXP-001");
}
