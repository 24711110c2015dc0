//! Success response helpers.

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tally_shared::LedgerSettings;
use tally_shared::types::{Envelope, PageRequest};

/// `200 { success: true, data }`
pub fn ok<T: Serialize>(data: T) -> Json<Envelope<T>> {
    Json(Envelope::ok(data))
}

/// `201 { success: true, data }`
pub fn created<T: Serialize>(data: T) -> (StatusCode, Json<Envelope<T>>) {
    (StatusCode::CREATED, Json(Envelope::ok(data)))
}

/// A downloadable text file.
pub fn attachment(content_type: &'static str, filename: &str, body: String) -> Response {
    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{filename}\""))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));
    (
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(content_type)),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response()
}

/// Builds a page request from optional query parameters.
#[must_use]
pub fn page_request(settings: &LedgerSettings, page: Option<u32>, limit: Option<u32>) -> PageRequest {
    PageRequest::new(
        page.unwrap_or(1),
        limit.unwrap_or(settings.default_page_size),
        settings.max_page_size,
    )
}
