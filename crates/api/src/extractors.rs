//! Request extractors.
//!
//! `ApiJson`, `ApiPath` and `ApiQuery` wrap axum's extractors so malformed bodies, ids
//! and query strings answer with the standard error envelope.

use axum::{
    extract::{FromRequest, FromRequestParts},
    http::request::Parts,
};
use tally_shared::AppError;

use crate::error::ApiError;

/// Header carrying a client-chosen deduplication key for payments.
pub const IDEMPOTENCY_KEY: &str = "Idempotency-Key";

/// JSON body extractor.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Path parameter extractor.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

/// Query string extractor.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

/// The `Idempotency-Key` header, when present and non-blank.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdempotencyKey(pub Option<String>);

impl<S> FromRequestParts<S> for IdempotencyKey
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(value) = parts.headers.get(IDEMPOTENCY_KEY) else {
            return Ok(Self(None));
        };
        let key = value.to_str().map_err(|_| {
            AppError::Validation(format!("{IDEMPOTENCY_KEY} header must be visible ASCII"))
        })?;
        let key = key.trim();
        Ok(Self((!key.is_empty()).then(|| key.to_string())))
    }
}
