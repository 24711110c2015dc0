//! HTTP error responses.
//!
//! Every failure leaves the API as `{ "success": false, "error": { kind, code,
//! message, retryable, field? } }` with the status code of its [`ErrorKind`].

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tally_core::LedgerError;
use tally_shared::{ApiErrorBody, AppError, ErrorKind};
use thiserror::Error;
use tracing::{error, warn};

/// Error returned by every handler.
#[derive(Debug, Error)]
pub enum ApiError {
    /// A ledger operation failed.
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    /// Request-level failure outside the ledger (malformed body, bad query).
    #[error(transparent)]
    App(#[from] AppError),
}

impl ApiError {
    /// The response payload.
    #[must_use]
    pub fn body(&self) -> ApiErrorBody {
        match self {
            Self::Ledger(err) => err.to_body(),
            Self::App(err) => err.to_body(),
        }
    }

    /// The error kind.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Ledger(err) => err.kind(),
            Self::App(err) => err.kind(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::App(AppError::Validation(rejection.body_text()))
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::App(AppError::Validation(rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::App(AppError::Validation(rejection.body_text()))
    }
}

/// `{ success: false, error }`
#[derive(Debug, Serialize)]
struct ErrorEnvelope {
    success: bool,
    error: ApiErrorBody,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = self.body();
        let status = StatusCode::from_u16(body.kind.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            error!(code = %body.code, message = %body.message, "Request failed");
        } else {
            warn!(code = %body.code, message = %body.message, "Request rejected");
        }

        (
            status,
            Json(ErrorEnvelope {
                success: false,
                error: body,
            }),
        )
            .into_response()
    }
}

/// Result type for handlers.
pub type ApiResult<T> = Result<T, ApiError>;
