//! HTTP API layer with Axum routes over the ledger.
//!
//! This crate provides:
//! - REST API routes under `/api/v1`
//! - Request extractors (JSON, query, `Idempotency-Key`)
//! - The success envelope and error responses

pub mod error;
pub mod extractors;
pub mod response;
pub mod routes;

use axum::Router;
use std::sync::Arc;
use tally_core::Ledger;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use error::{ApiError, ApiResult};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// The ledger every request operates on.
    pub ledger: Arc<Ledger>,
}

impl AppState {
    /// Wraps a ledger.
    #[must_use]
    pub fn new(ledger: Ledger) -> Self {
        Self {
            ledger: Arc::new(ledger),
        }
    }
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(routes::health::routes())
        .nest("/api/v1", routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
