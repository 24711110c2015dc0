//! Shared types, errors, and configuration for Tally.
//!
//! This crate provides common types used across all other crates:
//! - Typed IDs for type-safe entity references
//! - Amount helpers with minor-unit precision checks
//! - Pagination types for list endpoints
//! - The response envelope consumed by API clients
//! - Application-wide error types
//! - Configuration management

pub mod config;
pub mod error;
pub mod types;

pub use config::{AppConfig, LedgerSettings};
pub use error::{ApiErrorBody, AppError, AppResult, ErrorKind};
