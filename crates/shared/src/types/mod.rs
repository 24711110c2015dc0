//! Common types used across the application.

pub mod amount;
pub mod envelope;
pub mod id;
pub mod pagination;

pub use amount::{DEFAULT_AMOUNT_SCALE, checked_sum, exceeds_scale, normalize};
pub use envelope::{ApiResponse, Envelope};
pub use id::*;
pub use pagination::{PageMeta, PageRequest, PageResponse};
