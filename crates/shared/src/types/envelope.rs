//! Response envelope for single-entity API responses.
//!
//! The server always wraps single entities as `{ "success": true, "data": ... }`.
//! Older endpoints and proxies may deliver the bare entity instead, so clients
//! decode through [`ApiResponse`] and call [`ApiResponse::into_inner`].

use serde::{Deserialize, Serialize};

/// The `{ success, data }` wrapper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    /// Whether the request succeeded.
    pub success: bool,
    /// The payload.
    pub data: T,
}

impl<T> Envelope<T> {
    /// Wraps a successful payload.
    #[must_use]
    pub const fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Either shape a single-entity response may arrive in.
///
/// Only used at the deserialization boundary; everything past it works with `T`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ApiResponse<T> {
    /// `{ "success": true, "data": T }`
    Enveloped(Envelope<T>),
    /// `T` as-is.
    Bare(T),
}

impl<T> ApiResponse<T> {
    /// Unwraps the payload regardless of shape.
    #[must_use]
    pub fn into_inner(self) -> T {
        match self {
            Self::Enveloped(envelope) => envelope.data,
            Self::Bare(data) => data,
        }
    }
}
