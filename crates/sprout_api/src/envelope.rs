//! Structured operation results.
//!
//! Nothing past the service boundary panics or propagates: every operation
//! flattens its result into an envelope the UI can render directly.

use serde::Serialize;
use tracing::warn;

use crate::error::ApiResult;

/// The shape every API operation returns.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ApiEnvelope<T> {
    /// Whether the operation succeeded.
    pub success: bool,
    /// Human-readable failure message; empty on success.
    pub message: String,
    /// The payload, present only on success.
    pub data: Option<T>,
}

impl<T> ApiEnvelope<T> {
    /// Flattens an operation result, logging failures.
    pub fn from_result(operation: &'static str, result: ApiResult<T>) -> Self {
        match result {
            Ok(data) => Self { success: true, message: String::new(), data: Some(data) },
            Err(e) => {
                warn!(operation, error = %e, "operation failed");
                Self { success: false, message: e.to_string(), data: None }
            }
        }
    }
}
