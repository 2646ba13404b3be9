//! Shared HTTP utilities for the record catalog workspace.
//!
//! Framework-agnostic: maps domain errors onto status codes and the JSON
//! error envelope used by every endpoint. The HTTP layer wraps the result in
//! its own response type.

use domain::CoreError;

// ============================================================================
// JSON Response Helpers
// ============================================================================

/// Create a structured error JSON with a default message based on the code.
///
/// Returns: `{"error": {"code": "<code>", "message": "<default message>"}}`
pub fn json_err(code: &str) -> serde_json::Value {
    let message = match code {
        "not_found" => "Resource not found",
        "bad_request" => "Bad request",
        "invalid_id" => "Invalid album id",
        "upstream_error" => "Catalog search unavailable",
        "error" | "internal" => "Internal server error",
        _ => code, // Fallback to code as message for unknown codes
    };
    serde_json::json!({"error": {"code": code, "message": message}})
}

/// Create a structured error JSON with a custom message.
///
/// Returns: `{"error": {"code": "<code>", "message": "<message>"}}`
pub fn json_error_with_message(code: &str, message: &str) -> serde_json::Value {
    serde_json::json!({"error": {"code": code, "message": message}})
}

// ============================================================================
// Domain error mapping
// ============================================================================

/// HTTP status for a domain error.
pub fn error_status(err: &CoreError) -> u16 {
    match err {
        CoreError::InvalidArgument(_) | CoreError::InvalidIdentifier(_) => 400,
        CoreError::NotFound => 404,
        CoreError::StorageUnavailable(_) => 500,
        CoreError::Upstream { .. } => 502,
    }
}

/// Stable machine-readable code for a domain error.
pub fn error_code(err: &CoreError) -> &'static str {
    match err {
        CoreError::InvalidArgument(_) => "bad_request",
        CoreError::InvalidIdentifier(_) => "invalid_id",
        CoreError::NotFound => "not_found",
        CoreError::StorageUnavailable(_) => "internal",
        CoreError::Upstream { .. } => "upstream_error",
    }
}

/// Status code and JSON body for a domain error.
///
/// Storage failures get the generic message; their cause belongs in the logs,
/// not in the response.
pub fn error_response(err: &CoreError) -> (u16, serde_json::Value) {
    let code = error_code(err);
    let body = match err {
        CoreError::StorageUnavailable(_) => json_err(code),
        other => json_error_with_message(code, &other.to_string()),
    };
    (error_status(err), body)
}
