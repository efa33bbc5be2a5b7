//! Shared HTTP utilities for the User Directory workspace.
//!
//! Provides framework-agnostic JSON response bodies so every HTTP front-end
//! renders errors and liveness the same way.

// ============================================================================
// JSON Response Helpers (framework-agnostic)
// ============================================================================

/// Create a structured error JSON with a default message based on the code.
///
/// Returns: `{"error": {"code": "<code>", "message": "<default message>"}}`
pub fn json_err(code: &str) -> serde_json::Value {
    let message = match code {
        "not_found" => "Resource not found",
        "bad_request" => "Bad request",
        "invalid_request" => "Invalid request",
        "conflict" => "Resource already exists",
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
// Liveness
// ============================================================================

/// Static liveness body: `{"status": "OK"}`.
pub fn health_body() -> serde_json::Value {
    serde_json::json!({"status": "OK"})
}
