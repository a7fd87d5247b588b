//! Rendering tool outcomes as text.

use serde_json::Value;

use super::Action;
use crate::client::ApiResponse;
use crate::error::ToolError;

/// Turns the outcome of one tool invocation into the text returned to the caller.
///
/// - success: `"<label>:\n<pretty json>"`
/// - backend error status: `"Error <doing>: HTTP <status>\n<body>"`
/// - transport failure: `"Failed to reach the sandbox API while <doing>: <cause>"`
/// - anything else: `"Error <doing>: <cause>"`
#[must_use]
pub fn render(action: &Action, outcome: Result<ApiResponse, ToolError>) -> String {
    match outcome {
        Ok(ApiResponse::Success(body)) => format!("{}:\n{}", action.label, pretty(&body)),
        Ok(ApiResponse::Remote { status, body }) => {
            format!("Error {}: HTTP {status}\n{}", action.doing, pretty(&body))
        }
        Err(e @ ToolError::Transport { .. }) => {
            format!("Failed to reach the sandbox API while {}: {e}", action.doing)
        }
        Err(e) => format!("Error {}: {e}", action.doing),
    }
}

/// Pretty-prints JSON. Bare strings are shown without quotes.
fn pretty(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    }
}
