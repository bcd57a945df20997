//! Success checks on a normalized panel answer.

use serde_json::Value;

use crate::error::ApiError;

/// Check a normalized answer for the panel's error and confirmation markers.
///
/// `doc.error` always fails the answer. When the request was a create or
/// update (`sok` was sent), `doc.ok` must also be present. A `null` node
/// counts as absent.
pub fn check_answer(answer: &Value, expects_confirmation: bool) -> Result<(), ApiError> {
    if let Some(error) = doc_node(answer, "error") {
        return Err(ApiError::ApplicationError(describe_error(error)));
    }
    if expects_confirmation && doc_node(answer, "ok").is_none() {
        return Err(ApiError::OperationNotConfirmed);
    }
    Ok(())
}

fn doc_node<'a>(answer: &'a Value, key: &str) -> Option<&'a Value> {
    answer.get("doc")?.get(key).filter(|v| !v.is_null())
}

/// Best human-readable text for an error node.
///
/// Panels put the message under `msg`, either directly or as a text node
/// (`"$"` before normalization, `"0"` after it).
fn describe_error(error: &Value) -> String {
    let node = error
        .get("msg")
        .map(|msg| msg.get("0").unwrap_or(msg))
        .unwrap_or(error);
    match node {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
