//! `/chat/completions` payload -> canonical model turn.

use crate::api::wire::ChatResponse;
use crate::types::{Part, Role, Turn};
use serde::Deserialize;
use serde_json::{Map, Value};

/// Parse one non-streaming payload. Never fails: malformed or empty
/// payloads yield a model turn with a single empty text part.
pub(super) fn parse_chat_response(payload: &Value) -> Turn {
    let response = match ChatResponse::deserialize(payload) {
        Ok(response) => response,
        Err(err) => {
            tracing::warn!(error = %err, "malformed chat completion payload");
            return Turn::model("");
        }
    };
    let Some(choice) = response.choices.into_iter().next() else {
        tracing::warn!(id = %response.id, "chat completion without choices");
        return Turn::model("");
    };

    let text = choice
        .message
        .content
        .as_ref()
        .map(|content| content.text())
        .unwrap_or_default();
    let calls = choice.message.tool_calls.unwrap_or_default();

    let mut parts = Vec::with_capacity(calls.len() + 1);
    if !text.is_empty() || calls.is_empty() {
        parts.push(Part::text(text));
    }
    for call in calls {
        let args = parse_arguments(&call.function.arguments);
        parts.push(Part::function_call(call.id, call.function.name, args));
    }
    Turn::new(Role::Model, parts)
}

/// Decode a tool-call argument string into a JSON object.
///
/// Blank input is an empty object. Anything that is not an object is
/// discarded with a warning.
pub(crate) fn parse_arguments(raw: &str) -> Map<String, Value> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Map::new();
    }
    match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Object(map)) => map,
        Ok(other) => {
            tracing::warn!(kind = json_kind(&other), "tool arguments are not an object");
            Map::new()
        }
        Err(err) => {
            tracing::warn!(error = %err, "invalid tool arguments JSON");
            Map::new()
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
