//! Lossy in-place compression of a single turn.

use crate::types::{Part, Turn};
use serde_json::{Map, Value};

/// Prefix marking text that was cut down by compaction.
pub const TRUNCATION_MARKER: &str = "[truncated] ";

/// Shorten `text` to the marker plus its first `limit` characters.
///
/// Returns `None` when the text is not longer than `limit` plus the marker,
/// since compressing it would not save anything.
pub fn compress_text(text: &str, limit: usize) -> Option<String> {
    let marker_len = TRUNCATION_MARKER.chars().count();
    if text.chars().count() <= limit.saturating_add(marker_len) {
        return None;
    }
    let prefix = text.chars().take(limit).collect::<String>();
    Some(format!("{TRUNCATION_MARKER}{prefix}"))
}

/// Compress every string value at the top level of `map`.
fn compress_mapping(map: &mut Map<String, Value>, limit: usize) -> bool {
    let mut changed = false;
    for value in map.values_mut() {
        if let Value::String(text) = value {
            if let Some(short) = compress_text(text, limit) {
                *text = short;
                changed = true;
            }
        }
    }
    changed
}

/// Compress every compressible part of `turn`. Returns whether anything changed.
///
/// Inline data and unknown parts are left alone.
pub fn compress_turn(turn: &mut Turn, limit: usize) -> bool {
    let mut changed = false;
    for part in &mut turn.parts {
        changed |= match part {
            Part::FunctionResponse { function_response } => {
                compress_mapping(&mut function_response.response, limit)
            }
            Part::FunctionCall { function_call } => {
                compress_mapping(&mut function_call.args, limit)
            }
            Part::Text { text } => match compress_text(text, limit) {
                Some(short) => {
                    *text = short;
                    true
                }
                None => false,
            },
            Part::InlineData { .. } | Part::Unknown(_) => false,
        };
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testsupport::object;
    use crate::types::Role;
    use serde_json::json;

    #[test]
    fn short_text_is_left_alone() {
        let limit = 10;
        let exact = "x".repeat(limit + TRUNCATION_MARKER.len());
        assert_eq!(compress_text(&exact, limit), None);
    }

    #[test]
    fn long_text_keeps_marker_and_prefix() {
        let text = "abcdefghijklmnopqrstuvwxyz".repeat(4);
        let short = compress_text(&text, 5).unwrap();
        assert_eq!(short, format!("{TRUNCATION_MARKER}abcde"));
    }

    #[test]
    fn counts_characters_not_bytes() {
        let text = "é".repeat(40);
        let short = compress_text(&text, 3).unwrap();
        assert!(short.ends_with("ééé"));
    }

    #[test]
    fn compresses_only_string_values_of_mappings() {
        let long = "y".repeat(200);
        let mut turn = Turn::new(
            Role::Tool,
            vec![Part::function_response(
                "c",
                "read",
                object(json!({"content": long, "lines": 4000, "nested": {"deep": long}})),
            )],
        );
        assert!(compress_turn(&mut turn, 20));
        let response = &turn.parts[0].as_function_response().unwrap().response;
        assert!(response["content"]
            .as_str()
            .unwrap()
            .starts_with(TRUNCATION_MARKER));
        assert_eq!(response["lines"], 4000);
        assert_eq!(response["nested"]["deep"].as_str().unwrap().len(), 200);
    }

    #[test]
    fn compresses_call_args_and_text_together() {
        let long = "z".repeat(100);
        let mut turn = Turn::new(
            Role::Model,
            vec![
                Part::text(long.clone()),
                Part::function_call("c", "write", object(json!({"body": long}))),
                Part::inline_data("image/png", "A".repeat(500)),
            ],
        );
        assert!(compress_turn(&mut turn, 8));
        assert_eq!(
            turn.parts[0].as_text().unwrap(),
            format!("{TRUNCATION_MARKER}zzzzzzzz")
        );
        let args = &turn.parts[1].as_function_call().unwrap().args;
        assert!(args["body"].as_str().unwrap().starts_with(TRUNCATION_MARKER));
        assert!(matches!(turn.parts[2], Part::InlineData { .. }));
    }

    #[test]
    fn reports_unchanged_turns() {
        let mut turn = Turn::user("short");
        assert!(!compress_turn(&mut turn, 560));
    }
}
