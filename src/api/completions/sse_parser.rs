//! SSE body parsing for streamed `/chat/completions` output.

use super::response_parser::parse_chat_response;
use super::stream::StreamSession;
use crate::types::Turn;
use serde_json::Value;

/// Reassemble a complete SSE body into one model turn.
///
/// `[DONE]` and comment lines are ignored and undecodable chunks are skipped.
/// A body that is a single JSON object is treated as a non-streaming response.
pub fn parse_sse_stream(body: &str) -> Turn {
    let trimmed = body.trim();

    // Some providers return non-streaming JSON even when stream=true.
    if trimmed.starts_with('{') {
        return match serde_json::from_str::<Value>(trimmed) {
            Ok(payload) => parse_chat_response(&payload),
            Err(err) => {
                tracing::warn!(error = %err, "invalid JSON response body");
                Turn::model("")
            }
        };
    }

    let mut session = StreamSession::new();
    for payload in parse_sse_event_payloads(trimmed) {
        if payload.is_empty() || payload == "[DONE]" {
            continue;
        }
        session.apply_data(&payload);
    }
    session.finish()
}

/// Parse an SSE stream into concatenated `data` payload blocks.
///
/// Events may contain multiple `data:` lines; payload lines are joined with
/// `\n` and finalized when a blank line is encountered.
pub(crate) fn parse_sse_event_payloads(stream: &str) -> Vec<String> {
    let mut payloads = Vec::new();
    let mut data_lines = Vec::<String>::new();

    let mut flush_event = |lines: &mut Vec<String>| {
        if lines.is_empty() {
            return;
        }
        payloads.push(lines.join("\n"));
        lines.clear();
    };

    for raw_line in stream.lines() {
        let line = raw_line.strip_suffix('\r').unwrap_or(raw_line);
        if line.is_empty() {
            flush_event(&mut data_lines);
            continue;
        }
        if line.starts_with(':') {
            continue;
        }

        let (field, value) = if let Some((field, value)) = line.split_once(':') {
            (field, value.strip_prefix(' ').unwrap_or(value))
        } else {
            (line, "")
        };
        if field == "data" {
            data_lines.push(value.to_string());
        }
    }
    flush_event(&mut data_lines);
    payloads
}
