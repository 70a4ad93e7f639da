//! Streamed and whole responses must reconstruct the same model turn.

use parley::api::{parse_sse_stream, ChatCompletionsAdapter, ProtocolAdapter, StreamState};
use parley::api::GenerationConfig;
use parley::types::{History, Part, Role, Turn};
use serde_json::json;

fn data(payload: serde_json::Value) -> String {
    format!("data: {payload}\n\n")
}

fn streamed_body() -> String {
    [
        data(json!({"choices": [{"index": 0, "delta": {"role": "assistant", "content": "Reading "}}]})),
        data(json!({"choices": [{"index": 0, "delta": {"content": "both files."}}]})),
        data(json!({"choices": [{"index": 0, "delta": {"tool_calls": [
            {"index": 0, "id": "call_a", "type": "function",
             "function": {"name": "read_file", "arguments": "{\"path\":"}}
        ]}}]})),
        data(json!({"choices": [{"index": 0, "delta": {"tool_calls": [
            {"index": 1, "id": "call_b", "type": "function",
             "function": {"name": "read_file", "arguments": "{\"path\":\"b.txt\"}"}}
        ]}}]})),
        data(json!({"choices": [{"index": 0, "delta": {"tool_calls": [
            {"index": 0, "function": {"arguments": "\"a.txt\"}"}}
        ]}}]})),
        data(json!({"choices": [{"index": 0, "delta": {}, "finish_reason": "tool_calls"}]})),
        "data: [DONE]\n\n".to_string(),
    ]
    .concat()
}

fn whole_payload() -> serde_json::Value {
    json!({
        "id": "chatcmpl-1",
        "choices": [{
            "index": 0,
            "message": {
                "role": "assistant",
                "content": "Reading both files.",
                "tool_calls": [
                    {"id": "call_a", "type": "function",
                     "function": {"name": "read_file", "arguments": "{\"path\":\"a.txt\"}"}},
                    {"id": "call_b", "type": "function",
                     "function": {"name": "read_file", "arguments": "{\"path\":\"b.txt\"}"}}
                ]
            },
            "finish_reason": "tool_calls"
        }]
    })
}

#[test]
fn streamed_and_whole_responses_agree() {
    let adapter = ChatCompletionsAdapter::new();
    let whole = adapter.parse_response(&whole_payload());
    let streamed = parse_sse_stream(&streamed_body());
    assert_eq!(streamed, whole);
    assert_eq!(whole.role, Role::Model);
    assert_eq!(whole.parts[0], Part::text("Reading both files."));
}

#[test]
fn incremental_session_surfaces_text_before_calls() {
    let adapter = ChatCompletionsAdapter::new();
    let mut stream = adapter.begin_stream();
    let mut surfaced = Vec::new();
    for block in streamed_body().split("\n\n").filter(|b| !b.is_empty()) {
        let payload = block.trim_start_matches("data: ");
        if payload == "[DONE]" {
            break;
        }
        surfaced.push(stream.apply_data(payload));
    }

    assert_eq!(surfaced[0], vec![Part::text("Reading ")]);
    assert!(surfaced[2].is_empty());
    assert_eq!(surfaced[5].len(), 2);
    assert_eq!(stream.state(), StreamState::Finalized);
    assert_eq!(stream.finish().function_calls().count(), 2);
}

#[test]
fn rendered_text_history_echoes_back_as_one_model_turn() {
    let adapter = ChatCompletionsAdapter::new();
    let history = History::from(vec![Turn::user("hi"), Turn::model("hello")]);
    let request = adapter.render_request(&history, &GenerationConfig::default());
    assert_eq!(request.messages.len(), 2);

    let echoed = request.messages[1].text();
    let turn = adapter.parse_response(&json!({"choices": [{"message": {"content": echoed}}]}));
    assert_eq!(turn, Turn::model("hello"));
    assert_eq!(turn, history.turns()[1]);
}
