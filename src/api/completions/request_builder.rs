//! Canonical history -> `/chat/completions` request.

use crate::api::generation::{supports_reasoning_effort, GenerationConfig};
use crate::api::wire::{
    ChatRequest, ContentPart, ImageUrl, JsonSchemaFormat, Message, MessageContent, MessageRole,
    ReasoningConfig, ResponseFormat, ToolCall,
};
use crate::history::{PartRef, ToolPairing};
use crate::types::{Part, Role, Turn};

/// Build the provider payload for `POST /chat/completions`.
pub(super) fn build_chat_request(turns: &[Turn], config: &GenerationConfig) -> ChatRequest {
    let mut messages = Vec::new();
    if let Some(system) = config
        .system_instruction
        .as_deref()
        .map(str::trim)
        .filter(|text| !text.is_empty())
    {
        messages.push(Message::system(system));
    }
    messages.extend(merge_assistant_messages(render_messages(turns)));

    let tools = (!config.tools.is_empty()).then(|| {
        config
            .tools
            .iter()
            .map(|decl| decl.to_tool_definition())
            .collect::<Vec<_>>()
    });
    let tool_choice = tools
        .as_ref()
        .map(|_| config.tool_mode.as_str().to_string());

    let reasoning = config
        .reasoning_effort
        .filter(|_| supports_reasoning_effort(&config.model))
        .map(|effort| ReasoningConfig { effort });

    let response_format = config.wants_json().then(|| match &config.response_schema {
        Some(schema) => ResponseFormat::JsonSchema {
            json_schema: JsonSchemaFormat {
                name: "response".to_string(),
                schema: schema.to_json_schema(),
            },
        },
        None => ResponseFormat::JsonObject,
    });

    ChatRequest {
        model: config.model.clone(),
        messages,
        tools,
        tool_choice,
        temperature: config.temperature,
        top_p: config.top_p,
        reasoning,
        response_format,
        stream: config.stream,
    }
}

/// Turn-by-turn conversion. Calls are emitted next to their responses,
/// never where they were issued.
fn render_messages(turns: &[Turn]) -> Vec<Message> {
    let pairing = ToolPairing::build(turns);
    for call in pairing.unanswered_calls() {
        tracing::debug!(turn = call.turn, part = call.part, "dropping unanswered tool call");
    }
    let mut messages = Vec::new();

    for (turn_idx, turn) in turns.iter().enumerate() {
        if turn.role.is_unknown() {
            tracing::debug!(turn = turn_idx, "skipping turn with unknown role");
            continue;
        }

        if turn.has_function_responses() {
            let mut tool_calls = Vec::new();
            let mut results = Vec::new();
            for (part_idx, part) in turn.parts.iter().enumerate() {
                let Part::FunctionResponse { function_response } = part else {
                    continue;
                };
                let call = pairing
                    .call_for(PartRef {
                        turn: turn_idx,
                        part: part_idx,
                    })
                    .and_then(|at| turns[at.turn].parts[at.part].as_function_call());
                let (name, arguments) = match call {
                    Some(call) => (
                        call.name.clone(),
                        serde_json::to_string(&call.args).unwrap_or_else(|_| "{}".to_string()),
                    ),
                    None => {
                        tracing::debug!(
                            id = %function_response.id,
                            "no matching tool call; declaring with defaults"
                        );
                        (String::new(), "{}".to_string())
                    }
                };
                tool_calls.push(ToolCall::function(
                    function_response.id.clone(),
                    name,
                    arguments,
                ));
                let content = serde_json::to_string(&function_response.response)
                    .unwrap_or_else(|_| "{}".to_string());
                results.push(Message::tool_result(function_response.id.clone(), content));
            }
            messages.push(Message::assistant_tool_calls(tool_calls));
            messages.extend(results);
            let text = turn.text();
            if !text.is_empty() {
                messages.push(Message::user(text));
            }
            continue;
        }

        if let Some(message) = render_plain_turn(turn) {
            messages.push(message);
        }
    }
    messages
}

fn render_plain_turn(turn: &Turn) -> Option<Message> {
    let has_inline = turn
        .parts
        .iter()
        .any(|part| matches!(part, Part::InlineData { .. }));
    if turn.role == Role::User && has_inline {
        let parts = turn
            .parts
            .iter()
            .filter_map(|part| match part {
                Part::Text { text } if !text.is_empty() => {
                    Some(ContentPart::Text { text: text.clone() })
                }
                Part::InlineData { inline_data } => Some(ContentPart::ImageUrl {
                    image_url: ImageUrl {
                        url: format!(
                            "data:{};base64,{}",
                            inline_data.mime_type, inline_data.data
                        ),
                    },
                }),
                _ => None,
            })
            .collect();
        return Some(Message::user_parts(parts));
    }

    let text = turn.text();
    if text.is_empty() {
        return None;
    }
    Some(match turn.role {
        Role::Model => Message::assistant(text),
        _ => Message::user(text),
    })
}

/// Join consecutive assistant messages unless the earlier one already
/// opened a tool-call batch.
fn merge_assistant_messages(messages: Vec<Message>) -> Vec<Message> {
    let mut merged: Vec<Message> = Vec::with_capacity(messages.len());
    for message in messages {
        if message.role == MessageRole::Assistant {
            if let Some(prev) = merged.last_mut() {
                if prev.role == MessageRole::Assistant && !prev.has_tool_calls() {
                    let text = format!("{}{}", prev.text(), message.text());
                    prev.content = (!text.is_empty()).then_some(MessageContent::Text(text));
                    prev.tool_calls = message.tool_calls;
                    prev.extra.extend(message.extra);
                    continue;
                }
            }
        }
        merged.push(message);
    }
    merged
}
