//! Per-request generation settings stored under `[generation]`.

use super::schema::{FunctionDeclaration, Schema};
use serde::{Deserialize, Serialize};

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const JSON_MIME_TYPE: &str = "application/json";

/// Reasoning budget hint for models that accept one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningEffort {
    Low,
    #[default]
    Medium,
    High,
}

/// How the model may use the declared tools.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolMode {
    #[default]
    Auto,
    #[serde(alias = "any")]
    Required,
    None,
}

impl ToolMode {
    /// Wire value for `tool_choice`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Required => "required",
            Self::None => "none",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub model: String,
    pub temperature: Option<f64>,
    pub top_p: Option<f64>,
    pub reasoning_effort: Option<ReasoningEffort>,
    /// `application/json` requests structured output.
    pub response_mime_type: Option<String>,
    pub response_schema: Option<Schema>,
    pub tool_mode: ToolMode,
    pub system_instruction: Option<String>,
    pub tools: Vec<FunctionDeclaration>,
    pub stream: bool,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: None,
            top_p: None,
            reasoning_effort: None,
            response_mime_type: None,
            response_schema: None,
            tool_mode: ToolMode::Auto,
            system_instruction: None,
            tools: Vec::new(),
            stream: false,
        }
    }
}

impl GenerationConfig {
    pub fn wants_json(&self) -> bool {
        self.response_mime_type
            .as_deref()
            .is_some_and(|mime| mime.trim().eq_ignore_ascii_case(JSON_MIME_TYPE))
    }
}

/// True for model families that accept a `reasoning.effort` field.
pub fn supports_reasoning_effort(model: &str) -> bool {
    let model = model.trim().to_ascii_lowercase();
    // Provider-prefixed ids (`openai/o3-mini`) are matched on the last segment.
    let name = model.rsplit('/').next().unwrap_or(&model);
    ["o1", "o3", "o4", "gpt-5"].iter().any(|family| {
        name == *family
            || name
                .strip_prefix(family)
                .is_some_and(|rest| rest.starts_with('-') || rest.starts_with('.'))
    })
}
