//! Canonical conversation data model.
//!
//! These types are the boundary contract with the agent loop and tool
//! executor. They serialize to the Gemini-style content shape
//! (`{"role": "model", "parts": [{"text": "..."}]}`) used for checkpoints.

use crate::error::CheckpointError;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;

// ---------------------------------------------------------------------------
// Roles
// ---------------------------------------------------------------------------

/// Author of a turn.
///
/// Role strings this crate does not understand (legacy checkpoints) are kept
/// verbatim in [`Role::Unknown`] so a rewrite does not change them on disk.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Role {
    User,
    Model,
    Tool,
    Unknown(String),
}

impl Role {
    /// Wire label; unknown roles report their original string.
    pub fn as_str(&self) -> &str {
        match self {
            Self::User => "user",
            Self::Model => "model",
            Self::Tool => "tool",
            Self::Unknown(raw) => raw,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown(_))
    }
}

impl Default for Role {
    fn default() -> Self {
        Self::Unknown(String::new())
    }
}

impl From<&str> for Role {
    fn from(raw: &str) -> Self {
        match raw {
            "user" => Self::User,
            "model" => Self::Model,
            "tool" => Self::Tool,
            other => Self::Unknown(other.to_string()),
        }
    }
}

impl Serialize for Role {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::from(raw.as_str()))
    }
}

// ---------------------------------------------------------------------------
// Parts
// ---------------------------------------------------------------------------

/// Binary payload carried inline (images, mostly).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    /// Base64-encoded payload.
    pub data: String,
}

/// A model-issued tool invocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FunctionCall {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub args: Map<String, Value>,
}

/// A tool's result, correlated to a [`FunctionCall`] by `id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FunctionResponse {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub response: Map<String, Value>,
}

/// One typed content unit within a turn.
///
/// Objects that match none of the known shapes are kept verbatim in
/// [`Part::Unknown`]; they are never costed, compressed or rendered.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
    FunctionCall {
        #[serde(rename = "functionCall")]
        function_call: FunctionCall,
    },
    FunctionResponse {
        #[serde(rename = "functionResponse")]
        function_response: FunctionResponse,
    },
    Unknown(Value),
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn inline_data(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self::InlineData {
            inline_data: InlineData {
                mime_type: mime_type.into(),
                data: data.into(),
            },
        }
    }

    pub fn function_call(
        id: impl Into<String>,
        name: impl Into<String>,
        args: Map<String, Value>,
    ) -> Self {
        Self::FunctionCall {
            function_call: FunctionCall {
                id: id.into(),
                name: name.into(),
                args,
            },
        }
    }

    pub fn function_response(
        id: impl Into<String>,
        name: impl Into<String>,
        response: Map<String, Value>,
    ) -> Self {
        Self::FunctionResponse {
            function_response: FunctionResponse {
                id: id.into(),
                name: name.into(),
                response,
            },
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            _ => None,
        }
    }

    pub fn as_function_call(&self) -> Option<&FunctionCall> {
        match self {
            Self::FunctionCall { function_call } => Some(function_call),
            _ => None,
        }
    }

    pub fn as_function_response(&self) -> Option<&FunctionResponse> {
        match self {
            Self::FunctionResponse { function_response } => Some(function_response),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Turns
// ---------------------------------------------------------------------------

/// One role-tagged exchange unit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Turn {
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Turn {
    pub fn new(role: Role, parts: Vec<Part>) -> Self {
        Self { role, parts }
    }

    /// Single-text user turn.
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, vec![Part::text(text)])
    }

    /// Single-text model turn.
    pub fn model(text: impl Into<String>) -> Self {
        Self::new(Role::Model, vec![Part::text(text)])
    }

    /// Concatenation of all text parts, in order.
    pub fn text(&self) -> String {
        self.parts.iter().filter_map(Part::as_text).collect()
    }

    pub fn function_calls(&self) -> impl Iterator<Item = &FunctionCall> {
        self.parts.iter().filter_map(Part::as_function_call)
    }

    pub fn function_responses(&self) -> impl Iterator<Item = &FunctionResponse> {
        self.parts.iter().filter_map(Part::as_function_response)
    }

    pub fn has_function_responses(&self) -> bool {
        self.function_responses().next().is_some()
    }
}

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

/// Chronologically ordered conversation; serialized as a bare JSON array.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct History {
    turns: Vec<Turn>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Mutable access for in-place rewrites (compaction, sanitizing).
    pub fn turns_mut(&mut self) -> &mut Vec<Turn> {
        &mut self.turns
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Turn> {
        self.turns.iter()
    }

    pub fn into_turns(self) -> Vec<Turn> {
        self.turns
    }
}

impl From<Vec<Turn>> for History {
    fn from(turns: Vec<Turn>) -> Self {
        Self { turns }
    }
}

impl FromIterator<Turn> for History {
    fn from_iter<I: IntoIterator<Item = Turn>>(iter: I) -> Self {
        Self {
            turns: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a History {
    type Item = &'a Turn;
    type IntoIter = std::slice::Iter<'a, Turn>;

    fn into_iter(self) -> Self::IntoIter {
        self.turns.iter()
    }
}

// ---------------------------------------------------------------------------
// Session tags
// ---------------------------------------------------------------------------

/// Opaque label addressing a checkpoint slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionTag(String);

impl SessionTag {
    /// Validate a caller-provided tag before it touches storage.
    pub fn parse(raw: &str) -> Result<Self, CheckpointError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(CheckpointError::InvalidTag("tag cannot be empty".to_string()));
        }
        if trimmed == "." || trimmed == ".." {
            return Err(CheckpointError::InvalidTag(
                "tag cannot be '.' or '..'".to_string(),
            ));
        }
        if trimmed
            .chars()
            .any(|ch| !(ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' || ch == '.'))
        {
            return Err(CheckpointError::InvalidTag(
                "tag can only contain ASCII letters, numbers, '.', '-', '_'".to_string(),
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Random grouped-hex tag (`xxxx-xxxx-xxxx-xxxx`).
    pub fn generate() -> Self {
        let mut bytes = [0u8; 8];
        OsRng.fill_bytes(&mut bytes);
        let hex = format!("{:016x}", u64::from_be_bytes(bytes));
        Self(format!(
            "{}-{}-{}-{}",
            &hex[0..4],
            &hex[4..8],
            &hex[8..12],
            &hex[12..16]
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
