//! Tool and response schemas.
//!
//! Declarations arrive in the Gemini casing (`"type": "OBJECT"`, `nullable`)
//! used by canonical tool registries and are converted to lowercase JSON
//! Schema for the chat-completions wire.

use super::wire::{FunctionDefinition, ToolDefinition};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

/// Leaf value types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    String,
    Number,
    Integer,
    Boolean,
}

impl ScalarKind {
    fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
        }
    }
}

/// Recursive schema tree.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "RawSchema")]
pub enum Schema {
    Object {
        description: Option<String>,
        properties: BTreeMap<String, Schema>,
        required: Vec<String>,
        nullable: bool,
    },
    Array {
        description: Option<String>,
        items: Box<Schema>,
        nullable: bool,
    },
    Scalar {
        kind: ScalarKind,
        description: Option<String>,
        enum_values: Vec<String>,
        format: Option<String>,
        nullable: bool,
    },
}

impl Schema {
    pub fn string() -> Self {
        Self::Scalar {
            kind: ScalarKind::String,
            description: None,
            enum_values: Vec::new(),
            format: None,
            nullable: false,
        }
    }

    /// Lowercase JSON Schema; nullable nodes get a `[type, "null"]` union.
    pub fn to_json_schema(&self) -> Value {
        let mut out = Map::new();
        let (type_name, description, nullable) = match self {
            Self::Object {
                description,
                properties,
                required,
                nullable,
            } => {
                let props = properties
                    .iter()
                    .map(|(name, schema)| (name.clone(), schema.to_json_schema()))
                    .collect::<Map<_, _>>();
                out.insert("properties".into(), Value::Object(props));
                if !required.is_empty() {
                    out.insert("required".into(), json!(required));
                }
                ("object", description, *nullable)
            }
            Self::Array {
                description,
                items,
                nullable,
            } => {
                out.insert("items".into(), items.to_json_schema());
                ("array", description, *nullable)
            }
            Self::Scalar {
                kind,
                description,
                enum_values,
                format,
                nullable,
            } => {
                if !enum_values.is_empty() {
                    out.insert("enum".into(), json!(enum_values));
                }
                if let Some(format) = format {
                    out.insert("format".into(), Value::String(format.clone()));
                }
                (kind.as_str(), description, *nullable)
            }
        };
        let type_value = if nullable {
            json!([type_name, "null"])
        } else {
            json!(type_name)
        };
        out.insert("type".into(), type_value);
        if let Some(description) = description {
            out.insert("description".into(), Value::String(description.clone()));
        }
        Value::Object(out)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawSchema {
    #[serde(rename = "type")]
    kind: Option<String>,
    description: Option<String>,
    properties: Option<BTreeMap<String, RawSchema>>,
    required: Vec<String>,
    items: Option<Box<RawSchema>>,
    #[serde(rename = "enum")]
    enum_values: Vec<String>,
    format: Option<String>,
    nullable: bool,
}

impl From<RawSchema> for Schema {
    fn from(raw: RawSchema) -> Self {
        let kind = raw.kind.as_deref().map(str::to_ascii_lowercase);
        let kind = match kind.as_deref() {
            Some(kind) => kind.to_string(),
            None if raw.properties.is_some() => "object".to_string(),
            None if raw.items.is_some() => "array".to_string(),
            None => "string".to_string(),
        };
        let scalar = |kind| Self::Scalar {
            kind,
            description: raw.description.clone(),
            enum_values: raw.enum_values.clone(),
            format: raw.format.clone(),
            nullable: raw.nullable,
        };
        match kind.as_str() {
            "object" => Self::Object {
                description: raw.description.clone(),
                properties: raw
                    .properties
                    .unwrap_or_default()
                    .into_iter()
                    .map(|(name, schema)| (name, Schema::from(schema)))
                    .collect(),
                required: raw.required,
                nullable: raw.nullable,
            },
            "array" => Self::Array {
                description: raw.description.clone(),
                items: Box::new(
                    raw.items
                        .map(|items| Schema::from(*items))
                        .unwrap_or_else(Schema::string),
                ),
                nullable: raw.nullable,
            },
            "number" => scalar(ScalarKind::Number),
            "integer" => scalar(ScalarKind::Integer),
            "boolean" => scalar(ScalarKind::Boolean),
            "string" => scalar(ScalarKind::String),
            other => {
                tracing::warn!(schema_type = other, "unknown schema type; treating as string");
                scalar(ScalarKind::String)
            }
        }
    }
}

/// A tool the model may call.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FunctionDeclaration {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parameters: Option<Schema>,
}

impl FunctionDeclaration {
    pub fn to_tool_definition(&self) -> ToolDefinition {
        let parameters = self
            .parameters
            .as_ref()
            .map(Schema::to_json_schema)
            .unwrap_or_else(|| json!({"type": "object", "properties": {}}));
        ToolDefinition {
            tool_type: "function".to_string(),
            function: FunctionDefinition {
                name: self.name.clone(),
                description: self.description.clone(),
                parameters,
            },
        }
    }
}
