//! Declared parameter contracts for registered bubbles.
//!
//! A contract is either a plain object schema or a tagged union selected by the literal value
//! of a discriminator property (usually `operation`).

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ParamContract {
    Object(ObjectSchema),
    DiscriminatedUnion {
        discriminator: String,
        variants: IndexMap<String, ObjectSchema>,
    },
}

impl Default for ParamContract {
    fn default() -> Self {
        ParamContract::Object(ObjectSchema {
            additional_properties: true,
            ..ObjectSchema::default()
        })
    }
}

impl ParamContract {
    pub fn discriminator(&self) -> Option<&str> {
        match self {
            ParamContract::Object(_) => None,
            ParamContract::DiscriminatedUnion { discriminator, .. } => Some(discriminator),
        }
    }

    pub fn operations(&self) -> Vec<&str> {
        match self {
            ParamContract::Object(_) => Vec::new(),
            ParamContract::DiscriminatedUnion { variants, .. } => {
                variants.keys().map(String::as_str).collect()
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectSchema {
    /// Type name used in diagnostics, e.g. `SlackParams`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub properties: IndexMap<String, FieldSchema>,
    #[serde(default)]
    pub required: Vec<String>,
    #[serde(default)]
    pub additional_properties: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldSchema {
    String {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        values: Option<Vec<String>>,
    },
    Number,
    Boolean,
    Array {
        items: Box<FieldSchema>,
    },
    Object(ObjectSchema),
    Literal {
        value: Value,
    },
    OneOf {
        variants: Vec<FieldSchema>,
    },
    Any,
}

impl FieldSchema {
    /// TypeScript-flavoured rendering used in diagnostics.
    pub fn describe(&self) -> String {
        match self {
            FieldSchema::String { values: Some(values) } if !values.is_empty() => values
                .iter()
                .map(|v| format!("\"{v}\""))
                .collect::<Vec<_>>()
                .join(" | "),
            FieldSchema::String { .. } => "string".to_string(),
            FieldSchema::Number => "number".to_string(),
            FieldSchema::Boolean => "boolean".to_string(),
            FieldSchema::Array { items } => {
                let inner = items.describe();
                if inner.contains(" | ") {
                    format!("({inner})[]")
                } else {
                    format!("{inner}[]")
                }
            }
            FieldSchema::Object(schema) => schema.name.clone().unwrap_or_else(|| "object".into()),
            FieldSchema::Literal { value } => value.to_string(),
            FieldSchema::OneOf { variants } => variants
                .iter()
                .map(FieldSchema::describe)
                .collect::<Vec<_>>()
                .join(" | "),
            FieldSchema::Any => "any".to_string(),
        }
    }
}
