use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

use crate::registry::BubbleKind;

/// Name of the constructor parameter that carries credential handles.
pub const CREDENTIALS_PARAM: &str = "credentials";

/// 1-based line/column position in the analysed source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSpan {
    pub start: Location,
    pub end: Location,
}

/// A single validation finding. The message wording is matched on by downstream consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
}

impl Diagnostic {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Diagnostic {
            code,
            message: message.into(),
            location: None,
        }
    }

    pub fn at(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<Diagnostic>,
}

impl ValidationResult {
    pub fn from_errors(errors: Vec<Diagnostic>) -> Self {
        ValidationResult {
            valid: errors.is_empty(),
            errors,
        }
    }

    pub fn messages(&self) -> Vec<&str> {
        self.errors.iter().map(|d| d.message.as_str()).collect()
    }
}

/// UI control hint derived from a parameter's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterKind {
    Boolean,
    Number,
    /// Short single-line text.
    String,
    /// Multi-line or long text.
    Text,
    Object,
    Array,
    Null,
    Expression,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ParameterValue {
    Literal { value: Value },
    /// A computed or referenced value, kept as its original source text.
    Expression { source: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BubbleParameter {
    pub name: String,
    pub value: ParameterValue,
    pub kind: ParameterKind,
    pub editable: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BubbleParameterRecord {
    pub variable_id: u32,
    pub variable_name: String,
    pub class_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Registry category of the bubble, absent for unregistered classes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bubble_kind: Option<BubbleKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,
    pub location: SourceSpan,
    pub parameters: Vec<BubbleParameter>,
}

impl BubbleParameterRecord {
    pub fn parameter(&self, name: &str) -> Option<&BubbleParameter> {
        self.parameters.iter().find(|p| p.name == name)
    }
}

/// Trigger metadata declared on the flow class.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cron_schedule: Option<String>,
}

pub type BubbleParameters = BTreeMap<u32, BubbleParameterRecord>;
pub type CredentialRequirements = BTreeMap<String, BTreeSet<String>>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractionResult {
    pub valid: bool,
    pub errors: Vec<Diagnostic>,
    pub bubble_parameters: BubbleParameters,
    pub required_credentials: CredentialRequirements,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger: Option<TriggerInfo>,
    pub source_hash: String,
}

impl ExtractionResult {
    pub fn invalid(validation: ValidationResult, source_hash: String) -> Self {
        ExtractionResult {
            valid: false,
            errors: validation.errors,
            bubble_parameters: BTreeMap::new(),
            required_credentials: BTreeMap::new(),
            input_schema: None,
            trigger: None,
            source_hash,
        }
    }
}
