//! Classification of constructor argument expressions into literal values and references.

use serde_json::{Map, Number, Value};
use tree_sitter::Node;

use crate::syntax::{named_children, property_name, string_value, unwrap_expression};

#[derive(Debug, Clone)]
pub(crate) enum ArgValue<'a> {
    String(String),
    Number(Number),
    Bool(bool),
    Null,
    Undefined,
    Object(Vec<ObjectEntry<'a>>),
    Array(Vec<ArgValue<'a>>),
    /// Identifier, member or subscript access: a value computed elsewhere.
    Reference,
    /// Any other expression (calls, templates with substitutions, arithmetic, ...).
    Computed,
}

#[derive(Debug, Clone)]
pub(crate) enum ObjectEntry<'a> {
    Property {
        key: String,
        key_node: Node<'a>,
        value: ArgValue<'a>,
        value_node: Node<'a>,
    },
    Spread(Node<'a>),
    /// Computed keys and method shorthands.
    Other(Node<'a>),
}

impl<'a> ArgValue<'a> {
    pub(crate) fn classify(node: Node<'a>, src: &str) -> Self {
        let node = unwrap_expression(node);
        match node.kind() {
            "string" | "template_string" => match string_value(node, src) {
                Some(s) => ArgValue::String(s),
                None => ArgValue::Computed,
            },
            "number" => parse_number(&src[node.start_byte()..node.end_byte()])
                .map(ArgValue::Number)
                .unwrap_or(ArgValue::Computed),
            "true" => ArgValue::Bool(true),
            "false" => ArgValue::Bool(false),
            "null" => ArgValue::Null,
            "undefined" => ArgValue::Undefined,
            "unary_expression" => negative_number(node, src).unwrap_or(ArgValue::Computed),
            "object" => ArgValue::Object(object_entries(node, src)),
            "array" => {
                let elements = named_children(node);
                if elements.iter().any(|e| e.kind() == "spread_element") {
                    return ArgValue::Computed;
                }
                ArgValue::Array(
                    elements
                        .into_iter()
                        .map(|e| ArgValue::classify(e, src))
                        .collect(),
                )
            }
            "identifier" | "member_expression" | "subscript_expression" | "this" => {
                ArgValue::Reference
            }
            _ => ArgValue::Computed,
        }
    }

    /// JSON form when the value is fully literal.
    pub(crate) fn to_json(&self) -> Option<Value> {
        match self {
            ArgValue::String(s) => Some(Value::String(s.clone())),
            ArgValue::Number(n) => Some(Value::Number(n.clone())),
            ArgValue::Bool(b) => Some(Value::Bool(*b)),
            ArgValue::Null => Some(Value::Null),
            ArgValue::Object(entries) => {
                let mut map = Map::new();
                for entry in entries {
                    match entry {
                        ObjectEntry::Property { key, value, .. } => {
                            map.insert(key.clone(), value.to_json()?);
                        }
                        ObjectEntry::Spread(_) | ObjectEntry::Other(_) => return None,
                    }
                }
                Some(Value::Object(map))
            }
            ArgValue::Array(items) => items
                .iter()
                .map(ArgValue::to_json)
                .collect::<Option<Vec<_>>>()
                .map(Value::Array),
            ArgValue::Undefined | ArgValue::Reference | ArgValue::Computed => None,
        }
    }

    /// TypeScript name of a literal's type, `None` for non-literals.
    pub(crate) fn type_name(&self) -> Option<&'static str> {
        match self {
            ArgValue::String(_) => Some("string"),
            ArgValue::Number(_) => Some("number"),
            ArgValue::Bool(_) => Some("boolean"),
            ArgValue::Null => Some("null"),
            ArgValue::Undefined => Some("undefined"),
            ArgValue::Object(_) => Some("object"),
            ArgValue::Array(_) => Some("array"),
            ArgValue::Reference | ArgValue::Computed => None,
        }
    }

    /// Look up a property of an object literal.
    pub(crate) fn property(&self, name: &str) -> Option<&ObjectEntry<'a>> {
        match self {
            ArgValue::Object(entries) => entries
                .iter()
                .find(|e| matches!(e, ObjectEntry::Property { key, .. } if key == name)),
            _ => None,
        }
    }
}

fn object_entries<'a>(node: Node<'a>, src: &str) -> Vec<ObjectEntry<'a>> {
    let mut entries = Vec::new();
    for child in named_children(node) {
        match child.kind() {
            "pair" => {
                let (Some(key_node), Some(value_node)) = (
                    child.child_by_field_name("key"),
                    child.child_by_field_name("value"),
                ) else {
                    entries.push(ObjectEntry::Other(child));
                    continue;
                };
                match property_name(key_node, src) {
                    Some(key) => entries.push(ObjectEntry::Property {
                        key,
                        key_node,
                        value: ArgValue::classify(value_node, src),
                        value_node,
                    }),
                    None => entries.push(ObjectEntry::Other(child)),
                }
            }
            "shorthand_property_identifier" => entries.push(ObjectEntry::Property {
                key: src[child.start_byte()..child.end_byte()].to_string(),
                key_node: child,
                value: ArgValue::Reference,
                value_node: child,
            }),
            "spread_element" => entries.push(ObjectEntry::Spread(child)),
            _ => entries.push(ObjectEntry::Other(child)),
        }
    }
    entries
}

fn negative_number<'a>(node: Node<'a>, src: &str) -> Option<ArgValue<'a>> {
    let operator = node.child_by_field_name("operator")?;
    let argument = unwrap_expression(node.child_by_field_name("argument")?);
    if &src[operator.start_byte()..operator.end_byte()] != "-" || argument.kind() != "number" {
        return None;
    }
    let text = format!("-{}", &src[argument.start_byte()..argument.end_byte()]);
    parse_number(&text).map(ArgValue::Number)
}

fn parse_number(raw: &str) -> Option<Number> {
    if raw.ends_with('n') {
        return None;
    }
    let cleaned = raw.replace('_', "");
    let (negative, digits) = match cleaned.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, cleaned.as_str()),
    };
    let radix = match digits.get(..2).map(str::to_ascii_lowercase).as_deref() {
        Some("0x") => Some(16),
        Some("0o") => Some(8),
        Some("0b") => Some(2),
        _ => None,
    };
    if let Some(radix) = radix {
        let value = i64::from_str_radix(&digits[2..], radix).ok()?;
        return Some(Number::from(if negative { -value } else { value }));
    }
    if !digits.contains(['.', 'e', 'E'])
        && let Ok(value) = cleaned.parse::<i64>()
    {
        return Some(Number::from(value));
    }
    cleaned.parse::<f64>().ok().and_then(Number::from_f64)
}
