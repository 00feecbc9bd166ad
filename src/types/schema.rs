//! JSON-Schema rendering of the flow's declared payload fields, used to build run forms.

use serde_json::{Map, Value, json};
use tree_sitter::Node;

use crate::{
    syntax::{first_named_child, named_children, string_value},
    types::{
        env::{FieldShape, Shape, TypeEnv},
        payload::PayloadType,
    },
};

const MAX_DEPTH: usize = 8;

/// Schema of the fields the flow itself declares on its payload; `None` when the payload is a
/// built-in trigger type used as is.
pub(crate) fn input_schema(payload: &PayloadType<'_>, env: &TypeEnv<'_>) -> Option<Value> {
    if !payload.declared_in_flow {
        return None;
    }
    let own = payload
        .shape
        .fields
        .iter()
        .filter(|(_, field)| !field.builtin);
    Some(object_schema(own, env, 0))
}

fn object_schema<'f, 'a: 'f>(
    fields: impl Iterator<Item = (&'f String, &'f FieldShape<'a>)>,
    env: &TypeEnv<'_>,
    depth: usize,
) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();
    for (name, field) in fields {
        let mut schema = match field.ty {
            Some(ty) => type_schema(ty, field.src, env, depth),
            None => json!({}),
        };
        if let (Some(doc), Value::Object(map)) = (&field.doc, &mut schema) {
            map.insert("description".into(), Value::String(doc.clone()));
        }
        properties.insert(name.clone(), schema);
        if !field.optional {
            required.push(Value::String(name.clone()));
        }
    }
    let mut schema = Map::new();
    schema.insert("type".into(), json!("object"));
    schema.insert("properties".into(), Value::Object(properties));
    if !required.is_empty() {
        schema.insert("required".into(), Value::Array(required));
    }
    Value::Object(schema)
}

fn shape_schema(shape: &Shape<'_>, env: &TypeEnv<'_>, depth: usize) -> Value {
    if shape.open && shape.fields.is_empty() {
        return json!({ "type": "object" });
    }
    object_schema(shape.fields.iter(), env, depth)
}

fn type_schema(ty: Node<'_>, src: &str, env: &TypeEnv<'_>, depth: usize) -> Value {
    if depth > MAX_DEPTH {
        return json!({});
    }
    let text = &src[ty.start_byte()..ty.end_byte()];
    match ty.kind() {
        "type_annotation" | "parenthesized_type" | "readonly_type" => first_named_child(ty)
            .map(|inner| type_schema(inner, src, env, depth))
            .unwrap_or_else(|| json!({})),
        "predefined_type" => match text {
            "string" => json!({ "type": "string" }),
            "number" => json!({ "type": "number" }),
            "boolean" => json!({ "type": "boolean" }),
            "null" => json!({ "type": "null" }),
            "object" => json!({ "type": "object" }),
            _ => json!({}),
        },
        "literal_type" => literal_schema(ty, src),
        "array_type" => {
            let items = first_named_child(ty)
                .map(|item| type_schema(item, src, env, depth + 1))
                .unwrap_or_else(|| json!({}));
            json!({ "type": "array", "items": items })
        }
        "union_type" => union_schema(ty, src, env, depth),
        "object_type" => {
            let shape = members_shape(ty, src, env);
            shape_schema(&shape, env, depth + 1)
        }
        "type_identifier" => match text {
            "Date" => json!({ "type": "string", "format": "date-time" }),
            name if env.is_known(name) => shape_schema(&env.resolve_named(name), env, depth + 1),
            _ => json!({}),
        },
        "generic_type" => generic_schema(ty, src, env, depth),
        _ => json!({}),
    }
}

fn members_shape<'a>(ty: Node<'a>, src: &'a str, env: &TypeEnv<'a>) -> Shape<'a> {
    env.resolve(ty, src, false)
}

fn literal_schema(ty: Node<'_>, src: &str) -> Value {
    let Some(literal) = first_named_child(ty) else {
        return json!({});
    };
    let text = &src[literal.start_byte()..literal.end_byte()];
    let value = match literal.kind() {
        "string" => string_value(literal, src).map(Value::String),
        "number" | "unary_expression" => serde_json::from_str::<Value>(text).ok(),
        "true" => Some(Value::Bool(true)),
        "false" => Some(Value::Bool(false)),
        "null" => Some(Value::Null),
        _ => None,
    };
    match value {
        Some(value) => json!({ "const": value }),
        None => json!({}),
    }
}

fn union_schema(ty: Node<'_>, src: &str, env: &TypeEnv<'_>, depth: usize) -> Value {
    let members: Vec<Node<'_>> = flatten_union(ty);
    let strings: Option<Vec<Value>> = members
        .iter()
        .map(|member| {
            (member.kind() == "literal_type")
                .then(|| first_named_child(*member))
                .flatten()
                .filter(|lit| lit.kind() == "string")
                .and_then(|lit| string_value(lit, src))
                .map(Value::String)
        })
        .collect();
    if let Some(values) = strings {
        return json!({ "type": "string", "enum": values });
    }
    let variants: Vec<Value> = members
        .into_iter()
        .map(|member| type_schema(member, src, env, depth + 1))
        .collect();
    json!({ "anyOf": variants })
}

/// `A | B | C` nests as `(A | B) | C` in the grammar.
fn flatten_union(ty: Node<'_>) -> Vec<Node<'_>> {
    let mut out = Vec::new();
    for member in named_children(ty) {
        if member.kind() == "union_type" {
            out.extend(flatten_union(member));
        } else {
            out.push(member);
        }
    }
    out
}

fn generic_schema(ty: Node<'_>, src: &str, env: &TypeEnv<'_>, depth: usize) -> Value {
    let name = ty
        .child_by_field_name("name")
        .map(|n| &src[n.start_byte()..n.end_byte()])
        .unwrap_or_default();
    let args = ty
        .child_by_field_name("type_arguments")
        .map(named_children)
        .unwrap_or_default();
    match (name, args.as_slice()) {
        ("Array" | "ReadonlyArray", [item]) => {
            json!({ "type": "array", "items": type_schema(*item, src, env, depth + 1) })
        }
        ("Record", [_, value]) => json!({
            "type": "object",
            "additionalProperties": type_schema(*value, src, env, depth + 1)
        }),
        ("Partial" | "Required" | "Readonly", [_]) => {
            shape_schema(&env.resolve(ty, src, false), env, depth + 1)
        }
        (name, _) if env.is_known(name) => shape_schema(&env.resolve_named(name), env, depth + 1),
        _ => json!({}),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::AnalyzerConfig, ir::FlowIr, parser::FlowSource, registry::MemoryRegistry,
        types::payload::resolve_payload,
    };
    use pretty_assertions::assert_eq;

    fn schema_for(flow: &str) -> Option<Value> {
        let source = FlowSource::parse(flow).unwrap();
        let prelude = FlowSource::parse(crate::trigger::BUILTIN_TRIGGER_EVENTS).unwrap();
        let ir = FlowIr::build(&source, &MemoryRegistry::new(), &AnalyzerConfig::default());
        let env = TypeEnv::new(&source, Some(&prelude));
        let payload = resolve_payload(&ir, &env)?;
        input_schema(&payload, &env)
    }

    #[test]
    fn renders_declared_fields_only() {
        let schema = schema_for(
            r#"
interface Payload extends WebhookEvent {
  /** Who to greet */
  name: string;
  tone?: 'formal' | 'casual';
  tags: string[];
  limits: { max: number };
}
class F extends BubbleFlow<'webhook/http'> {
  async handle(payload: Payload) {}
}
"#,
        )
        .expect("schema");
        assert_eq!(
            schema,
            json!({
                "type": "object",
                "properties": {
                    "name": { "type": "string", "description": "Who to greet" },
                    "tone": { "type": "string", "enum": ["formal", "casual"] },
                    "tags": { "type": "array", "items": { "type": "string" } },
                    "limits": {
                        "type": "object",
                        "properties": { "max": { "type": "number" } },
                        "required": ["max"]
                    }
                },
                "required": ["name", "tags", "limits"]
            })
        );
    }

    #[test]
    fn builtin_payload_has_no_input_schema() {
        let schema = schema_for(
            "class F extends BubbleFlow<'webhook/http'> {\n  async handle(payload: WebhookEvent) {}\n}\n",
        );
        assert_eq!(schema, None);
    }
}
