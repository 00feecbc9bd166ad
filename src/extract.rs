//! Parameter extraction: one record per bubble instantiation, keyed by a variable id assigned
//! in source order.

use serde_json::Value;
use tree_sitter::Node;

use crate::{
    config::AnalyzerConfig,
    ir::{FlowIr, Instantiation},
    literal::{ArgValue, ObjectEntry},
    model::{
        BubbleParameter, BubbleParameterRecord, BubbleParameters, ParameterKind, ParameterValue,
    },
    registry::BubbleRegistry,
    syntax::span,
};

/// Discriminator used when the bubble is unregistered or its contract is a plain object.
pub const DEFAULT_OPERATION_FIELD: &str = "operation";

/// Name recorded for a first argument that is not an object literal.
pub const WHOLE_PARAMS_NAME: &str = "params";

pub fn extract_parameters(
    ir: &FlowIr<'_>,
    registry: &dyn BubbleRegistry,
    config: &AnalyzerConfig,
) -> BubbleParameters {
    let mut records = BubbleParameters::new();
    for (variable_id, inst) in (1u32..).zip(&ir.instantiations) {
        let definition = registry.resolve(&inst.class_name);
        let discriminator = definition
            .and_then(|d| d.params.discriminator())
            .unwrap_or(DEFAULT_OPERATION_FIELD);
        let variable_name = inst
            .binding
            .clone()
            .unwrap_or_else(|| format!("_anonymous_{}_{variable_id}", inst.class_name));

        let record = BubbleParameterRecord {
            variable_id,
            variable_name,
            class_name: inst.class_name.clone(),
            display_name: definition.and_then(|d| d.display_name.clone()),
            bubble_kind: definition.map(|d| d.kind),
            operation: operation_literal(ir, inst, discriminator),
            location: span(inst.node),
            parameters: parameters(ir, inst, config),
        };
        tracing::trace!(
            variable_id,
            class = %record.class_name,
            parameters = record.parameters.len(),
            "extracted bubble parameters"
        );
        records.insert(variable_id, record);
    }
    records
}

/// Literal value of the discriminator property, when the instantiation spells one out.
pub(crate) fn operation_literal(
    ir: &FlowIr<'_>,
    inst: &Instantiation<'_>,
    discriminator: &str,
) -> Option<String> {
    let params = ArgValue::classify(inst.params_object()?, ir.src());
    match params.property(discriminator) {
        Some(ObjectEntry::Property {
            value: ArgValue::String(op),
            ..
        }) => Some(op.clone()),
        _ => None,
    }
}

fn parameters(ir: &FlowIr<'_>, inst: &Instantiation<'_>, config: &AnalyzerConfig) -> Vec<BubbleParameter> {
    let Some(first) = inst.arguments.first().copied() else {
        return Vec::new();
    };
    match ArgValue::classify(first, ir.src()) {
        ArgValue::Object(entries) => entries
            .iter()
            .map(|entry| match entry {
                ObjectEntry::Property {
                    key,
                    value,
                    value_node,
                    ..
                } => parameter(ir, key.clone(), value, *value_node, config),
                ObjectEntry::Spread(node) | ObjectEntry::Other(node) => {
                    expression(ir, ir.text(*node).to_string(), *node, ParameterKind::Expression)
                }
            })
            .collect(),
        value => vec![parameter(ir, WHOLE_PARAMS_NAME.to_string(), &value, first, config)],
    }
}

fn parameter(
    ir: &FlowIr<'_>,
    name: String,
    value: &ArgValue<'_>,
    node: Node<'_>,
    config: &AnalyzerConfig,
) -> BubbleParameter {
    match value.to_json() {
        Some(json) => BubbleParameter {
            name,
            kind: literal_kind(&json, config.long_text_threshold),
            value: ParameterValue::Literal { value: json },
            editable: true,
        },
        None => {
            let kind = match value {
                ArgValue::Object(_) => ParameterKind::Object,
                ArgValue::Array(_) => ParameterKind::Array,
                _ => ParameterKind::Expression,
            };
            expression(ir, name, node, kind)
        }
    }
}

fn expression(ir: &FlowIr<'_>, name: String, node: Node<'_>, kind: ParameterKind) -> BubbleParameter {
    BubbleParameter {
        name,
        value: ParameterValue::Expression {
            source: ir.text(node).to_string(),
        },
        kind,
        editable: false,
    }
}

fn literal_kind(value: &Value, long_text_threshold: usize) -> ParameterKind {
    match value {
        Value::Bool(_) => ParameterKind::Boolean,
        Value::Number(_) => ParameterKind::Number,
        Value::String(s) if s.contains('\n') || s.chars().count() > long_text_threshold => {
            ParameterKind::Text
        }
        Value::String(_) => ParameterKind::String,
        Value::Array(_) => ParameterKind::Array,
        Value::Object(_) => ParameterKind::Object,
        Value::Null => ParameterKind::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{parser::FlowSource, registry::MemoryRegistry};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const FLOW: &str = r#"
class F extends BubbleFlow<'webhook/http'> {
  async handle(payload: WebhookEvent) {
    const first = new SlackBubble({ operation: 'send_message', channel: 'general', text: `line one
line two` });
    await new SlackBubble({ operation: 'send_message', channel: payload.path, ...defaults }).action();
    this.http = new HttpBubble(settings);
  }
}
"#;

    fn records() -> BubbleParameters {
        let source = FlowSource::parse(FLOW).unwrap();
        let ir = FlowIr::build(&source, &MemoryRegistry::new(), &AnalyzerConfig::default());
        extract_parameters(&ir, &MemoryRegistry::new(), &AnalyzerConfig::default())
    }

    #[test]
    fn ids_follow_source_order() {
        let records = records();
        let names: Vec<_> = records
            .values()
            .map(|r| (r.variable_id, r.variable_name.as_str()))
            .collect();
        assert_eq!(
            names,
            [(1, "first"), (2, "_anonymous_SlackBubble_2"), (3, "this.http")]
        );
    }

    #[test]
    fn literals_are_editable_and_expressions_are_not() {
        let records = records();
        let first = &records[&1];
        assert_eq!(first.operation.as_deref(), Some("send_message"));
        let text = first.parameter("text").unwrap();
        assert_eq!(text.kind, ParameterKind::Text);
        assert!(text.editable);

        let second = &records[&2];
        let channel = second.parameter("channel").unwrap();
        assert_eq!(
            channel.value,
            ParameterValue::Expression {
                source: "payload.path".to_string()
            }
        );
        assert!(!channel.editable);
        assert!(second.parameter("...defaults").is_some());

        let http = &records[&3];
        assert_eq!(http.parameters.len(), 1);
        assert_eq!(http.parameters[0].name, WHOLE_PARAMS_NAME);
        assert_eq!(http.parameters[0].kind, ParameterKind::Expression);
    }

    #[test]
    fn short_strings_and_numbers_get_simple_kinds() {
        assert_eq!(literal_kind(&json!("hi"), 120), ParameterKind::String);
        assert_eq!(literal_kind(&json!("x".repeat(121)), 120), ParameterKind::Text);
        assert_eq!(literal_kind(&json!(3), 120), ParameterKind::Number);
        assert_eq!(literal_kind(&json!({ "a": 1 }), 120), ParameterKind::Object);
    }
}
