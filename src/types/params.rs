//! Checks constructor parameter objects against the registered bubble contracts.

use tree_sitter::Node;

use crate::{
    contract::{FieldSchema, ObjectSchema, ParamContract},
    ir::{FlowIr, Instantiation},
    literal::{ArgValue, ObjectEntry},
    model::{CREDENTIALS_PARAM, Diagnostic},
    registry::{BubbleDefinition, BubbleRegistry},
    syntax::location,
};

pub const UNKNOWN_PROPERTY_CODE: &str = "unknown-property";
pub const MISSING_PROPERTY_CODE: &str = "missing-property";
pub const TYPE_MISMATCH_CODE: &str = "type-mismatch";

pub(crate) fn check_parameters(
    ir: &FlowIr<'_>,
    registry: &dyn BubbleRegistry,
    errors: &mut Vec<Diagnostic>,
) {
    for inst in &ir.instantiations {
        let Some(definition) = registry.resolve(&inst.class_name) else {
            continue;
        };
        let Some(object) = inst.params_object() else {
            continue;
        };
        let value = ArgValue::classify(object, ir.src());
        let mut checker = ParamChecker {
            class_name: &inst.class_name,
            errors: Vec::new(),
        };
        checker.check_instantiation(inst, definition, &value, object);
        errors.extend(checker.errors);
    }
}

struct ParamChecker<'c> {
    class_name: &'c str,
    errors: Vec<Diagnostic>,
}

impl ParamChecker<'_> {
    fn check_instantiation(
        &mut self,
        inst: &Instantiation<'_>,
        definition: &BubbleDefinition,
        value: &ArgValue<'_>,
        object: Node<'_>,
    ) {
        let ArgValue::Object(entries) = value else {
            return;
        };
        let type_name = definition.params_type_name();
        match &definition.params {
            ParamContract::Object(schema) => {
                self.check_object(schema, entries, &type_name, "", None, object);
            }
            ParamContract::DiscriminatedUnion {
                discriminator,
                variants,
            } => match value.property(discriminator) {
                None => {
                    if !has_spread(entries) {
                        self.missing(discriminator, &type_name, object);
                    }
                }
                Some(ObjectEntry::Property {
                    value: ArgValue::String(op),
                    value_node,
                    ..
                }) => match variants.get(op) {
                    Some(variant) => {
                        let variant_name = variant.name.as_deref().unwrap_or(&type_name);
                        self.check_object(
                            variant,
                            entries,
                            variant_name,
                            "",
                            Some(discriminator),
                            object,
                        );
                    }
                    None => {
                        let expected = variants
                            .keys()
                            .map(|k| format!("\"{k}\""))
                            .collect::<Vec<_>>()
                            .join(" | ");
                        self.mismatch(&format!("\"{op}\""), &expected, discriminator, *value_node);
                    }
                },
                Some(ObjectEntry::Property {
                    value: other,
                    value_node,
                    ..
                }) => {
                    // References and computed operations are resolved at run time.
                    if let Some(actual) = other.type_name() {
                        self.mismatch(actual, "string", discriminator, *value_node);
                    }
                }
                Some(_) => {}
            },
        }
        tracing::trace!(class = %inst.class_name, "checked parameters");
    }

    fn check_object(
        &mut self,
        schema: &ObjectSchema,
        entries: &[ObjectEntry<'_>],
        type_name: &str,
        path: &str,
        discriminator: Option<&str>,
        anchor: Node<'_>,
    ) {
        let top_level = path.is_empty();
        for entry in entries {
            let ObjectEntry::Property {
                key,
                key_node,
                value,
                value_node,
            } = entry
            else {
                continue;
            };
            if (top_level && key == CREDENTIALS_PARAM) || discriminator == Some(key.as_str()) {
                continue;
            }
            let field_path = join_path(path, key);
            match schema.properties.get(key) {
                Some(field) => {
                    let nested_name = format!("{type_name}['{key}']");
                    self.check_value(field, value, &field_path, &nested_name, *value_node);
                }
                None if !schema.additional_properties => self.errors.push(
                    Diagnostic::new(
                        UNKNOWN_PROPERTY_CODE,
                        format!(
                            "Object literal may only specify known properties, and '{key}' does not exist in type '{type_name}'."
                        ),
                    )
                    .at(location(*key_node)),
                ),
                None => {}
            }
        }

        if has_spread(entries) {
            return;
        }
        for required in &schema.required {
            if discriminator == Some(required.as_str()) || (top_level && required == CREDENTIALS_PARAM) {
                continue;
            }
            let present = entries
                .iter()
                .any(|e| matches!(e, ObjectEntry::Property { key, .. } if key == required));
            if !present {
                self.missing(&join_path(path, required), type_name, anchor);
            }
        }
    }

    fn check_value(
        &mut self,
        schema: &FieldSchema,
        value: &ArgValue<'_>,
        path: &str,
        type_name: &str,
        at: Node<'_>,
    ) {
        match (schema, value) {
            (_, ArgValue::Reference | ArgValue::Computed | ArgValue::Undefined) => {}
            (FieldSchema::Any, _) => {}
            (FieldSchema::String { values }, ArgValue::String(s)) => {
                if let Some(values) = values
                    && !values.is_empty()
                    && !values.contains(s)
                {
                    self.mismatch(&format!("\"{s}\""), &schema.describe(), path, at);
                }
            }
            (FieldSchema::Number, ArgValue::Number(_)) | (FieldSchema::Boolean, ArgValue::Bool(_)) => {}
            (FieldSchema::Literal { value: expected }, actual) => {
                if actual.to_json().as_ref() != Some(expected) {
                    let actual = match actual {
                        ArgValue::String(s) => format!("\"{s}\""),
                        other => other.type_name().unwrap_or("unknown").to_string(),
                    };
                    self.mismatch(&actual, &schema.describe(), path, at);
                }
            }
            (FieldSchema::Array { items }, ArgValue::Array(elements)) => {
                for (idx, element) in elements.iter().enumerate() {
                    self.check_value(items, element, &format!("{path}[{idx}]"), type_name, at);
                }
            }
            (FieldSchema::Object(object), ArgValue::Object(entries)) => {
                let name = object.name.as_deref().unwrap_or(type_name);
                self.check_object(object, entries, name, path, None, at);
            }
            (FieldSchema::OneOf { variants }, actual) => {
                let accepted = variants.iter().any(|variant| {
                    let mut scratch = ParamChecker {
                        class_name: self.class_name,
                        errors: Vec::new(),
                    };
                    scratch.check_value(variant, actual, path, type_name, at);
                    scratch.errors.is_empty()
                });
                if !accepted {
                    self.mismatch(actual.type_name().unwrap_or("unknown"), &schema.describe(), path, at);
                }
            }
            (expected, actual) => {
                self.mismatch(actual.type_name().unwrap_or("unknown"), &expected.describe(), path, at);
            }
        }
    }

    fn missing(&mut self, property: &str, type_name: &str, at: Node<'_>) {
        self.errors.push(
            Diagnostic::new(
                MISSING_PROPERTY_CODE,
                format!(
                    "Property '{property}' is missing in the parameters of '{}' but required in type '{type_name}'.",
                    self.class_name
                ),
            )
            .at(location(at)),
        );
    }

    fn mismatch(&mut self, actual: &str, expected: &str, path: &str, at: Node<'_>) {
        self.errors.push(
            Diagnostic::new(
                TYPE_MISMATCH_CODE,
                format!(
                    "Type '{actual}' is not assignable to type '{expected}' for parameter '{path}' of '{}'.",
                    self.class_name
                ),
            )
            .at(location(at)),
        );
    }
}

fn has_spread(entries: &[ObjectEntry<'_>]) -> bool {
    entries
        .iter()
        .any(|e| matches!(e, ObjectEntry::Spread(_) | ObjectEntry::Other(_)))
}

fn join_path(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}
