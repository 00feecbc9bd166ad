use std::collections::HashSet;

use tree_sitter::Node;

use crate::{
    config::AnalyzerConfig,
    ir::{FlowClass, FlowIr, Method},
    model::Diagnostic,
    syntax::{Visit, is_function_like, location, unwrap_expression, walk},
};

pub const FLOW_CLASS_CODE: &str = "flow-class";
pub const ENTRY_METHOD_CODE: &str = "entry-method";
pub const THROW_CODE: &str = "throw-in-entry";
pub const CALL_GRAPH_CODE: &str = "step-call-graph";

pub(super) fn check_flow_class(ir: &FlowIr<'_>, config: &AnalyzerConfig, errors: &mut Vec<Diagnostic>) {
    let base = &config.base_class;
    match ir.flow_classes.as_slice() {
        [] => errors.push(Diagnostic::new(
            FLOW_CLASS_CODE,
            format!("Flow code must contain a class that extends {base}"),
        )),
        [_] => {}
        [_, second, ..] => errors.push(
            Diagnostic::new(
                FLOW_CLASS_CODE,
                format!(
                    "Flow code must contain exactly one class that extends {base}, found {}",
                    ir.flow_classes.len()
                ),
            )
            .at(location(second.node)),
        ),
    }
}

pub(super) fn check_entry_method(
    ir: &FlowIr<'_>,
    class: &FlowClass<'_>,
    config: &AnalyzerConfig,
    errors: &mut Vec<Diagnostic>,
) {
    let entry = &config.entry_method;
    let base = match class.type_arguments {
        Some(args) => format!("{}{}", config.base_class, ir.text(args)),
        None => config.base_class.clone(),
    };
    let class_anchor = class
        .node
        .child_by_field_name("name")
        .unwrap_or(class.node);

    let Some(method) = class.method(entry) else {
        errors.push(
            Diagnostic::new(
                ENTRY_METHOD_CODE,
                format!(
                    "Non-abstract class '{}' does not implement inherited abstract member '{entry}' from class '{base}'",
                    class.name
                ),
            )
            .at(location(class_anchor)),
        );
        return;
    };

    let required = method
        .parameters
        .iter()
        .filter(|p| p.kind() == "required_parameter" || p.kind() == "identifier")
        .count();
    if required > 1 {
        errors.push(
            Diagnostic::new(
                ENTRY_METHOD_CODE,
                format!(
                    "Property '{entry}' in type '{}' is not assignable to the same property in base type '{base}'. '{entry}' must accept a single payload parameter.",
                    class.name
                ),
            )
            .at(location(method.node)),
        );
    }
}

pub(super) fn check_entry_throws(
    ir: &FlowIr<'_>,
    entry: &Method<'_>,
    config: &AnalyzerConfig,
    errors: &mut Vec<Diagnostic>,
) {
    let Some(body) = entry.body else {
        return;
    };
    let mut throws = Vec::new();
    collect_entry_throws(body, true, &mut throws);
    for throw in throws {
        tracing::debug!(line = location(throw).line, snippet = ir.text(throw), "throw in entry method");
        errors.push(
            Diagnostic::new(
                THROW_CODE,
                format!(
                    "throw statements are not allowed directly in {} method. Move error handling into another step.",
                    config.entry_method
                ),
            )
            .at(location(throw)),
        );
    }
}

/// Throw statements written directly in the entry method; nested functions are excluded.
fn collect_entry_throws<'t>(node: Node<'t>, is_root: bool, out: &mut Vec<Node<'t>>) {
    if !is_root && is_function_like(node.kind()) {
        return;
    }
    if node.kind() == "throw_statement" {
        out.push(node);
        return;
    }
    let mut cursor = node.walk();
    let kids: Vec<Node<'t>> = node.children(&mut cursor).collect();
    for child in kids {
        collect_entry_throws(child, false, out);
    }
}

pub(super) fn check_step_calls(
    ir: &FlowIr<'_>,
    class: &FlowClass<'_>,
    config: &AnalyzerConfig,
    errors: &mut Vec<Diagnostic>,
) {
    let entry = config.entry_method.as_str();
    let instance_methods: HashSet<&str> = class
        .methods
        .iter()
        .filter(|m| !m.is_static)
        .map(|m| m.name.as_str())
        .collect();
    let mut reported: HashSet<(String, String)> = HashSet::new();

    for caller in class.methods.iter().filter(|m| m.name != entry && !m.is_static) {
        let Some(body) = caller.body else {
            continue;
        };
        walk(body, &mut |node| {
            // Arrow functions keep `this`; other nested functions rebind it.
            if node != body && is_function_like(node.kind()) && node.kind() != "arrow_function" {
                return Visit::Skip;
            }
            if node.kind() == "call_expression"
                && let Some(callee) = this_call_target(ir, node)
                && instance_methods.contains(callee)
                && reported.insert((caller.name.clone(), callee.to_string()))
            {
                errors.push(
                    Diagnostic::new(
                        CALL_GRAPH_CODE,
                        format!(
                            "'{}' calls '{callee}', but '{callee}' cannot be called from another method. Only '{entry}' may invoke step methods.",
                            caller.name
                        ),
                    )
                    .at(location(node)),
                );
            }
            Visit::Descend
        });
    }
}

/// `this.name(...)` → `name`.
fn this_call_target<'a>(ir: &FlowIr<'a>, call: Node<'_>) -> Option<&'a str> {
    let function = unwrap_expression(call.child_by_field_name("function")?);
    if function.kind() != "member_expression" {
        return None;
    }
    let object = unwrap_expression(function.child_by_field_name("object")?);
    if object.kind() != "this" {
        return None;
    }
    Some(ir.text(function.child_by_field_name("property")?))
}
