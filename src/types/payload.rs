//! Resolution of the entry method's payload type and checks on property reads from it.

use tree_sitter::Node;

use crate::{
    ir::FlowIr,
    model::Diagnostic,
    syntax::{
        Visit, first_named_child, is_function_like, location, named_children, property_name,
        string_value, unwrap_expression, walk,
    },
    types::env::{Shape, TypeEnv},
};

pub const PAYLOAD_PROPERTY_CODE: &str = "payload-property";

/// The declared type of the entry method's first parameter.
pub(crate) struct PayloadType<'a> {
    /// Type annotation text, as shown in diagnostics.
    pub name: &'a str,
    pub pattern: Node<'a>,
    pub shape: Shape<'a>,
    /// Whether the flow declares any part of the type itself (rather than using a built-in
    /// trigger payload as is).
    pub declared_in_flow: bool,
}

pub(crate) fn resolve_payload<'a>(ir: &FlowIr<'a>, env: &TypeEnv<'a>) -> Option<PayloadType<'a>> {
    let entry = ir.entry_method()?;
    let param = *entry.parameters.first()?;
    let pattern = param.child_by_field_name("pattern")?;
    let ty = param
        .child_by_field_name("type")
        .and_then(first_named_child)?;
    let shape = env.resolve(ty, ir.src(), false);

    let mut references_flow_type = false;
    walk(ty, &mut |node| {
        if node.kind() == "type_identifier" && env.is_flow_declared(ir.text(node)) {
            references_flow_type = true;
        }
        Visit::Descend
    });
    let declared_in_flow = references_flow_type || shape.fields.values().any(|f| !f.builtin);

    Some(PayloadType {
        name: ir.text(ty),
        pattern,
        shape,
        declared_in_flow,
    })
}

pub(crate) fn check_payload_access<'a>(
    ir: &FlowIr<'a>,
    env: &TypeEnv<'a>,
    errors: &mut Vec<Diagnostic>,
) {
    let Some(payload) = resolve_payload(ir, env) else {
        return;
    };
    if payload.shape.open {
        return;
    }
    let Some(body) = ir.entry_method().and_then(|m| m.body) else {
        return;
    };
    let src = ir.src();
    let mut report = |property: String, at: Node<'_>| {
        if !payload.shape.has(&property) {
            errors.push(
                Diagnostic::new(
                    PAYLOAD_PROPERTY_CODE,
                    format!(
                        "Property '{property}' does not exist on type '{}'.",
                        payload.name
                    ),
                )
                .at(location(at)),
            );
        }
    };

    if payload.pattern.kind() == "object_pattern" {
        for (property, at) in pattern_keys(payload.pattern, src) {
            report(property, at);
        }
        return;
    }
    if payload.pattern.kind() != "identifier" {
        return;
    }
    let name = ir.text(payload.pattern);

    walk(body, &mut |node| {
        if node != body && shadows(node, name, src) {
            return Visit::Skip;
        }
        match node.kind() {
            "member_expression" => {
                if is_name(node.child_by_field_name("object"), name, src)
                    && let Some(property) = node.child_by_field_name("property")
                    && property.kind() == "property_identifier"
                {
                    report(src[property.start_byte()..property.end_byte()].to_string(), property);
                }
            }
            "subscript_expression" => {
                if is_name(node.child_by_field_name("object"), name, src)
                    && let Some(index) = node.child_by_field_name("index")
                    && let Some(property) = string_value(unwrap_expression(index), src)
                {
                    report(property, index);
                }
            }
            "variable_declarator" => {
                if is_name(node.child_by_field_name("value"), name, src)
                    && let Some(target) = node.child_by_field_name("name")
                    && target.kind() == "object_pattern"
                {
                    for (property, at) in pattern_keys(target, src) {
                        report(property, at);
                    }
                }
            }
            _ => {}
        }
        Visit::Descend
    });
}

fn is_name(node: Option<Node<'_>>, name: &str, src: &str) -> bool {
    node.map(unwrap_expression)
        .is_some_and(|n| n.kind() == "identifier" && &src[n.start_byte()..n.end_byte()] == name)
}

/// Whether `node` opens a scope that declares its own binding of the payload name.
fn shadows(node: Node<'_>, name: &str, src: &str) -> bool {
    match node.kind() {
        kind if is_function_like(kind) => rebinds(node, name, src),
        "statement_block" | "switch_body" => named_children(node)
            .into_iter()
            .any(|stmt| declares(stmt, name, src)),
        "catch_clause" => binds_name(node.child_by_field_name("parameter"), name, src),
        "for_in_statement" => binds_name(node.child_by_field_name("left"), name, src),
        "for_statement" => node
            .child_by_field_name("initializer")
            .is_some_and(|init| declares(init, name, src)),
        _ => false,
    }
}

/// A declaration statement that introduces `name` in the enclosing block.
fn declares(stmt: Node<'_>, name: &str, src: &str) -> bool {
    match stmt.kind() {
        "lexical_declaration" | "variable_declaration" => named_children(stmt)
            .into_iter()
            .filter(|child| child.kind() == "variable_declarator")
            .any(|declarator| binds_name(declarator.child_by_field_name("name"), name, src)),
        "function_declaration" | "class_declaration" => {
            binds_name(stmt.child_by_field_name("name"), name, src)
        }
        _ => false,
    }
}

fn binds_name(node: Option<Node<'_>>, name: &str, src: &str) -> bool {
    node.is_some_and(|n| {
        matches!(n.kind(), "identifier" | "type_identifier")
            && &src[n.start_byte()..n.end_byte()] == name
    })
}

/// A nested function whose own parameter shadows the payload name.
fn rebinds(func: Node<'_>, name: &str, src: &str) -> bool {
    let params = match func.child_by_field_name("parameters") {
        Some(list) => named_children(list),
        None => func.child_by_field_name("parameter").into_iter().collect(),
    };
    params.into_iter().any(|param| {
        let pattern = param.child_by_field_name("pattern").unwrap_or(param);
        pattern.kind() == "identifier" && &src[pattern.start_byte()..pattern.end_byte()] == name
    })
}

/// Top-level keys read by an object destructuring pattern; rest elements read nothing specific.
fn pattern_keys<'t>(pattern: Node<'t>, src: &str) -> Vec<(String, Node<'t>)> {
    let mut keys = Vec::new();
    for element in named_children(pattern) {
        let key_node = match element.kind() {
            "shorthand_property_identifier_pattern" => Some(element),
            "pair_pattern" => element.child_by_field_name("key"),
            "object_assignment_pattern" => element.child_by_field_name("left"),
            _ => None,
        };
        if let Some(key_node) = key_node
            && let Some(key) = property_name(key_node, src)
        {
            keys.push((key, key_node));
        }
    }
    keys
}
