//! Small helpers over tree-sitter nodes shared by the analysis passes.

use tree_sitter::Node;

use crate::model::{Location, SourceSpan};

pub(crate) fn children<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.children(&mut cursor).collect()
}

/// Named children, comments excluded.
pub(crate) fn named_children<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|child| child.kind() != "comment")
        .collect()
}

pub(crate) fn first_named_child<'t>(node: Node<'t>) -> Option<Node<'t>> {
    named_children(node).into_iter().next()
}

pub(crate) fn location(node: Node<'_>) -> Location {
    let point = node.start_position();
    Location {
        line: point.row + 1,
        column: point.column + 1,
    }
}

pub(crate) fn span(node: Node<'_>) -> SourceSpan {
    let end = node.end_position();
    SourceSpan {
        start: location(node),
        end: Location {
            line: end.row + 1,
            column: end.column + 1,
        },
    }
}

/// Nodes that open a new function scope.
pub(crate) fn is_function_like(kind: &str) -> bool {
    matches!(
        kind,
        "arrow_function"
            | "function"
            | "function_expression"
            | "function_declaration"
            | "generator_function"
            | "generator_function_declaration"
            | "method_definition"
            | "class"
            | "class_declaration"
    )
}

/// Strip wrappers that do not change the runtime value: parentheses, `as`, `satisfies`, `!`.
pub(crate) fn unwrap_expression(node: Node<'_>) -> Node<'_> {
    let mut current = node;
    while matches!(
        current.kind(),
        "parenthesized_expression" | "as_expression" | "satisfies_expression" | "non_null_expression"
    ) {
        match first_named_child(current) {
            Some(inner) => current = inner,
            None => break,
        }
    }
    current
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Visit {
    Descend,
    Skip,
}

/// Pre-order walk; the callback decides whether to enter each node's children.
pub(crate) fn walk<'t>(node: Node<'t>, f: &mut dyn FnMut(Node<'t>) -> Visit) {
    if f(node) == Visit::Skip {
        return;
    }
    let mut cursor = node.walk();
    let kids: Vec<Node<'t>> = node.children(&mut cursor).collect();
    for child in kids {
        walk(child, f);
    }
}

/// Value of a string literal or substitution-free template string.
pub(crate) fn string_value(node: Node<'_>, src: &str) -> Option<String> {
    let text = &src[node.start_byte()..node.end_byte()];
    match node.kind() {
        "string" if text.len() >= 2 => Some(unescape(&text[1..text.len() - 1])),
        "template_string" if text.len() >= 2 => {
            if children(node)
                .iter()
                .any(|c| c.kind() == "template_substitution")
            {
                None
            } else {
                Some(unescape(&text[1..text.len() - 1]))
            }
        }
        _ => None,
    }
}

/// Property name of an object key or member property node.
pub(crate) fn property_name(node: Node<'_>, src: &str) -> Option<String> {
    match node.kind() {
        "property_identifier"
        | "private_property_identifier"
        | "shorthand_property_identifier"
        | "shorthand_property_identifier_pattern"
        | "identifier"
        | "number" => Some(src[node.start_byte()..node.end_byte()].to_string()),
        "string" => string_value(node, src),
        _ => None,
    }
}

pub(crate) fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        let Some(next) = chars.next() else {
            out.push('\\');
            break;
        };
        match next {
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            'b' => out.push('\u{8}'),
            'f' => out.push('\u{c}'),
            'v' => out.push('\u{b}'),
            '0' => out.push('\0'),
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
            }
            '\n' | '\u{2028}' | '\u{2029}' => {}
            'x' => {
                let hex: String = chars.by_ref().take(2).collect();
                push_code_point(&mut out, &hex, 'x');
            }
            'u' => {
                let hex: String = if chars.peek() == Some(&'{') {
                    chars.next();
                    chars.by_ref().take_while(|c| *c != '}').collect()
                } else {
                    chars.by_ref().take(4).collect()
                };
                push_code_point(&mut out, &hex, 'u');
            }
            other => out.push(other),
        }
    }
    out
}

fn push_code_point(out: &mut String, hex: &str, marker: char) {
    match u32::from_str_radix(hex, 16).ok().and_then(char::from_u32) {
        Some(c) => out.push(c),
        None => {
            out.push('\\');
            out.push(marker);
            out.push_str(hex);
        }
    }
}
