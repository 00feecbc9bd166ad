use tree_sitter::Node;

use crate::{
    lint::{LintContext, LintRule},
    model::Diagnostic,
    syntax::{Visit, location, named_children, unwrap_expression, walk},
};

/// `process.env` may only be read one variable at a time; handing the whole environment to
/// anything else exposes every secret of the host.
#[derive(Clone, Debug, Default)]
pub struct NoProcessEnvBulkRule;

impl LintRule for NoProcessEnvBulkRule {
    fn name(&self) -> &'static str {
        "no-process-env-bulk"
    }

    fn check(&self, ctx: &LintContext<'_>) -> Vec<Diagnostic> {
        let src = ctx.ir.src();
        let mut errors = Vec::new();
        walk(ctx.ir.source.root(), &mut |node| {
            if is_process_env(node, src) && !is_single_read(node) {
                errors.push(
                    Diagnostic::new(
                        self.name(),
                        "process.env cannot be used as a whole value. Read individual variables such as process.env.NAME instead.",
                    )
                    .at(location(node)),
                );
                return Visit::Skip;
            }
            Visit::Descend
        });
        errors
    }
}

fn is_process_env(node: Node<'_>, src: &str) -> bool {
    if node.kind() != "member_expression" {
        return false;
    }
    let (Some(object), Some(property)) = (
        node.child_by_field_name("object"),
        node.child_by_field_name("property"),
    ) else {
        return false;
    };
    let object = unwrap_expression(object);
    object.kind() == "identifier"
        && &src[object.start_byte()..object.end_byte()] == "process"
        && &src[property.start_byte()..property.end_byte()] == "env"
}

/// `process.env.X`, `process.env['X']` and `const { X } = process.env` read named variables.
fn is_single_read(node: Node<'_>) -> bool {
    let mut current = node;
    let mut parent = node.parent();
    while let Some(p) = parent
        && matches!(
            p.kind(),
            "parenthesized_expression" | "as_expression" | "non_null_expression"
        )
    {
        current = p;
        parent = p.parent();
    }
    let Some(parent) = parent else {
        return false;
    };
    match parent.kind() {
        "member_expression" | "subscript_expression" => {
            parent.child_by_field_name("object") == Some(current)
        }
        "variable_declarator" => {
            parent.child_by_field_name("value") == Some(current)
                && parent
                    .child_by_field_name("name")
                    .is_some_and(|pattern| {
                        pattern.kind() == "object_pattern"
                            && named_children(pattern)
                                .iter()
                                .all(|element| element.kind() != "rest_pattern")
                    })
        }
        _ => false,
    }
}
