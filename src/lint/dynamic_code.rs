use crate::{
    lint::{LintContext, LintRule},
    model::Diagnostic,
    syntax::{Visit, location, unwrap_expression, walk},
};

#[derive(Clone, Debug, Default)]
pub struct NoDynamicCodeRule;

impl LintRule for NoDynamicCodeRule {
    fn name(&self) -> &'static str {
        "no-dynamic-code"
    }

    fn check(&self, ctx: &LintContext<'_>) -> Vec<Diagnostic> {
        let mut errors = Vec::new();
        walk(ctx.ir.source.root(), &mut |node| {
            let callee = match node.kind() {
                "call_expression" => node.child_by_field_name("function"),
                "new_expression" => node.child_by_field_name("constructor"),
                _ => None,
            };
            if let Some(callee) = callee.map(unwrap_expression)
                && callee.kind() == "identifier"
            {
                let name = ctx.ir.text(callee);
                let forbidden = match node.kind() {
                    "call_expression" => matches!(name, "eval" | "Function"),
                    _ => name == "Function",
                };
                if forbidden {
                    errors.push(
                        Diagnostic::new(
                            self.name(),
                            format!("Dynamic code evaluation via '{name}' is not allowed in flows."),
                        )
                        .at(location(node)),
                    );
                }
            }
            Visit::Descend
        });
        errors
    }
}
