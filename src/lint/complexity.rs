use tree_sitter::Node;

use crate::{
    lint::{LintContext, LintRule},
    model::Diagnostic,
    syntax::{Visit, location, walk},
};

/// Cyclomatic complexity per flow method: one plus every branch point in its body.
#[derive(Clone, Debug, Default)]
pub struct MaxComplexityRule;

impl LintRule for MaxComplexityRule {
    fn name(&self) -> &'static str {
        "max-complexity"
    }

    fn check(&self, ctx: &LintContext<'_>) -> Vec<Diagnostic> {
        let max = ctx.config.lint.max_complexity;
        let mut errors = Vec::new();
        for class in &ctx.ir.flow_classes {
            for method in &class.methods {
                let Some(body) = method.body else {
                    continue;
                };
                let score = complexity(body, ctx.ir.src());
                if score > max {
                    errors.push(
                        Diagnostic::new(
                            self.name(),
                            format!(
                                "Method '{}' has a cyclomatic complexity of {score}, which exceeds the maximum of {max}. Split it into smaller steps.",
                                method.name
                            ),
                        )
                        .at(location(method.node)),
                    );
                }
            }
        }
        errors
    }
}

fn complexity(body: Node<'_>, src: &str) -> usize {
    let mut score = 1;
    walk(body, &mut |node| {
        score += match node.kind() {
            "if_statement" | "for_statement" | "for_in_statement" | "while_statement"
            | "do_statement" | "switch_case" | "catch_clause" | "ternary_expression" => 1,
            "binary_expression" => node
                .child_by_field_name("operator")
                .map(|op| &src[op.start_byte()..op.end_byte()])
                .filter(|op| matches!(*op, "&&" | "||" | "??"))
                .map_or(0, |_| 1),
            _ => 0,
        };
        Visit::Descend
    });
    score
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::AnalyzerConfig, lint::test_support::run_rule};

    const FLOW: &str = r#"
class F extends BubbleFlow {
  async handle(p: any) {
    if (p.a && p.b) { return 1; }
    for (const x of p.items) { if (x) continue; }
    return p.c ? 2 : 3;
  }
}
"#;

    #[test]
    fn counts_branch_points() {
        let mut config = AnalyzerConfig::default();
        config.lint.max_complexity = 6;
        assert!(run_rule(&MaxComplexityRule, FLOW, &config).is_empty());

        config.lint.max_complexity = 5;
        assert_eq!(
            run_rule(&MaxComplexityRule, FLOW, &config),
            ["Method 'handle' has a cyclomatic complexity of 6, which exceeds the maximum of 5. Split it into smaller steps."]
        );
    }
}
