//! Pluggable lint pass that runs after structural and type validation.
//!
//! Rules are independent of each other; each one inspects the flow and returns zero or more
//! diagnostics. Hosts can add their own rules through [`crate::FlowAnalyzer::with_lint_rule`].

mod complexity;
mod cron;
mod dynamic_code;
mod env_access;
mod secrets;

use crate::{config::AnalyzerConfig, ir::FlowIr, model::Diagnostic};

pub use complexity::MaxComplexityRule;
pub use cron::CronScheduleRule;
pub use dynamic_code::NoDynamicCodeRule;
pub use env_access::NoProcessEnvBulkRule;
pub use secrets::NoHardcodedSecretRule;

/// What a rule gets to look at.
pub struct LintContext<'a> {
    pub ir: &'a FlowIr<'a>,
    pub config: &'a AnalyzerConfig,
}

pub trait LintRule: Send + Sync {
    /// Stable rule name; also used as the diagnostic code and in `lint.disabled`.
    fn name(&self) -> &'static str;

    fn check(&self, ctx: &LintContext<'_>) -> Vec<Diagnostic>;
}

/// The rules every analyzer starts with.
pub fn builtin_rules() -> Vec<Box<dyn LintRule>> {
    vec![
        Box::new(NoProcessEnvBulkRule),
        Box::new(MaxComplexityRule),
        Box::new(NoDynamicCodeRule),
        Box::new(NoHardcodedSecretRule),
        Box::new(CronScheduleRule),
    ]
}

/// Run every enabled rule in order and concatenate their findings.
pub fn run_lint_rules(rules: &[Box<dyn LintRule>], ctx: &LintContext<'_>) -> Vec<Diagnostic> {
    let mut errors = Vec::new();
    for rule in rules {
        if !ctx.config.lint.is_enabled(rule.name()) {
            tracing::trace!(rule = rule.name(), "lint rule disabled");
            continue;
        }
        let found = rule.check(ctx);
        if !found.is_empty() {
            tracing::debug!(rule = rule.name(), count = found.len(), "lint findings");
        }
        errors.extend(found);
    }
    errors
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::{parser::FlowSource, registry::MemoryRegistry};

    pub(crate) fn run_rule(rule: &dyn LintRule, flow: &str, config: &AnalyzerConfig) -> Vec<String> {
        let source = FlowSource::parse(flow).expect("test flow parses");
        let ir = FlowIr::build(&source, &MemoryRegistry::new(), config);
        let ctx = LintContext { ir: &ir, config };
        rule.check(&ctx).into_iter().map(|d| d.message).collect()
    }
}
