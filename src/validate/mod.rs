//! Structural validation of a flow.
//!
//! Rules run in a fixed order so the diagnostic list is deterministic:
//!
//! 1. exactly one class extends the base flow type,
//! 2. that class implements the entry method,
//! 3. no direct `throw` inside the entry method,
//! 4. step methods are only called from the entry method,
//! 5. no literal credentials,
//! 6. every bubble is registered,
//!
//! followed by parameter/payload type resolution and finally the lint rule set.

mod credentials;
mod registered;
mod structure;

use crate::{
    config::AnalyzerConfig,
    ir::FlowIr,
    lint::{LintContext, LintRule, run_lint_rules},
    model::{Diagnostic, ValidationResult},
    registry::BubbleRegistry,
    types,
};

pub use credentials::LITERAL_CREDENTIALS_CODE;
pub use registered::UNREGISTERED_CODE;
pub use structure::{CALL_GRAPH_CODE, ENTRY_METHOD_CODE, FLOW_CLASS_CODE, THROW_CODE};

pub fn validate_flow(
    ir: &FlowIr<'_>,
    registry: &dyn BubbleRegistry,
    config: &AnalyzerConfig,
    lint_rules: &[Box<dyn LintRule>],
) -> ValidationResult {
    let mut errors: Vec<Diagnostic> = Vec::new();

    structure::check_flow_class(ir, config, &mut errors);
    if let Some(class) = ir.flow_class() {
        structure::check_entry_method(ir, class, config, &mut errors);
        if let Some(entry) = class.method(&config.entry_method) {
            structure::check_entry_throws(ir, entry, config, &mut errors);
        }
        structure::check_step_calls(ir, class, config, &mut errors);
    }
    credentials::check_literal_credentials(ir, &mut errors);
    registered::check_registered(ir, registry, &mut errors);

    types::check_parameters(ir, registry, &mut errors);
    types::check_payload_access(ir, &mut errors);

    let ctx = LintContext { ir, config };
    errors.extend(run_lint_rules(lint_rules, &ctx));

    if !errors.is_empty() {
        tracing::debug!(errors = errors.len(), "flow failed validation");
    }
    ValidationResult::from_errors(errors)
}
