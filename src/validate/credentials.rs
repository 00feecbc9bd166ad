use crate::{
    ir::FlowIr,
    literal::{ArgValue, ObjectEntry},
    model::{CREDENTIALS_PARAM, Diagnostic},
    syntax::location,
};

pub const LITERAL_CREDENTIALS_CODE: &str = "literal-credentials";

/// Credentials are injected at execution time; a literal in source is always a leak.
pub(super) fn check_literal_credentials(ir: &FlowIr<'_>, errors: &mut Vec<Diagnostic>) {
    for inst in &ir.instantiations {
        let Some(params) = inst.params_object() else {
            continue;
        };
        let params = ArgValue::classify(params, ir.src());
        let Some(ObjectEntry::Property {
            value, value_node, ..
        }) = params.property(CREDENTIALS_PARAM)
        else {
            continue;
        };
        if is_hardcoded(value) {
            errors.push(
                Diagnostic::new(
                    LITERAL_CREDENTIALS_CODE,
                    format!(
                        "'{}' receives a literal credentials value. Hardcoded credentials are not allowed; they are injected at execution time.",
                        inst.class_name
                    ),
                )
                .at(location(*value_node)),
            );
        }
    }
}

fn is_hardcoded(value: &ArgValue<'_>) -> bool {
    match value {
        ArgValue::Reference
        | ArgValue::Computed
        | ArgValue::Null
        | ArgValue::Undefined => false,
        ArgValue::Object(entries) => !entries.is_empty(),
        ArgValue::Array(items) => !items.is_empty(),
        ArgValue::String(s) => !s.is_empty(),
        ArgValue::Number(_) | ArgValue::Bool(_) => true,
    }
}
