//! Type resolution: bubble parameter contracts and the entry payload type.

mod env;
mod params;
mod payload;
mod schema;

use serde_json::Value;

use crate::{ir::FlowIr, model::Diagnostic, parser::FlowSource, trigger::BUILTIN_TRIGGER_EVENTS};

pub use params::{MISSING_PROPERTY_CODE, TYPE_MISMATCH_CODE, UNKNOWN_PROPERTY_CODE};
pub use payload::PAYLOAD_PROPERTY_CODE;

pub(crate) use params::check_parameters;

fn builtin_prelude() -> Option<FlowSource> {
    match FlowSource::parse(BUILTIN_TRIGGER_EVENTS) {
        Ok(prelude) => Some(prelude),
        Err(err) => {
            tracing::warn!(%err, "built-in trigger payload types failed to parse");
            None
        }
    }
}

/// Check property reads from the entry payload against its declared type.
pub(crate) fn check_payload_access(ir: &FlowIr<'_>, errors: &mut Vec<Diagnostic>) {
    let prelude = builtin_prelude();
    let env = env::TypeEnv::new(ir.source, prelude.as_ref());
    payload::check_payload_access(ir, &env, errors);
}

/// Input form schema of the flow's own payload fields.
pub(crate) fn input_schema(ir: &FlowIr<'_>) -> Option<Value> {
    let prelude = builtin_prelude();
    let env = env::TypeEnv::new(ir.source, prelude.as_ref());
    let payload = payload::resolve_payload(ir, &env)?;
    schema::input_schema(&payload, &env)
}
