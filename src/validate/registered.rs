use crate::{ir::FlowIr, model::Diagnostic, registry::BubbleRegistry, syntax::location};

pub const UNREGISTERED_CODE: &str = "unregistered-bubble";

pub(super) fn check_registered(
    ir: &FlowIr<'_>,
    registry: &dyn BubbleRegistry,
    errors: &mut Vec<Diagnostic>,
) {
    for inst in ir
        .instantiations
        .iter()
        .filter(|inst| !registry.contains(&inst.class_name))
    {
        errors.push(
            Diagnostic::new(
                UNREGISTERED_CODE,
                format!(
                    "Bubble '{}' is not registered. Only bubbles from the registry can be used in a flow.",
                    inst.class_name
                ),
            )
            .at(location(inst.node)),
        );
    }
}
