//! Credential requirements of a flow and injection of credential handles into extracted
//! parameter records.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::{
    extract::{DEFAULT_OPERATION_FIELD, operation_literal},
    ir::FlowIr,
    model::{
        BubbleParameter, BubbleParameters, CREDENTIALS_PARAM, CredentialRequirements, ParameterKind,
        ParameterValue,
    },
    registry::BubbleRegistry,
};

/// Credential kinds per bubble class, limited to the operations the flow actually uses.
pub fn resolve_requirements(ir: &FlowIr<'_>, registry: &dyn BubbleRegistry) -> CredentialRequirements {
    let mut requirements = CredentialRequirements::new();
    for inst in &ir.instantiations {
        let Some(definition) = registry.resolve(&inst.class_name) else {
            continue;
        };
        let discriminator = definition
            .params
            .discriminator()
            .unwrap_or(DEFAULT_OPERATION_FIELD);
        let operation = operation_literal(ir, inst, discriminator);
        let kinds = definition.credentials.for_operation(operation.as_deref());
        if kinds.is_empty() {
            continue;
        }
        requirements
            .entry(inst.class_name.clone())
            .or_default()
            .extend(kinds.iter().cloned());
    }
    requirements
}

/// Set the `credentials` parameter of every record whose class has requirements to the handles
/// of its required kinds. Records of other classes are returned unchanged.
pub fn inject_credentials(
    records: &BubbleParameters,
    requirements: &CredentialRequirements,
    values: &BTreeMap<String, String>,
) -> BubbleParameters {
    let mut injected = records.clone();
    for record in injected.values_mut() {
        let Some(kinds) = requirements.get(&record.class_name) else {
            continue;
        };
        let handles: Map<String, Value> = kinds
            .iter()
            .filter_map(|kind| {
                values
                    .get(kind)
                    .map(|handle| (kind.clone(), Value::String(handle.clone())))
            })
            .collect();
        let parameter = BubbleParameter {
            name: CREDENTIALS_PARAM.to_string(),
            value: ParameterValue::Literal {
                value: Value::Object(handles),
            },
            kind: ParameterKind::Object,
            editable: false,
        };
        match record
            .parameters
            .iter_mut()
            .find(|p| p.name == CREDENTIALS_PARAM)
        {
            Some(existing) => *existing = parameter,
            None => record.parameters.push(parameter),
        }
    }
    injected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::AnalyzerConfig, extract::extract_parameters, parser::FlowSource,
        registry::MemoryRegistry,
    };
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::collections::BTreeSet;

    const REGISTRY: &str = r#"{
      "bubbles": [{
        "class_name": "SlackBubble",
        "bubble_name": "slack",
        "credentials": {
          "default": ["SLACK_CRED"],
          "operations": { "upload_file": ["SLACK_CRED", "SLACK_FILES_CRED"] }
        }
      }, {
        "class_name": "HttpBubble",
        "bubble_name": "http"
      }]
    }"#;

    const FLOW: &str = r#"
class F extends BubbleFlow {
  async handle(payload: WebhookEvent) {
    const a = new SlackBubble({ operation: 'send_message', channel: 'x', text: 'y' });
    const b = new SlackBubble({ operation: 'upload_file', channel: 'x', credentials: stale });
    const c = new HttpBubble({ url: 'https://example.com' });
  }
}
"#;

    #[test]
    fn requirements_follow_used_operations() {
        let registry = MemoryRegistry::from_json_str(REGISTRY).unwrap();
        let source = FlowSource::parse(FLOW).unwrap();
        let ir = FlowIr::build(&source, &registry, &AnalyzerConfig::default());
        let requirements = resolve_requirements(&ir, &registry);
        assert_eq!(
            requirements,
            BTreeMap::from([(
                "SlackBubble".to_string(),
                BTreeSet::from(["SLACK_CRED".to_string(), "SLACK_FILES_CRED".to_string()])
            )])
        );
    }

    #[test]
    fn injection_reaches_every_instance() {
        let registry = MemoryRegistry::from_json_str(REGISTRY).unwrap();
        let source = FlowSource::parse(FLOW).unwrap();
        let config = AnalyzerConfig::default();
        let ir = FlowIr::build(&source, &registry, &config);
        let records = extract_parameters(&ir, &registry, &config);
        let requirements = resolve_requirements(&ir, &registry);
        let values = BTreeMap::from([
            ("SLACK_CRED".to_string(), "cred-1".to_string()),
            ("SLACK_FILES_CRED".to_string(), "cred-2".to_string()),
            ("OPENAI_CRED".to_string(), "cred-3".to_string()),
        ]);

        let injected = inject_credentials(&records, &requirements, &values);
        let expected = json!({ "SLACK_CRED": "cred-1", "SLACK_FILES_CRED": "cred-2" });
        for id in [1, 2] {
            let param = injected[&id].parameter(CREDENTIALS_PARAM).expect("credentials set");
            assert_eq!(param.value, ParameterValue::Literal { value: expected.clone() });
        }
        assert_eq!(
            injected[&2]
                .parameters
                .iter()
                .filter(|p| p.name == CREDENTIALS_PARAM)
                .count(),
            1
        );
        assert!(injected[&3].parameter(CREDENTIALS_PARAM).is_none());
        assert!(records[&1].parameter(CREDENTIALS_PARAM).is_none());
    }
}
