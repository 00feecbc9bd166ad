use bubble_flow::{
    MemoryRegistry,
    config::AnalyzerConfig,
    contract::{FieldSchema, ParamContract},
    registry::BubbleRegistry,
};
use std::io::Write;

#[test]
fn fixture_registry_loads_contracts() {
    let registry = MemoryRegistry::load_from_file("fixtures/registry.json").unwrap();
    assert_eq!(registry.len(), 4);
    let slack = registry.resolve("SlackBubble").unwrap();
    assert_eq!(slack.params.discriminator(), Some("operation"));
    assert_eq!(
        slack.params.operations(),
        ["send_message", "list_channels", "upload_file"]
    );
    match &slack.params {
        ParamContract::DiscriminatedUnion { variants, .. } => {
            let types = &variants["list_channels"].properties["types"];
            assert_eq!(types.describe(), r#"("public_channel" | "private_channel")[]"#);
        }
        other => panic!("unexpected contract {other:?}"),
    }
    assert!(matches!(
        registry.resolve("HttpBubble").unwrap().params,
        ParamContract::Object(_)
    ));
    assert!(!registry.contains("TelegramBubble"));
}

#[test]
fn field_schema_descriptions_read_like_typescript() {
    let one_of = FieldSchema::OneOf {
        variants: vec![FieldSchema::Number, FieldSchema::String { values: None }],
    };
    assert_eq!(one_of.describe(), "number | string");
    let list = FieldSchema::Array {
        items: Box::new(one_of),
    };
    assert_eq!(list.describe(), "(number | string)[]");
}

#[test]
fn broken_registry_file_is_an_error() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{{ not json").unwrap();
    let err = MemoryRegistry::load_from_file(file.path()).unwrap_err();
    assert!(err.to_string().contains("unsupported registry format"));
}

#[test]
fn missing_registry_file_mentions_path() {
    let err = MemoryRegistry::load_from_file("does/not/exist.json").unwrap_err();
    assert!(format!("{err:#}").contains("does/not/exist.json"));
}

#[test]
fn config_file_overrides_selected_fields() {
    let config = AnalyzerConfig::load_from_file("tests/data/config.json").unwrap();
    assert_eq!(config.long_text_threshold, 40);
    assert_eq!(config.lint.max_complexity, 3);
    assert!(!config.lint.is_enabled("no-hardcoded-secret"));
    assert_eq!(config.entry_method, "handle");
    assert_eq!(config.base_class, "BubbleFlow");
}
