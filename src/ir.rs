//! Flow-level view over the syntax tree: flow classes, their members, imports and bubble
//! instantiations, collected once and shared by every analysis pass.

use std::collections::{HashMap, HashSet};

use tree_sitter::Node;

use crate::{
    config::AnalyzerConfig,
    parser::FlowSource,
    registry::BubbleRegistry,
    syntax::{Visit, children, named_children, string_value, unwrap_expression, walk},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    pub local: String,
    pub imported: String,
    pub module: String,
}

#[derive(Debug, Clone)]
pub struct Method<'a> {
    pub name: String,
    pub node: Node<'a>,
    pub parameters: Vec<Node<'a>>,
    pub body: Option<Node<'a>>,
    pub is_static: bool,
}

#[derive(Debug, Clone)]
pub struct ClassField<'a> {
    pub name: String,
    pub node: Node<'a>,
    pub value: Option<Node<'a>>,
}

/// A class whose heritage clause names the base flow type.
#[derive(Debug, Clone)]
pub struct FlowClass<'a> {
    pub name: String,
    pub node: Node<'a>,
    /// `<...>` passed to the base class, e.g. `BubbleFlow<'webhook/http'>`.
    pub type_arguments: Option<Node<'a>>,
    pub methods: Vec<Method<'a>>,
    pub fields: Vec<ClassField<'a>>,
}

impl<'a> FlowClass<'a> {
    pub fn method(&self, name: &str) -> Option<&Method<'a>> {
        self.methods.iter().find(|m| m.name == name && !m.is_static)
    }

    pub fn field(&self, name: &str) -> Option<&ClassField<'a>> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// One `new X(...)` expression that constructs a bubble.
#[derive(Debug, Clone)]
pub struct Instantiation<'a> {
    pub node: Node<'a>,
    /// Class name after resolving import aliases.
    pub class_name: String,
    pub arguments: Vec<Node<'a>>,
    pub binding: Option<String>,
}

impl<'a> Instantiation<'a> {
    /// The first argument when it is an object literal.
    pub fn params_object(&self) -> Option<Node<'a>> {
        self.arguments
            .first()
            .map(|arg| unwrap_expression(*arg))
            .filter(|arg| arg.kind() == "object")
    }
}

#[derive(Debug)]
pub struct FlowIr<'a> {
    pub source: &'a FlowSource,
    pub imports: Vec<Import>,
    pub flow_classes: Vec<FlowClass<'a>>,
    /// Bubble instantiations in source order; the index is the basis of variable ids.
    pub instantiations: Vec<Instantiation<'a>>,
    pub entry_method_name: String,
}

impl<'a> FlowIr<'a> {
    pub fn build(
        source: &'a FlowSource,
        registry: &dyn BubbleRegistry,
        config: &AnalyzerConfig,
    ) -> Self {
        let src = source.text();
        let root = source.root();
        let imports = collect_imports(root, src);

        let mut base_names: HashSet<String> = HashSet::from([config.base_class.clone()]);
        base_names.extend(
            imports
                .iter()
                .filter(|i| i.imported == config.base_class)
                .map(|i| i.local.clone()),
        );
        let import_map: HashMap<&str, &Import> =
            imports.iter().map(|i| (i.local.as_str(), i)).collect();

        let mut flow_classes = Vec::new();
        let mut instantiations = Vec::new();
        walk(root, &mut |node| {
            match node.kind() {
                "class_declaration" | "class" => {
                    if let Some(class) = flow_class(node, src, &base_names) {
                        flow_classes.push(class);
                    }
                }
                "new_expression" => {
                    if let Some(inst) = instantiation(node, src, &import_map, registry, config) {
                        instantiations.push(inst);
                    }
                }
                _ => {}
            }
            Visit::Descend
        });

        tracing::debug!(
            flow_classes = flow_classes.len(),
            instantiations = instantiations.len(),
            "built flow ir"
        );

        FlowIr {
            source,
            imports,
            flow_classes,
            instantiations,
            entry_method_name: config.entry_method.clone(),
        }
    }

    pub fn text(&self, node: Node<'_>) -> &'a str {
        &self.source.text()[node.start_byte()..node.end_byte()]
    }

    pub fn src(&self) -> &'a str {
        self.source.text()
    }

    /// The flow class, present only when exactly one class extends the base type.
    pub fn flow_class(&self) -> Option<&FlowClass<'a>> {
        match self.flow_classes.as_slice() {
            [class] => Some(class),
            _ => None,
        }
    }

    pub fn entry_method(&self) -> Option<&Method<'a>> {
        self.flow_class()?.method(&self.entry_method_name)
    }
}

fn collect_imports(root: Node<'_>, src: &str) -> Vec<Import> {
    let mut imports = Vec::new();
    for stmt in named_children(root) {
        if stmt.kind() != "import_statement" {
            continue;
        }
        let Some(module) = stmt
            .child_by_field_name("source")
            .and_then(|s| string_value(s, src))
        else {
            continue;
        };
        walk(stmt, &mut |node| {
            if node.kind() == "import_specifier" {
                let name = node.child_by_field_name("name").map(|n| text(n, src));
                let alias = node.child_by_field_name("alias").map(|n| text(n, src));
                if let Some(name) = name {
                    imports.push(Import {
                        local: alias.unwrap_or(name).to_string(),
                        imported: name.to_string(),
                        module: module.clone(),
                    });
                }
                return Visit::Skip;
            }
            Visit::Descend
        });
    }
    imports
}

fn flow_class<'a>(node: Node<'a>, src: &str, base_names: &HashSet<String>) -> Option<FlowClass<'a>> {
    let heritage = named_children(node)
        .into_iter()
        .find(|c| c.kind() == "class_heritage")?;
    let clause = named_children(heritage)
        .into_iter()
        .find(|c| c.kind() == "extends_clause")?;
    let base = clause
        .child_by_field_name("value")
        .or_else(|| named_children(clause).into_iter().next())?;
    let base_name = match base.kind() {
        "member_expression" => base.child_by_field_name("property").map(|p| text(p, src))?,
        _ => text(base, src),
    };
    if !base_names.contains(base_name) {
        return None;
    }
    let type_arguments = clause.child_by_field_name("type_arguments").or_else(|| {
        named_children(clause)
            .into_iter()
            .find(|c| c.kind() == "type_arguments")
    });

    let name = node
        .child_by_field_name("name")
        .map(|n| text(n, src).to_string())
        .unwrap_or_else(|| "(anonymous)".to_string());

    let mut methods = Vec::new();
    let mut fields = Vec::new();
    if let Some(body) = node.child_by_field_name("body") {
        for member in named_children(body) {
            let Some(member_name) = member.child_by_field_name("name").map(|n| member_key(n, src))
            else {
                continue;
            };
            let is_static = children(member).iter().any(|c| c.kind() == "static");
            match member.kind() {
                "method_definition" => methods.push(Method {
                    name: member_name,
                    node: member,
                    parameters: formal_parameters(member),
                    body: member.child_by_field_name("body"),
                    is_static,
                }),
                "public_field_definition" => {
                    let value = member.child_by_field_name("value");
                    if let Some(func) = value.map(unwrap_expression).filter(|v| {
                        matches!(v.kind(), "arrow_function" | "function_expression" | "function")
                    }) {
                        methods.push(Method {
                            name: member_name.clone(),
                            node: member,
                            parameters: formal_parameters(func),
                            body: func.child_by_field_name("body"),
                            is_static,
                        });
                    }
                    fields.push(ClassField {
                        name: member_name,
                        node: member,
                        value,
                    });
                }
                _ => {}
            }
        }
    }

    Some(FlowClass {
        name,
        node,
        type_arguments,
        methods,
        fields,
    })
}

fn member_key(node: Node<'_>, src: &str) -> String {
    match node.kind() {
        "string" => string_value(node, src).unwrap_or_default(),
        _ => text(node, src).to_string(),
    }
}

fn formal_parameters(func: Node<'_>) -> Vec<Node<'_>> {
    if let Some(params) = func.child_by_field_name("parameters") {
        return named_children(params);
    }
    // `x => ...` has a bare identifier instead of a parameter list.
    func.child_by_field_name("parameter")
        .map(|p| vec![p])
        .unwrap_or_default()
}

fn instantiation<'a>(
    node: Node<'a>,
    src: &str,
    imports: &HashMap<&str, &Import>,
    registry: &dyn BubbleRegistry,
    config: &AnalyzerConfig,
) -> Option<Instantiation<'a>> {
    let constructor = unwrap_expression(node.child_by_field_name("constructor")?);
    let (local, imported) = match constructor.kind() {
        "identifier" => {
            let local = text(constructor, src);
            (local, imports.get(local).copied())
        }
        "member_expression" => (
            text(constructor.child_by_field_name("property")?, src),
            None,
        ),
        _ => return None,
    };
    let class_name = imported.map(|i| i.imported.as_str()).unwrap_or(local);
    let from_core = imported.is_some_and(|i| config.core_modules.contains(&i.module));
    if !(registry.contains(class_name) || from_core || config.is_primitive_name(class_name)) {
        return None;
    }
    let arguments = node
        .child_by_field_name("arguments")
        .map(named_children)
        .unwrap_or_default();
    Some(Instantiation {
        node,
        class_name: class_name.to_string(),
        arguments,
        binding: binding_name(node, src),
    })
}

fn binding_name(node: Node<'_>, src: &str) -> Option<String> {
    let mut current = node;
    let mut parent = node.parent()?;
    while matches!(
        parent.kind(),
        "parenthesized_expression" | "as_expression" | "satisfies_expression" | "non_null_expression"
    ) {
        current = parent;
        parent = parent.parent()?;
    }
    let target = match parent.kind() {
        "variable_declarator" | "public_field_definition" => {
            if parent.child_by_field_name("value") != Some(current) {
                return None;
            }
            parent.child_by_field_name("name")?
        }
        "assignment_expression" => {
            if parent.child_by_field_name("right") != Some(current) {
                return None;
            }
            parent.child_by_field_name("left")?
        }
        _ => return None,
    };
    match target.kind() {
        "identifier" | "property_identifier" | "member_expression" => {
            Some(text(target, src).to_string())
        }
        _ => None,
    }
}

fn text<'s>(node: Node<'_>, src: &'s str) -> &'s str {
    &src[node.start_byte()..node.end_byte()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::MemoryRegistry;

    const FLOW: &str = r#"
import { BubbleFlow, SlackBubble as Slack } from '@bubblelab/bubble-core';

export class Demo extends BubbleFlow<'webhook/http'> {
  readonly cronSchedule = '0 9 * * *';

  async handle(payload: WebhookEvent) {
    const slack = new Slack({ operation: 'send_message', channel: 'general' });
    await new HttpBubble({ url: 'https://example.com' }).action();
    const when = new Date();
    return this.format(when);
  }

  private format(d: Date) {
    return d.toISOString();
  }
}
"#;

    #[test]
    fn collects_flow_class_members_and_instantiations() {
        let source = FlowSource::parse(FLOW).unwrap();
        let ir = FlowIr::build(&source, &MemoryRegistry::new(), &AnalyzerConfig::default());

        let class = ir.flow_class().expect("one flow class");
        assert_eq!(class.name, "Demo");
        assert!(class.type_arguments.is_some());
        assert!(class.field("cronSchedule").is_some());
        let names: Vec<_> = class.methods.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, ["handle", "format"]);

        let insts: Vec<_> = ir
            .instantiations
            .iter()
            .map(|i| (i.class_name.as_str(), i.binding.as_deref()))
            .collect();
        assert_eq!(
            insts,
            [("SlackBubble", Some("slack")), ("HttpBubble", None)]
        );
    }
}
