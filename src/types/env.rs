//! Structural resolution of TypeScript object types declared in a flow (and the built-in
//! trigger payloads): interfaces with declaration merging and `extends`, type aliases,
//! intersections, unions and the common mapped-type helpers.

use std::collections::HashMap;

use indexmap::IndexMap;
use tree_sitter::Node;

use crate::{
    parser::FlowSource,
    syntax::{Visit, children, first_named_child, named_children, property_name, walk},
};

#[derive(Debug, Clone, Copy)]
struct TypeDecl<'a> {
    node: Node<'a>,
    src: &'a str,
    builtin: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct FieldShape<'a> {
    pub optional: bool,
    pub ty: Option<Node<'a>>,
    pub src: &'a str,
    /// Declared by a built-in trigger payload rather than the flow.
    pub builtin: bool,
    pub doc: Option<String>,
}

/// Known properties of a type. An open shape accepts any property (index signatures,
/// `Record`, `any`, unresolvable names).
#[derive(Debug, Clone, Default)]
pub(crate) struct Shape<'a> {
    pub fields: IndexMap<String, FieldShape<'a>>,
    pub open: bool,
}

impl<'a> Shape<'a> {
    pub(crate) fn open() -> Self {
        Shape {
            fields: IndexMap::new(),
            open: true,
        }
    }

    pub(crate) fn has(&self, name: &str) -> bool {
        self.open || self.fields.contains_key(name)
    }

    fn merge(&mut self, other: Shape<'a>) {
        self.open |= other.open;
        for (name, field) in other.fields {
            self.fields.insert(name, field);
        }
    }

    /// Properties accessible on every member of a union.
    fn intersect(shapes: Vec<Shape<'a>>) -> Self {
        if shapes.iter().any(|s| s.open) {
            let mut merged = Shape::open();
            for shape in shapes {
                merged.merge(shape);
            }
            return merged;
        }
        let mut iter = shapes.into_iter();
        let Some(mut first) = iter.next() else {
            return Shape::open();
        };
        for shape in iter {
            first.fields.retain(|name, _| shape.fields.contains_key(name));
        }
        first
    }
}

pub(crate) struct TypeEnv<'a> {
    decls: HashMap<String, Vec<TypeDecl<'a>>>,
}

impl<'a> TypeEnv<'a> {
    /// Collect declarations from the built-in prelude first so that flow declarations with the
    /// same name replace them.
    pub(crate) fn new(flow: &'a FlowSource, prelude: Option<&'a FlowSource>) -> Self {
        let mut decls: HashMap<String, Vec<TypeDecl<'a>>> = HashMap::new();
        for (source, builtin) in prelude.into_iter().map(|p| (p, true)).chain([(flow, false)]) {
            let src = source.text();
            walk(source.root(), &mut |node| {
                if !matches!(node.kind(), "interface_declaration" | "type_alias_declaration") {
                    return Visit::Descend;
                }
                if let Some(name) = node.child_by_field_name("name") {
                    let name = src[name.start_byte()..name.end_byte()].to_string();
                    let entry = decls.entry(name).or_default();
                    if !builtin && entry.iter().all(|d| d.builtin) {
                        entry.clear();
                    }
                    entry.push(TypeDecl { node, src, builtin });
                }
                Visit::Skip
            });
        }
        TypeEnv { decls }
    }

    pub(crate) fn is_flow_declared(&self, name: &str) -> bool {
        self.decls
            .get(name)
            .is_some_and(|decls| decls.iter().any(|d| !d.builtin))
    }

    pub(crate) fn is_known(&self, name: &str) -> bool {
        self.decls.contains_key(name)
    }

    pub(crate) fn resolve(&self, ty: Node<'a>, src: &'a str, builtin: bool) -> Shape<'a> {
        self.resolve_inner(ty, src, builtin, &mut Vec::new())
    }

    pub(crate) fn resolve_named(&self, name: &str) -> Shape<'a> {
        self.resolve_name(name, &mut Vec::new())
    }

    fn resolve_inner(
        &self,
        ty: Node<'a>,
        src: &'a str,
        builtin: bool,
        visiting: &mut Vec<String>,
    ) -> Shape<'a> {
        match ty.kind() {
            "type_annotation" | "parenthesized_type" | "readonly_type" => match first_named_child(ty) {
                Some(inner) => self.resolve_inner(inner, src, builtin, visiting),
                None => Shape::open(),
            },
            "type_identifier" => self.resolve_name(&src[ty.start_byte()..ty.end_byte()], visiting),
            "generic_type" => self.resolve_generic(ty, src, builtin, visiting),
            "object_type" | "interface_body" => members(ty, src, builtin),
            "intersection_type" => {
                let mut shape = Shape::default();
                for part in named_children(ty) {
                    shape.merge(self.resolve_inner(part, src, builtin, visiting));
                }
                shape
            }
            "union_type" => Shape::intersect(
                named_children(ty)
                    .into_iter()
                    .filter(|part| !is_nullish(*part, src))
                    .map(|part| self.resolve_inner(part, src, builtin, visiting))
                    .collect(),
            ),
            _ => Shape::open(),
        }
    }

    fn resolve_generic(
        &self,
        ty: Node<'a>,
        src: &'a str,
        builtin: bool,
        visiting: &mut Vec<String>,
    ) -> Shape<'a> {
        let Some(name) = ty.child_by_field_name("name") else {
            return Shape::open();
        };
        let name = &src[name.start_byte()..name.end_byte()];
        let first_arg = ty
            .child_by_field_name("type_arguments")
            .and_then(first_named_child);
        match (name, first_arg) {
            ("Partial" | "Required" | "Readonly", Some(arg)) => {
                let mut shape = self.resolve_inner(arg, src, builtin, visiting);
                for field in shape.fields.values_mut() {
                    match name {
                        "Partial" => field.optional = true,
                        "Required" => field.optional = false,
                        _ => {}
                    }
                }
                shape
            }
            _ if self.decls.contains_key(name) => self.resolve_name(name, visiting),
            _ => Shape::open(),
        }
    }

    fn resolve_name(&self, name: &str, visiting: &mut Vec<String>) -> Shape<'a> {
        if visiting.iter().any(|v| v == name) {
            return Shape::open();
        }
        let Some(decls) = self.decls.get(name) else {
            return Shape::open();
        };
        visiting.push(name.to_string());
        let mut shape = Shape::default();
        for decl in decls {
            match decl.node.kind() {
                "interface_declaration" => {
                    for clause in named_children(decl.node)
                        .into_iter()
                        .filter(|c| c.kind() == "extends_type_clause")
                    {
                        for parent in named_children(clause) {
                            shape.merge(self.resolve_inner(parent, decl.src, decl.builtin, visiting));
                        }
                    }
                    if let Some(body) = decl.node.child_by_field_name("body") {
                        shape.merge(members(body, decl.src, decl.builtin));
                    }
                }
                _ => {
                    if let Some(value) = decl.node.child_by_field_name("value") {
                        shape.merge(self.resolve_inner(value, decl.src, decl.builtin, visiting));
                    }
                }
            }
        }
        visiting.pop();
        shape
    }
}

fn members<'a>(body: Node<'a>, src: &'a str, builtin: bool) -> Shape<'a> {
    let mut shape = Shape::default();
    for member in named_children(body) {
        match member.kind() {
            "property_signature" | "method_signature" => {
                let Some(name) = member
                    .child_by_field_name("name")
                    .and_then(|n| property_name(n, src))
                else {
                    continue;
                };
                let optional = children(member).iter().any(|c| c.kind() == "?");
                let ty = if member.kind() == "property_signature" {
                    member.child_by_field_name("type")
                } else {
                    None
                };
                shape.fields.insert(
                    name,
                    FieldShape {
                        optional,
                        ty,
                        src,
                        builtin,
                        doc: doc_comment(member, src),
                    },
                );
            }
            "index_signature" => shape.open = true,
            _ => {}
        }
    }
    shape
}

fn is_nullish(ty: Node<'_>, src: &str) -> bool {
    let text = src[ty.start_byte()..ty.end_byte()].trim();
    matches!(text, "undefined" | "null")
}

/// `/** ... */` immediately preceding a member.
fn doc_comment(member: Node<'_>, src: &str) -> Option<String> {
    let prev = member.prev_sibling()?;
    if prev.kind() != "comment" {
        return None;
    }
    let raw = &src[prev.start_byte()..prev.end_byte()];
    let inner = raw.strip_prefix("/**")?.strip_suffix("*/")?;
    let text = inner
        .lines()
        .map(|line| line.trim().trim_start_matches('*').trim())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    (!text.is_empty()).then_some(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_names(shape: &Shape<'_>) -> Vec<String> {
        shape.fields.keys().cloned().collect()
    }

    #[test]
    fn merges_interfaces_and_extends_chain() {
        let flow = FlowSource::parse(
            r#"
interface Base { id: string }
interface Payload extends Base { name: string }
interface Payload { age?: number }
"#,
        )
        .unwrap();
        let env = TypeEnv::new(&flow, None);
        let shape = env.resolve_named("Payload");
        assert!(!shape.open);
        assert_eq!(field_names(&shape), ["id", "name", "age"]);
        assert!(shape.fields["age"].optional);
    }

    #[test]
    fn resolves_aliases_intersections_and_unions() {
        let flow = FlowSource::parse(
            r#"
type A = { a: string; shared: number };
type B = { b: string; shared: number };
type Both = A & B;
type Either = A | B | undefined;
type Loose = Record<string, unknown>;
type Opt = Partial<A>;
"#,
        )
        .unwrap();
        let env = TypeEnv::new(&flow, None);
        assert_eq!(field_names(&env.resolve_named("Both")), ["a", "shared", "b"]);
        assert_eq!(field_names(&env.resolve_named("Either")), ["shared"]);
        assert!(env.resolve_named("Loose").open);
        assert!(env.resolve_named("Opt").fields.values().all(|f| f.optional));
    }

    #[test]
    fn recursive_types_terminate() {
        let flow = FlowSource::parse("interface Node2 extends Node2 { next: Node2 }").unwrap();
        let env = TypeEnv::new(&flow, None);
        let shape = env.resolve_named("Node2");
        assert!(shape.open);
    }
}
