//! Control-flow normalisation: every braceless `if`/`else`/loop body becomes an explicit block so
//! later instrumentation always has a statement list to insert into.
//!
//! The source is parsed once, promotions are collected as text splices, and the splices are
//! applied from the end of the file towards the start so earlier offsets stay valid.

use std::collections::HashMap;

use tree_sitter::Node;

use crate::{
    parser::FlowSource,
    syntax::{Visit, named_children, walk},
};

#[derive(Debug, Clone, PartialEq, Eq)]
struct Splice {
    start: usize,
    end: usize,
    text: String,
    /// Tree depth of the promoted body; outer closing braces go in before inner ones at the
    /// same offset so the inner brace ends up first.
    depth: usize,
}

/// Rewrite braceless bodies into blocks. Unparsable input is returned unchanged.
pub fn normalize(source: &str) -> String {
    let parsed = match FlowSource::parse(source) {
        Ok(parsed) => parsed,
        Err(err) => {
            tracing::debug!(%err, "normalize skipped: source does not parse");
            return source.to_string();
        }
    };
    let splices = collect_splices(&parsed);
    if splices.is_empty() {
        return source.to_string();
    }
    tracing::debug!(promotions = splices.len() / 2, "normalized braceless bodies");
    apply_splices(source, splices)
}

fn collect_splices(parsed: &FlowSource) -> Vec<Splice> {
    let mut promoter = Promoter {
        src: parsed.text(),
        forced_indent: HashMap::new(),
        splices: Vec::new(),
    };
    walk(parsed.root(), &mut |node| {
        for (owner, body) in braceless_bodies(node) {
            promoter.promote(owner, body);
        }
        Visit::Descend
    });
    promoter.splices
}

/// `(owner, body)` pairs for bodies of `node` that are single statements.
fn braceless_bodies(node: Node<'_>) -> Vec<(Node<'_>, Node<'_>)> {
    let body = match node.kind() {
        "if_statement" => node.child_by_field_name("consequence"),
        "else_clause" => named_children(node)
            .into_iter()
            .last()
            .filter(|stmt| stmt.kind() != "if_statement"),
        "for_statement" | "for_in_statement" | "while_statement" | "do_statement" => {
            node.child_by_field_name("body")
        }
        _ => None,
    };
    body.filter(|b| !matches!(b.kind(), "statement_block" | "empty_statement"))
        .map(|b| vec![(node, b)])
        .unwrap_or_default()
}

struct Promoter<'s> {
    src: &'s str,
    /// Indent of bodies that were moved onto a line of their own, keyed by node id.
    forced_indent: HashMap<usize, String>,
    splices: Vec<Splice>,
}

impl Promoter<'_> {
    fn promote(&mut self, owner: Node<'_>, body: Node<'_>) {
        let Some(prev) = previous_token(body) else {
            return;
        };
        let indent = self.indent_of(owner);
        let unit = if indent.contains('\t') { "\t" } else { "  " };
        let inner = format!("{indent}{unit}");
        let depth = depth(body);

        let gap = &self.src[prev.end_byte()..body.start_byte()];
        if gap.trim().is_empty() {
            self.splices.push(Splice {
                start: prev.end_byte(),
                end: body.start_byte(),
                text: format!(" {{\n{inner}"),
                depth,
            });
            self.forced_indent.insert(body.id(), inner);
        } else {
            // A comment sits between header and body; keep it where it is.
            self.splices.push(Splice {
                start: prev.end_byte(),
                end: prev.end_byte(),
                text: " {".to_string(),
                depth,
            });
        }
        self.splices.push(Splice {
            start: body.end_byte(),
            end: body.end_byte(),
            text: format!("\n{indent}}}"),
            depth,
        });
    }

    /// Indent of the line a node effectively starts on after earlier promotions.
    fn indent_of(&self, node: Node<'_>) -> String {
        let mut current = node;
        loop {
            if let Some(indent) = self.forced_indent.get(&current.id()) {
                return indent.clone();
            }
            match current.parent() {
                Some(parent) if parent.start_position().row == current.start_position().row => {
                    current = parent;
                }
                _ => return line_indent(self.src, current.start_byte()),
            }
        }
    }
}

fn previous_token(node: Node<'_>) -> Option<Node<'_>> {
    let mut prev = node.prev_sibling();
    while let Some(candidate) = prev {
        if candidate.kind() != "comment" {
            return Some(candidate);
        }
        prev = candidate.prev_sibling();
    }
    None
}

fn depth(node: Node<'_>) -> usize {
    let mut depth = 0;
    let mut current = node.parent();
    while let Some(parent) = current {
        depth += 1;
        current = parent.parent();
    }
    depth
}

fn line_indent(src: &str, offset: usize) -> String {
    let line_start = src[..offset].rfind('\n').map_or(0, |idx| idx + 1);
    src[line_start..]
        .chars()
        .take_while(|c| *c == ' ' || *c == '\t')
        .collect()
}

fn apply_splices(source: &str, mut splices: Vec<Splice>) -> String {
    splices.sort_by(|a, b| b.start.cmp(&a.start).then(a.depth.cmp(&b.depth)));
    let mut out = source.to_string();
    for splice in splices {
        out.replace_range(splice.start..splice.end, &splice.text);
    }
    out
}
