//! TypeScript parsing for flow sources.

use tree_sitter::{Node, Parser, Tree};

use crate::{
    error::{AnalysisError, Result},
    model::{Diagnostic, Location},
    syntax::{children, location},
};

pub const SYNTAX_CODE: &str = "syntax";

/// Flow source text together with its syntax tree. Immutable once parsed.
pub struct FlowSource {
    text: String,
    tree: Tree,
}

impl std::fmt::Debug for FlowSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlowSource")
            .field("len", &self.text.len())
            .finish()
    }
}

impl FlowSource {
    /// Parse `text`, failing on the first syntax error so callers never analyse a partial tree.
    pub fn parse(text: impl Into<String>) -> Result<Self> {
        let text = text.into();
        let mut parser = typescript_parser()?;
        let tree = parser
            .parse(&text, None)
            .ok_or_else(|| AnalysisError::Internal("parser produced no tree".to_string()))?;
        let root = tree.root_node();
        if root.has_error()
            && let Some(err) = first_syntax_error(root, &text)
        {
            tracing::debug!(%err, "flow source failed to parse");
            return Err(err);
        }
        Ok(FlowSource { text, tree })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }

    pub fn node_text(&self, node: Node<'_>) -> &str {
        &self.text[node.start_byte()..node.end_byte()]
    }

    pub fn source_hash(&self) -> String {
        source_hash(&self.text)
    }
}

pub fn source_hash(text: &str) -> String {
    blake3::hash(text.as_bytes()).to_hex().to_string()
}

fn typescript_parser() -> Result<Parser> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into())
        .map_err(|e| AnalysisError::Grammar(e.to_string()))?;
    Ok(parser)
}

fn first_syntax_error(node: Node<'_>, text: &str) -> Option<AnalysisError> {
    if node.is_missing() {
        return Some(syntax_error(node, format!("missing '{}'", node.kind())));
    }
    if node.is_error() {
        let snippet = text[node.start_byte()..node.end_byte()]
            .lines()
            .next()
            .unwrap_or_default()
            .trim();
        let message = if snippet.is_empty() {
            "unexpected end of input".to_string()
        } else {
            let short: String = snippet.chars().take(40).collect();
            format!("unexpected '{short}'")
        };
        return Some(syntax_error(node, message));
    }
    children(node)
        .into_iter()
        .filter(|child| child.has_error() || child.is_missing())
        .find_map(|child| first_syntax_error(child, text))
}

fn syntax_error(node: Node<'_>, message: String) -> AnalysisError {
    let Location { line, column } = location(node);
    AnalysisError::Syntax {
        message,
        line,
        column,
    }
}

/// Fold a parse failure into the single diagnostic reported for unparsable input.
pub fn syntax_diagnostic(err: &AnalysisError) -> Diagnostic {
    let diagnostic = Diagnostic::new(SYNTAX_CODE, err.to_string());
    match err {
        AnalysisError::Syntax { line, column, .. } => diagnostic.at(Location {
            line: *line,
            column: *column,
        }),
        _ => diagnostic,
    }
}
