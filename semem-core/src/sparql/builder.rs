//! SPARQL text construction helpers
//!
//! Every query the engine executes goes through here: the fixed prefix
//! block, the literal escape, and small builders for the INSERT DATA and
//! SELECT shapes the engine writes. Injected strings MUST pass through
//! [`escape_literal`].

use crate::constants::SPARQL_PREFIXES;

/// Escape a string for embedding in a SPARQL literal.
///
/// Handles backslash, double quote, newline, carriage return, and tab.
#[must_use]
pub fn escape_literal(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// A quoted, escaped plain literal
#[must_use]
pub fn literal(value: &str) -> String {
    format!("\"{}\"", escape_literal(value))
}

/// A quoted, escaped literal with an `xsd:` datatype
#[must_use]
pub fn typed_literal(value: &str, xsd_type: &str) -> String {
    format!("\"{}\"^^xsd:{xsd_type}", escape_literal(value))
}

/// An angle-bracketed URI reference
#[must_use]
pub fn uri_ref(value: &str) -> String {
    format!("<{value}>")
}

/// Prepend the fixed prefix block to a query or update body
#[must_use]
pub fn with_prefixes(body: &str) -> String {
    format!("{SPARQL_PREFIXES}\n{body}")
}

/// Build a SELECT against one named graph, terminated with LIMIT.
#[must_use]
pub fn select_query(
    projection: &str,
    graph: &str,
    body: &str,
    order_by: Option<&str>,
    limit: usize,
) -> String {
    let order_clause = order_by
        .map(|o| format!("ORDER BY {o}\n"))
        .unwrap_or_default();
    with_prefixes(&format!(
        "SELECT {projection} WHERE {{\n  GRAPH <{graph}> {{\n{body}  }}\n}}\n{order_clause}LIMIT {limit}"
    ))
}

/// Build an INSERT DATA update writing triples into one named graph.
#[must_use]
pub fn insert_data(graph: &str, triples: &str) -> String {
    with_prefixes(&format!(
        "INSERT DATA {{\n  GRAPH <{graph}> {{\n{triples}  }}\n}}"
    ))
}

/// Build a DELETE WHERE removing every triple about `subject` in `graph`.
#[must_use]
pub fn delete_subject(graph: &str, subject: &str) -> String {
    with_prefixes(&format!(
        "DELETE WHERE {{\n  GRAPH <{graph}> {{\n    <{subject}> ?p ?o .\n  }}\n}}"
    ))
}

/// Accumulates `subject predicate object .` lines for one INSERT DATA block
#[derive(Debug, Default)]
pub struct TripleBlock {
    lines: Vec<String>,
}

impl TripleBlock {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a triple with a pre-rendered object term
    pub fn push(&mut self, subject: &str, predicate: &str, object: &str) -> &mut Self {
        self.lines.push(format!("    <{subject}> {predicate} {object} ."));
        self
    }

    /// Add a triple with a plain literal object
    pub fn push_literal(&mut self, subject: &str, predicate: &str, value: &str) -> &mut Self {
        self.push(subject, predicate, &literal(value))
    }

    /// Render the block for embedding in [`insert_data`]
    #[must_use]
    pub fn render(&self) -> String {
        if self.lines.is_empty() {
            String::new()
        } else {
            format!("{}\n", self.lines.join("\n"))
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}
