//! SPARQL 1.1 JSON results types

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One RDF term in a result binding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RdfTerm {
    /// "uri", "literal", or "bnode"
    #[serde(rename = "type")]
    pub term_type: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datatype: Option<String>,
    #[serde(rename = "xml:lang", skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
}

impl RdfTerm {
    #[must_use]
    pub fn uri(value: impl Into<String>) -> Self {
        Self {
            term_type: "uri".to_string(),
            value: value.into(),
            datatype: None,
            lang: None,
        }
    }

    #[must_use]
    pub fn literal(value: impl Into<String>) -> Self {
        Self {
            term_type: "literal".to_string(),
            value: value.into(),
            datatype: None,
            lang: None,
        }
    }
}

/// One row of variable bindings
pub type Binding = HashMap<String, RdfTerm>;

/// Header listing projected variables
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResultsHead {
    #[serde(default)]
    pub vars: Vec<String>,
}

/// Body holding the binding rows
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResultsBody {
    #[serde(default)]
    pub bindings: Vec<Binding>,
}

/// Complete SPARQL SELECT result document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SparqlResults {
    #[serde(default)]
    pub head: ResultsHead,
    #[serde(default)]
    pub results: ResultsBody,
}

impl SparqlResults {
    /// Empty result set
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Number of binding rows
    #[must_use]
    pub fn len(&self) -> usize {
        self.results.bindings.len()
    }

    /// Whether there are no binding rows
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.bindings.is_empty()
    }

    /// Value of `var` in the first binding row, if present
    #[must_use]
    pub fn first_value(&self, var: &str) -> Option<&str> {
        self.results
            .bindings
            .first()
            .and_then(|row| row.get(var))
            .map(|term| term.value.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_standard_results_document() {
        let raw = r#"{
            "head": {"vars": ["node", "label"]},
            "results": {"bindings": [
                {"node": {"type": "uri", "value": "http://example.org/e1"},
                 "label": {"type": "literal", "value": "Einstein", "xml:lang": "en"}}
            ]}
        }"#;

        let results: SparqlResults = serde_json::from_str(raw).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results.head.vars, vec!["node", "label"]);
        assert_eq!(results.first_value("label"), Some("Einstein"));
        assert_eq!(
            results.results.bindings[0]["label"].lang.as_deref(),
            Some("en")
        );
    }

    #[test]
    fn test_missing_sections_default_to_empty() {
        let results: SparqlResults = serde_json::from_str("{}").unwrap();
        assert!(results.is_empty());
        assert!(results.first_value("x").is_none());
    }
}
