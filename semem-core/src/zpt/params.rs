//! Zoom-Pan-Tilt navigation parameters
//!
//! Zoom picks the granularity of returned nodes, pan is a conjunctive
//! filter set, and tilt is the analytic projection layered on top. Zoom and
//! tilt are closed sum types so every navigation request is checked before
//! any SPARQL is built.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Granularity of returned knowledge nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoomLevel {
    /// Attribute nodes
    Micro,
    /// Entity nodes (plus interaction prompts)
    Entity,
    /// Semantic units (plus interaction bodies)
    Unit,
    /// Text elements
    Text,
    /// Communities
    Community,
    /// Whole corpora
    Corpus,
}

impl ZoomLevel {
    /// Parse a zoom keyword.
    ///
    /// # Errors
    ///
    /// Returns `Error::Domain` for unsupported levels.
    pub fn parse(value: &str) -> Result<Self> {
        match value.to_lowercase().as_str() {
            "micro" => Ok(Self::Micro),
            "entity" => Ok(Self::Entity),
            "unit" => Ok(Self::Unit),
            "text" => Ok(Self::Text),
            "community" => Ok(Self::Community),
            "corpus" => Ok(Self::Corpus),
            other => Err(Error::Domain(format!("unsupported zoom level {other:?}"))),
        }
    }

    /// The keyword form used in parameters and provenance
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Micro => "micro",
            Self::Entity => "entity",
            Self::Unit => "unit",
            Self::Text => "text",
            Self::Community => "community",
            Self::Corpus => "corpus",
        }
    }

    /// The RDF type selected at this granularity
    #[must_use]
    pub fn node_type(self) -> &'static str {
        match self {
            Self::Micro => "ragno:Attribute",
            Self::Entity => "ragno:Entity",
            Self::Unit => "ragno:Unit",
            Self::Text => "ragno:TextElement",
            Self::Community => "ragno:Community",
            Self::Corpus => "ragno:Corpus",
        }
    }
}

impl Default for ZoomLevel {
    fn default() -> Self {
        Self::Entity
    }
}

/// Inclusive date bounds over `dcterms:created`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemporalRange {
    pub start: Option<String>,
    pub end: Option<String>,
}

/// Conjunctive filter set; within one dimension values are OR'd
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanFilter {
    /// Domain tags matched against node content
    pub domains: Vec<String>,
    /// Keywords matched against content or label
    pub keywords: Vec<String>,
    /// Entity URIs the node must connect to
    pub entities: Vec<String>,
    /// Creation-date bounds
    pub temporal: Option<TemporalRange>,
}

impl PanFilter {
    /// Whether no filter dimension is active
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
            && self.keywords.is_empty()
            && self.entities.is_empty()
            && self
                .temporal
                .as_ref()
                .is_none_or(|t| t.start.is_none() && t.end.is_none())
    }
}

/// Analytic projection layered on the zoom query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TiltProjection {
    /// Content-length projection, ordered by length then frequency
    Keywords,
    /// Join embedding handles and vector metadata
    Embedding,
    /// Order by frequency then entry-point flag
    Graph,
    /// Order by creation time, newest first
    Temporal,
}

impl TiltProjection {
    /// Parse a tilt keyword.
    ///
    /// # Errors
    ///
    /// Returns `Error::Domain` for unsupported projections.
    pub fn parse(value: &str) -> Result<Self> {
        match value.to_lowercase().as_str() {
            "keywords" => Ok(Self::Keywords),
            "embedding" => Ok(Self::Embedding),
            "graph" => Ok(Self::Graph),
            "temporal" => Ok(Self::Temporal),
            other => Err(Error::Domain(format!(
                "unsupported tilt projection {other:?}"
            ))),
        }
    }

    /// The keyword form used in parameters and provenance
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Keywords => "keywords",
            Self::Embedding => "embedding",
            Self::Graph => "graph",
            Self::Temporal => "temporal",
        }
    }
}

impl Default for TiltProjection {
    fn default() -> Self {
        Self::Keywords
    }
}

/// One complete navigation request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationParams {
    /// Free-text query recorded in provenance
    pub query: String,
    pub zoom: ZoomLevel,
    pub pan: PanFilter,
    pub tilt: TiltProjection,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zoom_parse_round_trip() {
        for keyword in ["micro", "entity", "unit", "text", "community", "corpus"] {
            assert_eq!(ZoomLevel::parse(keyword).unwrap().as_str(), keyword);
        }
        assert!(matches!(ZoomLevel::parse("galaxy"), Err(Error::Domain(_))));
    }

    #[test]
    fn test_tilt_parse_round_trip() {
        for keyword in ["keywords", "embedding", "graph", "temporal"] {
            assert_eq!(TiltProjection::parse(keyword).unwrap().as_str(), keyword);
        }
        assert!(matches!(TiltProjection::parse("pivot"), Err(Error::Domain(_))));
    }

    #[test]
    fn test_pan_filter_emptiness() {
        assert!(PanFilter::default().is_empty());
        assert!(PanFilter {
            temporal: Some(TemporalRange::default()),
            ..PanFilter::default()
        }
        .is_empty());
        assert!(!PanFilter {
            domains: vec!["ai".to_string()],
            ..PanFilter::default()
        }
        .is_empty());
    }

    #[test]
    fn test_params_deserialize_from_json() {
        let params: NavigationParams = serde_json::from_str(
            r#"{"query":"AI","zoom":"community","pan":{"domains":["ai"]},"tilt":"temporal"}"#,
        )
        .unwrap();

        assert_eq!(params.zoom, ZoomLevel::Community);
        assert_eq!(params.tilt, TiltProjection::Temporal);
        assert_eq!(params.pan.domains, vec!["ai"]);
    }

    #[test]
    fn test_params_default_zoom_and_tilt() {
        let params: NavigationParams = serde_json::from_str(r#"{"query":"x"}"#).unwrap();
        assert_eq!(params.zoom, ZoomLevel::Entity);
        assert_eq!(params.tilt, TiltProjection::Keywords);
    }
}
