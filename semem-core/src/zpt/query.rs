//! Zoom/pan/tilt SPARQL construction
//!
//! Each zoom level owns a base pattern selecting its RDF type plus the
//! projections the level carries; pan filters are AND'd onto the base with
//! OR within each dimension; tilt contributes extra projections and the
//! ordering. Every injected string goes through the literal escape and
//! every query ends with the fixed result limit.

use crate::constants::defaults;
use crate::sparql::builder::{escape_literal, select_query};

use super::params::{NavigationParams, PanFilter, TiltProjection, ZoomLevel};

/// Builds executable SPARQL for navigation requests
pub struct ZptQueryBuilder {
    graph: String,
    limit: usize,
}

impl ZptQueryBuilder {
    #[must_use]
    pub fn new(graph: String) -> Self {
        Self {
            graph,
            limit: defaults::RESULT_LIMIT,
        }
    }

    /// Build the complete query for one navigation request
    #[must_use]
    pub fn build(&self, params: &NavigationParams) -> String {
        let (zoom_projection, zoom_body) = zoom_patterns(params.zoom);
        let pan_body = pan_filters(&params.pan);
        let (tilt_projection, tilt_body, order_by) = tilt_transform(params.tilt);

        let projection = format!("?node ?label ?content ?created{zoom_projection}{tilt_projection}");
        let body = format!("{zoom_body}{pan_body}{tilt_body}");
        select_query(&projection, &self.graph, &body, order_by, self.limit)
    }
}

/// Base pattern and extra projections for one zoom level
fn zoom_patterns(zoom: ZoomLevel) -> (&'static str, String) {
    let common = "    OPTIONAL { ?node rdfs:label ?label }\n\
                  \u{20}   OPTIONAL { ?node ragno:content ?content }\n\
                  \u{20}   OPTIONAL { ?node dcterms:created ?created }\n";

    match zoom {
        ZoomLevel::Micro => (
            " ?attributeType ?entity",
            format!(
                "    ?node rdf:type ragno:Attribute .\n{common}\
                 \u{20}   OPTIONAL {{ ?node ragno:attributeType ?attributeType }}\n\
                 \u{20}   OPTIONAL {{ ?entity ragno:hasAttribute ?node }}\n"
            ),
        ),
        ZoomLevel::Entity => (
            " ?isEntryPoint ?frequency",
            format!(
                "    {{\n      ?node rdf:type ragno:Entity .\n    }}\n\
                 \u{20}   UNION\n\
                 \u{20}   {{\n      ?node rdf:type semem:Interaction .\n\
                 \u{20}     ?node semem:prompt ?content .\n    }}\n{common}\
                 \u{20}   OPTIONAL {{ ?node ragno:isEntryPoint ?isEntryPoint }}\n\
                 \u{20}   OPTIONAL {{ ?node ragno:frequency ?frequency }}\n"
            ),
        ),
        ZoomLevel::Unit => (
            " ?embeddingRef",
            format!(
                "    {{\n      ?node rdf:type ragno:Unit .\n    }}\n\
                 \u{20}   UNION\n\
                 \u{20}   {{\n      ?node rdf:type semem:Interaction .\n\
                 \u{20}     ?node semem:output ?content .\n    }}\n{common}\
                 \u{20}   OPTIONAL {{ ?node ragno:hasEmbedding ?embeddingRef }}\n"
            ),
        ),
        ZoomLevel::Text => (
            " ?sourceDocument",
            format!(
                "    ?node rdf:type ragno:TextElement .\n{common}\
                 \u{20}   OPTIONAL {{ ?node prov:wasDerivedFrom ?sourceDocument }}\n"
            ),
        ),
        ZoomLevel::Community => (
            " ?memberCount",
            format!(
                "    ?node rdf:type ragno:Community .\n{common}\
                 \u{20}   OPTIONAL {{\n\
                 \u{20}     SELECT ?node (COUNT(?member) AS ?memberCount)\n\
                 \u{20}     WHERE {{ ?node skos:member ?member }} GROUP BY ?node\n\
                 \u{20}   }}\n"
            ),
        ),
        ZoomLevel::Corpus => (
            " ?elementCount",
            format!(
                "    ?node rdf:type ragno:Corpus .\n{common}\
                 \u{20}   OPTIONAL {{\n\
                 \u{20}     SELECT ?node (COUNT(?element) AS ?elementCount)\n\
                 \u{20}     WHERE {{ ?node skos:member ?element }} GROUP BY ?node\n\
                 \u{20}   }}\n"
            ),
        ),
    }
}

/// Render the conjunctive pan filter set
fn pan_filters(pan: &PanFilter) -> String {
    let mut clauses = String::new();

    if !pan.domains.is_empty() {
        let alternatives: Vec<String> = pan
            .domains
            .iter()
            .map(|domain| {
                format!(
                    "CONTAINS(LCASE(COALESCE(?content, \"\")), \"{}\")",
                    escape_literal(&domain.to_lowercase())
                )
            })
            .collect();
        clauses.push_str(&format!("    FILTER({})\n", alternatives.join(" || ")));
    }

    if !pan.keywords.is_empty() {
        let alternatives: Vec<String> = pan
            .keywords
            .iter()
            .flat_map(|keyword| {
                let escaped = escape_literal(&keyword.to_lowercase());
                [
                    format!("CONTAINS(LCASE(COALESCE(?content, \"\")), \"{escaped}\")"),
                    format!("CONTAINS(LCASE(COALESCE(?label, \"\")), \"{escaped}\")"),
                ]
            })
            .collect();
        clauses.push_str(&format!("    FILTER({})\n", alternatives.join(" || ")));
    }

    if !pan.entities.is_empty() {
        let uris: Vec<String> = pan.entities.iter().map(|uri| format!("<{uri}>")).collect();
        clauses.push_str(&format!(
            "    ?node ragno:connectsTo ?panEntity .\n    FILTER(?panEntity IN ({}))\n",
            uris.join(", ")
        ));
    }

    if let Some(temporal) = &pan.temporal {
        if let Some(start) = &temporal.start {
            clauses.push_str(&format!(
                "    FILTER(?created >= \"{}\"^^xsd:dateTime)\n",
                escape_literal(&normalize_datetime(start))
            ));
        }
        if let Some(end) = &temporal.end {
            clauses.push_str(&format!(
                "    FILTER(?created <= \"{}\"^^xsd:dateTime)\n",
                escape_literal(&normalize_datetime(end))
            ));
        }
    }

    clauses
}

/// Extra projections, extra body, and ordering for one tilt
fn tilt_transform(tilt: TiltProjection) -> (&'static str, String, Option<&'static str>) {
    match tilt {
        TiltProjection::Keywords => (
            " ?contentLength",
            "    BIND(STRLEN(COALESCE(?content, \"\")) AS ?contentLength)\n".to_string(),
            Some("DESC(?contentLength) DESC(?frequency)"),
        ),
        TiltProjection::Embedding => (
            " ?vectorContent ?model ?dimension",
            "    OPTIONAL {\n      ?node ragno:hasEmbedding ?embeddingNode .\n      \
             ?embeddingNode ragno:vectorContent ?vectorContent ;\n          \
             ragno:embeddingModel ?model ;\n          ragno:dimension ?dimension .\n    }\n"
                .to_string(),
            None,
        ),
        TiltProjection::Graph => (
            "",
            String::new(),
            // connectivity proxy until relationship-centric projections land
            Some("DESC(?frequency) DESC(?isEntryPoint)"),
        ),
        TiltProjection::Temporal => ("", String::new(), Some("DESC(?created)")),
    }
}

/// Bare dates are widened to a full timestamp for dateTime comparison
fn normalize_datetime(value: &str) -> String {
    if value.contains('T') {
        value.to_string()
    } else {
        format!("{value}T00:00:00Z")
    }
}
