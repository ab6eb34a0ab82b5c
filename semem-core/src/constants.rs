//! Global constants for semem-core
//!
//! Centralizes magic numbers, vocabulary URIs, and the SPARQL prefix block
//! used throughout the engine.

/// Default configuration values
pub mod defaults {
    use std::time::Duration;

    // Memory tiers
    pub const SHORT_TERM_CAPACITY: usize = 50;
    pub const SIMILARITY_THRESHOLD: f32 = 0.4;
    pub const PROMOTION_THRESHOLD: f32 = 2.0;
    pub const PROMOTION_MIN_ACCESS: f32 = 2.0;
    pub const DECAY_RATE: f32 = 0.0001;
    pub const CONTEXT_WINDOW: usize = 5;

    // Composite retrieval score weights
    pub const SCORE_WEIGHT_SIMILARITY: f32 = 0.6;
    pub const SCORE_WEIGHT_CONCEPTS: f32 = 0.25;
    pub const SCORE_WEIGHT_RECENCY: f32 = 0.15;

    // Embeddings
    pub const EMBEDDING_DIMENSION: usize = 1536;
    pub const EMBEDDING_RETRY_ATTEMPTS: u32 = 3;
    pub const EMBEDDING_RETRY_BASE_DELAY: Duration = Duration::from_millis(250);

    // Query cache
    pub const MAX_CACHE_SIZE: usize = 1000;
    pub const QUERY_CACHE_TTL: Duration = Duration::from_secs(300);
    pub const CACHE_KEY_PREFIX_LEN: usize = 50;

    // Memory-data cache
    pub const MEMORY_CACHE_TIMEOUT: Duration = Duration::from_secs(60);

    // Debounced persistence
    pub const PERSIST_DEBOUNCE: Duration = Duration::from_millis(500);

    // Navigation
    pub const RESULT_LIMIT: usize = 50;
    pub const SESSION_HISTORY_LIMIT: usize = 50;
    pub const SESSION_TIMEOUT: Duration = Duration::from_secs(3600);

    // Iteration controller
    pub const MAX_ITERATIONS: usize = 3;
    pub const COMPLETENESS_THRESHOLD: f32 = 0.8;
    pub const MAX_FOLLOW_UPS: usize = 2;

    // Outbound request deadlines
    pub const SPARQL_TIMEOUT: Duration = Duration::from_secs(30);
    pub const SPARQL_HEALTH_TIMEOUT: Duration = Duration::from_secs(5);
    pub const LLM_TIMEOUT: Duration = Duration::from_secs(60);

    // Provider registry
    pub const PROVIDER_FAILURE_THRESHOLD: u32 = 3;
}

/// RDF vocabulary namespaces and default named graphs
pub mod vocab {
    pub const RAGNO: &str = "http://purl.org/stuff/ragno/";
    pub const ZPT: &str = "http://purl.org/stuff/zpt/";
    pub const SEMEM: &str = "http://purl.org/stuff/semem/";
    pub const DCTERMS: &str = "http://purl.org/dc/terms/";
    pub const PROV: &str = "http://www.w3.org/ns/prov#";
    pub const SKOS: &str = "http://www.w3.org/2004/02/skos/core#";
    pub const RDF: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
    pub const RDFS: &str = "http://www.w3.org/2000/01/rdf-schema#";
    pub const XSD: &str = "http://www.w3.org/2001/XMLSchema#";

    /// Default named graph for content and corpus nodes
    pub const CONTENT_GRAPH: &str = "http://hyperdata.it/content";
    /// Default named graph for navigation provenance
    pub const NAVIGATION_GRAPH: &str = "http://purl.org/stuff/navigation";
    /// Default named graph for serialized session blobs
    pub const SESSION_GRAPH: &str = "http://hyperdata.it/sessions";

    /// Base for minted concept and interaction URIs
    pub const URI_BASE: &str = "http://hyperdata.it/semem";
}

/// Fixed PREFIX block prepended to every executed SPARQL query
pub const SPARQL_PREFIXES: &str = "\
PREFIX ragno: <http://purl.org/stuff/ragno/>
PREFIX zpt: <http://purl.org/stuff/zpt/>
PREFIX semem: <http://purl.org/stuff/semem/>
PREFIX dcterms: <http://purl.org/dc/terms/>
PREFIX prov: <http://www.w3.org/ns/prov#>
PREFIX skos: <http://www.w3.org/2004/02/skos/core#>
PREFIX rdf: <http://www.w3.org/1999/02/22-rdf-syntax-ns#>
PREFIX rdfs: <http://www.w3.org/2000/01/rdf-schema#>
PREFIX xsd: <http://www.w3.org/2001/XMLSchema#>
";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_weights_sum_to_one() {
        let sum = defaults::SCORE_WEIGHT_SIMILARITY
            + defaults::SCORE_WEIGHT_CONCEPTS
            + defaults::SCORE_WEIGHT_RECENCY;
        assert!((sum - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_prefix_block_covers_all_vocabularies() {
        for prefix in [
            "ragno:", "zpt:", "semem:", "dcterms:", "prov:", "skos:", "rdf:", "rdfs:", "xsd:",
        ] {
            assert!(
                SPARQL_PREFIXES.contains(&format!("PREFIX {prefix}")),
                "missing prefix {prefix}"
            );
        }
    }
}
