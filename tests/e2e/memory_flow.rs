//! Tell-then-ask across memory and the knowledge graph.

use std::collections::HashMap;
use std::sync::Arc;

use semem_core::api::{SememEngine, TellType};
use semem_core::config::{Config, MemorySettings};
use semem_core::sparql::SparqlEndpoint;
use semem_core::zpt::{NavigationParams, TiltProjection, ZoomLevel};
use test_utils::{node_row, results_from_rows, MockChatProvider, MockEmbeddingProvider, RecordingSparqlEndpoint};

fn engine_with(
    chat: Arc<MockChatProvider>,
    endpoint: Arc<RecordingSparqlEndpoint>,
) -> SememEngine {
    let config = Config {
        memory: MemorySettings {
            dimension: 32,
            ..MemorySettings::default()
        },
        ..Config::default()
    };
    SememEngine::with_components(
        config,
        chat,
        Arc::new(MockEmbeddingProvider::new(32)),
        Some(endpoint as Arc<dyn SparqlEndpoint>),
        None,
    )
    .unwrap()
}

#[tokio::test]
async fn test_tell_then_ask_same_session() {
    let chat = Arc::new(MockChatProvider::new(""));
    let endpoint = Arc::new(RecordingSparqlEndpoint::new());
    endpoint.set_default_result(results_from_rows(vec![node_row(
        "http://example.org/princeton",
        "Princeton",
        "Einstein developed relativity at Princeton in 1915.",
    )]));
    let engine = engine_with(Arc::clone(&chat), Arc::clone(&endpoint));

    // tell: concept extraction
    chat.push_reply(r#"["einstein", "relativity", "princeton"]"#);
    let told = engine
        .tell(
            "Einstein developed relativity at Princeton in 1915.",
            TellType::Document,
            &HashMap::new(),
        )
        .await;
    assert!(told.success);
    // the interaction plus the mirrored unit and three concept nodes
    assert!(told.ids.len() >= 2);
    assert!(!endpoint.updates_containing("ragno:content").is_empty());

    // ask: concept extraction, then answer synthesis
    chat.push_reply(r#"["einstein", "princeton"]"#);
    chat.push_reply("Einstein worked at Princeton.");
    let asked = engine
        .ask(
            "Where did Einstein work?",
            Some(NavigationParams {
                query: "Where did Einstein work?".to_string(),
                zoom: ZoomLevel::Entity,
                tilt: TiltProjection::Keywords,
                ..NavigationParams::default()
            }),
        )
        .await;

    assert!(asked.success);
    assert!(asked.answer.contains("Princeton"));
    assert!(!asked.corpuscles.is_empty());
    assert!(!asked.results.is_empty());

    // exactly one NavigationView was recorded for the one navigation
    assert_eq!(endpoint.updates_containing("zpt:NavigationView").len(), 1);

    engine.shutdown(false).await;
}

#[tokio::test]
async fn test_tell_invalidates_query_cache() {
    let chat = Arc::new(MockChatProvider::new("[]"));
    let endpoint = Arc::new(RecordingSparqlEndpoint::new());
    let engine = engine_with(Arc::clone(&chat), Arc::clone(&endpoint));

    let params = NavigationParams {
        query: "ai".to_string(),
        ..NavigationParams::default()
    };
    engine.navigate(&params, None).await;
    engine.navigate(&params, None).await;
    // second call was a cache hit
    assert_eq!(endpoint.select_count(), 1);

    engine
        .tell("fresh content", TellType::Document, &HashMap::new())
        .await;

    // the ingest cleared the query cache, so the next navigate re-executes
    engine.navigate(&params, None).await;
    assert_eq!(endpoint.select_count(), 2);

    engine.shutdown(false).await;
}

#[tokio::test]
async fn test_ask_without_graph_results_still_answers_from_memory() {
    let chat = Arc::new(MockChatProvider::new(""));
    let endpoint = Arc::new(RecordingSparqlEndpoint::new());
    let engine = engine_with(Arc::clone(&chat), Arc::clone(&endpoint));

    chat.push_reply(r#"["rust"]"#);
    engine
        .tell("Rust guarantees memory safety.", TellType::Fact, &HashMap::new())
        .await;

    chat.push_reply(r#"["rust"]"#);
    chat.push_reply("Rust is memory safe.");
    let asked = engine.ask("Is Rust memory safe?", None).await;

    assert!(asked.success);
    assert!(!asked.results.is_empty());
    assert!(asked.corpuscles.is_empty());

    engine.shutdown(false).await;
}
