//! End-to-end navigation behavior: zoom progression, cache coordination,
//! provenance policy, and session restoration.

use std::sync::Arc;
use std::time::{Duration, Instant};

use semem_core::cache::QueryCache;
use semem_core::sparql::{RdfTerm, SparqlEndpoint};
use semem_core::zpt::{
    NavigationParams, NavigationSession, PanFilter, SessionStore, TemporalRange, TiltProjection,
    ZoomLevel, ZptNavigator,
};
use test_utils::{node_row, results_from_rows, RecordingSparqlEndpoint};

const CONTENT_GRAPH: &str = "http://hyperdata.it/content";
const NAV_GRAPH: &str = "http://purl.org/stuff/navigation";
const SESSION_GRAPH: &str = "http://hyperdata.it/sessions";

fn navigator_over(endpoint: Arc<RecordingSparqlEndpoint>) -> ZptNavigator {
    ZptNavigator::new(
        Arc::clone(&endpoint) as Arc<dyn SparqlEndpoint>,
        Arc::new(QueryCache::new()),
        SessionStore::new(
            Some(Arc::clone(&endpoint) as Arc<dyn SparqlEndpoint>),
            SESSION_GRAPH.to_string(),
        ),
        CONTENT_GRAPH.to_string(),
        NAV_GRAPH.to_string(),
    )
}

fn params(query: &str, zoom: ZoomLevel) -> NavigationParams {
    NavigationParams {
        query: query.to_string(),
        zoom,
        pan: PanFilter::default(),
        tilt: TiltProjection::Keywords,
    }
}

#[tokio::test]
async fn test_zoom_progression_increments_session() {
    let endpoint = Arc::new(RecordingSparqlEndpoint::new());
    endpoint.set_default_result(results_from_rows(vec![node_row(
        "http://example.org/n1",
        "AI",
        "artificial intelligence",
    )]));
    let navigator = navigator_over(Arc::clone(&endpoint));

    let zooms = [
        (ZoomLevel::Community, "ragno:Community"),
        (ZoomLevel::Unit, "ragno:Unit"),
        (ZoomLevel::Entity, "ragno:Entity"),
        (ZoomLevel::Micro, "ragno:Attribute"),
    ];

    for (zoom, _) in &zooms {
        let outcome = navigator
            .navigate(&params("AI", *zoom), Some("prog".to_string()))
            .await
            .unwrap();
        assert_eq!(outcome.corpuscles.len(), 1);
        assert_eq!(outcome.metadata.zoom, zoom.as_str());
    }

    // each zoom produced a distinct query selecting its node type (the
    // first SELECT is the one-time session-restore probe for the named id)
    let selects = endpoint.selects();
    let nav_selects: Vec<&String> = selects
        .iter()
        .filter(|query| !query.contains("zpt:NavigationSession"))
        .collect();
    assert_eq!(nav_selects.len(), 4);
    for ((_, node_type), query) in zooms.iter().zip(nav_selects.iter()) {
        assert!(
            query.contains(&format!("rdf:type {node_type}")),
            "query does not select {node_type}"
        );
    }

    let session = navigator.sessions().get("prog").unwrap();
    assert_eq!(session.interactions, 4);
    assert_eq!(session.state.zoom, ZoomLevel::Micro);
}

#[tokio::test]
async fn test_cache_hit_is_idempotent_faster_and_writes_no_provenance() {
    let endpoint = Arc::new(RecordingSparqlEndpoint::new());
    endpoint.set_default_result(results_from_rows(vec![node_row(
        "http://example.org/n1",
        "Einstein",
        "physicist",
    )]));
    endpoint.set_select_delay(Duration::from_millis(50));
    let navigator = navigator_over(Arc::clone(&endpoint));

    let request = params("einstein", ZoomLevel::Entity);

    let first_started = Instant::now();
    let first = navigator
        .navigate(&request, Some("cached".to_string()))
        .await
        .unwrap();
    let first_elapsed = first_started.elapsed();

    let second_started = Instant::now();
    let second = navigator
        .navigate(&request, Some("cached".to_string()))
        .await
        .unwrap();
    let second_elapsed = second_started.elapsed();

    // bytewise-identical result payloads
    assert_eq!(
        serde_json::to_string(&first.corpuscles).unwrap(),
        serde_json::to_string(&second.corpuscles).unwrap()
    );
    assert!(!first.metadata.from_cache);
    assert!(second.metadata.from_cache);
    assert!(second_elapsed < first_elapsed);

    // one navigation SELECT reached the endpoint (the other is the
    // session-restore probe), and exactly one NavigationView was recorded:
    // cache hits bypass the provenance write
    let nav_selects = endpoint
        .selects()
        .iter()
        .filter(|query| !query.contains("zpt:NavigationSession"))
        .count();
    assert_eq!(nav_selects, 1);
    assert_eq!(endpoint.updates_containing("zpt:NavigationView").len(), 1);

    // the session trail still logs both calls
    let session = navigator.sessions().get("cached").unwrap();
    assert_eq!(session.interactions, 2);
    assert!(session.history[1].from_cache);
}

#[tokio::test]
async fn test_pan_filters_intersect_in_one_query() {
    let endpoint = Arc::new(RecordingSparqlEndpoint::new());
    let navigator = navigator_over(Arc::clone(&endpoint));

    let request = NavigationParams {
        query: "ai in 2024".to_string(),
        zoom: ZoomLevel::Unit,
        pan: PanFilter {
            domains: vec!["ai".to_string()],
            keywords: Vec::new(),
            entities: Vec::new(),
            temporal: Some(TemporalRange {
                start: Some("2024-01-01".to_string()),
                end: None,
            }),
        },
        tilt: TiltProjection::Keywords,
    };
    navigator.navigate(&request, None).await.unwrap();

    let query = &endpoint.selects()[0];
    // both dimensions are present as independent conjunctive filters
    assert!(query.contains(r#"CONTAINS(LCASE(COALESCE(?content, "")), "ai")"#));
    assert!(query.contains(r#"?created >= "2024-01-01T00:00:00Z"^^xsd:dateTime"#));
}

#[tokio::test]
async fn test_provenance_failure_is_non_fatal() {
    let endpoint = Arc::new(RecordingSparqlEndpoint::new());
    endpoint.set_default_result(results_from_rows(vec![node_row(
        "http://example.org/n1",
        "a",
        "b",
    )]));
    endpoint.fail_updates(true);
    let navigator = navigator_over(Arc::clone(&endpoint));

    let outcome = navigator
        .navigate(&params("q", ZoomLevel::Entity), None)
        .await
        .unwrap();
    assert_eq!(outcome.corpuscles.len(), 1);
}

#[tokio::test]
async fn test_session_restores_from_graph_blob() {
    // persist a session through one store, then restore it through another
    // that only shares the endpoint
    let endpoint = Arc::new(RecordingSparqlEndpoint::new());

    let mut session = NavigationSession::new("restore-me".to_string());
    session.record_view(semem_core::zpt::NavigationView {
        params: NavigationParams {
            query: "last query".to_string(),
            zoom: ZoomLevel::Community,
            pan: PanFilter {
                domains: vec!["ai".to_string()],
                ..PanFilter::default()
            },
            tilt: TiltProjection::Temporal,
        },
        result_count: 5,
        response_time_ms: 20,
        from_cache: false,
        timestamp: chrono::Utc::now(),
    });

    let store_a = SessionStore::new(
        Some(Arc::clone(&endpoint) as Arc<dyn SparqlEndpoint>),
        SESSION_GRAPH.to_string(),
    );
    store_a.persist(&session).await.unwrap();
    assert_eq!(endpoint.updates_containing("zpt:NavigationSession").len(), 1);

    // script the restore SELECT to return the stored blob
    let blob = serde_json::to_string(&session).unwrap();
    let mut row = semem_core::sparql::Binding::new();
    row.insert("blob".to_string(), RdfTerm::literal(blob));
    endpoint.push_result(results_from_rows(vec![row]));

    let store_b = SessionStore::new(
        Some(Arc::clone(&endpoint) as Arc<dyn SparqlEndpoint>),
        SESSION_GRAPH.to_string(),
    );
    let restored = store_b.initialize(Some("restore-me".to_string())).await;

    assert_eq!(restored.state.zoom, ZoomLevel::Community);
    assert_eq!(restored.state.tilt, TiltProjection::Temporal);
    assert_eq!(restored.state.pan.domains, vec!["ai"]);
    assert_eq!(restored.state.last_query.as_deref(), Some("last query"));
    assert_eq!(restored.interactions, 1);
}

#[tokio::test]
async fn test_unparseable_blob_yields_fresh_session() {
    let endpoint = Arc::new(RecordingSparqlEndpoint::new());
    let mut row = semem_core::sparql::Binding::new();
    row.insert("blob".to_string(), RdfTerm::literal("{not valid json"));
    endpoint.push_result(results_from_rows(vec![row]));

    let store = SessionStore::new(
        Some(Arc::clone(&endpoint) as Arc<dyn SparqlEndpoint>),
        SESSION_GRAPH.to_string(),
    );
    let session = store.initialize(Some("broken".to_string())).await;

    assert_eq!(session.interactions, 0);
    assert!(session.history.is_empty());
}
