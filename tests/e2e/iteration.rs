//! Iterative refinement through the engine facade.

use std::sync::Arc;

use semem_core::api::SememEngine;
use semem_core::config::{Config, MemorySettings};
use semem_core::iterate::{IterationInput, ResearchOutcome, ResearchProvider};
use semem_core::sparql::SparqlEndpoint;
use semem_core::Result;
use test_utils::{MockChatProvider, MockEmbeddingProvider, RecordingSparqlEndpoint};

struct CountingResearch {
    calls: counter::Counter,
}

// tests only need an atomic call counter; keep it dependency-free
mod counter {
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    pub struct Counter(AtomicUsize);

    impl Counter {
        pub fn bump(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }

        pub fn get(&self) -> usize {
            self.0.load(Ordering::SeqCst)
        }
    }
}

#[async_trait::async_trait]
impl ResearchProvider for CountingResearch {
    async fn research(&self, questions: &[String]) -> Result<ResearchOutcome> {
        self.calls.bump();
        Ok(ResearchOutcome {
            success: true,
            entities_per_question: vec![4; questions.len()],
            concepts_per_question: vec![6; questions.len()],
            details: vec![
                "Einstein joined the Institute for Advanced Study at Princeton in 1933."
                    .to_string(),
            ],
        })
    }
}

fn engine_with_research(
    chat: Arc<MockChatProvider>,
    research: Arc<CountingResearch>,
    endpoint: Arc<RecordingSparqlEndpoint>,
) -> SememEngine {
    let config = Config {
        memory: MemorySettings {
            dimension: 16,
            ..MemorySettings::default()
        },
        ..Config::default()
    };
    SememEngine::with_components(
        config,
        chat,
        Arc::new(MockEmbeddingProvider::new(16)),
        Some(endpoint as Arc<dyn SparqlEndpoint>),
        Some(research as Arc<dyn ResearchProvider>),
    )
    .unwrap()
}

#[tokio::test]
async fn test_refinement_researches_follow_ups_and_lengthens_answer() {
    let chat = Arc::new(MockChatProvider::new(""));
    let research = Arc::new(CountingResearch {
        calls: counter::Counter::default(),
    });
    let endpoint = Arc::new(RecordingSparqlEndpoint::new());
    let engine = engine_with_research(
        Arc::clone(&chat),
        Arc::clone(&research),
        Arc::clone(&endpoint),
    );

    // iteration 1: incomplete, one follow-up
    chat.push_reply(
        r#"{"score": 0.35, "reasoning": "institutions missing", "followUps": ["Which institutions did Einstein work at?"]}"#,
    );
    // enhanced synthesis
    chat.push_reply("Einstein was a physicist who worked at Princeton.");
    // iteration 2: complete
    chat.push_reply(r#"{"score": 0.92, "reasoning": "complete now", "followUps": []}"#);
    // final synthesis
    chat.push_reply(
        "Einstein was a physicist whose career spanned Bern, Berlin, and Princeton's Institute for Advanced Study.",
    );

    let initial = "Einstein was a physicist.";
    let outcome = engine
        .iterate(
            IterationInput {
                question: "Summarize Einstein's career and institutions.".to_string(),
                initial_response: initial.to_string(),
                context: None,
            },
            None,
        )
        .await;

    assert!(outcome.success);
    assert_eq!(research.calls.get(), 1);
    assert!(outcome.result.final_answer.len() > initial.len());
    assert!(outcome.result.final_answer.contains("Princeton"));
    assert!(outcome.result.metadata.research_performed);
    assert!(!outcome.result.metadata.error_occurred);

    // at least one non-complete iteration ran before completion
    assert!(outcome
        .result
        .iterations
        .iter()
        .any(|record| record.completeness_score.unwrap_or(1.0) < 0.8));

    // follow-ups were persisted as first-class question nodes
    assert_eq!(
        endpoint.updates_containing("semem:FollowUpQuestion").len(),
        1
    );
    // and annotated with what research found
    assert_eq!(endpoint.updates_containing("semem:entitiesFound").len(), 1);

    engine.shutdown(false).await;
}

#[tokio::test]
async fn test_failed_research_keeps_prior_answer() {
    struct FailingResearch;

    #[async_trait::async_trait]
    impl ResearchProvider for FailingResearch {
        async fn research(&self, _questions: &[String]) -> Result<ResearchOutcome> {
            Err(semem_core::Error::Http("research endpoint down".to_string()))
        }
    }

    let chat = Arc::new(MockChatProvider::new(
        r#"{"score": 0.2, "reasoning": "gaps", "followUps": ["q1?"]}"#,
    ));
    let config = Config {
        memory: MemorySettings {
            dimension: 16,
            ..MemorySettings::default()
        },
        ..Config::default()
    };
    let engine = SememEngine::with_components(
        config,
        chat,
        Arc::new(MockEmbeddingProvider::new(16)),
        None,
        Some(Arc::new(FailingResearch) as Arc<dyn ResearchProvider>),
    )
    .unwrap();

    let outcome = engine
        .iterate(
            IterationInput {
                question: "q".to_string(),
                initial_response: "the initial answer".to_string(),
                context: None,
            },
            None,
        )
        .await;

    // every iteration recorded the research failure; the answer survives
    assert_eq!(outcome.result.final_answer, "the initial answer");
    assert!(outcome.result.metadata.error_occurred);
    assert!(outcome
        .result
        .iterations
        .iter()
        .all(|record| !record.success));

    engine.shutdown(false).await;
}
