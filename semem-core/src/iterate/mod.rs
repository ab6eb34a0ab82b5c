//! Iterative answer refinement
//!
//! Runs the analyze → follow-ups → research → synthesize loop: the chat
//! provider scores the current answer's completeness and proposes follow-up
//! questions, an external research collaborator chases them, and an
//! enhanced synthesis folds the findings back in. Any single step's failure
//! is captured into the iteration record and the loop continues with the
//! prior answer.

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::concepts::salvage;
use crate::constants::{defaults, vocab};
use crate::error::{Error, Result};
use crate::llm::ChatProvider;
use crate::sparql::builder::{insert_data, typed_literal, uri_ref, TripleBlock};
use crate::sparql::SparqlEndpoint;

/// Tunables for one refinement run
#[derive(Debug, Clone)]
pub struct IterationOptions {
    pub max_iterations: usize,
    pub completeness_threshold: f32,
    pub max_follow_ups: usize,
    /// Optional wall-clock budget; when exceeded the loop short-circuits to
    /// finalization
    pub time_budget: Option<Duration>,
}

impl Default for IterationOptions {
    fn default() -> Self {
        Self {
            max_iterations: defaults::MAX_ITERATIONS,
            completeness_threshold: defaults::COMPLETENESS_THRESHOLD,
            max_follow_ups: defaults::MAX_FOLLOW_UPS,
            time_budget: None,
        }
    }
}

/// Input to one refinement run
#[derive(Debug, Clone)]
pub struct IterationInput {
    pub question: String,
    pub initial_response: String,
    pub context: Option<String>,
}

/// Completeness verdict for one iteration
#[derive(Debug, Clone, Serialize)]
pub struct CompletenessAnalysis {
    pub score: f32,
    pub reasoning: String,
    pub follow_ups: Vec<String>,
}

/// What the research collaborator found per follow-up batch
#[derive(Debug, Clone, Default)]
pub struct ResearchOutcome {
    pub success: bool,
    pub entities_per_question: Vec<usize>,
    pub concepts_per_question: Vec<usize>,
    pub details: Vec<String>,
}

/// External research collaborator (e.g. an encyclopedic endpoint wrapper)
#[async_trait]
pub trait ResearchProvider: Send + Sync {
    /// Research a batch of follow-up questions.
    ///
    /// # Errors
    ///
    /// Returns the collaborator's error; the controller isolates it into
    /// the iteration record.
    async fn research(&self, questions: &[String]) -> Result<ResearchOutcome>;
}

/// Record of one loop iteration
#[derive(Debug, Clone, Serialize)]
pub struct IterationRecord {
    pub iteration: usize,
    pub success: bool,
    pub completeness_score: Option<f32>,
    pub reasoning: Option<String>,
    pub follow_ups: Vec<String>,
    pub research_succeeded: bool,
    pub error: Option<String>,
}

/// Metadata summarizing one refinement run
#[derive(Debug, Clone, Serialize)]
pub struct IterationMetadata {
    pub iterations_run: usize,
    pub research_performed: bool,
    pub error_occurred: bool,
    pub elapsed_ms: u64,
}

/// Outcome of one refinement run
#[derive(Debug, Clone, Serialize)]
pub struct IterationResult {
    pub final_answer: String,
    pub iterations: Vec<IterationRecord>,
    pub metadata: IterationMetadata,
}

const ANALYZE_PROMPT: &str = "Assess how completely the answer below addresses the question. \
Respond with only a JSON object of the form \
{\"score\": 0.0, \"reasoning\": \"...\", \"followUps\": [\"...\"]} where score is a \
completeness value between 0 and 1 and followUps lists at most {max} follow-up \
questions that would close the gaps.\n\nQuestion: {question}\n\nAnswer: {answer}";

const SYNTHESIZE_PROMPT: &str = "Improve the answer below using the research findings. \
Keep everything that is already correct and fold in the new information.\n\n\
Question: {question}\n\nCurrent answer: {answer}\n\nResearch findings:\n{findings}";

const FINALIZE_PROMPT: &str = "Produce the final, consolidated answer to the question using \
the refined answer below. Respond with the answer text only.\n\n\
Question: {question}\n\nRefined answer: {answer}";

/// Analyze → follow-ups → research → synthesize controller
pub struct IterationController {
    chat: Arc<dyn ChatProvider>,
    research: Option<Arc<dyn ResearchProvider>>,
    endpoint: Option<Arc<dyn SparqlEndpoint>>,
    graph: String,
    options: IterationOptions,
}

impl IterationController {
    #[must_use]
    pub fn new(
        chat: Arc<dyn ChatProvider>,
        research: Option<Arc<dyn ResearchProvider>>,
        endpoint: Option<Arc<dyn SparqlEndpoint>>,
        graph: String,
        options: IterationOptions,
    ) -> Self {
        Self {
            chat,
            research,
            endpoint,
            graph,
            options,
        }
    }

    /// Run the refinement loop to completion.
    ///
    /// Never fails across the boundary: every step error is isolated into
    /// its iteration record and the best prior answer survives.
    pub async fn process(&self, input: IterationInput) -> IterationResult {
        let started = Instant::now();
        let question_uri = format!("{}/question/{}", vocab::URI_BASE, Uuid::new_v4());

        let mut current_answer = input.initial_response.clone();
        let mut iterations: Vec<IterationRecord> = Vec::new();
        let mut research_performed = false;
        let mut any_research_succeeded = false;

        for iteration in 1..=self.options.max_iterations {
            if let Some(budget) = self.options.time_budget {
                if started.elapsed() >= budget {
                    tracing::info!("iteration budget exhausted, finalizing early");
                    break;
                }
            }

            let analysis = match self.analyze(&input.question, &current_answer).await {
                Ok(analysis) => analysis,
                Err(e) => {
                    tracing::warn!("completeness analysis failed: {}", e);
                    iterations.push(failed_record(iteration, &e));
                    continue;
                }
            };

            if analysis.score >= self.options.completeness_threshold {
                iterations.push(IterationRecord {
                    iteration,
                    success: true,
                    completeness_score: Some(analysis.score),
                    reasoning: Some(analysis.reasoning),
                    follow_ups: Vec::new(),
                    research_succeeded: false,
                    error: None,
                });
                break;
            }

            if analysis.follow_ups.is_empty() {
                iterations.push(IterationRecord {
                    iteration,
                    success: true,
                    completeness_score: Some(analysis.score),
                    reasoning: Some(analysis.reasoning),
                    follow_ups: Vec::new(),
                    research_succeeded: false,
                    error: None,
                });
                break;
            }

            self.persist_follow_ups(&question_uri, &analysis.follow_ups)
                .await;

            let research = match &self.research {
                Some(provider) => {
                    research_performed = true;
                    match provider.research(&analysis.follow_ups).await {
                        Ok(outcome) => outcome,
                        Err(e) => {
                            tracing::warn!("research step failed: {}", e);
                            iterations.push(IterationRecord {
                                iteration,
                                success: false,
                                completeness_score: Some(analysis.score),
                                reasoning: Some(analysis.reasoning),
                                follow_ups: analysis.follow_ups,
                                research_succeeded: false,
                                error: Some(e.to_string()),
                            });
                            continue;
                        }
                    }
                }
                None => ResearchOutcome::default(),
            };
            any_research_succeeded |= research.success;
            self.mark_researched(&question_uri, &analysis.follow_ups, &research)
                .await;

            match self
                .synthesize(&input.question, &current_answer, &research)
                .await
            {
                Ok(enhanced) => {
                    current_answer = enhanced;
                    iterations.push(IterationRecord {
                        iteration,
                        success: true,
                        completeness_score: Some(analysis.score),
                        reasoning: Some(analysis.reasoning),
                        follow_ups: analysis.follow_ups,
                        research_succeeded: research.success,
                        error: None,
                    });
                }
                Err(e) => {
                    tracing::warn!("enhanced synthesis failed: {}", e);
                    iterations.push(IterationRecord {
                        iteration,
                        success: false,
                        completeness_score: Some(analysis.score),
                        reasoning: Some(analysis.reasoning),
                        follow_ups: analysis.follow_ups,
                        research_succeeded: research.success,
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        let mut error_occurred = iterations.iter().any(|record| !record.success);
        let final_answer = if any_research_succeeded {
            match self.finalize(&input.question, &current_answer).await {
                Ok(answer) => answer,
                Err(e) => {
                    tracing::warn!("final synthesis failed, keeping refined answer: {}", e);
                    error_occurred = true;
                    current_answer.clone()
                }
            }
        } else {
            current_answer.clone()
        };

        IterationResult {
            final_answer,
            metadata: IterationMetadata {
                iterations_run: iterations.len(),
                research_performed,
                error_occurred,
                elapsed_ms: started.elapsed().as_millis() as u64,
            },
            iterations,
        }
    }

    async fn analyze(&self, question: &str, answer: &str) -> Result<CompletenessAnalysis> {
        let prompt = ANALYZE_PROMPT
            .replace("{max}", &self.options.max_follow_ups.to_string())
            .replace("{question}", question)
            .replace("{answer}", answer);
        let reply = self.chat.generate(&prompt, None).await?;

        let object = salvage::first_json_object(&reply)
            .ok_or_else(|| Error::Parse("no JSON object in completeness analysis".to_string()))?;

        let score = object
            .get("score")
            .and_then(serde_json::Value::as_f64)
            .ok_or_else(|| Error::Parse("completeness analysis has no numeric score".to_string()))?
            .clamp(0.0, 1.0) as f32;

        let reasoning = object
            .get("reasoning")
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default()
            .to_string();

        let follow_ups = object
            .get("followUps")
            .and_then(serde_json::Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| item.as_str())
                    .map(ToString::to_string)
                    .take(self.options.max_follow_ups)
                    .collect()
            })
            .unwrap_or_default();

        Ok(CompletenessAnalysis {
            score,
            reasoning,
            follow_ups,
        })
    }

    async fn synthesize(
        &self,
        question: &str,
        answer: &str,
        research: &ResearchOutcome,
    ) -> Result<String> {
        let findings = if research.details.is_empty() {
            "No research findings were produced.".to_string()
        } else {
            research.details.join("\n")
        };
        let prompt = SYNTHESIZE_PROMPT
            .replace("{question}", question)
            .replace("{answer}", answer)
            .replace("{findings}", &findings);
        self.chat.generate(&prompt, None).await
    }

    async fn finalize(&self, question: &str, answer: &str) -> Result<String> {
        let prompt = FINALIZE_PROMPT
            .replace("{question}", question)
            .replace("{answer}", answer);
        self.chat.generate(&prompt, None).await
    }

    /// Persist each follow-up as a first-class node linked to the original
    /// question. Failures are logged and non-fatal.
    async fn persist_follow_ups(&self, question_uri: &str, follow_ups: &[String]) {
        let Some(endpoint) = &self.endpoint else {
            return;
        };

        let mut block = TripleBlock::new();
        for follow_up in follow_ups {
            let follow_up_uri = format!("{}/question/{}", vocab::URI_BASE, Uuid::new_v4());
            block
                .push(&follow_up_uri, "rdf:type", "semem:FollowUpQuestion")
                .push_literal(&follow_up_uri, "semem:questionText", follow_up)
                .push(&follow_up_uri, "prov:wasDerivedFrom", &uri_ref(question_uri))
                .push(
                    &follow_up_uri,
                    "dcterms:created",
                    &typed_literal(&Utc::now().to_rfc3339(), "dateTime"),
                );
        }

        if let Err(e) = endpoint
            .update(&insert_data(&self.graph, &block.render()))
            .await
        {
            tracing::warn!("could not persist follow-up questions: {}", e);
        }
    }

    /// Annotate the original question with what research found per
    /// follow-up. Failures are logged and non-fatal.
    async fn mark_researched(
        &self,
        question_uri: &str,
        follow_ups: &[String],
        research: &ResearchOutcome,
    ) {
        let Some(endpoint) = &self.endpoint else {
            return;
        };
        if !research.success {
            return;
        }

        let mut block = TripleBlock::new();
        for (i, _) in follow_ups.iter().enumerate() {
            let entities = research.entities_per_question.get(i).copied().unwrap_or(0);
            let concepts = research.concepts_per_question.get(i).copied().unwrap_or(0);
            block
                .push(
                    question_uri,
                    "semem:entitiesFound",
                    &typed_literal(&entities.to_string(), "integer"),
                )
                .push(
                    question_uri,
                    "semem:conceptsFound",
                    &typed_literal(&concepts.to_string(), "integer"),
                );
        }

        if let Err(e) = endpoint
            .update(&insert_data(&self.graph, &block.render()))
            .await
        {
            tracing::warn!("could not mark follow-ups researched: {}", e);
        }
    }
}

fn failed_record(iteration: usize, error: &Error) -> IterationRecord {
    IterationRecord {
        iteration,
        success: false,
        completeness_score: None,
        reasoning: None,
        follow_ups: Vec::new(),
        research_succeeded: false,
        error: Some(error.to_string()),
    }
}
