#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_docs_in_private_items)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::float_cmp)]

//! # Semem Core
//!
//! Navigation and memory retrieval engine for a semantic memory service:
//! a two-tier memory over an RDF knowledge graph, with embedding-based
//! similarity, concept extraction, Zoom-Pan-Tilt navigation, and iterative
//! answer refinement.
//!
//! ## Core Concepts
//!
//! - **Interactions**: recorded exchanges with embeddings, concepts, and
//!   access statistics, promoted from a bounded short-term working set into
//!   long-term memory
//! - **Corpuscles**: retrieval units returned by navigation — a knowledge
//!   node plus its ZPT-projected attributes
//! - **ZPT navigation**: zoom picks granularity, pan filters the corpus,
//!   tilt chooses the analytic projection
//! - **Iterative refinement**: completeness analysis, follow-up research,
//!   and enhanced synthesis over an initial answer
//!
//! ## Module Organization
//!
//! ### Primary APIs
//! - [`api`]: the `tell` / `ask` / `augment` / `navigate` / `iterate` facade
//! - [`memory`]: two-tier memory store and composite-scored retrieval
//! - [`zpt`]: navigation parameters, query building, sessions, navigator
//! - [`iterate`]: the answer-refinement controller
//!
//! ### Support Modules
//! - [`embeddings`]: provider trait, similarity, and the embedding service
//! - [`llm`]: chat providers
//! - [`providers`]: capability- and priority-based provider registry
//! - [`concepts`]: concept extraction and URI minting
//! - [`cache`]: query cache, memory-data cache, debounced persistence
//! - [`sparql`]: endpoint clients, query builder, JSON results
//! - [`storage`]: memory / JSON / SPARQL persistence backends
//! - [`config`]: typed configuration with environment resolution
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::collections::HashMap;
//! use semem_core::api::{SememEngine, TellType};
//! use semem_core::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> semem_core::Result<()> {
//!     let config = Config::load(std::path::Path::new("config.toml"))?;
//!     let engine = SememEngine::from_config(config)?;
//!
//!     engine
//!         .tell(
//!             "Einstein developed relativity at Princeton in 1915.",
//!             TellType::Document,
//!             &HashMap::new(),
//!         )
//!         .await;
//!
//!     let outcome = engine.ask("Where did Einstein work?", None).await;
//!     println!("{}", outcome.answer);
//!
//!     engine.shutdown(true).await;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cache;
pub mod concepts;
pub mod config;
pub mod constants;
pub mod embeddings;
pub mod error;
pub mod iterate;
pub mod llm;
pub mod memory;
pub mod providers;
pub mod retry;
pub mod sparql;
pub mod storage;
pub mod zpt;

// Re-export commonly used types
pub use api::{AskOutcome, AugmentOutcome, IterateOutcome, NavigateOutcome, SememEngine, TellOutcome, TellType};
pub use cache::{derive_key, CacheMetrics, DebouncedPersister, MemoryDataCache, QueryCache};
pub use concepts::{concept_uri, ConceptExtractor};
pub use config::Config;
pub use embeddings::{EmbeddingProvider, EmbeddingService};
pub use error::{Error, Result};
pub use iterate::{
    IterationController, IterationInput, IterationOptions, IterationResult, ResearchOutcome,
    ResearchProvider,
};
pub use llm::ChatProvider;
pub use memory::{Interaction, MemoryStore, MemoryTier, ScoredInteraction};
pub use providers::{Capability, ProviderRegistry};
pub use retry::{RetryConfig, RetryPolicy};
pub use sparql::{HttpSparqlClient, SparqlEndpoint, SparqlResults};
pub use storage::StorageBackend;
pub use zpt::{
    Corpuscle, NavigationParams, NavigationSession, PanFilter, TiltProjection, ZptNavigator,
    ZoomLevel,
};
