//! Command-line front door for the semem engine
//!
//! One subcommand per inbound operation. Outcomes are printed as JSON so
//! the CLI composes with shell tooling.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::collections::HashMap;
use std::path::PathBuf;

use semem_core::api::{SememEngine, TellType};
use semem_core::config::Config;
use semem_core::iterate::{IterationInput, IterationOptions};
use semem_core::zpt::{NavigationParams, PanFilter, TemporalRange, TiltProjection, ZoomLevel};

#[derive(Parser)]
#[command(name = "semem")]
#[command(about = "Semantic memory engine: tell, ask, navigate, augment, iterate")]
#[command(version, long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest content into memory and the knowledge graph
    Tell {
        /// The content to ingest
        content: String,

        /// Content kind: document, interaction, concept, or fact
        #[arg(long = "type", default_value = "document")]
        kind: String,

        /// Optional source URI recorded with the content
        #[arg(long)]
        source: Option<String>,
    },
    /// Ask a question against memory and the knowledge graph
    Ask {
        question: String,

        /// Zoom level for the supporting navigation
        #[arg(long)]
        zoom: Option<String>,

        /// Tilt projection for the supporting navigation
        #[arg(long)]
        tilt: Option<String>,
    },
    /// Execute one ZPT navigation
    Navigate {
        /// Free-text query recorded in provenance
        #[arg(long, default_value = "")]
        query: String,

        #[arg(long, default_value = "entity")]
        zoom: String,

        #[arg(long, default_value = "keywords")]
        tilt: String,

        /// Domain filters (repeatable)
        #[arg(long = "domain")]
        domains: Vec<String>,

        /// Keyword filters (repeatable)
        #[arg(long = "keyword")]
        keywords: Vec<String>,

        /// Creation-date lower bound (YYYY-MM-DD)
        #[arg(long)]
        since: Option<String>,

        /// Session id for navigation continuity
        #[arg(long)]
        session: Option<String>,
    },
    /// Run a concept augmentation over text
    Augment {
        target: String,

        /// Operation: concepts or concept_embeddings
        #[arg(long, default_value = "concepts")]
        operation: String,
    },
    /// Iteratively refine an answer
    Iterate {
        question: String,

        /// The initial answer to refine
        #[arg(long)]
        initial: String,

        #[arg(long)]
        max_iterations: Option<usize>,
    },
}

/// A command with its parameters validated, ready to run against the engine
enum Operation {
    Tell {
        content: String,
        kind: TellType,
        metadata: HashMap<String, String>,
    },
    Ask {
        question: String,
        zpt: Option<NavigationParams>,
    },
    Navigate {
        params: NavigationParams,
        session: Option<String>,
    },
    Augment {
        target: String,
        operation: String,
    },
    Iterate {
        input: IterationInput,
        options: Option<IterationOptions>,
    },
}

/// Validate command parameters before the engine is assembled, so parameter
/// mistakes surface without provider or endpoint configuration.
fn parse_operation(command: Commands) -> Result<Operation> {
    Ok(match command {
        Commands::Tell {
            content,
            kind,
            source,
        } => {
            let kind = parse_tell_type(&kind)?;
            let mut metadata = HashMap::new();
            if let Some(source) = source {
                metadata.insert("source".to_string(), source);
            }
            Operation::Tell {
                content,
                kind,
                metadata,
            }
        }
        Commands::Ask {
            question,
            zoom,
            tilt,
        } => {
            let zpt = match (&zoom, &tilt) {
                (None, None) => None,
                _ => Some(NavigationParams {
                    query: question.clone(),
                    zoom: zoom
                        .as_deref()
                        .map(ZoomLevel::parse)
                        .transpose()?
                        .unwrap_or_default(),
                    pan: PanFilter::default(),
                    tilt: tilt
                        .as_deref()
                        .map(TiltProjection::parse)
                        .transpose()?
                        .unwrap_or_default(),
                }),
            };
            Operation::Ask { question, zpt }
        }
        Commands::Navigate {
            query,
            zoom,
            tilt,
            domains,
            keywords,
            since,
            session,
        } => Operation::Navigate {
            params: NavigationParams {
                query,
                zoom: ZoomLevel::parse(&zoom)?,
                pan: PanFilter {
                    domains,
                    keywords,
                    entities: Vec::new(),
                    temporal: since.map(|start| TemporalRange {
                        start: Some(start),
                        end: None,
                    }),
                },
                tilt: TiltProjection::parse(&tilt)?,
            },
            session,
        },
        Commands::Augment { target, operation } => Operation::Augment { target, operation },
        Commands::Iterate {
            question,
            initial,
            max_iterations,
        } => Operation::Iterate {
            input: IterationInput {
                question,
                initial_response: initial,
                context: None,
            },
            options: max_iterations.map(|max_iterations| IterationOptions {
                max_iterations,
                ..IterationOptions::default()
            }),
        },
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("cannot load config from {}", path.display()))?,
        None => Config::default(),
    };

    let operation = parse_operation(cli.command)?;
    let engine = SememEngine::from_config(config).context("cannot assemble engine")?;

    let output = match operation {
        Operation::Tell {
            content,
            kind,
            metadata,
        } => serde_json::to_value(engine.tell(&content, kind, &metadata).await)?,
        Operation::Ask { question, zpt } => {
            serde_json::to_value(engine.ask(&question, zpt).await)?
        }
        Operation::Navigate { params, session } => {
            serde_json::to_value(engine.navigate(&params, session).await)?
        }
        Operation::Augment { target, operation } => {
            serde_json::to_value(engine.augment(&target, &operation, &HashMap::new()).await)?
        }
        Operation::Iterate { input, options } => {
            serde_json::to_value(engine.iterate(input, options).await)?
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    engine.shutdown(true).await;
    Ok(())
}

fn parse_tell_type(value: &str) -> Result<TellType> {
    match value.to_lowercase().as_str() {
        "document" => Ok(TellType::Document),
        "interaction" => Ok(TellType::Interaction),
        "concept" => Ok(TellType::Concept),
        "fact" => Ok(TellType::Fact),
        other => anyhow::bail!("unknown tell type {other:?}"),
    }
}
