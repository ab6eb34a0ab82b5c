//! Concept extraction and URI minting
//!
//! The extractor prompts the chat provider with a fixed instruction and
//! salvages a concept list from whatever comes back. Malformed output
//! degrades to an empty list with a warning; it is never an error.

pub mod salvage;

use std::sync::Arc;

use crate::constants::vocab;
use crate::llm::ChatProvider;

/// Fixed instruction sent to the chat provider
const EXTRACTION_PROMPT: &str = "Extract the key concepts from the following text. \
Respond with only a JSON array of short concept strings, for example \
[\"relativity\", \"princeton\"].\n\nText:\n";

/// Extracts normalized concept labels from free text via the chat provider
pub struct ConceptExtractor {
    chat: Arc<dyn ChatProvider>,
}

impl ConceptExtractor {
    #[must_use]
    pub fn new(chat: Arc<dyn ChatProvider>) -> Self {
        Self { chat }
    }

    /// Extract concepts from `text`.
    ///
    /// Always returns a (possibly empty) list: provider failures and
    /// unparseable replies are logged and downgraded to `[]`.
    pub async fn extract(&self, text: &str) -> Vec<String> {
        let prompt = format!("{EXTRACTION_PROMPT}{text}");
        match self.chat.generate(&prompt, None).await {
            Ok(reply) => parse_concepts(&reply),
            Err(e) => {
                tracing::warn!("concept extraction failed, returning no concepts: {}", e);
                Vec::new()
            }
        }
    }
}

/// Salvage and normalize a concept list from raw LLM output.
///
/// Non-string array elements are dropped; labels are trimmed, lower-cased,
/// deduplicated in order, and must be at least 2 characters long.
#[must_use]
pub fn parse_concepts(reply: &str) -> Vec<String> {
    let Some(items) = salvage::first_json_array(reply) else {
        tracing::warn!("no JSON array found in concept extraction output");
        return Vec::new();
    };

    let mut seen = std::collections::HashSet::new();
    let mut concepts = Vec::new();
    for item in items {
        let Some(label) = item.as_str() else {
            continue;
        };
        let normalized = label.trim().to_lowercase();
        if normalized.chars().count() < 2 {
            continue;
        }
        if seen.insert(normalized.clone()) {
            concepts.push(normalized);
        }
    }
    concepts
}

/// Mint the deterministic URI for a concept label.
///
/// The label is normalized the same way [`parse_concepts`] does, so minting
/// is idempotent across ingests and process restarts.
#[must_use]
pub fn concept_uri(label: &str) -> String {
    let normalized = label.trim().to_lowercase();
    format!("{}/concept/{:016x}", vocab::URI_BASE, fnv1a(&normalized))
}

fn fnv1a(text: &str) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in text.as_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}
