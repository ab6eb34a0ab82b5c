//! Concept extractor behavior over malformed and marked-up LLM output.

use std::sync::Arc;

use semem_core::concepts::{concept_uri, ConceptExtractor};
use test_utils::MockChatProvider;

#[tokio::test]
async fn test_marked_json_array_is_salvaged() {
    let chat = Arc::new(MockChatProvider::new(""));
    chat.push_reply(r#"[JSON] ["a", "b"]"#);
    let extractor = ConceptExtractor::new(chat);

    assert_eq!(extractor.extract("some text").await, vec!["a", "b"]);
}

#[tokio::test]
async fn test_prose_reply_yields_empty_list() {
    let chat = Arc::new(MockChatProvider::new("No concepts"));
    let extractor = ConceptExtractor::new(chat);

    assert_eq!(extractor.extract("some text").await, Vec::<String>::new());
}

#[tokio::test]
async fn test_leading_prose_and_multiple_arrays() {
    let chat = Arc::new(MockChatProvider::new(""));
    chat.push_reply(r#"Here are the concepts: ["first"] and also ["second"]"#);
    let extractor = ConceptExtractor::new(chat);

    // the first complete array wins
    assert_eq!(extractor.extract("text").await, vec!["first"]);
}

#[tokio::test]
async fn test_duplicates_and_short_labels_filtered() {
    let chat = Arc::new(MockChatProvider::new(""));
    chat.push_reply(r#"["Gravity", "gravity", " gravity ", "x", "waves"]"#);
    let extractor = ConceptExtractor::new(chat);

    assert_eq!(extractor.extract("text").await, vec!["gravity", "waves"]);
}

#[test]
fn test_concept_uri_stable_across_processes() {
    // the URI is a pure function of the normalized label, so this constant
    // must never change
    assert_eq!(concept_uri("relativity"), concept_uri("  RELATIVITY  "));
    assert!(concept_uri("relativity").starts_with("http://hyperdata.it/semem/concept/"));
}
