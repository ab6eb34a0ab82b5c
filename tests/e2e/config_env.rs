//! Configuration loading with environment resolution.

use semem_core::config::{Config, StorageType};
use serial_test::serial;

#[test]
#[serial]
fn test_template_substitution_with_defaults() {
    std::env::set_var("E2E_CFG_HOST", "h");
    std::env::remove_var("E2E_CFG_PORT");

    let config = Config::from_toml_str(
        r#"
        [storage]
        type = "json"

        [storage.options]
        path = "http://${E2E_CFG_HOST:-x}:${E2E_CFG_PORT:-1}"
        "#,
    )
    .unwrap();

    assert_eq!(config.storage.options.path.as_deref(), Some("http://h:1"));
    std::env::remove_var("E2E_CFG_HOST");
}

#[test]
#[serial]
fn test_semem_prefixed_overrides_apply_by_dotted_path() {
    std::env::set_var("SEMEM_STORAGE_TYPE", "memory");
    std::env::set_var("SEMEM_MEMORY_DIMENSION", "256");

    let config = Config::from_toml_str(
        r#"
        [storage]
        type = "json"
        [storage.options]
        path = "/tmp/store.json"

        [memory]
        dimension = 768
        "#,
    )
    .unwrap();

    assert_eq!(config.storage.kind, StorageType::Memory);
    assert_eq!(config.memory.dimension, 256);

    std::env::remove_var("SEMEM_STORAGE_TYPE");
    std::env::remove_var("SEMEM_MEMORY_DIMENSION");
}

#[test]
#[serial]
fn test_credentials_resolve_from_environment() {
    std::env::set_var("E2E_CFG_API_KEY", "sk-resolved");

    let config = Config::from_toml_str(
        r#"
        [[llm_providers]]
        type = "mistral"
        capabilities = ["chat"]
        priority = 1
        chat_model = "mistral-small-latest"
        api_key = "${E2E_CFG_API_KEY}"
        "#,
    )
    .unwrap();

    assert_eq!(
        config.llm_providers[0].api_key.as_deref(),
        Some("sk-resolved")
    );
    std::env::remove_var("E2E_CFG_API_KEY");
}

#[test]
#[serial]
fn test_validation_reports_every_problem_at_once() {
    std::env::remove_var("SEMEM_STORAGE_TYPE");
    let err = Config::from_toml_str(
        r#"
        [storage]
        type = "sparql"

        [memory]
        dimension = 0
        similarity_threshold = 3.0

        [[llm_providers]]
        type = "mistral"
        capabilities = []
        priority = 1
        "#,
    )
    .unwrap_err();

    let message = err.to_string();
    assert!(message.contains("memory.dimension"));
    assert!(message.contains("similarity_threshold"));
    assert!(message.contains("sparql storage requires"));
    assert!(message.contains("declares no capabilities"));
}
