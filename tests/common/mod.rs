/*!
 * Common test utilities for the hfspaces-translate test suite
 */

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tempfile::TempDir;

use hfspaces_translate::{BatchTranslationClient, Config, ModelRegistry};


use self::mock_providers::{MockInference, MockSpaceConnector};

/// Route engine logs to the test output; safe to call from every test
pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Path of a config file inside `dir` that does not exist yet
pub fn config_path_in(dir: &TempDir) -> PathBuf {
    dir.path().join("nested").join("conf.json")
}

/// Convert string literals into owned texts
pub fn texts(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// A config with an inference key set
pub fn config_with_api_key() -> Config {
    Config {
        api_key: Some("hf_test_token".to_string()),
        ..Config::default()
    }
}

/// Engine wired to the given mocks and the builtin models
pub fn engine_with(
    config: Config,
    inference: &Arc<MockInference>,
    connector: &Arc<MockSpaceConnector>,
) -> BatchTranslationClient {
    engine_with_registry(config, ModelRegistry::builtin().clone(), inference, connector)
}

/// Engine wired to the given mocks and a custom registry
pub fn engine_with_registry(
    config: Config,
    registry: ModelRegistry,
    inference: &Arc<MockInference>,
    connector: &Arc<MockSpaceConnector>,
) -> BatchTranslationClient {
    BatchTranslationClient::with_transports(
        config,
        Arc::new(registry),
        inference.clone(),
        connector.clone(),
    )
}

/// Registry with one Space that needs the Spaces key
pub fn restricted_registry() -> ModelRegistry {
    ModelRegistry::new().with_space("private-chat", "owner/private-chat", true)
}
