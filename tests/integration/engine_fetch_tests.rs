/*!
 * End-to-end fetch scenarios through the engine with mock transports
 */

use std::sync::Arc;
use std::time::Duration;

use hfspaces_translate::{Config, FailureKind};

use crate::common::mock_providers::{MockInference, MockSpaceConnector};
use crate::common::{config_with_api_key, engine_with, init_test_logging, texts};

#[tokio::test]
async fn test_fetch_inferenceModel_shouldReturnTranslationsInOrder() {
    init_test_logging();
    let inference = Arc::new(MockInference::replying("1. Bonjour\n2. Monde"));
    let connector = Arc::new(MockSpaceConnector::new());
    let mut config = config_with_api_key();
    config.update_option("target_language", "French - FR").unwrap();
    let engine = engine_with(config, &inference, &connector);

    let result = engine
        .fetch(&texts(&["Hello", "World"]), Some("deepseek-ai/DeepSeek-V3"))
        .await
        .unwrap();

    assert_eq!(result, vec!["Bonjour", "Monde"]);
    let tracker = inference.tracker();
    let tracker = tracker.lock().unwrap();
    assert_eq!(tracker.call_count, 1);
    assert_eq!(tracker.last_token.as_deref(), Some("hf_test_token"));
    assert!(tracker.last_system_prompt.as_deref().unwrap().contains("French - FR"));
    assert!(tracker.last_prompt.as_deref().unwrap().contains("1. \"Hello\"\n2. \"World\""));
    assert!(connector.connections().is_empty());
}

#[tokio::test]
async fn test_fetch_spaceModel_shouldStripCommentary() {
    let inference = Arc::new(MockInference::new());
    let connector = Arc::new(MockSpaceConnector::replying(
        "Here are the translations:\n1. \"Hallo\"\n2. \"Welt\"",
    ));
    let engine = engine_with(Config::default(), &inference, &connector);

    let result = engine.fetch(&texts(&["Hello", "World"]), None).await.unwrap();

    assert_eq!(result, vec!["Hallo", "Welt"]);
    assert_eq!(connector.connections(), vec!["Nymbo/Command-R-Plus-08-2024"]);
    assert_eq!(connector.predict_count(), 1);
    assert_eq!(inference.call_count(), 0);
}

#[tokio::test]
async fn test_fetch_shortReply_shouldFailWithParseMismatch() {
    init_test_logging();
    let reply = "1. Un\n2. Deux";
    let inference = Arc::new(MockInference::replying(reply));
    let connector = Arc::new(MockSpaceConnector::new());
    let engine = engine_with(config_with_api_key(), &inference, &connector);

    let failure = engine
        .fetch(&texts(&["One", "Two", "Three"]), Some("Qwen/QwQ-32B"))
        .await
        .unwrap_err();

    assert_eq!(failure.kind, FailureKind::ParseMismatch);
    assert_eq!(failure.status, 200);
    assert!(failure.message.starts_with("Unexpected error: length 2 out of 3."));
    assert!(failure.message.contains(reply));
    assert!(!engine.is_aborted());
}

#[tokio::test]
async fn test_fetch_refusalForSingleText_shouldFailToParse() {
    let refusal = "I'm sorry, I can't help with that.";
    let inference = Arc::new(MockInference::replying(refusal));
    let connector = Arc::new(MockSpaceConnector::new());
    let engine = engine_with(config_with_api_key(), &inference, &connector);

    let failure = engine
        .fetch(&texts(&["Hello"]), Some("Qwen/QwQ-32B"))
        .await
        .unwrap_err();

    assert_eq!(failure.kind, FailureKind::ParseMismatch);
    assert_eq!(failure.status, 200);
    assert_eq!(failure.message, format!("Failed to parse: {}", refusal));
}

#[tokio::test]
async fn test_fetch_multilineProse_shouldNotPassAsTranslations() {
    let inference = Arc::new(MockInference::replying(
        "I cannot translate this.\nPlease try another request.",
    ));
    let connector = Arc::new(MockSpaceConnector::new());
    let engine = engine_with(config_with_api_key(), &inference, &connector);

    let failure = engine
        .fetch(&texts(&["One", "Two"]), Some("Qwen/QwQ-32B"))
        .await
        .unwrap_err();

    assert_eq!(failure.kind, FailureKind::ParseMismatch);
    assert!(failure.message.starts_with("Failed to parse: I cannot translate this."));
}

#[tokio::test]
async fn test_fetch_unknownModel_shouldFailWithoutNetwork() {
    let inference = Arc::new(MockInference::new());
    let connector = Arc::new(MockSpaceConnector::new());
    let engine = engine_with(config_with_api_key(), &inference, &connector);

    let failure = engine
        .fetch(&texts(&["Hello"]), Some("gpt-unknown"))
        .await
        .unwrap_err();

    assert_eq!(failure.kind, FailureKind::UnknownModel);
    assert_eq!(failure.status, 404);
    assert!(failure.message.contains("gpt-unknown"));
    assert_eq!(inference.call_count(), 0);
    assert!(connector.connections().is_empty());
}

#[tokio::test]
async fn test_fetch_missingApiKey_shouldAbortWithoutNetwork() {
    let inference = Arc::new(MockInference::new());
    let connector = Arc::new(MockSpaceConnector::new());
    let engine = engine_with(Config::default(), &inference, &connector);

    let failure = engine
        .fetch(&texts(&["Hello"]), Some("moonshotai/Kimi-K2-Instruct"))
        .await
        .unwrap_err();

    assert_eq!(failure.kind, FailureKind::MissingCredential);
    assert_eq!(failure.status, 400);
    assert!(failure.message.contains("api_key"));
    assert!(engine.is_aborted());
    assert_eq!(inference.call_count(), 0);
}

#[tokio::test]
async fn test_fetch_transportError_shouldHideDetails() {
    let inference = Arc::new(MockInference::new());
    inference.fail_next_call();
    let connector = Arc::new(MockSpaceConnector::new());
    let engine = engine_with(config_with_api_key(), &inference, &connector);

    let failure = engine
        .fetch(&texts(&["Hello"]), Some("google/gemma-3-27b-it"))
        .await
        .unwrap_err();

    assert_eq!(failure.kind, FailureKind::TransportFailure);
    assert_eq!(failure.status, 529);
    assert_eq!(failure.message, "Error while fetching.");
    assert!(!engine.is_aborted());

    // The next call goes through again
    let result = engine
        .fetch(&texts(&["Hello"]), Some("google/gemma-3-27b-it"))
        .await
        .unwrap();
    assert_eq!(result, vec!["Hello"]);
}

#[tokio::test]
async fn test_fetch_slowBackend_shouldTimeOut() {
    let inference = Arc::new(MockInference::new());
    inference.set_delay(Duration::from_secs(3));
    let connector = Arc::new(MockSpaceConnector::new());
    let config = Config {
        request_timeout_secs: 1,
        ..config_with_api_key()
    };
    let engine = engine_with(config, &inference, &connector);

    let failure = engine
        .fetch(&texts(&["Hello"]), Some("Qwen/QwQ-32B"))
        .await
        .unwrap_err();

    assert_eq!(failure.kind, FailureKind::Timeout);
    assert_eq!(failure.status, 504);
    assert_eq!(failure.message, "Timed out while waiting for a reply after 1s");
}

#[tokio::test]
async fn test_testConnection_shouldSendProbe() {
    let inference = Arc::new(MockInference::replying("Good evening to you too."));
    let connector = Arc::new(MockSpaceConnector::new());
    let engine = engine_with(config_with_api_key(), &inference, &connector);

    let reply = engine
        .test_connection(Some("deepseek-ai/DeepSeek-R1"))
        .await
        .unwrap();

    assert_eq!(reply, "Good evening to you too.");
    let tracker = inference.tracker();
    let tracker = tracker.lock().unwrap();
    assert_eq!(tracker.last_prompt.as_deref(), Some("Good evening."));
    assert_eq!(tracker.last_system_prompt.as_deref(), Some("Be as fast as possible."));
}

#[test]
fn test_fetch_emptyBatch_shouldResolveWithoutNetwork() {
    let inference = Arc::new(MockInference::new());
    let connector = Arc::new(MockSpaceConnector::new());
    let engine = engine_with(Config::default(), &inference, &connector);

    let result = tokio_test::block_on(async { engine.fetch(&[], Some("gpt-unknown")).await });

    assert_eq!(result.unwrap(), Vec::<String>::new());
    assert_eq!(inference.call_count(), 0);
    assert!(connector.connections().is_empty());
}
