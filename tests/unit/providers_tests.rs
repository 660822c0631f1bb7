/*!
 * Tests for the mock transports and request types
 */

use std::sync::Arc;

use hfspaces_translate::errors::ProviderError;
use hfspaces_translate::providers::inference::ChatCompletionRequest;
use hfspaces_translate::providers::spaces::PredictRequest;
use hfspaces_translate::providers::{InferenceProvider, SpaceClient, SpaceConnector};

use crate::common::mock_providers::{echo_items, MockInference, MockSpaceConnector};

#[test]
fn test_echoItems_shouldKeepOnlyNumberedLines() {
    let prompt = "Translate the following 2 items:\n\n1. \"a\"\n2. \"b\"";
    assert_eq!(echo_items(prompt), "1. \"a\"\n2. \"b\"");
}

#[tokio::test]
async fn test_mockInference_failNextCall_shouldFailOnce() {
    let mock = MockInference::replying("1. ok");
    mock.fail_next_call();

    let request = || ChatCompletionRequest::new("Qwen/QwQ-32B").add_message("user", "1. \"x\"");
    let first = mock.chat_completion("hf_token", request()).await;
    assert!(matches!(first, Err(ProviderError::ApiError { status_code: 503, .. })));

    let second = mock.chat_completion("hf_token", request()).await.unwrap();
    assert_eq!(second.text(), "1. ok");
    assert_eq!(mock.call_count(), 2);
}

#[tokio::test]
async fn test_mockSpaceConnector_shouldRecordConnections() {
    let connector = Arc::new(MockSpaceConnector::new());
    let client = connector.connect("owner/space", Some("hf_space")).await.unwrap();

    let response = client
        .predict("/chat", PredictRequest::new("1. \"Hi\"", "Translate."))
        .await
        .unwrap();

    assert_eq!(response.data.len(), 1);
    assert_eq!(connector.connections(), vec!["owner/space"]);
    assert_eq!(connector.tokens(), vec![Some("hf_space".to_string())]);
    assert_eq!(connector.predict_count(), 1);
}
