/*!
 * Tests for multi-batch translation runs
 */

use std::sync::{Arc, Mutex};

use hfspaces_translate::{BatchTranslator, Config, FailureKind};

use crate::common::mock_providers::{echo_items, MockInference, MockSpaceConnector};
use crate::common::{engine_with, texts};

fn small_batches() -> Config {
    Config {
        max_request_length: 2,
        ..Config::default()
    }
}

#[tokio::test]
async fn test_translateAll_shouldSplitAndKeepOrder() {
    let inference = Arc::new(MockInference::new());
    let connector = Arc::new(MockSpaceConnector::new());
    let engine = Arc::new(engine_with(small_batches(), &inference, &connector));
    let translator = BatchTranslator::new(engine);
    let input = texts(&["one", "two", "three", "four", "five"]);

    let progress = Mutex::new(Vec::new());
    let result = translator
        .translate_all(&input, None, |done, total| progress.lock().unwrap().push((done, total)))
        .await
        .unwrap();

    assert_eq!(result, input);
    assert_eq!(connector.predict_count(), 3);
    assert_eq!(connector.connections().len(), 1);
    assert_eq!(progress.into_inner().unwrap(), vec![(1, 3), (2, 3), (3, 3)]);
}

#[tokio::test]
async fn test_translateAll_proseReply_shouldFailRun() {
    let inference = Arc::new(MockInference::new());
    let connector = Arc::new(MockSpaceConnector::with_generator(Arc::new(|prompt: &str| {
        if prompt.contains("broken") {
            "No idea.".to_string()
        } else {
            echo_items(prompt)
        }
    })));
    let engine = Arc::new(engine_with(small_batches(), &inference, &connector));
    let translator = BatchTranslator::new(engine);
    let input = texts(&["one", "two", "three", "four", "broken"]);

    let failure = translator
        .translate_all(&input, None, |_, _| {})
        .await
        .unwrap_err();

    // The last batch holds a single text, so the one-line reply must not pass
    assert_eq!(failure.kind, FailureKind::ParseMismatch);
    assert_eq!(failure.message, "Failed to parse: No idea.");
    assert_eq!(connector.predict_count(), 3);
}

#[test]
fn test_batches_shouldRespectMaxRequestLength() {
    let inference = Arc::new(MockInference::new());
    let connector = Arc::new(MockSpaceConnector::new());
    let engine = Arc::new(engine_with(Config::default(), &inference, &connector));
    let translator = BatchTranslator::new(engine);

    let input: Vec<String> = (0..60).map(|i| format!("line {}", i)).collect();
    let batches = translator.batches(&input);

    assert_eq!(batches.iter().map(Vec::len).collect::<Vec<_>>(), vec![25, 25, 10]);
    assert!(translator.batches(&[]).is_empty());
}
