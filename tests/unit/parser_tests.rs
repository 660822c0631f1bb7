/*!
 * Tests for reply parsing with replies shaped like real model output
 */

use hfspaces_translate::translation::{parse_response, project_reply};
use hfspaces_translate::PromptBuilder;
use serde_json::json;

use crate::common::texts;

#[test]
fn test_parseResponse_chattyReply_shouldRecoverItems() {
    let reply = "Sure! Here are the translations into French:\n\n\
                 1. \"Bonjour\"\n\
                 2. \"Le monde\"\n\n\
                 Let me know if you need anything else.";
    assert_eq!(parse_response(reply, 2), vec!["Bonjour", "Le monde"]);
}

#[test]
fn test_parseResponse_escapedLineBreak_shouldRestoreMultilineText() {
    let source = texts(&["Line one\nLine two", "Say \"hi\""]);
    let reply = PromptBuilder::format_items(&source);
    assert_eq!(parse_response(&reply, 2), source);
}

#[test]
fn test_parseResponse_fencedJsonArray_shouldBeAccepted() {
    let reply = "```json\n[\"Hola\", \"Mundo\"]\n```";
    assert_eq!(parse_response(reply, 2), vec!["Hola", "Mundo"]);
}

#[test]
fn test_parseResponse_cornerBrackets_shouldBeStripped() {
    let reply = "1. 「こんにちは」\n2. 「世界」";
    assert_eq!(parse_response(reply, 2), vec!["こんにちは", "世界"]);
}

#[test]
fn test_parseResponse_tooFewLines_shouldComeBackShort() {
    let reply = "1. Un\n2. Deux";
    assert_eq!(parse_response(reply, 3).len(), 2);
}

#[test]
fn test_parseResponse_singleLineRefusal_shouldYieldNothing() {
    assert!(parse_response("I'm sorry, I can't help with that.", 1).is_empty());
}

#[test]
fn test_projectReply_predictPayload_shouldTakeFirstDatum() {
    let payload = json!({ "data": ["1. \"Bonjour\"", { "meta": true }] });
    assert_eq!(project_reply(&payload), "1. \"Bonjour\"");
}
