//! Integration tests for log redaction.

use deckflow_app::redact_sensitive;

#[test]
fn log_redaction_tests_removes_obvious_secret_markers() {
    let raw = "authorization=Bearer abc123";
    let redacted = redact_sensitive(raw);

    assert!(redacted.contains("<redacted>"));
    assert!(!redacted.contains("abc123"));
}

#[test]
fn log_redaction_tests_masks_api_keys_in_server_details() {
    let raw = "Error code: 401 - Incorrect API key provided: sk-proj-AbC123xyz";
    let redacted = redact_sensitive(raw);

    assert!(!redacted.contains("AbC123xyz"));
    assert!(redacted.starts_with("Error code: 401 - Incorrect API key provided: sk-"));
}

#[test]
fn log_redaction_tests_keeps_plain_messages() {
    let raw = "Generation complete. Generated 12 cards.";
    assert_eq!(redact_sensitive(raw), raw);
}
