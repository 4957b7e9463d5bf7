//! Success-response parsing with mandatory-field checks.

use deckflow_core::{CardCollection, SessionFileEntry, SessionHandle};
use serde::Deserialize;
use serde_json::Value;

use crate::{ContractError, ServerFailure};

/// One image reported by extraction.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ExtractedImage {
    /// Locator, possibly relative to the page origin.
    pub src: String,
    /// Server-side path.
    #[serde(default)]
    pub path: Option<String>,
    /// Server's initial selection hint.
    #[serde(default)]
    pub selected: Option<bool>,
}

impl ExtractedImage {
    /// Images start selected unless the server says otherwise.
    pub fn initially_selected(&self) -> bool {
        self.selected != Some(false)
    }
}

/// Parsed extraction response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionResponse {
    /// Extracted images in server order.
    pub images: Vec<ExtractedImage>,
    /// Session the backend stored the images under.
    pub session_id: Option<SessionHandle>,
}

/// Parsed generation response.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationResponse {
    /// Generated cards; may be empty.
    pub cards: CardCollection,
    /// Backend summary message.
    pub message: Option<String>,
    /// Session the backend stored the run under.
    pub session_id: Option<SessionHandle>,
}

/// Parsed packaging response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackagingResponse {
    /// Backend summary message.
    pub message: Option<String>,
    /// Server-side path of the package.
    pub file_path: Option<String>,
    /// Session the package belongs to.
    pub session_id: Option<SessionHandle>,
}

/// Parsed file listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileListing {
    /// Files in server order.
    pub files: Vec<SessionFileEntry>,
}

/// Parsed cleanup acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupResponse {
    /// Backend message, typically announcing the deletion delay.
    pub message: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    images: Option<Vec<ExtractedImage>>,
    #[serde(default)]
    cards: Option<CardCollection>,
    #[serde(default)]
    files: Option<Vec<SessionFileEntry>>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    file_path: Option<String>,
    #[serde(default)]
    session_id: Option<String>,
}

fn decode(raw: &str) -> Result<(Envelope, Value), ContractError> {
    let value: Value = serde_json::from_str(raw)?;
    let envelope = Envelope::deserialize(&value)?;
    Ok((envelope, value))
}

fn session_of(envelope: &Envelope) -> Option<SessionHandle> {
    envelope
        .session_id
        .as_deref()
        .and_then(|raw| SessionHandle::new(raw).ok())
}

fn reject_explicit_failure(
    envelope: &Envelope,
    value: &Value,
    fallback: &str,
) -> Result<(), ContractError> {
    if envelope.success == Some(false) {
        return Err(ContractError::Rejected(ServerFailure::from_json(
            None, value, fallback,
        )));
    }
    Ok(())
}

/// Parses an extraction response.
///
/// # Errors
/// Returns [`ContractError::Rejected`] when `success` is not `true` and
/// [`ContractError::Malformed`] when `images` is missing.
pub fn parse_extraction_response(raw: &str) -> Result<ExtractionResponse, ContractError> {
    let (envelope, value) = decode(raw)?;
    if envelope.success != Some(true) {
        return Err(ContractError::Rejected(ServerFailure::from_json(
            None,
            &value,
            "Analysis failed",
        )));
    }

    let session_id = session_of(&envelope);
    let images = envelope
        .images
        .ok_or_else(|| ContractError::Malformed("extraction response has no images".to_string()))?;

    Ok(ExtractionResponse { images, session_id })
}

/// Parses a generation response.
///
/// # Errors
/// Returns [`ContractError::Rejected`] when `success` is not `true` and
/// [`ContractError::Malformed`] when `cards` is missing.
pub fn parse_generation_response(raw: &str) -> Result<GenerationResponse, ContractError> {
    let (envelope, value) = decode(raw)?;
    if envelope.success != Some(true) {
        return Err(ContractError::Rejected(ServerFailure::from_json(
            None,
            &value,
            "Generation failed",
        )));
    }

    let session_id = session_of(&envelope);
    let cards = envelope
        .cards
        .ok_or_else(|| ContractError::Malformed("Generation failed".to_string()))?;

    Ok(GenerationResponse {
        cards,
        message: envelope.message,
        session_id,
    })
}

/// Parses a packaging response.
///
/// # Errors
/// Returns [`ContractError::Rejected`] for an explicit `success: false`.
pub fn parse_packaging_response(raw: &str) -> Result<PackagingResponse, ContractError> {
    let (envelope, value) = decode(raw)?;
    reject_explicit_failure(&envelope, &value, "Packaging failed")?;

    let session_id = session_of(&envelope);
    Ok(PackagingResponse {
        message: envelope.message,
        file_path: envelope.file_path,
        session_id,
    })
}

/// Parses a file listing; a missing `files` field is an empty listing.
///
/// # Errors
/// Returns [`ContractError::Rejected`] for an explicit `success: false`.
pub fn parse_file_listing(raw: &str) -> Result<FileListing, ContractError> {
    let (envelope, value) = decode(raw)?;
    reject_explicit_failure(&envelope, &value, "Failed to list files")?;

    Ok(FileListing {
        files: envelope.files.unwrap_or_default(),
    })
}

/// Parses a cleanup acknowledgement.
///
/// # Errors
/// Returns [`ContractError::Rejected`] for an explicit `success: false`.
pub fn parse_cleanup_response(raw: &str) -> Result<CleanupResponse, ContractError> {
    let (envelope, value) = decode(raw)?;
    reject_explicit_failure(&envelope, &value, "Cleanup failed")?;

    Ok(CleanupResponse {
        message: envelope.message,
    })
}

#[cfg(test)]
mod tests {
    //! Unit tests for response parsing.

    use super::*;

    #[test]
    fn extraction_defaults_selection_to_true() {
        let parsed = parse_extraction_response(
            r#"{"success":true,"sessionId":"s1","images":[{"id":0,"src":"/a.png"},{"id":1,"src":"/b.png","selected":false}]}"#,
        )
        .expect("response should parse");

        assert!(parsed.images[0].initially_selected());
        assert!(!parsed.images[1].initially_selected());
        assert_eq!(parsed.session_id.as_ref().map(SessionHandle::as_str), Some("s1"));
    }

    #[test]
    fn generation_without_cards_is_malformed() {
        let error = parse_generation_response(r#"{"success":true,"sessionId":"s1"}"#)
            .expect_err("missing cards should fail");
        assert!(matches!(error, ContractError::Malformed(_)));
    }

    #[test]
    fn generation_success_false_is_rejected_with_message() {
        let error = parse_generation_response(r#"{"success":false,"error":"quota exceeded"}"#)
            .expect_err("explicit failure should be rejected");
        match error {
            ContractError::Rejected(failure) => assert_eq!(failure.message, "quota exceeded"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn blank_session_id_is_ignored() {
        let parsed = parse_packaging_response(r#"{"success":true,"message":"ok","sessionId":""}"#)
            .expect("response should parse");
        assert_eq!(parsed.session_id, None);
    }

    #[test]
    fn listing_without_files_is_empty() {
        let listing = parse_file_listing(r#"{"success":true}"#).expect("listing should parse");
        assert!(listing.files.is_empty());
    }
}
