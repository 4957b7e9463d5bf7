//! Request bodies sent to the card backend.

use std::fmt;

use deckflow_core::{CardCollection, DeckMetadata, GenerationMode, SessionHandle, VisualAsset};
use deckflow_settings::Settings;
use serde::Serialize;

use crate::ContractError;

const REDACTED: &str = "<redacted>";

/// Settings forwarded with an extraction upload.
///
/// Only the credential, model and target language are forwarded.
#[derive(Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionSettings {
    /// Resolved credential.
    pub api_key: String,
    /// Vision model name.
    pub model: String,
    /// Target language.
    pub language: String,
}

impl ExtractionSettings {
    /// Builds extraction settings from user settings and a resolved credential.
    pub fn from_settings(settings: &Settings, credential: String) -> Self {
        Self {
            api_key: credential,
            model: settings.model.clone(),
            language: settings.target_language.clone(),
        }
    }
}

impl fmt::Debug for ExtractionSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionSettings")
            .field("api_key", &REDACTED)
            .field("model", &self.model)
            .field("language", &self.language)
            .finish()
    }
}

/// One source file submitted to extraction as multipart form data.
#[derive(Clone, PartialEq, Eq)]
pub struct ExtractionRequest {
    /// Uploaded file name.
    pub file_name: String,
    /// MIME type of the upload.
    pub mime_type: String,
    /// File content.
    pub bytes: Vec<u8>,
    /// Forwarded settings, sent as the `settings` JSON form field.
    pub settings: ExtractionSettings,
    /// Run session, sent as the `sessionId` form field once known.
    pub session_id: Option<SessionHandle>,
}

impl ExtractionRequest {
    /// Serializes the `settings` form field.
    ///
    /// # Errors
    /// Returns [`ContractError::Decode`] when serialization fails.
    pub fn settings_json(&self) -> Result<String, ContractError> {
        Ok(serde_json::to_string(&self.settings)?)
    }
}

impl fmt::Debug for ExtractionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionRequest")
            .field("file_name", &self.file_name)
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .field("settings", &self.settings)
            .field("session_id", &self.session_id)
            .finish()
    }
}

/// Audio options forwarded to generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AudioSettings {
    /// Whether audio is generated.
    pub enabled: bool,
    /// Voice name.
    pub voice: String,
}

/// Settings forwarded with a generation request.
#[derive(Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationSettings {
    /// Resolved credential.
    pub api_key: String,
    /// Generation model name.
    pub model: String,
    /// Target language.
    pub language: String,
    /// Source language.
    pub source_lang: String,
    /// Audio options.
    pub audio: AudioSettings,
}

impl GenerationSettings {
    /// Builds generation settings from user settings and a resolved credential.
    pub fn from_settings(settings: &Settings, credential: String) -> Self {
        Self {
            api_key: credential,
            model: settings.model.clone(),
            language: settings.target_language.clone(),
            source_lang: settings.source_language.clone(),
            audio: AudioSettings {
                enabled: settings.audio.enabled,
                voice: settings.audio.voice.clone(),
            },
        }
    }
}

impl fmt::Debug for GenerationSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationSettings")
            .field("api_key", &REDACTED)
            .field("model", &self.model)
            .field("language", &self.language)
            .field("source_lang", &self.source_lang)
            .field("audio", &self.audio)
            .finish()
    }
}

/// Selected image forwarded to article generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageReference {
    /// Run-local asset id.
    pub id: u32,
    /// Absolute URL or `data:` reference.
    pub src: String,
    /// Server-side path reported by extraction.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Always `true` for forwarded images.
    pub selected: bool,
    /// `true` when the user added the image.
    pub is_user_uploaded: bool,
}

impl From<&VisualAsset> for ImageReference {
    fn from(asset: &VisualAsset) -> Self {
        Self {
            id: asset.id.get(),
            src: asset.source.clone(),
            path: asset.server_path.clone(),
            selected: asset.selected,
            is_user_uploaded: asset.user_added,
        }
    }
}

/// Decoded text file forwarded to generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextFilePayload {
    /// Decoded text.
    pub content: String,
    /// Original file name.
    pub filename: String,
}

/// Mode-specific part of a generation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged, rename_all_fields = "camelCase")]
pub enum ModePayload {
    /// Selected images plus the vocabulary list.
    Article {
        /// Selected images.
        images: Vec<ImageReference>,
        /// Vocabulary list.
        vocab_list: TextFilePayload,
    },
    /// Vocabulary list only.
    VocabList {
        /// Vocabulary list.
        vocab_list: TextFilePayload,
    },
    /// Grammar notes as decoded text.
    Grammar {
        /// Grammar file content.
        grammar_file: String,
    },
    /// Free-form topic with a fixed card count.
    TopicDriven {
        /// Topic text.
        topic: String,
        /// Number of cards requested.
        count: u32,
    },
}

impl ModePayload {
    /// Mode whose endpoint accepts this payload.
    pub fn mode(&self) -> GenerationMode {
        match self {
            ModePayload::Article { .. } => GenerationMode::Article,
            ModePayload::VocabList { .. } => GenerationMode::VocabList,
            ModePayload::Grammar { .. } => GenerationMode::Grammar,
            ModePayload::TopicDriven { .. } => GenerationMode::TopicDriven,
        }
    }
}

/// Generation request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    /// Target deck name.
    pub deck_name: String,
    /// Note-type name.
    pub note_name: String,
    /// Free-text goal.
    pub user_goal: String,
    /// Tags.
    pub tags: String,
    /// Run session; `null` before the backend has issued one.
    pub session_id: Option<SessionHandle>,
    /// Forwarded settings.
    pub settings: GenerationSettings,
    /// Mode-specific fields, flattened into the body.
    #[serde(flatten)]
    pub payload: ModePayload,
}

impl GenerationRequest {
    /// Builds a request from deck metadata.
    pub fn new(
        metadata: &DeckMetadata,
        session_id: Option<SessionHandle>,
        settings: GenerationSettings,
        payload: ModePayload,
    ) -> Self {
        Self {
            deck_name: metadata.deck_name.clone(),
            note_name: metadata.note_name.clone(),
            user_goal: metadata.user_goal.clone(),
            tags: metadata.tags.clone(),
            session_id,
            settings,
            payload,
        }
    }

    /// Mode this request targets.
    pub fn mode(&self) -> GenerationMode {
        self.payload.mode()
    }
}

/// Packaging request body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackagingRequest {
    /// Cards parsed from the edited text.
    pub cards: CardCollection,
    /// Target deck name.
    pub deck_name: String,
    /// Note-type name.
    pub note_name: String,
    /// Tags.
    pub tags: String,
    /// Run session; `null` when no earlier call issued one.
    pub session_id: Option<SessionHandle>,
}

impl PackagingRequest {
    /// Builds a request from parsed cards and deck metadata.
    pub fn new(
        cards: CardCollection,
        metadata: &DeckMetadata,
        session_id: Option<SessionHandle>,
    ) -> Self {
        Self {
            cards,
            deck_name: metadata.deck_name.clone(),
            note_name: metadata.note_name.clone(),
            tags: metadata.tags.clone(),
            session_id,
        }
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for request serialization.

    use super::*;
    use serde_json::json;

    fn generation_settings() -> GenerationSettings {
        GenerationSettings::from_settings(&Settings::default(), "sk-live".to_string())
    }

    #[test]
    fn topic_payload_flattens_into_body() {
        let request = GenerationRequest::new(
            &DeckMetadata::default(),
            None,
            generation_settings(),
            ModePayload::TopicDriven {
                topic: "weather".to_string(),
                count: 10,
            },
        );

        let body = serde_json::to_value(&request).expect("request should serialize");
        assert_eq!(body["deckName"], json!("Japanese_N4"));
        assert_eq!(body["sessionId"], json!(null));
        assert_eq!(body["topic"], json!("weather"));
        assert_eq!(body["count"], json!(10));
        assert_eq!(body["settings"]["sourceLang"], json!("English"));
        assert_eq!(body["settings"]["audio"]["voice"], json!("alloy"));
        assert_eq!(request.mode(), GenerationMode::TopicDriven);
    }

    #[test]
    fn article_payload_uses_camel_case_fields() {
        let payload = ModePayload::Article {
            images: vec![],
            vocab_list: TextFilePayload {
                content: "inu".to_string(),
                filename: "v.txt".to_string(),
            },
        };
        let body = serde_json::to_value(&payload).expect("payload should serialize");
        assert_eq!(body["vocabList"]["filename"], json!("v.txt"));
        assert!(body["images"].as_array().is_some());
    }

    #[test]
    fn debug_output_hides_credential() {
        let rendered = format!("{:?}", generation_settings());
        assert!(!rendered.contains("sk-live"));
        assert!(rendered.contains("<redacted>"));
    }
}
