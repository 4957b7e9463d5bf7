#![warn(missing_docs)]
//! # deckflow-ingest
//!
//! ## Purpose
//! Loads study material from disk and decides whether a run's inputs are
//! complete enough to start.
//!
//! ## Responsibilities
//! - Own uploaded source, vocabulary and grammar files as byte buffers.
//! - Decode text attachments the way the backend expects them.
//! - Validate the inputs of each generation mode, reporting the first failure.
//!
//! ## Data flow
//! Shell loads [`SourceFile`] values into [`RunInputs`] -> the workflow calls
//! [`validate_inputs`] before any request -> coordinators read bytes or
//! [`TextAttachment`] values when building payloads.
//!
//! ## Ownership and lifetimes
//! Files own their bytes so payload builders can clone them without holding a
//! borrow on run state across an await point.
//!
//! ## Error model
//! File access problems are [`IngestError`] values. Missing inputs are
//! [`ValidationFailure`] values and never reach the network.
//!
//! ## Security and privacy notes
//! Validation inspects only presence and credential shape; file contents and
//! credentials are never logged.

use std::fmt;
use std::path::Path;

use deckflow_core::GenerationMode;
use deckflow_settings::{Settings, SettingsError, resolve_credential};
use thiserror::Error;

/// One uploaded file held in memory.
#[derive(Clone, PartialEq, Eq)]
pub struct SourceFile {
    name: String,
    bytes: Vec<u8>,
}

impl fmt::Debug for SourceFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceFile")
            .field("name", &self.name)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl SourceFile {
    /// Creates an in-memory file.
    ///
    /// # Errors
    /// Returns [`IngestError::MissingName`] when `name` is blank.
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Result<Self, IngestError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(IngestError::MissingName);
        }
        Ok(Self { name, bytes })
    }

    /// Reads a file from disk, keeping its file name.
    ///
    /// # Errors
    /// Returns [`IngestError::Read`] when the file cannot be read and
    /// [`IngestError::MissingName`] when the path has no file name.
    pub fn load(path: &Path) -> Result<Self, IngestError> {
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or(IngestError::MissingName)?
            .to_string();
        let bytes = std::fs::read(path).map_err(|source| IngestError::Read {
            path: path.display().to_string(),
            source,
        })?;
        tracing::debug!(file = %name, bytes = bytes.len(), "loaded input file");
        Self::new(name, bytes)
    }

    /// File name as uploaded.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Raw content.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Lowercase extension without the dot.
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
    }

    /// MIME type inferred from the extension.
    pub fn mime_type(&self) -> &'static str {
        mime_for_extension(self.extension().as_deref())
    }

    /// Content decoded as UTF-8, replacing invalid sequences and dropping a
    /// leading byte-order mark.
    pub fn decoded_text(&self) -> String {
        let text = String::from_utf8_lossy(&self.bytes);
        text.strip_prefix('\u{feff}').unwrap_or(&text).to_string()
    }

    /// Decoded text paired with the file name.
    pub fn to_attachment(&self) -> TextAttachment {
        TextAttachment {
            content: self.decoded_text(),
            filename: self.name.clone(),
        }
    }
}

/// Maps a lowercase extension to the MIME type sent to the backend.
pub fn mime_for_extension(extension: Option<&str>) -> &'static str {
    match extension {
        Some("pdf") => "application/pdf",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("bmp") => "image/bmp",
        Some("txt" | "md") => "text/plain",
        Some("csv") => "text/csv",
        _ => "application/octet-stream",
    }
}

/// Decoded text file forwarded inside a generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextAttachment {
    /// Decoded text.
    pub content: String,
    /// Original file name.
    pub filename: String,
}

/// Everything the user supplied for one run, before any request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunInputs {
    /// Scanned article pages (PDF or images), in upload order.
    pub source_files: Vec<SourceFile>,
    /// Vocabulary list.
    pub vocab_file: Option<SourceFile>,
    /// Grammar notes.
    pub grammar_file: Option<SourceFile>,
    /// Free-form topic text.
    pub topic: String,
}

impl RunInputs {
    /// Removes every input.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// First reason a run cannot start.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationFailure {
    /// Credential is empty or masked.
    #[error(transparent)]
    Credential(#[from] SettingsError),
    /// Article mode without any source file.
    #[error("Please upload Article Source files (PDF or Images)")]
    MissingSourceFiles,
    /// Article or vocabulary mode without a vocabulary file.
    #[error("Please upload Vocabulary List file (.txt)")]
    MissingVocabularyFile,
    /// Grammar mode without a grammar file.
    #[error("Please upload Grammar file (.txt)")]
    MissingGrammarFile,
    /// Topic mode with blank topic text.
    #[error("Please enter a Topic for AI generation")]
    MissingTopic,
}

/// Checks the credential, then the mode's required inputs.
///
/// Only the first failing reason is returned.
///
/// # Errors
/// Returns the first [`ValidationFailure`] found.
pub fn validate_inputs(
    mode: GenerationMode,
    inputs: &RunInputs,
    settings: &Settings,
) -> Result<(), ValidationFailure> {
    resolve_credential(settings)?;

    match mode {
        GenerationMode::Article => {
            if inputs.source_files.is_empty() {
                return Err(ValidationFailure::MissingSourceFiles);
            }
            if inputs.vocab_file.is_none() {
                return Err(ValidationFailure::MissingVocabularyFile);
            }
        }
        GenerationMode::VocabList => {
            if inputs.vocab_file.is_none() {
                return Err(ValidationFailure::MissingVocabularyFile);
            }
        }
        GenerationMode::Grammar => {
            if inputs.grammar_file.is_none() {
                return Err(ValidationFailure::MissingGrammarFile);
            }
        }
        GenerationMode::TopicDriven => {
            if inputs.topic.trim().is_empty() {
                return Err(ValidationFailure::MissingTopic);
            }
        }
    }

    Ok(())
}

/// Errors produced while loading input files.
#[derive(Debug, Error)]
pub enum IngestError {
    /// File has no usable name.
    #[error("input file has no name")]
    MissingName,
    /// File could not be read.
    #[error("unable to read '{path}': {source}")]
    Read {
        /// Path as given.
        path: String,
        /// Underlying I/O failure.
        source: std::io::Error,
    },
}
