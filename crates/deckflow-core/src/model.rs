//! Workflow vocabulary: modes, stages, assets and server file entries.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Generation mode chosen for one run.
///
/// The mode decides which inputs are required and which generation endpoint
/// is called. Changing it starts a new run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GenerationMode {
    /// Scanned article pages plus a vocabulary list.
    #[default]
    Article,
    /// Vocabulary list only.
    VocabList,
    /// Grammar notes.
    Grammar,
    /// Free-form topic text.
    TopicDriven,
}

impl GenerationMode {
    /// Every mode, in selector order.
    pub const ALL: [GenerationMode; 4] = [
        GenerationMode::Article,
        GenerationMode::VocabList,
        GenerationMode::Grammar,
        GenerationMode::TopicDriven,
    ];

    /// Returns `true` when the run passes through extraction and selection.
    pub fn uses_extraction(self) -> bool {
        matches!(self, GenerationMode::Article)
    }

    /// Path segment of the mode's generation endpoint (`/api/generate/{segment}`).
    pub fn endpoint_segment(self) -> &'static str {
        match self {
            GenerationMode::Article => "article",
            GenerationMode::VocabList => "vocab",
            GenerationMode::Grammar => "grammar",
            GenerationMode::TopicDriven => "ai",
        }
    }

    /// Stable internal name.
    pub fn as_str(self) -> &'static str {
        match self {
            GenerationMode::Article => "article",
            GenerationMode::VocabList => "vocab-list",
            GenerationMode::Grammar => "grammar",
            GenerationMode::TopicDriven => "topic-driven",
        }
    }
}

impl fmt::Display for GenerationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GenerationMode {
    type Err = CoreError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_lowercase();
        GenerationMode::ALL
            .into_iter()
            .find(|mode| mode.as_str() == normalized || mode.endpoint_segment() == normalized)
            .ok_or_else(|| CoreError::UnknownMode(raw.to_string()))
    }
}

/// Workflow stage owned by the stage machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowStage {
    /// Inputs are being collected.
    #[default]
    Input,
    /// Extracted assets await human selection (article mode only).
    Selection,
    /// A generation request is outstanding.
    Processing,
    /// Generated content is editable.
    Review,
    /// Package built; downloads available.
    Finished,
}

impl WorkflowStage {
    /// Stable internal name.
    pub fn as_str(self) -> &'static str {
        match self {
            WorkflowStage::Input => "input",
            WorkflowStage::Selection => "selection",
            WorkflowStage::Processing => "processing",
            WorkflowStage::Review => "review",
            WorkflowStage::Finished => "finished",
        }
    }
}

impl fmt::Display for WorkflowStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sub-mode of the review stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewView {
    /// Raw structured text editor.
    #[default]
    Source,
    /// Rendered card preview.
    Preview,
}

/// Note-type flavor the preview renders with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteFlavor {
    /// Standard two-sided note.
    #[default]
    Basic,
    /// Cloze-deletion note.
    Cloze,
}

impl FromStr for NoteFlavor {
    type Err = CoreError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "basic" => Ok(NoteFlavor::Basic),
            "cloze" => Ok(NoteFlavor::Cloze),
            _ => Err(CoreError::UnknownNoteFlavor(raw.to_string())),
        }
    }
}

/// Run-local asset identifier, starting at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(pub u32);

impl AssetId {
    /// Returns the numeric id.
    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Extracted or user-supplied image candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisualAsset {
    /// Run-unique local id.
    pub id: AssetId,
    /// Absolute URL or embedded `data:` reference.
    pub source: String,
    /// Whether the asset is forwarded to generation.
    pub selected: bool,
    /// `true` when the user added the asset manually.
    pub user_added: bool,
    /// Server-side path reported by extraction, if any.
    pub server_path: Option<String>,
}

/// One file the backend holds for a session.
///
/// Read-only snapshot; never mutated locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionFileEntry {
    /// Display name.
    pub name: String,
    /// Path relative to the session root.
    pub path: String,
    /// Size in bytes.
    #[serde(default)]
    pub size: u64,
    /// `true` for flashcard package files.
    #[serde(rename = "isApkg", default)]
    pub is_package: bool,
    /// File name on disk when it differs from the display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_name: Option<String>,
    /// File extension including the dot.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,
}
