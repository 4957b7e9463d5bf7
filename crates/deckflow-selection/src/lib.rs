#![warn(missing_docs)]
//! # deckflow-selection
//!
//! ## Purpose
//! Keeps the candidate images of an article run and the user's choice of which
//! ones feed generation.
//!
//! ## Responsibilities
//! - Assign run-unique asset ids from a monotonic counter.
//! - Toggle, delete and add user-supplied assets.
//! - Report the live selected count that gates generation.
//!
//! ## Data flow
//! Extraction responses -> [`SelectionModel::push_extracted`] -> user edits ->
//! [`SelectionModel::selected`] feeds the article generation payload.
//!
//! ## Ownership and lifetimes
//! The model owns every [`VisualAsset`]; callers read through shared borrows
//! and mutate only through the model's operations.
//!
//! ## Error model
//! Operations on ids that are not present fail with [`SelectionError`].
//!
//! ## Security and privacy notes
//! User-added images stay local as `data:` references; nothing is uploaded
//! until generation forwards the selection.
//!
//! ## Example
//! ```rust
//! use deckflow_selection::SelectionModel;
//!
//! let mut model = SelectionModel::new();
//! let first = model.push_extracted("https://host/a.png", None, true);
//! model.toggle(first).expect("asset should exist");
//! assert!(!model.can_generate());
//! ```

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use deckflow_core::{AssetId, VisualAsset};
use deckflow_ingest::SourceFile;
use thiserror::Error;

/// Ordered, mutable collection of visual assets for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionModel {
    assets: Vec<VisualAsset>,
    next_id: u32,
}

impl Default for SelectionModel {
    fn default() -> Self {
        Self::new()
    }
}

impl SelectionModel {
    /// Creates an empty model whose first id is `1`.
    pub fn new() -> Self {
        Self {
            assets: Vec::new(),
            next_id: 1,
        }
    }

    fn allocate_id(&mut self) -> AssetId {
        let id = AssetId(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        id
    }

    /// Appends an asset returned by extraction.
    pub fn push_extracted(
        &mut self,
        source: impl Into<String>,
        server_path: Option<String>,
        selected: bool,
    ) -> AssetId {
        let id = self.allocate_id();
        self.assets.push(VisualAsset {
            id,
            source: source.into(),
            selected,
            user_added: false,
            server_path,
        });
        id
    }

    /// Adds a user-supplied image as a selected `data:` reference.
    pub fn add_user_asset(&mut self, file: &SourceFile) -> AssetId {
        let id = self.allocate_id();
        self.assets.push(VisualAsset {
            id,
            source: data_url(file),
            selected: true,
            user_added: true,
            server_path: None,
        });
        id
    }

    /// Flips the `selected` flag and returns the new value.
    ///
    /// # Errors
    /// Returns [`SelectionError::UnknownAsset`] when `id` is not present.
    pub fn toggle(&mut self, id: AssetId) -> Result<bool, SelectionError> {
        let asset = self
            .assets
            .iter_mut()
            .find(|asset| asset.id == id)
            .ok_or(SelectionError::UnknownAsset(id))?;
        asset.selected = !asset.selected;
        Ok(asset.selected)
    }

    /// Sets the `selected` flag explicitly.
    ///
    /// # Errors
    /// Returns [`SelectionError::UnknownAsset`] when `id` is not present.
    pub fn set_selected(&mut self, id: AssetId, selected: bool) -> Result<(), SelectionError> {
        let asset = self
            .assets
            .iter_mut()
            .find(|asset| asset.id == id)
            .ok_or(SelectionError::UnknownAsset(id))?;
        asset.selected = selected;
        Ok(())
    }

    /// Removes an asset for the rest of the run.
    ///
    /// # Errors
    /// Returns [`SelectionError::UnknownAsset`] when `id` is not present.
    pub fn delete(&mut self, id: AssetId) -> Result<VisualAsset, SelectionError> {
        let index = self
            .assets
            .iter()
            .position(|asset| asset.id == id)
            .ok_or(SelectionError::UnknownAsset(id))?;
        Ok(self.assets.remove(index))
    }

    /// Looks up one asset.
    pub fn get(&self, id: AssetId) -> Option<&VisualAsset> {
        self.assets.iter().find(|asset| asset.id == id)
    }

    /// All assets in insertion order.
    pub fn assets(&self) -> &[VisualAsset] {
        &self.assets
    }

    /// Selected assets in insertion order.
    pub fn selected(&self) -> Vec<&VisualAsset> {
        self.assets.iter().filter(|asset| asset.selected).collect()
    }

    /// Live number of selected assets.
    pub fn selected_count(&self) -> usize {
        self.assets.iter().filter(|asset| asset.selected).count()
    }

    /// Returns `true` while at least one asset is selected.
    pub fn can_generate(&self) -> bool {
        self.assets.iter().any(|asset| asset.selected)
    }

    /// Total number of assets.
    pub fn len(&self) -> usize {
        self.assets.len()
    }

    /// Returns `true` when the model holds no assets.
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Drops every asset and restarts ids at `1`.
    pub fn clear(&mut self) {
        *self = Self::new();
    }
}

/// Builds a `data:` URL embedding the file bytes.
pub fn data_url(file: &SourceFile) -> String {
    format!(
        "data:{};base64,{}",
        file.mime_type(),
        STANDARD.encode(file.bytes())
    )
}

/// Errors produced by selection operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SelectionError {
    /// Asset id not present in this run.
    #[error("asset {0} does not exist")]
    UnknownAsset(AssetId),
}
