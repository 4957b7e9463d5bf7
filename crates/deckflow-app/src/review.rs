//! Editable generated content with parse-on-every-edit validation.

use deckflow_core::{CardCollection, CoreError};

use crate::FlowError;

/// Generated cards held as the text the user edits.
///
/// The parse outcome is recomputed on every edit and stored next to the text.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewDocument {
    text: String,
    parse_error: Option<String>,
}

impl ReviewDocument {
    /// Seeds the document with pretty-printed cards.
    ///
    /// # Errors
    /// Returns [`FlowError::Content`] when the cards cannot be serialized.
    pub fn from_cards(cards: &CardCollection) -> Result<Self, FlowError> {
        let text = cards.to_pretty_text().map_err(content_error)?;
        Ok(Self {
            text,
            parse_error: None,
        })
    }

    /// Empty document; its text does not parse until edited.
    pub fn empty() -> Self {
        let mut document = Self {
            text: String::new(),
            parse_error: None,
        };
        document.edit(String::new());
        document
    }

    /// Replaces the text and re-validates it. Returns `true` when it parses.
    pub fn edit(&mut self, text: impl Into<String>) -> bool {
        self.text = text.into();
        self.parse_error = CardCollection::parse(&self.text)
            .err()
            .map(|error| error.to_string());
        self.parse_error.is_none()
    }

    /// Current text, exactly as last edited.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Inline parse error of the current text.
    pub fn parse_error(&self) -> Option<&str> {
        self.parse_error.as_deref()
    }

    /// Returns `true` when the current text parses.
    pub fn is_valid(&self) -> bool {
        self.parse_error.is_none()
    }

    /// Parses the current text afresh.
    ///
    /// # Errors
    /// Returns [`FlowError::Content`] when the text does not parse.
    pub fn parse(&self) -> Result<CardCollection, FlowError> {
        CardCollection::parse(&self.text).map_err(content_error)
    }
}

fn content_error(error: CoreError) -> FlowError {
    FlowError::Content(error.to_string())
}
