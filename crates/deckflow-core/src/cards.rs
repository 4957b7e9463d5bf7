//! Card records, card collections and deck metadata.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{CoreError, NoteFlavor};

/// Maximum number of example-sentence pairs a card carries.
pub const MAX_EXAMPLE_PAIRS: usize = 2;

const EXAMPLE_FIELDS: [(&str, &str); MAX_EXAMPLE_PAIRS] =
    [("ex1_ori", "ex1_trans"), ("ex2_ori", "ex2_trans")];

/// One flashcard record.
///
/// Fields are kept as an open JSON object so that edits made in the review
/// stage survive packaging even when they introduce keys this crate does not
/// name.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Card {
    fields: Map<String, Value>,
}

impl Card {
    /// Creates a card from raw fields.
    pub fn from_fields(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// Returns all fields.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Returns a string field, treating blanks as absent.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .and_then(Value::as_str)
            .filter(|value| !value.trim().is_empty())
    }

    /// Term being studied (`word`, falling back to `front`).
    pub fn term(&self) -> Option<&str> {
        self.text("word").or_else(|| self.text("front"))
    }

    /// Target-language meaning (`meaning`, falling back to `back`).
    pub fn meaning(&self) -> Option<&str> {
        self.text("meaning").or_else(|| self.text("back"))
    }

    /// Part of speech.
    pub fn part_of_speech(&self) -> Option<&str> {
        self.text("pos")
    }

    /// Hint text.
    pub fn hint(&self) -> Option<&str> {
        self.text("hint")
    }

    /// Synonyms as written by the generator.
    pub fn synonyms(&self) -> Option<&str> {
        self.text("synonyms")
    }

    /// Audio reference, when audio generation was enabled.
    pub fn audio(&self) -> Option<&str> {
        self.text("audio")
    }

    /// Example sentences with translations; at most [`MAX_EXAMPLE_PAIRS`].
    pub fn example_pairs(&self) -> Vec<(&str, &str)> {
        EXAMPLE_FIELDS
            .iter()
            .filter_map(|(original, translation)| {
                let original = self.text(original)?;
                Some((original, self.text(translation).unwrap_or_default()))
            })
            .collect()
    }
}

/// Ordered list of cards produced by generation and edited before packaging.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardCollection(Vec<Card>);

impl CardCollection {
    /// Wraps an ordered card list.
    pub fn new(cards: Vec<Card>) -> Self {
        Self(cards)
    }

    /// Parses structured text into a card collection.
    ///
    /// # Errors
    /// Returns [`CoreError::CardSyntax`] when the text is not a JSON array of
    /// objects. The message carries line and column of the failure.
    pub fn parse(text: &str) -> Result<Self, CoreError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Serializes the collection as indented JSON text.
    ///
    /// # Errors
    /// Returns [`CoreError::CardSyntax`] when serialization fails.
    pub fn to_pretty_text(&self) -> Result<String, CoreError> {
        Ok(serde_json::to_string_pretty(&self.0)?)
    }

    /// Returns the cards in order.
    pub fn cards(&self) -> &[Card] {
        &self.0
    }

    /// Number of cards.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` when there are no cards.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Deck-level metadata sent with generation and packaging requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeckMetadata {
    /// Target deck name.
    pub deck_name: String,
    /// Note-type name.
    pub note_name: String,
    /// Free-text learning goal.
    pub user_goal: String,
    /// Space- or comma-separated tags.
    pub tags: String,
    /// Flavor used by the preview renderer.
    pub note_flavor: NoteFlavor,
}

impl Default for DeckMetadata {
    fn default() -> Self {
        Self {
            deck_name: "Japanese_N4".to_string(),
            note_name: "Basic".to_string(),
            user_goal: String::new(),
            tags: String::new(),
            note_flavor: NoteFlavor::Basic,
        }
    }
}
