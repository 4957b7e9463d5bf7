#![warn(missing_docs)]
//! # deckflow-core
//!
//! ## Purpose
//! Defines the pure data model shared across the `deckflow` workspace.
//!
//! ## Responsibilities
//! - Name the generation modes, workflow stages and review sub-modes.
//! - Hold the run's opaque session handle with adopt-once semantics.
//! - Represent visual assets, card collections and session file entries.
//! - Provide the append-only user-facing log sink.
//!
//! ## Data flow
//! Coordinators in `deckflow-app` create [`VisualAsset`] values from
//! extraction responses, store generated cards as text that parses into a
//! [`CardCollection`], and record every outcome in a [`LogSink`].
//!
//! ## Ownership and lifetimes
//! All model values own their strings so that run state can be snapshotted and
//! moved between awaited coordinator steps without borrowing network buffers.
//!
//! ## Error model
//! Invalid identifiers, unknown mode names and unparseable card text return
//! [`CoreError`] variants.
//!
//! ## Security and privacy notes
//! Session handles are treated as opaque values and are never transformed.
//! The log sink stores only messages that callers have already redacted.
//!
//! ## Example
//! ```rust
//! use deckflow_core::{SessionHandle, SessionSlot, Adoption};
//!
//! let mut slot = SessionSlot::new();
//! let handle = SessionHandle::new("abc123").unwrap();
//! assert_eq!(slot.adopt(handle.clone()), Adoption::Assigned);
//! assert_eq!(slot.adopt(handle), Adoption::Unchanged);
//! ```

mod cards;
mod log;
mod model;
mod session;

pub use cards::{Card, CardCollection, DeckMetadata, MAX_EXAMPLE_PAIRS};
pub use log::{LogEntry, LogSink, Severity};
pub use model::{
    AssetId, GenerationMode, NoteFlavor, ReviewView, SessionFileEntry, VisualAsset, WorkflowStage,
};
pub use session::{Adoption, SessionHandle, SessionSlot};

use thiserror::Error;

/// Error type for core model validation and codec failures.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Session handle cannot be blank.
    #[error("session id is empty")]
    InvalidSessionId,
    /// Mode name does not match any generation mode.
    #[error("unknown generation mode: {0}")]
    UnknownMode(String),
    /// Note flavor name does not match `basic` or `cloze`.
    #[error("unknown note flavor: {0}")]
    UnknownNoteFlavor(String),
    /// Card text is not a JSON array of card objects.
    #[error("{0}")]
    CardSyntax(#[from] serde_json::Error),
}
