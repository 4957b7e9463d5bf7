//! Opaque backend session handle and the run's adopt-once slot.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Backend-issued token scoping all artifacts of one run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionHandle(String);

impl SessionHandle {
    /// Wraps a server-issued session id.
    ///
    /// # Errors
    /// Returns [`CoreError::InvalidSessionId`] when `raw` is blank.
    pub fn new(raw: impl Into<String>) -> Result<Self, CoreError> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(CoreError::InvalidSessionId);
        }
        Ok(Self(raw))
    }

    /// Returns the id exactly as issued.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Result of offering a server-returned handle to a [`SessionSlot`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Adoption {
    /// Slot was empty and now holds the offered handle.
    Assigned,
    /// Slot already held the same handle.
    Unchanged,
    /// Slot holds a different handle; the offered one was ignored.
    Conflicting(SessionHandle),
}

/// Holds at most one session handle per run.
///
/// Once assigned, the handle is immutable until [`SessionSlot::clear`] starts
/// a new run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSlot {
    handle: Option<SessionHandle>,
}

impl SessionSlot {
    /// Creates an empty slot.
    pub fn new() -> Self {
        Self { handle: None }
    }

    /// Returns the adopted handle, if any.
    pub fn get(&self) -> Option<&SessionHandle> {
        self.handle.as_ref()
    }

    /// Returns `true` once a handle has been adopted.
    pub fn is_assigned(&self) -> bool {
        self.handle.is_some()
    }

    /// Offers a handle returned by the backend.
    pub fn adopt(&mut self, candidate: SessionHandle) -> Adoption {
        match &self.handle {
            None => {
                self.handle = Some(candidate);
                Adoption::Assigned
            }
            Some(current) if *current == candidate => Adoption::Unchanged,
            Some(_) => Adoption::Conflicting(candidate),
        }
    }

    /// Forgets the handle; only called when a new run begins.
    pub fn clear(&mut self) {
        self.handle = None;
    }
}
