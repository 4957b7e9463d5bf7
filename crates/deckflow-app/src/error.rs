//! Failure taxonomy shared by every coordinator.

use deckflow_contract::{FailureClass, ServerFailure};
use deckflow_core::WorkflowStage;
use deckflow_ingest::{IngestError, ValidationFailure};
use deckflow_selection::SelectionError;
use deckflow_transport::TransportError;
use thiserror::Error;

use crate::Action;

/// Flat classification of a [`FlowError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Missing input or unusable credential; never reached the network.
    Validation,
    /// Request did not complete.
    Transport,
    /// Backend reported a failure.
    Server,
    /// Backend rejected the credential.
    Credential,
    /// Success response lacked its payload.
    MalformedResponse,
    /// Action needs a session handle the run does not have.
    MissingSession,
    /// Review text does not parse.
    Content,
    /// Action not allowed in the current workflow state.
    Guard,
    /// Response belonged to an abandoned run.
    Stale,
    /// Local file system failure.
    Io,
}

/// Workflow failure.
#[derive(Debug, Error)]
pub enum FlowError {
    /// Inputs or credential rejected before any request.
    #[error("{0}")]
    Validation(#[from] ValidationFailure),
    /// Backend unreachable or connection dropped.
    #[error("Network error: {0}")]
    Transport(String),
    /// Backend reported a non-credential failure.
    #[error("{0}")]
    Server(ServerFailure),
    /// Backend reported a credential failure.
    #[error("{0}")]
    Credential(ServerFailure),
    /// Success flag present but the payload was missing or undecodable.
    #[error("{0}")]
    MalformedResponse(String),
    /// No session handle exists for this run.
    #[error("No session ID available")]
    MissingSession,
    /// Review text failed to parse.
    #[error("Invalid JSON: {0}")]
    Content(String),
    /// Action not available at the current stage.
    #[error("{action} is not available at stage {stage}")]
    InvalidStage {
        /// Attempted action.
        action: Action,
        /// Stage at the time of the attempt.
        stage: WorkflowStage,
    },
    /// Another request of this run is outstanding.
    #[error("{0} is already running")]
    ActionInFlight(Action),
    /// Generation from selection with nothing selected.
    #[error("Select at least one image to generate from")]
    NothingSelected,
    /// Response arrived after its run was abandoned.
    #[error("stale response discarded")]
    StaleResponse,
    /// Selection operation failed.
    #[error(transparent)]
    Selection(#[from] SelectionError),
    /// Input file could not be loaded.
    #[error(transparent)]
    Ingest(#[from] IngestError),
    /// Local file system failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FlowError {
    /// Converts a transport failure, applying the credential heuristic.
    pub fn from_transport(error: TransportError) -> Self {
        match error {
            TransportError::Network(message) | TransportError::InvalidRequest(message) => {
                FlowError::Transport(message)
            }
            TransportError::Server(failure) => match failure.class() {
                FailureClass::Credential => FlowError::Credential(failure),
                FailureClass::Server => FlowError::Server(failure),
            },
            TransportError::Malformed(message) => FlowError::MalformedResponse(message),
        }
    }

    /// Flat kind of this failure.
    pub fn kind(&self) -> FailureKind {
        match self {
            FlowError::Validation(_) => FailureKind::Validation,
            FlowError::Transport(_) => FailureKind::Transport,
            FlowError::Server(_) => FailureKind::Server,
            FlowError::Credential(_) => FailureKind::Credential,
            FlowError::MalformedResponse(_) => FailureKind::MalformedResponse,
            FlowError::MissingSession => FailureKind::MissingSession,
            FlowError::Content(_) => FailureKind::Content,
            FlowError::InvalidStage { .. }
            | FlowError::ActionInFlight(_)
            | FlowError::NothingSelected
            | FlowError::Selection(_) => FailureKind::Guard,
            FlowError::StaleResponse => FailureKind::Stale,
            FlowError::Ingest(_) | FlowError::Io(_) => FailureKind::Io,
        }
    }

    /// Only validation and credential failures raise a blocking alert.
    pub fn raises_alert(&self) -> bool {
        matches!(
            self.kind(),
            FailureKind::Validation | FailureKind::Credential
        )
    }
}
