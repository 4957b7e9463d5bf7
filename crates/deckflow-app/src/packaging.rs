//! Deck packaging from the reviewed cards.

use std::sync::Arc;

use deckflow_contract::{PackagingRequest, PackagingResponse};
use deckflow_core::WorkflowStage;
use deckflow_transport::TransportError;
use deckflow_ui::StageStatus;

use crate::{Action, FlowError, RunTicket, Workflow};

/// Owned packaging request plus the ticket it was issued under.
#[derive(Debug, Clone)]
pub struct PackagingPlan {
    /// Ticket the result must be applied with.
    pub ticket: RunTicket,
    /// Request body.
    pub request: PackagingRequest,
}

impl Workflow {
    /// Re-parses the review text and builds the packaging request.
    ///
    /// # Errors
    /// Returns [`FlowError::InvalidStage`] outside `review`,
    /// [`FlowError::ActionInFlight`] while busy and [`FlowError::Content`]
    /// when the text does not parse.
    pub fn begin_packaging(&mut self) -> Result<PackagingPlan, FlowError> {
        self.require_stage(WorkflowStage::Review, Action::Package)?;
        self.require_idle()?;

        self.log.info("Validating JSON structure...");
        let parsed = match &self.state.review {
            Some(document) => document.parse(),
            None => Err(FlowError::Content("no generated content".to_string())),
        };
        let cards = match parsed {
            Ok(cards) => cards,
            Err(error) => {
                self.report_failure("Cannot package", &error);
                return Err(error);
            }
        };

        let request = PackagingRequest::new(
            cards,
            &self.state.metadata,
            self.state.session.get().cloned(),
        );
        let ticket = self.issue_ticket(Action::Package);
        tracing::info!(run = ticket.run_id, cards = request.cards.len(), "packaging started");
        Ok(PackagingPlan { ticket, request })
    }

    /// Applies a packaging result; success moves to `finished`.
    ///
    /// # Errors
    /// Returns [`FlowError::StaleResponse`] for an abandoned run, or the
    /// classified failure. A failure stays at `review`.
    pub fn complete_packaging(
        &mut self,
        ticket: &RunTicket,
        result: Result<PackagingResponse, TransportError>,
    ) -> Result<(), FlowError> {
        self.accept(ticket)?;

        let response = match result {
            Ok(response) => response,
            Err(error) => {
                let error = FlowError::from_transport(error);
                self.report_failure("Packaging failed", &error);
                return Err(error);
            }
        };

        self.adopt_session(response.session_id);
        self.state.stage = WorkflowStage::Finished;
        self.state.activity = StageStatus::Healthy;
        let message = response
            .message
            .or(response.file_path)
            .unwrap_or_else(|| "deck is ready".to_string());
        self.log.success(format!("Packaging complete: {message}"));
        Ok(())
    }

    /// Packages the reviewed cards, enters `finished` and refreshes the
    /// file listing.
    ///
    /// # Errors
    /// See [`Workflow::begin_packaging`] and [`Workflow::complete_packaging`].
    pub async fn package(&mut self) -> Result<(), FlowError> {
        let plan = self.begin_packaging()?;
        let transport = Arc::clone(&self.transport);
        let result = transport.package(&plan.request).await;
        self.complete_packaging(&plan.ticket, result)?;
        self.refresh_if_session().await;
        Ok(())
    }
}
